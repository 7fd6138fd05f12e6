use std::sync::Arc;

use eyre::Result;
use flume::Sender;
use quote_race_core::RequestKind;
use quote_race_engine::Quote;
use thiserror::Error;
use tokio::sync::oneshot;
use uuid::Uuid;

pub mod mock;

#[derive(Debug, Error)]
#[error("Error {status}: {msg}")]
pub struct ApiError {
    pub status: u16,
    pub msg: String,
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug)]
enum Response {
    Error {
        status: u16,
        msg: String,
        request_id: Uuid,
    },
    Json {
        body: String,
        request_id: Uuid,
    },
    Text {
        s: String,
        request_id: Uuid,
    },
}

struct RequestMsg {
    kind: RequestKind,
    request_id: Uuid,
    response_channel: oneshot::Sender<Response>,
}

pub struct Api {
    /// One channel per desk worker
    channels: Arc<Vec<Sender<RequestMsg>>>,

    my_channel: Sender<RequestMsg>,
    my_index: usize,
}

impl Api {
    fn new(channels: Vec<Sender<RequestMsg>>) -> Self {
        let my_channel = channels[0].clone();
        Self {
            channels: Arc::new(channels),
            my_channel,
            my_index: 0,
        }
    }
}

impl Clone for Api {
    fn clone(&self) -> Self {
        let my_index = (self.my_index + 1) % self.channels.len();
        Self {
            channels: self.channels.clone(),
            my_channel: self.channels[my_index].clone(),
            my_index,
        }
    }
}

impl Api {
    async fn make_request(&self, kind: RequestKind) -> Result<Response> {
        let (sender, receiver) = oneshot::channel();
        let msg = RequestMsg {
            kind,
            request_id: Uuid::new_v4(),
            response_channel: sender,
        };
        self.my_channel.send_async(msg).await?;
        Ok(receiver.await?)
    }

    pub async fn get_quote(&self) -> Result<ApiResponse<Quote>> {
        let kind = RequestKind::GetQuote;
        Ok(match self.make_request(kind).await? {
            Response::Error {
                status,
                msg,
                request_id,
            } => ApiResponse {
                request_id,
                result: Err(ApiError { status, msg }),
            },
            Response::Json { body, request_id } => ApiResponse {
                request_id,
                result: Ok(serde_json::from_str(&body)?),
            },
            resp => panic!("{kind:?} must not be answered by {resp:?}"),
        })
    }

    pub async fn debug(&self) -> Result<ApiResponse<String>> {
        let kind = RequestKind::Debug;
        Ok(match self.make_request(kind).await? {
            Response::Error {
                status,
                msg,
                request_id,
            } => ApiResponse {
                request_id,
                result: Err(ApiError { status, msg }),
            },
            Response::Text { s, request_id } => ApiResponse {
                request_id,
                result: Ok(s),
            },
            resp => panic!("{kind:?} must not be answered by {resp:?}"),
        })
    }
}

pub struct ApiResponse<T> {
    pub request_id: Uuid,
    pub result: ApiResult<T>,
}
