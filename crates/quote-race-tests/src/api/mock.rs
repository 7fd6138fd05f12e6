//! Mock API implementation directly using the `quote-race-engine` crate

use std::sync::Arc;

use quote_race_core::{RawRequest, Request, RequestHandler, RequestKind};
use quote_race_engine::QuoteDesk;
use tokio::sync::oneshot;
use tokio::task::{self, JoinHandle};
use uuid::Uuid;

use super::{Api, RequestMsg, Response};

pub struct MockDesk {
    desk: Arc<QuoteDesk>,
    join_handles: Vec<JoinHandle<()>>,
}

struct MockRawRequest {
    kind: RequestKind,
    response_channel: oneshot::Sender<Response>,
}

pub async fn start(threads: u16, desk: QuoteDesk) -> (MockDesk, Api) {
    let desk = Arc::new(desk);

    let it = (0..threads).map(|_| {
        let (sender, receiver) = flume::bounded::<RequestMsg>(1024);
        let desk = desk.clone();
        let handle = task::spawn_blocking(move || {
            let desk = &*desk;
            for msg in receiver.into_iter() {
                let raw = Box::new(MockRawRequest {
                    kind: msg.kind,
                    response_channel: msg.response_channel,
                });
                desk.handle(Request::from_raw(msg.kind, msg.request_id, raw))
            }
        });
        (sender, handle)
    });
    let (senders, join_handles) = it.unzip();

    let mock_desk = MockDesk { desk, join_handles };
    (mock_desk, Api::new(senders))
}

impl MockDesk {
    pub fn desk(&self) -> &QuoteDesk {
        &self.desk
    }

    pub async fn shutdown(self) {
        for handle in self.join_handles {
            handle.await.unwrap()
        }
        task::spawn_blocking(move || Arc::into_inner(self.desk).unwrap().shutdown())
            .await
            .unwrap();
    }
}

impl RawRequest for MockRawRequest {
    fn url(&self) -> &str {
        match self.kind {
            RequestKind::GetQuote => "/cotacao",
            RequestKind::Debug => "/debug",
        }
    }

    fn respond_with_err(self: Box<Self>, status: u16, msg: String, request_id: Uuid) {
        let response = Response::Error {
            status,
            msg,
            request_id,
        };
        self.response_channel.send(response).unwrap()
    }

    fn respond_with_json(self: Box<Self>, body: String, request_id: Uuid) {
        let response = Response::Json { body, request_id };
        self.response_channel.send(response).unwrap()
    }

    fn respond_with_string(self: Box<Self>, s: String, request_id: Uuid) {
        let response = Response::Text { s, request_id };
        self.response_channel.send(response).unwrap()
    }
}
