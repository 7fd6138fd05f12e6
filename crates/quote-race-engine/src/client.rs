//! Client asking the quote server for the current quote
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

use crate::quote::QuoteBid;

/// Errors of [`QuoteClient::get_quote()`]
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("no answer from the quote server within {0:?}")]
    Timeout(Duration),
    #[error("erro ao fazer a requisição HTTP para obter a cotação: {0}")]
    Request(reqwest::Error),
    #[error("erro na resposta HTTP: {status}, Message: {body}")]
    Status { status: u16, body: String },
    #[error("erro ao decodificar a resposta do servidor: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Request(err)
    }
}

/// Talks to the quote server
#[derive(Clone, Debug)]
pub struct QuoteClient {
    client: reqwest::Client,
    /// Base URL, e.g. `http://localhost:8080`
    server_url: String,
    timeout: Duration,
}

impl QuoteClient {
    pub fn new(client: reqwest::Client, server_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            server_url: server_url.into(),
            timeout,
        }
    }

    /// URL of the quote endpoint
    pub fn url(&self) -> String {
        format!("{}/cotacao", self.server_url.trim_end_matches('/'))
    }

    /// Request the current quote, giving up after the configured timeout
    pub async fn get_quote(&self) -> Result<QuoteBid, ClientError> {
        match tokio::time::timeout(self.timeout, self.request()).await {
            Ok(Err(ClientError::Request(err))) if err.is_timeout() => {
                warn!(url = %self.url(), "quote server timed out");
                Err(ClientError::Timeout(self.timeout))
            }
            Ok(result) => result,
            Err(_) => {
                warn!(url = %self.url(), "quote server timed out");
                Err(ClientError::Timeout(self.timeout))
            }
        }
    }

    async fn request(&self) -> Result<QuoteBid, ClientError> {
        let res = self.client.get(self.url()).send().await?;
        let status = res.status();
        if status != reqwest::StatusCode::OK {
            let body = res.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let body = res.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}
