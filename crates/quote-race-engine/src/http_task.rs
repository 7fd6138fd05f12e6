//! Fetch task performing a single HTTP GET
use quote_race_core::{CancelSignal, FetchError, FetchTask, Payload};
use serde::de::IgnoredAny;

/// A [`FetchTask`] sending one GET request to a fixed URL
#[derive(Clone, Debug)]
pub struct HttpFetchTask {
    client: reqwest::Client,
    url: String,
    /// Reject bodies that are not JSON
    expect_json: bool,
}

impl HttpFetchTask {
    /// Create a task fetching `url` with `client`
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            expect_json: false,
        }
    }

    /// Treat a body that is not valid JSON as [`FetchError::Malformed`]
    pub fn expect_json(mut self) -> Self {
        self.expect_json = true;
        self
    }

    async fn get(&self) -> Result<Payload, FetchError> {
        let res = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|err| FetchError::Transport(err.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let body = res
            .text()
            .await
            .map_err(|err| FetchError::Transport(err.to_string()))?;
        if self.expect_json {
            serde_json::from_str::<IgnoredAny>(&body)
                .map_err(|err| FetchError::Malformed(err.to_string()))?;
        }
        Ok(Payload::from(body))
    }
}

impl FetchTask for HttpFetchTask {
    fn address(&self) -> &str {
        &self.url
    }

    async fn fetch(self, cancel: CancelSignal) -> Result<Payload, FetchError> {
        tokio::select! {
            result = self.get() => result,
            () = cancel.cancelled() => Err(FetchError::Cancelled),
        }
    }
}
