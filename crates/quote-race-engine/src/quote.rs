//! USD-BRL quote and the service fetching it
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Path of the USD-BRL quote below the upstream base URL
pub const USD_BRL_PATH: &str = "/json/last/USD-BRL";

/// A currency quote
///
/// Numeric fields travel as JSON strings, e.g. `"bid": "5.1234"`.
#[derive(Clone, PartialEq, Serialize, Deserialize, Debug)]
pub struct Quote {
    pub code: String,
    pub codein: String,
    pub name: String,
    #[serde(with = "decimal_string")]
    pub high: f64,
    #[serde(with = "decimal_string")]
    pub low: f64,
    #[serde(rename = "varBid", with = "decimal_string")]
    pub var_bid: f64,
    #[serde(rename = "pctChange", with = "decimal_string")]
    pub pct_change: f64,
    #[serde(with = "decimal_string")]
    pub bid: f64,
    #[serde(with = "decimal_string")]
    pub ask: f64,
    pub timestamp: String,
    pub create_date: String,
}

/// The only part of a [`Quote`] the client cares about
#[derive(Clone, Copy, PartialEq, Serialize, Deserialize, Debug)]
pub struct QuoteBid {
    #[serde(with = "decimal_string")]
    pub bid: f64,
}

/// Upstream envelope: `{"USDBRL": {...}}`
#[derive(Deserialize)]
struct QuoteResponse {
    #[serde(rename = "USDBRL")]
    usd_brl: Quote,
}

/// Errors while fetching a quote from upstream
#[derive(Debug, Error)]
pub enum QuoteError {
    #[error("error making request: {0}")]
    Request(#[from] reqwest::Error),
    #[error("upstream answered with status {0}")]
    Status(u16),
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("no quote within {0:?}")]
    Timeout(Duration),
}

/// Fetches quotes from the upstream API
#[derive(Clone, Debug)]
pub struct QuoteService {
    client: reqwest::Client,
    /// Base URL, e.g. `https://economia.awesomeapi.com.br`
    upstream: String,
}

impl QuoteService {
    pub fn new(client: reqwest::Client, upstream: impl Into<String>) -> Self {
        Self {
            client,
            upstream: upstream.into(),
        }
    }

    /// Full URL of the USD-BRL quote
    pub fn url(&self) -> String {
        format!("{}{USD_BRL_PATH}", self.upstream.trim_end_matches('/'))
    }

    /// Fetch the current USD-BRL quote
    ///
    /// The caller bounds the time spent; see the desk.
    pub async fn fetch_usd_brl(&self) -> Result<Quote, QuoteError> {
        let res = self.client.get(self.url()).send().await?;
        let status = res.status();
        if !status.is_success() {
            return Err(QuoteError::Status(status.as_u16()));
        }
        let body = res.bytes().await?;
        let response: QuoteResponse = serde_json::from_slice(&body)?;
        Ok(response.usd_brl)
    }
}

/// (De)serialize an `f64` as a JSON string
mod decimal_string {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.trim().parse().map_err(D::Error::custom)
    }
}
