//! :rocket: Race of two fetches against a deadline, and the quote service
//! built around it.
//!
//! The [race] module holds the coordinator. The [CEP lookup][cep] is its
//! production user. The [quote service][quote], [database], [ledger] and
//! [desk] make up the quote server; the [client] talks to it.

#![allow(rustdoc::private_intra_doc_links)]
use std::sync::Arc;
use std::time::Duration;

use quote_race_core::ServerSettings;
use thiserror::Error;
use tokio::runtime::Handle;

pub mod cep;
pub mod client;
pub mod database;
pub mod desk;
pub mod http_task;
pub mod ledger;
pub mod quote;
pub mod race;

pub use cep::{Address, Cep, CepEndpoints, CepError, CepLookup, LookupResult};
pub use client::{ClientError, QuoteClient};
pub use database::{InsertGate, QuoteRepository, RepositoryError, SqliteQuoteRepository};
pub use desk::QuoteDesk;
pub use http_task::HttpFetchTask;
pub use ledger::{LedgerMode, QuoteLedger};
pub use quote::{Quote, QuoteBid, QuoteError, QuoteService};
pub use race::{Deadline, RaceFetcher};

/// Errors while launching the quote desk
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("could not open the quote database: {0}")]
    Repository(#[from] RepositoryError),
    #[error("could not build the HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Build an HTTP client, optionally with a whole-request timeout
pub fn http_client(timeout: Option<Duration>) -> Result<reqwest::Client, reqwest::Error> {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder.build()
}

/// Entrypoint of the quote server
///
/// Opens the database, prepares the ledger and the upstream client and
/// constructs the desk which is served requests by the HTTP front end.
/// Async work of the desk runs on `runtime`.
pub fn launch(settings: &ServerSettings, runtime: Handle) -> Result<QuoteDesk, LaunchError> {
    let repository = SqliteQuoteRepository::open(&settings.database)?;
    let client = http_client(Some(settings.fetch_budget()))?;
    let service = QuoteService::new(client, settings.upstream.clone());

    tracing::info!(
        database = %settings.database.display(),
        ledger = %settings.ledger.display(),
        upstream = %settings.upstream,
        "quote desk launched"
    );

    Ok(QuoteDesk::new(
        runtime,
        service,
        Arc::new(repository),
        QuoteLedger::append(&settings.ledger),
        settings.fetch_budget(),
    ))
}
