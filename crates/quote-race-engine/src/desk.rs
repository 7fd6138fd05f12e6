//! Request desk answering the quote server's requests
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use quote_race_core::{Request, RequestHandler, RequestKind};
use thiserror::Error;
use tokio::runtime::Handle;
use tracing::{info, info_span, warn};

use crate::database::{InsertGate, QuoteRepository, RepositoryError};
use crate::ledger::QuoteLedger;
use crate::quote::{Quote, QuoteError, QuoteService};
use crate::race::Deadline;

#[derive(Debug, Error)]
enum DeskError {
    #[error(transparent)]
    Fetch(#[from] QuoteError),
    #[error(transparent)]
    Persist(#[from] RepositoryError),
}

/// Handles quote requests: fetch, store, log to the ledger, answer
///
/// Requests arrive on plain threads; the async part of each request runs on
/// the runtime behind `runtime`.
pub struct QuoteDesk {
    runtime: Handle,
    service: QuoteService,
    repository: Arc<dyn QuoteRepository>,
    ledger: QuoteLedger,
    /// Time budget for fetching and storing one quote
    budget: Duration,
    served: AtomicU64,
}

impl QuoteDesk {
    /// Create a new [`QuoteDesk`]
    pub fn new(
        runtime: Handle,
        service: QuoteService,
        repository: Arc<dyn QuoteRepository>,
        ledger: QuoteLedger,
        budget: Duration,
    ) -> Self {
        Self {
            runtime,
            service,
            repository,
            ledger,
            budget,
            served: AtomicU64::new(0),
        }
    }

    /// Number of quotes served so far
    pub fn served(&self) -> u64 {
        self.served.load(Ordering::Relaxed)
    }

    /// The repository quotes are stored in
    pub fn repository(&self) -> &Arc<dyn QuoteRepository> {
        &self.repository
    }

    async fn serve_quote(&self) -> Result<Quote, DeskError> {
        let deadline = Deadline::after(self.budget);

        let quote = tokio::time::timeout_at(deadline.instant(), self.service.fetch_usd_brl())
            .await
            .map_err(|_| QuoteError::Timeout(self.budget))??;

        let repository = self.repository.clone();
        let gate = Arc::new(InsertGate::new());
        let row = quote.clone();
        let mut insert = tokio::task::spawn_blocking({
            let gate = gate.clone();
            move || repository.insert_quote(&row, &gate)
        });
        let joined = match tokio::time::timeout_at(deadline.instant(), &mut insert).await {
            Ok(joined) => joined,
            Err(_) if gate.abandon() => return Err(RepositoryError::Timeout.into()),
            // The row is being committed, its result decides.
            Err(_) => insert.await,
        };
        let id = joined.map_err(|err| RepositoryError::Worker(err.to_string()))??;
        info!(id, bid = quote.bid, "quote stored");

        if let Err(err) = self.ledger.record(quote.bid) {
            warn!(path = %self.ledger.path().display(), %err, "could not write the ledger");
        }
        Ok(quote)
    }
}

impl RequestHandler for QuoteDesk {
    fn handle(&self, rq: Request) {
        let span = info_span!("request", id = %rq.id(), kind = ?rq.kind());
        let _enter = span.enter();

        match rq.kind() {
            RequestKind::GetQuote => match self.runtime.block_on(self.serve_quote()) {
                Ok(quote) => match serde_json::to_string(&quote) {
                    Ok(body) => {
                        self.served.fetch_add(1, Ordering::Relaxed);
                        rq.respond_with_json(body);
                    }
                    Err(err) => {
                        warn!(%err, "could not encode the quote");
                        rq.respond_with_err(500, "Erro ao codificar a cotação");
                    }
                },
                Err(DeskError::Fetch(err)) => {
                    warn!(%err, "could not fetch the quote");
                    rq.respond_with_err(500, "Erro ao obter a cotação do dólar");
                }
                Err(DeskError::Persist(err)) => {
                    warn!(%err, "could not store the quote");
                    rq.respond_with_err(500, "Erro ao salvar a cotação no banco de dados");
                }
            },

            RequestKind::Debug => {
                let stored = self
                    .repository
                    .count()
                    .map(|n| n.to_string())
                    .unwrap_or_else(|err| format!("unknown ({err})"));
                rq.respond_with_string(format!(
                    "quote desk up: {} served, {stored} stored",
                    self.served()
                ));
            }
        }
    }

    fn shutdown(self) {
        info!(served = self.served(), "quote desk shut down");
    }
}
