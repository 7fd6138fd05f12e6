use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use eyre::Result;
use quote_race_core::ServerSettings;
use quote_race_engine::quote::USD_BRL_PATH;
use quote_race_engine::{
    http_client, InsertGate, Quote, QuoteDesk, QuoteLedger, QuoteRepository, QuoteService,
    RepositoryError, SqliteQuoteRepository,
};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod api;
mod scripted;
pub use api::{Api, ApiError, ApiResponse};
pub use scripted::{ScriptedTask, TaskProbe};

/// Upstream answer for the USD-BRL quote with the given bid
pub fn upstream_quote_body(bid: &str) -> String {
    format!(
        r#"{{"USDBRL":{{"code":"USD","codein":"BRL","name":"Dólar Americano/Real Brasileiro","high":"5.2000","low":"5.0000","varBid":"0.0123","pctChange":"0.24","bid":"{bid}","ask":"5.1300","timestamp":"1700000000","create_date":"2023-11-14 19:13:20"}}}}"#
    )
}

/// In-memory SQLite repository whose inserts take at least `delay`
pub struct DelayedRepository {
    inner: SqliteQuoteRepository,
    delay: Duration,
}

impl DelayedRepository {
    pub fn new(delay: Duration) -> Result<Self> {
        Ok(Self {
            inner: SqliteQuoteRepository::in_memory()?,
            delay,
        })
    }
}

impl QuoteRepository for DelayedRepository {
    fn insert_quote(&self, quote: &Quote, gate: &InsertGate) -> Result<i64, RepositoryError> {
        std::thread::sleep(self.delay);
        self.inner.insert_quote(quote, gate)
    }

    fn count(&self) -> Result<u64, RepositoryError> {
        self.inner.count()
    }

    fn latest(&self) -> Result<Option<Quote>, RepositoryError> {
        self.inner.latest()
    }
}

pub struct TestCtxBuilder {
    /// Number of desk worker threads
    pub workers: u16,
    /// Time budget of the desk for one quote
    pub fetch_budget: Duration,
    /// How long the upstream takes to answer
    pub upstream_delay: Duration,
    /// Status the upstream answers with
    pub upstream_status: u16,
    /// Body the upstream answers with
    pub upstream_body: String,
    /// Repository replacing the desk's SQLite database
    pub repository: Option<Arc<dyn QuoteRepository>>,
}

impl Default for TestCtxBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestCtxBuilder {
    /// Create a new test context builder with a fast, healthy upstream
    pub fn new() -> Self {
        TestCtxBuilder {
            workers: 2,
            fetch_budget: Duration::from_millis(1_000),
            upstream_delay: Duration::ZERO,
            upstream_status: 200,
            upstream_body: upstream_quote_body("5.1234"),
            repository: None,
        }
    }

    /// Set the number of desk worker threads
    pub fn with_workers(mut self, workers: u16) -> Self {
        assert_ne!(workers, 0);
        self.workers = workers;
        self
    }

    /// Set the desk's time budget for one quote
    pub fn with_fetch_budget(mut self, budget: Duration) -> Self {
        self.fetch_budget = budget;
        self
    }

    /// Make the upstream answer only after `delay`
    pub fn with_upstream_delay(mut self, delay: Duration) -> Self {
        self.upstream_delay = delay;
        self
    }

    /// Make the upstream answer with `status`
    pub fn with_upstream_status(mut self, status: u16) -> Self {
        self.upstream_status = status;
        self
    }

    /// Make the upstream answer with `body`
    pub fn with_upstream_body(mut self, body: impl Into<String>) -> Self {
        self.upstream_body = body.into();
        self
    }

    /// Store quotes in `repository` instead of a SQLite file
    pub fn with_repository(mut self, repository: Arc<dyn QuoteRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    /// Build the test context
    ///
    /// Must run on a multi-threaded runtime: the desk blocks its worker
    /// threads on the runtime while the test awaits responses.
    pub async fn build(self) -> Result<TestCtx> {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(USD_BRL_PATH))
            .respond_with(
                ResponseTemplate::new(self.upstream_status)
                    .set_body_string(self.upstream_body)
                    .set_delay(self.upstream_delay),
            )
            .mount(&upstream)
            .await;

        let dir = tempfile::tempdir()?;
        let settings = ServerSettings {
            database: dir.path().join("quotes.db"),
            ledger: dir.path().join("cotacao.txt"),
            upstream: upstream.uri(),
            fetch_budget_ms: self.fetch_budget.as_millis() as u64,
            ..ServerSettings::default()
        };

        let runtime = tokio::runtime::Handle::current();
        let desk = match self.repository {
            Some(repository) => QuoteDesk::new(
                runtime,
                QuoteService::new(
                    http_client(Some(settings.fetch_budget()))?,
                    settings.upstream.clone(),
                ),
                repository,
                QuoteLedger::append(&settings.ledger),
                settings.fetch_budget(),
            ),
            None => {
                let launch_settings = settings.clone();
                tokio::task::spawn_blocking(move || {
                    quote_race_engine::launch(&launch_settings, runtime)
                })
                .await??
            }
        };
        let (desk, api) = api::mock::start(self.workers, desk).await;
        tracing::debug!(upstream = %upstream.uri(), dir = %dir.path().display(), "test context ready");

        Ok(TestCtx {
            api,
            desk,
            upstream,
            ledger: settings.ledger,
            database: settings.database,
            _dir: dir,
            drop_bomb: DropBomb,
        })
    }
}

/// Test context
pub struct TestCtx {
    /// API allowing to interact with the quote desk
    pub api: Api,
    desk: api::mock::MockDesk,
    /// The mocked quote API
    pub upstream: MockServer,
    /// Ledger file of the desk
    pub ledger: PathBuf,
    /// Database file of the desk
    pub database: PathBuf,

    _dir: TempDir,
    drop_bomb: DropBomb,
}

impl TestCtx {
    /// Lines written to the ledger so far (none if the file does not exist)
    pub fn ledger_lines(&self) -> Result<Vec<String>> {
        match std::fs::read_to_string(&self.ledger) {
            Ok(contents) => Ok(contents.lines().map(str::to_owned).collect()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Number of quotes in the database
    pub fn stored_quotes(&self) -> Result<u64> {
        Ok(self.desk.desk().repository().count()?)
    }

    /// The most recently stored quote
    pub fn latest_stored(&self) -> Result<Option<Quote>> {
        Ok(self.desk.desk().repository().latest()?)
    }

    /// Shut the desk down and finish the test
    pub async fn finish(self) {
        std::mem::forget(self.drop_bomb);
        drop(self.api);
        self.desk.shutdown().await;
    }
}

struct DropBomb;

impl Drop for DropBomb {
    fn drop(&mut self) {
        eprintln!("@TestAuthor: You should call `ctx.finish().await` to shut the quote desk down");
    }
}
