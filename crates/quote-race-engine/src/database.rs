//! Relational store for served quotes
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use rusqlite::{params, Connection, InterruptHandle, OptionalExtension};
use thiserror::Error;

use crate::quote::Quote;

const CREATE_QUOTES_TABLE: &str = "CREATE TABLE IF NOT EXISTS quotes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    code TEXT NOT NULL,
    codein TEXT NOT NULL,
    name TEXT NOT NULL,
    high REAL NOT NULL,
    low REAL NOT NULL,
    varBid REAL NOT NULL,
    pctChange REAL NOT NULL,
    bid REAL NOT NULL,
    ask REAL NOT NULL,
    timestamp TEXT NOT NULL,
    create_date TEXT NOT NULL
)";

const INSERT_QUOTE: &str = "INSERT INTO quotes (code, codein, name, high, low, varBid, \
    pctChange, bid, ask, timestamp, create_date) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)";

const SELECT_LATEST: &str = "SELECT code, codein, name, high, low, varBid, pctChange, bid, ask, \
    timestamp, create_date FROM quotes ORDER BY id DESC LIMIT 1";

/// Errors of a [`QuoteRepository`]
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("erro ao inserir a cotação no banco de dados: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("the time budget ran out before the quote was stored")]
    Timeout,
    #[error("the storage worker failed: {0}")]
    Worker(String),
}

/// Decides whether an insert commits or is abandoned by its requester
///
/// The requester and the repository each try to [`claim`](Self::claim) the
/// gate and only the first claim succeeds. A repository commits only after a
/// successful claim, so a requester that claimed the gate can rely on the
/// row never showing up.
#[derive(Default)]
pub struct InsertGate {
    claimed: AtomicBool,
    /// Interrupts the statement currently running for this insert
    running: Mutex<Option<InterruptHandle>>,
}

impl InsertGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the gate; `true` for the first caller only
    pub fn claim(&self) -> bool {
        self.claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Whether someone claimed the gate already
    #[inline]
    pub fn is_claimed(&self) -> bool {
        self.claimed.load(Ordering::Acquire)
    }

    /// Abandon the insert: claim the gate and interrupt the running
    /// statement, if any
    ///
    /// Returns `false` if the repository claimed the gate first. Its result
    /// then decides the outcome.
    pub fn abandon(&self) -> bool {
        if !self.claim() {
            return false;
        }
        if let Some(handle) = &*self.running.lock() {
            handle.interrupt();
        }
        true
    }

    fn arm(&self, handle: InterruptHandle) {
        *self.running.lock() = Some(handle);
    }

    fn disarm(&self) {
        *self.running.lock() = None;
    }
}

/// Somewhere quotes are stored
pub trait QuoteRepository: Send + Sync {
    /// Store `quote`, returning its row id
    ///
    /// Must not commit unless [`InsertGate::claim()`] succeeds; fails with
    /// [`RepositoryError::Timeout`] otherwise.
    fn insert_quote(&self, quote: &Quote, gate: &InsertGate) -> Result<i64, RepositoryError>;

    /// Number of stored quotes
    fn count(&self) -> Result<u64, RepositoryError>;

    /// The most recently stored quote
    fn latest(&self) -> Result<Option<Quote>, RepositoryError>;
}

/// [`QuoteRepository`] backed by SQLite
pub struct SqliteQuoteRepository {
    conn: Mutex<Connection>,
}

impl SqliteQuoteRepository {
    /// Open or create the database at `path` and make sure the `quotes`
    /// table exists
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RepositoryError> {
        Self::with_connection(Connection::open(path)?)
    }

    /// Create an in-memory database
    pub fn in_memory() -> Result<Self, RepositoryError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, RepositoryError> {
        conn.execute_batch(CREATE_QUOTES_TABLE)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl QuoteRepository for SqliteQuoteRepository {
    fn insert_quote(&self, quote: &Quote, gate: &InsertGate) -> Result<i64, RepositoryError> {
        let mut conn = self.conn.lock();
        if gate.is_claimed() {
            return Err(RepositoryError::Timeout);
        }
        gate.arm(conn.get_interrupt_handle());
        let result = insert_gated(&mut conn, quote, gate);
        gate.disarm();
        result
    }

    fn count(&self) -> Result<u64, RepositoryError> {
        let conn = self.conn.lock();
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM quotes", [], |row| row.get(0))?;
        Ok(n as u64)
    }

    fn latest(&self) -> Result<Option<Quote>, RepositoryError> {
        let conn = self.conn.lock();
        let quote = conn
            .query_row(SELECT_LATEST, [], |row| {
                Ok(Quote {
                    code: row.get(0)?,
                    codein: row.get(1)?,
                    name: row.get(2)?,
                    high: row.get(3)?,
                    low: row.get(4)?,
                    var_bid: row.get(5)?,
                    pct_change: row.get(6)?,
                    bid: row.get(7)?,
                    ask: row.get(8)?,
                    timestamp: row.get(9)?,
                    create_date: row.get(10)?,
                })
            })
            .optional()?;
        Ok(quote)
    }
}

fn insert_gated(
    conn: &mut Connection,
    quote: &Quote,
    gate: &InsertGate,
) -> Result<i64, RepositoryError> {
    let tx = conn.transaction()?;
    tx.execute(
        INSERT_QUOTE,
        params![
            quote.code,
            quote.codein,
            quote.name,
            quote.high,
            quote.low,
            quote.var_bid,
            quote.pct_change,
            quote.bid,
            quote.ask,
            quote.timestamp,
            quote.create_date,
        ],
    )?;
    let id = tx.last_insert_rowid();

    // Dropping the transaction rolls the row back.
    if !gate.claim() {
        return Err(RepositoryError::Timeout);
    }
    tx.commit()?;
    Ok(id)
}
