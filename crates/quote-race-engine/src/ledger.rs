//! Flat file receiving one `Dólar: x.xx` line per quote
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

/// How the ledger treats an existing file
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LedgerMode {
    /// Keep previous lines (server)
    Append,
    /// Replace the file on every write (client)
    Overwrite,
}

/// Writes quote lines to a file
#[derive(Debug)]
pub struct QuoteLedger {
    path: PathBuf,
    mode: LedgerMode,
    /// Serializes writers sharing this ledger
    lock: Mutex<()>,
}

impl QuoteLedger {
    pub fn new(path: impl Into<PathBuf>, mode: LedgerMode) -> Self {
        Self {
            path: path.into(),
            mode,
            lock: Mutex::new(()),
        }
    }

    /// A ledger adding one line per quote
    pub fn append(path: impl Into<PathBuf>) -> Self {
        Self::new(path, LedgerMode::Append)
    }

    /// A ledger keeping only the last quote
    pub fn overwrite(path: impl Into<PathBuf>) -> Self {
        Self::new(path, LedgerMode::Overwrite)
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The line written for `bid`
    pub fn line(bid: f64) -> String {
        format!("Dólar: {bid:.2}\n")
    }

    /// Write the line for `bid`
    pub fn record(&self, bid: f64) -> io::Result<()> {
        let _guard = self.lock.lock();
        let mut options = OpenOptions::new();
        match self.mode {
            LedgerMode::Append => options.create(true).append(true),
            LedgerMode::Overwrite => options.create(true).write(true).truncate(true),
        };
        let mut file = options.open(&self.path)?;
        file.write_all(Self::line(bid).as_bytes())?;
        tracing::debug!(path = %self.path.display(), "quote written to ledger");
        Ok(())
    }
}
