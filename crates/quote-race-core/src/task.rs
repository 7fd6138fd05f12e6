use std::fmt;

use thiserror::Error;

use crate::CancelSignal;

/// Slot a task occupies in a race
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum TaskId {
    /// First contender
    A,
    /// Second contender
    B,
}

impl TaskId {
    /// The opposing slot
    #[inline]
    pub fn other(self) -> Self {
        match self {
            TaskId::A => TaskId::B,
            TaskId::B => TaskId::A,
        }
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskId::A => f.write_str("A"),
            TaskId::B => f.write_str("B"),
        }
    }
}

/// Raw text returned by a fetch task
///
/// The race never looks inside a payload. An empty payload is a valid
/// payload.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Payload(String);

impl Payload {
    /// Wrap the given text
    #[inline]
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// The empty payload a lenient race reports for a failed task
    #[inline]
    pub fn empty() -> Self {
        Self(String::new())
    }

    /// Borrow the payload text
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the payload holds no text at all
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Take the payload text
    #[inline]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Self(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Self(text.to_owned())
    }
}

/// Why a fetch task forfeited
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request never produced a response (connection, TLS, body read, ...)
    #[error("transport error: {0}")]
    Transport(String),
    /// The endpoint answered with a non-success status
    #[error("unexpected status {status}")]
    Status {
        /// HTTP status code
        status: u16,
    },
    /// The endpoint answered with a body the task refuses to report
    #[error("malformed payload: {0}")]
    Malformed(String),
    /// The task noticed cancellation before its call completed
    #[error("cancelled before completion")]
    Cancelled,
    /// The task went away without reporting (e.g., it panicked)
    #[error("task ended without reporting a result")]
    Abandoned,
}

/// What a single task hands to the race coordinator
#[derive(Debug)]
pub enum TaskReport {
    /// The call completed with a payload
    Success(Payload),
    /// The call failed
    Failure(FetchError),
}

impl From<Result<Payload, FetchError>> for TaskReport {
    fn from(result: Result<Payload, FetchError>) -> Self {
        match result {
            Ok(payload) => TaskReport::Success(payload),
            Err(err) => TaskReport::Failure(err),
        }
    }
}

/// How the coordinator treats a failed task
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Debug)]
pub enum Strictness {
    /// A failed task forfeits and can never win
    #[default]
    Strict,
    /// A failed task reports an empty payload, which competes like any other
    ///
    /// The coordinator cannot tell a fast failure from a fast empty success
    /// in this mode.
    Lenient,
}

impl Strictness {
    /// Turn a report into a payload that may win the race
    ///
    /// Returns [`None`] if the report forfeits. A task that was cancelled or
    /// went away without reporting forfeits in either mode.
    pub fn admit(self, report: TaskReport) -> Option<Payload> {
        match (self, report) {
            (_, TaskReport::Success(payload)) => Some(payload),
            (_, TaskReport::Failure(FetchError::Cancelled | FetchError::Abandoned)) => None,
            (Strictness::Lenient, TaskReport::Failure(_)) => Some(Payload::empty()),
            (Strictness::Strict, TaskReport::Failure(_)) => None,
        }
    }

    /// Whether `report` would win if it arrived first
    pub fn can_win(self, report: &TaskReport) -> bool {
        match report {
            TaskReport::Success(_) => true,
            TaskReport::Failure(FetchError::Cancelled | FetchError::Abandoned) => false,
            TaskReport::Failure(_) => self == Strictness::Lenient,
        }
    }
}

/// Result of a race
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum RaceOutcome {
    /// The given task reported first
    WonBy(TaskId, Payload),
    /// The deadline elapsed before any task reported a winning result
    TimedOut,
}

impl RaceOutcome {
    /// The winning slot, if any
    #[inline]
    pub fn winner(&self) -> Option<TaskId> {
        match self {
            RaceOutcome::WonBy(id, _) => Some(*id),
            RaceOutcome::TimedOut => None,
        }
    }

    /// The winning payload, if any
    #[inline]
    pub fn payload(&self) -> Option<&Payload> {
        match self {
            RaceOutcome::WonBy(_, payload) => Some(payload),
            RaceOutcome::TimedOut => None,
        }
    }

    /// Whether the deadline won
    #[inline]
    pub fn is_timed_out(&self) -> bool {
        matches!(self, RaceOutcome::TimedOut)
    }
}

/// One outbound call competing in a race
///
/// Implementors write `impl FetchTask`. [`LocalFetchTask`] is the variant
/// whose future need not be [`Send`].
#[trait_variant::make(FetchTask: Send)]
pub trait LocalFetchTask {
    /// Address the task talks to (used for logging only)
    fn address(&self) -> &str;

    /// Perform the call
    ///
    /// The task should stop early once `cancel` fires, but it is not
    /// required to.
    async fn fetch(self, cancel: CancelSignal) -> Result<Payload, FetchError>;
}
