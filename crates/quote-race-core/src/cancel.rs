use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

/// One-shot cancellation shared between a race coordinator and its tasks
///
/// Only the first call to [`CancelGuard::cancel()`] has an effect. Clones
/// share the same state.
#[derive(Clone, Debug, Default)]
pub struct CancelGuard {
    fired: Arc<AtomicBool>,
    token: CancellationToken,
}

impl CancelGuard {
    /// Create a guard that has not fired yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the cancellation
    ///
    /// Returns `true` for the call that fired it and `false` for every
    /// later call.
    pub fn cancel(&self) -> bool {
        if self
            .fired
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        self.token.cancel();
        true
    }

    /// Whether the cancellation has fired
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    /// Get a read-only view for a task
    #[inline]
    pub fn signal(&self) -> CancelSignal {
        CancelSignal {
            token: self.token.clone(),
        }
    }
}

/// Read-only view of a [`CancelGuard`]
#[derive(Clone, Debug)]
pub struct CancelSignal {
    token: CancellationToken,
}

impl CancelSignal {
    /// A signal nobody can fire
    pub fn never() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Whether cancellation was requested
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Wait until cancellation is requested
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }
}
