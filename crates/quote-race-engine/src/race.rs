//! Race of two fetch tasks against a deadline
use std::time::Duration;

use quote_race_core::{
    CancelGuard, FetchError, FetchTask, RaceOutcome, Strictness, TaskId, TaskReport,
};
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::debug;

/// Absolute point in time after which waiting is abandoned
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct Deadline(Instant);

impl Deadline {
    /// The deadline `duration` from now
    #[inline]
    pub fn after(duration: Duration) -> Self {
        Self(Instant::now() + duration)
    }

    /// The deadline as an [`Instant`]
    #[inline]
    pub fn instant(self) -> Instant {
        self.0
    }

    /// Time left until the deadline (zero once it has passed)
    #[inline]
    pub fn remaining(self) -> Duration {
        self.0.saturating_duration_since(Instant::now())
    }

    /// Whether the deadline has passed
    #[inline]
    pub fn has_passed(self) -> bool {
        Instant::now() >= self.0
    }
}

/// Races two [`FetchTask`]s against each other and against a deadline
#[derive(Clone, Copy, Debug)]
pub struct RaceFetcher {
    /// Deadline measured from the start of each race
    deadline: Duration,
    strictness: Strictness,
}

impl RaceFetcher {
    /// Create a fetcher with the given deadline and [`Strictness::Strict`]
    pub fn new(deadline: Duration) -> Self {
        Self {
            deadline,
            strictness: Strictness::default(),
        }
    }

    /// Set how failed tasks are treated
    pub fn with_strictness(mut self, strictness: Strictness) -> Self {
        self.strictness = strictness;
        self
    }

    /// The deadline of each race
    #[inline]
    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// How failed tasks are treated
    #[inline]
    pub fn strictness(&self) -> Strictness {
        self.strictness
    }

    /// Run both tasks concurrently and resolve to whichever of the two
    /// tasks and the deadline is ready first
    ///
    /// Returns within the deadline even if neither task ever completes. The
    /// losing task is told to cancel and its result, if any, is dropped.
    pub async fn race<A, B>(&self, task_a: A, task_b: B) -> RaceOutcome
    where
        A: FetchTask + Send + 'static,
        B: FetchTask + Send + 'static,
    {
        let deadline = Deadline::after(self.deadline);
        let guard = CancelGuard::new();

        let mut rx_a = self.launch(TaskId::A, task_a, &guard);
        let mut rx_b = self.launch(TaskId::B, task_b, &guard);

        let expiry = tokio::time::sleep_until(deadline.instant());
        tokio::pin!(expiry);

        let mut a_pending = true;
        let mut b_pending = true;
        let outcome = loop {
            let (id, received) = tokio::select! {
                received = &mut rx_a, if a_pending => {
                    a_pending = false;
                    (TaskId::A, received)
                }
                received = &mut rx_b, if b_pending => {
                    b_pending = false;
                    (TaskId::B, received)
                }
                () = &mut expiry => break RaceOutcome::TimedOut,
            };

            // A closed channel means the task went away without reporting.
            let report = received.unwrap_or(TaskReport::Failure(FetchError::Abandoned));
            if let TaskReport::Failure(err) = &report {
                debug!(task = %id, %err, "task reported a failure");
            }
            match self.strictness.admit(report) {
                Some(payload) => break RaceOutcome::WonBy(id, payload),
                None => debug!(task = %id, "task forfeited"),
            }
        };

        if guard.cancel() {
            debug!("race resolved before any task asked for cancellation");
        }
        debug!(?outcome, "race resolved");
        outcome
    }

    /// Spawn `task` and hand out the receiving end of its result channel
    fn launch<T>(&self, id: TaskId, task: T, guard: &CancelGuard) -> oneshot::Receiver<TaskReport>
    where
        T: FetchTask + Send + 'static,
    {
        let (sender, receiver) = oneshot::channel();
        let guard = guard.clone();
        let strictness = self.strictness;

        tokio::spawn(async move {
            let address = task.address().to_owned();
            let signal = guard.signal();
            debug!(task = %id, %address, "fetch started");

            let result = tokio::select! {
                result = task.fetch(signal.clone()) => result,
                () = signal.cancelled() => Err(FetchError::Cancelled),
            };

            // The race is already decided, nobody is listening.
            if let Err(FetchError::Cancelled) = result {
                debug!(task = %id, %address, "fetch cancelled");
                return;
            }

            let report = TaskReport::from(result);
            let can_win = strictness.can_win(&report);
            if sender.send(report).is_err() {
                debug!(task = %id, "result discarded, race already decided");
            }
            if can_win && guard.cancel() {
                debug!(task = %id, "cancelled the other task");
            }
        });

        receiver
    }
}
