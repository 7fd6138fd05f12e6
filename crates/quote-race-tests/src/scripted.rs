//! Fetch tasks with scripted timing and results

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use quote_race_core::{CancelSignal, FetchError, FetchTask, Payload};

#[derive(Clone, Debug)]
enum Script {
    Succeed(String),
    Fail,
    Panic,
    Hang,
}

/// What happened to a [`ScriptedTask`]
#[derive(Clone, Default, Debug)]
pub struct TaskProbe {
    started: Arc<AtomicBool>,
    completed: Arc<AtomicBool>,
    saw_cancel: Arc<AtomicBool>,
    ended: Arc<AtomicBool>,
}

impl TaskProbe {
    /// The task's call was started
    pub fn started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// The task reached its scripted result
    pub fn completed(&self) -> bool {
        self.completed.load(Ordering::SeqCst)
    }

    /// The task itself noticed the cancel signal
    pub fn saw_cancel(&self) -> bool {
        self.saw_cancel.load(Ordering::SeqCst)
    }

    /// The task's call is gone, either finished or dropped
    pub fn ended(&self) -> bool {
        self.ended.load(Ordering::SeqCst)
    }

    /// Wait (in task time) until the call is gone
    pub async fn wait_ended(&self, within: Duration) -> bool {
        let give_up = tokio::time::Instant::now() + within;
        while !self.ended() {
            if tokio::time::Instant::now() >= give_up {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        true
    }
}

/// Marks the probe when the call's future goes away
struct EndGuard(TaskProbe);

impl Drop for EndGuard {
    fn drop(&mut self) {
        self.0.ended.store(true, Ordering::SeqCst);
    }
}

/// A [`FetchTask`] that waits for a fixed delay, then does what it was told
#[derive(Clone, Debug)]
pub struct ScriptedTask {
    address: String,
    delay: Option<Duration>,
    script: Script,
    probe: TaskProbe,
}

impl ScriptedTask {
    fn new(address: &str, delay: Option<Duration>, script: Script) -> Self {
        Self {
            address: address.to_owned(),
            delay,
            script,
            probe: TaskProbe::default(),
        }
    }

    /// Answer `payload` after `delay`
    pub fn succeed(address: &str, delay: Duration, payload: &str) -> Self {
        Self::new(address, Some(delay), Script::Succeed(payload.to_owned()))
    }

    /// Fail with status 503 after `delay`
    pub fn fail(address: &str, delay: Duration) -> Self {
        Self::new(address, Some(delay), Script::Fail)
    }

    /// Panic after `delay`
    pub fn panic(address: &str, delay: Duration) -> Self {
        Self::new(address, Some(delay), Script::Panic)
    }

    /// Never answer
    pub fn hang(address: &str) -> Self {
        Self::new(address, None, Script::Hang)
    }

    pub fn probe(&self) -> TaskProbe {
        self.probe.clone()
    }
}

impl FetchTask for ScriptedTask {
    fn address(&self) -> &str {
        &self.address
    }

    async fn fetch(self, cancel: CancelSignal) -> Result<Payload, FetchError> {
        self.probe.started.store(true, Ordering::SeqCst);
        let _end = EndGuard(self.probe.clone());

        let wait = async {
            match self.delay {
                Some(delay) => tokio::time::sleep(delay).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::select! {
            () = wait => {}
            () = cancel.cancelled() => {
                self.probe.saw_cancel.store(true, Ordering::SeqCst);
                return Err(FetchError::Cancelled);
            }
        }

        self.probe.completed.store(true, Ordering::SeqCst);
        match self.script {
            Script::Succeed(payload) => Ok(Payload::new(payload)),
            Script::Fail => Err(FetchError::Status { status: 503 }),
            Script::Panic => panic!("scripted task {} panicked", self.address),
            Script::Hang => std::future::pending().await,
        }
    }
}
