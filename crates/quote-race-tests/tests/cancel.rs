use std::time::Duration;

use quote_race_core::{CancelGuard, CancelSignal};

#[test]
fn test_cancel_twice_is_cancel_once() {
    let guard = CancelGuard::new();
    let signal = guard.signal();
    assert!(!guard.is_cancelled());
    assert!(!signal.is_cancelled());

    assert!(guard.cancel(), "The first cancellation must fire.");
    assert!(!guard.cancel(), "A second cancellation must be a no-op.");
    assert!(guard.is_cancelled());
    assert!(signal.is_cancelled());
}

#[test]
fn test_clones_share_one_guard() {
    let guard = CancelGuard::new();
    let other = guard.clone();

    assert!(other.cancel());
    assert!(!guard.cancel());
    assert!(guard.signal().is_cancelled());
}

#[test]
fn test_never_signal_stays_quiet() {
    assert!(!CancelSignal::never().is_cancelled());
}

#[tokio::test]
#[ntest::timeout(5_000)]
async fn test_signal_wakes_waiters() {
    let guard = CancelGuard::new();
    let signal = guard.signal();

    let waiter = tokio::spawn(async move { signal.cancelled().await });
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(!waiter.is_finished());

    guard.cancel();
    waiter.await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(5_000)]
async fn test_concurrent_cancellation_fires_exactly_once() {
    let guard = CancelGuard::new();
    let handles: Vec<_> = (0..16)
        .map(|_| {
            let guard = guard.clone();
            tokio::spawn(async move { guard.cancel() })
        })
        .collect();

    let mut fired = 0;
    for handle in handles {
        if handle.await.unwrap() {
            fired += 1;
        }
    }
    assert_eq!(fired, 1, "Exactly one caller must fire the cancellation.");
}
