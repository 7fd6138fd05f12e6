use quote_race_core::{Payload, RaceOutcome, Strictness, TaskId};
use quote_race_engine::{Deadline, RaceFetcher};
use quote_race_tests::ScriptedTask;
use tokio::time::Instant;
use util::ms;

mod util;

#[tokio::test(start_paused = true)]
#[ntest::timeout(10_000)]
async fn test_first_task_wins_and_loser_is_cancelled() {
    let task_a = ScriptedTask::succeed("a", ms(50), "A-OK");
    let task_b = ScriptedTask::succeed("b", ms(900), "B-OK");
    let probe_b = task_b.probe();

    let start = Instant::now();
    let outcome = RaceFetcher::new(ms(1_000)).race(task_a, task_b).await;

    assert_eq!(outcome, RaceOutcome::WonBy(TaskId::A, Payload::from("A-OK")));
    assert!(
        start.elapsed() < ms(900),
        "The race must resolve as soon as A reports, not when B does."
    );
    assert!(
        probe_b.wait_ended(ms(10)).await,
        "The losing task must stop once the race is decided."
    );
    assert!(!probe_b.completed(), "The losing task must not run to the end.");
}

#[tokio::test(start_paused = true)]
#[ntest::timeout(10_000)]
async fn test_second_task_wins_when_faster() {
    let task_a = ScriptedTask::succeed("a", ms(300), "A-OK");
    let task_b = ScriptedTask::succeed("b", ms(20), "B-OK");

    let outcome = RaceFetcher::new(ms(1_000)).race(task_a, task_b).await;
    assert_eq!(outcome, RaceOutcome::WonBy(TaskId::B, Payload::from("B-OK")));
}

#[tokio::test(start_paused = true)]
#[ntest::timeout(10_000)]
async fn test_times_out_when_both_tasks_are_late() {
    let task_a = ScriptedTask::succeed("a", ms(600), "A-OK");
    let task_b = ScriptedTask::succeed("b", ms(700), "B-OK");
    let (probe_a, probe_b) = (task_a.probe(), task_b.probe());

    let start = Instant::now();
    let outcome = RaceFetcher::new(ms(500)).race(task_a, task_b).await;
    let elapsed = start.elapsed();

    assert_eq!(outcome, RaceOutcome::TimedOut);
    assert!(outcome.payload().is_none());
    assert!(elapsed >= ms(500), "Resolved before the deadline: {elapsed:?}");
    assert!(elapsed < ms(600), "Resolved after the deadline: {elapsed:?}");

    assert!(probe_a.wait_ended(ms(10)).await);
    assert!(probe_b.wait_ended(ms(10)).await);
    assert!(!probe_a.completed() && !probe_b.completed());
}

#[tokio::test(start_paused = true)]
#[ntest::timeout(10_000)]
async fn test_hanging_tasks_do_not_hold_the_race() {
    let task_a = ScriptedTask::hang("a");
    let task_b = ScriptedTask::hang("b");
    let (probe_a, probe_b) = (task_a.probe(), task_b.probe());

    let start = Instant::now();
    let outcome = RaceFetcher::new(ms(250)).race(task_a, task_b).await;

    assert!(outcome.is_timed_out());
    assert!(start.elapsed() < ms(300));
    assert!(probe_a.wait_ended(ms(10)).await);
    assert!(probe_b.wait_ended(ms(10)).await);
}

#[tokio::test(start_paused = true)]
#[ntest::timeout(10_000)]
async fn test_failed_task_forfeits_in_strict_mode() {
    let task_a = ScriptedTask::fail("a", ms(10));
    let task_b = ScriptedTask::succeed("b", ms(100), "B-OK");
    let probe_b = task_b.probe();

    let outcome = RaceFetcher::new(ms(1_000))
        .with_strictness(Strictness::Strict)
        .race(task_a, task_b)
        .await;

    assert_eq!(outcome, RaceOutcome::WonBy(TaskId::B, Payload::from("B-OK")));
    assert!(
        probe_b.completed(),
        "A failure must not cancel the task that can still win."
    );
}

#[tokio::test(start_paused = true)]
#[ntest::timeout(10_000)]
async fn test_failed_task_wins_with_empty_payload_in_lenient_mode() {
    let task_a = ScriptedTask::fail("a", ms(10));
    let task_b = ScriptedTask::succeed("b", ms(100), "B-OK");
    let probe_b = task_b.probe();

    let outcome = RaceFetcher::new(ms(1_000))
        .with_strictness(Strictness::Lenient)
        .race(task_a, task_b)
        .await;

    assert_eq!(outcome, RaceOutcome::WonBy(TaskId::A, Payload::empty()));
    assert!(probe_b.wait_ended(ms(10)).await);
    assert!(!probe_b.completed());
}

#[tokio::test(start_paused = true)]
#[ntest::timeout(10_000)]
async fn test_both_forfeit_in_strict_mode_times_out_at_deadline() {
    let task_a = ScriptedTask::fail("a", ms(10));
    let task_b = ScriptedTask::fail("b", ms(20));

    let start = Instant::now();
    let outcome = RaceFetcher::new(ms(400)).race(task_a, task_b).await;

    assert_eq!(outcome, RaceOutcome::TimedOut);
    assert!(start.elapsed() >= ms(400));
}

#[tokio::test(start_paused = true)]
#[ntest::timeout(10_000)]
async fn test_empty_success_wins_in_strict_mode() {
    let task_a = ScriptedTask::succeed("a", ms(10), "");
    let task_b = ScriptedTask::succeed("b", ms(100), "B-OK");

    let outcome = RaceFetcher::new(ms(1_000)).race(task_a, task_b).await;
    assert_eq!(outcome, RaceOutcome::WonBy(TaskId::A, Payload::empty()));
}

#[tokio::test(start_paused = true)]
#[ntest::timeout(10_000)]
async fn test_panicking_task_does_not_take_the_race_down() {
    for strictness in [Strictness::Strict, Strictness::Lenient] {
        let task_a = ScriptedTask::panic("a", ms(5));
        let task_b = ScriptedTask::succeed("b", ms(50), "B-OK");

        let outcome = RaceFetcher::new(ms(1_000))
            .with_strictness(strictness)
            .race(task_a, task_b)
            .await;
        assert_eq!(
            outcome,
            RaceOutcome::WonBy(TaskId::B, Payload::from("B-OK")),
            "{strictness:?}"
        );
    }
}

#[tokio::test(start_paused = true)]
#[ntest::timeout(10_000)]
async fn test_simultaneous_answers_pick_exactly_one_winner() {
    for _ in 0..20 {
        let task_a = ScriptedTask::succeed("a", ms(100), "A-OK");
        let task_b = ScriptedTask::succeed("b", ms(100), "B-OK");

        let outcome = RaceFetcher::new(ms(1_000)).race(task_a, task_b).await;
        match outcome {
            RaceOutcome::WonBy(TaskId::A, payload) => assert_eq!(payload.as_str(), "A-OK"),
            RaceOutcome::WonBy(TaskId::B, payload) => assert_eq!(payload.as_str(), "B-OK"),
            RaceOutcome::TimedOut => panic!("One of the tasks must win."),
        }
    }
}

#[tokio::test(start_paused = true)]
#[ntest::timeout(10_000)]
async fn test_task_answering_after_deadline_is_discarded() {
    let task_a = ScriptedTask::succeed("a", ms(150), "A-OK");
    let task_b = ScriptedTask::hang("b");
    let probe_a = task_a.probe();

    let outcome = RaceFetcher::new(ms(100)).race(task_a, task_b).await;
    assert_eq!(outcome, RaceOutcome::TimedOut);

    tokio::time::sleep(ms(200)).await;
    assert!(probe_a.ended());
    assert!(
        !probe_a.completed(),
        "A task still running at the deadline must be told to stop."
    );
}

#[tokio::test(start_paused = true)]
#[ntest::timeout(10_000)]
async fn test_deadline_counts_down() {
    let deadline = Deadline::after(ms(100));
    assert_eq!(deadline.remaining(), ms(100));
    assert!(!deadline.has_passed());

    tokio::time::sleep(ms(60)).await;
    assert_eq!(deadline.remaining(), ms(40));

    tokio::time::sleep_until(deadline.instant()).await;
    assert!(deadline.has_passed());
    assert_eq!(deadline.remaining(), ms(0));
}

#[test]
fn test_admission_rules() {
    use quote_race_core::{FetchError, TaskReport};

    let success = || TaskReport::Success(Payload::from("ok"));
    let failure = || TaskReport::Failure(FetchError::Status { status: 500 });
    let abandoned = || TaskReport::Failure(FetchError::Abandoned);

    for strictness in [Strictness::Strict, Strictness::Lenient] {
        assert!(strictness.can_win(&success()));
        assert_eq!(strictness.admit(success()), Some(Payload::from("ok")));
        assert!(!strictness.can_win(&abandoned()));
        assert_eq!(strictness.admit(abandoned()), None);
    }

    assert!(!Strictness::Strict.can_win(&failure()));
    assert_eq!(Strictness::Strict.admit(failure()), None);
    assert!(Strictness::Lenient.can_win(&failure()));
    assert_eq!(Strictness::Lenient.admit(failure()), Some(Payload::empty()));
}
