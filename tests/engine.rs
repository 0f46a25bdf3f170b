use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use tether::assert::expect;
use tether::models::FailureKind;
use tether::{Engine, Registry, Selection, TestStatus};

type Log = Arc<Mutex<Vec<String>>>;

fn log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

fn push(log: &Log, entry: &str) {
    log.lock().unwrap().push(entry.to_string());
}

#[tokio::test]
async fn math_group_runs_in_order_with_hooks() {
    let events = log();
    let mut registry = Registry::new();

    let (before, after, first, second) = (
        events.clone(),
        events.clone(),
        events.clone(),
        events.clone(),
    );
    registry.describe("math", move |group| {
        group
            .before_each(move || {
                let log = before.clone();
                async move {
                    push(&log, "before");
                    Ok(())
                }
            })
            .after_each(move || {
                let log = after.clone();
                async move {
                    push(&log, "after");
                    Ok(())
                }
            })
            .it("adds", move || {
                let log = first.clone();
                async move {
                    push(&log, "adds");
                    expect(2 + 2).to_be(4)?;
                    Ok(())
                }
            })
            .it("multiplies wrongly", move || {
                let log = second.clone();
                async move {
                    push(&log, "multiplies");
                    expect(2 * 3).to_be(5)?;
                    Ok(())
                }
            });
    });

    let report = Engine::new().run(&registry).await;

    assert_eq!(report.group_reports.len(), 1);
    let group = &report.group_reports[0];
    assert_eq!(group.description, "math");
    assert_eq!(group.outcomes.len(), 2);
    assert_eq!(group.outcomes[0].description, "adds");
    assert_eq!(group.outcomes[0].status, TestStatus::Passed);
    assert_eq!(group.outcomes[1].status, TestStatus::Failed);
    let failure = group.outcomes[1].failure.as_ref().unwrap();
    assert_eq!(failure.message, "Expected 6 to be 5");
    assert_eq!(failure.kind, FailureKind::Error);

    assert_eq!(
        *events.lock().unwrap(),
        ["before", "adds", "after", "before", "multiplies", "after"]
    );
    assert!(report.has_failures());
    let summary = report.summary();
    assert_eq!((summary.total, summary.passed, summary.failed), (2, 1, 1));
    assert!(group.started_at <= group.ended_at);
}

#[tokio::test]
async fn failing_before_each_skips_effect_and_after_each() {
    let effect_runs = Arc::new(AtomicUsize::new(0));
    let after_runs = Arc::new(AtomicUsize::new(0));
    let mut registry = Registry::new();

    let (effect, after) = (effect_runs.clone(), after_runs.clone());
    registry.describe("setup fails", move |group| {
        group
            .before_each(|| async { Err::<(), _>(anyhow::anyhow!("database unavailable")) })
            .after_each(move || {
                let after = after.clone();
                async move {
                    after.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .it("never runs", move || {
                let effect = effect.clone();
                async move {
                    effect.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            });
    });

    let report = Engine::new().run(&registry).await;
    let outcome = &report.group_reports[0].outcomes[0];

    assert_eq!(outcome.status, TestStatus::Failed);
    assert_eq!(
        outcome.failure.as_ref().unwrap().message,
        "database unavailable"
    );
    assert_eq!(effect_runs.load(Ordering::SeqCst), 0);
    assert_eq!(after_runs.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn after_each_failure_fails_a_passing_case_and_later_hooks_still_run() {
    let second_hook = Arc::new(AtomicUsize::new(0));
    let mut registry = Registry::new();

    let counter = second_hook.clone();
    registry.describe("teardown", move |group| {
        group
            .after_each(|| async { Err::<(), _>(anyhow::anyhow!("cleanup failed")) })
            .after_each(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(anyhow::anyhow!("second cleanup failed"))
                }
            })
            .it("passes on its own", || async { Ok(()) });
    });

    let report = Engine::new().run(&registry).await;
    let outcome = &report.group_reports[0].outcomes[0];

    assert_eq!(outcome.status, TestStatus::Failed);
    assert_eq!(outcome.failure.as_ref().unwrap().message, "cleanup failed");
    assert_eq!(second_hook.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn timeout_fails_within_the_limit_and_the_run_continues() {
    let mut registry = Registry::new();
    registry.describe("slow", |group| {
        group
            .it_with_timeout("hangs", Duration::from_millis(50), || async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(())
            })
            .it("still runs", || async { Ok(()) });
    });

    let started = Instant::now();
    let report = Engine::new().run(&registry).await;
    assert!(started.elapsed() < Duration::from_secs(5));

    let outcomes = &report.group_reports[0].outcomes;
    let failure = outcomes[0].failure.as_ref().unwrap();
    assert!(failure.is_timeout());
    assert_eq!(failure.message, "Test timed out after 50ms");
    assert!(outcomes[0].duration_ms >= 50.0);
    assert_eq!(outcomes[1].status, TestStatus::Passed);
}

#[tokio::test]
async fn group_timeout_applies_and_case_timeout_wins() {
    let mut registry = Registry::new();
    registry.describe("timeouts", |group| {
        group
            .timeout(Duration::from_millis(30))
            .it("uses group limit", || async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(())
            })
            .it_with_timeout("own limit", Duration::from_millis(500), || async {
                tokio::time::sleep(Duration::from_millis(60)).await;
                Ok(())
            });
    });

    let report = Engine::new().run(&registry).await;
    let outcomes = &report.group_reports[0].outcomes;
    assert_eq!(
        outcomes[0].failure.as_ref().unwrap().message,
        "Test timed out after 30ms"
    );
    assert_eq!(outcomes[1].status, TestStatus::Passed);
}

#[tokio::test]
async fn panics_are_recorded_as_failures() {
    let mut registry = Registry::new();
    registry.describe("panics", |group| {
        group
            .it("explodes", || async {
                let items: Vec<u8> = Vec::new();
                let _ = items[3];
                Ok(())
            })
            .it("recovers", || async { Ok(()) });
    });

    let report = Engine::new().run(&registry).await;
    let outcomes = &report.group_reports[0].outcomes;
    let failure = outcomes[0].failure.as_ref().unwrap();
    assert_eq!(failure.kind, FailureKind::Panic);
    assert!(failure.message.contains("index out of bounds"));
    assert_eq!(outcomes[1].status, TestStatus::Passed);
}

#[tokio::test]
async fn empty_group_has_zero_average() {
    let mut registry = Registry::new();
    registry.describe("empty", |_| {});

    let report = Engine::new().run(&registry).await;
    let group = &report.group_reports[0];
    assert!(group.outcomes.is_empty());
    assert_eq!(group.total_duration_ms(), 0.0);
    assert_eq!(group.average_duration_ms(), 0.0);
    assert!(!report.has_failures());
}

#[tokio::test]
async fn abort_interrupts_in_flight_case_and_skips_the_rest() {
    let mut registry = Registry::new();
    registry.describe("first", |group| {
        group
            .it("quick", || async { Ok(()) })
            .it("hangs", || async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(())
            })
            .it("unreached", || async { Ok(()) });
    });
    registry.describe("second", |group| {
        group.it("also unreached", || async { Ok(()) });
    });

    let engine = Engine::new();
    let abort = engine.abort_handle();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        abort.abort();
    });

    let report = engine.run(&registry).await;
    let first = &report.group_reports[0].outcomes;
    assert_eq!(first.len(), 3);
    assert_eq!(first[0].status, TestStatus::Passed);
    assert_eq!(first[1].status, TestStatus::Failed);
    assert_eq!(
        first[1].failure.as_ref().unwrap().kind,
        FailureKind::Interrupted
    );
    assert_eq!(first[2].status, TestStatus::Skipped);

    let second = &report.group_reports[1].outcomes;
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].status, TestStatus::Skipped);
    assert_eq!(report.summary().skipped, 2);
}

#[tokio::test]
async fn engine_runs_again_after_an_aborted_run() {
    let mut hanging = Registry::new();
    hanging.describe("stuck", |group| {
        group.it("hangs", || async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(())
        });
    });
    let mut quick = Registry::new();
    quick.describe("quick", |group| {
        group.it("a", || async { Ok(()) }).it("b", || async { Ok(()) });
    });

    let engine = Engine::new();
    let abort = engine.abort_handle();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        abort.abort();
    });
    let aborted = engine.run(&hanging).await;
    assert_eq!(
        aborted.group_reports[0].outcomes[0].failure.as_ref().unwrap().kind,
        FailureKind::Interrupted
    );

    let rerun = engine.run(&quick).await;
    let summary = rerun.summary();
    assert_eq!((summary.passed, summary.skipped), (2, 0));
}

#[tokio::test]
async fn selection_runs_only_named_groups() {
    let mut registry = Registry::new();
    registry.describe("math", |group| {
        group.it("adds", || async { Ok(()) });
    });
    registry.describe("strings", |group| {
        group.it("concats", || async { Ok(()) });
    });

    let report = Engine::new()
        .run_selected(&registry, &Selection::groups(["strings"]))
        .await;
    assert_eq!(report.group_reports.len(), 1);
    assert_eq!(report.group_reports[0].description, "strings");
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn outcomes_follow_declaration_order(verdicts in prop::collection::vec(any::<bool>(), 0..12)) {
        let mut registry = Registry::new();
        let declared = verdicts.clone();
        registry.describe("generated", move |group| {
            for (index, passes) in declared.into_iter().enumerate() {
                group.it(format!("case {index}"), move || async move {
                    if passes { Ok(()) } else { Err(anyhow::anyhow!("case {index} failed")) }
                });
            }
        });

        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let report = runtime.block_on(Engine::new().run(&registry));
        let outcomes = &report.group_reports[0].outcomes;

        prop_assert_eq!(outcomes.len(), verdicts.len());
        for (index, (outcome, passes)) in outcomes.iter().zip(&verdicts).enumerate() {
            prop_assert_eq!(&outcome.description, &format!("case {index}"));
            let expected = if *passes { TestStatus::Passed } else { TestStatus::Failed };
            prop_assert_eq!(outcome.status, expected);
            prop_assert!(outcome.duration_ms >= 0.0);
        }
    }
}
