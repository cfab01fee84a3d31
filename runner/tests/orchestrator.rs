mod common;

use common::{
    config, progress, result, result_with_errors, Harness, ScriptedEngine, Step, UPDATE_INTERVAL,
};
use std::time::Duration;
use tokio::sync::oneshot;
use zoyla_report::config::TestConfig;
use zoyla_runner::engine::LoadTestEngine;
use zoyla_runner::orchestrator::{resolve_cpu_cores, RunOutcome, DEFAULT_CPU_CORES};
use zoyla_runner::state::RunPhase;

#[tokio::test]
async fn should_not_start_second_run_while_running() {
    let (release, hold) = oneshot::channel();
    let harness = Harness::new(ScriptedEngine::new(vec![Step::Hold(hold)]));

    let orchestrator = harness.orchestrator.clone();
    let first = tokio::spawn(async move { orchestrator.start(&config()).await });
    let running = harness.wait_for_phase(RunPhase::Running).await;

    assert_eq!(
        harness.orchestrator.start(&config()).await,
        RunOutcome::AlreadyRunning
    );
    assert_eq!(harness.engine.executions(), 1);
    assert_eq!(
        harness.orchestrator.state().snapshot().started_at,
        running.started_at
    );

    release.send(Ok(result(10, 0))).unwrap();
    assert!(matches!(first.await.unwrap(), RunOutcome::Completed(_)));
    assert_eq!(harness.engine.executions(), 1);
}

#[tokio::test]
async fn should_reject_empty_url_without_calling_engine() {
    let harness = Harness::new(ScriptedEngine::new(vec![]));

    let outcome = harness.orchestrator.start(&TestConfig::for_url("")).await;

    assert_eq!(outcome, RunOutcome::Rejected("Please enter a URL".to_owned()));
    let snapshot = harness.orchestrator.state().snapshot();
    assert_eq!(snapshot.phase, RunPhase::Idle);
    assert_eq!(snapshot.error.as_deref(), Some("Please enter a URL"));
    assert_eq!(harness.engine.executions(), 0);
}

#[tokio::test]
async fn should_reject_non_http_url() {
    let harness = Harness::new(ScriptedEngine::new(vec![]));

    let outcome = harness
        .orchestrator
        .start(&TestConfig::for_url("ftp://example.com"))
        .await;

    assert!(matches!(outcome, RunOutcome::Rejected(_)));
    assert_eq!(harness.engine.executions(), 0);
}

#[tokio::test]
async fn should_record_compacted_history_and_reveal_error_panel() {
    let run_result = result_with_errors(2);
    let harness = Harness::new(ScriptedEngine::new(vec![Step::Complete {
        progress: vec![progress(12, 12)],
        spacing: Duration::from_millis(1),
        result: run_result.clone(),
    }]));
    let error_panel = harness.orchestrator.subscribe_error_panel();

    let outcome = harness.orchestrator.start(&config()).await;

    let RunOutcome::Completed(completed) = outcome else {
        panic!("expected completed run, got {outcome:?}");
    };
    assert_eq!(*completed, run_result);

    let snapshot = harness.orchestrator.state().snapshot();
    assert_eq!(snapshot.phase, RunPhase::Completed);
    assert!(snapshot.progress.is_none());
    assert!(snapshot.error.is_none());
    assert_eq!(snapshot.result, Some(completed));

    let entries = harness.history.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].failed_requests, 2);
    assert!(entries[0].result.results.is_empty());
    assert_eq!(entries[0].result.error_logs.len(), 2);
    assert!(*error_panel.borrow());

    harness.orchestrator.dismiss_error_panel();
    assert!(!*error_panel.borrow());
}

#[tokio::test]
async fn should_keep_error_panel_hidden_for_clean_run() {
    let harness = Harness::new(ScriptedEngine::new(vec![Step::Complete {
        progress: vec![],
        spacing: Duration::from_millis(1),
        result: result(10, 0),
    }]));
    let error_panel = harness.orchestrator.subscribe_error_panel();

    harness.orchestrator.start(&config()).await;

    assert!(!*error_panel.borrow());
}

#[tokio::test]
async fn should_transition_to_errored_without_history_entry() {
    let harness = Harness::new(ScriptedEngine::new(vec![Step::Fail(
        "connection refused".to_owned(),
    )]));

    let outcome = harness.orchestrator.start(&config()).await;

    assert_eq!(outcome, RunOutcome::Failed("connection refused".to_owned()));
    let snapshot = harness.orchestrator.state().snapshot();
    assert_eq!(snapshot.phase, RunPhase::Errored);
    assert_eq!(snapshot.error.as_deref(), Some("connection refused"));
    assert!(snapshot.progress.is_none());
    assert!(harness.history.is_empty());
}

#[tokio::test]
async fn should_allow_retry_after_error() {
    let harness = Harness::new(ScriptedEngine::new(vec![
        Step::Fail("timeout".to_owned()),
        Step::Complete {
            progress: vec![],
            spacing: Duration::from_millis(1),
            result: result(5, 0),
        },
    ]));

    harness.orchestrator.start(&config()).await;
    let outcome = harness.orchestrator.start(&config()).await;

    assert!(matches!(outcome, RunOutcome::Completed(_)));
    let snapshot = harness.orchestrator.state().snapshot();
    assert_eq!(snapshot.phase, RunPhase::Completed);
    assert!(snapshot.error.is_none());
    assert_eq!(harness.history.len(), 1);
}

#[tokio::test]
async fn should_cancel_once_engine_acknowledges() {
    let harness = Harness::new(ScriptedEngine::new(vec![Step::UntilCancelled]));

    let orchestrator = harness.orchestrator.clone();
    let run = tokio::spawn(async move { orchestrator.start(&config()).await });
    harness.wait_for_phase(RunPhase::Running).await;

    harness.orchestrator.cancel().await;

    assert_eq!(run.await.unwrap(), RunOutcome::Cancelled);
    let snapshot = harness.orchestrator.state().snapshot();
    assert_eq!(snapshot.phase, RunPhase::Cancelled);
    assert!(snapshot.error.is_none());
    assert!(snapshot.progress.is_none());
    assert!(harness.history.is_empty());
}

#[tokio::test]
async fn should_swallow_undeliverable_cancel() {
    let harness = Harness::new(ScriptedEngine::new(vec![]).rejecting_cancel());

    harness.orchestrator.cancel().await;

    assert_eq!(
        harness
            .engine
            .cancel_requests
            .load(std::sync::atomic::Ordering::SeqCst),
        1
    );
    assert_eq!(harness.orchestrator.state().phase(), RunPhase::Idle);
}

#[tokio::test]
async fn should_clear_history_selection_when_starting() {
    let harness = Harness::new(ScriptedEngine::new(vec![Step::Fail("boom".to_owned())]));
    let entry = harness.history.record(&result(1, 0), &config()).await;
    harness.history.select(Some(entry.id));

    harness.orchestrator.start(&config()).await;

    assert_eq!(harness.history.selected(), None);
}

#[tokio::test(start_paused = true)]
async fn should_coalesce_progress_and_deliver_terminal_snapshot_last() {
    let snapshots = (1..=100).map(|completed| progress(completed, 100)).collect();
    let harness = Harness::new(ScriptedEngine::new(vec![Step::Complete {
        progress: snapshots,
        spacing: Duration::from_millis(10),
        result: result(100, 0),
    }]));

    let mut state = harness.orchestrator.state().subscribe();
    let observer = tokio::spawn(async move {
        let mut delivered = Vec::new();
        while state.changed().await.is_ok() {
            let snapshot = state.borrow_and_update().clone();
            if let Some(progress) = snapshot.progress {
                delivered.push(progress.completed);
            }
            if snapshot.phase == RunPhase::Completed {
                break;
            }
        }
        delivered
    });

    let outcome = harness.orchestrator.start(&config()).await;
    assert!(matches!(outcome, RunOutcome::Completed(_)));

    let delivered = observer.await.unwrap();
    assert!(!delivered.is_empty());
    assert!(delivered.len() <= 6, "delivered {delivered:?}");
    assert_eq!(delivered.last(), Some(&100));
    assert!(harness.orchestrator.state().snapshot().progress.is_none());
}

#[tokio::test]
async fn should_adjust_recommendation_with_history() {
    let harness = Harness::new(ScriptedEngine::new(vec![]));
    harness.history.record(&result(5, 5), &config()).await;

    let recommendation = harness.orchestrator.recommendation(&config()).await;

    // 8 × 15 × 1.5 × 0.75 = 135
    assert_eq!(recommendation.suggested, 140);
    assert_eq!(recommendation.factors.history_adjustment, 0.75);
    assert_eq!(
        recommendation.warnings,
        vec!["Previous tests had 50% failure rate"]
    );
}

#[tokio::test]
async fn should_fall_back_to_engine_parallelism_then_default() {
    let engine = ScriptedEngine::new(vec![]).with_parallelism(6);
    assert_eq!(resolve_cpu_cores(12, &engine).await, 12);
    assert_eq!(resolve_cpu_cores(0, &engine).await, 6);

    let silent: &dyn LoadTestEngine = &ScriptedEngine::new(vec![]);
    assert_eq!(resolve_cpu_cores(0, silent).await, DEFAULT_CPU_CORES);
}

#[tokio::test]
async fn should_stop_listening_after_shutdown() {
    let harness = Harness::new(ScriptedEngine::new(vec![]));
    assert_eq!(harness.engine.subscriber_count(), 1);

    harness.orchestrator.shutdown().await;
    harness.orchestrator.shutdown().await;

    harness.engine.emit_progress(progress(1, 10));
    assert_eq!(harness.engine.subscriber_count(), 0);
    assert_eq!(harness.orchestrator.state().phase(), RunPhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn should_drop_deferred_progress_on_shutdown() {
    let (release, hold) = oneshot::channel();
    let harness = Harness::new(ScriptedEngine::new(vec![Step::Hold(hold)]));

    let orchestrator = harness.orchestrator.clone();
    let run = tokio::spawn(async move { orchestrator.start(&config()).await });
    harness.wait_for_phase(RunPhase::Running).await;

    harness.engine.emit_progress(progress(1, 10));
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(
        harness.orchestrator.state().snapshot().progress,
        Some(progress(1, 10))
    );

    // Arrives inside the interval, so it is held back for a later delivery.
    harness.engine.emit_progress(progress(2, 10));
    tokio::time::sleep(Duration::from_millis(1)).await;
    harness.orchestrator.shutdown().await;

    tokio::time::sleep(UPDATE_INTERVAL * 3).await;
    let snapshot = harness.orchestrator.state().snapshot();
    assert_eq!(snapshot.phase, RunPhase::Running);
    assert_eq!(snapshot.progress, Some(progress(1, 10)));

    release.send(Ok(result(10, 0))).unwrap();
    assert!(matches!(run.await.unwrap(), RunOutcome::Completed(_)));
}

#[tokio::test(start_paused = true)]
async fn should_keep_single_subscription_across_runs() {
    let steps = (0..3)
        .map(|_| Step::Complete {
            progress: vec![progress(5, 10), progress(10, 10)],
            spacing: Duration::from_millis(5),
            result: result(10, 0),
        })
        .collect();
    let harness = Harness::new(ScriptedEngine::new(steps));

    for _ in 0..3 {
        let outcome = harness.orchestrator.start(&config()).await;
        assert!(matches!(outcome, RunOutcome::Completed(_)));
        assert_eq!(harness.engine.subscriber_count(), 1);
    }

    assert_eq!(harness.engine.executions(), 3);
    assert_eq!(harness.history.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn should_ignore_late_events_of_cancelled_run_after_restart() {
    let (release, hold) = oneshot::channel();
    let harness = Harness::new(ScriptedEngine::new(vec![
        Step::AcknowledgeCancel {
            progress: progress(4, 10),
        },
        Step::Hold(hold),
    ]));

    assert_eq!(
        harness.orchestrator.start(&config()).await,
        RunOutcome::Cancelled
    );

    // The first run's progress and acknowledgement are still queued for the
    // listener when the next run starts.
    let second_config = config();
    let second = harness.orchestrator.start(&second_config);
    tokio::pin!(second);
    assert!(tokio::time::timeout(Duration::from_millis(50), &mut second)
        .await
        .is_err());

    let snapshot = harness.orchestrator.state().snapshot();
    assert_eq!(snapshot.phase, RunPhase::Running);
    assert!(snapshot.progress.is_none());
    assert_eq!(harness.engine.executions(), 2);

    release.send(Ok(result(10, 0))).unwrap();
    assert!(matches!(second.await, RunOutcome::Completed(_)));
    assert_eq!(harness.history.len(), 1);
    assert_eq!(
        harness.orchestrator.state().phase(),
        RunPhase::Completed
    );
}

#[tokio::test]
async fn should_send_trimmed_url_to_engine_and_history() {
    let harness = Harness::new(ScriptedEngine::new(vec![Step::Complete {
        progress: vec![],
        spacing: Duration::from_millis(1),
        result: result(9, 1),
    }]));

    let outcome = harness
        .orchestrator
        .start(&TestConfig::for_url("  https://example.com/health  "))
        .await;

    assert!(matches!(outcome, RunOutcome::Completed(_)));
    assert_eq!(harness.engine.received()[0].url, "https://example.com/health");
    assert_eq!(harness.history.entries()[0].url(), "https://example.com/health");
    assert_eq!(
        harness.history.past_success_rate("https://example.com/health"),
        Some(90.0)
    );
}
