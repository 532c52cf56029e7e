use std::sync::{Arc, atomic::Ordering};

use serde_json::json;
use time::{Date, macros::date};

use uplink::telemetry::{
    ActiveWindow, Correlator, Reporter, Trial, TrialOutcome, TrialRegistry, correlator_hash,
    error::{SubmitErrorKind, connect_error, serialization_error},
    testing::{RecordingSubmitter, StaticTrial},
};

use crate::support::capture_logs;

const TODAY: Date = date!(2026 - 10 - 16);
const ENDPOINT: &str = "http://uplink.test/events";
const ZERO_ID: &str = "00000000-0000-0000-0000-000000000000";

fn reporter(correlator: Arc<Correlator>, submitter: Arc<RecordingSubmitter>) -> Reporter {
    Reporter::new(ENDPOINT, correlator, submitter)
}

fn tomorrow() -> Date {
    TODAY.next_day().expect("tomorrow exists")
}

fn yesterday() -> Date {
    TODAY.previous_day().expect("yesterday exists")
}

#[tokio::test]
async fn inactive_trials_are_skipped_without_producing_content() {
    let future = StaticTrial::new("future", ActiveWindow::starting(tomorrow()));
    let past = StaticTrial::new("past", ActiveWindow::until(yesterday()));
    let future_calls = future.content_calls();
    let past_calls = past.content_calls();
    let trials: Vec<Arc<dyn Trial>> = vec![Arc::new(future), Arc::new(past)];

    let submitter = Arc::new(RecordingSubmitter::new());
    let report = reporter(Arc::new(Correlator::new()), submitter.clone())
        .run_cycle(TODAY, &trials)
        .await;

    assert_eq!(
        report.get("future").map(|r| &r.outcome),
        Some(&TrialOutcome::SkippedStartsLater)
    );
    assert_eq!(
        report.get("past").map(|r| &r.outcome),
        Some(&TrialOutcome::SkippedEnded)
    );
    assert_eq!(future_calls.load(Ordering::SeqCst), 0);
    assert_eq!(past_calls.load(Ordering::SeqCst), 0);
    assert!(submitter.sent().is_empty());
}

#[tokio::test]
async fn window_boundaries_are_inclusive_in_a_cycle() {
    let trials: Vec<Arc<dyn Trial>> = vec![
        Arc::new(StaticTrial::new("starts-today", ActiveWindow::starting(TODAY))),
        Arc::new(StaticTrial::new("ends-today", ActiveWindow::until(TODAY))),
    ];

    let submitter = Arc::new(RecordingSubmitter::new());
    let report = reporter(Arc::new(Correlator::new()), submitter.clone())
        .run_cycle(TODAY, &trials)
        .await;

    assert_eq!(report.delivered_count(), 2);
    assert_eq!(submitter.sent().len(), 2);
}

#[tokio::test]
async fn submitted_record_carries_type_correlator_and_content() {
    let content = json!({"jobs": 12, "executors": 2})
        .as_object()
        .cloned()
        .expect("object literal");
    let trials: Vec<Arc<dyn Trial>> = vec![Arc::new(
        StaticTrial::new("test-data", ActiveWindow::always()).with_content(content),
    )];

    let submitter = Arc::new(RecordingSubmitter::new());
    let correlator = Arc::new(Correlator::with_id(ZERO_ID));
    let report = reporter(correlator.clone(), submitter.clone())
        .run_cycle(TODAY, &trials)
        .await;

    let expected = correlator_hash(ZERO_ID, "test-data");
    assert_eq!(correlator.derive("test-data"), expected);

    let sent = submitter.sent();
    assert_eq!(sent.len(), 1);
    let (endpoint, record) = &sent[0];
    assert_eq!(endpoint, ENDPOINT);
    assert_eq!(
        serde_json::to_value(record).expect("record serializes"),
        json!({"type": "test-data", "correlator": expected, "jobs": 12, "executors": 2})
    );

    let trial_report = report.get("test-data").expect("trial reported");
    assert_eq!(trial_report.correlator.as_deref(), Some(expected.as_str()));
    assert_eq!(
        trial_report.outcome,
        TrialOutcome::Delivered {
            status_line: "200 OK".to_string()
        }
    );
}

#[tokio::test]
async fn distinct_trials_receive_distinct_correlators() {
    let trials: Vec<Arc<dyn Trial>> = vec![
        Arc::new(StaticTrial::new("alpha", ActiveWindow::always())),
        Arc::new(StaticTrial::new("beta", ActiveWindow::always())),
    ];

    let submitter = Arc::new(RecordingSubmitter::new());
    reporter(Arc::new(Correlator::with_id(ZERO_ID)), submitter.clone())
        .run_cycle(TODAY, &trials)
        .await;

    let alpha = submitter.sent_for("alpha");
    let beta = submitter.sent_for("beta");
    assert_eq!(alpha.len(), 1);
    assert_eq!(beta.len(), 1);
    assert_ne!(alpha[0].correlator(), beta[0].correlator());
}

#[tokio::test]
async fn reset_changes_correlators_reproducibly() {
    let trials: Vec<Arc<dyn Trial>> = vec![
        Arc::new(StaticTrial::new("alpha", ActiveWindow::always())),
        Arc::new(StaticTrial::new("beta", ActiveWindow::always())),
    ];
    let new_id = "11111111-2222-3333-4444-555555555555";

    let correlator = Arc::new(Correlator::with_id(ZERO_ID));
    let submitter = Arc::new(RecordingSubmitter::new());
    let reporter = reporter(correlator.clone(), submitter.clone());

    let before = reporter.run_cycle(TODAY, &trials).await;
    correlator.reset(new_id);
    let after = reporter.run_cycle(TODAY, &trials).await;

    let fresh_submitter = Arc::new(RecordingSubmitter::new());
    let replay = Reporter::new(
        ENDPOINT,
        Arc::new(Correlator::with_id(new_id)),
        fresh_submitter,
    )
    .run_cycle(TODAY, &trials)
    .await;

    for id in ["alpha", "beta"] {
        let before = before.get(id).and_then(|r| r.correlator.clone());
        let after = after.get(id).and_then(|r| r.correlator.clone());
        let replay = replay.get(id).and_then(|r| r.correlator.clone());
        assert_ne!(before, after, "reset must change the correlator of {id}");
        assert_eq!(after, replay, "same id and trial must reproduce the hash");
        assert_eq!(after, Some(correlator_hash(new_id, id)));
    }
    assert!(after.cycle_id > before.cycle_id);
}

#[tokio::test]
async fn transport_failure_does_not_stop_other_trials() {
    let trials: Vec<Arc<dyn Trial>> = vec![
        Arc::new(StaticTrial::new("unlucky", ActiveWindow::always())),
        Arc::new(StaticTrial::new("lucky", ActiveWindow::always())),
    ];

    let submitter = Arc::new(
        RecordingSubmitter::new().fail_for("unlucky", connect_error("connection refused")),
    );
    let report = reporter(Arc::new(Correlator::new()), submitter.clone())
        .run_cycle(TODAY, &trials)
        .await;

    assert!(matches!(
        report.get("unlucky").map(|r| &r.outcome),
        Some(TrialOutcome::TransportFailed { error }) if error.kind == SubmitErrorKind::Connect
    ));
    assert!(report.get("lucky").is_some_and(|r| r.outcome.is_delivered()));
    assert_eq!(submitter.sent().len(), 2);
    assert_eq!(report.failed_count(), 1);
}

#[tokio::test]
async fn content_failure_and_missing_data_are_isolated() {
    let trials: Vec<Arc<dyn Trial>> = vec![
        Arc::new(StaticTrial::new("broken", ActiveWindow::always()).failing("disk unreadable")),
        Arc::new(StaticTrial::new("quiet", ActiveWindow::always()).without_data()),
        Arc::new(StaticTrial::new("healthy", ActiveWindow::always())),
    ];

    let submitter = Arc::new(RecordingSubmitter::new());
    let report = reporter(Arc::new(Correlator::new()), submitter.clone())
        .run_cycle(TODAY, &trials)
        .await;

    assert!(matches!(
        report.get("broken").map(|r| &r.outcome),
        Some(TrialOutcome::ContentFailed { error }) if error.message == "disk unreadable"
    ));
    assert_eq!(
        report.get("quiet").map(|r| &r.outcome),
        Some(&TrialOutcome::SkippedNoData)
    );
    assert!(report.get("healthy").is_some_and(|r| r.outcome.is_delivered()));
    assert_eq!(submitter.sent().len(), 1);
    assert_eq!(submitter.sent_for("healthy").len(), 1);
}

#[tokio::test]
async fn panicking_trial_does_not_abort_the_cycle() {
    let trials: Vec<Arc<dyn Trial>> = vec![
        Arc::new(StaticTrial::new("explosive", ActiveWindow::always()).panicking("plugin bug")),
        Arc::new(StaticTrial::new("healthy", ActiveWindow::always())),
    ];
    let submitter = Arc::new(RecordingSubmitter::new());
    let reporter = reporter(Arc::new(Correlator::new()), submitter.clone());

    let report = tokio::spawn(async move { reporter.run_cycle(TODAY, &trials).await })
        .await
        .expect("cycle task should not panic");

    assert!(matches!(
        report.get("explosive").map(|r| &r.outcome),
        Some(TrialOutcome::ContentFailed { error }) if error.message.contains("plugin bug")
    ));
    assert!(report.get("healthy").is_some_and(|r| r.outcome.is_delivered()));
    assert_eq!(submitter.sent_for("healthy").len(), 1);
    assert!(submitter.sent_for("explosive").is_empty());
}

#[tokio::test]
async fn skip_events_name_the_trial_and_submission_events_use_its_id() {
    let (logs, _guard) = capture_logs();
    let trials: Vec<Arc<dyn Trial>> = vec![
        Arc::new(
            StaticTrial::new("future", ActiveWindow::starting(tomorrow()))
                .with_display_name("Future Trial"),
        ),
        Arc::new(
            StaticTrial::new("past", ActiveWindow::until(yesterday()))
                .with_display_name("Past Trial"),
        ),
        Arc::new(
            StaticTrial::new("test-data", ActiveWindow::always())
                .with_display_name("Test Data Trial"),
        ),
        Arc::new(
            StaticTrial::new("flaky", ActiveWindow::always()).with_display_name("Flaky Trial"),
        ),
    ];

    let submitter =
        Arc::new(RecordingSubmitter::new().fail_for("flaky", connect_error("connection refused")));
    reporter(Arc::new(Correlator::new()), submitter)
        .run_cycle(TODAY, &trials)
        .await;

    assert!(logs.contains("skipping telemetry for 'Future Trial' as it is configured to start later"));
    assert!(logs.contains("skipping telemetry for 'Past Trial' as it is configured to end in the past"));
    assert!(!logs.contains("skipping telemetry for 'future'"));
    assert!(logs.contains("reason=\"starts_later\""));
    assert!(logs.contains("reason=\"ended\""));

    assert!(logs.contains("telemetry submission received response '200 OK' for: test-data"));
    assert!(!logs.contains("for: Test Data Trial"));
    assert!(logs.contains("telemetry submission failed for: flaky: connection refused"));
    assert!(!logs.contains("for: Flaky Trial"));
    assert!(logs.contains("uplink_cycle{"));
}

#[tokio::test]
async fn serialization_failure_is_reported_as_content_failure() {
    let trials: Vec<Arc<dyn Trial>> =
        vec![Arc::new(StaticTrial::new("odd", ActiveWindow::always()))];

    let submitter = Arc::new(
        RecordingSubmitter::new().fail_for("odd", serialization_error("not representable")),
    );
    let report = reporter(Arc::new(Correlator::new()), submitter)
        .run_cycle(TODAY, &trials)
        .await;

    assert!(matches!(
        report.get("odd").map(|r| &r.outcome),
        Some(TrialOutcome::ContentFailed { .. })
    ));
}

#[tokio::test]
async fn report_preserves_input_order() {
    let trials: Vec<Arc<dyn Trial>> = vec![
        Arc::new(StaticTrial::new("c", ActiveWindow::always())),
        Arc::new(StaticTrial::new("a", ActiveWindow::until(yesterday()))),
        Arc::new(StaticTrial::new("b", ActiveWindow::always())),
    ];

    let report = reporter(
        Arc::new(Correlator::new()),
        Arc::new(RecordingSubmitter::new()),
    )
    .run_cycle(TODAY, &trials)
    .await;

    let ids: Vec<&str> = report.trials.iter().map(|r| r.trial_id.as_str()).collect();
    assert_eq!(ids, vec!["c", "a", "b"]);
    assert_eq!(report.today, TODAY);
}

#[tokio::test]
async fn empty_registry_cycle_is_a_no_op() {
    let submitter = Arc::new(RecordingSubmitter::new());
    let report = reporter(Arc::new(Correlator::new()), submitter.clone())
        .run_registered(TODAY, &TrialRegistry::new())
        .await;

    assert!(report.trials.is_empty());
    assert!(submitter.sent().is_empty());
}
