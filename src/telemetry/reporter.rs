use std::{
    any::Any,
    panic::AssertUnwindSafe,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use futures_util::{FutureExt, future::join_all};
use time::{Date, OffsetDateTime};

use crate::telemetry::{
    correlator::Correlator,
    error::{SubmitErrorKind, TrialError},
    gate::{self, GateDecision},
    ports::{Submitter, Trial},
    registry::TrialRegistry,
    types::{
        CycleReport, RECORD_CORRELATOR_KEY, RECORD_TYPE_KEY, SubmissionOutcome, SubmissionRecord,
        TrialOutcome, TrialReport,
    },
};

/// Runs collection cycles. Holds no timer; the host decides when to call.
pub struct Reporter {
    endpoint: String,
    correlator: Arc<Correlator>,
    submitter: Arc<dyn Submitter>,
    cycle_id: AtomicU64,
}

impl Reporter {
    pub fn new(
        endpoint: impl Into<String>,
        correlator: Arc<Correlator>,
        submitter: Arc<dyn Submitter>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            correlator,
            submitter,
            cycle_id: AtomicU64::new(0),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn run_registered(&self, today: Date, registry: &TrialRegistry) -> CycleReport {
        self.run_cycle(today, &registry.trials()).await
    }

    /// One pass over `trials`. Trials are handled concurrently and every
    /// per-trial failure is folded into the report, panics included.
    #[tracing::instrument(
        name = "uplink_cycle",
        target = "uplink",
        skip(self, trials),
        fields(cycle_id = tracing::field::Empty, trial_count = trials.len())
    )]
    pub async fn run_cycle(&self, today: Date, trials: &[Arc<dyn Trial>]) -> CycleReport {
        let cycle_id = self.cycle_id.fetch_add(1, Ordering::Relaxed).saturating_add(1);
        tracing::Span::current().record("cycle_id", cycle_id);

        let reports = join_all(
            trials
                .iter()
                .map(|trial| self.guarded_trial(cycle_id, today, trial.as_ref())),
        )
        .await;

        let report = CycleReport {
            cycle_id,
            today,
            trials: reports,
        };
        tracing::debug!(
            target: "uplink",
            cycle_id,
            %today,
            delivered = report.delivered_count(),
            skipped = report.skipped_count(),
            failed = report.failed_count(),
            "cycle_completed"
        );
        report
    }

    async fn guarded_trial(&self, cycle_id: u64, today: Date, trial: &dyn Trial) -> TrialReport {
        let trial_id = trial.id().to_string();
        AssertUnwindSafe(self.process_trial(cycle_id, today, trial))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| trial_panicked(cycle_id, trial_id, payload))
    }

    async fn process_trial(&self, cycle_id: u64, today: Date, trial: &dyn Trial) -> TrialReport {
        let trial_id = trial.id().to_string();
        let display_name = trial.display_name();

        let decision = gate::evaluate(&trial.active_window(), today);
        match decision {
            GateDecision::StartsLater => {
                tracing::info!(
                    target: "uplink",
                    cycle_id,
                    trial_id = %trial_id,
                    reason = decision.reason(),
                    "skipping telemetry for '{}' as it is configured to start later",
                    display_name
                );
                return skipped(trial_id, TrialOutcome::SkippedStartsLater);
            }
            GateDecision::Ended => {
                tracing::info!(
                    target: "uplink",
                    cycle_id,
                    trial_id = %trial_id,
                    reason = decision.reason(),
                    "skipping telemetry for '{}' as it is configured to end in the past",
                    display_name
                );
                return skipped(trial_id, TrialOutcome::SkippedEnded);
            }
            GateDecision::Active => {}
        }

        let correlator = self.correlator.derive(&trial_id);

        let content = match trial.content().await {
            Ok(Some(content)) => content,
            Ok(None) => {
                tracing::info!(
                    target: "uplink",
                    cycle_id,
                    trial_id = %trial_id,
                    "skipping telemetry for '{}' as it has no data",
                    display_name
                );
                return skipped(trial_id, TrialOutcome::SkippedNoData);
            }
            Err(error) => {
                return content_failed(cycle_id, trial_id, correlator, error);
            }
        };

        for reserved in [RECORD_TYPE_KEY, RECORD_CORRELATOR_KEY] {
            if content.contains_key(reserved) {
                tracing::debug!(
                    target: "uplink",
                    cycle_id,
                    trial_id = %trial_id,
                    key = reserved,
                    "content_key_overridden"
                );
            }
        }
        let record = SubmissionRecord::assemble(&trial_id, &correlator, content);

        let outcome = match self.submitter.send(&self.endpoint, &record).await {
            SubmissionOutcome::Delivered { status_line } => {
                tracing::info!(
                    target: "uplink",
                    cycle_id,
                    trial_id = %trial_id,
                    status = %status_line,
                    "telemetry submission received response '{}' for: {}",
                    status_line,
                    trial_id
                );
                TrialOutcome::Delivered { status_line }
            }
            SubmissionOutcome::TransportFailure { error }
                if error.kind == SubmitErrorKind::Serialization =>
            {
                return content_failed(
                    cycle_id,
                    trial_id,
                    correlator,
                    TrialError::new(error.message),
                );
            }
            SubmissionOutcome::TransportFailure { error } => {
                tracing::warn!(
                    target: "uplink",
                    cycle_id,
                    trial_id = %trial_id,
                    error_kind = ?error.kind,
                    "telemetry submission failed for: {}: {}",
                    trial_id,
                    error
                );
                TrialOutcome::TransportFailed { error }
            }
        };

        TrialReport {
            trial_id,
            correlator: Some(correlator),
            outcome,
        }
    }
}

fn skipped(trial_id: String, outcome: TrialOutcome) -> TrialReport {
    TrialReport {
        trial_id,
        correlator: None,
        outcome,
    }
}

fn content_failed(
    cycle_id: u64,
    trial_id: String,
    correlator: String,
    error: TrialError,
) -> TrialReport {
    tracing::warn!(
        target: "uplink",
        cycle_id,
        trial_id = %trial_id,
        "failed to build telemetry content for: {}: {}",
        trial_id,
        error
    );
    TrialReport {
        trial_id,
        correlator: Some(correlator),
        outcome: TrialOutcome::ContentFailed { error },
    }
}

fn trial_panicked(cycle_id: u64, trial_id: String, payload: Box<dyn Any + Send>) -> TrialReport {
    let message = payload
        .downcast_ref::<&str>()
        .map(|message| message.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string());
    tracing::warn!(
        target: "uplink",
        cycle_id,
        trial_id = %trial_id,
        "trial panicked while building telemetry content for: {}: {}",
        trial_id,
        message
    );
    TrialReport {
        trial_id,
        correlator: None,
        outcome: TrialOutcome::ContentFailed {
            error: TrialError::new(format!("trial panicked: {message}")),
        },
    }
}

/// Host-local calendar date, falling back to UTC when the local offset
/// cannot be determined.
pub fn local_today() -> Date {
    OffsetDateTime::now_local()
        .unwrap_or_else(|_| OffsetDateTime::now_utc())
        .date()
}
