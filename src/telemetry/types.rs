use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};
use time::Date;

use crate::telemetry::error::{SubmitError, TrialError};

pub type TrialId = String;

/// Key/value payload produced by a trial; merged into the submission body.
pub type Document = Map<String, Value>;

pub const RECORD_TYPE_KEY: &str = "type";
pub const RECORD_CORRELATOR_KEY: &str = "correlator";

/// Inclusive calendar window. `None` bounds are open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ActiveWindow {
    pub start: Option<Date>,
    pub end: Option<Date>,
}

impl ActiveWindow {
    pub fn always() -> Self {
        Self::default()
    }

    pub fn between(start: Date, end: Date) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn starting(start: Date) -> Self {
        Self {
            start: Some(start),
            end: None,
        }
    }

    pub fn until(end: Date) -> Self {
        Self {
            start: None,
            end: Some(end),
        }
    }
}

impl fmt::Display for ActiveWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.start {
            Some(start) => write!(f, "[{start}")?,
            None => write!(f, "(-inf")?,
        }
        match self.end {
            Some(end) => write!(f, ", {end}]"),
            None => write!(f, ", +inf)"),
        }
    }
}

/// Body of one submission: trial content plus the engine-owned `type` and
/// `correlator` keys, which take precedence over same-named content keys.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SubmissionRecord {
    body: Map<String, Value>,
}

impl SubmissionRecord {
    pub fn assemble(trial_id: &str, correlator: &str, content: Document) -> Self {
        let mut body = content;
        body.insert(
            RECORD_TYPE_KEY.to_string(),
            Value::String(trial_id.to_string()),
        );
        body.insert(
            RECORD_CORRELATOR_KEY.to_string(),
            Value::String(correlator.to_string()),
        );
        Self { body }
    }

    pub fn trial_id(&self) -> &str {
        self.body
            .get(RECORD_TYPE_KEY)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn correlator(&self) -> &str {
        self.body
            .get(RECORD_CORRELATOR_KEY)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn body(&self) -> &Map<String, Value> {
        &self.body
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Delivered { status_line: String },
    TransportFailure { error: SubmitError },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrialOutcome {
    SkippedStartsLater,
    SkippedEnded,
    SkippedNoData,
    ContentFailed { error: TrialError },
    Delivered { status_line: String },
    TransportFailed { error: SubmitError },
}

impl TrialOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(
            self,
            TrialOutcome::SkippedStartsLater
                | TrialOutcome::SkippedEnded
                | TrialOutcome::SkippedNoData
        )
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, TrialOutcome::Delivered { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialReport {
    pub trial_id: TrialId,
    pub correlator: Option<String>,
    pub outcome: TrialOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub cycle_id: u64,
    /// Date the windows were evaluated against.
    pub today: Date,
    pub trials: Vec<TrialReport>,
}

impl CycleReport {
    pub fn get(&self, trial_id: &str) -> Option<&TrialReport> {
        self.trials.iter().find(|report| report.trial_id == trial_id)
    }

    pub fn delivered_count(&self) -> usize {
        self.trials
            .iter()
            .filter(|report| report.outcome.is_delivered())
            .count()
    }

    pub fn skipped_count(&self) -> usize {
        self.trials
            .iter()
            .filter(|report| report.outcome.is_skipped())
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.trials
            .iter()
            .filter(|report| {
                matches!(
                    report.outcome,
                    TrialOutcome::ContentFailed { .. } | TrialOutcome::TransportFailed { .. }
                )
            })
            .count()
    }
}
