use async_trait::async_trait;

use crate::telemetry::{
    error::TrialError,
    types::{ActiveWindow, Document, SubmissionOutcome, SubmissionRecord},
};

/// A pluggable telemetry source. Implementations are registered once at
/// startup and never mutated afterwards.
#[async_trait]
pub trait Trial: Send + Sync {
    /// Stable identifier; also the `type` of every record this trial submits.
    fn id(&self) -> &str;

    fn display_name(&self) -> &str;

    fn active_window(&self) -> ActiveWindow;

    /// Produces the document for this cycle. `Ok(None)` means there is
    /// nothing to report this time.
    async fn content(&self) -> Result<Option<Document>, TrialError>;
}

#[async_trait]
pub trait Submitter: Send + Sync {
    async fn send(&self, endpoint: &str, record: &SubmissionRecord) -> SubmissionOutcome;
}
