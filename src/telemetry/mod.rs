pub mod correlator;
pub mod error;
pub mod gate;
pub mod ports;
pub mod registry;
pub mod reporter;
pub mod submitter;
pub mod testing;
pub mod trials;
pub mod types;

pub use correlator::{Correlator, correlator_hash};
pub use error::{RegistryError, RegistryErrorKind, SubmitError, SubmitErrorKind, TrialError};
pub use gate::GateDecision;
pub use ports::{Submitter, Trial};
pub use registry::TrialRegistry;
pub use reporter::{Reporter, local_today};
pub use submitter::HttpSubmitter;
pub use trials::{ConfiguredTrial, HostInfoTrial};
pub use types::{
    ActiveWindow, CycleReport, Document, SubmissionOutcome, SubmissionRecord, TrialOutcome,
    TrialReport,
};
