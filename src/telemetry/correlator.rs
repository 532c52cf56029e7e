use std::sync::{PoisonError, RwLock};

use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Holds the process-lifetime correlation id. Nothing is persisted, so a
/// restart produces unlinkable correlators for every trial.
#[derive(Debug, Default)]
pub struct Correlator {
    correlation_id: RwLock<Option<String>>,
}

impl Correlator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(correlation_id: impl Into<String>) -> Self {
        Self {
            correlation_id: RwLock::new(Some(correlation_id.into())),
        }
    }

    pub fn current_id(&self) -> String {
        if let Some(id) = self
            .correlation_id
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            return id.clone();
        }

        let mut guard = self
            .correlation_id
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        guard
            .get_or_insert_with(|| Uuid::new_v4().to_string())
            .clone()
    }

    /// Overrides the correlation id. Test harnesses only.
    pub fn reset(&self, correlation_id: impl Into<String>) {
        let correlation_id = correlation_id.into();
        tracing::debug!(target: "uplink", "correlation_id_reset");
        *self
            .correlation_id
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(correlation_id);
    }

    pub fn derive(&self, trial_id: &str) -> String {
        correlator_hash(&self.current_id(), trial_id)
    }
}

/// Lowercase hex SHA-256 of `correlation_id` immediately followed by `trial_id`.
pub fn correlator_hash(correlation_id: &str, trial_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(correlation_id.as_bytes());
    hasher.update(trial_id.as_bytes());
    format!("{:x}", hasher.finalize())
}
