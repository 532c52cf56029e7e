use std::sync::{Arc, PoisonError, RwLock};

use crate::telemetry::{
    error::{RegistryError, duplicate_id, invalid_registration},
    ports::Trial,
};

/// Registration list of trials, filled once at startup. Cycles only ever
/// read snapshots of it.
#[derive(Default)]
pub struct TrialRegistry {
    trials: RwLock<Vec<Arc<dyn Trial>>>,
}

impl std::fmt::Debug for TrialRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrialRegistry")
            .field("trial_count", &self.len())
            .finish_non_exhaustive()
    }
}

impl TrialRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, trial: Arc<dyn Trial>) -> Result<(), RegistryError> {
        let trial_id = trial.id();
        if trial_id.trim().is_empty() {
            return Err(invalid_registration("trial id cannot be empty"));
        }

        let mut trials = self.trials.write().unwrap_or_else(PoisonError::into_inner);
        if trials.iter().any(|existing| existing.id() == trial_id) {
            return Err(duplicate_id(format!(
                "trial already registered: {trial_id}"
            )));
        }

        tracing::debug!(
            target: "uplink",
            trial_id = %trial_id,
            display_name = %trial.display_name(),
            window = %trial.active_window(),
            "trial_registered"
        );
        trials.push(trial);
        Ok(())
    }

    /// Snapshot in registration order.
    pub fn trials(&self) -> Vec<Arc<dyn Trial>> {
        self.trials
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.trials.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
