use std::sync::Arc;

use anyhow::{Context, Result};

use crate::{
    config::Config,
    telemetry::{Correlator, HostInfoTrial, HttpSubmitter, Reporter, Trial, TrialRegistry},
};

/// Registers the built-in host trial (if enabled) followed by every trial
/// declared in config, in file order.
pub fn build_registry(config: &Config) -> Result<TrialRegistry> {
    let registry = TrialRegistry::new();
    if config.host_info_trial {
        registry
            .register(Arc::new(HostInfoTrial))
            .context("failed to register host info trial")?;
    }
    for trial in config.configured_trials()? {
        let trial: Arc<dyn Trial> = Arc::new(trial);
        let trial_id = trial.id().to_string();
        registry
            .register(trial)
            .with_context(|| format!("failed to register configured trial '{trial_id}'"))?;
    }
    Ok(registry)
}

pub fn build_reporter(config: &Config, correlator: Arc<Correlator>) -> Result<Reporter> {
    let submitter = HttpSubmitter::new(config.uplink.request_timeout_ms)
        .context("failed to construct http submitter")?;
    Ok(Reporter::new(
        config.uplink.endpoint.clone(),
        correlator,
        Arc::new(submitter),
    ))
}
