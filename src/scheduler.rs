use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::{
    config::ScheduleConfig,
    telemetry::{CycleReport, Reporter, TrialRegistry, local_today},
};

/// Host-side timer around the reporter. Also owns the usage-statistics
/// switch: while it is off, ticks run no cycle at all.
pub struct Scheduler {
    reporter: Arc<Reporter>,
    registry: Arc<TrialRegistry>,
    enabled: Arc<AtomicBool>,
    interval: Duration,
    initial_delay: Duration,
}

impl Scheduler {
    pub fn new(
        config: &ScheduleConfig,
        reporter: Arc<Reporter>,
        registry: Arc<TrialRegistry>,
    ) -> Self {
        Self {
            reporter,
            registry,
            enabled: Arc::new(AtomicBool::new(config.enabled)),
            interval: Duration::from_millis(config.interval_ms.max(1)),
            initial_delay: Duration::from_millis(config.initial_delay_ms),
        }
    }

    pub fn enabled_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.enabled)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// One cycle for today, or `None` when collection is switched off.
    pub async fn tick(&self) -> Option<CycleReport> {
        if !self.is_enabled() {
            tracing::debug!(target: "scheduler", "usage_statistics_disabled_tick_skipped");
            return None;
        }
        Some(
            self.reporter
                .run_registered(local_today(), &self.registry)
                .await,
        )
    }

    #[tracing::instrument(name = "scheduler_run", target = "scheduler", skip(self, shutdown))]
    pub async fn run(self, shutdown: CancellationToken) {
        tracing::info!(
            target: "scheduler",
            enabled = self.is_enabled(),
            interval_ms = self.interval.as_millis() as u64,
            initial_delay_ms = self.initial_delay.as_millis() as u64,
            trial_count = self.registry.len(),
            endpoint = %self.reporter.endpoint(),
            "scheduler_started"
        );

        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!(target: "scheduler", "scheduler_stopped_before_first_cycle");
                return;
            }
            _ = tokio::time::sleep(self.initial_delay) => {}
        }

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    self.tick().await;
                }
            }
        }

        tracing::info!(target: "scheduler", "scheduler_stopped");
    }
}
