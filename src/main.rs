use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal::unix::{SignalKind, signal};
use tokio_util::sync::CancellationToken;

use uplink::{
    cli::parse_args,
    config::Config,
    host::{build_registry, build_reporter},
    logging::init_tracing,
    scheduler::Scheduler,
    telemetry::Correlator,
};

#[tokio::main]
async fn main() -> Result<()> {
    let args = parse_args()?;
    let config = Config::load(&args.config_path)
        .with_context(|| format!("failed to load config from {}", args.config_path.display()))?;
    let _logging_guard = init_tracing(&config.logging).context("failed to initialize logging")?;

    let registry = Arc::new(build_registry(&config)?);
    let reporter = Arc::new(build_reporter(&config, Arc::new(Correlator::new()))?);
    let scheduler = Scheduler::new(&config.schedule, reporter, registry);

    if args.once {
        match scheduler.tick().await {
            Some(report) => tracing::info!(
                target: "uplink",
                cycle_id = report.cycle_id,
                today = %report.today,
                delivered = report.delivered_count(),
                skipped = report.skipped_count(),
                failed = report.failed_count(),
                "single_cycle_finished"
            ),
            None => tracing::info!(target: "uplink", "usage_statistics_disabled_nothing_sent"),
        }
        return Ok(());
    }

    let mut sigint =
        signal(SignalKind::interrupt()).context("unable to listen for SIGINT (Ctrl+C)")?;
    let mut sigterm = signal(SignalKind::terminate()).context("unable to listen for SIGTERM")?;

    let shutdown = CancellationToken::new();
    let scheduler_task = tokio::spawn(scheduler.run(shutdown.clone()));

    let signal_name = tokio::select! {
        _ = sigint.recv() => "SIGINT",
        _ = sigterm.recv() => "SIGTERM",
    };

    tracing::info!(target: "uplink", signal = signal_name, "shutdown_requested");
    shutdown.cancel();
    scheduler_task.await.context("scheduler task join failed")?;

    tracing::info!(target: "uplink", signal = signal_name, "uplink_stopped");
    Ok(())
}
