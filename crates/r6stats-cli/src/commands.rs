//! Subcommand handlers.

use std::sync::Arc;

use r6stats_core::{error_channel, AppConfig};
use r6stats_pipeline::CycleScheduler;
use r6stats_sink::MetricSink;

use crate::wiring::{self, MetadataMode};

/// Runs cycles on the configured schedule and logs background errors until
/// a shutdown signal arrives. The scheduler then stops, the running cycle is
/// awaited and the sink is flushed.
///
/// # Errors
///
/// Returns an error if startup fails or the scheduler cannot be stopped.
/// Background errors after startup are logged, never returned.
pub(crate) async fn run(config: &AppConfig) -> anyhow::Result<()> {
    let (errors_tx, mut errors_rx) = error_channel();
    let components = wiring::build(config, errors_tx, MetadataMode::Background).await?;

    tracing::info!(
        users = config.usernames.len(),
        cron = %config.collect_cron,
        "r6stats collector running"
    );
    let until_signal = async {
        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                () = &mut shutdown => break,
                Some(err) = errors_rx.recv() => {
                    tracing::error!(error = %err, "background error");
                }
            }
        }
    };
    CycleScheduler::run_until(
        Arc::clone(&components.pipeline),
        &config.collect_cron,
        until_signal,
    )
    .await?;

    components.sink.flush().await;
    while let Ok(err) = errors_rx.try_recv() {
        tracing::error!(error = %err, "background error during shutdown");
    }
    Ok(())
}

/// Runs exactly one cycle and prints its report.
///
/// # Errors
///
/// Returns an error if startup fails. A cycle with failed users or
/// categories still exits successfully; the failures are in the report.
pub(crate) async fn collect_once(config: &AppConfig) -> anyhow::Result<()> {
    let (errors_tx, mut errors_rx) = error_channel();
    let components = wiring::build(config, errors_tx, MetadataMode::SeedOnly).await?;

    let report = components.pipeline.run_cycle().await;

    let mut delivery_errors = 0_usize;
    while let Ok(err) = errors_rx.try_recv() {
        tracing::error!(error = %err, "background error");
        delivery_errors += 1;
    }

    println!("cycle at {}", report.timestamp.to_rfc3339());
    println!("  users:             {}", report.users);
    println!("  failed users:      {}", report.failed_users.join(", "));
    println!("  points written:    {}", report.points_written);
    println!("  failed categories: {}", report.failed_categories.len());
    for (username, category) in &report.failed_categories {
        println!("    {username}: {category}");
    }
    println!("  delivery errors:   {delivery_errors}");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, stopping collector");
}
