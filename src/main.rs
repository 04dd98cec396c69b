//! Supervisor: wires config, DB, bus, caches and tasks together, then waits
//! for a shutdown signal or an engine failure.
//!
//! Exit codes: 0 on clean shutdown, 1 when the bus or DB cannot be reached at
//! startup (or the engine dies on an unrecoverable error).

mod appconfig;
mod cache;
mod cli;
mod codec;
mod consumer;
mod db;
mod error;
mod notify;
mod records;
mod sql;
mod stats;
mod subs;
mod writer;

use crate::appconfig::AppConfig;
use crate::cli::Cli;
use crate::consumer::ConsumerEngine;
use crate::error::AppResult;
use crate::stats::Stats;
use crate::subs::SubscriptionTable;
use clap::Parser;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli);

    if let Err(e) = run(cli).await {
        error!(error = %e, "aggregator failed");
        std::process::exit(1);
    }
}

fn init_tracing(cli: &Cli) {
    let filter = cli
        .log_level
        .clone()
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();
}

async fn run(cli: Cli) -> AppResult<()> {
    let cfg = Arc::new(AppConfig::load(&cli.config)?);
    info!(config = %cli.config, "configuration loaded");

    let cancel = CancellationToken::new();
    let subs = Arc::new(SubscriptionTable::new(
        cfg.kafka.subscription_timeout_seconds,
    ));
    let stats = Arc::new(Stats::new());

    // Fatal here: bus client or DB unreachable at startup.
    let engine = ConsumerEngine::new(
        Arc::clone(&cfg),
        Arc::clone(&subs),
        Arc::clone(&stats),
        cancel.clone(),
    )
    .await?;

    let sweeper = tokio::spawn(subs::run_sweeper(Arc::clone(&subs), cancel.clone()));
    let stats_task = tokio::spawn(stats::run_stats_loop(
        Arc::clone(&stats),
        cfg.base.stats_interval,
        cfg.base.heartbeat_max_age,
        cancel.clone(),
    ));

    let mut engine_task = tokio::spawn(engine.run());

    let engine_result: AppResult<()> = tokio::select! {
        _ = shutdown_signal() => {
            info!("shutdown signal received");
            cancel.cancel();
            // The engine drains intake and stops its writers on the way out.
            (&mut engine_task).await?
        }
        result = &mut engine_task => {
            cancel.cancel();
            result?
        }
    };

    let _ = sweeper.await;
    let _ = stats_task.await;

    engine_result?;
    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = term.recv() => {}
                }
            }
            Err(_) => {
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
    }
}
