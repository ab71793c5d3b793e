//! Neurocast Bridge: LSL biosignal stream to OSC

use anyhow::Context;
use clap::Parser;
use neurocast_bridge::cli::Cli;
use neurocast_bridge::run_bridge;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// RUST_LOG wins over the command line level
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.effective_config()?;
    if cli.print_config {
        println!("{}", config.to_json()?);
        return Ok(());
    }
    config.validate().context("invalid configuration")?;

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received, stopping acquisition");
                stop.store(true, Ordering::Relaxed);
            }
        });
    }

    // stream discovery and the loop both block
    let stats = tokio::task::spawn_blocking(move || run_bridge(&config, &stop))
        .await
        .context("acquisition task failed")??;

    info!(
        cycles = stats.cycles,
        samples = stats.samples,
        raw = stats.raw_emissions,
        processed = stats.processed_emissions,
        throttled = stats.throttled_cycles,
        sent = stats.messages_sent,
        failed = stats.send_failures,
        "bridge stopped"
    );
    Ok(())
}
