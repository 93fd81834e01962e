//! MemcLoad - Main entry point

use clap::Parser;
use memc_common::logging::init_logging;
use memc_load::{selftest, Cli, MemcacheConnector, PipelineDriver};
use std::process;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // A missing .env is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let log_config = match cli.log_config().apply_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: invalid logging configuration: {e:#}");
            process::exit(2);
        },
    };

    // Held until exit so buffered file output is flushed
    let _log_guard = match init_logging(&log_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: cannot initialise logging: {e:#}");
            process::exit(2);
        },
    };

    if cli.test {
        if let Err(e) = selftest::run() {
            eprintln!("Error: {e}");
            process::exit(1);
        }
        return;
    }

    if let Err(e) = run(&cli).await {
        error!(error = %e, "Unexpected error");
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = cli.to_config();
    info!(
        options = %serde_json::to_string(&config)?,
        "Memc loader started with options"
    );

    let connector = Arc::new(MemcacheConnector::new(config.backend.clone()));
    let driver = PipelineDriver::new(config, connector)?;

    let cancel = driver.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, finishing files in progress");
            cancel.cancel();
        }
    });

    let summary = driver.run().await?;
    let elapsed = summary.finished_at - summary.started_at;

    info!(
        files = summary.files.len(),
        processed = summary.processed(),
        errors = summary.errors(),
        elapsed_ms = elapsed.num_milliseconds(),
        "Memc loader finished"
    );

    Ok(())
}
