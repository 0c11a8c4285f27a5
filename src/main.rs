//! Scheduled newsletter job, binary entrypoint.
//!
//! One invocation is one run: resolve configuration, execute the pipeline,
//! exit. The external scheduler (cron or similar) owns periodicity and
//! wall-clock timeouts; exit code zero covers both a delivered and a
//! skipped run.

use std::process::ExitCode;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use metals_newsletter::job::{build_runner, RunOutcome};
use metals_newsletter::Config;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Load .env in local/dev; no-op when the scheduler injects the variables.
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "configuration rejected");
            return ExitCode::FAILURE;
        }
    };
    if config.test_mode {
        tracing::info!("test mode: sending to the safe single address only");
    }

    let runner = build_runner(&config);
    match runner.run().await {
        Ok(RunOutcome::Sent(receipt)) => {
            tracing::info!(
                campaign = %receipt.campaign_id,
                endpoint = %receipt.endpoint,
                "run finished: sent"
            );
            ExitCode::SUCCESS
        }
        Ok(RunOutcome::Skipped(reason)) => {
            tracing::info!(%reason, "run finished: skipped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "run failed");
            ExitCode::FAILURE
        }
    }
}
