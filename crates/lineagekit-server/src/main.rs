//! LineageKit - SQL lineage over HTTP

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use lineagekit_server::logging::init_logging;
use lineagekit_server::{run_server, AppState, ServiceConfig};

/// Configuration error (bad flag or environment value).
const EXIT_CONFIG_ERROR: u8 = 66;
/// The server failed after starting.
const EXIT_FAILURE: u8 = 1;

fn main() -> ExitCode {
    let config = ServiceConfig::parse();

    if let Err(e) = config.validate() {
        eprintln!("lineagekit: error: {e:#}");
        return ExitCode::from(EXIT_CONFIG_ERROR);
    }

    init_logging(config.log_format, &config.log_level);

    match serve(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "server error");
            eprintln!("lineagekit: server error: {e:#}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

fn serve(config: ServiceConfig) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;
    runtime.block_on(async move {
        let state = AppState::new(config)?;
        run_server(state).await
    })
}
