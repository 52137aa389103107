mod auth;
mod config;
mod db;
mod engine;
mod error;
mod ledger;
mod models;
mod run;

use anyhow::{Context, Result};
use std::process::ExitCode;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::{Config, LogFormat};

fn main() -> ExitCode {
    match try_main() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report(&err),
    }
}

fn try_main() -> Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;
    init_tracing(config.log_format);

    let args: Vec<String> = std::env::args().collect();
    let db = db::Database::open(&config.db_path).with_context(|| {
        format!("Failed to open database: {}", config.db_path.display())
    })?;
    run::as_cli(&args, &db, config.default_user)
}

/// Logs go to stderr so command output on stdout stays parseable.
fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_writer(std::io::stderr),
            )
            .init(),
        LogFormat::Text => registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init(),
    }
}

fn report(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<error::Error>() {
        Some(e) => {
            eprintln!("error[{}]: {err:#}", e.kind());
            ExitCode::from(u8::try_from(e.exit_code()).unwrap_or(1))
        }
        None => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
