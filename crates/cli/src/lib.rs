pub mod cli;
pub mod commands;
pub mod config;

use anyhow::{Context, Result};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

pub use taskmaster_core as core;
pub use taskmaster_core::AppConfig;

use crate::cli::Cli;

/// Resolve configuration, then run the parsed command on an internal Tokio
/// runtime, printing to stdout.
pub fn run_blocking(cli: Cli) -> Result<()> {
    init_tracing(cli.log_filter.clone())?;
    let config = config::from_cli(&cli)?;
    tracing::debug!(
        data_dir = %config.data_dir().display(),
        collection = config.collection(),
        "resolved configuration"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    runtime.block_on(commands::execute(&config, cli.command, &mut handle))
}

fn init_tracing(filter: Option<String>) -> Result<()> {
    let filter = filter.unwrap_or_else(|| "info".to_string());
    let directive: Directive = filter.parse()?;
    let env_filter = EnvFilter::builder()
        .with_default_directive(directive)
        .from_env_lossy();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
    Ok(())
}
