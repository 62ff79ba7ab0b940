//! File Cabinet CLI entry point.

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

use cabinet_core::config::AppConfig;

mod commands;
mod output;

use commands::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match cli.load_config() {
        Ok(c) => c,
        Err(e) => {
            output::print_error(&format!("Failed to load configuration: {e}"));
            std::process::exit(1);
        }
    };

    init_logging(&config);
    tracing::debug!(config = %cli.config, env = %cli.env, "Configuration loaded");

    if let Err(e) = cli.execute(config).await {
        tracing::error!(kind = ?e.kind, error = %e, "Command failed");
        output::print_error(&e.to_string());
        std::process::exit(1);
    }
}

/// Initialize tracing on stderr.
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_writer(std::io::stderr)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}
