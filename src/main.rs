//! querykit - Main entry point.
//!
//! Connects to one database, runs a single statement with named parameters and
//! prints the rows as JSON (or the affected row count with `--execute`).

use clap::Parser;
use querykit::config::Config;
use querykit::db::ConnectionRegistry;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    // Logs go to stderr so stdout carries only the result
    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse configuration from command line and environment
    let config = Config::parse();

    // Initialize logging
    init_tracing(&config);

    info!("Starting {}", querykit::version());

    let (alias, conn_config) = config.connection()?;
    let params = config.parse_params()?;

    let registry = ConnectionRegistry::new();
    registry.configure(conn_config, Some(&alias));
    let manager = registry.lookup(&alias);

    if let Err(e) = manager.connect() {
        error!(alias = %alias, error = %e, "Could not connect");
        if let Some(suggestion) = e.suggestion() {
            eprintln!("Hint: {}", suggestion);
        }
        return Err(e.into());
    }

    let mut query = manager.query_with_params(config.sql.as_str(), params)?;
    let result = if config.execute {
        query.execute().map(|affected| affected.to_string())
    } else {
        query.fetch().and_then(|rows| rows.to_json_pretty())
    };

    registry.close_all();

    match result {
        Ok(output) => {
            println!("{}", output);
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Statement failed");
            Err(e.into())
        }
    }
}
