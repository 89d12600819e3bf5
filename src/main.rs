//! App Store Orchestrator binary entry point.
//!
//! All logs go to stderr; stdout carries command output only.
//!
//! Coverage is excluded because the main function needs a live container
//! runtime and reasoning API.

// Enable the coverage attribute when running with nightly for llvm-cov exclusions
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

use std::sync::Arc;

use appstore_orchestrator::cli::{help_text, Command};
use appstore_orchestrator::config::Config;
use appstore_orchestrator::error::AppError;
use appstore_orchestrator::orchestrator::Orchestrator;
use appstore_orchestrator::storage::SqliteStorage;
use appstore_orchestrator::traits::AuditStore;
use tokio::sync::watch;

#[cfg_attr(coverage_nightly, coverage(off))]
#[tokio::main]
async fn main() {
    // Initialize logging to stderr only (stdout is for command output)
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("LOG_LEVEL")
                .unwrap_or_else(|_| "info".to_string())
                .parse()
                .unwrap_or_else(|_| tracing_subscriber::filter::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match Command::parse(&args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(2);
        }
    };

    if command == Command::Help {
        println!("{}", help_text());
        return;
    }

    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Configuration error: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(
        "Configuration loaded: apps_root={}, database={}, interval={}s",
        config.apps_root,
        config.database_path,
        config.check_interval_secs
    );

    if let Err(e) = execute(command, &config).await {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
async fn execute(command: Command, config: &Config) -> Result<(), AppError> {
    match command {
        Command::Run => {
            let orchestrator = Arc::new(Orchestrator::from_config(config).await?);
            let (shutdown_tx, shutdown_rx) = watch::channel(false);

            tokio::spawn(async move {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => tracing::info!("Shutdown requested"),
                    Err(e) => tracing::error!("Failed to listen for Ctrl-C: {e}"),
                }
                let _ = shutdown_tx.send(true);
            });

            tracing::info!("appstore-orchestrator starting...");
            orchestrator.start_periodic_checks(shutdown_rx).await;
            tracing::info!("appstore-orchestrator shutdown complete");
            Ok(())
        }
        Command::Check { app_id } => {
            let orchestrator = Orchestrator::from_config(config).await?;
            orchestrator.run_check_for_app(&app_id).await
        }
        Command::Messages {
            app_id,
            limit,
            offset,
        } => {
            let storage = SqliteStorage::new(&config.database_path).await?;
            for message in storage.get_messages(&app_id, limit, offset).await? {
                match serde_json::to_string(&message) {
                    Ok(line) => println!("{line}"),
                    Err(e) => tracing::warn!(id = %message.id, "Unprintable message: {e}"),
                }
            }
            Ok(())
        }
        Command::Help => {
            println!("{}", help_text());
            Ok(())
        }
    }
}
