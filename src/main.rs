// confluence-export - Concurrent Confluence space exporter
// Copyright (c) 2025 confluence-export Contributors
// Licensed under the MIT License

use confluence_export::cli::{Cli, Commands};
use confluence_export::config::{parse_config, LoggingConfig};
use confluence_export::core::export::summary::EXIT_FATAL;
use confluence_export::logging::init_logging;
use clap::Parser;
use std::process;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Logging settings come from the config file when it parses; a broken
    // file is reported later by the command itself.
    let file_config = std::fs::read_to_string(&cli.config)
        .ok()
        .and_then(|contents| parse_config(&contents).ok());
    let log_level = cli
        .log_level
        .clone()
        .or_else(|| file_config.as_ref().map(|c| c.application.log_level.clone()))
        .unwrap_or_else(|| "info".to_string());
    let logging_config = file_config.map(|c| c.logging).unwrap_or(LoggingConfig {
        local_enabled: false,
        ..LoggingConfig::default()
    });
    let logging_guard = match init_logging(&log_level, &logging_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(EXIT_FATAL);
        }
    };

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "confluence-export - Confluence space exporter"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        println!("\n⚠️  Shutdown signal received, stopping in-flight exports...");
        let _ = shutdown_tx.send(true);
    });

    let shutdown = CancellationToken::new();
    tokio::spawn(bridge_shutdown(shutdown_rx, shutdown.clone()));

    let exit_code = match execute_command(&cli, shutdown).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Command execution failed");
            eprintln!("Error: {e}");
            EXIT_FATAL
        }
    };

    drop(logging_guard);
    process::exit(exit_code);
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Failed to create SIGTERM handler");
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
            tracing::info!("Received SIGINT (Ctrl+C), initiating graceful shutdown...");
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received SIGINT (Ctrl+C), initiating graceful shutdown...");
        }
        _ = sigterm.recv() => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received SIGINT (Ctrl+C), initiating graceful shutdown..."),
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}

/// Cancels `token` once the shutdown channel carries `true`
async fn bridge_shutdown(mut rx: watch::Receiver<bool>, token: CancellationToken) {
    if rx.wait_for(|stop| *stop).await.is_ok() {
        token.cancel();
    }
}

/// Execute the CLI command
async fn execute_command(cli: &Cli, shutdown: CancellationToken) -> anyhow::Result<i32> {
    match &cli.command {
        Commands::Export(args) => args.execute(&cli.config, shutdown).await,
        Commands::ValidateConfig(args) => args.execute(&cli.config).await,
        Commands::Status(args) => args.execute(&cli.config).await,
        Commands::Init(args) => args.execute().await,
    }
}
