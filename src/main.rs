//! TideKV - An In-Memory Key-Value Store
//!
//! This is the main entry point for the TideKV server.
//! It resolves the listen address, sets up logging, binds the TCP listener
//! and serves clients until Ctrl+C.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use tidekv::config::{Config, Invocation, HELP};
use tidekv::connection::{accept_loop, ConnectionStats};
use tidekv::storage::StorageEngine;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn print_banner(config: &Config) {
    println!(
        r#"
TideKV v{} - In-Memory Key-Value Store
──────────────────────────────────────────────────────────────
Server starting on {}
Use Ctrl+C to shutdown.
"#,
        tidekv::VERSION,
        config.bind_address()
    );
}

/// Resolves once Ctrl+C arrives. If the handler cannot be installed the
/// server keeps running.
async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received, stopping server..."),
        Err(e) => {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let invocation =
        Config::from_env().and_then(|config| config.apply_args(std::env::args().skip(1)));

    let config = match invocation {
        Ok(Invocation::Run(config)) => config,
        Ok(Invocation::Help) => {
            println!("{HELP}");
            return Ok(());
        }
        Ok(Invocation::Version) => {
            println!("TideKV version {}", tidekv::VERSION);
            return Ok(());
        }
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("{HELP}");
            std::process::exit(1);
        }
    };

    // RUST_LOG wins; otherwise info and above
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    print_banner(&config);

    let storage = Arc::new(StorageEngine::new());
    let stats = Arc::new(ConnectionStats::new());

    let listener = match TcpListener::bind(config.bind_address()).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(address = %config.bind_address(), error = %e, "Failed to bind listener");
            std::process::exit(1);
        }
    };
    info!("Listening on {}", config.bind_address());

    tokio::select! {
        _ = accept_loop(listener, Arc::clone(&storage), Arc::clone(&stats)) => {}
        _ = shutdown_signal() => {}
    }

    let store = storage.stats();
    info!(
        keys = store.keys,
        expired = store.expired,
        connections = stats.connections_accepted.load(Ordering::Relaxed),
        commands = stats.commands_processed.load(Ordering::Relaxed),
        bytes_read = stats.bytes_read.load(Ordering::Relaxed),
        bytes_written = stats.bytes_written.load(Ordering::Relaxed),
        "Server shutdown complete"
    );
    Ok(())
}
