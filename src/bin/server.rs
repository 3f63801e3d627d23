//! respkv server entry point.
//!
//! Sets up logging, starts the store worker and the accept loop, then waits
//! for Ctrl+C / SIGTERM to shut everything down.

use clap::Parser;
use respkv::config::{log_filter, ServerConfig};
use respkv::connection::ConnectionStats;
use respkv::server::{Server, ServerError};
use respkv::storage::Store;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info};

fn print_banner(config: &ServerConfig) {
    println!(
        r#"
respkv v{} - Minimal RESP Key-Value Server
──────────────────────────────────────────────
Listening on {}
Use Ctrl+C to shutdown gracefully.
"#,
        respkv::VERSION,
        config.bind_address()
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::parse();

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(&config.log_level))
        .with_target(false)
        .init();

    print_banner(&config);

    // Process-wide lifecycle signal; firing it also stops the store worker.
    let (lifecycle, lifecycle_rx) = watch::channel(false);

    let store = Store::new();
    store.start(lifecycle_rx);
    info!("Store worker started");

    let server = Arc::new(Server::new(store.clone(), Arc::new(ConnectionStats::new())));

    let address = config.bind_address();
    let serving = Arc::clone(&server);
    let accept_loop = tokio::spawn(async move { serving.listen_and_serve(&address).await });

    tokio::select! {
        result = accept_loop => match result {
            Ok(Err(ServerError::Closed)) | Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!(error = %e, "Server failed");
                store.shutdown();
                return Err(e.into());
            }
            Err(e) => return Err(e.into()),
        },
        _ = wait_for_signal() => {
            info!("Shutdown signal received, stopping server...");
        }
    }

    lifecycle.send_replace(true);
    store.shutdown();
    server.shutdown();

    debug!(grace_ms = config.grace_period_ms, "Waiting for open connections");
    tokio::time::sleep(config.grace_period()).await;

    let stats = server.stats();
    info!(
        connections = stats.connections_accepted.load(Ordering::Relaxed),
        commands = stats.commands_processed.load(Ordering::Relaxed),
        bytes_read = stats.bytes_read.load(Ordering::Relaxed),
        bytes_written = stats.bytes_written.load(Ordering::Relaxed),
        "Server shutdown complete"
    );
    Ok(())
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = match signal(SignalKind::terminate()) {
        Ok(term) => term,
        Err(e) => {
            error!(error = %e, "Failed to install SIGTERM handler");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = term.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
