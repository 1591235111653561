//! Trace Inspector
//!
//! Reads transaction traces as JSON-RPC requests on stdin, collects
//! additional info for them and answers with a summary on stdout.

mod cache;
mod config;
mod error;
mod rpc;
mod source;

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cache::{CachedSource, SharedSource};
use config::AppConfig;
use rpc::{handle_line, Inspector};
use source::SnapshotSource;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging to stderr (stdout carries responses)
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("trace_inspect=info,trace_core=info")
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting Trace Inspector");

    let config = AppConfig::load().map_err(|e| {
        tracing::error!(error = %e, "Failed to load configuration");
        e
    })?;

    tracing::info!(
        source = ?config.source.path,
        max_trace_length = config.limits.max_trace_length,
        cache_capacity = config.cache.max_capacity,
        cache_ttl = config.cache.ttl_seconds,
        "Configuration loaded"
    );

    let cached_source = match &config.source.path {
        Some(path) => {
            let snapshot = SnapshotSource::load(path)?;
            Some(Arc::new(CachedSource::new(snapshot, &config.cache)))
        }
        None => {
            tracing::warn!("No information source configured, additional info will not be collected");
            None
        }
    };
    let source = cached_source
        .clone()
        .map(|s| -> SharedSource { s });

    // Ctrl-C aborts in-flight lookups; their traces are left untouched
    let shutdown = CancellationToken::new();
    let shutdown_on_signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, cancelling in-flight requests");
            shutdown_on_signal.cancel();
        }
    });

    let inspector = Inspector::new(source, config.limits.max_trace_length, shutdown.clone());

    tracing::info!("Ready, listening on stdin");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        let line = tokio::select! {
            _ = shutdown.cancelled() => break,
            line = lines.next_line() => line,
        };
        let line = match line {
            Ok(Some(l)) => l,
            Ok(None) => break,
            Err(e) => {
                tracing::error!(error = %e, "Error reading stdin");
                continue;
            }
        };

        if line.is_empty() {
            continue;
        }

        let response = handle_line(&inspector, &line).await;
        let mut response_str = serde_json::to_string(&response)?;
        response_str.push('\n');
        if let Err(e) = stdout.write_all(response_str.as_bytes()).await {
            tracing::error!(error = %e, "Error writing response");
        }
        if let Err(e) = stdout.flush().await {
            tracing::error!(error = %e, "Error flushing stdout");
        }
    }

    if let Some(cached_source) = &cached_source {
        let stats = cached_source.stats();
        tracing::info!(cached_lookups = stats.entry_count, "Lookup cache statistics");
    }
    tracing::info!("Trace Inspector shutting down");
    Ok(())
}
