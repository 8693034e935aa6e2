//! socks-peer - SOCKS5 peer reachability probe
//!
//! Discovers proxy-only peers from the configured seeds and checks which of
//! them can be reached through the proxy.

use anyhow::{Context, Result};
use backoff::ExponentialBackoffBuilder;
use clap::Parser;
use socks_peer::config::{load_config, Config};
use socks_peer::dialer::ProxiedDialer;
use socks_peer::discovery::{Discovery, MultiDiscovery, SeedOnionDiscovery};
use socks_peer::error::SocksError;
use socks_peer::socks::TargetAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// socks-peer - check which proxy-only peers are reachable through SOCKS5
#[derive(Parser, Debug)]
#[command(name = "socks-peer")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Enable JSON logging format
    #[arg(long)]
    json_log: bool,

    /// Give up retrying a peer after this many seconds (0 disables retries)
    #[arg(long, default_value_t = 30)]
    retry_secs: u64,

    /// Probe at most this many peers
    #[arg(long)]
    limit: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging
    setup_logging(&args.log_level, args.json_log)?;

    // Load configuration
    let config = load_config(&args.config)?;

    info!("socks-peer v{}", socks_peer::VERSION);
    info!("Configuration loaded from: {:?}", args.config);
    info!("Using SOCKS5 proxy: {}", config.proxy.addr);
    info!("Seed peers configured: {}", config.discovery.seeds.len());

    let dialer = ProxiedDialer::from_config(&config.proxy)?;
    let discovery = MultiDiscovery::default().with_source(Arc::new(
        SeedOnionDiscovery::from_config(&config.discovery)?,
    ));

    let result = tokio::select! {
        result = probe(&dialer, &discovery, &config, &args) => result,
        result = shutdown_signal() => result,
    };

    discovery.shutdown().await;
    result
}

/// Discover peers and dial each of them once
async fn probe(
    dialer: &ProxiedDialer,
    discovery: &MultiDiscovery,
    config: &Config,
    args: &Args,
) -> Result<()> {
    let peers = discovery
        .get_peers(config.discovery.services, config.discovery.timeout())
        .await
        .context("Peer discovery failed")?;
    info!("Discovered {} peers", peers.len());

    let limit = args.limit.unwrap_or(peers.len()).min(peers.len());
    let retry_for = Duration::from_secs(args.retry_secs);
    let mut reachable = 0;

    for peer in peers.iter().take(limit) {
        match dial_with_retry(dialer, peer, retry_for).await {
            Ok(mut stream) => {
                reachable += 1;
                info!("Peer {} is reachable", peer);
                let _ = stream.shutdown().await;
            }
            Err(e) => warn!("Peer {} is unreachable: {}", peer, e),
        }
    }

    info!("{}/{} peers reachable", reachable, limit);
    Ok(())
}

/// Dial a peer, retrying transient failures with exponential backoff
async fn dial_with_retry(
    dialer: &ProxiedDialer,
    peer: &TargetAddr,
    retry_for: Duration,
) -> Result<TcpStream, SocksError> {
    let policy = ExponentialBackoffBuilder::new()
        .with_initial_interval(Duration::from_secs(1))
        .with_max_interval(Duration::from_secs(10))
        .with_max_elapsed_time(Some(retry_for))
        .build();

    backoff::future::retry_notify(
        policy,
        || async move {
            dialer.dial(peer).await.map_err(|e| {
                if e.is_retryable() {
                    backoff::Error::transient(e)
                } else {
                    debug!("Not retrying {}: {}", peer, e);
                    backoff::Error::permanent(e)
                }
            })
        },
        |e: SocksError, delay: Duration| {
            warn!("Dial to {} failed: {}. Retrying in {:?}...", peer, e, delay);
        },
    )
    .await
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm =
            signal(SignalKind::terminate()).context("Failed to setup SIGTERM handler")?;

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        // On Windows, only handle Ctrl+C
        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for Ctrl+C")?;
        info!("Received Ctrl+C, shutting down...");
    }

    Ok(())
}

/// Setup logging based on configuration
fn setup_logging(level: &str, json: bool) -> Result<()> {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    if json {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .with_target(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }

    Ok(())
}
