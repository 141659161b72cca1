mod config;
mod connection;
mod filter;
mod logger;
mod pool;
mod session;
mod socks;

use crate::config::{Cli, ProxyConfig};
use crate::filter::DomainFilter;
use crate::logger::LogSink;
use crate::pool::UpstreamPool;
use crate::session::{ClientSession, SessionContext};
use clap::Parser;
use color_eyre::eyre::Result;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Sources consulted when the blacklist is missing or --update is set.
const BLACKLIST_SOURCES: &[&str] = &["https://winhelp2002.mvps.org/hosts.txt"];

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sockrelay=info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    color_eyre::install()?;

    let args = Cli::parse();
    let config = ProxyConfig::from_cli(args).await?;
    info!("IP to report: {}", config.report_ip);

    let (log, log_rx) = LogSink::new();
    tokio::spawn(logger::drain(log_rx));

    let mut pool = UpstreamPool::default();
    if let Some(path) = &config.proxies_path {
        if pool.load_file(path) {
            info!("Loaded {} outbound proxies", pool.len());
            info!("IP will be reported from the remote proxy");
        } else {
            warn!("Failed to load proxies from: {}", path.display());
            info!("Continuing to run without relay proxies");
        }
    }

    let mut filter = DomainFilter::default();
    if !filter.load_file(&config.blacklist_path) || config.update {
        for source in BLACKLIST_SOURCES {
            let (ok, count) = filter.load_http(source).await;
            if ok {
                info!("Loaded {count} domains from: \"{source}\"");
            } else {
                warn!("Error loading blacklist: \"{source}\"");
            }
        }
    }
    if let Some(path) = &config.update_file {
        let (ok, count) = filter.load_list_file(path);
        if ok {
            info!("Loaded {count} domains from: \"{}\"", path.display());
        } else {
            warn!("Error loading blacklist: \"{}\"", path.display());
        }
    }
    if let Some(url) = &config.update_url {
        let (ok, count) = filter.load_http(url).await;
        if ok {
            info!("Loaded {count} domains from: \"{url}\"");
        } else {
            warn!("Error loading blacklist: \"{url}\"");
        }
    }
    // Write back additions and deduplications gathered during startup.
    filter.save_file(&config.blacklist_path);
    info!("Blacklist contains {} domains", filter.len());

    let ctx = Arc::new(SessionContext {
        filter,
        pool,
        report_ip: config.report_ip,
        log,
    });

    let listener = TcpListener::bind(config.listen_addr).await?;
    ctx.log.line(format!("Bound to: {}", config.listen_addr)).await;

    // Accept loop: every client runs as its own task; the acceptor
    // never waits on a session.
    let server = {
        let ctx = Arc::clone(&ctx);
        async move {
            loop {
                match listener.accept().await {
                    Ok((stream, peer)) => {
                        let _ = stream.set_nodelay(true);
                        let session = ClientSession::new(
                            Arc::clone(&ctx),
                            Box::new(stream),
                            peer.ip().to_string(),
                            peer.port(),
                        );
                        tokio::spawn(session.run());
                    }
                    Err(e) => {
                        warn!("Accept error: {e} (continuing)");
                    }
                }
            }
        }
    };

    tokio::select! {
        _ = server => {
            warn!("Server loop terminated");
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received, saving blacklist");
            ctx.filter.save();
        }
    }

    Ok(())
}

/// Resolves on SIGINT or, on unix, SIGTERM. In-flight sessions are
/// dropped; the blacklist is persisted by the caller.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler");
        tokio::select! {
            _ = signal::ctrl_c() => {}
            _ = terminate.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = signal::ctrl_c().await;
    }
}
