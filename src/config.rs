use clap::Parser;
use color_eyre::eyre::eyre;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

/// Command line interface configuration
#[derive(Parser, Debug)]
#[command(
    author, version,
    about = "SOCKS5 proxy with domain blacklisting and upstream relaying",
    long_about = "sockrelay serves SOCKS5 CONNECT requests, screens destinations \
against a suffix-matched domain blacklist, and either dials directly or relays \
through a randomly chosen upstream SOCKS5 proxy (plain or TLS, with optional \
username/password authentication)."
)]
pub struct Cli {
    /// Local IP to bind to
    #[arg(long, default_value = "0.0.0.0")]
    pub addr: IpAddr,

    /// Port to listen on
    #[arg(short, long, default_value_t = 3128)]
    pub port: u16,

    /// Public address of the proxy (IP or hostname), reported to
    /// clients in direct mode
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// JSON file of upstream SOCKS5 proxies to relay through
    #[arg(long, value_name = "FILE")]
    pub proxies: Option<PathBuf>,

    /// Blacklist file (JSON)
    #[arg(long, default_value = "blacklist.json", value_name = "FILE")]
    pub blacklist: PathBuf,

    /// Pull fresh blacklist entries from the built-in URLs
    #[arg(long, default_value_t = false)]
    pub update: bool,

    /// File with additional blacklist entries to import before serving
    #[arg(long = "update-file", value_name = "FILE")]
    pub update_file: Option<PathBuf>,

    /// URL with additional blacklist entries to import before serving
    #[arg(long = "update-url", value_name = "URL")]
    pub update_url: Option<String>,
}

/// Proxy server configuration derived from CLI arguments
#[derive(Clone, Debug)]
pub struct ProxyConfig {
    pub listen_addr: SocketAddr,
    pub report_ip: IpAddr,
    pub blacklist_path: PathBuf,
    pub proxies_path: Option<PathBuf>,
    pub update: bool,
    pub update_file: Option<PathBuf>,
    pub update_url: Option<String>,
}

impl ProxyConfig {
    /// Create ProxyConfig from CLI arguments, resolving the advertised
    /// host to the ReportIP embedded in direct-mode replies.
    pub async fn from_cli(args: Cli) -> color_eyre::Result<Self> {
        let report_ip = resolve_report_ip(&args.host).await?;
        Ok(Self {
            listen_addr: SocketAddr::from((args.addr, args.port)),
            report_ip,
            blacklist_path: args.blacklist,
            proxies_path: args.proxies,
            update: args.update,
            update_file: args.update_file,
            update_url: args.update_url,
        })
    }
}

/// Resolve an IP literal or hostname; the first resolved address wins.
async fn resolve_report_ip(host: &str) -> color_eyre::Result<IpAddr> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(ip);
    }
    let mut addrs = tokio::net::lookup_host((host, 0))
        .await
        .map_err(|e| eyre!("Unable to determine IP for {host}: {e}"))?;
    addrs
        .next()
        .map(|addr| addr.ip())
        .ok_or_else(|| eyre!("Unable to determine IP: {host}"))
}
