use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// One upstream SOCKS5 proxy.
///
/// Username and password each have to fit the one-byte length field of
/// the RFC 1929 sub-negotiation; descriptors that exceed 255 bytes are
/// rejected per connection attempt rather than dropped from the pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyDescriptor {
    pub host: String,
    pub port: u16,
    #[serde(rename = "usetls", default)]
    pub use_tls: bool,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Known outbound proxies. An empty pool means direct mode.
#[derive(Debug, Default)]
pub struct UpstreamPool {
    hosts: Vec<ProxyDescriptor>,
}

impl UpstreamPool {
    /// Load a JSON array of descriptors. Returns false on any failure,
    /// leaving the pool unchanged.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> bool {
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(_) => return false,
        };
        let hosts: Vec<ProxyDescriptor> = match serde_json::from_slice(&data) {
            Ok(hosts) => hosts,
            Err(_) => return false,
        };
        self.hosts = hosts;
        true
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// Pick one descriptor uniformly at random, None when the pool is
    /// empty. No stickiness, no health tracking.
    pub fn select(&self) -> Option<ProxyDescriptor> {
        self.hosts.choose(&mut rand::thread_rng()).cloned()
    }
}
