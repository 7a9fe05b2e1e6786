//! Server configuration
//!
//! Typed configuration with serde defaults, resolved from the environment
//! at boot (`PORT`, `CLIENT_URL`, `POLLROOM_*`) and overridable from the
//! command line.

use serde::{Deserialize, Serialize};
use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use tracing::warn;

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_CLIENT_URL: &str = "http://localhost:3000";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind.
    #[serde(default = "default_host")]
    pub host: IpAddr,
    /// TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Browser origin allowed by CORS.
    #[serde(default = "default_client_url")]
    pub client_url: String,
    /// Where finished polls are appended (JSON lines).
    #[serde(default = "default_history_path")]
    pub history_path: PathBuf,
    /// Outbound event queue size per connection.
    #[serde(default = "default_queue_size")]
    pub queue_size: usize,
    /// Seconds between server-initiated WebSocket pings.
    #[serde(default = "default_heartbeat")]
    pub heartbeat_interval_secs: u64,
    /// Number of finished polls the history endpoint returns.
    #[serde(default = "default_history_page_size")]
    pub history_page_size: usize,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_client_url() -> String {
    DEFAULT_CLIENT_URL.to_string()
}

fn default_history_path() -> PathBuf {
    PathBuf::from("data/poll-history.jsonl")
}

fn default_queue_size() -> usize {
    100
}

fn default_heartbeat() -> u64 {
    25
}

fn default_history_page_size() -> usize {
    10
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            client_url: default_client_url(),
            history_path: default_history_path(),
            queue_size: default_queue_size(),
            heartbeat_interval_secs: default_heartbeat(),
            history_page_size: default_history_page_size(),
        }
    }
}

impl ServerConfig {
    /// Defaults overlaid with whatever the environment provides.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(port) = env_parsed::<u16>("PORT") {
            config.port = port;
        }
        if let Some(host) = env_parsed::<IpAddr>("POLLROOM_HOST") {
            config.host = host;
        }
        if let Ok(url) = env::var("CLIENT_URL") {
            if !url.trim().is_empty() {
                config.client_url = url;
            }
        }
        if let Ok(path) = env::var("POLLROOM_HISTORY") {
            if !path.trim().is_empty() {
                config.history_path = PathBuf::from(path);
            }
        }
        config
    }
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = env::var(key).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key = %key, value = %raw, "ignoring unparseable environment value");
            None
        }
    }
}
