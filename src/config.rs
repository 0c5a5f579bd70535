//! Configuration types for stream-status.
//!
//! Every field has a default, so the binary runs with no config file at all.
//! When a file is given it is loaded once at startup and validated before the
//! listener opens; an invalid file is an error, never a silent fallback.
//!
//! # Example
//! ```toml
//! log_level = "debug"
//!
//! [server]
//! bind_address    = "0.0.0.0"
//! port            = 8081
//! read_timeout_ms = 200
//!
//! [monitor]
//! marker_path      = "/tmp/bambu_stream_status"
//! mode             = "poll"
//! poll_interval_ms = 500
//! stale_after_secs = 5
//! ```

use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::marker::{FreshnessMarker, DEFAULT_MARKER_PATH};

/// Largest accepted `server.max_request_bytes`; the buffer is allocated per
/// connection.
pub const MAX_REQUEST_BYTES_LIMIT: usize = 64 * 1024;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Log level for this crate's targets (`RUST_LOG` still wins).
    #[serde(default)]
    pub log_level: Option<String>,
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let config: Self = toml::from_str(&content).context("parsing config TOML")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.server.port != 0, "server.port must be between 1 and 65535");
        anyhow::ensure!(
            self.server.read_timeout_ms > 0,
            "server.read_timeout_ms must be positive"
        );
        anyhow::ensure!(
            (1..=MAX_REQUEST_BYTES_LIMIT).contains(&self.server.max_request_bytes),
            "server.max_request_bytes must be between 1 and {MAX_REQUEST_BYTES_LIMIT}"
        );
        anyhow::ensure!(
            self.monitor.poll_interval_ms > 0,
            "monitor.poll_interval_ms must be positive"
        );
        anyhow::ensure!(
            self.monitor.stale_after_secs > 0,
            "monitor.stale_after_secs must be positive"
        );
        Ok(())
    }
}

/// Listener settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Interface to listen on (default: all IPv4 interfaces).
    #[serde(default = "defaults::bind_address")]
    pub bind_address: IpAddr,

    /// TCP port (default: 8081).
    #[serde(default = "defaults::port")]
    pub port: u16,

    /// How long a client may take to send its request (default: 200 ms).
    ///
    /// Connections that send nothing in time are dropped without a response.
    #[serde(default = "defaults::read_timeout_ms")]
    pub read_timeout_ms: u64,

    /// Size of the single read used to capture a request (default: 4095).
    #[serde(default = "defaults::max_request_bytes")]
    pub max_request_bytes: usize,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Apply a port given on the command line.
    ///
    /// Returns `false` and leaves the port unchanged when `arg` is not a
    /// number in `1..=65535`.
    pub fn override_port(&mut self, arg: &str) -> bool {
        match parse_port(arg) {
            Some(port) => {
                self.port = port;
                true
            }
            None => false,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: defaults::bind_address(),
            port: defaults::port(),
            read_timeout_ms: defaults::read_timeout_ms(),
            max_request_bytes: defaults::max_request_bytes(),
        }
    }
}

/// Parse a TCP port, rejecting `0` and anything outside `u16`.
pub fn parse_port(arg: &str) -> Option<u16> {
    arg.trim().parse::<u16>().ok().filter(|&port| port != 0)
}

/// How liveness queries are answered.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MonitorMode {
    /// A background task refreshes a cached verdict; queries read the cache.
    #[default]
    Poll,
    /// Every query reads the marker file itself.
    Direct,
}

impl std::fmt::Display for MonitorMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Poll => "poll",
            Self::Direct => "direct",
        })
    }
}

/// Freshness marker settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MonitorConfig {
    /// File the producer writes its heartbeat timestamp to.
    #[serde(default = "defaults::marker_path")]
    pub marker_path: PathBuf,

    #[serde(default)]
    pub mode: MonitorMode,

    /// Refresh cadence in poll mode (default: 500 ms). Ignored in direct mode.
    #[serde(default = "defaults::poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Heartbeat age at which the producer is considered gone (default: 5 s).
    #[serde(default = "defaults::stale_after_secs")]
    pub stale_after_secs: u64,
}

impl MonitorConfig {
    pub fn marker(&self) -> FreshnessMarker {
        FreshnessMarker::new(&self.marker_path)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            marker_path: defaults::marker_path(),
            mode: MonitorMode::default(),
            poll_interval_ms: defaults::poll_interval_ms(),
            stale_after_secs: defaults::stale_after_secs(),
        }
    }
}

mod defaults {
    use super::*;

    pub fn bind_address() -> IpAddr { IpAddr::V4(Ipv4Addr::UNSPECIFIED) }
    pub fn port() -> u16 { 8081 }
    pub fn read_timeout_ms() -> u64 { 200 }
    pub fn max_request_bytes() -> usize { 4095 }
    pub fn marker_path() -> PathBuf { PathBuf::from(DEFAULT_MARKER_PATH) }
    pub fn poll_interval_ms() -> u64 { 500 }
    pub fn stale_after_secs() -> u64 { 5 }
}
