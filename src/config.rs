//! Runtime-configurable parameters for the bootstrap session.
//!
//! All values have sensible defaults. Override via environment variables
//! (prefixed `NEXAR_`) or by constructing a custom `BootstrapConfig`.

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

/// Settings shared by the root service, ring establishment and the
/// bootstrap transport.
#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    /// Explicit rendezvous address (`host:port`). When set, every process
    /// derives the same handle from it instead of receiving a generated one.
    pub comm_id: Option<String>,

    /// Local address to listen on. Overrides interface detection.
    pub interface_addr: Option<IpAddr>,

    /// Sessions larger than this delay their root registration by
    /// `rank` milliseconds.
    pub stagger_threshold: u32,

    /// Number of times a refused connect is retried before giving up.
    pub connect_retries: u32,

    /// Sleep between connect retries.
    pub connect_retry_interval: Duration,

    /// Raise the file-descriptor soft limit to the hard limit before the
    /// root starts accepting registrations.
    pub raise_fd_limit: bool,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            comm_id: None,
            interface_addr: None,
            stagger_threshold: 128,
            connect_retries: 200,
            connect_retry_interval: Duration::from_millis(100),
            raise_fd_limit: true,
        }
    }
}

impl BootstrapConfig {
    /// Defaults with every socket pinned to the loopback interface.
    pub fn local() -> Self {
        Self {
            interface_addr: Some(IpAddr::V4(Ipv4Addr::LOCALHOST)),
            ..Self::default()
        }
    }

    /// Load config from environment variables, falling back to defaults.
    ///
    /// Recognized variables:
    /// - `NEXAR_COMM_ID`
    /// - `NEXAR_BOOTSTRAP_IFADDR`
    /// - `NEXAR_BOOTSTRAP_STAGGER_THRESHOLD`
    /// - `NEXAR_BOOTSTRAP_CONNECT_RETRIES`
    /// - `NEXAR_BOOTSTRAP_RETRY_INTERVAL_MS`
    /// - `NEXAR_BOOTSTRAP_RAISE_FD_LIMIT`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();

        if let Some(v) = lookup("NEXAR_COMM_ID") {
            if !v.trim().is_empty() {
                cfg.comm_id = Some(v.trim().to_string());
            }
        }
        if let Some(v) = lookup("NEXAR_BOOTSTRAP_IFADDR") {
            if let Ok(ip) = v.trim().parse::<IpAddr>() {
                cfg.interface_addr = Some(ip);
            }
        }
        if let Some(v) = lookup("NEXAR_BOOTSTRAP_STAGGER_THRESHOLD") {
            if let Ok(n) = v.parse::<u32>() {
                cfg.stagger_threshold = n;
            }
        }
        if let Some(v) = lookup("NEXAR_BOOTSTRAP_CONNECT_RETRIES") {
            if let Ok(n) = v.parse::<u32>() {
                cfg.connect_retries = n;
            }
        }
        if let Some(v) = lookup("NEXAR_BOOTSTRAP_RETRY_INTERVAL_MS") {
            if let Ok(ms) = v.parse::<u64>() {
                cfg.connect_retry_interval = Duration::from_millis(ms);
            }
        }
        if let Some(v) = lookup("NEXAR_BOOTSTRAP_RAISE_FD_LIMIT") {
            match v.trim() {
                "0" | "false" | "no" => cfg.raise_fd_limit = false,
                "1" | "true" | "yes" => cfg.raise_fd_limit = true,
                _ => {}
            }
        }

        cfg
    }
}
