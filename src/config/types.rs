//! Configuration type definitions

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::defaults;
use crate::types::{HostName, InstanceName};

/// Main proxy configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Listener settings
    #[serde(default)]
    pub proxy: ProxyConfig,
    /// Settings shared by every instance pool
    #[serde(default)]
    pub pool: PoolConfig,
    /// Backend instances clients can select with `PING <name>`
    #[serde(default)]
    pub instances: Vec<InstanceConfig>,
}

/// Where the proxy listens for clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    #[serde(default = "defaults::listen_host")]
    pub host: String,
    #[serde(default = "defaults::listen_port")]
    pub port: u16,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            host: defaults::listen_host(),
            port: defaults::listen_port(),
        }
    }
}

impl ProxyConfig {
    /// Listen address as "host:port"
    #[must_use]
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Pool sizing and idle eviction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Maximum idle connections kept per instance
    #[serde(default = "defaults::max_idle")]
    pub max_idle: usize,
    /// Ceiling on open connections per instance, idle or in use
    #[serde(default = "defaults::max_active")]
    pub max_active: usize,
    /// Seconds a connection may stay unused before it is closed
    #[serde(default = "defaults::idle_timeout_secs")]
    pub idle_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_idle: defaults::max_idle(),
            max_active: defaults::max_active(),
            idle_timeout_secs: defaults::idle_timeout_secs(),
        }
    }
}

impl PoolConfig {
    #[must_use]
    pub const fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

/// One named backend instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceConfig {
    pub name: InstanceName,
    pub host: HostName,
    #[serde(default = "defaults::backend_port")]
    pub port: u16,
}
