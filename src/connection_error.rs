//! Connection error types for backend dialing
//!
//! This module provides detailed error types for connection management,
//! making it easier to diagnose and handle different failure scenarios.

use std::fmt;

use crate::pool::HealthCheckError;

/// Errors that can occur while creating or recycling a backend connection
#[derive(Debug)]
#[non_exhaustive]
pub enum ConnectionError {
    /// TCP connection failed
    TcpConnect {
        host: String,
        port: u16,
        source: std::io::Error,
    },

    /// DNS resolution failed
    DnsResolution {
        address: String,
        source: std::io::Error,
    },

    /// Socket configuration failed (keepalive, nodelay)
    SocketConfig {
        operation: &'static str,
        source: std::io::Error,
    },

    /// Liveness probe failed on a fresh or recycled connection
    HealthCheck {
        instance: String,
        source: HealthCheckError,
    },
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TcpConnect { host, port, source } => {
                write!(f, "Failed to connect to {}:{}: {}", host, port, source)
            }
            Self::DnsResolution { address, source } => {
                write!(f, "Failed to resolve DNS for {}: {}", address, source)
            }
            Self::SocketConfig { operation, source } => {
                write!(f, "Failed to configure socket ({}): {}", operation, source)
            }
            Self::HealthCheck { instance, source } => {
                write!(f, "Health check failed for instance '{}': {}", instance, source)
            }
        }
    }
}

impl std::error::Error for ConnectionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TcpConnect { source, .. } => Some(source),
            Self::DnsResolution { source, .. } => Some(source),
            Self::SocketConfig { source, .. } => Some(source),
            Self::HealthCheck { source, .. } => Some(source),
        }
    }
}

impl ConnectionError {
    /// Get the appropriate log level for this error
    #[must_use]
    pub fn log_level(&self) -> tracing::Level {
        match self {
            // A backend that answers but refuses PING needs attention
            Self::HealthCheck { .. } => tracing::Level::ERROR,
            // Network and socket errors might be transient
            Self::TcpConnect { .. } | Self::DnsResolution { .. } | Self::SocketConfig { .. } => {
                tracing::Level::WARN
            }
        }
    }
}
