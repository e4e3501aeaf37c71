//! Connection pool provider implementation
//!
//! This module contains the `BackendPool`, which manages the connections to
//! one backend instance using the deadpool library. It provides:
//! - Lazy dialing, with idle connections capped separately from active ones
//! - Pre-use health checks on recycled connections (see `BackendManager`)
//! - A background reaper evicting connections idle past the timeout
//! - The forward primitive the session router relies on

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use deadpool::managed;
use tokio::sync::broadcast;
use tracing::{Level, debug, error, info, warn};

use super::connection_trait::{ConnectionProvider, PoolStatus};
use super::deadpool_connection::{BackendManager, Pool};
use crate::config::{InstanceConfig, PoolConfig};
use crate::connection_error::ConnectionError;
use crate::constants::pool::{IDLE_REAP_INTERVAL, IDLE_TIMEOUT_SECS, MAX_ACTIVE, MAX_IDLE};
use crate::error::ProxyError;
use crate::protocol::Frame;
use crate::types::InstanceName;

/// Pooled connections to a single backend instance
#[derive(Debug, Clone)]
pub struct BackendPool {
    pool: Pool,
    instance: InstanceName,
    max_idle: usize,
    /// Stops the idle reaper; the reaper also ends once every clone is dropped
    shutdown_tx: Arc<broadcast::Sender<()>>,
}

/// Builder for constructing `BackendPool` instances
///
/// # Examples
///
/// ```no_run
/// use resp_proxy::pool::BackendPool;
/// use resp_proxy::types::InstanceName;
///
/// let pool = BackendPool::builder("127.0.0.1", 6379)
///     .instance(InstanceName::new("cache").unwrap())
///     .max_idle(64)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug)]
pub struct Builder {
    host: String,
    port: u16,
    instance: Option<InstanceName>,
    max_idle: usize,
    max_active: usize,
    idle_timeout: Duration,
}

impl Builder {
    /// Create a new builder with required connection parameters
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            instance: None,
            max_idle: MAX_IDLE,
            max_active: MAX_ACTIVE,
            idle_timeout: Duration::from_secs(IDLE_TIMEOUT_SECS),
        }
    }

    /// Set the instance this pool serves (defaults to "host:port")
    #[must_use]
    pub fn instance(mut self, instance: InstanceName) -> Self {
        self.instance = Some(instance);
        self
    }

    /// Set how many idle connections the pool keeps for reuse
    #[must_use]
    pub fn max_idle(mut self, max_idle: usize) -> Self {
        self.max_idle = max_idle;
        self
    }

    /// Set the ceiling on open connections, idle or in use
    ///
    /// Callers beyond this wait for a connection to be released.
    #[must_use]
    pub fn max_active(mut self, max_active: usize) -> Self {
        self.max_active = max_active;
        self
    }

    /// Set how long a connection may sit unused before eviction
    #[must_use]
    pub fn idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Build the pool
    ///
    /// No connection is opened here. When called inside a tokio runtime the
    /// idle reaper is started as well.
    ///
    /// # Errors
    ///
    /// Returns an error if deadpool rejects the pool configuration
    pub fn build(self) -> Result<BackendPool> {
        let instance = match self.instance {
            Some(instance) => instance,
            None => InstanceName::from_selection(&format!("{}:{}", self.host, self.port)),
        };

        let manager = BackendManager::new(
            self.host,
            self.port,
            instance.to_string(),
            self.idle_timeout,
        );
        let pool = Pool::builder(manager)
            .max_size(self.max_active.max(self.max_idle))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create pool for '{}': {}", instance, e))?;

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(BackendPool::run_idle_reaper(
                    pool.clone(),
                    instance.clone(),
                    self.idle_timeout,
                    self.max_idle,
                    IDLE_REAP_INTERVAL,
                    shutdown_rx,
                ));
            }
            Err(_) => {
                debug!(instance = %instance, "No runtime available, idle reaper not started");
            }
        }

        Ok(BackendPool {
            pool,
            instance,
            max_idle: self.max_idle,
            shutdown_tx: Arc::new(shutdown_tx),
        })
    }
}

impl BackendPool {
    /// Create a builder for constructing a pool
    #[must_use]
    pub fn builder(host: impl Into<String>, port: u16) -> Builder {
        Builder::new(host, port)
    }

    /// Create a pool from an instance entry and the shared pool settings
    pub fn from_instance_config(instance: &InstanceConfig, pool: &PoolConfig) -> Result<Self> {
        Builder::new(instance.host.as_str(), instance.port)
            .instance(instance.name.clone())
            .max_idle(pool.max_idle)
            .max_active(pool.max_active)
            .idle_timeout(pool.idle_timeout())
            .build()
    }

    /// Instance this pool serves
    #[must_use]
    pub fn instance(&self) -> &InstanceName {
        &self.instance
    }

    /// Backend address as "host:port"
    #[must_use]
    pub fn address(&self) -> String {
        let manager = self.pool.manager();
        format!("{}:{}", manager.host, manager.port)
    }

    /// Get a connection from the pool (returned to the pool when dropped)
    pub async fn get_pooled_connection(
        &self,
    ) -> Result<managed::Object<BackendManager>, ProxyError> {
        self.pool.get().await.map_err(|e| {
            if let managed::PoolError::Backend(conn_err) = &e {
                self.log_connection_error(conn_err);
            }
            ProxyError::BackendUnavailable {
                instance: self.instance.clone(),
                reason: e.to_string(),
            }
        })
    }

    fn log_connection_error(&self, err: &ConnectionError) {
        let level = err.log_level();
        if level == Level::ERROR {
            error!(instance = %self.instance, error = %err, "Backend connection failed");
        } else {
            warn!(instance = %self.instance, error = %err, "Backend connection failed");
        }
    }

    /// Drop idle connections unused for longer than the idle timeout
    ///
    /// Returns how many connections were removed.
    pub fn evict_idle(&self) -> usize {
        Self::evict_idle_in(&self.pool)
    }

    fn evict_idle_in(pool: &Pool) -> usize {
        let idle_timeout = pool.manager().idle_timeout();
        pool.retain(|_, metrics| metrics.last_used() <= idle_timeout)
            .removed
            .len()
    }

    /// Close idle connections beyond `max_idle`
    ///
    /// Connections in use are never touched. Returns how many were closed.
    pub fn trim_idle(&self) -> usize {
        Self::trim_idle_in(&self.pool, self.max_idle)
    }

    fn trim_idle_in(pool: &Pool, max_idle: usize) -> usize {
        if pool.status().available <= max_idle {
            return 0;
        }

        let mut kept = 0;
        pool.retain(|_, _| {
            kept += 1;
            kept <= max_idle
        })
        .removed
        .len()
    }

    async fn run_idle_reaper(
        pool: Pool,
        instance: InstanceName,
        idle_timeout: Duration,
        max_idle: usize,
        interval: Duration,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) {
        debug!(
            instance = %instance,
            idle_timeout_secs = idle_timeout.as_secs(),
            "Starting idle connection reaper"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = shutdown_rx.recv() => break,
            }

            if pool.is_closed() {
                break;
            }

            let evicted = Self::evict_idle_in(&pool) + Self::trim_idle_in(&pool, max_idle);
            if evicted > 0 {
                debug!(instance = %instance, evicted, "Evicted idle connections");
            }
        }

        debug!(instance = %instance, "Idle connection reaper terminated");
    }
}

#[async_trait]
impl ConnectionProvider for BackendPool {
    fn name(&self) -> &str {
        self.instance.as_str()
    }

    fn status(&self) -> PoolStatus {
        let status = self.pool.status();
        PoolStatus {
            available: status.available,
            max_size: status.max_size,
            created: status.size,
        }
    }

    async fn forward(&self, frame: &Frame) -> Result<Frame, ProxyError> {
        let mut conn = self.get_pooled_connection().await?;

        match conn.round_trip(frame.as_bytes()).await {
            Ok(reply) => {
                // Back to the pool first, then close whatever exceeds the idle cap
                drop(conn);
                let trimmed = self.trim_idle();
                if trimmed > 0 {
                    debug!(instance = %self.instance, trimmed, "Closed surplus idle connections");
                }
                Ok(reply)
            }
            Err(e) => {
                warn!(
                    instance = %self.instance,
                    error = %e,
                    "Backend exchange failed, discarding connection"
                );
                // Protocol state is unknown, keep it out of the pool
                drop(managed::Object::take(conn));
                Err(ProxyError::BackendUnavailable {
                    instance: self.instance.clone(),
                    reason: e.to_string(),
                })
            }
        }
    }

    async fn graceful_shutdown(&self) {
        let _ = self.shutdown_tx.send(());
        let status = self.pool.status();
        info!(
            instance = %self.instance,
            idle = status.available,
            "Closing connection pool"
        );
        self.pool.close();
    }
}
