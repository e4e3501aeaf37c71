use async_trait::async_trait;

use crate::error::ProxyError;
use crate::protocol::Frame;

/// Generic connection pool status information
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    /// Idle connections ready to be handed out
    pub available: usize,
    /// Upper bound on connections held by the pool
    pub max_size: usize,
    /// Connections currently open, idle or in use
    pub created: usize,
}

/// A source of backend exchanges for one named instance
///
/// The registry only ever talks to this trait, so sessions can be driven
/// against in-memory providers in tests.
#[async_trait]
pub trait ConnectionProvider: Send + Sync + std::fmt::Debug {
    /// Instance name this provider serves
    fn name(&self) -> &str;

    /// Get current pool status for monitoring
    fn status(&self) -> PoolStatus;

    /// Send one request frame and return the backend's single reply frame
    async fn forward(&self, frame: &Frame) -> Result<Frame, ProxyError>;

    /// Stop background tasks and close idle connections
    async fn graceful_shutdown(&self);
}
