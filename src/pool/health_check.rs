//! Health check implementation for pooled connections
//!
//! A connection coming back out of the pool is checked in two steps:
//! - a TCP-level check using a non-blocking read, catching peers that closed
//!   the socket while it sat idle
//! - an application-level `PING`, which must be answered with `+PONG`

use deadpool::managed;
use thiserror::Error;
use tokio::time::timeout;

use super::connection::BackendConnection;
use crate::connection_error::ConnectionError;
use crate::constants::pool::{
    EXPECTED_PING_RESPONSE, HEALTH_CHECK_TIMEOUT, PING_COMMAND, TCP_PEEK_BUFFER_SIZE,
};
use crate::protocol::FrameError;

/// Errors that can occur during connection health checks
#[derive(Debug, Error)]
pub enum HealthCheckError {
    /// TCP connection is closed
    #[error("TCP connection closed")]
    TcpClosed,

    /// Data arrived on a connection that should be idle
    #[error("Unexpected data on idle connection")]
    UnexpectedData,

    /// TCP-level error occurred
    #[error("TCP error: {0}")]
    TcpError(std::io::Error),

    /// Sending PING or reading its reply failed
    #[error("PING failed: {0}")]
    Probe(FrameError),

    /// Health check operation timed out
    #[error("Health check timeout")]
    Timeout,

    /// Backend answered PING with something other than PONG
    #[error("Unexpected health check response: {0}")]
    UnexpectedResponse(String),
}

impl From<HealthCheckError> for managed::RecycleError<ConnectionError> {
    fn from(err: HealthCheckError) -> Self {
        managed::RecycleError::Message(err.to_string().into())
    }
}

/// Fast TCP-level check for obviously dead connections
///
/// - `Ok(0)` from `try_read()` means the peer closed the connection
/// - `Ok(n)` means data is waiting on a connection that should be idle
/// - `Err(WouldBlock)` is the healthy case: nothing to read
/// - other errors indicate TCP-level problems
pub fn check_tcp_alive(conn: &BackendConnection) -> Result<(), HealthCheckError> {
    if conn.has_buffered_data() {
        return Err(HealthCheckError::UnexpectedData);
    }

    let mut peek_buf = [0u8; TCP_PEEK_BUFFER_SIZE];
    match conn.tcp_stream().try_read(&mut peek_buf) {
        Ok(0) => Err(HealthCheckError::TcpClosed),
        Ok(_) => Err(HealthCheckError::UnexpectedData),
        Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(()),
        Err(e) => Err(HealthCheckError::TcpError(e)),
    }
}

/// Application-level health check: `PING` must be answered with `+PONG`
pub async fn check_ping_response(conn: &mut BackendConnection) -> Result<(), HealthCheckError> {
    let probe = async {
        let reply = conn
            .round_trip(PING_COMMAND)
            .await
            .map_err(HealthCheckError::Probe)?;

        if reply.as_bytes() == EXPECTED_PING_RESPONSE {
            Ok(())
        } else {
            Err(HealthCheckError::UnexpectedResponse(
                String::from_utf8_lossy(reply.as_bytes()).trim_end().to_string(),
            ))
        }
    };

    timeout(HEALTH_CHECK_TIMEOUT, probe)
        .await
        .map_err(|_| HealthCheckError::Timeout)?
}
