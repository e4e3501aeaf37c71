use std::net::SocketAddr;
use std::time::Duration;

use deadpool::managed;
use socket2::{SockRef, TcpKeepalive};
use tokio::net::TcpStream;
use tracing::debug;

use super::connection::BackendConnection;
use super::health_check::{check_ping_response, check_tcp_alive};
use crate::connection_error::ConnectionError;
use crate::constants::socket::{KEEPALIVE_INTERVAL, KEEPALIVE_TIME};

/// TCP connection manager for deadpool
///
/// Dials the backend lazily on demand and vets every idle connection before
/// deadpool hands it out again.
#[derive(Debug)]
pub struct BackendManager {
    pub(crate) host: String,
    pub(crate) port: u16,
    name: String,
    idle_timeout: Duration,
}

impl BackendManager {
    pub fn new(host: String, port: u16, name: String, idle_timeout: Duration) -> Self {
        Self {
            host,
            port,
            name,
            idle_timeout,
        }
    }

    #[must_use]
    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Open a TCP connection with keepalive and Nagle disabled
    async fn dial(&self) -> Result<TcpStream, ConnectionError> {
        let address = format!("{}:{}", self.host, self.port);
        let socket_addrs: Vec<SocketAddr> = tokio::net::lookup_host(&address)
            .await
            .map_err(|source| ConnectionError::DnsResolution {
                address: address.clone(),
                source,
            })?
            .collect();

        let Some(socket_addr) = socket_addrs.first() else {
            return Err(ConnectionError::DnsResolution {
                address,
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no addresses found"),
            });
        };

        let stream =
            TcpStream::connect(socket_addr)
                .await
                .map_err(|source| ConnectionError::TcpConnect {
                    host: self.host.clone(),
                    port: self.port,
                    source,
                })?;

        stream
            .set_nodelay(true)
            .map_err(|source| ConnectionError::SocketConfig {
                operation: "nodelay",
                source,
            })?;

        // Detect backends that vanished while the connection sat in the pool
        let keepalive = TcpKeepalive::new()
            .with_time(KEEPALIVE_TIME)
            .with_interval(KEEPALIVE_INTERVAL);
        SockRef::from(&stream)
            .set_tcp_keepalive(&keepalive)
            .map_err(|source| ConnectionError::SocketConfig {
                operation: "keepalive",
                source,
            })?;

        Ok(stream)
    }
}

impl managed::Manager for BackendManager {
    type Type = BackendConnection;
    type Error = ConnectionError;

    async fn create(&self) -> Result<BackendConnection, ConnectionError> {
        debug!(instance = %self.name, host = %self.host, port = self.port, "Dialing backend");
        let stream = self.dial().await?;
        Ok(BackendConnection::new(stream))
    }

    async fn recycle(
        &self,
        conn: &mut BackendConnection,
        metrics: &managed::Metrics,
    ) -> managed::RecycleResult<ConnectionError> {
        let idle = metrics.last_used();
        if idle > self.idle_timeout {
            debug!(
                instance = %self.name,
                idle_secs = idle.as_secs(),
                "Evicting connection past idle timeout"
            );
            return Err(managed::RecycleError::Message(
                "idle timeout exceeded".into(),
            ));
        }

        check_tcp_alive(conn)?;

        if let Err(e) = check_ping_response(conn).await {
            debug!(instance = %self.name, error = %e, "Connection failed PING probe");
            return Err(managed::RecycleError::Backend(ConnectionError::HealthCheck {
                instance: self.name.clone(),
                source: e,
            }));
        }

        Ok(())
    }

    fn detach(&self, _conn: &mut BackendConnection) {
        debug!(instance = %self.name, "Connection detached from pool");
    }
}

pub(crate) type Pool = managed::Pool<BackendManager>;
