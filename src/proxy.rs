//! Listener side of the proxy: accepting clients and spawning sessions

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info};

use crate::config::Config;
use crate::constants::network::ACCEPT_ERROR_BACKOFF;
use crate::pool::InstanceRegistry;
use crate::session::ClientSession;

/// The proxy: a shared, read-only instance registry plus the accept loop
///
/// Cloning is cheap; every clone shares the same registry and pools.
#[derive(Debug, Clone)]
pub struct RespProxy {
    registry: Arc<InstanceRegistry>,
}

impl RespProxy {
    /// Create a proxy with one lazily-dialing pool per configured instance
    pub fn new(config: &Config) -> Result<Self> {
        let registry = InstanceRegistry::initialize(&config.instances, &config.pool)
            .context("Failed to initialize instance registry")?;
        Ok(Self::from_registry(Arc::new(registry)))
    }

    #[must_use]
    pub fn from_registry(registry: Arc<InstanceRegistry>) -> Self {
        Self { registry }
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<InstanceRegistry> {
        &self.registry
    }

    /// Run one client session to completion
    pub async fn handle_client(&self, client_stream: TcpStream, client_addr: SocketAddr) {
        debug!(client = %client_addr, "New client connection");

        if let Err(e) = client_stream.set_nodelay(true) {
            debug!(client = %client_addr, error = %e, "Failed to set TCP_NODELAY");
        }

        let session = ClientSession::new(client_addr, Arc::clone(&self.registry));
        match session.run(client_stream).await {
            Ok(summary) => info!(
                client = %client_addr,
                frames = summary.frames,
                bytes_in = summary.bytes_in,
                bytes_out = summary.bytes_out,
                "Client disconnected"
            ),
            Err(e) => debug!(client = %client_addr, error = %e, "Client session aborted"),
        }
    }

    /// Accept clients forever, one task per connection
    ///
    /// Accept errors are logged and retried after a short pause; a slow or
    /// hung session never holds up the listener or other sessions.
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        if let Ok(addr) = listener.local_addr() {
            info!(addr = %addr, instances = self.registry.len(), "RESP proxy listening");
        }

        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    let proxy = self.clone();
                    tokio::spawn(async move {
                        proxy.handle_client(stream, addr).await;
                    });
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                    tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                }
            }
        }
    }

    /// Close idle backend connections and stop pool maintenance
    pub async fn graceful_shutdown(&self) {
        self.registry.graceful_shutdown().await;
    }
}
