//! Client session management
//!
//! A session owns one client connection for its whole lifetime. It pulls
//! frames off the connection one at a time, answers the handshake and
//! selection errors itself, and forwards everything else to the instance the
//! client bound with `PING <instance>`. Replies go back in request order; at
//! most one frame per session is in flight.

mod state;


pub use state::{Route, SessionState};

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, warn};

use crate::constants::buffer::READER_CAPACITY;
use crate::pool::InstanceRegistry;
use crate::protocol::{CommandKind, Frame, OK_REPLY, decode_command, error_reply, read_frame};

/// Traffic counters reported when a session ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    /// Frames read from the client, malformed ones excluded
    pub frames: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,
}

/// Represents an active client session
#[derive(Debug)]
pub struct ClientSession {
    client_addr: SocketAddr,
    registry: Arc<InstanceRegistry>,
    state: SessionState,
}

impl ClientSession {
    /// Create a new, unselected client session
    #[must_use]
    pub fn new(client_addr: SocketAddr, registry: Arc<InstanceRegistry>) -> Self {
        Self {
            client_addr,
            registry,
            state: SessionState::Unselected,
        }
    }

    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Serve the client until it disconnects
    ///
    /// A closed or broken client stream ends the session quietly. Malformed
    /// frames are answered with an error reply and the session keeps reading.
    ///
    /// # Errors
    ///
    /// Returns the I/O error of a failed write to the client; nothing more is
    /// read or written after it.
    pub async fn run<S>(mut self, stream: S) -> std::io::Result<SessionSummary>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let (read_half, mut writer) = tokio::io::split(stream);
        let mut reader = BufReader::with_capacity(READER_CAPACITY, read_half);
        let mut summary = SessionSummary::default();

        loop {
            let reply = match read_frame(&mut reader).await {
                Ok(frame) => {
                    summary.frames += 1;
                    summary.bytes_in += frame.len() as u64;
                    self.process_frame(&frame).await
                }
                Err(e) if e.is_connection_fatal() => {
                    debug!(client = %self.client_addr, reason = %e, "Client stream ended");
                    break;
                }
                Err(e) => {
                    debug!(client = %self.client_addr, error = %e, "Rejecting malformed frame");
                    error_reply(&e.to_string())
                }
            };

            if let Err(e) = write_reply(&mut writer, &reply).await {
                debug!(client = %self.client_addr, error = %e, "Failed to write to client");
                return Err(e);
            }
            summary.bytes_out += reply.len() as u64;
        }

        debug!(
            client = %self.client_addr,
            frames = summary.frames,
            bytes_in = summary.bytes_in,
            bytes_out = summary.bytes_out,
            "Session closed"
        );
        Ok(summary)
    }

    /// Route one well-formed frame and produce the bytes to send back
    pub async fn process_frame(&mut self, frame: &Frame) -> Vec<u8> {
        let args = decode_command(frame.as_bytes());
        let kind = CommandKind::classify(&args);

        if let CommandKind::SelectInstance(name) = kind {
            debug!(client = %self.client_addr, instance = %name.to_lowercase(), "Instance selected");
        }

        let instance = match self.state.route(kind) {
            Ok(Route::Acknowledge) => return OK_REPLY.to_vec(),
            Ok(Route::Forward(instance)) => instance,
            Err(e) => return error_reply(&e.to_string()),
        };

        let provider = match self.registry.lookup(instance.as_str()) {
            Ok(provider) => provider,
            Err(e) => {
                debug!(client = %self.client_addr, instance = %instance, "Unknown instance");
                return error_reply(&e.to_string());
            }
        };

        match provider.forward(frame).await {
            Ok(reply) => reply.into_bytes(),
            Err(e) => {
                warn!(
                    client = %self.client_addr,
                    instance = %instance,
                    error = %e,
                    "Backend request failed"
                );
                error_reply(&e.to_string())
            }
        }
    }
}

async fn write_reply<W>(writer: &mut W, reply: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(reply).await?;
    writer.flush().await
}
