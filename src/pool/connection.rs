//! A single pooled backend connection

use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::constants::buffer::READER_CAPACITY;
use crate::protocol::{Frame, FrameError, read_reply};

/// Buffered TCP connection to one backend instance
///
/// Reads go through a `BufReader` so replies can be framed line by line;
/// writes pass straight through to the socket.
#[derive(Debug)]
pub struct BackendConnection {
    stream: BufReader<TcpStream>,
}

impl BackendConnection {
    #[must_use]
    pub fn new(stream: TcpStream) -> Self {
        Self {
            stream: BufReader::with_capacity(READER_CAPACITY, stream),
        }
    }

    /// Send raw frame bytes and read back exactly one reply
    ///
    /// After an error the connection is in an unknown protocol state and
    /// must not be reused.
    pub async fn round_trip(&mut self, request: &[u8]) -> Result<Frame, FrameError> {
        self.send(request).await?;
        self.read_reply().await
    }

    /// Write raw bytes to the backend
    pub async fn send(&mut self, bytes: &[u8]) -> Result<(), FrameError> {
        let stream = self.stream.get_mut();
        stream.write_all(bytes).await?;
        stream.flush().await?;
        Ok(())
    }

    /// Read one complete reply frame
    pub async fn read_reply(&mut self) -> Result<Frame, FrameError> {
        read_reply(&mut self.stream).await
    }

    /// Whether reply bytes are sitting unread in the buffer
    ///
    /// An idle connection must have nothing buffered; leftovers mean an
    /// earlier exchange was cut short.
    #[must_use]
    pub fn has_buffered_data(&self) -> bool {
        !self.stream.buffer().is_empty()
    }

    /// Underlying socket, for non-blocking liveness checks
    #[must_use]
    pub fn tcp_stream(&self) -> &TcpStream {
        self.stream.get_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_round_trip_returns_raw_reply() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 64];
            let n = stream.read(&mut buf).await.unwrap();
            assert_eq!(&buf[..n], b"*2\r\n$3\r\nGET\r\n$1\r\nk\r\n");
            stream.write_all(b"$5\r\nvalue\r\n").await.unwrap();
        });

        let mut conn = BackendConnection::new(TcpStream::connect(addr).await.unwrap());
        let reply = conn
            .round_trip(b"*2\r\n$3\r\nGET\r\n$1\r\nk\r\n")
            .await
            .unwrap();
        assert_eq!(reply.as_bytes(), b"$5\r\nvalue\r\n");
        assert!(!conn.has_buffered_data());

        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_pipelined_replies_are_framed_one_at_a_time() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 64];
            let _ = stream.read(&mut buf).await.unwrap();
            stream.write_all(b"+OK\r\n:42\r\n").await.unwrap();
        });

        let mut conn = BackendConnection::new(TcpStream::connect(addr).await.unwrap());
        let first = conn.round_trip(b"*1\r\n$4\r\nPING\r\n").await.unwrap();
        assert_eq!(first.as_bytes(), b"+OK\r\n");
        let second = conn.read_reply().await.unwrap();
        assert_eq!(second.as_bytes(), b":42\r\n");
        assert!(!conn.has_buffered_data());

        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_closed_backend_reports_connection_closed() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            drop(stream);
        });

        let mut conn = BackendConnection::new(TcpStream::connect(addr).await.unwrap());
        server.await.unwrap();
        let result = conn.read_reply().await;
        assert!(matches!(result, Err(FrameError::ConnectionClosed)));
    }
}
