//! Test helpers for integration tests
//!
//! In-process mock backends speaking just enough RESP for the proxy, a
//! proxy launcher bound to an ephemeral port, and a small test client.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use resp_proxy::config::{Config, InstanceConfig, PoolConfig, ProxyConfig};
use resp_proxy::protocol::{decode_command, read_frame, read_reply};
use resp_proxy::types::{HostName, InstanceName};
use resp_proxy::RespProxy;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Encode arguments as an array of bulk strings
pub fn encode_command(args: &[&str]) -> Vec<u8> {
    let mut out = format!("*{}\r\n", args.len()).into_bytes();
    for arg in args {
        out.extend_from_slice(format!("${}\r\n", arg.len()).as_bytes());
        out.extend_from_slice(arg.as_bytes());
        out.extend_from_slice(b"\r\n");
    }
    out
}

fn bulk(value: &str) -> Vec<u8> {
    format!("${}\r\n{}\r\n", value.len(), value).into_bytes()
}

/// A running mock backend
pub struct MockBackend {
    pub port: u16,
    pub handle: JoinHandle<()>,
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Spawn a mock RESP backend on an ephemeral port
///
/// Understands `PING`, `PING <msg>`, `ECHO`, `SET`, `GET` and `WHOAMI`
/// (replies with `name`). `HANG` never gets a reply. Anything else is
/// answered with `-ERR unknown command`.
pub async fn spawn_mock_backend(name: &str) -> MockBackend {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let name = name.to_string();
    let store: Arc<Mutex<HashMap<String, String>>> = Arc::default();

    let handle = tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let name = name.clone();
            let store = store.clone();
            tokio::spawn(async move {
                let (read_half, mut write_half) = stream.into_split();
                let mut reader = BufReader::new(read_half);

                while let Ok(frame) = read_frame(&mut reader).await {
                    let args = decode_command(frame.as_bytes());
                    let command = args.first().map(|c| c.to_ascii_uppercase());
                    let reply = match (command.as_deref(), &args[..]) {
                        (Some("PING"), [_]) => b"+PONG\r\n".to_vec(),
                        (Some("PING"), [_, msg]) | (Some("ECHO"), [_, msg]) => bulk(msg),
                        (Some("WHOAMI"), _) => bulk(&name),
                        (Some("SET"), [_, key, value]) => {
                            store.lock().await.insert(key.clone(), value.clone());
                            b"+OK\r\n".to_vec()
                        }
                        (Some("GET"), [_, key]) => match store.lock().await.get(key) {
                            Some(value) => bulk(value),
                            None => b"$-1\r\n".to_vec(),
                        },
                        (Some("HANG"), _) => std::future::pending::<Vec<u8>>().await,
                        _ => b"-ERR unknown command\r\n".to_vec(),
                    };
                    if write_half.write_all(&reply).await.is_err() {
                        break;
                    }
                }
            });
        }
    });

    MockBackend { port, handle }
}

/// Build a config pointing at the given (name, port) instances
pub fn config_for(instances: &[(&str, u16)]) -> Config {
    Config {
        proxy: ProxyConfig::default(),
        pool: PoolConfig::default(),
        instances: instances
            .iter()
            .map(|(name, port)| InstanceConfig {
                name: InstanceName::new(name).unwrap(),
                host: HostName::new("127.0.0.1".to_string()).unwrap(),
                port: *port,
            })
            .collect(),
    }
}

/// Start a proxy on an ephemeral port and return its address
pub async fn start_proxy(config: &Config) -> Result<(SocketAddr, RespProxy)> {
    let proxy = RespProxy::new(config)?;
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let server = proxy.clone();
    tokio::spawn(async move {
        let _ = server.serve(listener).await;
    });

    Ok((addr, proxy))
}

/// Minimal RESP client for driving the proxy
pub struct TestClient {
    stream: BufReader<TcpStream>,
}

impl TestClient {
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        Ok(Self {
            stream: BufReader::new(TcpStream::connect(addr).await?),
        })
    }

    /// Send raw bytes without reading anything back
    pub async fn send_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.stream.get_mut().write_all(bytes).await?;
        Ok(())
    }

    /// Read one reply frame
    pub async fn reply(&mut self) -> Result<Vec<u8>> {
        Ok(read_reply(&mut self.stream).await?.into_bytes())
    }

    /// Close the write half and collect everything until the proxy hangs up
    pub async fn finish(&mut self) -> Result<Vec<u8>> {
        self.stream.get_mut().shutdown().await?;
        let mut rest = Vec::new();
        self.stream.read_to_end(&mut rest).await?;
        Ok(rest)
    }

    /// Send a command and return the raw reply
    pub async fn command(&mut self, args: &[&str]) -> Result<Vec<u8>> {
        self.send_raw(&encode_command(args)).await?;
        self.reply().await
    }
}
