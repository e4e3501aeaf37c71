//! Multi-instance RESP proxy
//!
//! Clients speak the Redis wire protocol to the proxy and pick a backend
//! instance in-band with `PING <instance>`. Every later command on that
//! connection is forwarded verbatim to the selected instance over a pooled
//! connection, and the raw reply is relayed back unchanged.

pub mod config;
pub mod connection_error;
pub mod constants;
pub mod error;
pub mod logging;
pub mod pool;
pub mod protocol;
pub mod proxy;
pub mod session;
pub mod types;

pub use config::{
    Config, ConfigSource, InstanceConfig, PoolConfig, ProxyConfig, create_default_config,
    load_config, load_config_with_fallback,
};
pub use connection_error::ConnectionError;
pub use error::ProxyError;
pub use pool::{BackendPool, ConnectionProvider, InstanceRegistry, PoolStatus};
pub use protocol::{Frame, FrameError};
pub use proxy::RespProxy;
pub use session::{ClientSession, SessionState, SessionSummary};
pub use types::{HostName, InstanceName, ValidationError};
