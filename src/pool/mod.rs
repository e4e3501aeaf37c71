//! Backend connection pooling
//!
//! One `BackendPool` per configured instance, all held by the
//! `InstanceRegistry` behind the `ConnectionProvider` trait.

mod connection;
mod connection_trait;
mod deadpool_connection;
mod health_check;
mod provider;
mod registry;

pub use connection::BackendConnection;
pub use connection_trait::{ConnectionProvider, PoolStatus};
pub use deadpool_connection::BackendManager;
pub use health_check::{HealthCheckError, check_ping_response, check_tcp_alive};
pub use provider::{BackendPool, Builder};
pub use registry::InstanceRegistry;
