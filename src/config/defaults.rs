//! Default values for configuration fields
//!
//! These back the `#[serde(default = ...)]` attributes on the config types.

use crate::constants::{network, pool};

#[inline]
pub fn listen_host() -> String {
    network::DEFAULT_LISTEN_HOST.to_string()
}

#[inline]
pub fn listen_port() -> u16 {
    network::DEFAULT_LISTEN_PORT
}

#[inline]
pub fn backend_port() -> u16 {
    network::DEFAULT_BACKEND_PORT
}

#[inline]
pub fn max_idle() -> usize {
    pool::MAX_IDLE
}

#[inline]
pub fn max_active() -> usize {
    pool::MAX_ACTIVE
}

#[inline]
pub fn idle_timeout_secs() -> u64 {
    pool::IDLE_TIMEOUT_SECS
}
