//! Constants used throughout the RESP proxy
//!
//! This module centralizes magic numbers and protocol literals
//! to improve maintainability and reduce duplication.

use std::time::Duration;

/// Buffer size constants
pub mod buffer {
    /// BufReader capacity for client and backend streams (64KB)
    pub const READER_CAPACITY: usize = 64 * 1024;

    /// Longest header or single-line reply accepted before failing with a truncated line
    ///
    /// Matches the reader capacity so a line always fits in one buffered read.
    pub const MAX_LINE_LENGTH: usize = READER_CAPACITY;

    /// Upper bound for the up-front allocation when reading a bulk payload
    ///
    /// Larger payloads still work, the vector just grows while reading.
    pub const BULK_PREALLOC_LIMIT: usize = 64 * 1024;
}

/// Connection pool constants
pub mod pool {
    use super::Duration;

    /// Maximum idle connections kept per instance
    pub const MAX_IDLE: usize = 500;

    /// Ceiling on connections open at once per instance, idle or in use
    ///
    /// High enough that sessions never queue for a connection in practice;
    /// it exists only because deadpool needs a finite size.
    pub const MAX_ACTIVE: usize = 10_000;

    /// Idle time after which a pooled connection is evicted (seconds)
    pub const IDLE_TIMEOUT_SECS: u64 = 240;

    /// How often the background reaper sweeps idle connections
    pub const IDLE_REAP_INTERVAL: Duration = Duration::from_secs(30);

    /// Timeout for the pre-use PING probe
    pub const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

    /// Liveness probe sent before handing out a recycled connection
    pub const PING_COMMAND: &[u8] = b"*1\r\n$4\r\nPING\r\n";

    /// Expected answer to [`PING_COMMAND`]
    pub const EXPECTED_PING_RESPONSE: &[u8] = b"+PONG\r\n";

    /// Buffer size for TCP peek operations in health checks
    pub const TCP_PEEK_BUFFER_SIZE: usize = 1;
}

/// Socket tuning for backend connections
pub mod socket {
    use super::Duration;

    /// Idle time before TCP keepalive probes start
    pub const KEEPALIVE_TIME: Duration = Duration::from_secs(60);

    /// Interval between TCP keepalive probes
    pub const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(10);
}

/// Network defaults
pub mod network {
    use super::Duration;

    /// Default proxy listen host (all interfaces)
    pub const DEFAULT_LISTEN_HOST: &str = "0.0.0.0";

    /// Default proxy listen port
    pub const DEFAULT_LISTEN_PORT: u16 = 6380;

    /// Default backend port
    pub const DEFAULT_BACKEND_PORT: u16 = 6379;

    /// Pause after a failed `accept` (e.g. out of file descriptors)
    pub const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_limit_fits_reader() {
        assert!(buffer::MAX_LINE_LENGTH <= buffer::READER_CAPACITY);
    }

    #[test]
    fn test_ping_command_is_multibulk() {
        assert!(pool::PING_COMMAND.starts_with(b"*1\r\n"));
        assert!(pool::PING_COMMAND.ends_with(b"\r\n"));
    }

    #[test]
    fn test_pool_defaults() {
        assert_eq!(pool::MAX_IDLE, 500);
        assert_eq!(pool::IDLE_TIMEOUT_SECS, 240);
        assert!(pool::IDLE_REAP_INTERVAL.as_secs() < pool::IDLE_TIMEOUT_SECS);
        assert!(pool::MAX_ACTIVE >= pool::MAX_IDLE);
    }

    #[test]
    fn test_accept_backoff_is_short() {
        assert!(!network::ACCEPT_ERROR_BACKOFF.is_zero());
        assert!(network::ACCEPT_ERROR_BACKOFF < Duration::from_secs(1));
    }
}
