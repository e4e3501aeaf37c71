//! Errors a session reports back to its client
//!
//! Each variant's `Display` text is sent verbatim as the body of a
//! `-<message>\r\n` error reply.

use thiserror::Error;

use crate::types::InstanceName;

#[derive(Debug, Error)]
pub enum ProxyError {
    /// A data command arrived before any `PING <instance>` selection
    #[error("select an instance")]
    NoInstanceSelected,

    /// The selected instance is not registered
    #[error("instance '{0}' does not exist")]
    UnknownInstance(InstanceName),

    /// Acquiring a backend connection, sending the frame or reading the reply failed
    #[error("backend unavailable for instance '{instance}': {reason}")]
    BackendUnavailable {
        instance: InstanceName,
        reason: String,
    },
}

impl ProxyError {
    /// Whether this error came from a backend rather than from session policy
    #[must_use]
    pub const fn is_backend_error(&self) -> bool {
        matches!(self, Self::BackendUnavailable { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{SELECT_INSTANCE_MESSAGE, error_reply};

    #[test]
    fn test_no_instance_selected_message() {
        assert_eq!(
            ProxyError::NoInstanceSelected.to_string(),
            SELECT_INSTANCE_MESSAGE
        );
        assert_eq!(
            error_reply(&ProxyError::NoInstanceSelected.to_string()),
            b"-select an instance\r\n"
        );
    }

    #[test]
    fn test_unknown_instance_names_the_instance() {
        let err = ProxyError::UnknownInstance(InstanceName::from_selection("Missing"));
        assert_eq!(err.to_string(), "instance 'missing' does not exist");
        assert!(!err.is_backend_error());
    }

    #[test]
    fn test_backend_unavailable() {
        let err = ProxyError::BackendUnavailable {
            instance: InstanceName::from_selection("cache"),
            reason: "Connection refused".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("cache"));
        assert!(msg.contains("Connection refused"));
        assert!(err.is_backend_error());
    }
}
