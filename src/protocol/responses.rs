//! Replies the proxy synthesizes itself
//!
//! Everything else a client receives is a backend reply passed through
//! untouched.

/// Line ending: "\r\n"
pub const CRLF: &[u8] = b"\r\n";

/// Acknowledgment for the `COMMAND` capability probe
pub const OK_REPLY: &[u8] = b"+OK\r\n";

/// Message sent when a command arrives before any instance was selected
pub const SELECT_INSTANCE_MESSAGE: &str = "select an instance";

/// Build a single-line error reply: `-<message>\r\n`
///
/// CR and LF inside the message are replaced by spaces so the reply can
/// never spill into a second line.
///
/// # Examples
/// ```
/// use resp_proxy::protocol::error_reply;
///
/// assert_eq!(error_reply("select an instance"), b"-select an instance\r\n");
/// ```
#[must_use]
pub fn error_reply(message: &str) -> Vec<u8> {
    let mut reply = Vec::with_capacity(message.len() + 3);
    reply.push(b'-');
    reply.extend(
        message
            .bytes()
            .map(|b| if b == b'\r' || b == b'\n' { b' ' } else { b }),
    );
    reply.extend_from_slice(CRLF);
    reply
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_reply_format() {
        assert_eq!(error_reply("boom"), b"-boom\r\n");
    }

    #[test]
    fn test_error_reply_strips_line_breaks() {
        assert_eq!(error_reply("a\r\nb"), b"-a  b\r\n");
    }

    #[test]
    fn test_error_reply_empty_message() {
        assert_eq!(error_reply(""), b"-\r\n");
    }

    #[test]
    fn test_ok_reply() {
        assert!(OK_REPLY.starts_with(b"+"));
        assert!(OK_REPLY.ends_with(CRLF));
    }
}
