//! Command argument decoding and classification
//!
//! The proxy only looks inside a client frame for two reasons: to answer the
//! `COMMAND` capability probe locally, and to spot `PING <instance>`, which
//! doubles as instance selection. Everything else is opaque.

use memchr::memmem;

const CRLF: &[u8] = b"\r\n";

/// Decode the arguments of a multibulk command frame
///
/// The frame is split on CRLF; the array header and the trailing empty
/// fragment are dropped, and of what remains every second element (the
/// payloads, skipping the `$len` headers) is kept.
///
/// This assumes the standard encoding, an array of bulk strings whose
/// payloads contain no CRLF. Anything else decodes to an incomplete or
/// meaningless argument list, but never panics.
///
/// # Examples
/// ```
/// use resp_proxy::protocol::decode_command;
///
/// let args = decode_command(b"*2\r\n$3\r\nGET\r\n$3\r\nkey\r\n");
/// assert_eq!(args, vec!["GET", "key"]);
/// assert!(decode_command(b"").is_empty());
/// ```
#[must_use]
pub fn decode_command(frame: &[u8]) -> Vec<String> {
    if frame.is_empty() {
        return Vec::new();
    }

    let mut parts = Vec::new();
    let mut start = 0;
    for pos in memmem::find_iter(frame, CRLF) {
        parts.push(&frame[start..pos]);
        start = pos + CRLF.len();
    }
    parts.push(&frame[start..]);

    if parts.len() < 2 {
        return Vec::new();
    }

    parts[1..parts.len() - 1]
        .iter()
        .skip(1)
        .step_by(2)
        .map(|arg| String::from_utf8_lossy(arg).into_owned())
        .collect()
}

/// What a decoded command means to the session router
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind<'a> {
    /// Bare `COMMAND` probe sent by client libraries on connect
    Handshake,
    /// `PING <instance>`, selects the instance and is still forwarded
    SelectInstance(&'a str),
    /// Anything else
    Other,
}

impl<'a> CommandKind<'a> {
    /// Classify decoded arguments; command names match case-insensitively
    #[must_use]
    pub fn classify(args: &'a [String]) -> Self {
        match args {
            [name] if name.eq_ignore_ascii_case("COMMAND") => Self::Handshake,
            [name, instance] if name.eq_ignore_ascii_case("PING") => {
                Self::SelectInstance(instance)
            }
            _ => Self::Other,
        }
    }
}
