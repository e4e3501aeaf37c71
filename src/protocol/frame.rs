//! Byte-exact RESP framer
//!
//! The framer consumes exactly one protocol element from a buffered stream and
//! hands back the raw bytes it consumed. Nothing is decoded into values and
//! nothing is re-encoded, so whatever the client sent can be written to a
//! backend as-is, and whatever the backend answered goes back unchanged.
//!
//! Two framings share one implementation:
//!
//! - [`read_frame`] accepts what clients send: bulk strings (`$`) and arrays
//!   (`*`) of arbitrary nesting.
//! - [`read_reply`] additionally accepts the single-line replies backends use
//!   for status, errors and integers (`+`, `-`, `:`).
//!
//! Nested arrays are walked with an explicit stack of outstanding child
//! counts, so deeply nested input costs heap, not call stack.

use std::io;

use memchr::memchr;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use crate::constants::buffer::{BULK_PREALLOC_LIMIT, MAX_LINE_LENGTH};

/// Bulk string marker
pub const BULK_MARKER: u8 = b'$';
/// Array marker
pub const ARRAY_MARKER: u8 = b'*';
/// Simple string reply marker
pub const SIMPLE_MARKER: u8 = b'+';
/// Error reply marker
pub const ERROR_MARKER: u8 = b'-';
/// Integer reply marker
pub const INTEGER_MARKER: u8 = b':';

/// Errors raised while framing a byte stream
///
/// The `Display` text of every variant is what a client receives after the
/// leading `-` when its frame cannot be read.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The peer closed the stream, possibly in the middle of a frame
    #[error("connection closed")]
    ConnectionClosed,

    /// The stream ended part way through a bulk payload
    #[error("unexpected EOF")]
    TruncatedBody,

    /// No line terminator within the line limit
    #[error("long request line")]
    TruncatedLine,

    /// The line does not end with CRLF
    #[error("bad request line terminator")]
    BadTerminator,

    /// A length or count header is not a valid decimal number
    #[error("malformed length")]
    MalformedLength,

    /// An integer reply is not a valid signed decimal number
    #[error("malformed integer")]
    MalformedInteger,

    /// The line starts with a byte that is not a known frame marker
    #[error("unexpected frame type {0:#04x}")]
    UnexpectedFrameType(u8),

    /// Any other I/O failure on the underlying stream
    #[error("I/O error: {0}")]
    Io(io::Error),
}

impl FrameError {
    /// Whether the stream is unusable after this error
    ///
    /// Protocol errors are answered and the session keeps reading; a closed
    /// or broken stream ends it.
    #[must_use]
    pub fn is_connection_fatal(&self) -> bool {
        matches!(self, Self::ConnectionClosed | Self::Io(_))
    }
}

impl From<io::Error> for FrameError {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Self::ConnectionClosed
        } else {
            Self::Io(err)
        }
    }
}

/// One complete protocol element exactly as it appeared on the wire
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Frame(Vec<u8>);

impl Frame {
    #[must_use]
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for Frame {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for Frame {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Which single-line elements the framer accepts besides `$` and `*`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Framing {
    Command,
    Reply,
}

/// Read one line, terminator included
///
/// # Errors
/// - [`FrameError::TruncatedLine`] when no `\n` shows up within
///   [`MAX_LINE_LENGTH`] bytes
/// - [`FrameError::BadTerminator`] when the line does not end in `\r\n`
/// - [`FrameError::ConnectionClosed`] on end of stream
pub async fn read_line<R>(reader: &mut R) -> Result<Vec<u8>, FrameError>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();

    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Err(FrameError::ConnectionClosed);
        }

        let room = MAX_LINE_LENGTH - line.len();
        match memchr(b'\n', available) {
            Some(pos) if pos < room => {
                line.extend_from_slice(&available[..=pos]);
                reader.consume(pos + 1);
                break;
            }
            _ => {
                let take = available.len().min(room);
                line.extend_from_slice(&available[..take]);
                reader.consume(take);
                if line.len() >= MAX_LINE_LENGTH {
                    return Err(FrameError::TruncatedLine);
                }
            }
        }
    }

    if line.len() < 2 || line[line.len() - 2] != b'\r' {
        return Err(FrameError::BadTerminator);
    }
    Ok(line)
}

/// Parse a bulk length or array count
///
/// `-1` is the null sentinel and parses to `-1`. Any other input must be
/// decimal digits; CR and LF bytes are skipped so a header with its
/// terminator still parses.
///
/// # Examples
/// ```
/// use resp_proxy::protocol::parse_length;
///
/// assert_eq!(parse_length(b"-1").unwrap(), -1);
/// assert_eq!(parse_length(b"42").unwrap(), 42);
/// assert!(parse_length(b"3a").is_err());
/// ```
pub fn parse_length(bytes: &[u8]) -> Result<i64, FrameError> {
    if bytes.is_empty() {
        return Err(FrameError::MalformedLength);
    }
    if bytes == b"-1" {
        return Ok(-1);
    }

    let mut n: i64 = 0;
    for &b in bytes {
        if b == b'\r' || b == b'\n' {
            continue;
        }
        if !b.is_ascii_digit() {
            return Err(FrameError::MalformedLength);
        }
        n = n
            .checked_mul(10)
            .and_then(|n| n.checked_add(i64::from(b - b'0')))
            .ok_or(FrameError::MalformedLength)?;
    }
    Ok(n)
}

/// Parse the payload of an integer reply
///
/// # Examples
/// ```
/// use resp_proxy::protocol::parse_signed_integer;
///
/// assert_eq!(parse_signed_integer(b"-17").unwrap(), -17);
/// assert!(parse_signed_integer(b"-").is_err());
/// ```
pub fn parse_signed_integer(bytes: &[u8]) -> Result<i64, FrameError> {
    let (negative, digits) = match bytes.split_first() {
        None => return Err(FrameError::MalformedInteger),
        Some((&b'-', rest)) => (true, rest),
        Some(_) => (false, bytes),
    };
    if digits.is_empty() {
        return Err(FrameError::MalformedInteger);
    }

    // Accumulate negatively so i64::MIN parses without overflow
    let mut n: i64 = 0;
    for &b in digits {
        if !b.is_ascii_digit() {
            return Err(FrameError::MalformedInteger);
        }
        n = n
            .checked_mul(10)
            .and_then(|n| n.checked_sub(i64::from(b - b'0')))
            .ok_or(FrameError::MalformedInteger)?;
    }

    if negative {
        Ok(n)
    } else {
        n.checked_neg().ok_or(FrameError::MalformedInteger)
    }
}

/// Read one client frame: a bulk string or an array, nested to any depth
///
/// The returned bytes are exactly the bytes consumed from `reader`.
pub async fn read_frame<R>(reader: &mut R) -> Result<Frame, FrameError>
where
    R: AsyncBufRead + Unpin,
{
    read_element(reader, Framing::Command).await
}

/// Read one backend reply
///
/// Like [`read_frame`], but simple strings, errors and integers are accepted
/// too, both at top level and inside arrays.
pub async fn read_reply<R>(reader: &mut R) -> Result<Frame, FrameError>
where
    R: AsyncBufRead + Unpin,
{
    read_element(reader, Framing::Reply).await
}

/// Header payload between the marker byte and the CRLF
///
/// Only called on lines that passed [`read_line`] and start with a marker,
/// so they are at least three bytes long.
fn header(line: &[u8]) -> &[u8] {
    &line[1..line.len() - 2]
}

fn length_to_usize(len: i64) -> Result<usize, FrameError> {
    usize::try_from(len).map_err(|_| FrameError::MalformedLength)
}

async fn read_bulk_body<R>(reader: &mut R, len: usize, frame: &mut Vec<u8>) -> Result<(), FrameError>
where
    R: AsyncBufRead + Unpin,
{
    let total = len.checked_add(2).ok_or(FrameError::MalformedLength)?;
    frame.reserve(total.min(BULK_PREALLOC_LIMIT));

    let read = (&mut *reader).take(total as u64).read_to_end(frame).await?;
    if read == 0 {
        return Err(FrameError::ConnectionClosed);
    }
    if read < total {
        return Err(FrameError::TruncatedBody);
    }
    Ok(())
}

async fn read_element<R>(reader: &mut R, framing: Framing) -> Result<Frame, FrameError>
where
    R: AsyncBufRead + Unpin,
{
    let mut frame = Vec::new();
    // Children still expected by each array opened so far, innermost last
    let mut open_arrays: Vec<usize> = Vec::new();

    loop {
        let line = read_line(reader).await?;

        let opened_array = match line[0] {
            BULK_MARKER => {
                let len = parse_length(header(&line))?;
                frame.extend_from_slice(&line);
                if len >= 0 {
                    read_bulk_body(reader, length_to_usize(len)?, &mut frame).await?;
                }
                false
            }
            ARRAY_MARKER => {
                let count = parse_length(header(&line))?;
                frame.extend_from_slice(&line);
                if count > 0 {
                    open_arrays.push(length_to_usize(count)?);
                    true
                } else {
                    false
                }
            }
            SIMPLE_MARKER | ERROR_MARKER if framing == Framing::Reply => {
                frame.extend_from_slice(&line);
                false
            }
            INTEGER_MARKER if framing == Framing::Reply => {
                parse_signed_integer(header(&line))?;
                frame.extend_from_slice(&line);
                false
            }
            other => return Err(FrameError::UnexpectedFrameType(other)),
        };

        if opened_array {
            continue;
        }

        // An element just completed; close every array it was the last child of
        loop {
            match open_arrays.last_mut() {
                None => return Ok(Frame(frame)),
                Some(remaining) => {
                    *remaining -= 1;
                    if *remaining > 0 {
                        break;
                    }
                    open_arrays.pop();
                }
            }
        }
    }
}
