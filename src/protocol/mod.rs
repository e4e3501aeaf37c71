//! RESP protocol handling module
//!
//! This module contains the byte-exact framer, the command argument decoder
//! and the replies the proxy produces on its own.

mod command;
mod frame;
mod responses;

pub use command::{CommandKind, decode_command};
pub use frame::{
    ARRAY_MARKER, BULK_MARKER, ERROR_MARKER, Frame, FrameError, INTEGER_MARKER, SIMPLE_MARKER,
    parse_length, parse_signed_integer, read_frame, read_line, read_reply,
};
pub use responses::{CRLF, OK_REPLY, SELECT_INSTANCE_MESSAGE, error_reply};
