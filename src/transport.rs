//! DAP wire format — Content-Length based message framing.
//!
//! ```text
//! Content-Length: <decimal byte count>\r\n
//! \r\n
//! <UTF-8 JSON body of exactly that many bytes>
//! ```
//!
//! Multiple header lines are permitted before the blank line; only
//! `Content-Length` is interpreted, and the key is case-sensitive.

/// The four-byte sequence terminating the header block.
pub const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Separator between header lines.
pub const LINE_SEPARATOR: &str = "\r\n";

/// The only header key the decoder interprets.
pub const CONTENT_LENGTH: &str = "Content-Length";

/// Encode a JSON value into a DAP wire-format message with Content-Length header.
pub fn encode_message(value: &serde_json::Value) -> Vec<u8> {
    let body = value.to_string();
    let header = format!("Content-Length: {}\r\n\r\n", body.len());
    let mut buf = Vec::with_capacity(header.len() + body.len());
    buf.extend_from_slice(header.as_bytes());
    buf.extend_from_slice(body.as_bytes());
    buf
}
