//! Length-prefixed framing for the patchwork wire protocol.
//!
//! Wire format (protocol version 2):
//! ```text
//! ┌──────────────────────────┬───────────────────────────────┐
//! │ header: 8 ASCII digits   │ body: exactly <header> bytes  │
//! │ zero padded, e.g.        │ UTF-8 text                    │
//! │ "00000029"               │                               │
//! └──────────────────────────┴───────────────────────────────┘
//! ```
//!
//! Bodies are either one of the reserved literals (`GET`, `PING`, `PONG`) or
//! an image payload in the shape text encoding.

use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use patchwork_core::Image;

pub const PROTOCOL_VERSION: u32 = 2;

/// Width of the decimal length header.
pub const HEADER_LEN: usize = 8;

/// Largest body accepted by default (1 MiB).
pub const MAX_BODY_LEN: usize = 1 << 20;

/// Largest length the header can announce.
pub const MAX_HEADER_VALUE: usize = 99_999_999;

/// "Send back your current image."
pub const REQUEST_BODY: &[u8] = b"GET";
pub const PING_BODY: &[u8] = b"PING";
pub const PONG_BODY: &[u8] = b"PONG";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("invalid frame header {0:?}")]
    InvalidHeader(String),
    #[error("body of {len} bytes exceeds the {max} byte limit")]
    BodyTooLarge { len: usize, max: usize },
}

/// Header bytes announcing a body of `len` bytes, refused above
/// `max_body_len`.
pub fn encode_header(len: usize, max_body_len: usize) -> Result<[u8; HEADER_LEN], FrameError> {
    let max = max_body_len.min(MAX_HEADER_VALUE);
    if len > max {
        return Err(FrameError::BodyTooLarge { len, max });
    }
    let text = format!("{len:0width$}", width = HEADER_LEN);
    let mut header = [0u8; HEADER_LEN];
    header.copy_from_slice(text.as_bytes());
    Ok(header)
}

/// Parse a header and check the announced length against `max_body_len`.
///
/// Leading spaces are accepted so that space-padded headers from older
/// peers still parse.
pub fn decode_header(header: &[u8; HEADER_LEN], max_body_len: usize) -> Result<usize, FrameError> {
    let invalid = || FrameError::InvalidHeader(String::from_utf8_lossy(header).into_owned());

    let start = header.iter().position(|b| *b != b' ').ok_or_else(invalid)?;
    let digits = &header[start..];
    if !digits.iter().all(u8::is_ascii_digit) {
        return Err(invalid());
    }
    let len = digits
        .iter()
        .fold(0usize, |acc, d| acc * 10 + usize::from(d - b'0'));

    if len > max_body_len {
        return Err(FrameError::BodyTooLarge {
            len,
            max: max_body_len,
        });
    }
    Ok(len)
}

/// One encoded frame, header included.
///
/// Cheap to clone: broadcast hands the same bytes to every participant.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame(Arc<[u8]>);

impl Frame {
    /// Frame `body` under the default [`MAX_BODY_LEN`].
    pub fn new(body: impl AsRef<[u8]>) -> Result<Self, FrameError> {
        Self::with_limit(body, MAX_BODY_LEN)
    }

    pub fn with_limit(body: impl AsRef<[u8]>, max_body_len: usize) -> Result<Self, FrameError> {
        let body = body.as_ref();
        let header = encode_header(body.len(), max_body_len)?;
        let mut bytes = Vec::with_capacity(HEADER_LEN + body.len());
        bytes.extend_from_slice(&header);
        bytes.extend_from_slice(body);
        Ok(Self(bytes.into()))
    }

    fn literal(body: &'static [u8]) -> Self {
        let mut bytes = format!("{:0width$}", body.len(), width = HEADER_LEN).into_bytes();
        bytes.extend_from_slice(body);
        Self(bytes.into())
    }

    pub fn request() -> Self {
        Self::literal(REQUEST_BODY)
    }

    pub fn ping() -> Self {
        Self::literal(PING_BODY)
    }

    pub fn pong() -> Self {
        Self::literal(PONG_BODY)
    }

    pub fn image(image: &Image) -> Result<Self, FrameError> {
        Self::new(image.to_payload())
    }

    pub fn body(&self) -> &[u8] {
        &self.0[HEADER_LEN..]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Header plus body length.
    pub fn wire_len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let body = self.body();
        let preview = String::from_utf8_lossy(&body[..body.len().min(32)]);
        f.debug_struct("Frame")
            .field("body_len", &body.len())
            .field("preview", &preview)
            .finish()
    }
}

/// What a received body means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Body<'a> {
    Request,
    Ping,
    Pong,
    Image(&'a str),
}

impl<'a> Body<'a> {
    pub fn parse(body: &'a [u8]) -> Result<Self, std::str::Utf8Error> {
        match body {
            REQUEST_BODY => Ok(Body::Request),
            PING_BODY => Ok(Body::Ping),
            PONG_BODY => Ok(Body::Pong),
            other => std::str::from_utf8(other).map(Body::Image),
        }
    }
}
