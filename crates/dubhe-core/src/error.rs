//! Shared error types across dubhe crates.
//!
//! Two distinct failure families, per the protocol's contract:
//! [`ProtocolError`] means the local bytes do not conform to the grammar;
//! [`RemoteError`] means the peer reported a failure (non-OK status code or a
//! serialized exception) and is surfaced verbatim, never swallowed or retried
//! at this layer.

use thiserror::Error;

use crate::protocol::Status;
use crate::reply::GenericException;

/// Shared result type.
pub type Result<T> = std::result::Result<T, DubheError>;

/// Malformed-input errors. These abort decoding of the current message only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The 2-byte magic did not match the protocol constant.
    #[error("bad magic: expected 0xdabb, got {got:#06x}")]
    BadMagic { got: u16 },
    /// A tag byte matched no decoding rule at this position.
    #[error("unknown tag {tag:#04x} at offset {at}")]
    UnknownTag { tag: u8, at: usize },
    /// The envelope flag carried a serialization id with no registered codec.
    #[error("unknown serialization id {0}")]
    UnknownSerialization(u8),
    /// The status byte matched no known status code.
    #[error("unknown status byte {0}")]
    UnknownStatus(u8),
    /// The response payload's leading type byte was not 0, 1, or 2.
    #[error("unknown response type byte {0:#04x}")]
    UnknownResponseType(u8),
    /// A reference pointed outside the allocated composite table.
    #[error("reference {index} out of range (table has {len})")]
    BadReference { index: usize, len: usize },
    /// An object referenced a class definition that was never transmitted.
    #[error("class definition {index} out of range (table has {len})")]
    BadClassDef { index: usize, len: usize },
    /// A complete value left unconsumed bytes at the top level.
    #[error("trailing data: {remaining} unconsumed bytes")]
    TrailingData { remaining: usize },
    /// The input ended before a rule finished consuming its bytes.
    #[error("truncated input: need {need} more bytes at offset {at}")]
    Truncated { need: usize, at: usize },
    /// An int in a count or index position decoded negative.
    #[error("negative count {value} at offset {at}")]
    NegativeCount { value: i32, at: usize },
    /// Value nesting exceeded the decoder's recursion limit.
    #[error("nesting deeper than {max} levels")]
    TooDeep { max: usize },
    /// A string span was not valid UTF-8.
    #[error("invalid utf-8 in string at offset {at}")]
    InvalidUtf8 { at: usize },
    /// The declared payload length exceeds the configured cap.
    #[error("payload too large: {size} bytes exceeds cap {max}")]
    PayloadTooLarge { size: usize, max: usize },
}

impl ProtocolError {
    /// True when the error makes the stream's framing boundary untrustworthy.
    ///
    /// A magic mismatch means the length field cannot be believed, so the
    /// connection carrying the bytes must be closed. Every other variant is
    /// raised inside a payload whose length was already known; the stream
    /// position stays recoverable and the connection may be reused.
    pub fn framing_lost(&self) -> bool {
        matches!(self, ProtocolError::BadMagic { .. })
    }
}

/// Peer-reported failures, surfaced with the original fields intact.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RemoteError {
    /// The envelope carried a recognized non-OK status code.
    #[error("remote status {}: {}", .0.code(), .0.as_str())]
    Status(Status),
    /// The response body decoded to a serialized exception.
    #[error("remote exception: {0}")]
    Exception(GenericException),
}

/// Unified error type used by core and client.
#[derive(Debug, Error)]
pub enum DubheError {
    #[error("protocol: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("remote: {0}")]
    Remote(#[from] RemoteError),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("timed out after {0} ms")]
    Timeout(u64),
    #[error("connection: {0}")]
    Connection(String),
    #[error("config: {0}")]
    Config(String),
    #[error("bad argument: {0}")]
    BadArgument(String),
    #[error("encode: {0}")]
    Encode(#[from] serde_json::Error),
}

impl DubheError {
    /// True when the underlying failure poisons the connection's framing.
    pub fn framing_lost(&self) -> bool {
        match self {
            DubheError::Protocol(e) => e.framing_lost(),
            // A transport-level failure always invalidates the stream.
            DubheError::Io(_) | DubheError::Timeout(_) | DubheError::Connection(_) => true,
            _ => false,
        }
    }
}
