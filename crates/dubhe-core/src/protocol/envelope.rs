//! Envelope framing (panic-free).
//!
//! One logical message is always one frame: a fixed 16-byte header followed by
//! a length-prefixed payload. All multi-byte fields are big-endian.
//!
//! Parsing rules:
//! - Never index (`buf[0]`) — always use `Buf` and `remaining()` checks.
//! - Never `unwrap()` / `expect()` / `panic!()` in production paths.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{ProtocolError, RemoteError, Result};

/// Protocol magic, the first two bytes of every frame.
pub const MAGIC: u16 = 0xdabb;

/// Fixed header size in bytes.
pub const HEADER_LEN: usize = 16;

/// Flag bit 7: direction. Set on requests, clear on responses.
pub const FLAG_REQUEST: u8 = 0x80;
/// Flag bit 6: the request expects a response frame.
pub const FLAG_TWO_WAY: u8 = 0x40;
/// Flag bit 5: protocol event (heartbeat), not an RPC.
pub const FLAG_EVENT: u8 = 0x20;
/// Flag bits 4-0: serialization id of the payload.
pub const SERIALIZATION_MASK: u8 = 0x1f;

/// Serialization id of the Hessian 2.0 binary object-graph codec.
pub const SERIALIZATION_HESSIAN2: u8 = 2;
/// Serialization id of the text (JSON lines) request codec.
pub const SERIALIZATION_FASTJSON: u8 = 6;

/// Response status codes carried in the header's fourth byte.
///
/// Requests carry 0 there, which is not a member of this enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    ClientTimeout,
    ServerTimeout,
    BadRequest,
    BadResponse,
    ServiceNotFound,
    ServiceError,
    ServerError,
    ClientError,
    ThreadpoolExhausted,
}

impl Status {
    /// Map a wire byte to a status code.
    pub fn from_u8(b: u8) -> Option<Status> {
        match b {
            20 => Some(Status::Ok),
            30 => Some(Status::ClientTimeout),
            31 => Some(Status::ServerTimeout),
            40 => Some(Status::BadRequest),
            50 => Some(Status::BadResponse),
            60 => Some(Status::ServiceNotFound),
            70 => Some(Status::ServiceError),
            80 => Some(Status::ServerError),
            90 => Some(Status::ClientError),
            100 => Some(Status::ThreadpoolExhausted),
            _ => None,
        }
    }

    /// Wire byte for this status.
    pub fn code(self) -> u8 {
        match self {
            Status::Ok => 20,
            Status::ClientTimeout => 30,
            Status::ServerTimeout => 31,
            Status::BadRequest => 40,
            Status::BadResponse => 50,
            Status::ServiceNotFound => 60,
            Status::ServiceError => 70,
            Status::ServerError => 80,
            Status::ClientError => 90,
            Status::ThreadpoolExhausted => 100,
        }
    }

    /// String representation used in errors and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::ClientTimeout => "CLIENT_TIMEOUT",
            Status::ServerTimeout => "SERVER_TIMEOUT",
            Status::BadRequest => "BAD_REQUEST",
            Status::BadResponse => "BAD_RESPONSE",
            Status::ServiceNotFound => "SERVICE_NOT_FOUND",
            Status::ServiceError => "SERVICE_ERROR",
            Status::ServerError => "SERVER_ERROR",
            Status::ClientError => "CLIENT_ERROR",
            Status::ThreadpoolExhausted => "THREADPOOL_EXHAUSTED",
        }
    }
}

/// Parsed fixed header. The payload may be read separately (two-phase).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvelopeHeader {
    /// Raw flag byte; see the `FLAG_*` bits and [`SERIALIZATION_MASK`].
    pub flag: u8,
    /// Raw status byte (0 on requests).
    pub status: u8,
    /// Opaque correlation token.
    pub request_id: u64,
    /// Declared payload length in bytes.
    pub payload_len: u32,
}

impl EnvelopeHeader {
    /// Parse the fixed 16-byte header from the front of `buf`.
    ///
    /// Only the magic is validated here; the payload does not need to be
    /// present yet, and the status byte is interpreted by [`check_status`]
    /// once the caller has consumed the frame. A magic mismatch means the
    /// length field cannot be trusted (see `ProtocolError::framing_lost`).
    ///
    /// [`check_status`]: EnvelopeHeader::check_status
    pub fn parse(mut buf: &[u8]) -> Result<EnvelopeHeader> {
        if buf.remaining() < HEADER_LEN {
            return Err(ProtocolError::Truncated {
                need: HEADER_LEN - buf.remaining(),
                at: buf.remaining(),
            }
            .into());
        }

        let magic = buf.get_u16();
        if magic != MAGIC {
            return Err(ProtocolError::BadMagic { got: magic }.into());
        }

        let flag = buf.get_u8();
        let status = buf.get_u8();
        let request_id = buf.get_u64();
        let payload_len = buf.get_u32();

        Ok(EnvelopeHeader {
            flag,
            status,
            request_id,
            payload_len,
        })
    }

    /// Validate the status byte.
    ///
    /// Requests carry 0 and always pass. A response must carry OK(20); any
    /// other recognized code surfaces as `RemoteError::Status` with the
    /// original code intact, and an unrecognized byte is a grammar error.
    pub fn check_status(&self) -> Result<()> {
        if self.is_request() {
            return Ok(());
        }
        match Status::from_u8(self.status) {
            Some(Status::Ok) => Ok(()),
            Some(other) => Err(RemoteError::Status(other).into()),
            None => Err(ProtocolError::UnknownStatus(self.status).into()),
        }
    }

    /// Direction bit: true for request frames.
    pub fn is_request(&self) -> bool {
        self.flag & FLAG_REQUEST != 0
    }

    /// Two-way bit: the request expects a response.
    pub fn is_two_way(&self) -> bool {
        self.flag & FLAG_TWO_WAY != 0
    }

    /// Event bit: heartbeat frame, not an RPC.
    pub fn is_event(&self) -> bool {
        self.flag & FLAG_EVENT != 0
    }

    /// Serialization id from the low five flag bits.
    pub fn serialization_id(&self) -> u8 {
        self.flag & SERIALIZATION_MASK
    }

    /// Declared payload length as a usize.
    pub fn payload_len(&self) -> usize {
        self.payload_len as usize
    }
}

/// One parsed frame: header plus exactly `payload_len` payload bytes.
/// Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub header: EnvelopeHeader,
    /// Opaque payload (zero-copy where the source allows it).
    pub payload: Bytes,
}

impl Envelope {
    /// One-shot parse of a complete frame.
    ///
    /// Validates magic and status, then requires `buf` to hold exactly the
    /// declared payload: a short buffer is `Truncated`, extra bytes after the
    /// frame are `TrailingData`.
    pub fn parse(buf: &[u8]) -> Result<Envelope> {
        let header = EnvelopeHeader::parse(buf)?;
        header.check_status()?;

        // Header parse guaranteed at least HEADER_LEN bytes.
        let body = buf.get(HEADER_LEN..).unwrap_or_default();
        let want = header.payload_len();
        if body.len() < want {
            return Err(ProtocolError::Truncated {
                need: want - body.len(),
                at: buf.len(),
            }
            .into());
        }
        if body.len() > want {
            return Err(ProtocolError::TrailingData {
                remaining: body.len() - want,
            }
            .into());
        }

        Ok(Envelope {
            header,
            payload: Bytes::copy_from_slice(body),
        })
    }

    /// Assemble a frame from a header and a separately read payload.
    pub fn from_parts(header: EnvelopeHeader, payload: Bytes) -> Result<Envelope> {
        let want = header.payload_len();
        if payload.len() != want {
            return Err(ProtocolError::Truncated {
                need: want.saturating_sub(payload.len()),
                at: payload.len(),
            }
            .into());
        }
        Ok(Envelope { header, payload })
    }

    /// Correlation token from the header.
    pub fn request_id(&self) -> u64 {
        self.header.request_id
    }

    /// Serialization id from the header flag.
    pub fn serialization_id(&self) -> u8 {
        self.header.serialization_id()
    }

    /// Event bit from the header flag.
    pub fn is_event(&self) -> bool {
        self.header.is_event()
    }
}

// The length field is 32 bits; a body past its range cannot be framed.
fn length_field(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| {
        ProtocolError::PayloadTooLarge {
            size: len,
            max: u32::MAX as usize,
        }
        .into()
    })
}

/// Write one request frame into `dst`: magic, flag = REQUEST|TWO_WAY|id,
/// status 0, the given request id, big-endian payload length, then the
/// payload verbatim. No fragmentation; a payload the length field cannot
/// carry fails [`ProtocolError::PayloadTooLarge`].
pub fn write_request(
    dst: &mut impl BufMut,
    request_id: u64,
    serialization_id: u8,
    payload: &[u8],
) -> Result<()> {
    let payload_len = length_field(payload.len())?;
    dst.put_u16(MAGIC);
    dst.put_u8(FLAG_REQUEST | FLAG_TWO_WAY | (serialization_id & SERIALIZATION_MASK));
    dst.put_u8(0);
    dst.put_u64(request_id);
    dst.put_u32(payload_len);
    dst.put_slice(payload);
    Ok(())
}

/// Build one request frame as an owned buffer.
pub fn encode_request(request_id: u64, serialization_id: u8, payload: &[u8]) -> Result<Bytes> {
    let mut dst = BytesMut::with_capacity(HEADER_LEN + payload.len());
    write_request(&mut dst, request_id, serialization_id, payload)?;
    Ok(dst.freeze())
}
