//! Wire-level framing: the fixed 16-byte envelope and status codes.

pub mod envelope;

pub use envelope::{
    encode_request, write_request, Envelope, EnvelopeHeader, Status, FLAG_EVENT, FLAG_REQUEST,
    FLAG_TWO_WAY, HEADER_LEN, MAGIC, SERIALIZATION_FASTJSON, SERIALIZATION_HESSIAN2,
    SERIALIZATION_MASK,
};
