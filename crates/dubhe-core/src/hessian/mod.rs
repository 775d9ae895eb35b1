//! Hessian 2.0 binary deserialization.
//!
//! [`decode_value`] turns one serialized value into a [`Value`] tree. Class
//! definitions and back-references are scoped to a single call; feed it one
//! complete payload at a time.

mod decoder;
mod value;

pub use decoder::{decode_value, decode_value_with, DecodeOptions, FloatCast, MAX_DEPTH};
pub use value::{ClassDef, Object, Value};
