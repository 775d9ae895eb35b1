//! Response payload classification.
//!
//! A response body opens with a compact Hessian int telling the caller what
//! follows: `0x90` (0) a serialized throwable, `0x91` (1) the return value,
//! `0x92` (2) a null or void result. Only these three one-byte forms are
//! accepted in the marker position.

use std::fmt;

use crate::error::{ProtocolError, RemoteError, Result};
use crate::hessian::{decode_value_with, DecodeOptions, Value};
use crate::naming::camel_to_snake;

const MARKER_EXCEPTION: u8 = 0x90;
const MARKER_VALUE: u8 = 0x91;
const MARKER_NULL: u8 = 0x92;

/// A classified response payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// The call raised remotely; the body carried a serialized throwable.
    Exception(GenericException),
    /// The call returned a value.
    Value(Value),
    /// The call returned null or void.
    Null,
}

/// Classify one already-unwrapped response payload.
pub fn classify(payload: &[u8]) -> Result<Reply> {
    classify_with(payload, DecodeOptions::default())
}

/// [`classify`] with explicit decoding options.
pub fn classify_with(payload: &[u8], options: DecodeOptions) -> Result<Reply> {
    let (&marker, rest) = payload
        .split_first()
        .ok_or(ProtocolError::Truncated { need: 1, at: 0 })?;
    match marker {
        MARKER_EXCEPTION => {
            let value = decode_value_with(rest, options)?;
            Ok(Reply::Exception(GenericException::from_value(value)))
        }
        MARKER_VALUE => Ok(Reply::Value(decode_value_with(rest, options)?)),
        // Some peers append attachments after a null marker; whatever
        // follows is left undecoded.
        MARKER_NULL => Ok(Reply::Null),
        other => Err(ProtocolError::UnknownResponseType(other).into()),
    }
}

impl Reply {
    /// Collapse to the caller-facing result. Null and void replies become
    /// [`Value::Null`]; a serialized exception becomes
    /// [`RemoteError::Exception`].
    pub fn into_result(self) -> Result<Value> {
        match self {
            Reply::Value(value) => Ok(value),
            Reply::Null => Ok(Value::Null),
            Reply::Exception(exception) => Err(RemoteError::Exception(exception).into()),
        }
    }
}

/// A remote throwable, reassembled from whatever shape the peer sent.
#[derive(Debug, Clone, PartialEq)]
pub struct GenericException {
    /// Fully qualified class name of the remote throwable.
    pub exception_class: String,
    /// Message reported by the generic-invocation wrapper, when present.
    pub exception_message: Option<String>,
    /// The throwable's own detail message field.
    pub detail_message: Option<String>,
    /// Stack trace rendered to text lines, outermost frame first.
    pub stack_trace: Vec<String>,
    /// The chained cause, kept as decoded (often a back-reference).
    pub cause: Option<Box<Value>>,
    /// Suppressed throwables, kept as decoded.
    pub suppressed_exceptions: Vec<Value>,
}

impl GenericException {
    /// Best-effort reinterpretation of a decoded exception body.
    ///
    /// Servers send either a full throwable instance, a generic-filter
    /// wrapper carrying `exceptionClass`/`exceptionMessage`, a string-keyed
    /// map, or occasionally a bare message string. Fields that cannot be
    /// found stay empty; unrecognized shapes ride along in `cause` so the
    /// caller can still inspect them.
    pub fn from_value(value: Value) -> GenericException {
        match value {
            value @ (Value::Object(_) | Value::Map(_)) => {
                let exception_class = lookup_str(&value, "exception_class")
                    .or_else(|| value.as_object().map(|o| o.class_name().to_owned()))
                    .unwrap_or_else(|| "java.lang.Throwable".to_owned());
                let stack_trace = lookup(&value, "stack_trace")
                    .and_then(Value::as_list)
                    .map(|frames| frames.iter().map(render_frame).collect())
                    .unwrap_or_default();
                let cause = lookup(&value, "cause")
                    .filter(|v| !v.is_null())
                    .cloned()
                    .map(Box::new);
                let suppressed_exceptions = lookup(&value, "suppressed_exceptions")
                    .and_then(Value::as_list)
                    .map(<[Value]>::to_vec)
                    .unwrap_or_default();
                GenericException {
                    exception_class,
                    exception_message: lookup_str(&value, "exception_message"),
                    detail_message: lookup_str(&value, "detail_message"),
                    stack_trace,
                    cause,
                    suppressed_exceptions,
                }
            }
            Value::String(message) => GenericException {
                exception_class: "java.lang.Throwable".to_owned(),
                exception_message: Some(message),
                detail_message: None,
                stack_trace: Vec::new(),
                cause: None,
                suppressed_exceptions: Vec::new(),
            },
            other => GenericException {
                exception_class: "java.lang.Throwable".to_owned(),
                exception_message: None,
                detail_message: None,
                stack_trace: Vec::new(),
                cause: Some(Box::new(other)),
                suppressed_exceptions: Vec::new(),
            },
        }
    }

    /// The most specific human-readable message available.
    pub fn message(&self) -> Option<&str> {
        self.exception_message.as_deref().or(self.detail_message.as_deref())
    }
}

impl fmt::Display for GenericException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.message() {
            Some(message) => write!(f, "{}: {}", self.exception_class, message),
            None => f.write_str(&self.exception_class),
        }
    }
}

/// Field lookup over either an object (converted names) or a string-keyed
/// map (keys converted on the fly).
fn lookup<'v>(value: &'v Value, field: &str) -> Option<&'v Value> {
    match value {
        Value::Object(object) => object.get(field),
        Value::Map(pairs) => pairs.iter().find_map(|(key, v)| {
            let key = key.as_str()?;
            (camel_to_snake(key) == field).then_some(v)
        }),
        _ => None,
    }
}

fn lookup_str(value: &Value, field: &str) -> Option<String> {
    lookup(value, field).and_then(Value::as_str).map(str::to_owned)
}

/// One stack frame to text, matching the familiar JVM rendering.
fn render_frame(frame: &Value) -> String {
    if let Some(text) = frame.as_str() {
        return text.to_owned();
    }
    if !matches!(frame, Value::Object(_) | Value::Map(_)) {
        return frame.to_string();
    }
    let class = lookup(frame, "declaring_class").and_then(Value::as_str).unwrap_or("<unknown>");
    let method = lookup(frame, "method_name").and_then(Value::as_str).unwrap_or("<unknown>");
    let file = lookup(frame, "file_name").and_then(Value::as_str);
    let line = lookup(frame, "line_number").and_then(Value::as_i64);
    match (file, line) {
        (Some(file), Some(line)) => format!("at {class}.{method}({file}:{line})"),
        (Some(file), None) => format!("at {class}.{method}({file})"),
        _ => format!("at {class}.{method}(Unknown Source)"),
    }
}
