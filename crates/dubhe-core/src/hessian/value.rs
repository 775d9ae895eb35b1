//! Decoded value model.
//!
//! Everything the decoder produces is a [`Value`]: an owned, immutable tree
//! with no aliasing. Shared and circular structures are expressed through
//! [`Value::Ref`], which names the reference-table ordinal of an earlier
//! composite instead of pointing at it, so equality and drop always terminate.

use std::fmt;
use std::sync::Arc;

use crate::naming::camel_to_snake;

/// A wire-transmitted object schema: type name plus ordered field names.
///
/// Field names are converted to snake_case when the definition is parsed;
/// the order is exactly the wire order and drives positional field assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDef {
    /// Fully qualified type name as transmitted (e.g. `java.lang.Exception`).
    pub name: String,
    /// Field names in declared order, converted to snake_case.
    pub fields: Vec<String>,
}

impl ClassDef {
    /// Build a definition from wire-form (camelCase) field names.
    pub fn from_wire(name: String, wire_fields: Vec<String>) -> ClassDef {
        let fields = wire_fields.iter().map(|f| camel_to_snake(f)).collect();
        ClassDef { name, fields }
    }
}

/// One decoded class instance.
///
/// Field values sit positionally aligned with `def.fields`; two instances of
/// the same definition share the `Arc` (and the table index it was parsed at).
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    /// Index of the definition in the per-decode class-def table.
    pub def_index: usize,
    /// The shared definition.
    pub def: Arc<ClassDef>,
    /// Field values in the definition's declared order.
    pub fields: Vec<Value>,
}

impl Object {
    /// Type name from the definition.
    pub fn class_name(&self) -> &str {
        &self.def.name
    }

    /// Look a field up by its converted (snake_case) name.
    pub fn get(&self, field: &str) -> Option<&Value> {
        let at = self.def.fields.iter().position(|f| f == field)?;
        self.fields.get(at)
    }

    /// Iterate `(field name, value)` pairs in declared order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.def.fields.iter().map(String::as_str).zip(self.fields.iter())
    }
}

/// A decoded Hessian 2.0 value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    /// 32-bit signed integer.
    Int(i32),
    /// 64-bit signed integer.
    Long(i64),
    Double(f64),
    /// Absolute timestamp as milliseconds since the Unix epoch.
    Date(i64),
    String(String),
    /// Raw byte blob.
    Bytes(Vec<u8>),
    List(Vec<Value>),
    /// Key/value pairs in wire order. Keys may be any value kind.
    Map(Vec<(Value, Value)>),
    Object(Object),
    /// Back-reference to the composite allocated at this table ordinal.
    Ref(usize),
}

impl Value {
    /// The string payload, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// The integer payload widened to i64, if this is an int or long.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(i64::from(*n)),
            Value::Long(n) => Some(*n),
            _ => None,
        }
    }

    /// The list elements, if this is a list.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// The decoded object, if this is a class instance.
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// True for `Value::Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short kind name used in logs and error context.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Double(_) => "double",
            Value::Date(_) => "date",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Object(_) => "object",
            Value::Ref(_) => "ref",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Long(n) => write!(f, "{n}"),
            Value::Double(d) => write!(f, "{d}"),
            Value::Date(ms) => write!(f, "date({ms}ms)"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Bytes(b) => write!(f, "bytes[{}]", b.len()),
            Value::List(items) => write!(f, "list[{}]", items.len()),
            Value::Map(pairs) => write!(f, "map[{}]", pairs.len()),
            Value::Object(o) => write!(f, "{}{{..{}}}", o.class_name(), o.fields.len()),
            Value::Ref(i) => write!(f, "ref({i})"),
        }
    }
}
