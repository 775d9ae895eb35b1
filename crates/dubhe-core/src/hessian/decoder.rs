//! Hessian 2.0 tag-dispatch decoder (panic-free).
//!
//! One decode call owns one cursor over one payload slice plus its own
//! class-definition table and reference accounting; nothing is shared across
//! calls, so independent decodes may run concurrently without locking.
//!
//! The first unconsumed byte of a value is its tag. Dispatch is a single
//! exhaustive `match` over disjoint ranges covering all of `0x00..=0xFF`, so
//! total coverage is checked at compile time. All multi-byte integers are
//! big-endian.
//!
//! Parsing rules:
//! - Never index (`buf[0]`) — bounds-checked reads only.
//! - Never `unwrap()` / `expect()` / `panic!()` in production paths.

use std::sync::Arc;

use crate::error::{ProtocolError, Result};
use crate::hessian::value::{ClassDef, Object, Value};

/// Maximum value nesting accepted before decoding fails with
/// [`ProtocolError::TooDeep`]. Keeps a hostile payload of nested open-tags
/// from exhausting the stack.
pub const MAX_DEPTH: usize = 128;

/// How the four-byte float form widens to a double.
///
/// Peers disagree on this form: the standard reading widens the four bytes as
/// a 32-bit IEEE-754 float, while some emitters sum the high three bytes as an
/// integer and scale only the low byte by a thousandth. Both are supported;
/// pick [`FloatCast::Compat`] when talking to a peer that produces the latter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FloatCast {
    /// Widen the big-endian bit pattern as an IEEE-754 float.
    #[default]
    Ieee754,
    /// `(b3 << 24) + (b2 << 16) + (b1 << 8)` plus `b0 / 1000`.
    Compat,
}

/// Per-call decoding options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeOptions {
    pub float_cast: FloatCast,
}

/// Decode exactly one value, requiring full consumption of `buf`.
pub fn decode_value(buf: &[u8]) -> Result<Value> {
    decode_value_with(buf, DecodeOptions::default())
}

/// [`decode_value`] with explicit options.
pub fn decode_value_with(buf: &[u8], options: DecodeOptions) -> Result<Value> {
    let mut decoder = Decoder::new(buf, options);
    let value = decoder.decode_any()?;
    let remaining = decoder.remaining();
    if remaining > 0 {
        return Err(ProtocolError::TrailingData { remaining }.into());
    }
    Ok(value)
}

struct Decoder<'a> {
    buf: &'a [u8],
    pos: usize,
    options: DecodeOptions,
    /// Class definitions in wire order; object tags index into this.
    defs: Vec<Arc<ClassDef>>,
    /// Composites allocated so far. Each list/map/object claims its ordinal
    /// before its children decode, which is what lets a child refer back to
    /// a container that is still being filled.
    allocated: usize,
    depth: usize,
}

impl<'a> Decoder<'a> {
    fn new(buf: &'a [u8], options: DecodeOptions) -> Decoder<'a> {
        Decoder {
            buf,
            pos: 0,
            options,
            defs: Vec::new(),
            allocated: 0,
            depth: 0,
        }
    }

    fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    fn peek_u8(&self) -> Result<u8> {
        self.buf
            .get(self.pos)
            .copied()
            .ok_or_else(|| ProtocolError::Truncated { need: 1, at: self.pos }.into())
    }

    fn read_u8(&mut self) -> Result<u8> {
        let byte = self.peek_u8()?;
        self.pos += 1;
        Ok(byte)
    }

    fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .ok_or(ProtocolError::Truncated { need: n, at: self.pos })?;
        match self.buf.get(self.pos..end) {
            Some(slice) => {
                self.pos = end;
                Ok(slice)
            }
            None => Err(ProtocolError::Truncated {
                need: end - self.buf.len(),
                at: self.pos,
            }
            .into()),
        }
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let at = self.pos;
        let bytes = self.read_bytes(N)?;
        <[u8; N]>::try_from(bytes).map_err(|_| ProtocolError::Truncated { need: N, at }.into())
    }

    fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.read_array::<2>()?))
    }

    /// Claim the next reference-table ordinal.
    fn alloc_ref(&mut self) -> usize {
        let ordinal = self.allocated;
        self.allocated += 1;
        ordinal
    }

    /// Decode one value of any kind, guarding recursion depth.
    fn decode_any(&mut self) -> Result<Value> {
        if self.depth >= MAX_DEPTH {
            return Err(ProtocolError::TooDeep { max: MAX_DEPTH }.into());
        }
        self.depth += 1;
        let value = self.decode_tag();
        self.depth -= 1;
        value
    }

    /// Read a tag byte and dispatch on it. Every byte value lands in exactly
    /// one arm; 0x40/0x45/0x47/0x50 are unassigned by the grammar and 0x5A is
    /// the container end marker, invalid in value position.
    fn decode_tag(&mut self) -> Result<Value> {
        let at = self.pos;
        let tag = self.read_u8()?;
        match tag {
            0x00..=0x1F | 0x30..=0x33 | 0x52 | 0x53 => {
                Ok(Value::String(self.read_string_rest(tag, at)?))
            }
            0x20..=0x2F | 0x34..=0x37 | 0x41 | 0x42 => {
                Ok(Value::Bytes(self.read_binary_rest(tag, at)?))
            }
            0x38..=0x3F | 0x4C | 0x59 | 0xD8..=0xFF => Ok(Value::Long(self.read_long_rest(tag)?)),
            0x43 => self.read_class_def_chain(),
            0x44 | 0x5B..=0x5F => Ok(Value::Double(self.read_double_rest(tag)?)),
            0x46 => Ok(Value::Bool(false)),
            0x54 => Ok(Value::Bool(true)),
            0x48 | 0x4D => self.read_map_rest(tag),
            0x49 | 0x80..=0xD7 => Ok(Value::Int(self.read_int_rest(tag)?)),
            0x4A | 0x4B => Ok(Value::Date(self.read_date_rest(tag)?)),
            0x4E => Ok(Value::Null),
            0x4F | 0x60..=0x6F => self.read_object_rest(tag),
            0x51 => self.read_ref_rest(),
            0x55..=0x58 | 0x70..=0x7F => self.read_list_rest(tag),
            0x40 | 0x45 | 0x47 | 0x50 | 0x5A => Err(ProtocolError::UnknownTag { tag, at }.into()),
        }
    }

    /// Int forms, tag already consumed:
    /// one byte `tag - 0x90` for -16..=47, two bytes `(tag - 0xC8) << 8 | b0`
    /// for -2048..=2047, three bytes `(tag - 0xD4) << 16 | b1 b0` for
    /// -262144..=262143, and 0x49 with four signed big-endian bytes.
    fn read_int_rest(&mut self, tag: u8) -> Result<i32> {
        match tag {
            0x80..=0xBF => Ok(i32::from(tag) - 0x90),
            0xC0..=0xCF => {
                let b0 = self.read_u8()?;
                Ok(((i32::from(tag) - 0xC8) << 8) + i32::from(b0))
            }
            0xD0..=0xD7 => {
                let [b1, b0] = self.read_array::<2>()?;
                Ok(((i32::from(tag) - 0xD4) << 16) + (i32::from(b1) << 8) + i32::from(b0))
            }
            0x49 => Ok(i32::from_be_bytes(self.read_array::<4>()?)),
            other => Err(ProtocolError::UnknownTag { tag: other, at: self.pos }.into()),
        }
    }

    /// Long forms: one byte `tag - 0xE0` for -8..=15, two bytes
    /// `(tag - 0xF8) << 8 | b0`, three bytes `(tag - 0x3C) << 16 | b1 b0`,
    /// 0x59 with a sign-extended 32-bit value, 0x4C with eight bytes.
    fn read_long_rest(&mut self, tag: u8) -> Result<i64> {
        match tag {
            0xD8..=0xEF => Ok(i64::from(tag) - 0xE0),
            0xF0..=0xFF => {
                let b0 = self.read_u8()?;
                Ok(((i64::from(tag) - 0xF8) << 8) + i64::from(b0))
            }
            0x38..=0x3F => {
                let [b1, b0] = self.read_array::<2>()?;
                Ok(((i64::from(tag) - 0x3C) << 16) + (i64::from(b1) << 8) + i64::from(b0))
            }
            0x59 => Ok(i64::from(i32::from_be_bytes(self.read_array::<4>()?))),
            0x4C => Ok(i64::from_be_bytes(self.read_array::<8>()?)),
            other => Err(ProtocolError::UnknownTag { tag: other, at: self.pos }.into()),
        }
    }

    /// Double forms: literal 0.0 and 1.0, signed byte cast, signed short
    /// cast, the four-byte float form (see [`FloatCast`]), and the full
    /// eight-byte IEEE-754 pattern.
    fn read_double_rest(&mut self, tag: u8) -> Result<f64> {
        match tag {
            0x5B => Ok(0.0),
            0x5C => Ok(1.0),
            0x5D => Ok(f64::from(self.read_u8()? as i8)),
            0x5E => Ok(f64::from(i16::from_be_bytes(self.read_array::<2>()?))),
            0x5F => {
                let [b3, b2, b1, b0] = self.read_array::<4>()?;
                match self.options.float_cast {
                    FloatCast::Ieee754 => {
                        let bits = u32::from_be_bytes([b3, b2, b1, b0]);
                        Ok(f64::from(f32::from_bits(bits)))
                    }
                    FloatCast::Compat => {
                        let high =
                            (u32::from(b3) << 24) + (u32::from(b2) << 16) + (u32::from(b1) << 8);
                        Ok(f64::from(high) + f64::from(b0) * 0.001)
                    }
                }
            }
            0x44 => Ok(f64::from_bits(u64::from_be_bytes(self.read_array::<8>()?))),
            other => Err(ProtocolError::UnknownTag { tag: other, at: self.pos }.into()),
        }
    }

    /// Date forms: eight bytes of epoch milliseconds, or four signed bytes of
    /// epoch minutes scaled to milliseconds.
    fn read_date_rest(&mut self, tag: u8) -> Result<i64> {
        match tag {
            0x4A => Ok(i64::from_be_bytes(self.read_array::<8>()?)),
            0x4B => Ok(i64::from(i32::from_be_bytes(self.read_array::<4>()?)) * 60_000),
            other => Err(ProtocolError::UnknownTag { tag: other, at: self.pos }.into()),
        }
    }

    /// String forms. The count is in Unicode code points, not bytes; a
    /// non-final 0x52 chunk loops until a final form terminates the value.
    fn read_string_rest(&mut self, first_tag: u8, first_at: usize) -> Result<String> {
        let mut out = String::new();
        let (mut tag, mut at) = (first_tag, first_at);
        loop {
            let done = match tag {
                0x00..=0x1F => {
                    self.read_utf8_into(&mut out, usize::from(tag))?;
                    true
                }
                0x30..=0x33 => {
                    let b0 = self.read_u8()?;
                    let count = ((usize::from(tag) - 0x30) << 8) | usize::from(b0);
                    self.read_utf8_into(&mut out, count)?;
                    true
                }
                0x53 => {
                    let count = usize::from(self.read_u16()?);
                    self.read_utf8_into(&mut out, count)?;
                    true
                }
                0x52 => {
                    let count = usize::from(self.read_u16()?);
                    self.read_utf8_into(&mut out, count)?;
                    false
                }
                other => return Err(ProtocolError::UnknownTag { tag: other, at }.into()),
            };
            if done {
                return Ok(out);
            }
            at = self.pos;
            tag = self.read_u8()?;
        }
    }

    /// Consume `count` code points, sniffing each width from its UTF-8 lead
    /// byte, then validate and append the span.
    fn read_utf8_into(&mut self, out: &mut String, count: usize) -> Result<()> {
        let start = self.pos;
        for _ in 0..count {
            let at = self.pos;
            let lead = self.read_u8()?;
            let width = match lead {
                0x00..=0x7F => 1,
                0xC0..=0xDF => 2,
                0xE0..=0xEF => 3,
                0xF0..=0xF7 => 4,
                // A continuation byte (or 0xF8+) cannot lead a code point.
                _ => return Err(ProtocolError::InvalidUtf8 { at }.into()),
            };
            if width > 1 {
                self.read_bytes(width - 1)?;
            }
        }
        let span = self.buf.get(start..self.pos).unwrap_or_default();
        let text = std::str::from_utf8(span)
            .map_err(|e| ProtocolError::InvalidUtf8 { at: start + e.valid_up_to() })?;
        out.push_str(text);
        Ok(())
    }

    /// A string in a mandatory position (class name, field name).
    fn expect_string(&mut self) -> Result<String> {
        let at = self.pos;
        let tag = self.read_u8()?;
        // read_string_rest rejects non-string tags itself.
        self.read_string_rest(tag, at)
    }

    /// Binary forms: inline 0–15, extended 0–1023, 16-bit-count final 0x42,
    /// and non-final 0x41 chunks concatenated until a final form.
    fn read_binary_rest(&mut self, first_tag: u8, first_at: usize) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let (mut tag, mut at) = (first_tag, first_at);
        loop {
            let done = match tag {
                0x20..=0x2F => {
                    self.read_blob_into(&mut out, usize::from(tag) - 0x20)?;
                    true
                }
                0x34..=0x37 => {
                    let b0 = self.read_u8()?;
                    let len = ((usize::from(tag) - 0x34) << 8) | usize::from(b0);
                    self.read_blob_into(&mut out, len)?;
                    true
                }
                0x42 => {
                    let len = usize::from(self.read_u16()?);
                    self.read_blob_into(&mut out, len)?;
                    true
                }
                0x41 => {
                    let len = usize::from(self.read_u16()?);
                    self.read_blob_into(&mut out, len)?;
                    false
                }
                other => return Err(ProtocolError::UnknownTag { tag: other, at }.into()),
            };
            if done {
                return Ok(out);
            }
            at = self.pos;
            tag = self.read_u8()?;
        }
    }

    fn read_blob_into(&mut self, out: &mut Vec<u8>, len: usize) -> Result<()> {
        let bytes = self.read_bytes(len)?;
        out.extend_from_slice(bytes);
        Ok(())
    }

    /// An int in a mandatory position (count, definition index, reference).
    fn expect_int(&mut self) -> Result<i32> {
        let at = self.pos;
        let tag = self.read_u8()?;
        match tag {
            0x49 | 0x80..=0xD7 => self.read_int_rest(tag),
            other => Err(ProtocolError::UnknownTag { tag: other, at }.into()),
        }
    }

    /// An int in a position that must be non-negative.
    fn expect_count(&mut self) -> Result<usize> {
        let at = self.pos;
        let n = self.expect_int()?;
        usize::try_from(n).map_err(|_| ProtocolError::NegativeCount { value: n, at }.into())
    }

    /// A type position carries a string, or occasionally an int reference
    /// into the peer's type table; either way the value is discarded.
    fn discard_type(&mut self) -> Result<()> {
        let _ = self.decode_any()?;
        Ok(())
    }

    /// List forms. The container claims its reference ordinal before any
    /// element decodes, so an element may be a reference to the list itself.
    fn read_list_rest(&mut self, tag: u8) -> Result<Value> {
        self.alloc_ref();
        match tag {
            // Variable-length, 0x5A-terminated.
            0x55 => {
                self.discard_type()?;
                self.read_list_until_end()
            }
            0x57 => self.read_list_until_end(),
            // Explicit count.
            0x56 => {
                self.discard_type()?;
                let n = self.expect_count()?;
                self.read_list_fixed(n)
            }
            0x58 => {
                let n = self.expect_count()?;
                self.read_list_fixed(n)
            }
            // Count embedded in the tag.
            0x70..=0x77 => {
                let n = usize::from(tag) - 0x70;
                self.discard_type()?;
                self.read_list_fixed(n)
            }
            0x78..=0x7F => self.read_list_fixed(usize::from(tag) - 0x78),
            other => Err(ProtocolError::UnknownTag { tag: other, at: self.pos }.into()),
        }
    }

    fn read_list_until_end(&mut self) -> Result<Value> {
        let mut items = Vec::new();
        loop {
            if self.peek_u8()? == 0x5A {
                self.pos += 1;
                return Ok(Value::List(items));
            }
            items.push(self.decode_any()?);
        }
    }

    fn read_list_fixed(&mut self, n: usize) -> Result<Value> {
        // Reservation is capped by the input left: each element costs at
        // least one byte, so a hostile count cannot force a huge allocation.
        let mut items = Vec::with_capacity(n.min(self.remaining()));
        for _ in 0..n {
            items.push(self.decode_any()?);
        }
        Ok(Value::List(items))
    }

    /// Map forms: 0x4D reads and discards a type first, 0x48 does not. Pairs
    /// decode alternately until the 0x5A end marker; order is preserved. The
    /// map claims its reference ordinal before any pair decodes.
    fn read_map_rest(&mut self, tag: u8) -> Result<Value> {
        self.alloc_ref();
        if tag == 0x4D {
            self.discard_type()?;
        }
        let mut pairs = Vec::new();
        loop {
            if self.peek_u8()? == 0x5A {
                self.pos += 1;
                return Ok(Value::Map(pairs));
            }
            let key = self.decode_any()?;
            // The end marker is invalid in value position, so a dangling key
            // surfaces as UnknownTag(0x5A) instead of being dropped.
            let value = self.decode_any()?;
            pairs.push((key, value));
        }
    }

    /// `C string int string*`: record the definition, then require another
    /// definition or the object that uses one. Peers may flush several
    /// definitions ahead of the first instance.
    fn read_class_def_chain(&mut self) -> Result<Value> {
        loop {
            let name = self.expect_string()?;
            let count = self.expect_count()?;
            let mut wire_fields = Vec::with_capacity(count.min(self.remaining()));
            for _ in 0..count {
                wire_fields.push(self.expect_string()?);
            }
            self.defs.push(Arc::new(ClassDef::from_wire(name, wire_fields)));

            let at = self.pos;
            let tag = self.read_u8()?;
            match tag {
                0x43 => continue,
                0x4F | 0x60..=0x6F => return self.read_object_rest(tag),
                other => return Err(ProtocolError::UnknownTag { tag: other, at }.into()),
            }
        }
    }

    /// Object forms: 0x4F with an explicit definition index, or a compact tag
    /// embedding an index 0–15. The instance claims its reference ordinal
    /// before its fields decode (a field may point back at it), then fields
    /// decode strictly in the definition's declared order.
    fn read_object_rest(&mut self, tag: u8) -> Result<Value> {
        let def_index = match tag {
            0x4F => self.expect_count()?,
            0x60..=0x6F => usize::from(tag) - 0x60,
            other => return Err(ProtocolError::UnknownTag { tag: other, at: self.pos }.into()),
        };
        let def = self
            .defs
            .get(def_index)
            .cloned()
            .ok_or(ProtocolError::BadClassDef { index: def_index, len: self.defs.len() })?;

        self.alloc_ref();
        let mut fields = Vec::with_capacity(def.fields.len());
        for _ in 0..def.fields.len() {
            fields.push(self.decode_any()?);
        }
        Ok(Value::Object(Object { def_index, def, fields }))
    }

    /// `0x51 int`: a back-reference to an already allocated composite.
    fn read_ref_rest(&mut self) -> Result<Value> {
        let index = self.expect_count()?;
        if index < self.allocated {
            Ok(Value::Ref(index))
        } else {
            Err(ProtocolError::BadReference { index, len: self.allocated }.into())
        }
    }
}
