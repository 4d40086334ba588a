//! Protobuf wire-format reader.
//!
//! Only what descriptor metadata needs: field iteration, varints,
//! length-delimited payloads and packed repeated integers. Unknown
//! fields are skipped by the callers' `_ => {}` arms.

use super::MetadataError;

/// A decoded field value, borrowing from the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireValue<'a> {
    Varint(u64),
    Fixed64(u64),
    Bytes(&'a [u8]),
    Fixed32(u32),
}

impl<'a> WireValue<'a> {
    /// Interpret as a (possibly negative) 32-bit integer.
    pub fn as_i32(&self) -> i32 {
        match *self {
            Self::Varint(v) | Self::Fixed64(v) => v as i32,
            Self::Fixed32(v) => v as i32,
            Self::Bytes(_) => 0,
        }
    }

    pub fn as_bool(&self) -> bool {
        self.as_i32() != 0
    }

    pub fn as_bytes(&self, field: &'static str) -> Result<&'a [u8], MetadataError> {
        match *self {
            Self::Bytes(bytes) => Ok(bytes),
            _ => Err(MetadataError::encoding(format!(
                "expected length-delimited value for '{field}'"
            ))),
        }
    }

    pub fn as_string(&self, field: &'static str) -> Result<String, MetadataError> {
        let bytes = self.as_bytes(field)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| MetadataError::encoding(format!("'{field}' is not UTF-8: {e}")))
    }

    /// Append repeated int32 values, accepting packed and unpacked encodings.
    pub fn push_i32s(&self, out: &mut Vec<i32>) -> Result<(), MetadataError> {
        match *self {
            Self::Bytes(bytes) => {
                let mut reader = ProtoReader::new(bytes);
                while !reader.is_at_end() {
                    out.push(reader.read_varint()? as i32);
                }
                Ok(())
            }
            other => {
                out.push(other.as_i32());
                Ok(())
            }
        }
    }
}

/// Cursor over a protobuf-encoded message.
#[derive(Debug, Clone)]
pub struct ProtoReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ProtoReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.buf.len()
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Unread remainder of the input.
    pub fn remaining(&self) -> &'a [u8] {
        &self.buf[self.pos.min(self.buf.len())..]
    }

    pub fn read_varint(&mut self) -> Result<u64, MetadataError> {
        let mut result: u64 = 0;
        for shift in (0..70).step_by(7) {
            let byte = *self
                .buf
                .get(self.pos)
                .ok_or(MetadataError::Truncated("varint"))?;
            self.pos += 1;
            if shift == 63 && byte > 1 {
                return Err(MetadataError::VarintOverflow);
            }
            result |= u64::from(byte & 0x7F) << shift;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
        }
        Err(MetadataError::VarintOverflow)
    }

    fn take(&mut self, len: usize, what: &'static str) -> Result<&'a [u8], MetadataError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.buf.len())
            .ok_or(MetadataError::Truncated(what))?;
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    /// Read a varint length prefix followed by that many bytes.
    pub fn read_delimited(&mut self) -> Result<&'a [u8], MetadataError> {
        let len = self.read_varint()? as usize;
        self.take(len, "length-delimited value")
    }

    /// Next `(field number, value)` pair, or `None` at end of input.
    pub fn next_field(&mut self) -> Result<Option<(u32, WireValue<'a>)>, MetadataError> {
        if self.is_at_end() {
            return Ok(None);
        }
        let key = self.read_varint()?;
        let field = (key >> 3) as u32;
        let wire_type = (key & 0x7) as u8;
        let value = match wire_type {
            0 => WireValue::Varint(self.read_varint()?),
            1 => {
                let bytes = self.take(8, "fixed64")?;
                let mut raw = [0u8; 8];
                raw.copy_from_slice(bytes);
                WireValue::Fixed64(u64::from_le_bytes(raw))
            }
            2 => WireValue::Bytes(self.read_delimited()?),
            5 => {
                let bytes = self.take(4, "fixed32")?;
                let mut raw = [0u8; 4];
                raw.copy_from_slice(bytes);
                WireValue::Fixed32(u32::from_le_bytes(raw))
            }
            _ => return Err(MetadataError::InvalidWireType { field, wire_type }),
        };
        Ok(Some((field, value)))
    }
}

/// Protobuf encoder, the mirror of [`ProtoReader`].
///
/// Fields are appended in call order.
#[derive(Debug, Clone, Default)]
pub struct ProtoWriter {
    buf: Vec<u8>,
}

impl ProtoWriter {
    pub fn new() -> Self {
        Self::default()
    }

    fn raw_varint(&mut self, mut value: u64) {
        loop {
            let byte = (value & 0x7F) as u8;
            value >>= 7;
            if value == 0 {
                self.buf.push(byte);
                return;
            }
            self.buf.push(byte | 0x80);
        }
    }

    fn key(&mut self, field: u32, wire_type: u8) {
        self.raw_varint((u64::from(field) << 3) | u64::from(wire_type));
    }

    /// int32 field; negative values take ten bytes.
    pub fn int32(mut self, field: u32, value: i32) -> Self {
        self.key(field, 0);
        self.raw_varint(i64::from(value) as u64);
        self
    }

    pub fn bool(self, field: u32, value: bool) -> Self {
        self.int32(field, i32::from(value))
    }

    pub fn bytes(mut self, field: u32, value: &[u8]) -> Self {
        self.key(field, 2);
        self.raw_varint(value.len() as u64);
        self.buf.extend_from_slice(value);
        self
    }

    pub fn string(self, field: u32, value: &str) -> Self {
        self.bytes(field, value.as_bytes())
    }

    pub fn message(self, field: u32, message: ProtoWriter) -> Self {
        self.bytes(field, &message.finish())
    }

    pub fn packed(self, field: u32, values: &[i32]) -> Self {
        let mut inner = ProtoWriter::new();
        for value in values {
            inner.raw_varint(i64::from(*value) as u64);
        }
        self.bytes(field, &inner.finish())
    }

    /// The message prefixed by its varint length.
    pub fn finish_delimited(self) -> Vec<u8> {
        let mut out = ProtoWriter::new();
        out.raw_varint(self.buf.len() as u64);
        out.buf.extend_from_slice(&self.buf);
        out.buf
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}
