//! JVM descriptor parsing.
//!
//! Descriptor types render with source-level names: primitives as their
//! Kotlin names, `V` as `Unit`, primitive arrays as `IntArray` and friends,
//! object arrays as `Array<…>`, classes fully qualified with `.` package
//! separators (`$` is kept for nested binary names).

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid descriptor '{descriptor}' at offset {position}")]
pub struct DescriptorError {
    pub descriptor: String,
    pub position: usize,
}

/// Parameter and return types of a method descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodType {
    pub parameters: Vec<String>,
    pub return_type: String,
}

struct Cursor<'a> {
    descriptor: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(descriptor: &'a str) -> Self {
        Self {
            descriptor,
            bytes: descriptor.as_bytes(),
            pos: 0,
        }
    }

    fn error(&self) -> DescriptorError {
        DescriptorError {
            descriptor: self.descriptor.to_string(),
            position: self.pos,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn expect(&mut self, byte: u8) -> Result<(), DescriptorError> {
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error())
        }
    }

    fn field_type(&mut self, allow_void: bool) -> Result<String, DescriptorError> {
        let tag = self.peek().ok_or_else(|| self.error())?;
        self.pos += 1;
        let primitive = match tag {
            b'B' => Some("Byte"),
            b'C' => Some("Char"),
            b'D' => Some("Double"),
            b'F' => Some("Float"),
            b'I' => Some("Int"),
            b'J' => Some("Long"),
            b'S' => Some("Short"),
            b'Z' => Some("Boolean"),
            b'V' if allow_void => Some("Unit"),
            _ => None,
        };
        if let Some(primitive) = primitive {
            return Ok(primitive.to_string());
        }
        match tag {
            b'L' => {
                let start = self.pos;
                let end = self.descriptor[start..]
                    .find(';')
                    .map(|i| start + i)
                    .ok_or_else(|| self.error())?;
                self.pos = end + 1;
                if end == start {
                    return Err(self.error());
                }
                Ok(self.descriptor[start..end].replace('/', "."))
            }
            b'[' => {
                let element_start = self.pos;
                let element = self.field_type(false)?;
                if !matches!(self.bytes[element_start], b'L' | b'[') {
                    Ok(format!("{element}Array"))
                } else {
                    Ok(format!("Array<{element}>"))
                }
            }
            _ => {
                self.pos -= 1;
                Err(self.error())
            }
        }
    }
}

/// Render a field descriptor.
pub fn field_type(descriptor: &str) -> Result<String, DescriptorError> {
    let mut cursor = Cursor::new(descriptor);
    let ty = cursor.field_type(false)?;
    if cursor.pos != descriptor.len() {
        return Err(cursor.error());
    }
    Ok(ty)
}

/// Render a method descriptor.
pub fn method_type(descriptor: &str) -> Result<MethodType, DescriptorError> {
    let mut cursor = Cursor::new(descriptor);
    cursor.expect(b'(')?;
    let mut parameters = Vec::new();
    while cursor.peek() != Some(b')') {
        if cursor.peek().is_none() {
            return Err(cursor.error());
        }
        parameters.push(cursor.field_type(false)?);
    }
    cursor.expect(b')')?;
    let return_type = cursor.field_type(true)?;
    if cursor.pos != descriptor.len() {
        return Err(cursor.error());
    }
    Ok(MethodType {
        parameters,
        return_type,
    })
}

/// Dotted binary name of an internal class name.
pub fn binary_name(internal: &str) -> String {
    internal.replace('/', ".")
}

/// Dotted package of an internal class name, empty for the root package.
pub fn package_of(internal: &str) -> String {
    internal
        .rfind('/')
        .map(|slash| internal[..slash].replace('/', "."))
        .unwrap_or_default()
}
