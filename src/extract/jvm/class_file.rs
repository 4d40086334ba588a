//! JVM class-file reader.
//!
//! Reads the parts of a class file that matter for API extraction:
//!
//! ```text
//! magic, version
//! constant pool          (every tag kind; long/double take two slots)
//! access, this, super, interfaces
//! fields / methods       (+ MethodParameters, annotations)
//! class attributes       InnerClasses, EnclosingMethod, annotations
//! ```
//!
//! Code attributes and everything else are skipped by length.

use crate::metadata::bit_encoding::modified_utf8_to_utf16;
use bitflags::bitflags;
use thiserror::Error;

const MAGIC: u32 = 0xCAFE_BABE;

bitflags! {
    /// Access and property flags shared by classes, fields and methods.
    ///
    /// Several bits mean different things depending on where they appear
    /// (`0x0040` is `volatile` on fields and `bridge` on methods).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AccessFlags: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const SUPER = 0x0020;
        const BRIDGE = 0x0040;
        const VARARGS = 0x0080;
        const NATIVE = 0x0100;
        const INTERFACE = 0x0200;
        const ABSTRACT = 0x0400;
        const STRICT = 0x0800;
        const SYNTHETIC = 0x1000;
        const ANNOTATION = 0x2000;
        const ENUM = 0x4000;
        const MODULE = 0x8000;
    }
}

impl AccessFlags {
    /// Public or protected.
    pub fn is_exposed(self) -> bool {
        self.intersects(Self::PUBLIC | Self::PROTECTED)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClassFileError {
    #[error("class file truncated")]
    Truncated,
    #[error("bad magic 0x{0:08X}")]
    BadMagic(u32),
    #[error("invalid constant pool index {0}")]
    BadIndex(u16),
    #[error("unexpected constant pool entry at {index}: expected {expected}")]
    WrongEntry { index: u16, expected: &'static str },
    #[error("unknown constant pool tag {0}")]
    UnknownTag(u8),
    #[error("invalid modified UTF-8 in constant {0}")]
    BadUtf8(u16),
    #[error("unknown annotation element tag '{0}'")]
    UnknownElementTag(char),
}

// ============================================================================
// BYTE READER
// ============================================================================

struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], ClassFileError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(ClassFileError::Truncated)?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, ClassFileError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, ClassFileError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32, ClassFileError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u64(&mut self) -> Result<u64, ClassFileError> {
        Ok((u64::from(self.u32()?) << 32) | u64::from(self.u32()?))
    }
}

// ============================================================================
// CONSTANT POOL
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum PoolEntry {
    /// Slot 0 and the upper half of long/double entries
    Unusable,
    Utf8(Vec<u8>),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class(u16),
    String(u16),
    /// Field, method and interface-method references, name-and-type,
    /// method handles and types, dynamic constants, modules, packages
    Other,
}

/// A loadable constant, as used by annotation element values.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    /// UTF-16 code units of a string constant
    Utf16(Vec<u16>),
}

#[derive(Debug, Clone, Default)]
struct ConstantPool {
    entries: Vec<PoolEntry>,
}

impl ConstantPool {
    fn read(reader: &mut ByteReader<'_>) -> Result<Self, ClassFileError> {
        let count = reader.u16()? as usize;
        let mut entries = Vec::with_capacity(count);
        entries.push(PoolEntry::Unusable);
        while entries.len() < count {
            let tag = reader.u8()?;
            let entry = match tag {
                1 => {
                    let len = reader.u16()? as usize;
                    PoolEntry::Utf8(reader.take(len)?.to_vec())
                }
                3 => PoolEntry::Integer(reader.u32()? as i32),
                4 => PoolEntry::Float(f32::from_bits(reader.u32()?)),
                5 => PoolEntry::Long(reader.u64()? as i64),
                6 => PoolEntry::Double(f64::from_bits(reader.u64()?)),
                7 => PoolEntry::Class(reader.u16()?),
                8 => PoolEntry::String(reader.u16()?),
                // Fieldref, Methodref, InterfaceMethodref, NameAndType,
                // Dynamic, InvokeDynamic
                9 | 10 | 11 | 12 | 17 | 18 => {
                    reader.take(4)?;
                    PoolEntry::Other
                }
                15 => {
                    reader.take(3)?;
                    PoolEntry::Other
                }
                // MethodType, Module, Package
                16 | 19 | 20 => {
                    reader.take(2)?;
                    PoolEntry::Other
                }
                other => return Err(ClassFileError::UnknownTag(other)),
            };
            let wide = matches!(entry, PoolEntry::Long(_) | PoolEntry::Double(_));
            entries.push(entry);
            if wide {
                entries.push(PoolEntry::Unusable);
            }
        }
        Ok(Self { entries })
    }

    fn entry(&self, index: u16) -> Result<&PoolEntry, ClassFileError> {
        self.entries
            .get(index as usize)
            .ok_or(ClassFileError::BadIndex(index))
    }

    fn utf8_bytes(&self, index: u16) -> Result<&[u8], ClassFileError> {
        match self.entry(index)? {
            PoolEntry::Utf8(bytes) => Ok(bytes),
            _ => Err(ClassFileError::WrongEntry {
                index,
                expected: "Utf8",
            }),
        }
    }

    fn utf16(&self, index: u16) -> Result<Vec<u16>, ClassFileError> {
        modified_utf8_to_utf16(self.utf8_bytes(index)?).map_err(|_| ClassFileError::BadUtf8(index))
    }

    fn utf8(&self, index: u16) -> Result<String, ClassFileError> {
        Ok(String::from_utf16_lossy(&self.utf16(index)?))
    }

    fn class_name(&self, index: u16) -> Result<String, ClassFileError> {
        match self.entry(index)? {
            PoolEntry::Class(name) => self.utf8(*name),
            _ => Err(ClassFileError::WrongEntry {
                index,
                expected: "Class",
            }),
        }
    }

    fn optional_class_name(&self, index: u16) -> Result<Option<String>, ClassFileError> {
        if index == 0 {
            Ok(None)
        } else {
            self.class_name(index).map(Some)
        }
    }

    fn optional_utf8(&self, index: u16) -> Result<Option<String>, ClassFileError> {
        if index == 0 {
            Ok(None)
        } else {
            self.utf8(index).map(Some)
        }
    }

    fn constant(&self, index: u16) -> Result<Constant, ClassFileError> {
        match self.entry(index)? {
            PoolEntry::Integer(v) => Ok(Constant::Int(*v)),
            PoolEntry::Long(v) => Ok(Constant::Long(*v)),
            PoolEntry::Float(v) => Ok(Constant::Float(*v)),
            PoolEntry::Double(v) => Ok(Constant::Double(*v)),
            PoolEntry::Utf8(_) => Ok(Constant::Utf16(self.utf16(index)?)),
            PoolEntry::String(utf8) => Ok(Constant::Utf16(self.utf16(*utf8)?)),
            _ => Err(ClassFileError::WrongEntry {
                index,
                expected: "constant",
            }),
        }
    }
}

// ============================================================================
// ANNOTATIONS
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum ElementValue {
    Const(Constant),
    Enum { type_desc: String, name: String },
    Class(String),
    Annotation(Annotation),
    Array(Vec<ElementValue>),
}

impl ElementValue {
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Self::Const(Constant::Int(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn as_utf16(&self) -> Option<&[u16]> {
        match self {
            Self::Const(Constant::Utf16(units)) => Some(units),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<String> {
        self.as_utf16().map(String::from_utf16_lossy)
    }

    pub fn as_array(&self) -> Option<&[ElementValue]> {
        match self {
            Self::Array(values) => Some(values),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    /// Field descriptor of the annotation type (`Lkotlin/Metadata;`)
    pub type_desc: String,
    pub elements: Vec<(String, ElementValue)>,
}

impl Annotation {
    /// `true` when this annotation's type has the given internal name.
    pub fn refers_to(&self, internal_name: &str) -> bool {
        self.type_desc
            .strip_prefix('L')
            .and_then(|d| d.strip_suffix(';'))
            .is_some_and(|d| d == internal_name)
    }

    pub fn get(&self, name: &str) -> Option<&ElementValue> {
        self.elements
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    fn read(reader: &mut ByteReader<'_>, pool: &ConstantPool) -> Result<Self, ClassFileError> {
        let type_desc = pool.utf8(reader.u16()?)?;
        let count = reader.u16()?;
        let mut elements = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let name = pool.utf8(reader.u16()?)?;
            elements.push((name, read_element_value(reader, pool)?));
        }
        Ok(Self {
            type_desc,
            elements,
        })
    }
}

fn read_element_value(
    reader: &mut ByteReader<'_>,
    pool: &ConstantPool,
) -> Result<ElementValue, ClassFileError> {
    let tag = reader.u8()? as char;
    Ok(match tag {
        'B' | 'C' | 'D' | 'F' | 'I' | 'J' | 'S' | 'Z' | 's' => {
            ElementValue::Const(pool.constant(reader.u16()?)?)
        }
        'e' => ElementValue::Enum {
            type_desc: pool.utf8(reader.u16()?)?,
            name: pool.utf8(reader.u16()?)?,
        },
        'c' => ElementValue::Class(pool.utf8(reader.u16()?)?),
        '@' => ElementValue::Annotation(Annotation::read(reader, pool)?),
        '[' => {
            let count = reader.u16()?;
            let mut values = Vec::with_capacity(count as usize);
            for _ in 0..count {
                values.push(read_element_value(reader, pool)?);
            }
            ElementValue::Array(values)
        }
        other => return Err(ClassFileError::UnknownElementTag(other)),
    })
}

fn read_annotations(
    bytes: &[u8],
    pool: &ConstantPool,
) -> Result<Vec<Annotation>, ClassFileError> {
    let mut reader = ByteReader::new(bytes);
    let count = reader.u16()?;
    let mut annotations = Vec::with_capacity(count as usize);
    for _ in 0..count {
        annotations.push(Annotation::read(&mut reader, pool)?);
    }
    Ok(annotations)
}

// ============================================================================
// CLASS STRUCTURE
// ============================================================================

/// One `InnerClasses` attribute entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnerClassEntry {
    pub inner: String,
    pub outer: Option<String>,
    pub inner_name: Option<String>,
    pub access: AccessFlags,
}

/// The `EnclosingMethod` attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnclosingMethod {
    pub class: String,
    pub has_method: bool,
}

/// A field or method.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberInfo {
    pub access: AccessFlags,
    pub name: String,
    pub descriptor: String,
    /// From `MethodParameters`; empty when the attribute is absent
    pub parameter_names: Vec<Option<String>>,
    pub visible_annotations: Vec<Annotation>,
    pub invisible_annotations: Vec<Annotation>,
}

impl MemberInfo {
    pub fn annotations(&self) -> impl Iterator<Item = &Annotation> {
        self.visible_annotations
            .iter()
            .chain(self.invisible_annotations.iter())
    }

    pub fn has_annotation(&self, internal_name: &str) -> bool {
        self.annotations().any(|a| a.refers_to(internal_name))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassFile {
    pub minor_version: u16,
    pub major_version: u16,
    pub access: AccessFlags,
    /// Internal name (`pkg/Outer$Inner`)
    pub name: String,
    pub super_name: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: Vec<MemberInfo>,
    pub methods: Vec<MemberInfo>,
    pub inner_classes: Vec<InnerClassEntry>,
    pub enclosing_method: Option<EnclosingMethod>,
    pub visible_annotations: Vec<Annotation>,
    pub invisible_annotations: Vec<Annotation>,
}

impl ClassFile {
    pub fn parse(bytes: &[u8]) -> Result<Self, ClassFileError> {
        let mut reader = ByteReader::new(bytes);
        let magic = reader.u32()?;
        if magic != MAGIC {
            return Err(ClassFileError::BadMagic(magic));
        }
        let minor_version = reader.u16()?;
        let major_version = reader.u16()?;
        let pool = ConstantPool::read(&mut reader)?;

        let access = AccessFlags::from_bits_retain(reader.u16()?);
        let name = pool.class_name(reader.u16()?)?;
        let super_name = pool.optional_class_name(reader.u16()?)?;
        let interface_count = reader.u16()?;
        let mut interfaces = Vec::with_capacity(interface_count as usize);
        for _ in 0..interface_count {
            interfaces.push(pool.class_name(reader.u16()?)?);
        }

        let fields = read_members(&mut reader, &pool)?;
        let methods = read_members(&mut reader, &pool)?;

        let mut class = Self {
            minor_version,
            major_version,
            access,
            name,
            super_name,
            interfaces,
            fields,
            methods,
            inner_classes: Vec::new(),
            enclosing_method: None,
            visible_annotations: Vec::new(),
            invisible_annotations: Vec::new(),
        };

        let attribute_count = reader.u16()?;
        for _ in 0..attribute_count {
            let attribute_name = pool.utf8(reader.u16()?)?;
            let len = reader.u32()? as usize;
            let body = reader.take(len)?;
            match attribute_name.as_str() {
                "InnerClasses" => class.inner_classes = read_inner_classes(body, &pool)?,
                "EnclosingMethod" => {
                    let mut body = ByteReader::new(body);
                    let enclosing = pool.class_name(body.u16()?)?;
                    let method = body.u16()?;
                    class.enclosing_method = Some(EnclosingMethod {
                        class: enclosing,
                        has_method: method != 0,
                    });
                }
                "RuntimeVisibleAnnotations" => {
                    class.visible_annotations = read_annotations(body, &pool)?
                }
                "RuntimeInvisibleAnnotations" => {
                    class.invisible_annotations = read_annotations(body, &pool)?
                }
                _ => {}
            }
        }

        Ok(class)
    }

    pub fn annotations(&self) -> impl Iterator<Item = &Annotation> {
        self.visible_annotations
            .iter()
            .chain(self.invisible_annotations.iter())
    }

    pub fn find_annotation(&self, internal_name: &str) -> Option<&Annotation> {
        self.annotations().find(|a| a.refers_to(internal_name))
    }

    /// The `InnerClasses` entry describing this class itself.
    pub fn own_inner_entry(&self) -> Option<&InnerClassEntry> {
        let mut own = self.inner_classes.iter().filter(|e| e.inner == self.name);
        match (own.next(), own.next()) {
            (Some(entry), None) => Some(entry),
            _ => None,
        }
    }

    /// Access as declared in source: nested classes record their real
    /// access in `InnerClasses`.
    pub fn effective_access(&self) -> AccessFlags {
        self.own_inner_entry()
            .map(|e| e.access)
            .unwrap_or(self.access)
    }

    /// Outer class for a member class, `None` for top-level, local and
    /// anonymous classes.
    pub fn outer_class(&self) -> Option<&str> {
        self.own_inner_entry().and_then(|e| e.outer.as_deref())
    }

    /// Declared inside a method body: listed in `InnerClasses` without
    /// outer linkage.
    pub fn is_local(&self) -> bool {
        self.own_inner_entry().is_some_and(|e| {
            e.outer.is_none() && (e.inner_name.is_none() || self.enclosing_method.is_some())
        })
    }

    pub fn is_inner(&self) -> bool {
        self.own_inner_entry().is_some()
    }
}

fn read_members(
    reader: &mut ByteReader<'_>,
    pool: &ConstantPool,
) -> Result<Vec<MemberInfo>, ClassFileError> {
    let count = reader.u16()?;
    let mut members = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let access = AccessFlags::from_bits_retain(reader.u16()?);
        let name = pool.utf8(reader.u16()?)?;
        let descriptor = pool.utf8(reader.u16()?)?;
        let mut member = MemberInfo {
            access,
            name,
            descriptor,
            parameter_names: Vec::new(),
            visible_annotations: Vec::new(),
            invisible_annotations: Vec::new(),
        };
        let attribute_count = reader.u16()?;
        for _ in 0..attribute_count {
            let attribute_name = pool.utf8(reader.u16()?)?;
            let len = reader.u32()? as usize;
            let body = reader.take(len)?;
            match attribute_name.as_str() {
                "MethodParameters" => {
                    let mut body = ByteReader::new(body);
                    let count = body.u8()?;
                    for _ in 0..count {
                        let name = pool.optional_utf8(body.u16()?)?;
                        body.u16()?;
                        member.parameter_names.push(name);
                    }
                }
                "RuntimeVisibleAnnotations" => {
                    member.visible_annotations = read_annotations(body, pool)?
                }
                "RuntimeInvisibleAnnotations" => {
                    member.invisible_annotations = read_annotations(body, pool)?
                }
                _ => {}
            }
        }
        members.push(member);
    }
    Ok(members)
}

fn read_inner_classes(
    bytes: &[u8],
    pool: &ConstantPool,
) -> Result<Vec<InnerClassEntry>, ClassFileError> {
    let mut reader = ByteReader::new(bytes);
    let count = reader.u16()?;
    let mut entries = Vec::with_capacity(count as usize);
    for _ in 0..count {
        entries.push(InnerClassEntry {
            inner: pool.class_name(reader.u16()?)?,
            outer: pool.optional_class_name(reader.u16()?)?,
            inner_name: pool.optional_utf8(reader.u16()?)?,
            access: AccessFlags::from_bits_retain(reader.u16()?),
        });
    }
    Ok(entries)
}
