//! JVM class-file assembler.
//!
//! Produces version 52 class files with a fresh constant pool. Kotlin
//! metadata is attached as a `kotlin/Metadata` annotation with `d1` in
//! UTF-8 mode.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

pub const ACC_PUBLIC: u16 = 0x0001;
pub const ACC_PRIVATE: u16 = 0x0002;
pub const ACC_PROTECTED: u16 = 0x0004;
pub const ACC_STATIC: u16 = 0x0008;
pub const ACC_FINAL: u16 = 0x0010;
pub const ACC_SUPER: u16 = 0x0020;
pub const ACC_SYNTHETIC: u16 = 0x1000;
pub const ACC_INTERFACE: u16 = 0x0200;
pub const ACC_ABSTRACT: u16 = 0x0400;

const PUBLISHED_API_DESC: &str = "Lkotlin/PublishedApi;";
const METADATA_DESC: &str = "Lkotlin/Metadata;";

#[derive(Debug, Clone)]
pub struct MemberSpec {
    pub access: u16,
    pub name: String,
    pub descriptor: String,
    pub parameter_names: Vec<String>,
    pub published: bool,
}

impl MemberSpec {
    pub fn new(access: u16, name: &str, descriptor: &str) -> Self {
        Self {
            access,
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            parameter_names: Vec::new(),
            published: false,
        }
    }

    pub fn parameters(mut self, names: &[&str]) -> Self {
        self.parameter_names = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn published(mut self) -> Self {
        self.published = true;
        self
    }
}

#[derive(Debug, Clone)]
struct InnerSpec {
    inner: String,
    outer: Option<String>,
    inner_name: Option<String>,
    access: u16,
}

#[derive(Debug, Clone)]
struct MetadataSpec {
    kind: i32,
    data1: Vec<Vec<u16>>,
    data2: Vec<String>,
    extra_string: Option<String>,
}

/// One class under construction.
#[derive(Debug, Clone)]
pub struct ClassBuilder {
    name: String,
    access: u16,
    super_name: Option<String>,
    interfaces: Vec<String>,
    fields: Vec<MemberSpec>,
    methods: Vec<MemberSpec>,
    inner_classes: Vec<InnerSpec>,
    enclosing_method: Option<(String, Option<(String, String)>)>,
    published: bool,
    metadata: Option<MetadataSpec>,
}

impl ClassBuilder {
    /// A class with the given internal name (`demo/Foo`), extending
    /// `java/lang/Object`.
    pub fn new(name: &str, access: u16) -> Self {
        Self {
            name: name.to_string(),
            access,
            super_name: Some("java/lang/Object".to_string()),
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            inner_classes: Vec::new(),
            enclosing_method: None,
            published: false,
            metadata: None,
        }
    }

    pub fn extends(mut self, super_name: &str) -> Self {
        self.super_name = Some(super_name.to_string());
        self
    }

    pub fn implements(mut self, interface: &str) -> Self {
        self.interfaces.push(interface.to_string());
        self
    }

    pub fn field(mut self, field: MemberSpec) -> Self {
        self.fields.push(field);
        self
    }

    pub fn method(mut self, method: MemberSpec) -> Self {
        self.methods.push(method);
        self
    }

    /// Public no-argument constructor.
    pub fn default_constructor(self) -> Self {
        self.method(MemberSpec::new(ACC_PUBLIC, "<init>", "()V"))
    }

    /// Record this class as a member of `outer`.
    pub fn nested_in(mut self, outer: &str, simple_name: &str, access: u16) -> Self {
        let name = self.name.clone();
        self.inner_classes.push(InnerSpec {
            inner: name,
            outer: Some(outer.to_string()),
            inner_name: Some(simple_name.to_string()),
            access,
        });
        self
    }

    /// Record this class as declared inside a method of `outer`.
    pub fn local_in(mut self, outer: &str, method: &str, descriptor: &str) -> Self {
        let name = self.name.clone();
        let simple = name.rsplit('$').next().unwrap_or(&name).to_string();
        self.inner_classes.push(InnerSpec {
            inner: name,
            outer: None,
            inner_name: Some(simple),
            access: ACC_FINAL,
        });
        self.enclosing_method = Some((
            outer.to_string(),
            Some((method.to_string(), descriptor.to_string())),
        ));
        self
    }

    /// Record this class as anonymous.
    pub fn anonymous_in(mut self, outer: &str) -> Self {
        let name = self.name.clone();
        self.inner_classes.push(InnerSpec {
            inner: name,
            outer: None,
            inner_name: None,
            access: ACC_FINAL,
        });
        self.enclosing_method = Some((outer.to_string(), None));
        self
    }

    pub fn published(mut self) -> Self {
        self.published = true;
        self
    }

    /// Attach Kotlin metadata: `payload` is the protobuf (delimited string
    /// table types first), `strings` is `d2`.
    pub fn kotlin_metadata(mut self, kind: i32, payload: &[u8], strings: &[&str]) -> Self {
        self.metadata = Some(MetadataSpec {
            kind,
            data1: vec![utf8_mode_units(payload)],
            data2: strings.iter().map(|s| s.to_string()).collect(),
            extra_string: None,
        });
        self
    }

    /// Set `xs` on the metadata attached by [`Self::kotlin_metadata`]: the
    /// facade of a multi-file part.
    pub fn metadata_extra_string(mut self, extra: &str) -> Self {
        let metadata = self
            .metadata
            .as_mut()
            .expect("kotlin_metadata must be attached first");
        metadata.extra_string = Some(extra.to_string());
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut pool = ConstantPool::default();
        let this = pool.class(&self.name);
        let super_index = self.super_name.as_deref().map_or(0, |s| pool.class(s));
        let interfaces: Vec<u16> = self.interfaces.iter().map(|i| pool.class(i)).collect();

        let mut body = Vec::new();
        put_u16(&mut body, self.access);
        put_u16(&mut body, this);
        put_u16(&mut body, super_index);
        put_u16(&mut body, interfaces.len() as u16);
        for index in interfaces {
            put_u16(&mut body, index);
        }
        for members in [&self.fields, &self.methods] {
            put_u16(&mut body, members.len() as u16);
            for member in members {
                write_member(&mut body, &mut pool, member);
            }
        }

        let mut attributes: Vec<(u16, Vec<u8>)> = Vec::new();
        if !self.inner_classes.is_empty() {
            let mut attr = Vec::new();
            put_u16(&mut attr, self.inner_classes.len() as u16);
            for inner in &self.inner_classes {
                put_u16(&mut attr, pool.class(&inner.inner));
                put_u16(&mut attr, inner.outer.as_deref().map_or(0, |o| pool.class(o)));
                put_u16(&mut attr, inner.inner_name.as_deref().map_or(0, |n| pool.utf8(n)));
                put_u16(&mut attr, inner.access);
            }
            attributes.push((pool.utf8("InnerClasses"), attr));
        }
        if let Some((class, method)) = &self.enclosing_method {
            let mut attr = Vec::new();
            put_u16(&mut attr, pool.class(class));
            let method_index = method
                .as_ref()
                .map_or(0, |(name, desc)| pool.name_and_type(name, desc));
            put_u16(&mut attr, method_index);
            attributes.push((pool.utf8("EnclosingMethod"), attr));
        }
        if self.published {
            attributes.push((
                pool.utf8("RuntimeInvisibleAnnotations"),
                marker_annotation(&mut pool, PUBLISHED_API_DESC),
            ));
        }
        if let Some(metadata) = &self.metadata {
            attributes.push((
                pool.utf8("RuntimeVisibleAnnotations"),
                metadata_annotation(&mut pool, metadata),
            ));
        }
        write_attributes(&mut body, attributes);

        let mut out = Vec::new();
        out.extend(0xCAFE_BABEu32.to_be_bytes());
        put_u16(&mut out, 0);
        put_u16(&mut out, 52);
        put_u16(&mut out, pool.count + 1);
        out.extend(pool.bytes);
        out.extend(body);
        out
    }

    /// Write to `<root>/<internal name>.class`.
    pub fn write_to(&self, root: &Path) -> PathBuf {
        let path = root.join(format!("{}.class", self.name));
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, self.build()).unwrap();
        path
    }
}

/// Pack classes into a jar at `path`, with a manifest entry.
pub fn write_jar(path: &Path, classes: &[ClassBuilder]) -> PathBuf {
    let file = File::create(path).unwrap();
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default();
    zip.start_file("META-INF/MANIFEST.MF", options).unwrap();
    zip.write_all(b"Manifest-Version: 1.0\r\n").unwrap();
    for class in classes {
        zip.start_file(format!("{}.class", class.name), options).unwrap();
        zip.write_all(&class.build()).unwrap();
    }
    zip.finish().unwrap();
    path.to_path_buf()
}

/// `d1` in UTF-8 mode: a `\u0000` marker, then one unit per byte.
pub fn utf8_mode_units(payload: &[u8]) -> Vec<u16> {
    std::iter::once(0u16)
        .chain(payload.iter().map(|b| u16::from(*b)))
        .collect()
}

/// JVM modified UTF-8 for a sequence of UTF-16 units.
pub fn modified_utf8(units: &[u16]) -> Vec<u8> {
    let mut out = Vec::with_capacity(units.len());
    for &unit in units {
        match unit {
            0x0001..=0x007F => out.push(unit as u8),
            0x0000 | 0x0080..=0x07FF => {
                out.push(0xC0 | (unit >> 6) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
            _ => {
                out.push(0xE0 | (unit >> 12) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
        }
    }
    out
}

#[derive(Default)]
struct ConstantPool {
    bytes: Vec<u8>,
    count: u16,
}

impl ConstantPool {
    fn push(&mut self, entry: Vec<u8>) -> u16 {
        self.bytes.extend(entry);
        self.count += 1;
        self.count
    }

    fn utf8_units(&mut self, units: &[u16]) -> u16 {
        let encoded = modified_utf8(units);
        let mut entry = vec![1];
        entry.extend((encoded.len() as u16).to_be_bytes());
        entry.extend(encoded);
        self.push(entry)
    }

    fn utf8(&mut self, s: &str) -> u16 {
        let units: Vec<u16> = s.encode_utf16().collect();
        self.utf8_units(&units)
    }

    fn class(&mut self, name: &str) -> u16 {
        let name = self.utf8(name);
        let mut entry = vec![7];
        entry.extend(name.to_be_bytes());
        self.push(entry)
    }

    fn int(&mut self, value: i32) -> u16 {
        let mut entry = vec![3];
        entry.extend(value.to_be_bytes());
        self.push(entry)
    }

    fn name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
        let name = self.utf8(name);
        let descriptor = self.utf8(descriptor);
        let mut entry = vec![12];
        entry.extend(name.to_be_bytes());
        entry.extend(descriptor.to_be_bytes());
        self.push(entry)
    }
}

fn put_u16(out: &mut Vec<u8>, value: u16) {
    out.extend(value.to_be_bytes());
}

fn write_attributes(out: &mut Vec<u8>, attributes: Vec<(u16, Vec<u8>)>) {
    put_u16(out, attributes.len() as u16);
    for (name, body) in attributes {
        put_u16(out, name);
        out.extend((body.len() as u32).to_be_bytes());
        out.extend(body);
    }
}

fn write_member(out: &mut Vec<u8>, pool: &mut ConstantPool, member: &MemberSpec) {
    put_u16(out, member.access);
    put_u16(out, pool.utf8(&member.name));
    put_u16(out, pool.utf8(&member.descriptor));

    let mut attributes = Vec::new();
    if !member.parameter_names.is_empty() {
        let mut attr = vec![member.parameter_names.len() as u8];
        for name in &member.parameter_names {
            put_u16(&mut attr, pool.utf8(name));
            put_u16(&mut attr, 0);
        }
        attributes.push((pool.utf8("MethodParameters"), attr));
    }
    if member.published {
        attributes.push((
            pool.utf8("RuntimeInvisibleAnnotations"),
            marker_annotation(pool, PUBLISHED_API_DESC),
        ));
    }
    write_attributes(out, attributes);
}

/// One annotation without elements.
fn marker_annotation(pool: &mut ConstantPool, descriptor: &str) -> Vec<u8> {
    let mut attr = Vec::new();
    put_u16(&mut attr, 1);
    put_u16(&mut attr, pool.utf8(descriptor));
    put_u16(&mut attr, 0);
    attr
}

fn metadata_annotation(pool: &mut ConstantPool, metadata: &MetadataSpec) -> Vec<u8> {
    let mut attr = Vec::new();
    put_u16(&mut attr, 1);
    put_u16(&mut attr, pool.utf8(METADATA_DESC));
    put_u16(&mut attr, 3 + u16::from(metadata.extra_string.is_some()));

    put_u16(&mut attr, pool.utf8("k"));
    attr.push(b'I');
    put_u16(&mut attr, pool.int(metadata.kind));

    put_u16(&mut attr, pool.utf8("d1"));
    attr.push(b'[');
    put_u16(&mut attr, metadata.data1.len() as u16);
    for units in &metadata.data1 {
        attr.push(b's');
        put_u16(&mut attr, pool.utf8_units(units));
    }

    put_u16(&mut attr, pool.utf8("d2"));
    attr.push(b'[');
    put_u16(&mut attr, metadata.data2.len() as u16);
    for string in &metadata.data2 {
        attr.push(b's');
        put_u16(&mut attr, pool.utf8(string));
    }

    if let Some(extra) = &metadata.extra_string {
        put_u16(&mut attr, pool.utf8("xs"));
        attr.push(b's');
        put_u16(&mut attr, pool.utf8(extra));
    }
    attr
}
