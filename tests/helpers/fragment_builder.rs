//! Serialized package fragments for the JS and klib dialects.
//!
//! Names are interned into the fragment's own string and qualified-name
//! tables. Types are referenced by fully qualified class name; the last
//! segment is taken as the class.

use apidump::metadata::wire::ProtoWriter;
use apidump::metadata::{Dialect, FlagsBuilder};
use apidump::model::{ClassKind, Modality, Visibility};

const PUBLISHED_API: &str = "kotlin.PublishedApi";

const KIND_CLASS: i32 = 0;
const KIND_PACKAGE: i32 = 1;
const KIND_LOCAL: i32 = 2;

/// `fun <name>(<parameters>): <returns>` at package level or in a class.
#[derive(Debug, Clone)]
pub struct FunctionSpec {
    pub name: String,
    pub visibility: Visibility,
    pub returns: String,
    pub parameters: Vec<(String, String)>,
    pub published: bool,
}

impl FunctionSpec {
    pub fn new(name: &str, returns: &str) -> Self {
        Self {
            name: name.to_string(),
            visibility: Visibility::Public,
            returns: returns.to_string(),
            parameters: Vec::new(),
            published: false,
        }
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn parameter(mut self, name: &str, ty: &str) -> Self {
        self.parameters.push((name.to_string(), ty.to_string()));
        self
    }

    pub fn published(mut self) -> Self {
        self.published = true;
        self
    }
}

/// A class declared in the fragment's package.
#[derive(Debug, Clone)]
pub struct ClassSpec {
    /// Name relative to the package, `Outer.Inner` for nested classes
    pub name: String,
    pub kind: ClassKind,
    pub visibility: Visibility,
    pub local: bool,
    pub published: bool,
    pub constructor: bool,
    pub functions: Vec<FunctionSpec>,
}

impl ClassSpec {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: ClassKind::Class,
            visibility: Visibility::Public,
            local: false,
            published: false,
            constructor: false,
            functions: Vec::new(),
        }
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn local(mut self) -> Self {
        self.local = true;
        self
    }

    pub fn published(mut self) -> Self {
        self.published = true;
        self
    }

    pub fn with_constructor(mut self) -> Self {
        self.constructor = true;
        self
    }

    pub fn function(mut self, function: FunctionSpec) -> Self {
        self.functions.push(function);
        self
    }
}

/// One `PackageFragment` message under construction.
#[derive(Debug)]
pub struct FragmentBuilder {
    dialect: Dialect,
    package: String,
    strings: Vec<String>,
    names: Vec<(i32, i32, i32)>,
    functions: Vec<ProtoWriter>,
    classes: Vec<ProtoWriter>,
}

impl FragmentBuilder {
    pub fn new(dialect: Dialect, package: &str) -> Self {
        Self {
            dialect,
            package: package.to_string(),
            strings: Vec::new(),
            names: Vec::new(),
            functions: Vec::new(),
            classes: Vec::new(),
        }
    }

    fn string(&mut self, value: &str) -> i32 {
        if let Some(index) = self.strings.iter().position(|s| s == value) {
            return index as i32;
        }
        self.strings.push(value.to_string());
        self.strings.len() as i32 - 1
    }

    fn name(&mut self, parent: i32, short: &str, kind: i32) -> i32 {
        let short = self.string(short);
        let entry = (parent, short, kind);
        if let Some(index) = self.names.iter().position(|n| *n == entry) {
            return index as i32;
        }
        self.names.push(entry);
        self.names.len() as i32 - 1
    }

    fn package_id(&mut self, package: &str) -> i32 {
        package
            .split('.')
            .filter(|s| !s.is_empty())
            .fold(-1, |parent, segment| self.name(parent, segment, KIND_PACKAGE))
    }

    fn class_id(&mut self, package: &str, relative: &str, local: bool) -> i32 {
        let mut id = self.package_id(package);
        let segments: Vec<&str> = relative.split('.').collect();
        for (i, segment) in segments.iter().enumerate() {
            let kind = if local && i + 1 == segments.len() {
                KIND_LOCAL
            } else {
                KIND_CLASS
            };
            id = self.name(id, segment, kind);
        }
        id
    }

    fn type_ref(&mut self, fq_name: &str) -> ProtoWriter {
        let (package, class) = fq_name.rsplit_once('.').unwrap_or(("", fq_name));
        let (class, nullable) = match class.strip_suffix('?') {
            Some(class) => (class, true),
            None => (class, false),
        };
        let mut ty = ProtoWriter::new().int32(6, self.class_id(package, class, false));
        if nullable {
            ty = ty.bool(3, true);
        }
        ty
    }

    fn annotations(&mut self, mut message: ProtoWriter, published: bool) -> ProtoWriter {
        if let (true, Some(field)) = (published, self.dialect.annotation_field()) {
            let (package, class) = PUBLISHED_API.rsplit_once('.').unwrap_or_default();
            let id = self.class_id(package, class, false);
            message = message.message(field, ProtoWriter::new().int32(1, id));
        }
        message
    }

    fn function_message(&mut self, decl: &FunctionSpec) -> ProtoWriter {
        let flags = FlagsBuilder::new()
            .visibility(decl.visibility)
            .modality(Modality::Final)
            .build();
        let name = self.string(&decl.name);
        let returns = self.type_ref(&decl.returns);
        let mut message = ProtoWriter::new()
            .int32(9, flags.0)
            .int32(2, name)
            .message(3, returns);
        for (name, ty) in &decl.parameters {
            let name = self.string(name);
            let ty = self.type_ref(ty);
            message = message.message(6, ProtoWriter::new().int32(2, name).message(3, ty));
        }
        self.annotations(message, decl.published)
    }

    pub fn function(mut self, decl: FunctionSpec) -> Self {
        let message = self.function_message(&decl);
        self.functions.push(message);
        self
    }

    pub fn class(mut self, decl: ClassSpec) -> Self {
        let flags = FlagsBuilder::new()
            .visibility(decl.visibility)
            .modality(Modality::Final)
            .class_kind(decl.kind)
            .build();
        let package = self.package.clone();
        let id = self.class_id(&package, &decl.name, decl.local);
        let mut message = ProtoWriter::new().int32(1, flags.0).int32(3, id);
        if decl.constructor {
            let ctor_flags = FlagsBuilder::new().visibility(Visibility::Public).build();
            message = message.message(8, ProtoWriter::new().int32(1, ctor_flags.0));
        }
        for function in &decl.functions {
            let function = self.function_message(function);
            message = message.message(9, function);
        }
        let message = self.annotations(message, decl.published);
        self.classes.push(message);
        self
    }

    pub fn build(mut self) -> Vec<u8> {
        let mut package = ProtoWriter::new();
        for function in std::mem::take(&mut self.functions) {
            package = package.message(3, function);
        }
        if let Some(field) = self.dialect.package_fq_name_field() {
            let name = self.package.clone();
            package = package.int32(field, self.string(&name));
        }

        let mut strings = ProtoWriter::new();
        for string in &self.strings {
            strings = strings.string(1, string);
        }
        let mut names = ProtoWriter::new();
        for (parent, short, kind) in &self.names {
            let mut name = ProtoWriter::new();
            if *parent != -1 {
                name = name.int32(1, *parent);
            }
            names = names.message(1, name.int32(2, *short).int32(3, *kind));
        }

        let mut fragment = ProtoWriter::new()
            .message(1, strings)
            .message(2, names)
            .message(3, package);
        for class in self.classes {
            fragment = fragment.message(4, class);
        }
        fragment.finish()
    }
}
