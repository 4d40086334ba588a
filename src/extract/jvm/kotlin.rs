//! Kotlin metadata on JVM classes.
//!
//! Bytecode alone cannot tell an `internal` function from a public one,
//! nor which methods are property accessors. The `kotlin/Metadata`
//! annotation can. This module turns it into a per-class
//! [`ClassVisibility`]: declared visibility of the class and of each
//! member keyed by JVM name and descriptor.
//!
//! Companions and multi-file parts are linked by name only after every
//! class has been read, see [`VisibilityTable::build`].

use super::class_file::ClassFile;
use crate::base::constants::{CONSTRUCTOR_NAME, KOTLIN_METADATA_ANNOTATION};
use crate::metadata::bit_encoding::decode_bytes;
use crate::metadata::proto::split_jvm_payload;
use crate::metadata::{
    ClassProto, Dialect, Flags, FunctionProto, JvmMemberSignature, JvmNameResolver,
    MetadataError, NameResolver, PackageProto, PropertyProto,
};
use crate::model::ClassKind;
use rustc_hash::FxHashMap;
use tracing::trace;

/// Metadata kind (`k`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataKind {
    Class,
    FileFacade,
    SyntheticClass,
    MultiFileFacade,
    MultiFilePart,
    Unknown(i32),
}

impl MetadataKind {
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => Self::Class,
            2 => Self::FileFacade,
            3 => Self::SyntheticClass,
            4 => Self::MultiFileFacade,
            5 => Self::MultiFilePart,
            other => Self::Unknown(other),
        }
    }
}

/// Raw fields of the `kotlin/Metadata` annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KotlinHeader {
    pub kind: MetadataKind,
    pub metadata_version: Vec<i32>,
    pub data1: Vec<Vec<u16>>,
    pub data2: Vec<String>,
    pub extra_string: Option<String>,
    pub package_name: Option<String>,
    pub extra_int: i32,
}

impl KotlinHeader {
    /// Read the header from the class's annotations, if present.
    pub fn read(class: &ClassFile) -> Option<Self> {
        let annotation = class.find_annotation(KOTLIN_METADATA_ANNOTATION)?;
        let ints = |key: &str| -> Vec<i32> {
            annotation
                .get(key)
                .and_then(|v| v.as_array())
                .map(|values| values.iter().filter_map(|v| v.as_int()).collect())
                .unwrap_or_default()
        };
        let strings = |key: &str| -> Vec<Vec<u16>> {
            annotation
                .get(key)
                .and_then(|v| v.as_array())
                .map(|values| {
                    values
                        .iter()
                        .filter_map(|v| v.as_utf16().map(<[u16]>::to_vec))
                        .collect()
                })
                .unwrap_or_default()
        };
        Some(Self {
            // `k` defaults to 1 when omitted
            kind: MetadataKind::from_code(annotation.get("k").and_then(|v| v.as_int()).unwrap_or(1)),
            metadata_version: ints("mv"),
            data1: strings("d1"),
            data2: strings("d2")
                .iter()
                .map(|units| String::from_utf16_lossy(units))
                .collect(),
            extra_string: annotation.get("xs").and_then(|v| v.as_string()),
            package_name: annotation.get("pn").and_then(|v| v.as_string()),
            extra_int: annotation.get("xi").and_then(|v| v.as_int()).unwrap_or(0),
        })
    }
}

/// A JVM member identity. `desc` is `None` when the metadata omits it;
/// such keys match any descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberKey {
    pub name: String,
    pub desc: Option<String>,
}

/// What a JVM member is in source terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberRole {
    Function,
    Constructor,
    PropertyField,
    PropertyGetter,
    PropertySetter,
    /// `…$annotations` holder of a property's annotations
    PropertyAnnotations,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberVisibility {
    /// Flags of the declaration (accessor flags for getters and setters)
    pub flags: Flags,
    pub role: MemberRole,
    /// Index into [`ClassVisibility::properties`] for property roles
    pub property: Option<usize>,
}

/// A Kotlin property and the JVM members that implement it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyInfo {
    pub name: String,
    pub flags: Flags,
    pub getter_flags: Flags,
    pub setter_flags: Flags,
    pub field: Option<MemberKey>,
    pub getter: Option<MemberKey>,
    pub setter: Option<MemberKey>,
    pub annotations: Option<MemberKey>,
}

/// Declared visibilities for one class, from its metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassVisibility {
    /// Internal name
    pub name: String,
    pub kind: MetadataKind,
    /// Class flags; `None` for facades, parts and synthetic classes
    pub flags: Option<Flags>,
    /// Simple name of the companion object, as declared
    pub companion_name: Option<String>,
    /// Facade internal name for multi-file parts
    pub facade: Option<String>,
    pub members: FxHashMap<String, Vec<(Option<String>, MemberVisibility)>>,
    pub properties: Vec<PropertyInfo>,
    /// Linked after loading: parts of a multi-file facade
    pub parts: Vec<String>,
    /// Linked after loading: internal name of the companion class
    pub companion: Option<String>,
}

impl ClassVisibility {
    fn new(name: &str, kind: MetadataKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            flags: None,
            companion_name: None,
            facade: None,
            members: FxHashMap::default(),
            properties: Vec::new(),
            parts: Vec::new(),
            companion: None,
        }
    }

    pub fn is_companion(&self) -> bool {
        self.flags
            .is_some_and(|f| f.class_kind() == ClassKind::CompanionObject)
    }

    pub fn is_synthetic_class(&self) -> bool {
        self.kind == MetadataKind::SyntheticClass
    }

    /// Member by JVM name and descriptor. Entries recorded without a
    /// descriptor match by name.
    pub fn find_member(&self, name: &str, desc: &str) -> Option<&MemberVisibility> {
        let candidates = self.members.get(name)?;
        candidates
            .iter()
            .find(|(d, _)| d.as_deref() == Some(desc))
            .or_else(|| candidates.iter().find(|(d, _)| d.is_none()))
            .map(|(_, member)| member)
    }

    fn add_member(&mut self, key: MemberKey, member: MemberVisibility) {
        self.members
            .entry(key.name)
            .or_default()
            .push((key.desc, member));
    }

    fn add_function(
        &mut self,
        resolver: &JvmNameResolver,
        function: &FunctionProto,
    ) -> Result<(), MetadataError> {
        let name = resolver.string(function.name)?;
        let key = member_key(resolver, function.jvm_signature.as_ref(), &name)?;
        self.add_member(
            key,
            MemberVisibility {
                flags: function.flags,
                role: MemberRole::Function,
                property: None,
            },
        );
        Ok(())
    }

    fn add_property(
        &mut self,
        resolver: &JvmNameResolver,
        property: &PropertyProto,
    ) -> Result<(), MetadataError> {
        let name = resolver.string(property.name)?;
        let signature = property.jvm_signature.unwrap_or_default();
        let index = self.properties.len();

        let key = |sig: Option<JvmMemberSignature>| -> Result<Option<MemberKey>, MetadataError> {
            sig.map(|sig| member_key(resolver, Some(&sig), &name)).transpose()
        };
        let info = PropertyInfo {
            name: name.clone(),
            flags: property.flags,
            getter_flags: property.getter_flags(),
            setter_flags: property.setter_flags(),
            field: key(signature.field)?,
            getter: key(signature.getter)?,
            setter: key(signature.setter)?,
            annotations: key(signature.synthetic_method)?,
        };

        let roles = [
            (&info.field, MemberRole::PropertyField, info.flags),
            (&info.getter, MemberRole::PropertyGetter, info.getter_flags),
            (&info.setter, MemberRole::PropertySetter, info.setter_flags),
            (&info.annotations, MemberRole::PropertyAnnotations, info.flags),
        ];
        let entries: Vec<(MemberKey, MemberVisibility)> = roles
            .into_iter()
            .filter_map(|(key, role, flags)| {
                key.clone().map(|key| {
                    (
                        key,
                        MemberVisibility {
                            flags,
                            role,
                            property: Some(index),
                        },
                    )
                })
            })
            .collect();
        for (key, member) in entries {
            self.add_member(key, member);
        }
        self.properties.push(info);
        Ok(())
    }

    fn add_package(
        &mut self,
        resolver: &JvmNameResolver,
        package: &PackageProto,
    ) -> Result<(), MetadataError> {
        for function in &package.functions {
            self.add_function(resolver, function)?;
        }
        for property in &package.properties {
            self.add_property(resolver, property)?;
        }
        Ok(())
    }
}

fn member_key(
    resolver: &JvmNameResolver,
    signature: Option<&JvmMemberSignature>,
    default_name: &str,
) -> Result<MemberKey, MetadataError> {
    let name = match signature.and_then(|s| s.name) {
        Some(index) => resolver.string(index)?,
        None => default_name.to_string(),
    };
    let desc = signature
        .and_then(|s| s.desc)
        .map(|index| resolver.string(index))
        .transpose()?;
    Ok(MemberKey { name, desc })
}

/// Decode the metadata of one class into its visibility record.
///
/// Classes without metadata (Java classes) and metadata kinds that carry
/// no declarations yield `None`.
pub fn read_class_visibility(class: &ClassFile) -> Result<Option<ClassVisibility>, MetadataError> {
    let Some(header) = KotlinHeader::read(class) else {
        return Ok(None);
    };
    let mut visibility = ClassVisibility::new(&class.name, header.kind);

    match header.kind {
        MetadataKind::Class => {
            let bytes = decode_bytes(&header.data1)?;
            let (types, rest) = split_jvm_payload(&bytes)?;
            let resolver = JvmNameResolver::new(types, header.data2.clone());
            let proto = ClassProto::parse(rest, Dialect::Jvm)?;
            visibility.flags = Some(proto.flags);
            visibility.companion_name = proto
                .companion_object_name
                .map(|index| resolver.string(index))
                .transpose()?;
            for ctor in &proto.constructors {
                let key = member_key(&resolver, ctor.jvm_signature.as_ref(), CONSTRUCTOR_NAME)?;
                visibility.add_member(
                    key,
                    MemberVisibility {
                        flags: ctor.flags,
                        role: MemberRole::Constructor,
                        property: None,
                    },
                );
            }
            for function in &proto.functions {
                visibility.add_function(&resolver, function)?;
            }
            for property in &proto.properties {
                visibility.add_property(&resolver, property)?;
            }
        }
        MetadataKind::FileFacade | MetadataKind::MultiFilePart => {
            let bytes = decode_bytes(&header.data1)?;
            let (types, rest) = split_jvm_payload(&bytes)?;
            let resolver = JvmNameResolver::new(types, header.data2.clone());
            let proto = PackageProto::parse(rest, Dialect::Jvm)?;
            visibility.add_package(&resolver, &proto)?;
            if header.kind == MetadataKind::MultiFilePart {
                visibility.facade = header.extra_string.clone();
            }
        }
        MetadataKind::MultiFileFacade | MetadataKind::SyntheticClass => {}
        MetadataKind::Unknown(code) => {
            trace!(class = %class.name, code, "unknown metadata kind");
            return Ok(None);
        }
    }

    Ok(Some(visibility))
}

// ============================================================================
// TABLE
// ============================================================================

/// All class visibilities of a module, linked.
#[derive(Debug, Clone, Default)]
pub struct VisibilityTable {
    classes: FxHashMap<String, ClassVisibility>,
}

impl VisibilityTable {
    /// Index by name, then attach companions to their outer classes and
    /// parts to their facades.
    pub fn build(visibilities: impl IntoIterator<Item = ClassVisibility>) -> Self {
        let mut classes: FxHashMap<String, ClassVisibility> = visibilities
            .into_iter()
            .map(|v| (v.name.clone(), v))
            .collect();

        let mut companions: Vec<(String, String)> = Vec::new();
        let mut parts: Vec<(String, String)> = Vec::new();
        for class in classes.values() {
            if class.is_companion() {
                if let Some((outer, _)) = class.name.rsplit_once('$') {
                    companions.push((outer.to_string(), class.name.clone()));
                }
            }
            if let Some(facade) = &class.facade {
                parts.push((facade.clone(), class.name.clone()));
            }
        }
        parts.sort();

        for (outer, companion) in companions {
            if let Some(outer) = classes.get_mut(&outer) {
                outer.companion = Some(companion);
            }
        }
        for (facade, part) in parts {
            if let Some(facade) = classes.get_mut(&facade) {
                facade.parts.push(part);
            }
        }

        Self { classes }
    }

    pub fn get(&self, name: &str) -> Option<&ClassVisibility> {
        self.classes.get(name)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Find a member of `class`, looking into multi-file parts for
    /// facades. Returns the record that declares it.
    pub fn find_member(
        &self,
        class: &str,
        name: &str,
        desc: &str,
    ) -> Option<(&ClassVisibility, &MemberVisibility)> {
        let visibility = self.classes.get(class)?;
        if let Some(member) = visibility.find_member(name, desc) {
            return Some((visibility, member));
        }
        visibility.parts.iter().find_map(|part| {
            let part = self.classes.get(part)?;
            part.find_member(name, desc).map(|member| (part, member))
        })
    }

    /// Companion record of `class`, if linked.
    pub fn companion_of(&self, class: &str) -> Option<&ClassVisibility> {
        let companion = self.classes.get(class)?.companion.as_ref()?;
        self.classes.get(companion)
    }
}
