//! Serialized declaration metadata shared by all extractors.
//!
//! The compiler records what bytecode and JS cannot express (declared
//! visibility, modality, property accessors, extension receivers,
//! companions) as protobuf "descriptor" messages. The same message set is
//! embedded three ways:
//!
//! ```text
//! JVM     kotlin/Metadata annotation   d1 (bit-encoded) + d2 string array
//! JS      *.meta.js comment line       base64 → gzip → Header, Library
//! klib    linkdata/**/*.knm            PackageFragment per file
//! ```
//!
//! The dialects differ only in extension field numbers, captured by
//! [`Dialect`].

mod error;

pub mod bit_encoding;
pub mod flags;
pub mod names;
pub mod proto;
pub mod wire;

pub use error::MetadataError;
pub use flags::{Flags, FlagsBuilder, MemberKind};
pub use names::{ClassName, FragmentNameResolver, JvmNameResolver, NameResolver};
pub use proto::{
    ClassProto, ConstructorProto, EnumEntryProto, FunctionProto, JvmMemberSignature,
    JvmPropertySignature, LibraryProto, PackageFragmentProto, PackageProto, Projection,
    PropertyProto, StringTableTypes, TypeArgument, TypeParameterProto, TypeProto, TypeTable,
    ValueParameterProto,
};

/// Which embedding a message came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    Jvm,
    Js,
    Klib,
}

impl Dialect {
    const JVM_SIGNATURE_FIELD: u32 = 100;

    /// Field carrying annotations on classes, members and enum entries.
    pub fn annotation_field(self) -> Option<u32> {
        match self {
            Self::Jvm => None,
            Self::Js => Some(130),
            Self::Klib => Some(170),
        }
    }

    /// Field carrying the package name on `Package`.
    pub fn package_fq_name_field(self) -> Option<u32> {
        match self {
            Self::Jvm => None,
            Self::Js => Some(131),
            Self::Klib => Some(171),
        }
    }

    pub fn is_annotation_field(self, field: u32) -> bool {
        self.annotation_field() == Some(field)
    }

    /// Member signature extension on constructors, functions and
    /// properties.
    pub fn is_jvm_signature_field(self, field: u32) -> bool {
        self == Self::Jvm && field == Self::JVM_SIGNATURE_FIELD
    }
}
