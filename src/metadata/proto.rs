//! Descriptor messages.
//!
//! Each message type is a plain struct filled by a `parse` function that
//! walks the wire fields once. Names stay as raw indices here; a
//! [`NameResolver`](super::NameResolver) turns them into text during
//! conversion. Unknown fields are skipped so newer compilers' additions
//! do not break decoding.

use super::wire::{ProtoReader, WireValue};
use super::{Dialect, Flags, MetadataError};
use crate::model::Variance;

/// Parse a repeated sub-message field into `out`.
fn push_message<T>(
    out: &mut Vec<T>,
    value: WireValue<'_>,
    field: &'static str,
    parse: impl FnOnce(&[u8]) -> Result<T, MetadataError>,
) -> Result<(), MetadataError> {
    out.push(parse(value.as_bytes(field)?)?);
    Ok(())
}

fn required(value: Option<i32>, message: &'static str, field: &'static str) -> Result<i32, MetadataError> {
    value.ok_or(MetadataError::missing(message, field))
}

// ============================================================================
// TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Projection {
    In,
    Out,
    #[default]
    Inv,
    Star,
}

impl Projection {
    fn from_code(code: i32) -> Self {
        match code {
            0 => Self::In,
            1 => Self::Out,
            3 => Self::Star,
            _ => Self::Inv,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TypeArgument {
    pub projection: Projection,
    pub ty: Option<TypeProto>,
    pub type_id: Option<i32>,
}

impl TypeArgument {
    pub fn parse(bytes: &[u8]) -> Result<Self, MetadataError> {
        let mut argument = Self::default();
        let mut reader = ProtoReader::new(bytes);
        while let Some((field, value)) = reader.next_field()? {
            match field {
                1 => argument.projection = Projection::from_code(value.as_i32()),
                2 => argument.ty = Some(TypeProto::parse(value.as_bytes("Argument.type")?)?),
                3 => argument.type_id = Some(value.as_i32()),
                _ => {}
            }
        }
        Ok(argument)
    }
}

/// A type use. Exactly one of `class_name`, `type_parameter`,
/// `type_parameter_name` or `type_alias_name` identifies the constructor.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TypeProto {
    pub flags: i32,
    pub arguments: Vec<TypeArgument>,
    pub nullable: bool,
    pub class_name: Option<i32>,
    pub type_parameter: Option<i32>,
    pub type_parameter_name: Option<i32>,
    pub type_alias_name: Option<i32>,
    pub flexible_upper_bound: Option<Box<TypeProto>>,
    pub flexible_upper_bound_id: Option<i32>,
    pub outer_type: Option<Box<TypeProto>>,
    pub outer_type_id: Option<i32>,
    pub abbreviated_type: Option<Box<TypeProto>>,
    pub abbreviated_type_id: Option<i32>,
}

impl TypeProto {
    pub fn parse(bytes: &[u8]) -> Result<Self, MetadataError> {
        let mut ty = Self::default();
        let mut reader = ProtoReader::new(bytes);
        while let Some((field, value)) = reader.next_field()? {
            match field {
                1 => ty.flags = value.as_i32(),
                2 => push_message(&mut ty.arguments, value, "Type.argument", TypeArgument::parse)?,
                3 => ty.nullable = value.as_bool(),
                5 => {
                    ty.flexible_upper_bound =
                        Some(Box::new(Self::parse(value.as_bytes("Type.flexible_upper_bound")?)?))
                }
                6 => ty.class_name = Some(value.as_i32()),
                7 => ty.type_parameter = Some(value.as_i32()),
                8 => ty.flexible_upper_bound_id = Some(value.as_i32()),
                9 => ty.type_parameter_name = Some(value.as_i32()),
                10 => ty.outer_type = Some(Box::new(Self::parse(value.as_bytes("Type.outer_type")?)?)),
                11 => ty.outer_type_id = Some(value.as_i32()),
                12 => ty.type_alias_name = Some(value.as_i32()),
                13 => {
                    ty.abbreviated_type =
                        Some(Box::new(Self::parse(value.as_bytes("Type.abbreviated_type")?)?))
                }
                14 => ty.abbreviated_type_id = Some(value.as_i32()),
                _ => {}
            }
        }
        Ok(ty)
    }
}

/// Types referenced by id from the messages of one class or package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeTable {
    pub types: Vec<TypeProto>,
    /// Types at or after this index are implicitly nullable; `-1` for none
    pub first_nullable: i32,
}

impl Default for TypeTable {
    fn default() -> Self {
        Self {
            types: Vec::new(),
            first_nullable: -1,
        }
    }
}

impl TypeTable {
    pub fn parse(bytes: &[u8]) -> Result<Self, MetadataError> {
        let mut table = Self::default();
        let mut reader = ProtoReader::new(bytes);
        while let Some((field, value)) = reader.next_field()? {
            match field {
                1 => push_message(&mut table.types, value, "TypeTable.type", TypeProto::parse)?,
                2 => table.first_nullable = value.as_i32(),
                _ => {}
            }
        }
        Ok(table)
    }

    /// The type with the given id, nullability applied.
    pub fn get(&self, id: i32) -> Result<TypeProto, MetadataError> {
        let mut ty = usize::try_from(id)
            .ok()
            .and_then(|i| self.types.get(i))
            .cloned()
            .ok_or(MetadataError::invalid_index("type table", id))?;
        if self.first_nullable >= 0 && id >= self.first_nullable {
            ty.nullable = true;
        }
        Ok(ty)
    }

    /// Resolve an inline-or-by-id pair.
    pub fn resolve(
        &self,
        inline: Option<&TypeProto>,
        id: Option<i32>,
    ) -> Result<Option<TypeProto>, MetadataError> {
        match (inline, id) {
            (Some(ty), _) => Ok(Some(ty.clone())),
            (None, Some(id)) => self.get(id).map(Some),
            (None, None) => Ok(None),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TypeParameterProto {
    pub id: i32,
    pub name: i32,
    pub reified: bool,
    pub variance: Variance,
    pub upper_bounds: Vec<TypeProto>,
    pub upper_bound_ids: Vec<i32>,
}

impl TypeParameterProto {
    pub fn parse(bytes: &[u8]) -> Result<Self, MetadataError> {
        let mut id = None;
        let mut name = None;
        let mut param = Self::default();
        let mut reader = ProtoReader::new(bytes);
        while let Some((field, value)) = reader.next_field()? {
            match field {
                1 => id = Some(value.as_i32()),
                2 => name = Some(value.as_i32()),
                3 => param.reified = value.as_bool(),
                4 => {
                    param.variance = match value.as_i32() {
                        0 => Variance::In,
                        1 => Variance::Out,
                        _ => Variance::Invariant,
                    }
                }
                5 => push_message(
                    &mut param.upper_bounds,
                    value,
                    "TypeParameter.upper_bound",
                    TypeProto::parse,
                )?,
                6 => value.push_i32s(&mut param.upper_bound_ids)?,
                _ => {}
            }
        }
        param.id = required(id, "TypeParameter", "id")?;
        param.name = required(name, "TypeParameter", "name")?;
        Ok(param)
    }
}

// ============================================================================
// ANNOTATIONS & JVM SIGNATURES
// ============================================================================

/// Annotation class id (qualified-name index) of an annotation extension.
fn parse_annotation(bytes: &[u8]) -> Result<i32, MetadataError> {
    let mut id = None;
    let mut reader = ProtoReader::new(bytes);
    while let Some((field, value)) = reader.next_field()? {
        if field == 1 {
            id = Some(value.as_i32());
        }
    }
    required(id, "Annotation", "id")
}

/// JVM name and descriptor of a method (or field), as string indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JvmMemberSignature {
    pub name: Option<i32>,
    pub desc: Option<i32>,
}

impl JvmMemberSignature {
    pub fn parse(bytes: &[u8]) -> Result<Self, MetadataError> {
        let mut signature = Self::default();
        let mut reader = ProtoReader::new(bytes);
        while let Some((field, value)) = reader.next_field()? {
            match field {
                1 => signature.name = Some(value.as_i32()),
                2 => signature.desc = Some(value.as_i32()),
                _ => {}
            }
        }
        Ok(signature)
    }
}

/// Where a property lives in bytecode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JvmPropertySignature {
    pub field: Option<JvmMemberSignature>,
    /// Holder of the property's annotations (`…$annotations`)
    pub synthetic_method: Option<JvmMemberSignature>,
    pub getter: Option<JvmMemberSignature>,
    pub setter: Option<JvmMemberSignature>,
}

impl JvmPropertySignature {
    pub fn parse(bytes: &[u8]) -> Result<Self, MetadataError> {
        let mut signature = Self::default();
        let mut reader = ProtoReader::new(bytes);
        while let Some((field, value)) = reader.next_field()? {
            let parse = |what: &'static str| -> Result<Option<JvmMemberSignature>, MetadataError> {
                Ok(Some(JvmMemberSignature::parse(value.as_bytes(what)?)?))
            };
            match field {
                1 => signature.field = parse("JvmPropertySignature.field")?,
                2 => signature.synthetic_method = parse("JvmPropertySignature.synthetic_method")?,
                3 => signature.getter = parse("JvmPropertySignature.getter")?,
                4 => signature.setter = parse("JvmPropertySignature.setter")?,
                _ => {}
            }
        }
        Ok(signature)
    }
}

// ============================================================================
// CALLABLES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValueParameterProto {
    pub flags: Flags,
    pub name: i32,
    pub ty: Option<TypeProto>,
    pub type_id: Option<i32>,
    pub vararg_element_type: Option<TypeProto>,
    pub vararg_element_type_id: Option<i32>,
}

impl ValueParameterProto {
    pub fn parse(bytes: &[u8]) -> Result<Self, MetadataError> {
        let mut name = None;
        let mut param = Self::default();
        let mut reader = ProtoReader::new(bytes);
        while let Some((field, value)) = reader.next_field()? {
            match field {
                1 => param.flags = Flags(value.as_i32()),
                2 => name = Some(value.as_i32()),
                3 => param.ty = Some(TypeProto::parse(value.as_bytes("ValueParameter.type")?)?),
                4 => {
                    param.vararg_element_type = Some(TypeProto::parse(
                        value.as_bytes("ValueParameter.vararg_element_type")?,
                    )?)
                }
                5 => param.type_id = Some(value.as_i32()),
                6 => param.vararg_element_type_id = Some(value.as_i32()),
                _ => {}
            }
        }
        param.name = required(name, "ValueParameter", "name")?;
        Ok(param)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstructorProto {
    pub flags: Flags,
    pub value_parameters: Vec<ValueParameterProto>,
    pub annotations: Vec<i32>,
    pub jvm_signature: Option<JvmMemberSignature>,
}

impl ConstructorProto {
    pub fn parse(bytes: &[u8], dialect: Dialect) -> Result<Self, MetadataError> {
        let mut ctor = Self {
            flags: Flags::CONSTRUCTOR_DEFAULT,
            value_parameters: Vec::new(),
            annotations: Vec::new(),
            jvm_signature: None,
        };
        let mut reader = ProtoReader::new(bytes);
        while let Some((field, value)) = reader.next_field()? {
            match field {
                1 => ctor.flags = Flags(value.as_i32()),
                2 => push_message(
                    &mut ctor.value_parameters,
                    value,
                    "Constructor.value_parameter",
                    ValueParameterProto::parse,
                )?,
                f if dialect.is_annotation_field(f) => {
                    push_message(&mut ctor.annotations, value, "Constructor.annotation", parse_annotation)?
                }
                f if dialect.is_jvm_signature_field(f) => {
                    ctor.jvm_signature = Some(JvmMemberSignature::parse(
                        value.as_bytes("Constructor.signature")?,
                    )?)
                }
                _ => {}
            }
        }
        Ok(ctor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionProto {
    pub flags: Flags,
    pub name: i32,
    pub return_type: Option<TypeProto>,
    pub return_type_id: Option<i32>,
    pub type_parameters: Vec<TypeParameterProto>,
    pub receiver_type: Option<TypeProto>,
    pub receiver_type_id: Option<i32>,
    pub value_parameters: Vec<ValueParameterProto>,
    pub annotations: Vec<i32>,
    pub jvm_signature: Option<JvmMemberSignature>,
}

impl FunctionProto {
    pub fn parse(bytes: &[u8], dialect: Dialect) -> Result<Self, MetadataError> {
        let mut name = None;
        let mut function = Self {
            flags: Flags::FUNCTION_DEFAULT,
            name: 0,
            return_type: None,
            return_type_id: None,
            type_parameters: Vec::new(),
            receiver_type: None,
            receiver_type_id: None,
            value_parameters: Vec::new(),
            annotations: Vec::new(),
            jvm_signature: None,
        };
        let mut reader = ProtoReader::new(bytes);
        while let Some((field, value)) = reader.next_field()? {
            match field {
                9 => function.flags = Flags(value.as_i32()),
                2 => name = Some(value.as_i32()),
                3 => {
                    function.return_type =
                        Some(TypeProto::parse(value.as_bytes("Function.return_type")?)?)
                }
                4 => push_message(
                    &mut function.type_parameters,
                    value,
                    "Function.type_parameter",
                    TypeParameterProto::parse,
                )?,
                5 => {
                    function.receiver_type =
                        Some(TypeProto::parse(value.as_bytes("Function.receiver_type")?)?)
                }
                6 => push_message(
                    &mut function.value_parameters,
                    value,
                    "Function.value_parameter",
                    ValueParameterProto::parse,
                )?,
                7 => function.return_type_id = Some(value.as_i32()),
                8 => function.receiver_type_id = Some(value.as_i32()),
                f if dialect.is_annotation_field(f) => push_message(
                    &mut function.annotations,
                    value,
                    "Function.annotation",
                    parse_annotation,
                )?,
                f if dialect.is_jvm_signature_field(f) => {
                    function.jvm_signature = Some(JvmMemberSignature::parse(
                        value.as_bytes("Function.signature")?,
                    )?)
                }
                _ => {}
            }
        }
        function.name = required(name, "Function", "name")?;
        Ok(function)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyProto {
    pub flags: Flags,
    pub name: i32,
    pub return_type: Option<TypeProto>,
    pub return_type_id: Option<i32>,
    pub type_parameters: Vec<TypeParameterProto>,
    pub receiver_type: Option<TypeProto>,
    pub receiver_type_id: Option<i32>,
    pub setter_value_parameter: Option<ValueParameterProto>,
    pub getter_flags: Option<Flags>,
    pub setter_flags: Option<Flags>,
    pub annotations: Vec<i32>,
    pub jvm_signature: Option<JvmPropertySignature>,
}

impl PropertyProto {
    pub fn parse(bytes: &[u8], dialect: Dialect) -> Result<Self, MetadataError> {
        let mut name = None;
        let mut property = Self {
            flags: Flags::PROPERTY_DEFAULT,
            name: 0,
            return_type: None,
            return_type_id: None,
            type_parameters: Vec::new(),
            receiver_type: None,
            receiver_type_id: None,
            setter_value_parameter: None,
            getter_flags: None,
            setter_flags: None,
            annotations: Vec::new(),
            jvm_signature: None,
        };
        let mut reader = ProtoReader::new(bytes);
        while let Some((field, value)) = reader.next_field()? {
            match field {
                11 => property.flags = Flags(value.as_i32()),
                2 => name = Some(value.as_i32()),
                3 => {
                    property.return_type =
                        Some(TypeProto::parse(value.as_bytes("Property.return_type")?)?)
                }
                4 => push_message(
                    &mut property.type_parameters,
                    value,
                    "Property.type_parameter",
                    TypeParameterProto::parse,
                )?,
                5 => {
                    property.receiver_type =
                        Some(TypeProto::parse(value.as_bytes("Property.receiver_type")?)?)
                }
                6 => {
                    property.setter_value_parameter = Some(ValueParameterProto::parse(
                        value.as_bytes("Property.setter_value_parameter")?,
                    )?)
                }
                7 => property.getter_flags = Some(Flags(value.as_i32())),
                8 => property.setter_flags = Some(Flags(value.as_i32())),
                9 => property.return_type_id = Some(value.as_i32()),
                10 => property.receiver_type_id = Some(value.as_i32()),
                f if dialect.is_annotation_field(f) => push_message(
                    &mut property.annotations,
                    value,
                    "Property.annotation",
                    parse_annotation,
                )?,
                f if dialect.is_jvm_signature_field(f) => {
                    property.jvm_signature = Some(JvmPropertySignature::parse(
                        value.as_bytes("Property.signature")?,
                    )?)
                }
                _ => {}
            }
        }
        property.name = required(name, "Property", "name")?;
        Ok(property)
    }

    /// Getter flags, defaulted from the property when omitted.
    pub fn getter_flags(&self) -> Flags {
        self.getter_flags
            .unwrap_or_else(|| Flags::default_accessor(self.flags))
    }

    /// Setter flags, defaulted from the property when omitted.
    pub fn setter_flags(&self) -> Flags {
        self.setter_flags
            .unwrap_or_else(|| Flags::default_accessor(self.flags))
    }
}

// ============================================================================
// CONTAINERS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnumEntryProto {
    pub name: Option<i32>,
    pub annotations: Vec<i32>,
}

impl EnumEntryProto {
    pub fn parse(bytes: &[u8], dialect: Dialect) -> Result<Self, MetadataError> {
        let mut entry = Self::default();
        let mut reader = ProtoReader::new(bytes);
        while let Some((field, value)) = reader.next_field()? {
            match field {
                1 => entry.name = Some(value.as_i32()),
                f if dialect.is_annotation_field(f) => push_message(
                    &mut entry.annotations,
                    value,
                    "EnumEntry.annotation",
                    parse_annotation,
                )?,
                _ => {}
            }
        }
        Ok(entry)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassProto {
    pub flags: Flags,
    pub fq_name: i32,
    pub companion_object_name: Option<i32>,
    pub type_parameters: Vec<TypeParameterProto>,
    pub supertypes: Vec<TypeProto>,
    pub supertype_ids: Vec<i32>,
    pub nested_class_names: Vec<i32>,
    pub constructors: Vec<ConstructorProto>,
    pub functions: Vec<FunctionProto>,
    pub properties: Vec<PropertyProto>,
    pub enum_entries: Vec<EnumEntryProto>,
    pub sealed_subclasses: Vec<i32>,
    pub type_table: TypeTable,
    pub annotations: Vec<i32>,
}

impl ClassProto {
    pub fn parse(bytes: &[u8], dialect: Dialect) -> Result<Self, MetadataError> {
        let mut fq_name = None;
        let mut class = Self {
            flags: Flags::CLASS_DEFAULT,
            fq_name: 0,
            companion_object_name: None,
            type_parameters: Vec::new(),
            supertypes: Vec::new(),
            supertype_ids: Vec::new(),
            nested_class_names: Vec::new(),
            constructors: Vec::new(),
            functions: Vec::new(),
            properties: Vec::new(),
            enum_entries: Vec::new(),
            sealed_subclasses: Vec::new(),
            type_table: TypeTable::default(),
            annotations: Vec::new(),
        };
        let mut reader = ProtoReader::new(bytes);
        while let Some((field, value)) = reader.next_field()? {
            match field {
                1 => class.flags = Flags(value.as_i32()),
                2 => value.push_i32s(&mut class.supertype_ids)?,
                3 => fq_name = Some(value.as_i32()),
                4 => class.companion_object_name = Some(value.as_i32()),
                5 => push_message(
                    &mut class.type_parameters,
                    value,
                    "Class.type_parameter",
                    TypeParameterProto::parse,
                )?,
                6 => push_message(&mut class.supertypes, value, "Class.supertype", TypeProto::parse)?,
                7 => value.push_i32s(&mut class.nested_class_names)?,
                8 => push_message(&mut class.constructors, value, "Class.constructor", |b| {
                    ConstructorProto::parse(b, dialect)
                })?,
                9 => push_message(&mut class.functions, value, "Class.function", |b| {
                    FunctionProto::parse(b, dialect)
                })?,
                10 => push_message(&mut class.properties, value, "Class.property", |b| {
                    PropertyProto::parse(b, dialect)
                })?,
                13 => push_message(&mut class.enum_entries, value, "Class.enum_entry", |b| {
                    EnumEntryProto::parse(b, dialect)
                })?,
                16 => value.push_i32s(&mut class.sealed_subclasses)?,
                30 => class.type_table = TypeTable::parse(value.as_bytes("Class.type_table")?)?,
                f if dialect.is_annotation_field(f) => push_message(
                    &mut class.annotations,
                    value,
                    "Class.annotation",
                    parse_annotation,
                )?,
                _ => {}
            }
        }
        class.fq_name = required(fq_name, "Class", "fq_name")?;
        Ok(class)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PackageProto {
    pub functions: Vec<FunctionProto>,
    pub properties: Vec<PropertyProto>,
    pub type_table: TypeTable,
    /// Package name as a string index (JS and klib only)
    pub fq_name: Option<i32>,
}

impl PackageProto {
    pub fn parse(bytes: &[u8], dialect: Dialect) -> Result<Self, MetadataError> {
        let mut package = Self::default();
        let mut reader = ProtoReader::new(bytes);
        while let Some((field, value)) = reader.next_field()? {
            match field {
                3 => push_message(&mut package.functions, value, "Package.function", |b| {
                    FunctionProto::parse(b, dialect)
                })?,
                4 => push_message(&mut package.properties, value, "Package.property", |b| {
                    PropertyProto::parse(b, dialect)
                })?,
                30 => package.type_table = TypeTable::parse(value.as_bytes("Package.type_table")?)?,
                f if dialect.package_fq_name_field() == Some(f) => {
                    package.fq_name = Some(value.as_i32())
                }
                _ => {}
            }
        }
        Ok(package)
    }
}

// ============================================================================
// NAME TABLES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QualifiedNameKind {
    Class,
    #[default]
    Package,
    Local,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualifiedNameProto {
    /// Index of the enclosing name, `-1` at the root
    pub parent: i32,
    pub short_name: i32,
    pub kind: QualifiedNameKind,
}

impl QualifiedNameProto {
    pub fn parse(bytes: &[u8]) -> Result<Self, MetadataError> {
        let mut parent = -1;
        let mut short_name = None;
        let mut kind = QualifiedNameKind::Package;
        let mut reader = ProtoReader::new(bytes);
        while let Some((field, value)) = reader.next_field()? {
            match field {
                1 => parent = value.as_i32(),
                2 => short_name = Some(value.as_i32()),
                3 => {
                    kind = match value.as_i32() {
                        0 => QualifiedNameKind::Class,
                        2 => QualifiedNameKind::Local,
                        _ => QualifiedNameKind::Package,
                    }
                }
                _ => {}
            }
        }
        Ok(Self {
            parent,
            short_name: required(short_name, "QualifiedName", "short_name")?,
            kind,
        })
    }
}

fn parse_string_table(bytes: &[u8]) -> Result<Vec<String>, MetadataError> {
    let mut strings = Vec::new();
    let mut reader = ProtoReader::new(bytes);
    while let Some((field, value)) = reader.next_field()? {
        if field == 1 {
            strings.push(value.as_string("StringTable.string")?);
        }
    }
    Ok(strings)
}

fn parse_qualified_name_table(bytes: &[u8]) -> Result<Vec<QualifiedNameProto>, MetadataError> {
    let mut names = Vec::new();
    let mut reader = ProtoReader::new(bytes);
    while let Some((field, value)) = reader.next_field()? {
        if field == 1 {
            push_message(
                &mut names,
                value,
                "QualifiedNameTable.qualified_name",
                QualifiedNameProto::parse,
            )?;
        }
    }
    Ok(names)
}

/// JVM string transformation applied after lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StringOperation {
    #[default]
    None,
    /// `$` → `.`
    InternalToClassId,
    /// Strip the first and last character, then `$` → `.`
    DescToClassId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringRecord {
    /// How many consecutive strings this record describes
    pub range: i32,
    pub predefined_index: Option<i32>,
    pub string: Option<String>,
    pub operation: StringOperation,
    pub substring_index: Vec<i32>,
    pub replace_char: Vec<i32>,
}

impl Default for StringRecord {
    fn default() -> Self {
        Self {
            range: 1,
            predefined_index: None,
            string: None,
            operation: StringOperation::None,
            substring_index: Vec::new(),
            replace_char: Vec::new(),
        }
    }
}

impl StringRecord {
    pub fn parse(bytes: &[u8]) -> Result<Self, MetadataError> {
        let mut record = Self::default();
        let mut reader = ProtoReader::new(bytes);
        while let Some((field, value)) = reader.next_field()? {
            match field {
                1 => record.range = value.as_i32(),
                2 => record.predefined_index = Some(value.as_i32()),
                3 => {
                    record.operation = match value.as_i32() {
                        1 => StringOperation::InternalToClassId,
                        2 => StringOperation::DescToClassId,
                        _ => StringOperation::None,
                    }
                }
                4 => value.push_i32s(&mut record.substring_index)?,
                5 => value.push_i32s(&mut record.replace_char)?,
                6 => record.string = Some(value.as_string("Record.string")?),
                _ => {}
            }
        }
        Ok(record)
    }
}

/// The JVM string table preamble of `d1`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StringTableTypes {
    pub records: Vec<StringRecord>,
    pub local_names: Vec<i32>,
}

impl StringTableTypes {
    pub fn parse(bytes: &[u8]) -> Result<Self, MetadataError> {
        let mut types = Self::default();
        let mut reader = ProtoReader::new(bytes);
        while let Some((field, value)) = reader.next_field()? {
            match field {
                1 => push_message(&mut types.records, value, "StringTableTypes.record", StringRecord::parse)?,
                5 => value.push_i32s(&mut types.local_names)?,
                _ => {}
            }
        }
        Ok(types)
    }
}

/// Split decoded `d1` bytes into the string table preamble and the
/// remaining message bytes.
pub fn split_jvm_payload(bytes: &[u8]) -> Result<(StringTableTypes, &[u8]), MetadataError> {
    let mut reader = ProtoReader::new(bytes);
    let types = StringTableTypes::parse(reader.read_delimited()?)?;
    Ok((types, reader.remaining()))
}

// ============================================================================
// FRAGMENTS & LIBRARIES
// ============================================================================

/// One serialized package fragment: its own name tables plus the package
/// members and classes it declares.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PackageFragmentProto {
    pub strings: Vec<String>,
    pub qualified_names: Vec<QualifiedNameProto>,
    pub package: Option<PackageProto>,
    pub classes: Vec<ClassProto>,
}

impl PackageFragmentProto {
    pub fn parse(bytes: &[u8], dialect: Dialect) -> Result<Self, MetadataError> {
        let mut fragment = Self::default();
        let mut reader = ProtoReader::new(bytes);
        while let Some((field, value)) = reader.next_field()? {
            match field {
                1 => fragment.strings = parse_string_table(value.as_bytes("PackageFragment.strings")?)?,
                2 => {
                    fragment.qualified_names = parse_qualified_name_table(
                        value.as_bytes("PackageFragment.qualified_names")?,
                    )?
                }
                3 => {
                    fragment.package = Some(PackageProto::parse(
                        value.as_bytes("PackageFragment.package")?,
                        dialect,
                    )?)
                }
                4 => push_message(&mut fragment.classes, value, "PackageFragment.class", |b| {
                    ClassProto::parse(b, dialect)
                })?,
                _ => {}
            }
        }
        Ok(fragment)
    }
}

/// A JS module's metadata body.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LibraryProto {
    pub fragments: Vec<PackageFragmentProto>,
    pub imported_modules: Vec<String>,
}

impl LibraryProto {
    pub fn parse(bytes: &[u8]) -> Result<Self, MetadataError> {
        let mut library = Self::default();
        let mut reader = ProtoReader::new(bytes);
        while let Some((field, value)) = reader.next_field()? {
            match field {
                2 => push_message(&mut library.fragments, value, "Library.package_fragment", |b| {
                    PackageFragmentProto::parse(b, Dialect::Js)
                })?,
                3 => library
                    .imported_modules
                    .push(value.as_string("Library.imported_module")?),
                _ => {}
            }
        }
        Ok(library)
    }

    /// Parse a delimited header followed by the library message.
    pub fn parse_with_header(bytes: &[u8]) -> Result<Self, MetadataError> {
        let mut reader = ProtoReader::new(bytes);
        reader.read_delimited()?;
        Self::parse(reader.remaining())
    }
}
