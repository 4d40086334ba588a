//! Descriptor fragments to symbol model, for JS and klib.
//!
//! All fragments of one unit are indexed first; nesting is then linked by
//! qualified name, so the order fragments arrive in does not matter.
//!
//! ```text
//! fragments ──> class index (fq name → class, resolver)
//!                   │
//!                   ├─ roots ──> Class (+ nested by name, companion by name)
//!                   └─ package members ──> Function / Property
//! ```
//!
//! Fake overrides and the members every class inherits from `Any` are not
//! part of a class's own surface and are dropped here.

use crate::base::constants::{ANY_MEMBER_NAMES, PUBLISHED_API_FQ_NAME};
use crate::metadata::{
    ClassName, ClassProto, ConstructorProto, Flags, FragmentNameResolver, FunctionProto, MemberKind,
    MetadataError, NameResolver, PackageFragmentProto, Projection, PropertyProto, TypeParameterProto,
    TypeProto, TypeTable, ValueParameterProto,
};
use crate::model::{
    Accessors, Class, ClassKind, Declaration, Function, Module, Mutability, Parameter, Property,
    TypeParameter,
};
use crate::visibility::{self, EntityFacts, VisibilityContext};
use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use std::collections::BTreeMap;
use tracing::trace;

const ANY_FQ_NAME: &str = "kotlin.Any";

/// One fragment of a unit, with the package name its container implies.
#[derive(Debug, Clone)]
pub(crate) struct UnitFragment {
    /// Package from the container layout (klib directory name)
    pub package_hint: Option<String>,
    pub proto: PackageFragmentProto,
}

/// Type parameters in scope: `(id, name)`, innermost last.
type Scope = Vec<(i32, SmolStr)>;

fn qualify(owner: &str, name: &str) -> String {
    if owner.is_empty() {
        name.to_string()
    } else {
        format!("{owner}.{name}")
    }
}

/// Convert every fragment of `unit` into packages of `module`.
pub(crate) fn convert_unit(
    module: &mut Module,
    unit: &str,
    fragments: &[UnitFragment],
) -> Result<(), MetadataError> {
    module.add_unit(unit);
    let resolvers: Vec<FragmentNameResolver> = fragments
        .iter()
        .map(|f| FragmentNameResolver::new(f.proto.strings.clone(), f.proto.qualified_names.clone()))
        .collect();

    let mut index: BTreeMap<String, ClassEntry<'_>> = BTreeMap::new();
    for (fragment, resolver) in fragments.iter().zip(&resolvers) {
        for proto in &fragment.proto.classes {
            let name = resolver.class_name(proto.fq_name)?;
            index.insert(
                name.fq_name(),
                ClassEntry {
                    name,
                    proto,
                    resolver,
                },
            );
        }
    }
    let converter = Converter::new(&index);

    for entry in converter.roots() {
        if let Some(class) = converter.convert_class(entry, &VisibilityContext::top_level(), &Vec::new())? {
            module
                .package_mut(unit, &entry.name.package)
                .declarations
                .push(Declaration::Class(class));
        }
    }

    for (fragment, resolver) in fragments.iter().zip(&resolvers) {
        let Some(package) = &fragment.proto.package else {
            continue;
        };
        let package_name = match package.fq_name {
            Some(index) => resolver.string(index)?,
            None => fragment.package_hint.clone().unwrap_or_default(),
        };
        let members = MemberConverter {
            resolver,
            table: &package.type_table,
        };
        let context = VisibilityContext::top_level();
        let mut declarations = Vec::new();
        for function in &package.functions {
            if let Some(f) = members.function(function, &package_name, &context, &Vec::new())? {
                declarations.push(Declaration::Function(f));
            }
        }
        for property in &package.properties {
            if let Some(p) = members.property(property, &package_name, &context, &Vec::new())? {
                declarations.push(Declaration::Property(p));
            }
        }
        if !declarations.is_empty() {
            module
                .package_mut(unit, &package_name)
                .declarations
                .extend(declarations);
        }
    }
    Ok(())
}

struct ClassEntry<'a> {
    name: ClassName,
    proto: &'a ClassProto,
    resolver: &'a FragmentNameResolver,
}

struct Converter<'i, 'a> {
    index: &'i BTreeMap<String, ClassEntry<'a>>,
    children: FxHashMap<String, Vec<&'i ClassEntry<'a>>>,
}

impl<'i, 'a> Converter<'i, 'a> {
    fn new(index: &'i BTreeMap<String, ClassEntry<'a>>) -> Self {
        let mut children: FxHashMap<String, Vec<&ClassEntry<'a>>> = FxHashMap::default();
        for entry in index.values() {
            if let Some(parent) = Self::parent_fq_name(&entry.name) {
                if index.contains_key(&parent) {
                    children.entry(parent).or_default().push(entry);
                }
            }
        }
        Self { index, children }
    }

    fn parent_fq_name(name: &ClassName) -> Option<String> {
        let (outer, _) = name.relative.rsplit_once('.')?;
        Some(qualify(&name.package, outer))
    }

    /// Classes with no indexed outer class.
    fn roots(&self) -> impl Iterator<Item = &'i ClassEntry<'a>> + '_ {
        self.index.values().filter(|entry| {
            Self::parent_fq_name(&entry.name).is_none_or(|parent| !self.index.contains_key(&parent))
        })
    }

    fn convert_class(
        &self,
        entry: &ClassEntry<'a>,
        context: &VisibilityContext,
        outer_scope: &Scope,
    ) -> Result<Option<Class>, MetadataError> {
        let proto = entry.proto;
        let members = MemberConverter {
            resolver: entry.resolver,
            table: &proto.type_table,
        };
        let flags = proto.flags;
        let published = members.is_published(&proto.annotations)?;
        let facts = EntityFacts::declared(flags.visibility())
            .published(published)
            .local(entry.name.local);
        let decision = visibility::resolve(&facts, context);
        let fq_name = entry.name.fq_name();
        trace!(class = %fq_name, ?decision, "class visibility");
        if !decision.is_public() {
            return Ok(None);
        }

        let mut scope = outer_scope.clone();
        let mut model = Class::new(fq_name.clone(), flags.class_kind());
        model.visibility = flags.visibility();
        model.modality = flags.modality();
        model.modifiers = flags.class_modifiers();
        model.published = published;
        model.type_parameters = members.type_parameters(&proto.type_parameters, &mut scope)?;
        for ty in members.types(&proto.supertypes, &proto.supertype_ids)? {
            let rendered = members.render(&ty, &scope)?;
            if rendered != ANY_FQ_NAME {
                model.supertypes.push(rendered);
            }
        }

        let member_context = VisibilityContext::member_of(true, model.modality);
        for ctor in &proto.constructors {
            if let Some(c) = members.constructor(ctor, &fq_name, &member_context, &scope)? {
                model.members.push(Declaration::Function(c));
            }
        }
        for function in &proto.functions {
            if let Some(f) = members.function(function, &fq_name, &member_context, &scope)? {
                model.members.push(Declaration::Function(f));
            }
        }
        for property in &proto.properties {
            if let Some(p) = members.property(property, &fq_name, &member_context, &scope)? {
                model.members.push(Declaration::Property(p));
            }
        }
        for enum_entry_proto in &proto.enum_entries {
            let Some(name) = enum_entry_proto.name else {
                continue;
            };
            let name = members.resolver.string(name)?;
            let mut enum_entry = Class::new(qualify(&fq_name, &name), ClassKind::EnumEntry);
            enum_entry.published = members.is_published(&enum_entry_proto.annotations)?;
            model.members.push(Declaration::Class(enum_entry));
        }

        if let Some(children) = self.children.get(&fq_name) {
            for child in children {
                if let Some(nested) = self.convert_class(child, &member_context, &scope)? {
                    model.members.push(Declaration::Class(nested));
                }
            }
        }
        if let Some(index) = proto.companion_object_name {
            let name = members.resolver.string(index)?;
            if model.nested_classes().any(|c| c.name == name) {
                model.companion = Some(SmolStr::from(name));
            }
        }
        Ok(Some(model))
    }
}

/// Converts callables against one resolver and type table.
struct MemberConverter<'r> {
    resolver: &'r FragmentNameResolver,
    table: &'r TypeTable,
}

impl MemberConverter<'_> {
    fn is_published(&self, annotations: &[i32]) -> Result<bool, MetadataError> {
        for id in annotations {
            if self.resolver.class_name(*id)?.fq_name() == PUBLISHED_API_FQ_NAME {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn types(&self, inline: &[TypeProto], ids: &[i32]) -> Result<Vec<TypeProto>, MetadataError> {
        let mut types = inline.to_vec();
        for id in ids {
            types.push(self.table.get(*id)?);
        }
        Ok(types)
    }

    fn required_type(
        &self,
        inline: Option<&TypeProto>,
        id: Option<i32>,
        message: &'static str,
    ) -> Result<TypeProto, MetadataError> {
        self.table
            .resolve(inline, id)?
            .ok_or(MetadataError::missing(message, "type"))
    }

    /// Render a type use: `fq.Name<args>?`.
    fn render(&self, ty: &TypeProto, scope: &Scope) -> Result<String, MetadataError> {
        let mut out = if let Some(index) = ty.class_name {
            self.resolver.class_name(index)?.fq_name()
        } else if let Some(id) = ty.type_parameter {
            scope
                .iter()
                .rev()
                .find(|(candidate, _)| *candidate == id)
                .map(|(_, name)| name.to_string())
                .ok_or(MetadataError::invalid_index("type parameter", id))?
        } else if let Some(index) = ty.type_parameter_name {
            self.resolver.string(index)?
        } else if let Some(index) = ty.type_alias_name {
            self.resolver.class_name(index)?.fq_name()
        } else {
            return Err(MetadataError::missing("Type", "classifier"));
        };

        if !ty.arguments.is_empty() {
            let mut arguments = Vec::with_capacity(ty.arguments.len());
            for argument in &ty.arguments {
                let inner = self.table.resolve(argument.ty.as_ref(), argument.type_id)?;
                let rendered = match (argument.projection, inner) {
                    (Projection::Star, _) | (_, None) => "*".to_string(),
                    (Projection::In, Some(inner)) => format!("in {}", self.render(&inner, scope)?),
                    (Projection::Out, Some(inner)) => format!("out {}", self.render(&inner, scope)?),
                    (Projection::Inv, Some(inner)) => self.render(&inner, scope)?,
                };
                arguments.push(rendered);
            }
            out.push('<');
            out.push_str(&arguments.join(", "));
            out.push('>');
        }
        if ty.nullable {
            out.push('?');
        }
        Ok(out)
    }

    /// Convert type parameters and push them onto `scope`.
    fn type_parameters(
        &self,
        protos: &[TypeParameterProto],
        scope: &mut Scope,
    ) -> Result<Vec<TypeParameter>, MetadataError> {
        // names first: bounds may refer to any parameter of the list
        for proto in protos {
            scope.push((proto.id, SmolStr::from(self.resolver.string(proto.name)?)));
        }
        protos
            .iter()
            .map(|proto| {
                let upper_bounds = self
                    .types(&proto.upper_bounds, &proto.upper_bound_ids)?
                    .iter()
                    .map(|ty| self.render(ty, scope))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(TypeParameter {
                    name: SmolStr::from(self.resolver.string(proto.name)?),
                    variance: proto.variance,
                    reified: proto.reified,
                    upper_bounds,
                })
            })
            .collect()
    }

    fn parameters(
        &self,
        protos: &[ValueParameterProto],
        scope: &Scope,
    ) -> Result<Vec<Parameter>, MetadataError> {
        protos
            .iter()
            .map(|proto| {
                let name = SmolStr::from(self.resolver.string(proto.name)?);
                let vararg = self
                    .table
                    .resolve(proto.vararg_element_type.as_ref(), proto.vararg_element_type_id)?;
                let ty = match &vararg {
                    Some(element) => element.clone(),
                    None => self.required_type(proto.ty.as_ref(), proto.type_id, "ValueParameter")?,
                };
                let mut parameter = Parameter::new(Some(name), self.render(&ty, scope)?);
                parameter.vararg = vararg.is_some();
                parameter.has_default = proto.flags.declares_default_value();
                parameter.crossinline = proto.flags.is_crossinline();
                parameter.noinline = proto.flags.is_noinline();
                Ok(parameter)
            })
            .collect()
    }

    fn constructor(
        &self,
        proto: &ConstructorProto,
        owner: &str,
        context: &VisibilityContext,
        scope: &Scope,
    ) -> Result<Option<Function>, MetadataError> {
        let facts = EntityFacts::declared(proto.flags.visibility())
            .published(self.is_published(&proto.annotations)?);
        if !visibility::is_public(&facts, context) {
            return Ok(None);
        }
        let mut ctor = Function::constructor(owner);
        ctor.visibility = facts.declared;
        ctor.published = facts.published_api;
        ctor.parameters = self.parameters(&proto.value_parameters, scope)?;
        Ok(Some(ctor))
    }

    fn function(
        &self,
        proto: &FunctionProto,
        owner: &str,
        context: &VisibilityContext,
        outer_scope: &Scope,
    ) -> Result<Option<Function>, MetadataError> {
        let flags = proto.flags;
        if flags.member_kind() == MemberKind::FakeOverride {
            return Ok(None);
        }
        let name = self.resolver.string(proto.name)?;
        if ANY_MEMBER_NAMES.contains(&name.as_str()) && flags.member_kind() != MemberKind::Declaration {
            return Ok(None);
        }
        let facts = EntityFacts::declared(flags.visibility())
            .published(self.is_published(&proto.annotations)?);
        let decision = visibility::resolve(&facts, context);
        trace!(function = %name, ?decision, "function visibility");
        if !decision.is_public() {
            return Ok(None);
        }

        let mut scope = outer_scope.clone();
        let type_parameters = self.type_parameters(&proto.type_parameters, &mut scope)?;
        let return_type = self.required_type(proto.return_type.as_ref(), proto.return_type_id, "Function")?;
        let mut function = Function::new(qualify(owner, &name), self.render(&return_type, &scope)?);
        function.visibility = facts.declared;
        function.modality = flags.modality();
        function.modifiers = flags.function_modifiers();
        function.published = facts.published_api;
        function.type_parameters = type_parameters;
        function.receiver = self
            .table
            .resolve(proto.receiver_type.as_ref(), proto.receiver_type_id)?
            .map(|ty| self.render(&ty, &scope))
            .transpose()?;
        function.parameters = self.parameters(&proto.value_parameters, &scope)?;
        Ok(Some(function))
    }

    fn property(
        &self,
        proto: &PropertyProto,
        owner: &str,
        context: &VisibilityContext,
        outer_scope: &Scope,
    ) -> Result<Option<Property>, MetadataError> {
        let flags = proto.flags;
        if flags.member_kind() == MemberKind::FakeOverride {
            return Ok(None);
        }
        let name = self.resolver.string(proto.name)?;
        let published = self.is_published(&proto.annotations)?;
        let facts = EntityFacts::declared(flags.visibility()).published(published);
        let decision = visibility::resolve(&facts, context);
        trace!(property = %name, ?decision, "property visibility");
        if !decision.is_public() {
            return Ok(None);
        }

        let accessor = |present: bool, accessor_flags: Flags| {
            present
                && visibility::is_public(
                    &EntityFacts::declared(accessor_flags.visibility()).published(published),
                    context,
                )
        };
        let accessors = Accessors {
            field: false,
            getter: accessor(flags.has_getter(), proto.getter_flags()),
            setter: accessor(flags.has_setter(), proto.setter_flags()),
        };

        let mut scope = outer_scope.clone();
        let type_parameters = self.type_parameters(&proto.type_parameters, &mut scope)?;
        let ty = self.required_type(proto.return_type.as_ref(), proto.return_type_id, "Property")?;
        let mut property = Property::new(qualify(owner, &name), self.render(&ty, &scope)?);
        property.visibility = facts.declared;
        property.modality = flags.modality();
        property.modifiers = flags.property_modifiers();
        property.published = published;
        property.type_parameters = type_parameters;
        property.mutability = if flags.is_var() {
            Mutability::Var
        } else {
            Mutability::Val
        };
        property.receiver = self
            .table
            .resolve(proto.receiver_type.as_ref(), proto.receiver_type_id)?
            .map(|ty| self.render(&ty, &scope))
            .transpose()?;
        property.accessors = accessors;
        Ok(Some(property))
    }
}
