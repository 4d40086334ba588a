//! Building the symbol model from parsed classes.
//!
//! Every class, field and method is turned into [`EntityFacts`] and put
//! through the visibility resolver once. Nested classes are attached to
//! their outer class by name after all classes are loaded; a nested class
//! whose outer class is missing from the input is treated as top-level.

use super::class_file::{AccessFlags, ClassFile, MemberInfo};
use super::kotlin::{ClassVisibility, MemberKey, MemberRole, PropertyInfo, VisibilityTable};
use super::signature::{self, binary_name, package_of};
use super::LoadedClass;
use crate::base::Platform;
use crate::base::constants::{
    ACCESS_METHOD_PREFIX, ANNOTATIONS_METHOD_SUFFIX, CONSTRUCTOR_NAME, DEFAULT_IMPLS_SUFFIX,
    PUBLISHED_API_ANNOTATION, STATIC_INITIALIZER_NAME, WHEN_MAPPINGS_SUFFIX,
};
use crate::extract::ExtractionError;
use crate::metadata::Flags;
use crate::model::{
    Accessors, Class, ClassKind, ClassModifiers, Declaration, Function, FunctionModifiers,
    Modality, Module, Mutability, Parameter, Property, PropertyModifiers, Visibility,
};
use crate::visibility::{self, Decision, EntityFacts, HiddenReason, VisibilityContext};
use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;
use tracing::trace;

/// Nesting deeper than this is treated as a cycle in `InnerClasses`.
const MAX_NESTING: usize = 64;

pub(super) struct SurfaceBuilder<'a> {
    classes: FxHashMap<&'a str, &'a LoadedClass>,
    children: FxHashMap<&'a str, Vec<&'a LoadedClass>>,
    roots: Vec<&'a LoadedClass>,
    table: &'a VisibilityTable,
}

fn access_visibility(access: AccessFlags) -> Visibility {
    if access.contains(AccessFlags::PUBLIC) {
        Visibility::Public
    } else if access.contains(AccessFlags::PROTECTED) {
        Visibility::Protected
    } else if access.contains(AccessFlags::PRIVATE) {
        Visibility::Private
    } else {
        Visibility::PackagePrivate
    }
}

/// Declared visibility of a member: metadata wins when bytecode exposes it.
fn declared_visibility(access: AccessFlags, metadata: Option<Flags>) -> Visibility {
    match metadata {
        Some(flags) if access.is_exposed() => flags.visibility(),
        _ => access_visibility(access),
    }
}

fn find_member<'c>(members: &'c [MemberInfo], key: &MemberKey) -> Option<&'c MemberInfo> {
    members.iter().find(|m| {
        m.name == key.name && key.desc.as_deref().is_none_or(|desc| desc == m.descriptor)
    })
}

fn descriptor_error(loaded: &LoadedClass, error: signature::DescriptorError) -> ExtractionError {
    ExtractionError::malformed(&loaded.origin, error.to_string())
}

impl<'a> SurfaceBuilder<'a> {
    pub(super) fn new(loaded: &'a [LoadedClass], table: &'a VisibilityTable) -> Self {
        let classes: FxHashMap<&str, &LoadedClass> = loaded
            .iter()
            .map(|l| (l.class.name.as_str(), l))
            .collect();

        let mut children: FxHashMap<&str, Vec<&LoadedClass>> = FxHashMap::default();
        let mut roots = Vec::new();
        for l in loaded {
            match l.class.outer_class().filter(|outer| classes.contains_key(outer)) {
                Some(outer) => children.entry(outer).or_default().push(l),
                None => roots.push(l),
            }
        }

        Self {
            classes,
            children,
            roots,
            table,
        }
    }

    pub(super) fn build(&self, module_name: &str) -> Result<Module, ExtractionError> {
        let mut module = Module::new(module_name, Platform::Jvm);
        if !self.classes.is_empty() {
            module.add_unit(module_name);
        }
        for loaded in &self.roots {
            if let Some(class) = self.build_class(loaded, 0)? {
                module
                    .package_mut(module_name, &package_of(&loaded.class.name))
                    .declarations
                    .push(Declaration::Class(class));
            }
        }
        Ok(module)
    }

    // ========================================================================
    // CLASSES
    // ========================================================================

    fn record(&self, class: &ClassFile) -> Option<&'a ClassVisibility> {
        self.table.get(&class.name)
    }

    fn class_facts(&self, class: &ClassFile) -> EntityFacts {
        let access = class.effective_access();
        let record = self.record(class);
        EntityFacts::declared(declared_visibility(access, record.and_then(|r| r.flags)))
            .published(class.find_annotation(PUBLISHED_API_ANNOTATION).is_some())
            .local(class.is_local())
            .when_mappings(
                access.contains(AccessFlags::SYNTHETIC) && class.name.ends_with(WHEN_MAPPINGS_SUFFIX),
            )
            .default_impls(
                class.is_inner()
                    && class.name.ends_with(DEFAULT_IMPLS_SUFFIX)
                    && record.is_some_and(ClassVisibility::is_synthetic_class),
            )
    }

    fn class_modality(&self, class: &ClassFile) -> Modality {
        if let Some(flags) = self.record(class).and_then(|r| r.flags) {
            return flags.modality();
        }
        let access = class.effective_access();
        if access.intersects(AccessFlags::INTERFACE | AccessFlags::ABSTRACT) {
            Modality::Abstract
        } else if access.contains(AccessFlags::FINAL) {
            Modality::Final
        } else {
            Modality::Open
        }
    }

    fn class_kind(&self, class: &ClassFile) -> ClassKind {
        let access = class.effective_access();
        if access.contains(AccessFlags::ANNOTATION) {
            return ClassKind::AnnotationClass;
        }
        if let Some(flags) = self.record(class).and_then(|r| r.flags) {
            return flags.class_kind();
        }
        if access.contains(AccessFlags::INTERFACE) {
            ClassKind::Interface
        } else if access.contains(AccessFlags::ENUM) {
            ClassKind::EnumClass
        } else {
            ClassKind::Class
        }
    }

    fn class_context(&self, class: &ClassFile, depth: usize) -> VisibilityContext {
        match class.outer_class().and_then(|outer| self.classes.get(outer)) {
            Some(outer) => VisibilityContext::member_of(
                self.class_decision(&outer.class, depth + 1).is_public(),
                self.class_modality(&outer.class),
            ),
            None => VisibilityContext::top_level(),
        }
    }

    fn class_decision(&self, class: &ClassFile, depth: usize) -> Decision {
        if depth > MAX_NESTING {
            return Decision::Hidden(HiddenReason::ContainerHidden);
        }
        let context = self.class_context(class, depth);
        visibility::resolve(&self.class_facts(class), &context)
    }

    fn build_class(
        &self,
        loaded: &LoadedClass,
        depth: usize,
    ) -> Result<Option<Class>, ExtractionError> {
        let class = &loaded.class;
        let decision = self.class_decision(class, depth);
        trace!(class = %class.name, ?decision, "class visibility");
        if !decision.is_public() || depth > MAX_NESTING {
            return Ok(None);
        }

        let record = self.record(class);
        let facts = self.class_facts(class);
        let access = class.effective_access();
        let mut model = Class::new(binary_name(&class.name), self.class_kind(class));
        model.visibility = facts.declared;
        model.modality = self.class_modality(class);
        model.published = facts.published_api;
        if let Some(flags) = record.and_then(|r| r.flags) {
            model.modifiers = flags.class_modifiers();
        }
        if class.outer_class().is_some() && access.contains(AccessFlags::STATIC) {
            model.modifiers |= ClassModifiers::STATIC;
        }
        model.supertypes = class
            .super_name
            .iter()
            .filter(|name| name.as_str() != "java/lang/Object")
            .chain(class.interfaces.iter())
            .map(|name| binary_name(name))
            .collect();

        let context = VisibilityContext::member_of(true, model.modality);
        self.add_members(loaded, record, &context, &mut model)?;

        if let Some(children) = self.children.get(class.name.as_str()) {
            for child in children {
                if let Some(nested) = self.build_class(child, depth + 1)? {
                    model.members.push(Declaration::Class(nested));
                }
            }
        }
        model.companion = record
            .and_then(|r| r.companion_name.as_deref())
            .filter(|name| model.nested_classes().any(|c| c.name == *name))
            .map(SmolStr::new);

        Ok(Some(model))
    }

    // ========================================================================
    // MEMBERS
    // ========================================================================

    fn property_infos(&self, record: Option<&'a ClassVisibility>) -> Vec<&'a PropertyInfo> {
        let Some(record) = record else {
            return Vec::new();
        };
        let parts = record
            .parts
            .iter()
            .filter_map(|part| self.table.get(part))
            .flat_map(|part| part.properties.iter());
        record.properties.iter().chain(parts).collect()
    }

    fn add_members(
        &self,
        loaded: &LoadedClass,
        record: Option<&'a ClassVisibility>,
        context: &VisibilityContext,
        model: &mut Class,
    ) -> Result<(), ExtractionError> {
        let class = &loaded.class;
        let mut consumed: FxHashSet<(&str, &str)> = FxHashSet::default();

        for info in self.property_infos(record) {
            let field = info.field.as_ref().and_then(|k| find_member(&class.fields, k));
            let getter = info.getter.as_ref().and_then(|k| find_member(&class.methods, k));
            let setter = info.setter.as_ref().and_then(|k| find_member(&class.methods, k));
            let holder = info
                .annotations
                .as_ref()
                .and_then(|k| find_member(&class.methods, k));
            for member in [field, getter, setter, holder].into_iter().flatten() {
                consumed.insert((member.name.as_str(), member.descriptor.as_str()));
            }
            let members = PropertyMembers {
                field,
                getter,
                setter,
                holder,
            };
            if let Some(property) = self.build_property(loaded, info, &members, context, model)? {
                model.members.push(Declaration::Property(property));
            }
        }

        for field in &class.fields {
            if consumed.contains(&(field.name.as_str(), field.descriptor.as_str())) {
                continue;
            }
            if let Some(property) = self.build_field(loaded, record, field, context, model)? {
                model.members.push(Declaration::Property(property));
            }
        }

        for method in &class.methods {
            if method.name == STATIC_INITIALIZER_NAME
                || consumed.contains(&(method.name.as_str(), method.descriptor.as_str()))
            {
                continue;
            }
            if let Some(function) = self.build_method(loaded, method, context, model)? {
                model.members.push(Declaration::Function(function));
            }
        }
        Ok(())
    }

    fn build_property(
        &self,
        loaded: &LoadedClass,
        info: &PropertyInfo,
        members: &PropertyMembers<'_>,
        context: &VisibilityContext,
        model: &Class,
    ) -> Result<Option<Property>, ExtractionError> {
        let published = members
            .iter()
            .any(|m| m.has_annotation(PUBLISHED_API_ANNOTATION));
        let eligible = |member: Option<&MemberInfo>, flags: Flags| {
            member.is_some_and(|m| {
                let facts = EntityFacts::declared(declared_visibility(m.access, Some(flags)))
                    .published(published);
                let decision = visibility::resolve(&facts, context);
                trace!(member = %m.name, ?decision, "property accessor visibility");
                decision.is_public()
            })
        };
        let accessors = Accessors {
            field: eligible(members.field, info.flags),
            getter: eligible(members.getter, info.getter_flags),
            setter: eligible(members.setter, info.setter_flags),
        };
        if !accessors.any() {
            return Ok(None);
        }

        let (ty, receiver) = match (members.getter, members.field) {
            (Some(getter), _) => {
                let method = signature::method_type(&getter.descriptor)
                    .map_err(|e| descriptor_error(loaded, e))?;
                let receiver = match method.parameters.as_slice() {
                    [receiver] => Some(receiver.clone()),
                    _ => None,
                };
                (method.return_type, receiver)
            }
            (None, Some(field)) => (
                signature::field_type(&field.descriptor).map_err(|e| descriptor_error(loaded, e))?,
                None,
            ),
            (None, None) => {
                let Some(setter) = members.setter else {
                    return Ok(None);
                };
                let method = signature::method_type(&setter.descriptor)
                    .map_err(|e| descriptor_error(loaded, e))?;
                let receiver = match method.parameters.as_slice() {
                    [receiver, _] => Some(receiver.clone()),
                    _ => None,
                };
                (method.parameters.last().cloned().unwrap_or_default(), receiver)
            }
        };

        let mut property = Property::new(format!("{}.{}", model.qualified_name, info.name), ty);
        property.visibility = info.flags.visibility();
        property.modality = info.flags.modality();
        property.modifiers = info.flags.property_modifiers();
        if members
            .iter()
            .next()
            .is_some_and(|m| m.access.contains(AccessFlags::STATIC))
        {
            property.modifiers |= PropertyModifiers::STATIC;
        }
        property.mutability = if info.flags.is_var() {
            Mutability::Var
        } else {
            Mutability::Val
        };
        property.published = published;
        property.receiver = receiver;
        property.accessors = accessors;
        Ok(Some(property))
    }

    /// A field not described by the class's own property metadata.
    fn build_field(
        &self,
        loaded: &LoadedClass,
        record: Option<&'a ClassVisibility>,
        field: &MemberInfo,
        context: &VisibilityContext,
        model: &Class,
    ) -> Result<Option<Property>, ExtractionError> {
        let is_static = field.access.contains(AccessFlags::STATIC);
        let companion = self.table.companion_of(&loaded.class.name);
        let mut modifiers = PropertyModifiers::empty();

        let declared = if is_static
            && record.and_then(|r| r.companion_name.as_deref()) == Some(field.name.as_str())
        {
            // the companion instance field follows the companion class
            let companion_class = companion.and_then(|c| self.classes.get(c.name.as_str()));
            match companion_class {
                Some(companion) => {
                    if !self.class_decision(&companion.class, 0).is_public() {
                        return Ok(None);
                    }
                    self.class_facts(&companion.class).declared
                }
                None => access_visibility(field.access),
            }
        } else {
            // static backing fields of companion properties live in the outer class
            let companion_property = companion
                .and_then(|c| {
                    c.find_member(&field.name, &field.descriptor)
                        .filter(|m| m.role == MemberRole::PropertyField)
                        .and_then(|m| m.property)
                        .and_then(|index| c.properties.get(index))
                });
            if let Some(info) = companion_property {
                modifiers = info.flags.property_modifiers();
            }
            declared_visibility(field.access, companion_property.map(|p| p.flags))
        };

        let facts = EntityFacts::declared(declared)
            .published(field.has_annotation(PUBLISHED_API_ANNOTATION));
        let decision = visibility::resolve(&facts, context);
        trace!(field = %field.name, ?decision, "field visibility");
        if !decision.is_public() {
            return Ok(None);
        }

        let ty = signature::field_type(&field.descriptor).map_err(|e| descriptor_error(loaded, e))?;
        let mut property = Property::new(format!("{}.{}", model.qualified_name, field.name), ty);
        property.visibility = declared;
        property.published = facts.published_api;
        property.modifiers = modifiers;
        if is_static {
            property.modifiers |= PropertyModifiers::STATIC;
        }
        property.mutability = if field.access.contains(AccessFlags::FINAL) {
            Mutability::Val
        } else {
            Mutability::Var
        };
        property.accessors = Accessors {
            field: true,
            ..Accessors::default()
        };
        Ok(Some(property))
    }

    fn build_method(
        &self,
        loaded: &LoadedClass,
        method: &MemberInfo,
        context: &VisibilityContext,
        model: &Class,
    ) -> Result<Option<Function>, ExtractionError> {
        let found = self
            .table
            .find_member(&loaded.class.name, &method.name, &method.descriptor)
            .map(|(_, member)| member);
        if found.is_some_and(|m| {
            !matches!(m.role, MemberRole::Function | MemberRole::Constructor)
        }) {
            return Ok(None);
        }

        let access = method.access;
        let facts = EntityFacts::declared(declared_visibility(access, found.map(|m| m.flags)))
            .published(method.has_annotation(PUBLISHED_API_ANNOTATION))
            .synthetic_accessor(
                method.name.starts_with(ACCESS_METHOD_PREFIX)
                    || method.name.ends_with(ANNOTATIONS_METHOD_SUFFIX),
            );
        let decision = visibility::resolve(&facts, context);
        trace!(method = %method.name, desc = %method.descriptor, ?decision, "method visibility");
        if !decision.is_public() {
            return Ok(None);
        }

        let ty = signature::method_type(&method.descriptor).map_err(|e| descriptor_error(loaded, e))?;
        let mut function = if method.name == CONSTRUCTOR_NAME {
            Function::constructor(&model.qualified_name)
        } else {
            let mut function = Function::new(
                format!("{}.{}", model.qualified_name, method.name),
                ty.return_type,
            );
            function.modality = match found {
                Some(member) => member.flags.modality(),
                None if access.contains(AccessFlags::ABSTRACT) => Modality::Abstract,
                None if access.intersects(AccessFlags::FINAL | AccessFlags::STATIC)
                    || model.modality == Modality::Final =>
                {
                    Modality::Final
                }
                None => Modality::Open,
            };
            if let Some(member) = found.filter(|m| m.role == MemberRole::Function) {
                function.modifiers = member.flags.function_modifiers();
            }
            function
        };
        function.visibility = facts.declared;
        function.published = facts.published_api;
        if access.contains(AccessFlags::STATIC) {
            function.modifiers |= FunctionModifiers::STATIC;
        }
        if access.contains(AccessFlags::SYNTHETIC) {
            function.modifiers |= FunctionModifiers::SYNTHETIC;
        }

        let count = ty.parameters.len();
        function.parameters = ty
            .parameters
            .into_iter()
            .enumerate()
            .map(|(index, ty)| {
                let name = method
                    .parameter_names
                    .get(index)
                    .cloned()
                    .flatten()
                    .map(SmolStr::from);
                let mut parameter = Parameter::new(name, ty);
                parameter.vararg = access.contains(AccessFlags::VARARGS) && index + 1 == count;
                parameter
            })
            .collect();
        Ok(Some(function))
    }
}

/// The JVM members backing one Kotlin property, as found in a class.
struct PropertyMembers<'c> {
    field: Option<&'c MemberInfo>,
    getter: Option<&'c MemberInfo>,
    setter: Option<&'c MemberInfo>,
    /// `…$annotations` holder
    holder: Option<&'c MemberInfo>,
}

impl<'c> PropertyMembers<'c> {
    /// Present members, getter first.
    fn iter(&self) -> impl Iterator<Item = &'c MemberInfo> {
        [self.getter, self.field, self.setter, self.holder]
            .into_iter()
            .flatten()
    }
}
