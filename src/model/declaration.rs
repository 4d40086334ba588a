//! Declaration types: classes, functions and properties.

use bitflags::bitflags;
use smol_str::SmolStr;

// ============================================================================
// VISIBILITY / MODALITY / KIND
// ============================================================================

/// Declared visibility of an entity, as recorded by the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Internal,
    /// JVM default (package) access
    PackagePrivate,
    Private,
    /// Declared inside a function body
    Local,
}

impl Visibility {
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Protected => "protected",
            Self::Internal => "internal",
            Self::PackagePrivate => "package-private",
            Self::Private => "private",
            Self::Local => "local",
        }
    }

    /// Public or protected: reachable from outside the module.
    pub fn is_exposed(&self) -> bool {
        matches!(self, Self::Public | Self::Protected)
    }

    /// Higher is more restrictive.
    fn restriction(&self) -> u8 {
        match self {
            Self::Public => 0,
            Self::Protected => 1,
            Self::Internal => 2,
            Self::PackagePrivate => 3,
            Self::Private => 4,
            Self::Local => 5,
        }
    }

    /// The more restrictive of two visibilities.
    pub fn most_restrictive(self, other: Visibility) -> Visibility {
        if other.restriction() > self.restriction() {
            other
        } else {
            self
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Modality {
    #[default]
    Final,
    Open,
    Abstract,
    Sealed,
}

impl Modality {
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Final => "final",
            Self::Open => "open",
            Self::Abstract => "abstract",
            Self::Sealed => "sealed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ClassKind {
    #[default]
    Class,
    Interface,
    EnumClass,
    EnumEntry,
    AnnotationClass,
    Object,
    CompanionObject,
}

impl ClassKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::Interface => "interface",
            Self::EnumClass => "enum class",
            Self::EnumEntry => "enum entry",
            Self::AnnotationClass => "annotation class",
            Self::Object => "object",
            Self::CompanionObject => "companion object",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mutability {
    #[default]
    Val,
    Var,
}

impl Mutability {
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Val => "val",
            Self::Var => "var",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Variance {
    #[default]
    Invariant,
    In,
    Out,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FunctionKind {
    #[default]
    Function,
    Constructor,
}

bitflags! {
    /// Class-level modifiers beyond kind and modality.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ClassModifiers: u16 {
        const DATA = 1 << 0;
        const INNER = 1 << 1;
        const VALUE = 1 << 2;
        const FUN = 1 << 3;
        const EXPECT = 1 << 4;
        const EXTERNAL = 1 << 5;
        const STATIC = 1 << 6;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FunctionModifiers: u16 {
        const STATIC = 1 << 0;
        const OPERATOR = 1 << 1;
        const INFIX = 1 << 2;
        const INLINE = 1 << 3;
        const TAILREC = 1 << 4;
        const SUSPEND = 1 << 5;
        const EXTERNAL = 1 << 6;
        const EXPECT = 1 << 7;
        const SYNTHETIC = 1 << 8;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PropertyModifiers: u16 {
        const STATIC = 1 << 0;
        const CONST = 1 << 1;
        const LATEINIT = 1 << 2;
        const EXTERNAL = 1 << 3;
        const EXPECT = 1 << 4;
    }
}

// ============================================================================
// DECLARATIONS
// ============================================================================

/// Which accessors of a property passed the visibility filter.
///
/// `field` marks a backing field exposed directly (JVM only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Accessors {
    pub field: bool,
    pub getter: bool,
    pub setter: bool,
}

impl Accessors {
    pub fn any(&self) -> bool {
        self.field || self.getter || self.setter
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeParameter {
    pub name: SmolStr,
    pub variance: Variance,
    pub reified: bool,
    pub upper_bounds: Vec<String>,
}

/// A value parameter. JVM parameters have no name unless the class
/// file records one.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Parameter {
    pub name: Option<SmolStr>,
    pub ty: String,
    pub vararg: bool,
    pub has_default: bool,
    pub crossinline: bool,
    pub noinline: bool,
}

impl Parameter {
    pub fn new(name: Option<SmolStr>, ty: impl Into<String>) -> Self {
        Self {
            name,
            ty: ty.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Class {
    pub qualified_name: String,
    pub name: SmolStr,
    pub kind: ClassKind,
    pub modality: Modality,
    pub visibility: Visibility,
    pub modifiers: ClassModifiers,
    /// Carries the published-API escape marker
    pub published: bool,
    pub type_parameters: Vec<TypeParameter>,
    /// Declared supertypes, in declaration order
    pub supertypes: Vec<String>,
    pub members: Vec<Declaration>,
    /// Simple name of the companion among `members`
    pub companion: Option<SmolStr>,
    pub effectively_public: bool,
}

impl Class {
    pub fn new(qualified_name: impl Into<String>, kind: ClassKind) -> Self {
        let qualified_name = qualified_name.into();
        let name = simple_name(&qualified_name).into();
        Self {
            qualified_name,
            name,
            kind,
            modality: Modality::Final,
            visibility: Visibility::Public,
            modifiers: ClassModifiers::empty(),
            published: false,
            type_parameters: Vec::new(),
            supertypes: Vec::new(),
            members: Vec::new(),
            companion: None,
            effectively_public: true,
        }
    }

    /// Resolve the companion reference among nested members.
    pub fn companion_class(&self) -> Option<&Class> {
        let companion = self.companion.as_ref()?;
        self.members.iter().find_map(|m| match m {
            Declaration::Class(c) if &c.name == companion => Some(c),
            _ => None,
        })
    }

    pub fn is_companion(&self, nested: &Class) -> bool {
        self.companion.as_ref() == Some(&nested.name)
    }

    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.members.iter().filter_map(|m| match m {
            Declaration::Function(f) => Some(f),
            _ => None,
        })
    }

    pub fn properties(&self) -> impl Iterator<Item = &Property> {
        self.members.iter().filter_map(|m| match m {
            Declaration::Property(p) => Some(p),
            _ => None,
        })
    }

    pub fn nested_classes(&self) -> impl Iterator<Item = &Class> {
        self.members.iter().filter_map(|m| match m {
            Declaration::Class(c) => Some(c),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub name: SmolStr,
    pub qualified_name: String,
    pub kind: FunctionKind,
    pub visibility: Visibility,
    pub modality: Modality,
    pub modifiers: FunctionModifiers,
    pub published: bool,
    pub type_parameters: Vec<TypeParameter>,
    pub receiver: Option<String>,
    pub parameters: Vec<Parameter>,
    /// `None` for constructors
    pub return_type: Option<String>,
}

impl Function {
    pub fn new(qualified_name: impl Into<String>, return_type: impl Into<String>) -> Self {
        let qualified_name = qualified_name.into();
        Self {
            name: simple_name(&qualified_name).into(),
            qualified_name,
            kind: FunctionKind::Function,
            visibility: Visibility::Public,
            modality: Modality::Final,
            modifiers: FunctionModifiers::empty(),
            published: false,
            type_parameters: Vec::new(),
            receiver: None,
            parameters: Vec::new(),
            return_type: Some(return_type.into()),
        }
    }

    pub fn constructor(owner: &str) -> Self {
        Self {
            name: SmolStr::new_static("<init>"),
            qualified_name: format!("{owner}.<init>"),
            kind: FunctionKind::Constructor,
            visibility: Visibility::Public,
            modality: Modality::Final,
            modifiers: FunctionModifiers::empty(),
            published: false,
            type_parameters: Vec::new(),
            receiver: None,
            parameters: Vec::new(),
            return_type: None,
        }
    }

    pub fn is_constructor(&self) -> bool {
        self.kind == FunctionKind::Constructor
    }

    /// Parameter types joined by `,`: the overload discriminator.
    pub fn parameter_signature(&self) -> String {
        let mut signature = String::new();
        if let Some(receiver) = &self.receiver {
            signature.push_str(receiver);
            signature.push('.');
        }
        let types: Vec<&str> = self.parameters.iter().map(|p| p.ty.as_str()).collect();
        signature.push('(');
        signature.push_str(&types.join(","));
        signature.push(')');
        signature
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub name: SmolStr,
    pub qualified_name: String,
    pub visibility: Visibility,
    pub modality: Modality,
    pub modifiers: PropertyModifiers,
    pub published: bool,
    pub mutability: Mutability,
    pub type_parameters: Vec<TypeParameter>,
    pub ty: String,
    pub receiver: Option<String>,
    pub accessors: Accessors,
}

impl Property {
    pub fn new(qualified_name: impl Into<String>, ty: impl Into<String>) -> Self {
        let qualified_name = qualified_name.into();
        Self {
            name: simple_name(&qualified_name).into(),
            qualified_name,
            visibility: Visibility::Public,
            modality: Modality::Final,
            modifiers: PropertyModifiers::empty(),
            published: false,
            mutability: Mutability::Val,
            type_parameters: Vec::new(),
            ty: ty.into(),
            receiver: None,
            accessors: Accessors::default(),
        }
    }
}

/// Sort bucket of a declaration inside its container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DeclarationKind {
    Property,
    Constructor,
    Function,
    Class,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declaration {
    Class(Class),
    Function(Function),
    Property(Property),
}

impl Declaration {
    pub fn name(&self) -> &str {
        match self {
            Self::Class(c) => &c.name,
            Self::Function(f) => &f.name,
            Self::Property(p) => &p.name,
        }
    }

    pub fn qualified_name(&self) -> &str {
        match self {
            Self::Class(c) => &c.qualified_name,
            Self::Function(f) => &f.qualified_name,
            Self::Property(p) => &p.qualified_name,
        }
    }

    pub fn kind(&self) -> DeclarationKind {
        match self {
            Self::Class(_) => DeclarationKind::Class,
            Self::Function(f) if f.is_constructor() => DeclarationKind::Constructor,
            Self::Function(_) => DeclarationKind::Function,
            Self::Property(_) => DeclarationKind::Property,
        }
    }

    pub fn as_class(&self) -> Option<&Class> {
        match self {
            Self::Class(c) => Some(c),
            _ => None,
        }
    }

    /// This declaration plus everything nested in it.
    pub fn count(&self) -> usize {
        match self {
            Self::Class(c) => 1 + c.members.iter().map(Declaration::count).sum::<usize>(),
            _ => 1,
        }
    }

    pub fn find_class(&self, qualified_name: &str) -> Option<&Class> {
        let class = self.as_class()?;
        if class.qualified_name == qualified_name {
            return Some(class);
        }
        class
            .members
            .iter()
            .find_map(|m| m.find_class(qualified_name))
    }
}

/// Last segment of a dotted (or `$`-nested binary) name.
pub(crate) fn simple_name(qualified: &str) -> &str {
    qualified
        .rsplit(['.', '$'])
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or(qualified)
}
