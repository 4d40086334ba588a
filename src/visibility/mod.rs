//! Visibility resolver: decides what counts as public API.
//!
//! The resolver is a pure predicate over facts the extractors collect.
//! It knows nothing about class files or descriptors; each extractor
//! translates its own markers (access flags, metadata flags, annotations,
//! synthetic names) into an [`EntityFacts`] and asks once per entity.
//!
//! Rules, first match wins:
//!
//! 1. declared non-public (private, internal, package-private, local, or
//!    protected inside a container that cannot be subclassed) → hidden,
//!    unless rule 2 applies
//! 2. carries the published-API marker → public
//! 3. locally scoped class (defined inside a function body) → hidden
//! 4. synthetic `when` mappings holder → hidden
//! 5. synthetic default-impls holder → hidden
//! 6. otherwise public iff declared public or protected
//!
//! Members are only considered when their container is itself
//! effectively public. Synthetic bridge accessors (`access$…`,
//! `…$annotations`) never are.

use crate::model::{Modality, Visibility};

/// Everything the resolver needs to know about one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EntityFacts {
    pub declared: Visibility,
    pub published_api: bool,
    pub local_scope: bool,
    pub when_mappings: bool,
    pub default_impls: bool,
    pub synthetic_accessor: bool,
}

impl EntityFacts {
    pub fn declared(visibility: Visibility) -> Self {
        Self {
            declared: visibility,
            ..Default::default()
        }
    }

    pub fn published(mut self, published: bool) -> Self {
        self.published_api = published;
        self
    }

    pub fn local(mut self, local: bool) -> Self {
        self.local_scope = local;
        self
    }

    pub fn when_mappings(mut self, when_mappings: bool) -> Self {
        self.when_mappings = when_mappings;
        self
    }

    pub fn default_impls(mut self, default_impls: bool) -> Self {
        self.default_impls = default_impls;
        self
    }

    pub fn synthetic_accessor(mut self, synthetic_accessor: bool) -> Self {
        self.synthetic_accessor = synthetic_accessor;
        self
    }
}

/// Where the entity lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibilityContext {
    /// Every enclosing class is effectively public
    pub container_public: bool,
    /// The direct container can be subclassed outside the module,
    /// which is what makes protected members reachable
    pub container_subclassable: bool,
}

impl VisibilityContext {
    /// Context for package-level declarations.
    pub fn top_level() -> Self {
        Self {
            container_public: true,
            container_subclassable: true,
        }
    }

    /// Context for a member of a class with the given effective
    /// publicity and modality.
    pub fn member_of(container_public: bool, container_modality: Modality) -> Self {
        Self {
            container_public,
            container_subclassable: container_modality != Modality::Final,
        }
    }
}

/// Why an entity was left out of the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HiddenReason {
    ContainerHidden,
    DeclaredNonPublic,
    LocalScope,
    WhenMappings,
    DefaultImpls,
    SyntheticAccessor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Public,
    Hidden(HiddenReason),
}

impl Decision {
    pub fn is_public(&self) -> bool {
        matches!(self, Self::Public)
    }
}

/// Apply the rules and report which one decided.
pub fn resolve(entity: &EntityFacts, context: &VisibilityContext) -> Decision {
    if !context.container_public {
        return Decision::Hidden(HiddenReason::ContainerHidden);
    }
    if entity.synthetic_accessor {
        return Decision::Hidden(HiddenReason::SyntheticAccessor);
    }

    let exposed = match entity.declared {
        Visibility::Public => true,
        Visibility::Protected => context.container_subclassable,
        _ => false,
    };

    if !exposed {
        return if entity.published_api {
            Decision::Public
        } else {
            Decision::Hidden(HiddenReason::DeclaredNonPublic)
        };
    }
    if entity.published_api {
        return Decision::Public;
    }
    if entity.local_scope {
        return Decision::Hidden(HiddenReason::LocalScope);
    }
    if entity.when_mappings {
        return Decision::Hidden(HiddenReason::WhenMappings);
    }
    if entity.default_impls {
        return Decision::Hidden(HiddenReason::DefaultImpls);
    }
    Decision::Public
}

/// `true` when the entity belongs to the public surface.
pub fn is_public(entity: &EntityFacts, context: &VisibilityContext) -> bool {
    resolve(entity, context).is_public()
}

/// Effective visibility of a nested entity: the most restrictive of its
/// own visibility and every enclosing one.
pub fn effective_visibility(chain: impl IntoIterator<Item = Visibility>) -> Visibility {
    chain
        .into_iter()
        .fold(Visibility::Public, Visibility::most_restrictive)
}
