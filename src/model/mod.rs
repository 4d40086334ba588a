//! Symbol model: the filtered public surface of one compiled module.
//!
//! Every extractor produces a [`Module`]; the renderer consumes it. The
//! model is pure data. Visibility filtering has already happened when a
//! `Module` exists, so nothing downstream re-filters.
//!
//! ```text
//! Module ─┬─ Package (unit, name)
//!         │    ├─ Declaration::Class ── members: Vec<Declaration>
//!         │    ├─ Declaration::Function
//!         │    └─ Declaration::Property
//!         └─ Package ...
//! ```
//!
//! Ownership is strictly hierarchical. The only cross reference is a
//! class's companion, stored as the companion's simple name and looked
//! up among the class's own nested members.

mod declaration;

pub use declaration::{
    Accessors, Class, ClassKind, ClassModifiers, Declaration, DeclarationKind, Function,
    FunctionKind, FunctionModifiers, Modality, Mutability, Parameter, Property, PropertyModifiers,
    TypeParameter, Variance, Visibility,
};

use crate::base::Platform;
use smol_str::SmolStr;

/// A named unit of compiled code for one platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    pub name: SmolStr,
    pub platform: Platform,
    pub packages: Vec<Package>,
    /// Units the extractor read, public declarations or not
    pub extracted_units: Vec<SmolStr>,
}

impl Module {
    pub fn new(name: impl Into<SmolStr>, platform: Platform) -> Self {
        Self {
            name: name.into(),
            platform,
            packages: Vec::new(),
            extracted_units: Vec::new(),
        }
    }

    /// An empty module: what a disabled or output-less target produces.
    pub fn empty(name: impl Into<SmolStr>, platform: Platform) -> Self {
        Self::new(name, platform)
    }

    pub fn is_empty(&self) -> bool {
        self.packages.iter().all(|p| p.declarations.is_empty())
    }

    /// Get the package for `(unit, name)`, creating it on first use.
    pub fn package_mut(&mut self, unit: &str, name: &str) -> &mut Package {
        let index = match self
            .packages
            .iter()
            .position(|p| p.unit == unit && p.name == name)
        {
            Some(index) => index,
            None => {
                self.packages.push(Package::new(unit, name));
                self.packages.len() - 1
            }
        };
        &mut self.packages[index]
    }

    /// Record that `unit` was read. It renders even when nothing in it is
    /// public.
    pub fn add_unit(&mut self, unit: &str) {
        if !self.extracted_units.iter().any(|u| u == unit) {
            self.extracted_units.push(unit.into());
        }
    }

    /// Distinct compiled units, sorted.
    pub fn units(&self) -> Vec<SmolStr> {
        let mut units: Vec<SmolStr> = self
            .packages
            .iter()
            .map(|p| p.unit.clone())
            .chain(self.extracted_units.iter().cloned())
            .collect();
        units.sort();
        units.dedup();
        units
    }

    /// Total number of declarations, nested members included.
    pub fn declaration_count(&self) -> usize {
        self.packages
            .iter()
            .flat_map(|p| p.declarations.iter())
            .map(Declaration::count)
            .sum()
    }

    /// Find a top-level or nested class by qualified name.
    pub fn find_class(&self, qualified_name: &str) -> Option<&Class> {
        self.packages
            .iter()
            .flat_map(|p| p.declarations.iter())
            .find_map(|d| d.find_class(qualified_name))
    }
}

/// A package inside one compiled unit.
///
/// `unit` names the output file the package renders into; `name` is the
/// dotted package name (empty for the root package).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    pub unit: SmolStr,
    pub name: SmolStr,
    pub declarations: Vec<Declaration>,
}

impl Package {
    pub fn new(unit: impl Into<SmolStr>, name: impl Into<SmolStr>) -> Self {
        Self {
            unit: unit.into(),
            name: name.into(),
            declarations: Vec::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.name.is_empty()
    }
}
