//! Flag words carried by descriptor messages.
//!
//! ```text
//! bit  0      has annotations
//! bits 1..=3  visibility
//! bits 4..=5  modality            (constructor: bit 4 = secondary)
//! bits 6..=8  class kind          (function/property: 6..=7 member kind)
//! bits 9..    per-message booleans
//! ```

use crate::model::{
    ClassKind, ClassModifiers, FunctionModifiers, Modality, PropertyModifiers, Visibility,
};

/// How a callable came to be in its container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Declaration,
    FakeOverride,
    Delegation,
    Synthesized,
}

/// A raw flag word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Flags(pub i32);

impl Flags {
    /// Public final class.
    pub const CLASS_DEFAULT: Flags = Flags(6);
    /// Public final declared member.
    pub const FUNCTION_DEFAULT: Flags = Flags(6);
    pub const CONSTRUCTOR_DEFAULT: Flags = Flags(6);
    /// Public final `val` with a default getter.
    pub const PROPERTY_DEFAULT: Flags = Flags(518);

    fn field(self, offset: u32, width: u32) -> i32 {
        (self.0 >> offset) & ((1 << width) - 1)
    }

    fn bit(self, offset: u32) -> bool {
        self.field(offset, 1) != 0
    }

    pub fn has_annotations(self) -> bool {
        self.bit(0)
    }

    pub fn visibility(self) -> Visibility {
        match self.field(1, 3) {
            0 => Visibility::Internal,
            1 | 4 => Visibility::Private,
            2 => Visibility::Protected,
            3 => Visibility::Public,
            _ => Visibility::Local,
        }
    }

    pub fn modality(self) -> Modality {
        match self.field(4, 2) {
            0 => Modality::Final,
            1 => Modality::Open,
            2 => Modality::Abstract,
            _ => Modality::Sealed,
        }
    }

    // ------------------------------------------------------------------
    // Classes
    // ------------------------------------------------------------------

    pub fn class_kind(self) -> ClassKind {
        match self.field(6, 3) {
            1 => ClassKind::Interface,
            2 => ClassKind::EnumClass,
            3 => ClassKind::EnumEntry,
            4 => ClassKind::AnnotationClass,
            5 => ClassKind::Object,
            6 => ClassKind::CompanionObject,
            _ => ClassKind::Class,
        }
    }

    pub fn class_modifiers(self) -> ClassModifiers {
        let mut modifiers = ClassModifiers::empty();
        modifiers.set(ClassModifiers::INNER, self.bit(9));
        modifiers.set(ClassModifiers::DATA, self.bit(10));
        modifiers.set(ClassModifiers::EXTERNAL, self.bit(11));
        modifiers.set(ClassModifiers::EXPECT, self.bit(12));
        modifiers.set(ClassModifiers::VALUE, self.bit(13));
        modifiers.set(ClassModifiers::FUN, self.bit(14));
        modifiers
    }

    // ------------------------------------------------------------------
    // Callables
    // ------------------------------------------------------------------

    pub fn member_kind(self) -> MemberKind {
        match self.field(6, 2) {
            0 => MemberKind::Declaration,
            1 => MemberKind::FakeOverride,
            2 => MemberKind::Delegation,
            _ => MemberKind::Synthesized,
        }
    }

    pub fn function_modifiers(self) -> FunctionModifiers {
        let mut modifiers = FunctionModifiers::empty();
        modifiers.set(FunctionModifiers::OPERATOR, self.bit(8));
        modifiers.set(FunctionModifiers::INFIX, self.bit(9));
        modifiers.set(FunctionModifiers::INLINE, self.bit(10));
        modifiers.set(FunctionModifiers::TAILREC, self.bit(11));
        modifiers.set(FunctionModifiers::EXTERNAL, self.bit(12));
        modifiers.set(FunctionModifiers::SUSPEND, self.bit(13));
        modifiers.set(FunctionModifiers::EXPECT, self.bit(14));
        modifiers
    }

    pub fn is_var(self) -> bool {
        self.bit(8)
    }

    pub fn has_getter(self) -> bool {
        self.bit(9)
    }

    pub fn has_setter(self) -> bool {
        self.bit(10)
    }

    pub fn is_const(self) -> bool {
        self.bit(11)
    }

    pub fn property_modifiers(self) -> PropertyModifiers {
        let mut modifiers = PropertyModifiers::empty();
        modifiers.set(PropertyModifiers::CONST, self.bit(11));
        modifiers.set(PropertyModifiers::LATEINIT, self.bit(12));
        modifiers.set(PropertyModifiers::EXTERNAL, self.bit(14));
        modifiers.set(PropertyModifiers::EXPECT, self.bit(16));
        modifiers
    }

    pub fn is_delegated(self) -> bool {
        self.bit(15)
    }

    /// Accessor flags implied when the message omits them: the
    /// property's own annotations, visibility and modality bits.
    pub fn default_accessor(property: Flags) -> Flags {
        Flags(property.0 & 0b11_1111)
    }

    pub fn is_not_default_accessor(self) -> bool {
        self.bit(6)
    }

    pub fn is_secondary_constructor(self) -> bool {
        self.bit(4)
    }

    // ------------------------------------------------------------------
    // Value parameters
    // ------------------------------------------------------------------

    pub fn declares_default_value(self) -> bool {
        self.bit(1)
    }

    pub fn is_crossinline(self) -> bool {
        self.bit(2)
    }

    pub fn is_noinline(self) -> bool {
        self.bit(3)
    }
}

/// Assemble a flag word; the inverse of the accessors above.
///
/// Used by fixture builders and by tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlagsBuilder(i32);

impl FlagsBuilder {
    pub fn new() -> Self {
        Self(0)
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        let code = match visibility {
            Visibility::Internal | Visibility::PackagePrivate => 0,
            Visibility::Private => 1,
            Visibility::Protected => 2,
            Visibility::Public => 3,
            Visibility::Local => 5,
        };
        self.0 = (self.0 & !(0b111 << 1)) | (code << 1);
        self
    }

    pub fn modality(mut self, modality: Modality) -> Self {
        let code = match modality {
            Modality::Final => 0,
            Modality::Open => 1,
            Modality::Abstract => 2,
            Modality::Sealed => 3,
        };
        self.0 = (self.0 & !(0b11 << 4)) | (code << 4);
        self
    }

    pub fn class_kind(mut self, kind: ClassKind) -> Self {
        let code = match kind {
            ClassKind::Class => 0,
            ClassKind::Interface => 1,
            ClassKind::EnumClass => 2,
            ClassKind::EnumEntry => 3,
            ClassKind::AnnotationClass => 4,
            ClassKind::Object => 5,
            ClassKind::CompanionObject => 6,
        };
        self.0 = (self.0 & !(0b111 << 6)) | (code << 6);
        self
    }

    pub fn member_kind(mut self, kind: MemberKind) -> Self {
        let code = match kind {
            MemberKind::Declaration => 0,
            MemberKind::FakeOverride => 1,
            MemberKind::Delegation => 2,
            MemberKind::Synthesized => 3,
        };
        self.0 = (self.0 & !(0b11 << 6)) | (code << 6);
        self
    }

    /// Set an arbitrary boolean bit.
    pub fn bit(mut self, offset: u32) -> Self {
        self.0 |= 1 << offset;
        self
    }

    pub fn build(self) -> Flags {
        Flags(self.0)
    }
}
