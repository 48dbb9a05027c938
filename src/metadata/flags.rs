//! Compact flag words of the metadata format and their decoders.
//!
//! Each declaration message carries one `u32` flag word in which several small fixed-width
//! fields are packed. Enumerated fields (visibility, modality, kinds) are described by a
//! [`FlagField`] and decoded by total `from_flags` functions: every bit pattern maps to a
//! defined value, undefined codes fall back to the most restrictive option. Boolean fields are
//! exposed as `bitflags` sets extracted with `from_bits_truncate`.
//!
//! # Layout
//!
//! | Bits   | Class          | Constructor  | Function         | Property         | Value parameter  |
//! |--------|----------------|--------------|------------------|------------------|------------------|
//! | 0      | annotations    | annotations  | annotations      | annotations      | annotations      |
//! | 1..3   | visibility     | visibility   | visibility       | visibility       | default, crossinline, noinline |
//! | 4..5   | modality       | secondary(4) | modality         | modality         |                  |
//! | 6..8   | kind           |              | member kind(6..7)| member kind(6..7)|                  |
//! | 8..13  | inner(9), data(10) |          | modifiers        | var..lateinit    |                  |

use bitflags::bitflags;
use strum::{Display, EnumCount, EnumIter};

/// A fixed-width unsigned field inside a flag word.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlagField {
    /// Position of the lowest bit of the field
    pub offset: u32,
    /// Number of bits of the field
    pub width: u32,
}

impl FlagField {
    /// Creates a field descriptor.
    #[must_use]
    pub const fn new(offset: u32, width: u32) -> Self {
        FlagField { offset, width }
    }

    /// The mask selecting this field in a flag word.
    #[must_use]
    pub const fn mask(&self) -> u32 {
        ((1u32 << self.width) - 1) << self.offset
    }

    /// Extracts the field value.
    #[must_use]
    pub const fn get(&self, flags: u32) -> u32 {
        (flags & self.mask()) >> self.offset
    }

    /// Returns `flags` with the field replaced by `value` (truncated to the field width).
    #[must_use]
    pub const fn set(&self, flags: u32, value: u32) -> u32 {
        (flags & !self.mask()) | ((value << self.offset) & self.mask())
    }
}

/// Bit 0 of every flag word
pub const HAS_ANNOTATIONS: FlagField = FlagField::new(0, 1);
/// Visibility code, shared by all declarations
pub const VISIBILITY: FlagField = FlagField::new(1, 3);
/// Modality code of classes and callables
pub const MODALITY: FlagField = FlagField::new(4, 2);
/// Class kind code
pub const CLASS_KIND: FlagField = FlagField::new(6, 3);
/// Member kind code of functions and properties
pub const MEMBER_KIND: FlagField = FlagField::new(6, 2);

/// Declared visibility of a declaration.
///
/// Visibilities are only partially ordered: `protected` and `internal` are incomparable, see
/// [`Visibility::compare`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumIter, EnumCount)]
#[strum(serialize_all = "snake_case")]
pub enum Visibility {
    /// Visible inside the same module
    Internal,
    /// Visible inside the containing declaration
    Private,
    /// Visible to subclasses
    Protected,
    /// Visible everywhere
    Public,
    /// Visible only through `this`
    PrivateToThis,
    /// Visible inside the declaring block
    Local,
}

impl Visibility {
    /// Decodes the visibility field. Codes 6 and 7 are undefined and decode to `Private`.
    #[must_use]
    pub fn from_flags(flags: u32) -> Self {
        match VISIBILITY.get(flags) {
            0 => Visibility::Internal,
            2 => Visibility::Protected,
            3 => Visibility::Public,
            4 => Visibility::PrivateToThis,
            5 => Visibility::Local,
            _ => Visibility::Private,
        }
    }

    /// The field code of this visibility.
    #[must_use]
    pub fn code(self) -> u32 {
        match self {
            Visibility::Internal => 0,
            Visibility::Private => 1,
            Visibility::Protected => 2,
            Visibility::Public => 3,
            Visibility::PrivateToThis => 4,
            Visibility::Local => 5,
        }
    }

    fn rank(self) -> u8 {
        match self {
            Visibility::Local | Visibility::PrivateToThis => 0,
            Visibility::Private => 1,
            Visibility::Protected | Visibility::Internal => 2,
            Visibility::Public => 3,
        }
    }

    /// Compares two visibilities by how widely they expose a declaration.
    ///
    /// Returns `None` for the incomparable pair `protected`/`internal` (and for distinct
    /// visibilities of the lowest rank).
    #[must_use]
    pub fn compare(self, other: Visibility) -> Option<std::cmp::Ordering> {
        if self == other {
            return Some(std::cmp::Ordering::Equal);
        }
        let (lhs, rhs) = (self.rank(), other.rank());
        if lhs == rhs {
            return None;
        }
        Some(lhs.cmp(&rhs))
    }

    /// Returns `true` if a member with this visibility is inherited by subclasses.
    #[must_use]
    pub fn is_inherited(self) -> bool {
        !matches!(
            self,
            Visibility::Private | Visibility::PrivateToThis | Visibility::Local
        )
    }
}

/// Declared modality of a class or callable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumIter, EnumCount)]
#[strum(serialize_all = "snake_case")]
pub enum Modality {
    /// Can not be overridden or subclassed
    Final,
    /// May be overridden or subclassed
    Open,
    /// Must be overridden or subclassed
    Abstract,
    /// Subclasses are restricted to a known set
    Sealed,
}

impl Modality {
    /// Decodes the two-bit modality field; all four codes are defined.
    #[must_use]
    pub fn from_flags(flags: u32) -> Self {
        match MODALITY.get(flags) {
            0 => Modality::Final,
            1 => Modality::Open,
            2 => Modality::Abstract,
            _ => Modality::Sealed,
        }
    }

    /// The field code of this modality.
    #[must_use]
    pub fn code(self) -> u32 {
        match self {
            Modality::Final => 0,
            Modality::Open => 1,
            Modality::Abstract => 2,
            Modality::Sealed => 3,
        }
    }
}

/// Kind of a class declaration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumIter, EnumCount)]
#[strum(serialize_all = "snake_case")]
pub enum ClassKind {
    /// An ordinary class
    Class,
    /// An interface
    Interface,
    /// An enum class
    EnumClass,
    /// One entry of an enum class
    EnumEntry,
    /// An annotation class
    AnnotationClass,
    /// A singleton object
    Object,
    /// The companion object of a class
    CompanionObject,
}

impl ClassKind {
    /// Decodes the three-bit class kind field. Code 7 is undefined and decodes to `Class`.
    #[must_use]
    pub fn from_flags(flags: u32) -> Self {
        match CLASS_KIND.get(flags) {
            1 => ClassKind::Interface,
            2 => ClassKind::EnumClass,
            3 => ClassKind::EnumEntry,
            4 => ClassKind::AnnotationClass,
            5 => ClassKind::Object,
            6 => ClassKind::CompanionObject,
            _ => ClassKind::Class,
        }
    }

    /// The field code of this kind.
    #[must_use]
    pub fn code(self) -> u32 {
        match self {
            ClassKind::Class => 0,
            ClassKind::Interface => 1,
            ClassKind::EnumClass => 2,
            ClassKind::EnumEntry => 3,
            ClassKind::AnnotationClass => 4,
            ClassKind::Object => 5,
            ClassKind::CompanionObject => 6,
        }
    }

    /// Objects, companion objects and enum entries have exactly one instance.
    #[must_use]
    pub fn is_singleton(self) -> bool {
        matches!(
            self,
            ClassKind::Object | ClassKind::CompanionObject | ClassKind::EnumEntry
        )
    }
}

/// How a callable member came into existence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumIter, EnumCount)]
#[strum(serialize_all = "snake_case")]
pub enum MemberKind {
    /// Written in source
    Declaration,
    /// Inherited from a supertype and not re-declared
    FakeOverride,
    /// Generated for interface delegation
    Delegation,
    /// Generated by the compiler (enum `values`, data class `copy`, ...)
    Synthesized,
}

impl MemberKind {
    /// Decodes the two-bit member kind field; all four codes are defined.
    #[must_use]
    pub fn from_flags(flags: u32) -> Self {
        match MEMBER_KIND.get(flags) {
            0 => MemberKind::Declaration,
            1 => MemberKind::FakeOverride,
            2 => MemberKind::Delegation,
            _ => MemberKind::Synthesized,
        }
    }

    /// The field code of this kind.
    #[must_use]
    pub fn code(self) -> u32 {
        match self {
            MemberKind::Declaration => 0,
            MemberKind::FakeOverride => 1,
            MemberKind::Delegation => 2,
            MemberKind::Synthesized => 3,
        }
    }
}

/// Bitmask for boolean class attributes
pub const CLASS_ATTRIBUTES_MASK: u32 = 0x0000_0601;
/// Bitmask for the secondary-constructor bit
pub const CONSTRUCTOR_ATTRIBUTES_MASK: u32 = 0x0000_0011;
/// Bitmask for function modifiers
pub const FUNCTION_MODIFIERS_MASK: u32 = 0x0000_3F00;
/// Bitmask for property attributes
pub const PROPERTY_ATTRIBUTES_MASK: u32 = 0x0000_1F00;
/// Bitmask for value parameter attributes
pub const VALUE_PARAMETER_ATTRIBUTES_MASK: u32 = 0x0000_000F;

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    /// Boolean attributes of a class
    pub struct ClassAttributes: u32 {
        /// Class carries annotations
        const HAS_ANNOTATIONS = 0x0001;
        /// Inner class (captures the outer instance)
        const IS_INNER = 0x0200;
        /// Data class
        const IS_DATA = 0x0400;
    }
}

impl ClassAttributes {
    /// Extract class attributes from a raw flag word
    #[must_use]
    pub fn from_class_flags(flags: u32) -> Self {
        Self::from_bits_truncate(flags & CLASS_ATTRIBUTES_MASK)
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    /// Boolean attributes of a constructor
    pub struct ConstructorAttributes: u32 {
        /// Constructor carries annotations
        const HAS_ANNOTATIONS = 0x0001;
        /// Secondary constructor
        const IS_SECONDARY = 0x0010;
    }
}

impl ConstructorAttributes {
    /// Extract constructor attributes from a raw flag word
    #[must_use]
    pub fn from_constructor_flags(flags: u32) -> Self {
        Self::from_bits_truncate(flags & CONSTRUCTOR_ATTRIBUTES_MASK)
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    /// Modifiers of a function
    pub struct FunctionModifiers: u32 {
        /// `operator fun`
        const OPERATOR = 0x0100;
        /// `infix fun`
        const INFIX = 0x0200;
        /// `inline fun`
        const INLINE = 0x0400;
        /// `tailrec fun`
        const TAILREC = 0x0800;
        /// `external fun`
        const EXTERNAL = 0x1000;
        /// `suspend fun`
        const SUSPEND = 0x2000;
    }
}

impl FunctionModifiers {
    /// Extract function modifiers from a raw flag word
    #[must_use]
    pub fn from_function_flags(flags: u32) -> Self {
        Self::from_bits_truncate(flags & FUNCTION_MODIFIERS_MASK)
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    /// Attributes of a property
    pub struct PropertyAttributes: u32 {
        /// `var` rather than `val`
        const IS_VAR = 0x0100;
        /// Has a non-default getter
        const HAS_GETTER = 0x0200;
        /// Has a non-default setter
        const HAS_SETTER = 0x0400;
        /// `const val`
        const IS_CONST = 0x0800;
        /// `lateinit var`
        const IS_LATEINIT = 0x1000;
    }
}

impl PropertyAttributes {
    /// Extract property attributes from a raw flag word
    #[must_use]
    pub fn from_property_flags(flags: u32) -> Self {
        Self::from_bits_truncate(flags & PROPERTY_ATTRIBUTES_MASK)
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    /// Attributes of a value parameter
    pub struct ValueParameterAttributes: u32 {
        /// Parameter carries annotations
        const HAS_ANNOTATIONS = 0x0001;
        /// Parameter declares a default value
        const DECLARES_DEFAULT_VALUE = 0x0002;
        /// `crossinline` lambda parameter
        const IS_CROSSINLINE = 0x0004;
        /// `noinline` lambda parameter
        const IS_NOINLINE = 0x0008;
    }
}

impl ValueParameterAttributes {
    /// Extract value parameter attributes from a raw flag word
    #[must_use]
    pub fn from_parameter_flags(flags: u32) -> Self {
        Self::from_bits_truncate(flags & VALUE_PARAMETER_ATTRIBUTES_MASK)
    }
}

/// Builds a class flag word; used by built-in declarations and by tests.
#[must_use]
pub fn class_flags(visibility: Visibility, modality: Modality, kind: ClassKind) -> u32 {
    let flags = VISIBILITY.set(0, visibility.code());
    let flags = MODALITY.set(flags, modality.code());
    CLASS_KIND.set(flags, kind.code())
}

/// Builds a function or property flag word.
#[must_use]
pub fn member_flags(visibility: Visibility, modality: Modality, kind: MemberKind) -> u32 {
    let flags = VISIBILITY.set(0, visibility.code());
    let flags = MODALITY.set(flags, modality.code());
    MEMBER_KIND.set(flags, kind.code())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cmp::Ordering;
    use strum::IntoEnumIterator;

    #[test]
    fn test_decoding_is_total() {
        for raw in 0..=0xFFFFu32 {
            let _ = Visibility::from_flags(raw);
            let _ = Modality::from_flags(raw);
            let _ = ClassKind::from_flags(raw);
            let _ = MemberKind::from_flags(raw);
        }
        assert_eq!(Visibility::from_flags(VISIBILITY.set(0, 6)), Visibility::Private);
        assert_eq!(Visibility::from_flags(VISIBILITY.set(0, 7)), Visibility::Private);
        assert_eq!(ClassKind::from_flags(CLASS_KIND.set(0, 7)), ClassKind::Class);
    }

    #[test]
    fn test_codes_roundtrip() {
        for visibility in Visibility::iter() {
            assert_eq!(
                Visibility::from_flags(VISIBILITY.set(0, visibility.code())),
                visibility
            );
        }
        for kind in ClassKind::iter() {
            assert_eq!(ClassKind::from_flags(CLASS_KIND.set(0, kind.code())), kind);
        }
    }

    #[test]
    fn test_fields_do_not_overlap() {
        let flags = class_flags(Visibility::Public, Modality::Abstract, ClassKind::Interface)
            | ClassAttributes::IS_INNER.bits();

        assert_eq!(Visibility::from_flags(flags), Visibility::Public);
        assert_eq!(Modality::from_flags(flags), Modality::Abstract);
        assert_eq!(ClassKind::from_flags(flags), ClassKind::Interface);
        assert!(ClassAttributes::from_class_flags(flags).contains(ClassAttributes::IS_INNER));
        assert!(!ClassAttributes::from_class_flags(flags).contains(ClassAttributes::IS_DATA));
    }

    #[test]
    fn test_modifier_extraction() {
        let flags = member_flags(Visibility::Public, Modality::Final, MemberKind::Declaration)
            | FunctionModifiers::INLINE.bits()
            | FunctionModifiers::OPERATOR.bits();

        let modifiers = FunctionModifiers::from_function_flags(flags);
        assert!(modifiers.contains(FunctionModifiers::INLINE | FunctionModifiers::OPERATOR));
        assert!(!modifiers.contains(FunctionModifiers::TAILREC));
        assert_eq!(MemberKind::from_flags(flags), MemberKind::Declaration);
    }

    #[test]
    fn test_visibility_order() {
        assert_eq!(
            Visibility::Public.compare(Visibility::Private),
            Some(Ordering::Greater)
        );
        assert_eq!(
            Visibility::Protected.compare(Visibility::Public),
            Some(Ordering::Less)
        );
        assert_eq!(Visibility::Protected.compare(Visibility::Internal), None);
        assert!(!Visibility::Private.is_inherited());
        assert!(Visibility::Internal.is_inherited());
    }

    #[test]
    fn test_display() {
        assert_eq!(Visibility::PrivateToThis.to_string(), "private_to_this");
        assert_eq!(ClassKind::CompanionObject.to_string(), "companion_object");
    }
}
