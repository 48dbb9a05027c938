//! Resolved type representation.
//!
//! A [`Type`] is either a [`SimpleType`] (a constructor plus arguments and a nullability flag)
//! or a [`FlexibleType`] (a lower/upper bound pair for platform types). Types produced by the
//! deserializer are lazy: they keep the message they were decoded from together with its
//! [`DeserializationContext`] and only resolve their constructor and arguments when first
//! asked. Resolution is memoized per type, so every later access is a plain read.
//!
//! Constructors never own what they point at. A class constructor is a [`ClassRef`] and a type
//! parameter constructor a [`TypeParameterRef`], both weak, so a class whose members mention
//! the class itself does not keep itself alive.
//!
//! # Key Components
//!
//! - [`Type`] / [`SimpleType`] / [`FlexibleType`] - The type forms
//! - [`TypeConstructor`] - What a type refers to
//! - [`TypeProjection`] / [`Variance`] - Arguments
//! - [`TypeCapabilities`] - Tags that do not change the structure (raw types)
//! - [`flexible`] - The pluggable flexible-type factory
//! - [`substitution`] - Supertype argument substitution for inherited members
//! - [`erasure`] - Erased member signatures used by override matching
//!
//! [`DeserializationContext`]: crate::deserialization::DeserializationContext

use std::{fmt, sync::Arc};

use bitflags::bitflags;

use crate::{
    descriptors::{ClassRc, ClassRef, TypeParameterRef},
    deserialization::{types as type_deserializer, DeserializationContext},
    metadata::proto::TypeProto,
    names::ClassId,
    storage::LazyValue,
    Result,
};

pub mod erasure;
pub mod flexible;
pub mod substitution;

pub use erasure::SignatureKey;
pub use flexible::{DefaultFlexibleTypeFactory, FlexibleType, FlexibleTypeFactory, RejectFlexibleTypes};
pub use substitution::TypeSubstitutor;

/// Nesting limit for eager walks over type arguments. Lazily resolved types may form cycles
/// through a corrupted type table; only walks that materialize the whole tree are bounded.
pub(crate) const MAX_TYPE_NESTING: usize = 128;

bitflags! {
    #[derive(PartialEq, Eq, Debug, Clone, Copy, Hash)]
    /// Capabilities attached to a type without changing its structure
    pub struct TypeCapabilities: u8 {
        /// Raw (erased) use of a generic class
        const RAW = 0x01;
    }
}

/// Declared or use-site variance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
pub enum Variance {
    /// `in T`
    #[strum(serialize = "in")]
    In,
    /// `out T`
    #[strum(serialize = "out")]
    Out,
    /// `T`
    #[strum(serialize = "")]
    Invariant,
}

/// What a type refers to.
#[derive(Clone, Debug)]
pub enum TypeConstructor {
    /// A class, possibly a not-found placeholder
    Class(ClassRef),
    /// A type parameter of an enclosing declaration
    TypeParameter(TypeParameterRef),
}

impl TypeConstructor {
    /// The class reference, if this constructor denotes a class.
    #[must_use]
    pub fn as_class(&self) -> Option<&ClassRef> {
        match self {
            TypeConstructor::Class(class) => Some(class),
            TypeConstructor::TypeParameter(_) => None,
        }
    }

    /// The type parameter reference, if this constructor denotes a type parameter.
    #[must_use]
    pub fn as_type_parameter(&self) -> Option<&TypeParameterRef> {
        match self {
            TypeConstructor::TypeParameter(parameter) => Some(parameter),
            TypeConstructor::Class(_) => None,
        }
    }
}

/// One type argument.
#[derive(Clone, Debug)]
pub enum TypeProjection {
    /// `*`
    Star,
    /// A projected type
    Type {
        /// Use-site variance
        variance: Variance,
        /// The argument
        ty: Type,
    },
}

impl TypeProjection {
    /// An invariant projection of `ty`.
    #[must_use]
    pub fn invariant(ty: Type) -> Self {
        TypeProjection::Type {
            variance: Variance::Invariant,
            ty,
        }
    }

    /// The projected type, `None` for a star projection.
    #[must_use]
    pub fn ty(&self) -> Option<&Type> {
        match self {
            TypeProjection::Star => None,
            TypeProjection::Type { ty, .. } => Some(ty),
        }
    }
}

pub(crate) struct TypeOrigin {
    pub(crate) ctx: Arc<DeserializationContext>,
    pub(crate) proto: Arc<TypeProto>,
}

/// A type with a single constructor.
pub struct SimpleType {
    constructor: LazyValue<TypeConstructor>,
    arguments: LazyValue<Vec<TypeProjection>>,
    nullable: bool,
    capabilities: TypeCapabilities,
    origin: Option<TypeOrigin>,
}

impl SimpleType {
    /// A type resolved on first access from `proto`, interpreted in `ctx`.
    pub(crate) fn lazy(ctx: Arc<DeserializationContext>, proto: Arc<TypeProto>) -> Arc<Self> {
        let mut capabilities = TypeCapabilities::empty();
        if proto.raw {
            capabilities |= TypeCapabilities::RAW;
        }
        Arc::new(SimpleType {
            constructor: LazyValue::new("type constructor"),
            arguments: LazyValue::new("type arguments"),
            nullable: proto.nullable,
            capabilities,
            origin: Some(TypeOrigin { ctx, proto }),
        })
    }

    /// A type whose parts are already known.
    #[must_use]
    pub fn resolved(
        constructor: TypeConstructor,
        arguments: Vec<TypeProjection>,
        nullable: bool,
        capabilities: TypeCapabilities,
    ) -> Arc<Self> {
        Arc::new(SimpleType {
            constructor: LazyValue::with_value("type constructor", constructor),
            arguments: LazyValue::with_value("type arguments", arguments),
            nullable,
            capabilities,
            origin: None,
        })
    }

    /// The type constructor, resolving it on first access.
    ///
    /// A class that can not be located resolves to a not-found placeholder; this never fails
    /// for a missing class.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for corrupted metadata (bad name index, unknown type
    /// parameter) and [`crate::Error::LocalClassRequested`] for an unresolvable local class.
    pub fn constructor(&self) -> Result<&TypeConstructor> {
        self.constructor.get(|| match &self.origin {
            Some(origin) => type_deserializer::resolve_constructor(&origin.ctx, &origin.proto),
            None => Err(malformed_error!("Resolved type without a constructor")),
        })
    }

    /// The type arguments, outer class arguments first.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for corrupted argument messages.
    pub fn arguments(&self) -> Result<&[TypeProjection]> {
        self.arguments
            .get(|| match &self.origin {
                Some(origin) => type_deserializer::resolve_arguments(&origin.ctx, &origin.proto),
                None => Ok(Vec::new()),
            })
            .map(Vec::as_slice)
    }

    /// `T?`
    #[must_use]
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Capabilities of the type.
    #[must_use]
    pub fn capabilities(&self) -> TypeCapabilities {
        self.capabilities
    }

    /// Returns `true` once the constructor has been resolved.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.constructor.is_computed()
    }

    /// The same type with a different nullability.
    ///
    /// # Errors
    /// Propagates resolution errors of the constructor or arguments.
    pub fn with_nullability(self: &Arc<Self>, nullable: bool) -> Result<Arc<SimpleType>> {
        if self.nullable == nullable {
            return Ok(Arc::clone(self));
        }
        Ok(SimpleType::resolved(
            self.constructor()?.clone(),
            self.arguments()?.to_vec(),
            nullable,
            self.capabilities,
        ))
    }

    /// Renders the type, resolving it as needed.
    ///
    /// # Errors
    /// Propagates resolution errors.
    pub fn render(&self) -> Result<String> {
        self.render_at(0)
    }

    fn render_at(&self, depth: usize) -> Result<String> {
        if depth > MAX_TYPE_NESTING {
            return Err(malformed_error!(
                "Type nesting exceeds {} levels",
                MAX_TYPE_NESTING
            ));
        }

        let mut text = match self.constructor()? {
            TypeConstructor::Class(class) => class.class_id().to_string(),
            TypeConstructor::TypeParameter(parameter) => parameter.name().to_string(),
        };

        let arguments = self.arguments()?;
        if !arguments.is_empty() {
            let mut rendered = Vec::with_capacity(arguments.len());
            for argument in arguments {
                rendered.push(match argument {
                    TypeProjection::Star => "*".to_string(),
                    TypeProjection::Type {
                        variance: Variance::Invariant,
                        ty,
                    } => ty.render_at(depth + 1)?,
                    TypeProjection::Type { variance, ty } => {
                        format!("{variance} {}", ty.render_at(depth + 1)?)
                    }
                });
            }
            text.push('<');
            text.push_str(&rendered.join(", "));
            text.push('>');
        }

        if self.nullable {
            text.push('?');
        }
        Ok(text)
    }
}

impl fmt::Debug for SimpleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimpleType")
            .field("constructor", &self.constructor.peek())
            .field("nullable", &self.nullable)
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

/// A type use.
#[derive(Clone, Debug)]
pub enum Type {
    /// A plain type
    Simple(Arc<SimpleType>),
    /// A platform type with lower and upper bound
    Flexible(Arc<FlexibleType>),
}

impl Type {
    /// The bound used for structural queries: the type itself, or the lower bound of a
    /// flexible type.
    #[must_use]
    pub fn lower_bound(&self) -> &Arc<SimpleType> {
        match self {
            Type::Simple(simple) => simple,
            Type::Flexible(flexible) => flexible.lower(),
        }
    }

    /// The type itself, or the upper bound of a flexible type.
    #[must_use]
    pub fn upper_bound(&self) -> &Arc<SimpleType> {
        match self {
            Type::Simple(simple) => simple,
            Type::Flexible(flexible) => flexible.upper(),
        }
    }

    /// Returns `true` for flexible types.
    #[must_use]
    pub fn is_flexible(&self) -> bool {
        matches!(self, Type::Flexible(_))
    }

    /// `T?`; a flexible type reports the nullability of its lower bound.
    #[must_use]
    pub fn is_nullable(&self) -> bool {
        self.lower_bound().is_nullable()
    }

    /// Returns `true` for raw types.
    #[must_use]
    pub fn is_raw(&self) -> bool {
        self.lower_bound()
            .capabilities()
            .contains(TypeCapabilities::RAW)
    }

    /// The type constructor.
    ///
    /// # Errors
    /// See [`SimpleType::constructor`].
    pub fn constructor(&self) -> Result<&TypeConstructor> {
        self.lower_bound().constructor()
    }

    /// The type arguments.
    ///
    /// # Errors
    /// See [`SimpleType::arguments`].
    pub fn arguments(&self) -> Result<&[TypeProjection]> {
        self.lower_bound().arguments()
    }

    /// The class this type refers to, `None` for a type parameter type.
    ///
    /// # Errors
    /// Propagates resolution errors and [`crate::Error::ModuleReleased`].
    pub fn class_descriptor(&self) -> Result<Option<ClassRc>> {
        match self.constructor()? {
            TypeConstructor::Class(class) => Ok(Some(class.upgrade()?)),
            TypeConstructor::TypeParameter(_) => Ok(None),
        }
    }

    /// The id of the class this type refers to.
    ///
    /// # Errors
    /// Propagates resolution errors.
    pub fn class_id(&self) -> Result<Option<ClassId>> {
        Ok(self
            .constructor()?
            .as_class()
            .map(|class| class.class_id().clone()))
    }

    /// Returns `true` if the type refers to a not-found placeholder.
    ///
    /// # Errors
    /// Propagates resolution errors.
    pub fn is_not_found(&self) -> Result<bool> {
        match self.class_descriptor()? {
            Some(class) => Ok(class.is_not_found()),
            None => Ok(false),
        }
    }

    /// The same type with a different nullability.
    ///
    /// # Errors
    /// Propagates resolution errors.
    pub fn with_nullability(&self, nullable: bool) -> Result<Type> {
        match self {
            Type::Simple(simple) => Ok(Type::Simple(simple.with_nullability(nullable)?)),
            Type::Flexible(flexible) => Ok(Type::Flexible(Arc::new(FlexibleType::new(
                flexible.lower().with_nullability(nullable)?,
                flexible.upper().with_nullability(nullable)?,
                flexible.id(),
            )))),
        }
    }

    /// Renders the type, e.g. `kotlin/Array<out a/E>?` or `(a/J..a/J?)`.
    ///
    /// # Errors
    /// Propagates resolution errors.
    pub fn render(&self) -> Result<String> {
        self.render_at(0)
    }

    fn render_at(&self, depth: usize) -> Result<String> {
        match self {
            Type::Simple(simple) => simple.render_at(depth),
            Type::Flexible(flexible) => Ok(format!(
                "({}..{})",
                flexible.lower().render_at(depth)?,
                flexible.upper().render_at(depth)?
            )),
        }
    }

    /// Returns `true` if both values are the same type object.
    #[must_use]
    pub fn ptr_eq(&self, other: &Type) -> bool {
        match (self, other) {
            (Type::Simple(a), Type::Simple(b)) => Arc::ptr_eq(a, b),
            (Type::Flexible(a), Type::Flexible(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<Arc<SimpleType>> for Type {
    fn from(simple: Arc<SimpleType>) -> Self {
        Type::Simple(simple)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variance_display() {
        assert_eq!(Variance::In.to_string(), "in");
        assert_eq!(Variance::Out.to_string(), "out");
        assert_eq!(Variance::Invariant.to_string(), "");
    }

    #[test]
    fn test_resolved_type_without_constructor_is_malformed() {
        let proto_less = Arc::new(SimpleType {
            constructor: LazyValue::new("type constructor"),
            arguments: LazyValue::new("type arguments"),
            nullable: true,
            capabilities: TypeCapabilities::RAW,
            origin: None,
        });
        let ty = Type::from(proto_less);

        assert!(ty.is_nullable());
        assert!(ty.is_raw());
        assert!(!ty.is_flexible());
        assert!(ty.arguments().unwrap().is_empty());
        assert!(matches!(
            ty.constructor(),
            Err(crate::Error::Malformed { .. })
        ));
    }
}
