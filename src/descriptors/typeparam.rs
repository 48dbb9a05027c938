//! Type parameter descriptors.

use std::{
    fmt,
    sync::{Arc, Weak},
};

use crate::{
    deserialization::{types as type_deserializer, DeserializationContext},
    metadata::proto::TypeRef,
    module::Module,
    names::Name,
    storage::LazyValue,
    types::{SimpleType, Type, TypeCapabilities, TypeConstructor, Variance},
    Error, Result,
};

struct BoundsOrigin {
    ctx: Arc<DeserializationContext>,
    bounds: Vec<TypeRef>,
}

/// A declared type parameter.
///
/// Upper bounds are deserialized on first access, in the context of the declaration that
/// introduces the parameter, so a bound may mention the parameter itself (`T : Comparable<T>`).
/// A parameter without declared bounds is bounded by `kotlin.Any?`.
pub struct TypeParameterDescriptor {
    module: Weak<Module>,
    name: Name,
    index: usize,
    id: Option<u32>,
    variance: Variance,
    reified: bool,
    upper_bounds: LazyValue<Vec<Type>>,
    origin: Option<BoundsOrigin>,
}

impl TypeParameterDescriptor {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn deserialized(
        ctx: Arc<DeserializationContext>,
        index: usize,
        id: u32,
        name: Name,
        variance: Variance,
        reified: bool,
        bounds: Vec<TypeRef>,
    ) -> Arc<Self> {
        Arc::new(TypeParameterDescriptor {
            module: ctx.module_ref(),
            name,
            index,
            id: Some(id),
            variance,
            reified,
            upper_bounds: LazyValue::new("type parameter upper bounds"),
            origin: Some(BoundsOrigin { ctx, bounds }),
        })
    }

    pub(crate) fn with_default_bound(
        module: Weak<Module>,
        name: Name,
        index: usize,
        variance: Variance,
    ) -> Arc<Self> {
        Arc::new(TypeParameterDescriptor {
            module,
            name,
            index,
            id: None,
            variance,
            reified: false,
            upper_bounds: LazyValue::new("type parameter upper bounds"),
            origin: None,
        })
    }

    /// The parameter name.
    #[must_use]
    pub fn name(&self) -> &Name {
        &self.name
    }

    /// Position among the parameters of the declaring declaration.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Metadata id, `None` for synthesized parameters.
    #[must_use]
    pub fn id(&self) -> Option<u32> {
        self.id
    }

    /// Declared variance.
    #[must_use]
    pub fn variance(&self) -> Variance {
        self.variance
    }

    /// `reified T`
    #[must_use]
    pub fn is_reified(&self) -> bool {
        self.reified
    }

    /// The upper bounds, never empty.
    ///
    /// # Errors
    /// Returns [`Error::Malformed`] for corrupted bound messages and [`Error::ModuleReleased`]
    /// if the default bound is needed after the module was dropped.
    pub fn upper_bounds(&self) -> Result<&[Type]> {
        self.upper_bounds
            .get(|| {
                let mut bounds = Vec::new();
                if let Some(origin) = &self.origin {
                    for bound in &origin.bounds {
                        let proto = origin.ctx.type_table().resolve(bound)?;
                        bounds.push(type_deserializer::deserialize_type(&origin.ctx, proto)?);
                    }
                }
                if bounds.is_empty() {
                    let module = upgrade_module!(self.module);
                    bounds.push(module.builtins().default_bound()?);
                }
                Ok(bounds)
            })
            .map(Vec::as_slice)
    }

    /// The type `T` referring to this parameter.
    #[must_use]
    pub fn default_type(self: &Arc<Self>) -> Type {
        Type::Simple(SimpleType::resolved(
            TypeConstructor::TypeParameter(TypeParameterRef::new(self)),
            Vec::new(),
            false,
            TypeCapabilities::empty(),
        ))
    }
}

impl fmt::Debug for TypeParameterDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeParameterDescriptor")
            .field("name", &self.name)
            .field("index", &self.index)
            .field("variance", &self.variance)
            .field("reified", &self.reified)
            .finish_non_exhaustive()
    }
}

/// Weak handle to a [`TypeParameterDescriptor`].
#[derive(Clone)]
pub struct TypeParameterRef {
    name: Name,
    parameter: Weak<TypeParameterDescriptor>,
}

impl TypeParameterRef {
    /// Creates a handle to `parameter`.
    #[must_use]
    pub fn new(parameter: &Arc<TypeParameterDescriptor>) -> Self {
        TypeParameterRef {
            name: parameter.name.clone(),
            parameter: Arc::downgrade(parameter),
        }
    }

    /// The parameter name, available without upgrading.
    #[must_use]
    pub fn name(&self) -> &Name {
        &self.name
    }

    /// The parameter.
    ///
    /// # Errors
    /// Returns [`Error::ModuleReleased`] if the declaring descriptor is gone.
    pub fn upgrade(&self) -> Result<Arc<TypeParameterDescriptor>> {
        self.parameter.upgrade().ok_or(Error::ModuleReleased)
    }

    /// Returns `true` if both handles refer to the same parameter.
    #[must_use]
    pub fn ptr_eq(&self, other: &TypeParameterRef) -> bool {
        Weak::ptr_eq(&self.parameter, &other.parameter)
    }

    /// Returns `true` if this handle refers to `parameter`.
    #[must_use]
    pub fn points_to(&self, parameter: &Arc<TypeParameterDescriptor>) -> bool {
        std::ptr::eq(self.parameter.as_ptr(), Arc::as_ptr(parameter))
    }
}

impl fmt::Debug for TypeParameterRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeParameterRef({})", self.name)
    }
}
