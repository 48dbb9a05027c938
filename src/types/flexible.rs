//! Flexible (platform) types.
//!
//! A flexible type is a pair of bounds, e.g. `(String..String?)` for a platform string whose
//! nullability is unknown. How such pairs are modelled depends on the consumer, so the
//! deserializer builds them through the [`FlexibleTypeFactory`] the module was configured with.

use std::{fmt, sync::Arc};

use crate::{
    types::{SimpleType, Type},
    Error, Result,
};

/// A lower/upper bound pair.
pub struct FlexibleType {
    lower: Arc<SimpleType>,
    upper: Arc<SimpleType>,
    id: Arc<str>,
}

impl FlexibleType {
    /// Creates a flexible type.
    ///
    /// # Arguments
    ///
    /// * `lower` - The lower bound
    /// * `upper` - The upper bound
    /// * `id` - Identifier of the flexible-type flavour, as recorded in the metadata
    #[must_use]
    pub fn new(lower: Arc<SimpleType>, upper: Arc<SimpleType>, id: &str) -> Self {
        FlexibleType {
            lower,
            upper,
            id: Arc::from(id),
        }
    }

    /// The lower bound.
    #[must_use]
    pub fn lower(&self) -> &Arc<SimpleType> {
        &self.lower
    }

    /// The upper bound.
    #[must_use]
    pub fn upper(&self) -> &Arc<SimpleType> {
        &self.upper
    }

    /// Identifier of the flexible-type flavour.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Debug for FlexibleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlexibleType")
            .field("id", &self.id)
            .field("lower", &self.lower)
            .field("upper", &self.upper)
            .finish()
    }
}

/// Builds flexible types for the deserializer.
pub trait FlexibleTypeFactory: Send + Sync {
    /// Creates the type for a flexible pair.
    ///
    /// # Arguments
    ///
    /// * `id` - Flavour identifier from the metadata
    /// * `lower` - The lower bound
    /// * `upper` - The upper bound
    ///
    /// # Errors
    /// Implementations may refuse flexible types with [`Error::FlexibleTypesRejected`].
    fn create(&self, id: &str, lower: Arc<SimpleType>, upper: Arc<SimpleType>) -> Result<Type>;
}

/// Creates a [`Type::Flexible`] for every pair.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultFlexibleTypeFactory;

impl FlexibleTypeFactory for DefaultFlexibleTypeFactory {
    fn create(&self, id: &str, lower: Arc<SimpleType>, upper: Arc<SimpleType>) -> Result<Type> {
        Ok(Type::Flexible(Arc::new(FlexibleType::new(lower, upper, id))))
    }
}

/// Refuses every flexible type, for metadata that must not contain platform types.
#[derive(Debug, Default, Clone, Copy)]
pub struct RejectFlexibleTypes;

impl FlexibleTypeFactory for RejectFlexibleTypes {
    fn create(&self, id: &str, _lower: Arc<SimpleType>, _upper: Arc<SimpleType>) -> Result<Type> {
        Err(Error::FlexibleTypesRejected(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::module_from_blobs;

    #[test]
    fn factories() {
        let t = module_from_blobs(&[]);
        let string = t.module.builtins().string_type().unwrap();
        let lower = Arc::clone(string.lower_bound());
        let upper = lower.with_nullability(true).unwrap();

        let flexible = DefaultFlexibleTypeFactory
            .create("java", Arc::clone(&lower), Arc::clone(&upper))
            .unwrap();
        assert!(flexible.is_flexible());
        assert!(!flexible.is_nullable());
        assert_eq!(flexible.render().unwrap(), "(kotlin/String..kotlin/String?)");
        assert!(Arc::ptr_eq(flexible.upper_bound(), &upper));

        let rejected = RejectFlexibleTypes.create("java", lower, upper);
        assert!(matches!(rejected, Err(Error::FlexibleTypesRejected(id)) if id == "java"));
    }

    #[test]
    fn nullability_applies_to_both_bounds() {
        let t = module_from_blobs(&[]);
        let any = t.module.builtins().any_type().unwrap();
        let lower = Arc::clone(any.lower_bound());
        let flexible = Type::Flexible(Arc::new(FlexibleType::new(
            Arc::clone(&lower),
            lower.with_nullability(true).unwrap(),
            "raw",
        )));

        let nullable = flexible.with_nullability(true).unwrap();
        assert!(nullable.is_nullable());
        assert_eq!(nullable.render().unwrap(), "(kotlin/Any?..kotlin/Any?)");
        match nullable {
            Type::Flexible(inner) => assert_eq!(inner.id(), "raw"),
            Type::Simple(_) => panic!("nullability must keep the type flexible"),
        }
    }
}
