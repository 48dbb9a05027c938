//! Supertypes injected on top of the ones recorded in metadata.

use std::collections::HashSet;

use crate::{
    descriptors::ClassRef,
    module::Module,
    names::ClassId,
    types::{SimpleType, Type, TypeCapabilities, TypeConstructor},
    Result,
};

/// Supplies extra supertypes for deserialized classes.
///
/// The returned types are appended after the declared supertypes. Implementations run while
/// the class' supertypes are being computed, so they must not ask for the supertypes of
/// `class_id` itself.
pub trait AdditionalSupertypes: Send + Sync {
    /// Extra supertypes of `class_id`.
    ///
    /// # Errors
    /// Propagates resolution errors of the injected types.
    fn for_class(&self, module: &Module, class_id: &ClassId) -> Result<Vec<Type>>;
}

/// Injects nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAdditionalSupertypes;

impl AdditionalSupertypes for NoAdditionalSupertypes {
    fn for_class(&self, _module: &Module, _class_id: &ClassId) -> Result<Vec<Type>> {
        Ok(Vec::new())
    }
}

/// Makes a set of classes implement a marker interface, e.g. letting built-in classes
/// retroactively implement a platform's serialization marker.
///
/// # Examples
///
/// ```rust
/// use metascope::deserialization::SerializableMarker;
/// use metascope::names::ClassId;
///
/// let marker = SerializableMarker::new(ClassId::top_level("java.io", "Serializable"))
///     .with_targets([ClassId::top_level("kotlin", "String")]);
/// assert!(marker.applies_to(&ClassId::top_level("kotlin", "String")));
/// ```
#[derive(Debug, Clone)]
pub struct SerializableMarker {
    marker: ClassId,
    targets: HashSet<ClassId>,
}

impl SerializableMarker {
    /// Creates an injector for `marker` with no targets.
    #[must_use]
    pub fn new(marker: ClassId) -> Self {
        SerializableMarker {
            marker,
            targets: HashSet::new(),
        }
    }

    /// Adds classes that receive the marker.
    #[must_use]
    pub fn with_targets(mut self, targets: impl IntoIterator<Item = ClassId>) -> Self {
        self.targets.extend(targets);
        self
    }

    /// Returns `true` if `class_id` receives the marker.
    #[must_use]
    pub fn applies_to(&self, class_id: &ClassId) -> bool {
        self.targets.contains(class_id)
    }

    /// The marker interface.
    #[must_use]
    pub fn marker(&self) -> &ClassId {
        &self.marker
    }
}

impl AdditionalSupertypes for SerializableMarker {
    fn for_class(&self, module: &Module, class_id: &ClassId) -> Result<Vec<Type>> {
        if !self.applies_to(class_id) || class_id == &self.marker {
            return Ok(Vec::new());
        }

        let marker = match module.find_class(&self.marker)? {
            Some(marker) => marker,
            None => module
                .not_found_classes()
                .get(&self.marker, &vec![0; self.marker.nesting_level()])?,
        };
        Ok(vec![Type::Simple(SimpleType::resolved(
            TypeConstructor::Class(ClassRef::new(&marker)),
            Vec::new(),
            false,
            TypeCapabilities::empty(),
        ))])
    }
}
