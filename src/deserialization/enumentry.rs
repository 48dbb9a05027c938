//! Enum entry classes.

use std::{
    fmt,
    sync::{Arc, Weak},
};

use crate::{
    descriptors::{ClassDescriptor, ClassRc, ClassRef, ConstructorDescriptor, Container},
    metadata::flags::{ConstructorAttributes, Visibility},
    module::Module,
    names::{ClassId, Name},
    scopes::{EnumEntryScope, MemberScope},
    storage::LazyValue,
    types::Type,
    Result,
};

/// The singleton class of one enum entry.
///
/// Its only supertype is the enum class and it inherits the enum's members as fake overrides.
pub struct EnumEntryClass {
    class_id: ClassId,
    enum_class: ClassRef,
    container: Container,
    supertypes: LazyValue<Vec<Type>>,
    primary_constructor: LazyValue<Arc<ConstructorDescriptor>>,
    scope: Arc<EnumEntryScope>,
    self_ref: ClassRef,
}

impl EnumEntryClass {
    pub(crate) fn create(module: Weak<Module>, enum_class: ClassRef, name: Name) -> ClassRc {
        let class_id = enum_class.class_id().create_nested_class_id(name);
        Arc::new_cyclic(|weak| {
            let self_ref = ClassRef::from_weak(class_id.clone(), weak.clone());
            ClassDescriptor::EnumEntry(EnumEntryClass {
                scope: Arc::new(EnumEntryScope::new(
                    module,
                    self_ref.clone(),
                    enum_class.clone(),
                )),
                class_id,
                container: Container::Class(enum_class.clone()),
                enum_class,
                supertypes: LazyValue::new("enum entry supertypes"),
                primary_constructor: LazyValue::new("enum entry constructor"),
                self_ref,
            })
        })
    }

    /// The entry's class id, nested in the enum class.
    #[must_use]
    pub fn class_id(&self) -> &ClassId {
        &self.class_id
    }

    /// The enum class.
    #[must_use]
    pub fn enum_class(&self) -> &ClassRef {
        &self.enum_class
    }

    /// The enum class, as a container.
    #[must_use]
    pub fn container(&self) -> &Container {
        &self.container
    }

    pub(crate) fn self_ref(&self) -> ClassRef {
        self.self_ref.clone()
    }

    /// `[enum class type]`
    ///
    /// # Errors
    /// Returns [`crate::Error::ModuleReleased`] if the enum class is gone.
    pub fn supertypes(&self) -> Result<&[Type]> {
        self.supertypes
            .get(|| Ok(vec![self.enum_class.upgrade()?.default_type()?]))
            .map(Vec::as_slice)
    }

    /// The inherited members.
    #[must_use]
    pub fn member_scope(&self) -> MemberScope {
        MemberScope::EnumEntry(Arc::clone(&self.scope))
    }

    /// The private parameterless constructor of the singleton.
    ///
    /// # Errors
    /// Returns [`crate::Error::ModuleReleased`] if the entry is gone.
    pub fn primary_constructor(&self) -> Result<Option<Arc<ConstructorDescriptor>>> {
        self.primary_constructor
            .get(|| {
                Ok(Arc::new(ConstructorDescriptor {
                    owner: Container::Class(self.self_ref.clone()),
                    visibility: Visibility::Private,
                    is_primary: true,
                    synthesized: true,
                    attributes: ConstructorAttributes::empty(),
                    value_parameters: Vec::new(),
                    return_type: self.self_ref.upgrade()?.default_type()?,
                }))
            })
            .map(|constructor| Some(Arc::clone(constructor)))
    }
}

impl fmt::Debug for EnumEntryClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnumEntryClass")
            .field("class_id", &self.class_id)
            .field("enum_class", &self.enum_class)
            .finish_non_exhaustive()
    }
}
