//! Class descriptors and class handles.
//!
//! [`ClassDescriptor`] is a closed set of class flavours sharing one query surface:
//!
//! - [`DeserializedClass`] - A class read from metadata; everything beyond its identity is
//!   computed lazily on first access
//! - [`EnumEntryClass`] - The singleton class of one enum entry
//! - [`NotFoundClass`] - A placeholder for a class that is referenced but can not be located
//!
//! Strong handles ([`ClassRc`]) live in the module caches. Everything that merely points at a
//! class (type constructors, containers, members) holds a [`ClassRef`], which is weak and
//! carries the class id so it can be displayed and compared without upgrading.

use std::{
    fmt,
    sync::{Arc, Weak},
};

use crate::{
    descriptors::{ConstructorDescriptor, Container, TypeParameterDescriptor},
    deserialization::{DeserializedClass, EnumEntryClass, NotFoundClass},
    locator::SourceElement,
    metadata::flags::{ClassAttributes, ClassKind, Modality, Visibility},
    names::{ClassId, Name},
    scopes::MemberScope,
    types::{SimpleType, Type, TypeCapabilities, TypeConstructor, TypeProjection},
    Error, Result,
};

/// Strong handle to a class descriptor.
pub type ClassRc = Arc<ClassDescriptor>;

/// Weak handle to a class descriptor.
#[derive(Clone)]
pub struct ClassRef {
    class_id: ClassId,
    class: Weak<ClassDescriptor>,
}

impl ClassRef {
    /// Creates a handle to `class`.
    #[must_use]
    pub fn new(class: &ClassRc) -> Self {
        ClassRef {
            class_id: class.class_id().clone(),
            class: Arc::downgrade(class),
        }
    }

    pub(crate) fn from_weak(class_id: ClassId, class: Weak<ClassDescriptor>) -> Self {
        ClassRef { class_id, class }
    }

    /// Id of the referenced class, available without upgrading.
    #[must_use]
    pub fn class_id(&self) -> &ClassId {
        &self.class_id
    }

    /// The referenced class.
    ///
    /// # Errors
    /// Returns [`Error::ModuleReleased`] if the owning module has been dropped.
    pub fn upgrade(&self) -> Result<ClassRc> {
        self.class.upgrade().ok_or(Error::ModuleReleased)
    }

    /// Returns `true` if both handles refer to the same descriptor instance.
    #[must_use]
    pub fn ptr_eq(&self, other: &ClassRef) -> bool {
        Weak::ptr_eq(&self.class, &other.class)
    }

    /// Returns `true` if this handle refers to `class`.
    #[must_use]
    pub fn points_to(&self, class: &ClassRc) -> bool {
        std::ptr::eq(self.class.as_ptr(), Arc::as_ptr(class))
    }
}

impl fmt::Debug for ClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassRef({})", self.class_id)
    }
}

/// A class, enum entry or not-found placeholder.
pub enum ClassDescriptor {
    /// A class read from metadata
    Deserialized(DeserializedClass),
    /// The singleton class of an enum entry
    EnumEntry(EnumEntryClass),
    /// A placeholder for a class that could not be located
    NotFound(NotFoundClass),
}

impl ClassDescriptor {
    /// The class id.
    #[must_use]
    pub fn class_id(&self) -> &ClassId {
        match self {
            ClassDescriptor::Deserialized(class) => class.class_id(),
            ClassDescriptor::EnumEntry(entry) => entry.class_id(),
            ClassDescriptor::NotFound(placeholder) => placeholder.class_id(),
        }
    }

    /// The simple name.
    #[must_use]
    pub fn name(&self) -> Name {
        self.class_id().short_class_name()
    }

    /// The class kind.
    #[must_use]
    pub fn kind(&self) -> ClassKind {
        match self {
            ClassDescriptor::Deserialized(class) => class.kind(),
            ClassDescriptor::EnumEntry(_) => ClassKind::EnumEntry,
            ClassDescriptor::NotFound(_) => ClassKind::Class,
        }
    }

    /// The class modality.
    #[must_use]
    pub fn modality(&self) -> Modality {
        match self {
            ClassDescriptor::Deserialized(class) => class.modality(),
            ClassDescriptor::EnumEntry(_) | ClassDescriptor::NotFound(_) => Modality::Final,
        }
    }

    /// The class visibility.
    #[must_use]
    pub fn visibility(&self) -> Visibility {
        match self {
            ClassDescriptor::Deserialized(class) => class.visibility(),
            ClassDescriptor::EnumEntry(_) | ClassDescriptor::NotFound(_) => Visibility::Public,
        }
    }

    /// Attribute bits of a deserialized class, empty otherwise.
    #[must_use]
    pub fn attributes(&self) -> ClassAttributes {
        match self {
            ClassDescriptor::Deserialized(class) => class.attributes(),
            ClassDescriptor::EnumEntry(_) | ClassDescriptor::NotFound(_) => {
                ClassAttributes::empty()
            }
        }
    }

    /// `inner class`: captures the type parameters of its outer class.
    #[must_use]
    pub fn is_inner(&self) -> bool {
        match self {
            ClassDescriptor::Deserialized(class) => {
                class.attributes().contains(ClassAttributes::IS_INNER)
            }
            ClassDescriptor::EnumEntry(_) => false,
            ClassDescriptor::NotFound(placeholder) => placeholder.is_inner(),
        }
    }

    /// `data class`
    #[must_use]
    pub fn is_data(&self) -> bool {
        self.attributes().contains(ClassAttributes::IS_DATA)
    }

    /// Returns `true` for companion objects.
    #[must_use]
    pub fn is_companion_object(&self) -> bool {
        self.kind() == ClassKind::CompanionObject
    }

    /// Returns `true` for not-found placeholders.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClassDescriptor::NotFound(_))
    }

    /// The containing declaration.
    #[must_use]
    pub fn container(&self) -> &Container {
        match self {
            ClassDescriptor::Deserialized(class) => class.container(),
            ClassDescriptor::EnumEntry(entry) => entry.container(),
            ClassDescriptor::NotFound(placeholder) => placeholder.container(),
        }
    }

    /// Where the class was read from, `None` for synthesized classes.
    #[must_use]
    pub fn source(&self) -> Option<&SourceElement> {
        match self {
            ClassDescriptor::Deserialized(class) => Some(class.source()),
            ClassDescriptor::EnumEntry(_) | ClassDescriptor::NotFound(_) => None,
        }
    }

    /// A weak handle to this class.
    #[must_use]
    pub fn self_ref(&self) -> ClassRef {
        match self {
            ClassDescriptor::Deserialized(class) => class.self_ref(),
            ClassDescriptor::EnumEntry(entry) => entry.self_ref(),
            ClassDescriptor::NotFound(placeholder) => placeholder.self_ref(),
        }
    }

    /// The type parameters declared by the class itself.
    #[must_use]
    pub fn declared_type_parameters(&self) -> &[Arc<TypeParameterDescriptor>] {
        match self {
            ClassDescriptor::Deserialized(class) => class.declared_type_parameters(),
            ClassDescriptor::EnumEntry(_) => &[],
            ClassDescriptor::NotFound(placeholder) => placeholder.declared_type_parameters(),
        }
    }

    /// All parameters of the class' type constructor: for an inner class the outer class'
    /// parameters come first, followed by the declared ones.
    ///
    /// # Errors
    /// Returns [`Error::ModuleReleased`] if the outer class is gone.
    pub fn type_constructor_parameters(&self) -> Result<Vec<Arc<TypeParameterDescriptor>>> {
        let mut parameters = Vec::new();
        if self.is_inner() {
            if let Container::Class(outer) = self.container() {
                parameters.extend(outer.upgrade()?.type_constructor_parameters()?);
            }
        }
        parameters.extend(self.declared_type_parameters().iter().cloned());
        Ok(parameters)
    }

    /// The direct supertypes.
    ///
    /// Missing supertypes appear as not-found placeholders and are reported once as an
    /// incomplete hierarchy; supertypes that lead back to the class are disconnected.
    ///
    /// # Errors
    /// Returns [`Error::Malformed`] for corrupted supertype messages.
    pub fn supertypes(&self) -> Result<&[Type]> {
        match self {
            ClassDescriptor::Deserialized(class) => class.supertypes(),
            ClassDescriptor::EnumEntry(entry) => entry.supertypes(),
            ClassDescriptor::NotFound(placeholder) => placeholder.supertypes(),
        }
    }

    /// The member scope: declared members plus fake overrides of inherited ones.
    #[must_use]
    pub fn member_scope(&self) -> MemberScope {
        match self {
            ClassDescriptor::Deserialized(class) => class.member_scope(),
            ClassDescriptor::EnumEntry(entry) => entry.member_scope(),
            ClassDescriptor::NotFound(_) => MemberScope::Empty,
        }
    }

    /// The static scope (`values()`/`valueOf()` of enum classes).
    #[must_use]
    pub fn static_scope(&self) -> MemberScope {
        match self {
            ClassDescriptor::Deserialized(class) => class.static_scope(),
            ClassDescriptor::EnumEntry(_) | ClassDescriptor::NotFound(_) => MemberScope::Empty,
        }
    }

    /// All constructors: the secondary ones followed by the primary one.
    ///
    /// # Errors
    /// Returns [`Error::Malformed`] for corrupted constructor messages.
    pub fn constructors(&self) -> Result<Vec<Arc<ConstructorDescriptor>>> {
        match self {
            ClassDescriptor::Deserialized(class) => Ok(class.constructors()?.to_vec()),
            ClassDescriptor::EnumEntry(entry) => {
                Ok(entry.primary_constructor()?.into_iter().collect())
            }
            ClassDescriptor::NotFound(_) => Ok(Vec::new()),
        }
    }

    /// The primary constructor, if the class has one.
    ///
    /// # Errors
    /// Returns [`Error::Malformed`] for corrupted constructor messages.
    pub fn primary_constructor(&self) -> Result<Option<Arc<ConstructorDescriptor>>> {
        match self {
            ClassDescriptor::Deserialized(class) => class.primary_constructor(),
            ClassDescriptor::EnumEntry(entry) => entry.primary_constructor(),
            ClassDescriptor::NotFound(_) => Ok(None),
        }
    }

    /// The companion object.
    ///
    /// # Errors
    /// Propagates resolution errors of the companion class.
    pub fn companion_object(&self) -> Result<Option<ClassRc>> {
        match self {
            ClassDescriptor::Deserialized(class) => class.companion_object(),
            ClassDescriptor::EnumEntry(_) | ClassDescriptor::NotFound(_) => Ok(None),
        }
    }

    /// Names of the directly nested classes.
    #[must_use]
    pub fn nested_class_names(&self) -> &[Name] {
        match self {
            ClassDescriptor::Deserialized(class) => class.nested_class_names(),
            ClassDescriptor::EnumEntry(_) | ClassDescriptor::NotFound(_) => &[],
        }
    }

    /// A directly nested class (or enum entry) by name.
    ///
    /// # Errors
    /// Propagates resolution errors.
    pub fn nested_class(&self, name: &Name) -> Result<Option<ClassRc>> {
        self.member_scope().classifier(name, None)
    }

    /// Names of the enum entries, empty for anything but enum classes.
    #[must_use]
    pub fn enum_entry_names(&self) -> &[Name] {
        match self {
            ClassDescriptor::Deserialized(class) => class.enum_entry_names(),
            ClassDescriptor::EnumEntry(_) | ClassDescriptor::NotFound(_) => &[],
        }
    }

    /// The class of the enum entry `name`.
    ///
    /// # Errors
    /// Propagates resolution errors.
    pub fn enum_entry(&self, name: &Name) -> Result<Option<ClassRc>> {
        match self {
            ClassDescriptor::Deserialized(class) => class.enum_entry(name),
            ClassDescriptor::EnumEntry(_) | ClassDescriptor::NotFound(_) => Ok(None),
        }
    }

    /// The type `C<T1, .., Tn>` of this class applied to its own type parameters.
    ///
    /// # Errors
    /// Returns [`Error::ModuleReleased`] if the outer class is gone.
    pub fn default_type(&self) -> Result<Type> {
        let arguments = self
            .type_constructor_parameters()?
            .iter()
            .map(|parameter| TypeProjection::invariant(parameter.default_type()))
            .collect();
        Ok(Type::Simple(SimpleType::resolved(
            TypeConstructor::Class(self.self_ref()),
            arguments,
            false,
            TypeCapabilities::empty(),
        )))
    }

    /// The deserialized class, if this is one.
    #[must_use]
    pub fn as_deserialized(&self) -> Option<&DeserializedClass> {
        match self {
            ClassDescriptor::Deserialized(class) => Some(class),
            _ => None,
        }
    }

    /// The enum entry class, if this is one.
    #[must_use]
    pub fn as_enum_entry(&self) -> Option<&EnumEntryClass> {
        match self {
            ClassDescriptor::EnumEntry(entry) => Some(entry),
            _ => None,
        }
    }

    /// The not-found placeholder, if this is one.
    #[must_use]
    pub fn as_not_found(&self) -> Option<&NotFoundClass> {
        match self {
            ClassDescriptor::NotFound(placeholder) => Some(placeholder),
            _ => None,
        }
    }
}

impl fmt::Debug for ClassDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flavour = match self {
            ClassDescriptor::Deserialized(_) => "Deserialized",
            ClassDescriptor::EnumEntry(_) => "EnumEntry",
            ClassDescriptor::NotFound(_) => "NotFound",
        };
        write!(f, "ClassDescriptor::{flavour}({}, {})", self.class_id(), self.kind())
    }
}
