//! Placeholders for classes that are referenced but can not be located.
//!
//! Real class paths are routinely incomplete. Rather than failing the query that met a missing
//! class, the type deserializer asks [`NotFoundClasses`] for a placeholder shaped like the use
//! site: same id, as many type parameters as the use site passes arguments. Placeholders are
//! cached per (id, arity vector), so the same shape always yields the same instance while a
//! different generic shape of the same id yields a different one.

use std::{
    fmt,
    sync::{Arc, Weak},
};

use crate::{
    descriptors::{ClassDescriptor, ClassRc, ClassRef, Container, TypeParameterDescriptor},
    module::Module,
    names::{ClassId, Name},
    storage::{LazyValue, MemoizedFn},
    types::{Type, Variance},
    Error, Result,
};

/// Cache key of a placeholder.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ClassRequest {
    /// The missing class
    pub class_id: ClassId,
    /// Type parameter counts, innermost class first
    pub type_parameter_arities: Vec<usize>,
}

/// A stand-in for a class no finder knows.
///
/// Placeholders are final public classes with empty scopes whose only supertype is
/// `kotlin.Any`. Their type parameters are named `T0`, `T1`, ... and are invariant.
pub struct NotFoundClass {
    module: Weak<Module>,
    class_id: ClassId,
    container: Container,
    is_inner: bool,
    type_parameters: Vec<Arc<TypeParameterDescriptor>>,
    supertypes: LazyValue<Vec<Type>>,
    self_ref: ClassRef,
}

impl NotFoundClass {
    /// The missing class id.
    #[must_use]
    pub fn class_id(&self) -> &ClassId {
        &self.class_id
    }

    /// The outer placeholder or class, or the package.
    #[must_use]
    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Nested placeholders are treated as inner, so they accept the outer arguments.
    #[must_use]
    pub fn is_inner(&self) -> bool {
        self.is_inner
    }

    pub(crate) fn self_ref(&self) -> ClassRef {
        self.self_ref.clone()
    }

    /// The synthesized type parameters.
    #[must_use]
    pub fn declared_type_parameters(&self) -> &[Arc<TypeParameterDescriptor>] {
        &self.type_parameters
    }

    /// `[kotlin.Any]`
    ///
    /// # Errors
    /// Returns [`Error::ModuleReleased`] if the module is gone.
    pub fn supertypes(&self) -> Result<&[Type]> {
        self.supertypes
            .get(|| {
                let module = upgrade_module!(self.module);
                Ok(vec![module.builtins().any_type()?])
            })
            .map(Vec::as_slice)
    }
}

impl fmt::Debug for NotFoundClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotFoundClass")
            .field("class_id", &self.class_id)
            .field("type_parameters", &self.type_parameters.len())
            .finish_non_exhaustive()
    }
}

/// The placeholder registry of a module.
pub struct NotFoundClasses {
    module: Weak<Module>,
    classes: MemoizedFn<ClassRequest, ClassRc>,
}

impl NotFoundClasses {
    pub(crate) fn new(module: Weak<Module>) -> Self {
        NotFoundClasses {
            module,
            classes: MemoizedFn::new("not-found class"),
        }
    }

    /// The placeholder for `class_id` with the given type parameter counts.
    ///
    /// # Arguments
    ///
    /// * `class_id` - The missing class
    /// * `arities` - Type parameter count of the class, then of each outer class
    ///
    /// # Errors
    /// Returns [`Error::LocalClassRequested`] for local classes, which can never be stood in
    /// for, and [`Error::ModuleReleased`] if the module is gone.
    pub fn get(&self, class_id: &ClassId, arities: &[usize]) -> Result<ClassRc> {
        if class_id.is_local() {
            return Err(Error::LocalClassRequested(class_id.clone()));
        }

        let request = ClassRequest {
            class_id: class_id.clone(),
            type_parameter_arities: arities.to_vec(),
        };
        self.classes
            .get_or_compute(&request, |request| self.create(request))
    }

    fn create(&self, request: &ClassRequest) -> Result<ClassRc> {
        let class_id = &request.class_id;
        let arities = &request.type_parameter_arities;

        let container = match class_id.outer_class_id() {
            Some(outer_id) => {
                let module = upgrade_module!(self.module);
                let outer = match module.find_class(&outer_id)? {
                    Some(outer) => outer,
                    None => self.get(&outer_id, arities.get(1..).unwrap_or(&[]))?,
                };
                Container::Class(ClassRef::new(&outer))
            }
            None => Container::Package(class_id.package_fq_name().clone()),
        };

        let arity = arities.first().copied().unwrap_or(0);
        let type_parameters = (0..arity)
            .map(|index| {
                TypeParameterDescriptor::with_default_bound(
                    self.module.clone(),
                    Name::identifier(format!("T{index}")),
                    index,
                    Variance::Invariant,
                )
            })
            .collect();

        Ok(Arc::new_cyclic(|weak| {
            ClassDescriptor::NotFound(NotFoundClass {
                module: self.module.clone(),
                class_id: class_id.clone(),
                container,
                is_inner: class_id.is_nested_class(),
                type_parameters,
                supertypes: LazyValue::new("not-found supertypes"),
                self_ref: ClassRef::from_weak(class_id.clone(), weak.clone()),
            })
        }))
    }

    /// Number of distinct placeholders created so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Returns `true` if no placeholder has been created.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// All placeholders created so far.
    #[must_use]
    pub fn classes(&self) -> Vec<ClassRc> {
        self.classes.values()
    }
}

impl fmt::Debug for NotFoundClasses {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotFoundClasses")
            .field("classes", &self.classes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        names::FqName,
        test::{class_blob, module_from_blobs},
    };

    #[test]
    fn placeholders_are_cached_per_shape() {
        let t = module_from_blobs(&[]);
        let registry = t.module.not_found_classes();
        let id = ClassId::parse("x/Gone");

        let plain = registry.get(&id, &[0]).unwrap();
        let again = registry.get(&id, &[0]).unwrap();
        let generic = registry.get(&id, &[2]).unwrap();

        assert!(Arc::ptr_eq(&plain, &again));
        assert!(!Arc::ptr_eq(&plain, &generic));
        assert_eq!(registry.len(), 2);

        let parameters: Vec<String> = generic
            .declared_type_parameters()
            .iter()
            .map(|parameter| parameter.name().to_string())
            .collect();
        assert_eq!(parameters, vec!["T0", "T1"]);
        assert!(generic.is_not_found());
        assert!(generic.member_scope().is_empty());
    }

    #[test]
    fn placeholder_supertype_is_any() {
        let t = module_from_blobs(&[]);
        let placeholder = t
            .module
            .not_found_classes()
            .get(&ClassId::parse("x/Gone"), &[0])
            .unwrap();

        let supertypes = placeholder.supertypes().unwrap();
        assert_eq!(supertypes.len(), 1);
        assert_eq!(supertypes[0].render().unwrap(), "kotlin/Any");
    }

    #[test]
    fn nested_placeholder_lives_in_outer_placeholder() {
        let t = module_from_blobs(&[]);
        let registry = t.module.not_found_classes();

        let inner = registry
            .get(&ClassId::parse("x/Outer.Inner"), &[1, 2])
            .unwrap();
        let outer = registry.get(&ClassId::parse("x/Outer"), &[2]).unwrap();

        assert!(inner.as_not_found().unwrap().is_inner());
        match inner.container() {
            Container::Class(owner) => assert!(owner.points_to(&outer)),
            Container::Package(_) => panic!("nested placeholder must have a class container"),
        }
        assert_eq!(inner.type_constructor_parameters().unwrap().len(), 3);
    }

    #[test]
    fn nested_placeholder_prefers_existing_outer_class() {
        let outer = class_blob(|e| e.class("x/Outer").build());
        let t = module_from_blobs(&[outer]);

        let inner = t
            .module
            .not_found_classes()
            .get(&ClassId::parse("x/Outer.Inner"), &[0, 0])
            .unwrap();
        let outer = t
            .module
            .find_class(&ClassId::parse("x/Outer"))
            .unwrap()
            .unwrap();
        assert!(matches!(
            inner.container(),
            Container::Class(owner) if owner.points_to(&outer)
        ));
    }

    #[test]
    fn local_classes_are_rejected() {
        let t = module_from_blobs(&[]);
        let local = ClassId::new(FqName::new("x"), FqName::new("Local"), true);

        let result = t.module.not_found_classes().get(&local, &[0]);
        assert!(matches!(result, Err(Error::LocalClassRequested(id)) if id == local));
        assert!(t.module.not_found_classes().is_empty());
    }
}
