//! Substitution of type parameters by type arguments.
//!
//! When `Derived : Base<String>` inherits `fun f(t: T)` from `Base<T>`, the member seen through
//! `Derived` is `fun f(t: String)`. [`TypeSubstitutor::for_supertype`] builds the mapping from a
//! supertype use and [`TypeSubstitutor::substitute`] applies it.

use std::sync::Arc;

use crate::{
    descriptors::{ClassDescriptor, TypeParameterRef},
    types::{FlexibleType, SimpleType, Type, TypeConstructor, TypeProjection, MAX_TYPE_NESTING},
    Result,
};

/// Maps type parameters (by identity) to type arguments.
#[derive(Clone, Debug, Default)]
pub struct TypeSubstitutor {
    mapping: Vec<(TypeParameterRef, TypeProjection)>,
}

impl TypeSubstitutor {
    /// The identity substitution.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// A substitution from explicit pairs.
    #[must_use]
    pub fn new(mapping: Vec<(TypeParameterRef, TypeProjection)>) -> Self {
        TypeSubstitutor { mapping }
    }

    /// The substitution a supertype use applies to the members of `class`.
    ///
    /// Parameters of `class` are paired with the supertype's arguments in order (outer class
    /// parameters first, matching the argument order). Surplus parameters or arguments of a
    /// malformed use are left unmapped.
    ///
    /// # Errors
    /// Propagates resolution errors of the supertype arguments.
    pub fn for_supertype(supertype: &Type, class: &ClassDescriptor) -> Result<Self> {
        let parameters = class.type_constructor_parameters()?;
        let arguments = supertype.arguments()?;

        let mapping = parameters
            .iter()
            .zip(arguments)
            .map(|(parameter, argument)| (TypeParameterRef::new(parameter), argument.clone()))
            .collect();
        Ok(TypeSubstitutor { mapping })
    }

    /// Returns `true` for the identity substitution.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }

    /// The argument `parameter` maps to.
    #[must_use]
    pub fn get(&self, parameter: &TypeParameterRef) -> Option<&TypeProjection> {
        self.mapping
            .iter()
            .find(|(candidate, _)| candidate.ptr_eq(parameter))
            .map(|(_, argument)| argument)
    }

    /// Applies the substitution to `ty`.
    ///
    /// A star projection substitutes the parameter's first upper bound. Types without mapped
    /// parameters are returned as they are, sharing the original objects.
    ///
    /// # Errors
    /// Propagates resolution errors, and returns [`crate::Error::Malformed`] for types nested
    /// deeper than any well-formed metadata produces.
    pub fn substitute(&self, ty: &Type) -> Result<Type> {
        if self.is_empty() {
            return Ok(ty.clone());
        }
        self.substitute_at(ty, 0)
    }

    fn substitute_at(&self, ty: &Type, depth: usize) -> Result<Type> {
        match ty {
            Type::Simple(simple) => self.substitute_simple(simple, depth),
            Type::Flexible(flexible) => {
                let lower = self.substitute_simple(flexible.lower(), depth)?;
                let upper = self.substitute_simple(flexible.upper(), depth)?;
                Ok(Type::Flexible(Arc::new(FlexibleType::new(
                    Arc::clone(lower.lower_bound()),
                    Arc::clone(upper.upper_bound()),
                    flexible.id(),
                ))))
            }
        }
    }

    fn substitute_simple(&self, simple: &Arc<SimpleType>, depth: usize) -> Result<Type> {
        if depth > MAX_TYPE_NESTING {
            return Err(malformed_error!(
                "Type nesting exceeds {} levels during substitution",
                MAX_TYPE_NESTING
            ));
        }

        match simple.constructor()? {
            TypeConstructor::TypeParameter(parameter) => match self.get(parameter) {
                Some(TypeProjection::Type { ty, .. }) => {
                    if simple.is_nullable() {
                        ty.with_nullability(true)
                    } else {
                        Ok(ty.clone())
                    }
                }
                Some(TypeProjection::Star) => {
                    let parameter = parameter.upgrade()?;
                    match parameter.upper_bounds()?.first() {
                        Some(bound) if simple.is_nullable() => bound.with_nullability(true),
                        Some(bound) => Ok(bound.clone()),
                        None => Ok(Type::Simple(Arc::clone(simple))),
                    }
                }
                None => Ok(Type::Simple(Arc::clone(simple))),
            },
            TypeConstructor::Class(class) => {
                let arguments = simple.arguments()?;
                if arguments.is_empty() {
                    return Ok(Type::Simple(Arc::clone(simple)));
                }

                let mut substituted = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    substituted.push(match argument {
                        TypeProjection::Star => TypeProjection::Star,
                        TypeProjection::Type { variance, ty } => TypeProjection::Type {
                            variance: *variance,
                            ty: self.substitute_at(ty, depth + 1)?,
                        },
                    });
                }
                Ok(Type::Simple(SimpleType::resolved(
                    TypeConstructor::Class(class.clone()),
                    substituted,
                    simple.is_nullable(),
                    simple.capabilities(),
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        descriptors::{CallableMember, ClassRc, TypeParameterRef},
        metadata::{
            flags::Modality,
            proto::{ArgumentProto, ProjectionKind, TypeProto, VarianceProto},
        },
        names::{ClassId, Name},
        test::{class_blob, module_from_blobs, TestModule},
    };

    /// `open class Box<T : Bound>` with a few properties mentioning `T`, plus
    /// `class Strings : Box<String>` and `class Stars : Box<*>`.
    fn boxes() -> TestModule {
        let boxed = class_blob(|e| {
            let bound = e.class_type("a/Bound");
            let int = e.class_type("kotlin/Int");
            let nested = e
                .class_type("a/Box")
                .with_arguments(vec![TypeProto::type_parameter(0)]);
            let mut b = e.class("a/Box");
            b.modality(Modality::Open)
                .type_parameter(0, "T", VarianceProto::Inv, vec![bound])
                .property("value", TypeProto::type_parameter(0))
                .property("maybe", TypeProto::type_parameter(0).with_nullable(true))
                .property("nested", nested)
                .property("count", int);
            b.build()
        });
        let strings = class_blob(|e| {
            let string = e.class_type("kotlin/String");
            let supertype = e.class_type("a/Box").with_arguments(vec![string]);
            let mut b = e.class("a/Strings");
            b.supertype(supertype);
            b.build()
        });
        let stars = class_blob(|e| {
            let mut supertype = e.class_type("a/Box");
            supertype.arguments.push(ArgumentProto {
                projection: ProjectionKind::Star,
                ty: None,
            });
            let mut b = e.class("a/Stars");
            b.supertype(supertype);
            b.build()
        });
        module_from_blobs(&[boxed, strings, stars])
    }

    fn find(t: &TestModule, id: &str) -> ClassRc {
        t.module.find_class(&ClassId::parse(id)).unwrap().unwrap()
    }

    fn property(class: &ClassRc, name: &str) -> Type {
        class
            .member_scope()
            .properties(&Name::identifier(name), None)
            .unwrap()[0]
            .return_type()
            .clone()
    }

    fn substitutor_of(t: &TestModule, subclass: &str) -> TypeSubstitutor {
        let subclass = find(t, subclass);
        let boxed = find(t, "a/Box");
        TypeSubstitutor::for_supertype(&subclass.supertypes().unwrap()[0], &boxed).unwrap()
    }

    #[test]
    fn type_arguments_replace_parameters() {
        let t = boxes();
        let boxed = find(&t, "a/Box");
        let substitutor = substitutor_of(&t, "a/Strings");

        let parameter = TypeParameterRef::new(&boxed.declared_type_parameters()[0]);
        assert!(substitutor.get(&parameter).is_some());

        let render = |name: &str| {
            substitutor
                .substitute(&property(&boxed, name))
                .unwrap()
                .render()
                .unwrap()
        };
        assert_eq!(render("value"), "kotlin/String");
        assert_eq!(render("maybe"), "kotlin/String?");
        assert_eq!(render("nested"), "a/Box<kotlin/String>");
    }

    #[test]
    fn star_projection_substitutes_the_bound() {
        let t = boxes();
        let boxed = find(&t, "a/Box");
        let substitutor = substitutor_of(&t, "a/Stars");

        let value = substitutor.substitute(&property(&boxed, "value")).unwrap();
        assert_eq!(value.render().unwrap(), "a/Bound");
        let maybe = substitutor.substitute(&property(&boxed, "maybe")).unwrap();
        assert_eq!(maybe.render().unwrap(), "a/Bound?");
    }

    #[test]
    fn unaffected_types_are_shared() {
        let t = boxes();
        let boxed = find(&t, "a/Box");
        let count = property(&boxed, "count");

        let substituted = substitutor_of(&t, "a/Strings").substitute(&count).unwrap();
        assert!(substituted.ptr_eq(&count));

        let identity = TypeSubstitutor::empty();
        assert!(identity.is_empty());
        let value = property(&boxed, "value");
        assert!(identity.substitute(&value).unwrap().ptr_eq(&value));
    }

    #[test]
    fn fake_overrides_see_substituted_types() {
        let t = boxes();
        let strings = find(&t, "a/Strings");
        assert_eq!(
            property(&strings, "nested").render().unwrap(),
            "a/Box<kotlin/String>"
        );
    }
}
