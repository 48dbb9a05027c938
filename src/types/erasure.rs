//! Erased member signatures.
//!
//! Override matching compares members by their erased shape: a type erases to the class it
//! refers to, and a type parameter erases to the erasure of its first upper bound. Nullability,
//! arguments and variance are ignored. Two members with equal [`SignatureKey`]s occupy the same
//! slot in a member scope, so one overrides the other.

use crate::{
    builtins::BuiltInClass,
    descriptors::CallableMember,
    names::ClassId,
    types::{Type, TypeConstructor, TypeProjection, TypeSubstitutor},
    Result,
};

/// The erased shape of a callable, excluding its name and return type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SignatureKey {
    /// Erased extension receiver
    pub receiver: Option<ClassId>,
    /// Number of own type parameters
    pub type_parameter_count: usize,
    /// Erased value parameter types in order
    pub parameters: Vec<ClassId>,
}

/// Erases `ty` after applying `substitutor`.
///
/// Bound chains longer than `max_depth` (only possible with looping bounds) erase to
/// `kotlin/Any`.
///
/// # Errors
/// Propagates resolution errors.
pub fn erase(ty: &Type, substitutor: &TypeSubstitutor, max_depth: usize) -> Result<ClassId> {
    erase_at(ty, substitutor, 0, max_depth)
}

fn erase_at(
    ty: &Type,
    substitutor: &TypeSubstitutor,
    depth: usize,
    max_depth: usize,
) -> Result<ClassId> {
    if depth > max_depth {
        return Ok(BuiltInClass::Any.class_id());
    }

    match ty.constructor()? {
        TypeConstructor::Class(class) => Ok(class.class_id().clone()),
        TypeConstructor::TypeParameter(parameter) => {
            match substitutor.get(parameter) {
                Some(TypeProjection::Type { ty, .. }) => {
                    return erase_at(ty, &TypeSubstitutor::empty(), depth + 1, max_depth);
                }
                Some(TypeProjection::Star) | None => {}
            }

            let parameter = parameter.upgrade()?;
            match parameter.upper_bounds()?.first() {
                Some(bound) => erase_at(bound, substitutor, depth + 1, max_depth),
                None => Ok(BuiltInClass::Any.class_id()),
            }
        }
    }
}

/// The signature key of `member` as seen through `substitutor`.
///
/// # Errors
/// Propagates resolution errors.
pub fn signature_key<M: CallableMember>(
    member: &M,
    substitutor: &TypeSubstitutor,
    max_depth: usize,
) -> Result<SignatureKey> {
    let receiver = match member.receiver_type() {
        Some(receiver) => Some(erase(receiver, substitutor, max_depth)?),
        None => None,
    };

    let mut parameters = Vec::with_capacity(member.value_parameters().len());
    for parameter in member.value_parameters() {
        parameters.push(erase(parameter.ty(), substitutor, max_depth)?);
    }

    Ok(SignatureKey {
        receiver,
        type_parameter_count: member.type_parameters().len(),
        parameters,
    })
}

/// The erased return type of `member` as seen through `substitutor`.
///
/// # Errors
/// Propagates resolution errors.
pub fn return_key<M: CallableMember>(
    member: &M,
    substitutor: &TypeSubstitutor,
    max_depth: usize,
) -> Result<ClassId> {
    erase(member.return_type(), substitutor, max_depth)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        descriptors::FunctionDescriptor,
        metadata::proto::{TypeProto, VarianceProto},
        names::Name,
        test::{class_blob, module_from_blobs, TestModule},
    };
    use std::sync::Arc;

    /// `class Sig<T : Bound>` with functions exercising each erasure rule.
    fn signatures() -> TestModule {
        let blob = class_blob(|e| {
            let bound = e.class_type("a/Bound");
            let int = e.class_type("kotlin/Int");
            let string = e.class_type("kotlin/String");
            let list = e
                .class_type("a/List")
                .with_arguments(vec![TypeProto::type_parameter(0)]);

            let plain = e
                .function("plain")
                .parameter("t", TypeProto::type_parameter(0))
                .parameter("n", int.clone().with_nullable(true))
                .parameter("items", list)
                .build();
            let chained = e
                .function("chained")
                .type_parameter(1, "U", vec![TypeProto::type_parameter(0)])
                .parameter("u", TypeProto::type_parameter(1))
                .build();
            let looping = e
                .function("looping")
                .type_parameter(2, "A", vec![TypeProto::type_parameter(3)])
                .type_parameter(3, "B", vec![TypeProto::type_parameter(2)])
                .parameter("a", TypeProto::type_parameter(2))
                .build();
            let extension = e
                .function("extension")
                .receiver(string)
                .returns(int)
                .build();

            let mut b = e.class("a/Sig");
            b.type_parameter(0, "T", VarianceProto::Inv, vec![bound])
                .function_proto(plain)
                .function_proto(chained)
                .function_proto(looping)
                .function_proto(extension);
            b.build()
        });
        module_from_blobs(&[blob])
    }

    fn function(t: &TestModule, name: &str) -> Arc<FunctionDescriptor> {
        t.module
            .find_class(&ClassId::parse("a/Sig"))
            .unwrap()
            .unwrap()
            .member_scope()
            .functions(&Name::identifier(name), None)
            .unwrap()
            .remove(0)
    }

    #[test]
    fn parameters_erase_to_classes_and_bounds() {
        let t = signatures();
        let key = signature_key(function(&t, "plain").as_ref(), &TypeSubstitutor::empty(), 16)
            .unwrap();

        assert_eq!(key.receiver, None);
        assert_eq!(key.type_parameter_count, 0);
        assert_eq!(
            key.parameters,
            vec![
                ClassId::parse("a/Bound"),
                ClassId::parse("kotlin/Int"),
                ClassId::parse("a/List"),
            ]
        );
    }

    #[test]
    fn bound_chains_are_followed() {
        let t = signatures();
        let key = signature_key(function(&t, "chained").as_ref(), &TypeSubstitutor::empty(), 16)
            .unwrap();
        assert_eq!(key.type_parameter_count, 1);
        assert_eq!(key.parameters, vec![ClassId::parse("a/Bound")]);
    }

    #[test]
    fn looping_bounds_stop_at_any() {
        let t = signatures();
        let key = signature_key(function(&t, "looping").as_ref(), &TypeSubstitutor::empty(), 8)
            .unwrap();
        assert_eq!(key.parameters, vec![BuiltInClass::Any.class_id()]);
    }

    #[test]
    fn receiver_and_return_type() {
        let t = signatures();
        let extension = function(&t, "extension");
        let key = signature_key(extension.as_ref(), &TypeSubstitutor::empty(), 16).unwrap();
        assert_eq!(key.receiver, Some(ClassId::parse("kotlin/String")));
        assert!(key.parameters.is_empty());
        assert_eq!(
            return_key(extension.as_ref(), &TypeSubstitutor::empty(), 16).unwrap(),
            ClassId::parse("kotlin/Int")
        );
    }
}
