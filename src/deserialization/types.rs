//! Type deserialization.
//!
//! [`deserialize_type`] only wraps a message into a lazy [`SimpleType`] (or hands a flexible
//! pair to the module's [`crate::types::FlexibleTypeFactory`]); the two resolution steps run
//! when the type is first inspected:
//!
//! - [`resolve_constructor`] looks the classifier up. A class that no finder knows becomes a
//!   not-found placeholder shaped after the use site's argument counts.
//! - [`resolve_arguments`] deserializes the arguments, outer class arguments first.

use std::sync::Arc;

use crate::{
    deserialization::DeserializationContext,
    descriptors::ClassRef,
    metadata::proto::{ArgumentProto, ProjectionKind, TypeClassifier, TypeProto},
    names::ClassId,
    types::{SimpleType, Type, TypeConstructor, TypeProjection, Variance},
    Result,
};

/// Deserializes a type use in `ctx`.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] for a flexible type without an id, and propagates the
/// error of a factory that rejects flexible types.
pub fn deserialize_type(ctx: &Arc<DeserializationContext>, proto: Arc<TypeProto>) -> Result<Type> {
    let Some(upper_ref) = &proto.flexible_upper_bound else {
        return Ok(Type::Simple(SimpleType::lazy(Arc::clone(ctx), proto)));
    };

    let id_index = proto
        .flexible_type_id
        .ok_or_else(|| malformed_error!("Flexible type without a flexible type id"))?;
    let id = ctx.name_resolver().string(id_index)?.to_string();
    let upper = ctx.type_table().resolve(upper_ref)?;

    let lower = SimpleType::lazy(Arc::clone(ctx), Arc::clone(&proto));
    let upper = SimpleType::lazy(Arc::clone(ctx), upper);
    ctx.module()?.flexible_types().create(&id, lower, upper)
}

/// Resolves the constructor of a type message.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] for bad name indices or unknown type parameters and
/// [`crate::Error::LocalClassRequested`] for a local class no finder knows.
pub fn resolve_constructor(
    ctx: &Arc<DeserializationContext>,
    proto: &TypeProto,
) -> Result<TypeConstructor> {
    match &proto.classifier {
        TypeClassifier::Class(index) => {
            let class_id = ctx.name_resolver().class_id(*index)?;
            let module = ctx.module()?;
            let class = match module.find_class(&class_id)? {
                Some(class) => class,
                None => {
                    let arities = type_parameter_arities(
                        ctx,
                        proto,
                        &class_id,
                        module.config().max_hierarchy_depth,
                    )?;
                    module.not_found_classes().get(&class_id, &arities)?
                }
            };
            Ok(TypeConstructor::Class(ClassRef::new(&class)))
        }
        TypeClassifier::TypeParameter(id) => {
            Ok(TypeConstructor::TypeParameter(ctx.type_parameter_by_id(*id)?))
        }
        TypeClassifier::TypeParameterName(index) => {
            let name = ctx.name_resolver().name(*index)?;
            Ok(TypeConstructor::TypeParameter(ctx.type_parameter_by_name(&name)?))
        }
    }
}

/// Argument counts per nesting level, innermost class first, one entry per class in the
/// nesting chain of `class_id`. Levels the use site does not spell out count as zero.
fn type_parameter_arities(
    ctx: &DeserializationContext,
    proto: &TypeProto,
    class_id: &ClassId,
    max_depth: usize,
) -> Result<Vec<usize>> {
    let levels = class_id.nesting_level().min(max_depth);
    let mut arities = vec![proto.arguments.len()];

    let mut outer = proto.outer_type.clone();
    while let Some(outer_ref) = outer {
        if arities.len() >= levels {
            break;
        }
        let outer_proto = ctx.type_table().resolve(&outer_ref)?;
        arities.push(outer_proto.arguments.len());
        outer = outer_proto.outer_type.clone();
    }

    arities.resize(class_id.nesting_level().max(1), 0);
    Ok(arities)
}

/// Resolves the arguments of a type message: those of the outer types first (outermost
/// first), then the type's own.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] for corrupted argument messages or an outer type
/// chain longer than the configured hierarchy depth.
pub fn resolve_arguments(
    ctx: &Arc<DeserializationContext>,
    proto: &TypeProto,
) -> Result<Vec<TypeProjection>> {
    let max_depth = ctx.module()?.config().max_hierarchy_depth;

    let mut levels: Vec<Arc<TypeProto>> = Vec::new();
    let mut outer = proto.outer_type.clone();
    while let Some(outer_ref) = outer {
        if levels.len() >= max_depth {
            return Err(malformed_error!(
                "Outer type chain exceeds {} levels",
                max_depth
            ));
        }
        let outer_proto = ctx.type_table().resolve(&outer_ref)?;
        outer = outer_proto.outer_type.clone();
        levels.push(outer_proto);
    }

    let mut arguments = Vec::new();
    for level in levels.iter().rev() {
        for argument in &level.arguments {
            arguments.push(deserialize_argument(ctx, argument)?);
        }
    }
    for argument in &proto.arguments {
        arguments.push(deserialize_argument(ctx, argument)?);
    }
    Ok(arguments)
}

fn deserialize_argument(
    ctx: &Arc<DeserializationContext>,
    argument: &ArgumentProto,
) -> Result<TypeProjection> {
    let variance = match argument.projection {
        ProjectionKind::Star => return Ok(TypeProjection::Star),
        ProjectionKind::In => Variance::In,
        ProjectionKind::Out => Variance::Out,
        ProjectionKind::Inv => Variance::Invariant,
    };

    let type_ref = argument
        .ty
        .as_ref()
        .ok_or_else(|| malformed_error!("Projected type argument without a type"))?;
    let proto = ctx.type_table().resolve(type_ref)?;
    Ok(TypeProjection::Type {
        variance,
        ty: deserialize_type(ctx, proto)?,
    })
}
