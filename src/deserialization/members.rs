//! Member deserialization: functions, properties, constructors, value and type parameters.

use std::sync::{Arc, OnceLock};

use crate::{
    deserialization::{types::deserialize_type, DeserializationContext},
    descriptors::{
        ConstructorDescriptor, FunctionDescriptor, PropertyDescriptor, TypeParameterDescriptor,
        ValueParameterDescriptor,
    },
    metadata::{
        flags::{
            ConstructorAttributes, FunctionModifiers, MemberKind, Modality, PropertyAttributes,
            ValueParameterAttributes, Visibility,
        },
        proto::{
            ConstructorProto, FunctionProto, PropertyProto, TypeParameterProto, TypeRef,
            ValueParameterProto, VarianceProto,
        },
        NameResolver,
    },
    names::Name,
    types::{Type, Variance},
    Result,
};

/// Deserializes the members declared by one class or package part.
///
/// Every function and property gets its own child context, so the type parameters it declares
/// are visible to its own signature only.
pub struct MemberDeserializer<'a> {
    ctx: &'a Arc<DeserializationContext>,
}

impl<'a> MemberDeserializer<'a> {
    /// Creates a deserializer for members owned by the declaration of `ctx`.
    #[must_use]
    pub fn new(ctx: &'a Arc<DeserializationContext>) -> Self {
        MemberDeserializer { ctx }
    }

    /// Deserializes a function.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for bad name or type table indices.
    pub fn function(&self, proto: &FunctionProto) -> Result<Arc<FunctionDescriptor>> {
        let ctx = self.ctx.child(self.ctx.container().clone());
        let type_parameters = type_parameters(&ctx, &proto.type_parameters)?;

        Ok(Arc::new(FunctionDescriptor {
            name: ctx.name_resolver().name(proto.name)?,
            owner: self.ctx.container().clone(),
            visibility: Visibility::from_flags(proto.flags),
            modality: Modality::from_flags(proto.flags),
            kind: MemberKind::from_flags(proto.flags),
            modifiers: FunctionModifiers::from_function_flags(proto.flags),
            type_parameters,
            receiver_type: optional_type(&ctx, proto.receiver_type.as_ref())?,
            value_parameters: value_parameters(&ctx, &proto.value_parameters)?,
            return_type: type_ref(&ctx, &proto.return_type)?,
            overridden: OnceLock::new(),
        }))
    }

    /// Deserializes a property.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for bad name or type table indices.
    pub fn property(&self, proto: &PropertyProto) -> Result<Arc<PropertyDescriptor>> {
        let ctx = self.ctx.child(self.ctx.container().clone());
        let type_parameters = type_parameters(&ctx, &proto.type_parameters)?;

        Ok(Arc::new(PropertyDescriptor {
            name: ctx.name_resolver().name(proto.name)?,
            owner: self.ctx.container().clone(),
            visibility: Visibility::from_flags(proto.flags),
            modality: Modality::from_flags(proto.flags),
            kind: MemberKind::from_flags(proto.flags),
            attributes: PropertyAttributes::from_property_flags(proto.flags),
            type_parameters,
            receiver_type: optional_type(&ctx, proto.receiver_type.as_ref())?,
            ty: type_ref(&ctx, &proto.return_type)?,
            overridden: OnceLock::new(),
        }))
    }

    /// Deserializes a constructor of the class of this deserializer's context.
    ///
    /// # Arguments
    ///
    /// * `proto` - The constructor message
    /// * `is_primary` - Whether the class designates this constructor as primary
    /// * `return_type` - The default type of the class
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for bad name or type table indices.
    pub fn constructor(
        &self,
        proto: &ConstructorProto,
        is_primary: bool,
        return_type: Type,
    ) -> Result<Arc<ConstructorDescriptor>> {
        let ctx = self.ctx.child(self.ctx.container().clone());

        Ok(Arc::new(ConstructorDescriptor {
            owner: self.ctx.container().clone(),
            visibility: Visibility::from_flags(proto.flags),
            is_primary,
            synthesized: false,
            attributes: ConstructorAttributes::from_constructor_flags(proto.flags),
            value_parameters: value_parameters(&ctx, &proto.value_parameters)?,
            return_type,
        }))
    }

    /// A private parameterless primary constructor for classes whose metadata declares none.
    #[must_use]
    pub fn synthesized_constructor(&self, return_type: Type) -> Arc<ConstructorDescriptor> {
        Arc::new(ConstructorDescriptor {
            owner: self.ctx.container().clone(),
            visibility: Visibility::Private,
            is_primary: true,
            synthesized: true,
            attributes: ConstructorAttributes::empty(),
            value_parameters: Vec::new(),
            return_type,
        })
    }
}

/// Deserializes the type parameters introduced by the declaration of `ctx` and registers them
/// with it, so that bounds and signatures can refer to them.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] for bad name indices.
pub fn type_parameters(
    ctx: &Arc<DeserializationContext>,
    protos: &[TypeParameterProto],
) -> Result<Vec<Arc<TypeParameterDescriptor>>> {
    let names = type_parameter_names(ctx.name_resolver(), protos)?;
    Ok(build_type_parameters(ctx, protos, names))
}

/// Resolves the names of `protos`, for callers that must build the parameters infallibly.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] for bad name indices.
pub(crate) fn type_parameter_names(
    resolver: &NameResolver,
    protos: &[TypeParameterProto],
) -> Result<Vec<Name>> {
    protos.iter().map(|proto| resolver.name(proto.name)).collect()
}

/// Builds type parameters from pre-resolved names and registers them with `ctx`.
pub(crate) fn build_type_parameters(
    ctx: &Arc<DeserializationContext>,
    protos: &[TypeParameterProto],
    names: Vec<Name>,
) -> Vec<Arc<TypeParameterDescriptor>> {
    let parameters: Vec<_> = protos
        .iter()
        .zip(names)
        .enumerate()
        .map(|(index, (proto, name))| {
            let variance = match proto.variance {
                VarianceProto::In => Variance::In,
                VarianceProto::Out => Variance::Out,
                VarianceProto::Inv => Variance::Invariant,
            };
            TypeParameterDescriptor::deserialized(
                Arc::clone(ctx),
                index,
                proto.id,
                name,
                variance,
                proto.reified,
                proto.upper_bounds.clone(),
            )
        })
        .collect();
    ctx.set_type_parameters(&parameters);
    parameters
}

fn value_parameters(
    ctx: &Arc<DeserializationContext>,
    protos: &[ValueParameterProto],
) -> Result<Vec<ValueParameterDescriptor>> {
    let mut parameters = Vec::with_capacity(protos.len());
    for (index, proto) in protos.iter().enumerate() {
        parameters.push(ValueParameterDescriptor {
            index,
            name: ctx.name_resolver().name(proto.name)?,
            ty: type_ref(ctx, &proto.ty)?,
            vararg_element_type: optional_type(ctx, proto.vararg_element_type.as_ref())?,
            attributes: ValueParameterAttributes::from_parameter_flags(proto.flags),
        });
    }
    Ok(parameters)
}

/// Deserializes a type occurrence, following type table references.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] for an out-of-range type table index.
pub fn type_ref(ctx: &Arc<DeserializationContext>, type_ref: &TypeRef) -> Result<Type> {
    let proto = ctx.type_table().resolve(type_ref)?;
    deserialize_type(ctx, proto)
}

fn optional_type(
    ctx: &Arc<DeserializationContext>,
    type_ref: Option<&TypeRef>,
) -> Result<Option<Type>> {
    type_ref.map(|type_ref| self::type_ref(ctx, type_ref)).transpose()
}
