//! Functions, properties, constructors and their value parameters.
//!
//! Member descriptors are plain immutable records once built. The deserializer fills them from
//! metadata messages; override resolution derives fake overrides from them through
//! [`CallableMember::create_fake_override`], which copies a member with substituted types and a
//! new owner. The only late-bound part of a member is its overridden set, bound once by the
//! scope that owns the member.

use std::{
    fmt,
    sync::{Arc, OnceLock},
};

use crate::{
    descriptors::{Container, TypeParameterDescriptor},
    metadata::flags::{
        ConstructorAttributes, FunctionModifiers, MemberKind, Modality, PropertyAttributes,
        ValueParameterAttributes, Visibility,
    },
    names::Name,
    types::{Type, TypeSubstitutor},
    Error, Result,
};

/// A value parameter of a function or constructor.
#[derive(Clone)]
pub struct ValueParameterDescriptor {
    pub(crate) index: usize,
    pub(crate) name: Name,
    pub(crate) ty: Type,
    pub(crate) vararg_element_type: Option<Type>,
    pub(crate) attributes: ValueParameterAttributes,
}

impl ValueParameterDescriptor {
    /// Position in the parameter list.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// The parameter name.
    #[must_use]
    pub fn name(&self) -> &Name {
        &self.name
    }

    /// The parameter type; the array type for a `vararg` parameter.
    #[must_use]
    pub fn ty(&self) -> &Type {
        &self.ty
    }

    /// Element type of a `vararg` parameter.
    #[must_use]
    pub fn vararg_element_type(&self) -> Option<&Type> {
        self.vararg_element_type.as_ref()
    }

    /// Returns `true` for `vararg` parameters.
    #[must_use]
    pub fn is_vararg(&self) -> bool {
        self.vararg_element_type.is_some()
    }

    /// The parameter declares a default value.
    #[must_use]
    pub fn declares_default_value(&self) -> bool {
        self.attributes
            .contains(ValueParameterAttributes::DECLARES_DEFAULT_VALUE)
    }

    /// `crossinline`
    #[must_use]
    pub fn is_crossinline(&self) -> bool {
        self.attributes.contains(ValueParameterAttributes::IS_CROSSINLINE)
    }

    /// `noinline`
    #[must_use]
    pub fn is_noinline(&self) -> bool {
        self.attributes.contains(ValueParameterAttributes::IS_NOINLINE)
    }

    /// All attribute bits.
    #[must_use]
    pub fn attributes(&self) -> ValueParameterAttributes {
        self.attributes
    }
}

impl fmt::Debug for ValueParameterDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueParameterDescriptor")
            .field("index", &self.index)
            .field("name", &self.name)
            .field("vararg", &self.is_vararg())
            .field("attributes", &self.attributes)
            .finish_non_exhaustive()
    }
}

/// The types of one parameter in a substituted copy.
#[derive(Clone, Debug)]
pub struct ValueParameterData {
    /// New parameter type
    pub ty: Type,
    /// New vararg element type
    pub vararg_element_type: Option<Type>,
}

/// Copies `originals` with new types, keeping index, name and attributes.
///
/// # Arguments
///
/// * `new_types` - One entry per original parameter, in order
/// * `originals` - The parameters being copied
///
/// # Errors
/// Returns [`Error::ParameterCountMismatch`] if the lengths differ.
pub fn copy_value_parameters(
    new_types: Vec<ValueParameterData>,
    originals: &[ValueParameterDescriptor],
) -> Result<Vec<ValueParameterDescriptor>> {
    if new_types.len() != originals.len() {
        return Err(Error::ParameterCountMismatch {
            expected: originals.len(),
            actual: new_types.len(),
        });
    }

    Ok(new_types
        .into_iter()
        .zip(originals)
        .map(|(data, original)| ValueParameterDescriptor {
            index: original.index,
            name: original.name.clone(),
            ty: data.ty,
            vararg_element_type: data.vararg_element_type,
            attributes: original.attributes,
        })
        .collect())
}

fn substitute_parameters(
    parameters: &[ValueParameterDescriptor],
    substitutor: &TypeSubstitutor,
) -> Result<Vec<ValueParameterDescriptor>> {
    let mut new_types = Vec::with_capacity(parameters.len());
    for parameter in parameters {
        new_types.push(ValueParameterData {
            ty: substitutor.substitute(&parameter.ty)?,
            vararg_element_type: parameter
                .vararg_element_type
                .as_ref()
                .map(|ty| substitutor.substitute(ty))
                .transpose()?,
        });
    }
    copy_value_parameters(new_types, parameters)
}

/// The view of functions and properties used by override resolution.
pub trait CallableMember: Sized + Send + Sync {
    /// Member name.
    fn name(&self) -> &Name;

    /// The class or package the member belongs to.
    fn owner(&self) -> &Container;

    /// Effective visibility.
    fn visibility(&self) -> Visibility;

    /// Effective modality.
    fn modality(&self) -> Modality;

    /// How the member came into existence.
    fn kind(&self) -> MemberKind;

    /// Own type parameters.
    fn type_parameters(&self) -> &[Arc<TypeParameterDescriptor>];

    /// Extension receiver type.
    fn receiver_type(&self) -> Option<&Type>;

    /// Value parameters; always empty for properties.
    fn value_parameters(&self) -> &[ValueParameterDescriptor];

    /// Return type, or the property type.
    fn return_type(&self) -> &Type;

    /// The members this one overrides; empty until bound by the owning scope.
    fn overridden(&self) -> &[Arc<Self>];

    /// Records the overridden members. Only the first binding takes effect.
    fn bind_overridden(&self, overridden: Vec<Arc<Self>>);

    /// Derives the member as inherited by another class.
    ///
    /// Receiver, parameter and return types are passed through `substitutor`; own type
    /// parameters are shared with `self`. The result has kind [`MemberKind::FakeOverride`].
    ///
    /// # Errors
    /// Propagates substitution errors.
    fn create_fake_override(
        &self,
        owner: Container,
        visibility: Visibility,
        modality: Modality,
        substitutor: &TypeSubstitutor,
        overridden: Vec<Arc<Self>>,
    ) -> Result<Arc<Self>>;

    /// Returns `true` if this member overrides anything.
    fn is_override(&self) -> bool {
        !self.overridden().is_empty()
    }
}

/// A function.
pub struct FunctionDescriptor {
    pub(crate) name: Name,
    pub(crate) owner: Container,
    pub(crate) visibility: Visibility,
    pub(crate) modality: Modality,
    pub(crate) kind: MemberKind,
    pub(crate) modifiers: FunctionModifiers,
    pub(crate) type_parameters: Vec<Arc<TypeParameterDescriptor>>,
    pub(crate) receiver_type: Option<Type>,
    pub(crate) value_parameters: Vec<ValueParameterDescriptor>,
    pub(crate) return_type: Type,
    pub(crate) overridden: OnceLock<Vec<Arc<FunctionDescriptor>>>,
}

impl FunctionDescriptor {
    /// Declared modifiers (`inline`, `operator`, `suspend`, ...).
    #[must_use]
    pub fn modifiers(&self) -> FunctionModifiers {
        self.modifiers
    }

    /// `operator fun`
    #[must_use]
    pub fn is_operator(&self) -> bool {
        self.modifiers.contains(FunctionModifiers::OPERATOR)
    }

    /// `suspend fun`
    #[must_use]
    pub fn is_suspend(&self) -> bool {
        self.modifiers.contains(FunctionModifiers::SUSPEND)
    }

    /// `inline fun`
    #[must_use]
    pub fn is_inline(&self) -> bool {
        self.modifiers.contains(FunctionModifiers::INLINE)
    }
}

impl CallableMember for FunctionDescriptor {
    fn name(&self) -> &Name {
        &self.name
    }

    fn owner(&self) -> &Container {
        &self.owner
    }

    fn visibility(&self) -> Visibility {
        self.visibility
    }

    fn modality(&self) -> Modality {
        self.modality
    }

    fn kind(&self) -> MemberKind {
        self.kind
    }

    fn type_parameters(&self) -> &[Arc<TypeParameterDescriptor>] {
        &self.type_parameters
    }

    fn receiver_type(&self) -> Option<&Type> {
        self.receiver_type.as_ref()
    }

    fn value_parameters(&self) -> &[ValueParameterDescriptor] {
        &self.value_parameters
    }

    fn return_type(&self) -> &Type {
        &self.return_type
    }

    fn overridden(&self) -> &[Arc<Self>] {
        self.overridden.get().map_or(&[], Vec::as_slice)
    }

    fn bind_overridden(&self, overridden: Vec<Arc<Self>>) {
        let _ = self.overridden.set(overridden);
    }

    fn create_fake_override(
        &self,
        owner: Container,
        visibility: Visibility,
        modality: Modality,
        substitutor: &TypeSubstitutor,
        overridden: Vec<Arc<Self>>,
    ) -> Result<Arc<Self>> {
        let receiver_type = self
            .receiver_type
            .as_ref()
            .map(|ty| substitutor.substitute(ty))
            .transpose()?;

        Ok(Arc::new(FunctionDescriptor {
            name: self.name.clone(),
            owner,
            visibility,
            modality,
            kind: MemberKind::FakeOverride,
            modifiers: self.modifiers,
            type_parameters: self.type_parameters.clone(),
            receiver_type,
            value_parameters: substitute_parameters(&self.value_parameters, substitutor)?,
            return_type: substitutor.substitute(&self.return_type)?,
            overridden: OnceLock::from(overridden),
        }))
    }
}

impl fmt::Debug for FunctionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionDescriptor")
            .field("name", &self.name)
            .field("owner", &self.owner)
            .field("visibility", &self.visibility)
            .field("modality", &self.modality)
            .field("kind", &self.kind)
            .field("value_parameters", &self.value_parameters)
            .field("overridden", &self.overridden().len())
            .finish_non_exhaustive()
    }
}

/// A property.
pub struct PropertyDescriptor {
    pub(crate) name: Name,
    pub(crate) owner: Container,
    pub(crate) visibility: Visibility,
    pub(crate) modality: Modality,
    pub(crate) kind: MemberKind,
    pub(crate) attributes: PropertyAttributes,
    pub(crate) type_parameters: Vec<Arc<TypeParameterDescriptor>>,
    pub(crate) receiver_type: Option<Type>,
    pub(crate) ty: Type,
    pub(crate) overridden: OnceLock<Vec<Arc<PropertyDescriptor>>>,
}

impl PropertyDescriptor {
    /// The property type.
    #[must_use]
    pub fn ty(&self) -> &Type {
        &self.ty
    }

    /// `var` rather than `val`
    #[must_use]
    pub fn is_var(&self) -> bool {
        self.attributes.contains(PropertyAttributes::IS_VAR)
    }

    /// `const val`
    #[must_use]
    pub fn is_const(&self) -> bool {
        self.attributes.contains(PropertyAttributes::IS_CONST)
    }

    /// `lateinit var`
    #[must_use]
    pub fn is_lateinit(&self) -> bool {
        self.attributes.contains(PropertyAttributes::IS_LATEINIT)
    }

    /// All attribute bits.
    #[must_use]
    pub fn attributes(&self) -> PropertyAttributes {
        self.attributes
    }
}

impl CallableMember for PropertyDescriptor {
    fn name(&self) -> &Name {
        &self.name
    }

    fn owner(&self) -> &Container {
        &self.owner
    }

    fn visibility(&self) -> Visibility {
        self.visibility
    }

    fn modality(&self) -> Modality {
        self.modality
    }

    fn kind(&self) -> MemberKind {
        self.kind
    }

    fn type_parameters(&self) -> &[Arc<TypeParameterDescriptor>] {
        &self.type_parameters
    }

    fn receiver_type(&self) -> Option<&Type> {
        self.receiver_type.as_ref()
    }

    fn value_parameters(&self) -> &[ValueParameterDescriptor] {
        &[]
    }

    fn return_type(&self) -> &Type {
        &self.ty
    }

    fn overridden(&self) -> &[Arc<Self>] {
        self.overridden.get().map_or(&[], Vec::as_slice)
    }

    fn bind_overridden(&self, overridden: Vec<Arc<Self>>) {
        let _ = self.overridden.set(overridden);
    }

    fn create_fake_override(
        &self,
        owner: Container,
        visibility: Visibility,
        modality: Modality,
        substitutor: &TypeSubstitutor,
        overridden: Vec<Arc<Self>>,
    ) -> Result<Arc<Self>> {
        let receiver_type = self
            .receiver_type
            .as_ref()
            .map(|ty| substitutor.substitute(ty))
            .transpose()?;

        Ok(Arc::new(PropertyDescriptor {
            name: self.name.clone(),
            owner,
            visibility,
            modality,
            kind: MemberKind::FakeOverride,
            attributes: self.attributes,
            type_parameters: self.type_parameters.clone(),
            receiver_type,
            ty: substitutor.substitute(&self.ty)?,
            overridden: OnceLock::from(overridden),
        }))
    }
}

impl fmt::Debug for PropertyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDescriptor")
            .field("name", &self.name)
            .field("owner", &self.owner)
            .field("visibility", &self.visibility)
            .field("modality", &self.modality)
            .field("kind", &self.kind)
            .field("attributes", &self.attributes)
            .field("overridden", &self.overridden().len())
            .finish_non_exhaustive()
    }
}

/// A constructor.
pub struct ConstructorDescriptor {
    pub(crate) owner: Container,
    pub(crate) visibility: Visibility,
    pub(crate) is_primary: bool,
    pub(crate) synthesized: bool,
    pub(crate) attributes: ConstructorAttributes,
    pub(crate) value_parameters: Vec<ValueParameterDescriptor>,
    pub(crate) return_type: Type,
}

impl ConstructorDescriptor {
    /// The constructed class.
    #[must_use]
    pub fn owner(&self) -> &Container {
        &self.owner
    }

    /// Constructor visibility.
    #[must_use]
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// Returns `true` for the primary constructor.
    #[must_use]
    pub fn is_primary(&self) -> bool {
        self.is_primary
    }

    /// Returns `true` if the constructor was synthesized rather than read from metadata.
    #[must_use]
    pub fn is_synthesized(&self) -> bool {
        self.synthesized
    }

    /// Value parameters.
    #[must_use]
    pub fn value_parameters(&self) -> &[ValueParameterDescriptor] {
        &self.value_parameters
    }

    /// The default type of the constructed class.
    #[must_use]
    pub fn return_type(&self) -> &Type {
        &self.return_type
    }
}

impl fmt::Debug for ConstructorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructorDescriptor")
            .field("owner", &self.owner)
            .field("visibility", &self.visibility)
            .field("is_primary", &self.is_primary)
            .field("value_parameters", &self.value_parameters)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        descriptors::ClassRc,
        names::ClassId,
        test::{class_blob, module_from_blobs, TestModule},
    };

    /// `class Api` with a suspend operator extension, a vararg function and three properties.
    fn api() -> TestModule {
        let blob = class_blob(|e| {
            let string = e.class_type("kotlin/String");
            let int = e.class_type("kotlin/Int");
            let ints = e
                .class_type("kotlin/Array")
                .with_arguments(vec![int.clone()]);

            let invoke = e
                .function("invoke")
                .modifiers(FunctionModifiers::OPERATOR | FunctionModifiers::SUSPEND)
                .receiver(string.clone())
                .returns(int.clone())
                .build();
            let sum = e
                .function("sum")
                .vararg("values", ints, int.clone())
                .returns(int.clone())
                .build();
            let counter = e
                .property("counter", int.clone())
                .attributes(PropertyAttributes::IS_VAR | PropertyAttributes::IS_LATEINIT)
                .build();
            let limit = e
                .property("LIMIT", int)
                .attributes(PropertyAttributes::IS_CONST)
                .build();

            let mut b = e.class("a/Api");
            b.function_proto(invoke)
                .function_proto(sum)
                .property_proto(counter)
                .property_proto(limit)
                .property("label", string);
            b.build()
        });
        module_from_blobs(&[blob])
    }

    fn class(t: &TestModule) -> ClassRc {
        t.module.find_class(&ClassId::parse("a/Api")).unwrap().unwrap()
    }

    #[test]
    fn function_modifiers_and_receiver() {
        let t = api();
        let invoke = class(&t)
            .member_scope()
            .functions(&Name::identifier("invoke"), None)
            .unwrap();
        let invoke = &invoke[0];

        assert!(invoke.is_operator());
        assert!(invoke.is_suspend());
        assert!(!invoke.is_inline());
        assert_eq!(invoke.kind(), MemberKind::Declaration);
        assert_eq!(
            invoke.receiver_type().unwrap().render().unwrap(),
            "kotlin/String"
        );
        assert_eq!(invoke.return_type().render().unwrap(), "kotlin/Int");
        assert!(!invoke.is_override());
    }

    #[test]
    fn vararg_parameter_keeps_element_type() {
        let t = api();
        let sum = class(&t)
            .member_scope()
            .functions(&Name::identifier("sum"), None)
            .unwrap();
        let parameter = &sum[0].value_parameters()[0];

        assert_eq!(parameter.index(), 0);
        assert_eq!(parameter.name(), &Name::identifier("values"));
        assert!(parameter.is_vararg());
        assert_eq!(parameter.ty().render().unwrap(), "kotlin/Array<kotlin/Int>");
        assert_eq!(
            parameter.vararg_element_type().unwrap().render().unwrap(),
            "kotlin/Int"
        );
        assert!(!parameter.declares_default_value());
    }

    #[test]
    fn property_attributes() {
        let t = api();
        let scope = class(&t).member_scope();
        let property = |name: &str| {
            scope
                .properties(&Name::identifier(name), None)
                .unwrap()
                .remove(0)
        };

        let counter = property("counter");
        assert!(counter.is_var());
        assert!(counter.is_lateinit());
        assert!(!counter.is_const());

        let limit = property("LIMIT");
        assert!(limit.is_const());
        assert!(!limit.is_var());

        let label = property("label");
        assert!(label.attributes().is_empty());
        assert_eq!(label.ty().render().unwrap(), "kotlin/String");
    }

    #[test]
    fn copy_rejects_wrong_parameter_count() {
        let t = api();
        let sum = class(&t)
            .member_scope()
            .functions(&Name::identifier("sum"), None)
            .unwrap();

        let result = copy_value_parameters(Vec::new(), sum[0].value_parameters());
        assert!(matches!(
            result,
            Err(Error::ParameterCountMismatch {
                expected: 1,
                actual: 0
            })
        ));

        let retyped = copy_value_parameters(
            vec![ValueParameterData {
                ty: t.module.builtins().string_type().unwrap(),
                vararg_element_type: None,
            }],
            sum[0].value_parameters(),
        )
        .unwrap();
        assert_eq!(retyped[0].name(), &Name::identifier("values"));
        assert!(!retyped[0].is_vararg());
    }
}
