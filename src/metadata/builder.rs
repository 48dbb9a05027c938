//! In-memory construction of metadata messages.
//!
//! The built-in declarations of a module are not read from a blob; they are assembled with
//! these builders against a private [`NameTableBuilder`]. The same builders are convenient for
//! producing test fixtures.
//!
//! Every builder borrows the name pools it interns into, so the indices in the finished
//! message are only meaningful together with the resolver built from those pools.

use crate::{
    metadata::{
        flags::{
            class_flags, member_flags, ClassAttributes, ClassKind, ConstructorAttributes,
            FunctionModifiers, MemberKind, Modality, PropertyAttributes, Visibility,
            VISIBILITY,
        },
        nameresolver::NameTableBuilder,
        proto::{
            ClassProto, ConstructorProto, FunctionProto, PackageProto, PropertyProto,
            TypeParameterProto, TypeProto, TypeRef, ValueParameterProto, VarianceProto,
        },
    },
    names::{ClassId, Name},
};

/// A non-null class type for the class written as `a/b/Outer.Inner`.
pub fn class_type(names: &mut NameTableBuilder, class_id: &str) -> TypeProto {
    TypeProto::class(names.class_id(&ClassId::parse(class_id)))
}

/// A type parameter declaration.
pub fn type_parameter(
    names: &mut NameTableBuilder,
    id: u32,
    name: &str,
    variance: VarianceProto,
    upper_bounds: Vec<TypeProto>,
) -> TypeParameterProto {
    TypeParameterProto {
        id,
        name: names.string(name),
        reified: false,
        variance,
        upper_bounds: upper_bounds.into_iter().map(TypeRef::inline).collect(),
    }
}

fn value_parameter(names: &mut NameTableBuilder, name: &str, ty: TypeProto) -> ValueParameterProto {
    ValueParameterProto {
        flags: 0,
        name: names.string(name),
        ty: TypeRef::inline(ty),
        vararg_element_type: None,
    }
}

/// Builds a [`FunctionProto`]; a fresh builder describes `public final fun name(): Unit`.
pub struct FunctionProtoBuilder<'a> {
    names: &'a mut NameTableBuilder,
    visibility: Visibility,
    modality: Modality,
    kind: MemberKind,
    modifiers: FunctionModifiers,
    proto: FunctionProto,
}

impl<'a> FunctionProtoBuilder<'a> {
    /// Starts a function named `name`.
    pub fn new(names: &'a mut NameTableBuilder, name: &str) -> Self {
        let name = names.name(&Name::identifier(name));
        let unit = class_type(names, "kotlin/Unit");
        FunctionProtoBuilder {
            names,
            visibility: Visibility::Public,
            modality: Modality::Final,
            kind: MemberKind::Declaration,
            modifiers: FunctionModifiers::empty(),
            proto: FunctionProto {
                flags: 0,
                name,
                type_parameters: Vec::new(),
                receiver_type: None,
                value_parameters: Vec::new(),
                return_type: TypeRef::inline(unit),
            },
        }
    }

    /// Sets the visibility.
    pub fn visibility(&mut self, visibility: Visibility) -> &mut Self {
        self.visibility = visibility;
        self
    }

    /// Sets the modality.
    pub fn modality(&mut self, modality: Modality) -> &mut Self {
        self.modality = modality;
        self
    }

    /// Sets the member kind.
    pub fn kind(&mut self, kind: MemberKind) -> &mut Self {
        self.kind = kind;
        self
    }

    /// Adds modifiers.
    pub fn modifiers(&mut self, modifiers: FunctionModifiers) -> &mut Self {
        self.modifiers |= modifiers;
        self
    }

    /// Declares an own type parameter.
    pub fn type_parameter(&mut self, id: u32, name: &str, upper_bounds: Vec<TypeProto>) -> &mut Self {
        let parameter = type_parameter(self.names, id, name, VarianceProto::Inv, upper_bounds);
        self.proto.type_parameters.push(parameter);
        self
    }

    /// Sets the extension receiver.
    pub fn receiver(&mut self, ty: TypeProto) -> &mut Self {
        self.proto.receiver_type = Some(TypeRef::inline(ty));
        self
    }

    /// Appends a value parameter.
    pub fn parameter(&mut self, name: &str, ty: TypeProto) -> &mut Self {
        let parameter = value_parameter(self.names, name, ty);
        self.proto.value_parameters.push(parameter);
        self
    }

    /// Appends a `vararg` parameter of array type `ty` with elements of type `element`.
    pub fn vararg(&mut self, name: &str, ty: TypeProto, element: TypeProto) -> &mut Self {
        let mut parameter = value_parameter(self.names, name, ty);
        parameter.vararg_element_type = Some(TypeRef::inline(element));
        self.proto.value_parameters.push(parameter);
        self
    }

    /// Sets the return type.
    pub fn returns(&mut self, ty: TypeProto) -> &mut Self {
        self.proto.return_type = TypeRef::inline(ty);
        self
    }

    /// A class type interned into the same pools.
    pub fn class_type(&mut self, class_id: &str) -> TypeProto {
        class_type(self.names, class_id)
    }

    /// Finishes the message.
    #[must_use]
    pub fn build(&self) -> FunctionProto {
        let mut proto = self.proto.clone();
        proto.flags =
            member_flags(self.visibility, self.modality, self.kind) | self.modifiers.bits();
        proto
    }
}

/// Builds a [`PropertyProto`]; a fresh builder describes `public final val name: ty`.
pub struct PropertyProtoBuilder<'a> {
    names: &'a mut NameTableBuilder,
    visibility: Visibility,
    modality: Modality,
    kind: MemberKind,
    attributes: PropertyAttributes,
    proto: PropertyProto,
}

impl<'a> PropertyProtoBuilder<'a> {
    /// Starts a property named `name` of type `ty`.
    pub fn new(names: &'a mut NameTableBuilder, name: &str, ty: TypeProto) -> Self {
        let name = names.name(&Name::identifier(name));
        PropertyProtoBuilder {
            names,
            visibility: Visibility::Public,
            modality: Modality::Final,
            kind: MemberKind::Declaration,
            attributes: PropertyAttributes::empty(),
            proto: PropertyProto {
                flags: 0,
                name,
                type_parameters: Vec::new(),
                receiver_type: None,
                return_type: TypeRef::inline(ty),
            },
        }
    }

    /// Sets the visibility.
    pub fn visibility(&mut self, visibility: Visibility) -> &mut Self {
        self.visibility = visibility;
        self
    }

    /// Sets the modality.
    pub fn modality(&mut self, modality: Modality) -> &mut Self {
        self.modality = modality;
        self
    }

    /// Sets the member kind.
    pub fn kind(&mut self, kind: MemberKind) -> &mut Self {
        self.kind = kind;
        self
    }

    /// Adds attributes.
    pub fn attributes(&mut self, attributes: PropertyAttributes) -> &mut Self {
        self.attributes |= attributes;
        self
    }

    /// Declares an own type parameter.
    pub fn type_parameter(&mut self, id: u32, name: &str, upper_bounds: Vec<TypeProto>) -> &mut Self {
        let parameter = type_parameter(self.names, id, name, VarianceProto::Inv, upper_bounds);
        self.proto.type_parameters.push(parameter);
        self
    }

    /// Sets the extension receiver.
    pub fn receiver(&mut self, ty: TypeProto) -> &mut Self {
        self.proto.receiver_type = Some(TypeRef::inline(ty));
        self
    }

    /// Finishes the message.
    #[must_use]
    pub fn build(&self) -> PropertyProto {
        let mut proto = self.proto.clone();
        proto.flags =
            member_flags(self.visibility, self.modality, self.kind) | self.attributes.bits();
        proto
    }
}

/// Builds a [`ClassProto`]; a fresh builder describes `public final class` without members.
///
/// # Examples
///
/// ```rust
/// use metascope::metadata::{builder::ClassProtoBuilder, flags::ClassKind, NameTableBuilder};
/// use metascope::names::ClassId;
///
/// let mut names = NameTableBuilder::new();
/// let mut builder = ClassProtoBuilder::new(&mut names, &ClassId::top_level("app", "Point"));
/// let int = builder.class_type("kotlin/Int");
/// builder.kind(ClassKind::Class).constructor(vec![("x", int.clone()), ("y", int.clone())]);
/// builder.property("x", int.clone()).property("y", int);
/// let proto = builder.build();
///
/// assert_eq!(proto.properties.len(), 2);
/// assert_eq!(proto.constructors.len(), 1);
/// ```
pub struct ClassProtoBuilder<'a> {
    names: &'a mut NameTableBuilder,
    visibility: Visibility,
    modality: Modality,
    kind: ClassKind,
    attributes: ClassAttributes,
    proto: ClassProto,
}

impl<'a> ClassProtoBuilder<'a> {
    /// Starts the class `class_id`.
    pub fn new(names: &'a mut NameTableBuilder, class_id: &ClassId) -> Self {
        let fq_name = names.class_id(class_id);
        ClassProtoBuilder {
            names,
            visibility: Visibility::Public,
            modality: Modality::Final,
            kind: ClassKind::Class,
            attributes: ClassAttributes::empty(),
            proto: ClassProto {
                flags: 0,
                fq_name,
                companion_object_name: None,
                type_parameters: Vec::new(),
                supertypes: Vec::new(),
                nested_class_names: Vec::new(),
                constructors: Vec::new(),
                functions: Vec::new(),
                properties: Vec::new(),
                enum_entries: Vec::new(),
            },
        }
    }

    /// Sets the class kind.
    pub fn kind(&mut self, kind: ClassKind) -> &mut Self {
        self.kind = kind;
        self
    }

    /// Sets the modality.
    pub fn modality(&mut self, modality: Modality) -> &mut Self {
        self.modality = modality;
        self
    }

    /// Sets the visibility.
    pub fn visibility(&mut self, visibility: Visibility) -> &mut Self {
        self.visibility = visibility;
        self
    }

    /// Adds attributes.
    pub fn attributes(&mut self, attributes: ClassAttributes) -> &mut Self {
        self.attributes |= attributes;
        self
    }

    /// Declares an own type parameter.
    pub fn type_parameter(
        &mut self,
        id: u32,
        name: &str,
        variance: VarianceProto,
        upper_bounds: Vec<TypeProto>,
    ) -> &mut Self {
        let parameter = type_parameter(self.names, id, name, variance, upper_bounds);
        self.proto.type_parameters.push(parameter);
        self
    }

    /// Appends a supertype.
    pub fn supertype(&mut self, ty: TypeProto) -> &mut Self {
        self.proto.supertypes.push(TypeRef::inline(ty));
        self
    }

    /// Appends a supertype given as a raw reference (test-only).
    #[cfg(test)]
    pub(crate) fn supertype_ref(&mut self, ty: TypeRef) -> &mut Self {
        self.proto.supertypes.push(ty);
        self
    }

    /// Lists a nested class.
    pub fn nested_class(&mut self, name: &str) -> &mut Self {
        let name = self.names.name(&Name::identifier(name));
        self.proto.nested_class_names.push(name);
        self
    }

    /// Names the companion object; the companion must also be listed as a nested class.
    pub fn companion_object(&mut self, name: &str) -> &mut Self {
        let name = self.names.name(&Name::identifier(name));
        self.proto.companion_object_name = Some(name);
        self
    }

    /// Appends an enum entry.
    pub fn enum_entry(&mut self, name: &str) -> &mut Self {
        let name = self.names.name(&Name::identifier(name));
        self.proto.enum_entries.push(name);
        self
    }

    /// Appends a public primary constructor.
    pub fn constructor(&mut self, parameters: Vec<(&str, TypeProto)>) -> &mut Self {
        self.push_constructor(parameters, ConstructorAttributes::empty())
    }

    /// Appends a public secondary constructor.
    pub fn secondary_constructor(&mut self, parameters: Vec<(&str, TypeProto)>) -> &mut Self {
        self.push_constructor(parameters, ConstructorAttributes::IS_SECONDARY)
    }

    fn push_constructor(
        &mut self,
        parameters: Vec<(&str, TypeProto)>,
        attributes: ConstructorAttributes,
    ) -> &mut Self {
        let value_parameters = parameters
            .into_iter()
            .map(|(name, ty)| value_parameter(self.names, name, ty))
            .collect();
        self.proto.constructors.push(ConstructorProto {
            flags: VISIBILITY.set(0, Visibility::Public.code()) | attributes.bits(),
            value_parameters,
        });
        self
    }

    /// Appends `public final fun name(): Unit`.
    pub fn function(&mut self, name: &str) -> &mut Self {
        let proto = FunctionProtoBuilder::new(self.names, name).build();
        self.function_proto(proto)
    }

    /// Appends a finished function message.
    pub fn function_proto(&mut self, proto: FunctionProto) -> &mut Self {
        self.proto.functions.push(proto);
        self
    }

    /// Appends `public final val name: ty`.
    pub fn property(&mut self, name: &str, ty: TypeProto) -> &mut Self {
        let proto = PropertyProtoBuilder::new(self.names, name, ty).build();
        self.property_proto(proto)
    }

    /// Appends a finished property message.
    pub fn property_proto(&mut self, proto: PropertyProto) -> &mut Self {
        self.proto.properties.push(proto);
        self
    }

    /// A class type interned into the same pools.
    pub fn class_type(&mut self, class_id: &str) -> TypeProto {
        class_type(self.names, class_id)
    }

    /// The pools this builder interns into.
    pub fn names(&mut self) -> &mut NameTableBuilder {
        self.names
    }

    /// Finishes the message.
    #[must_use]
    pub fn build(&self) -> ClassProto {
        let mut proto = self.proto.clone();
        proto.flags =
            class_flags(self.visibility, self.modality, self.kind) | self.attributes.bits();
        proto
    }
}

/// Builds the top-level declarations of a package part.
pub struct PackageProtoBuilder<'a> {
    names: &'a mut NameTableBuilder,
    proto: PackageProto,
}

impl<'a> PackageProtoBuilder<'a> {
    /// Starts an empty package part.
    pub fn new(names: &'a mut NameTableBuilder) -> Self {
        PackageProtoBuilder {
            names,
            proto: PackageProto::default(),
        }
    }

    /// Appends `public final fun name(): Unit`.
    pub fn function(&mut self, name: &str) -> &mut Self {
        let proto = FunctionProtoBuilder::new(self.names, name).build();
        self.function_proto(proto)
    }

    /// Appends a finished function message.
    pub fn function_proto(&mut self, proto: FunctionProto) -> &mut Self {
        self.proto.functions.push(proto);
        self
    }

    /// Appends `public final val name: ty`.
    pub fn property(&mut self, name: &str, ty: TypeProto) -> &mut Self {
        let proto = PropertyProtoBuilder::new(self.names, name, ty).build();
        self.property_proto(proto)
    }

    /// Appends a finished property message.
    pub fn property_proto(&mut self, proto: PropertyProto) -> &mut Self {
        self.proto.properties.push(proto);
        self
    }

    /// A class type interned into the same pools.
    pub fn class_type(&mut self, class_id: &str) -> TypeProto {
        class_type(self.names, class_id)
    }

    /// Finishes the message.
    #[must_use]
    pub fn build(&self) -> PackageProto {
        self.proto.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_flags_round_trip_through_builder() {
        let mut names = NameTableBuilder::new();
        let proto = ClassProtoBuilder::new(&mut names, &ClassId::top_level("a", "E"))
            .kind(ClassKind::EnumClass)
            .modality(Modality::Open)
            .attributes(ClassAttributes::IS_DATA)
            .build();

        assert_eq!(ClassKind::from_flags(proto.flags), ClassKind::EnumClass);
        assert_eq!(Modality::from_flags(proto.flags), Modality::Open);
        assert_eq!(Visibility::from_flags(proto.flags), Visibility::Public);
        assert!(ClassAttributes::from_class_flags(proto.flags).contains(ClassAttributes::IS_DATA));

        let resolver = names.build();
        assert_eq!(
            resolver.class_id(proto.fq_name).unwrap(),
            ClassId::top_level("a", "E")
        );
    }

    #[test]
    fn secondary_constructors_are_flagged() {
        let mut names = NameTableBuilder::new();
        let mut builder = ClassProtoBuilder::new(&mut names, &ClassId::top_level("a", "C"));
        let int = builder.class_type("kotlin/Int");
        let proto = builder
            .constructor(vec![("x", int)])
            .secondary_constructor(vec![])
            .build();

        let secondary: Vec<bool> = proto
            .constructors
            .iter()
            .map(|c| {
                ConstructorAttributes::from_constructor_flags(c.flags)
                    .contains(ConstructorAttributes::IS_SECONDARY)
            })
            .collect();
        assert_eq!(secondary, vec![false, true]);
        assert_eq!(Visibility::from_flags(proto.constructors[1].flags), Visibility::Public);
    }

    #[test]
    fn function_builder_defaults_to_unit() {
        let mut names = NameTableBuilder::new();
        let proto = FunctionProtoBuilder::new(&mut names, "run")
            .modality(Modality::Abstract)
            .modifiers(FunctionModifiers::SUSPEND)
            .build();

        assert_eq!(Modality::from_flags(proto.flags), Modality::Abstract);
        assert_eq!(MemberKind::from_flags(proto.flags), MemberKind::Declaration);
        assert!(FunctionModifiers::from_function_flags(proto.flags).contains(FunctionModifiers::SUSPEND));

        let resolver = names.build();
        assert_eq!(resolver.string(proto.name).unwrap(), "run");
        match &proto.return_type {
            TypeRef::Inline(ty) => match ty.classifier {
                crate::metadata::proto::TypeClassifier::Class(index) => {
                    assert_eq!(resolver.class_id(index).unwrap(), ClassId::top_level("kotlin", "Unit"));
                }
                ref other => panic!("unexpected classifier {other:?}"),
            },
            TypeRef::Table(_) => panic!("expected an inline type"),
        }
    }
}
