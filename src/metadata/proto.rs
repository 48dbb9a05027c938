//! Decoded (but unresolved) metadata messages.
//!
//! These structures mirror the binary format one to one. Every name is still an index into the
//! [`crate::metadata::NameResolver`] that came with the message and every type is still a
//! [`TypeProto`]; turning them into linked descriptors is the job of
//! [`crate::deserialization`]. Messages are immutable once decoded and shared behind `Arc`s, so
//! a lazily deserialized descriptor can keep the piece of the message it still needs.

use std::sync::Arc;

/// What a type refers to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeClassifier {
    /// A class, by qualified-name index
    Class(u32),
    /// A type parameter, by its numeric id
    TypeParameter(u32),
    /// A type parameter, by string index of its name
    TypeParameterName(u32),
}

/// Projection kind of one type argument.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProjectionKind {
    /// `in T`
    In,
    /// `out T`
    Out,
    /// `T`
    Inv,
    /// `*`
    Star,
}

/// One type argument.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArgumentProto {
    /// Projection of the argument
    pub projection: ProjectionKind,
    /// The argument type; always `None` for star projections
    pub ty: Option<TypeRef>,
}

/// A type use.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeProto {
    /// What the type refers to
    pub classifier: TypeClassifier,
    /// Arguments for the classifier's own type parameters, in declaration order
    pub arguments: Vec<ArgumentProto>,
    /// `T?`
    pub nullable: bool,
    /// Upper bound of a flexible type; this message is then the lower bound
    pub flexible_upper_bound: Option<TypeRef>,
    /// String index of the flexible type id, selecting the flexible-type semantics
    pub flexible_type_id: Option<u32>,
    /// Type of the outer class, carrying the arguments of an inner class' outer type parameters
    pub outer_type: Option<TypeRef>,
    /// The type is a raw (erased) use of a generic class
    pub raw: bool,
}

impl TypeProto {
    /// Creates a non-null class type without arguments.
    #[must_use]
    pub fn class(name_index: u32) -> Self {
        TypeProto {
            classifier: TypeClassifier::Class(name_index),
            arguments: Vec::new(),
            nullable: false,
            flexible_upper_bound: None,
            flexible_type_id: None,
            outer_type: None,
            raw: false,
        }
    }

    /// Creates a non-null type parameter type.
    #[must_use]
    pub fn type_parameter(id: u32) -> Self {
        TypeProto {
            classifier: TypeClassifier::TypeParameter(id),
            ..TypeProto::class(0)
        }
    }

    /// Returns the same type with its nullability replaced.
    #[must_use]
    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Returns the same type with `arguments` appended as invariant projections.
    #[must_use]
    pub fn with_arguments(mut self, arguments: Vec<TypeProto>) -> Self {
        self.arguments
            .extend(arguments.into_iter().map(|ty| ArgumentProto {
                projection: ProjectionKind::Inv,
                ty: Some(TypeRef::inline(ty)),
            }));
        self
    }
}

/// A type occurrence: either written inline or shared through the type table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeRef {
    /// The type message itself
    Inline(Arc<TypeProto>),
    /// Index into the [`crate::metadata::TypeTable`] of the blob
    Table(u32),
}

impl TypeRef {
    /// Wraps a type message.
    #[must_use]
    pub fn inline(ty: TypeProto) -> Self {
        TypeRef::Inline(Arc::new(ty))
    }
}

/// Declared variance of a type parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VarianceProto {
    /// `in T`
    In,
    /// `out T`
    Out,
    /// `T`
    Inv,
}

/// A type parameter declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeParameterProto {
    /// Id used by [`TypeClassifier::TypeParameter`]; unique within a blob
    pub id: u32,
    /// String index of the name
    pub name: u32,
    /// `reified T`
    pub reified: bool,
    /// Declared variance
    pub variance: VarianceProto,
    /// Declared upper bounds; empty means the default bound
    pub upper_bounds: Vec<TypeRef>,
}

/// A value parameter declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValueParameterProto {
    /// Flag word, see [`crate::metadata::flags::ValueParameterAttributes`]
    pub flags: u32,
    /// String index of the name
    pub name: u32,
    /// Parameter type (the array type for a vararg)
    pub ty: TypeRef,
    /// Element type of a `vararg` parameter
    pub vararg_element_type: Option<TypeRef>,
}

/// A function declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionProto {
    /// Flag word
    pub flags: u32,
    /// String index of the name
    pub name: u32,
    /// Own type parameters
    pub type_parameters: Vec<TypeParameterProto>,
    /// Extension receiver type
    pub receiver_type: Option<TypeRef>,
    /// Value parameters in declaration order
    pub value_parameters: Vec<ValueParameterProto>,
    /// Return type
    pub return_type: TypeRef,
}

/// A property declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropertyProto {
    /// Flag word
    pub flags: u32,
    /// String index of the name
    pub name: u32,
    /// Own type parameters
    pub type_parameters: Vec<TypeParameterProto>,
    /// Extension receiver type
    pub receiver_type: Option<TypeRef>,
    /// Property type
    pub return_type: TypeRef,
}

/// A constructor declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConstructorProto {
    /// Flag word
    pub flags: u32,
    /// Value parameters in declaration order
    pub value_parameters: Vec<ValueParameterProto>,
}

/// A class declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassProto {
    /// Flag word
    pub flags: u32,
    /// Qualified-name index of the class itself
    pub fq_name: u32,
    /// String index of the companion object's name
    pub companion_object_name: Option<u32>,
    /// Own type parameters (outer class parameters are not repeated)
    pub type_parameters: Vec<TypeParameterProto>,
    /// Declared supertypes in declaration order
    pub supertypes: Vec<TypeRef>,
    /// String indices of the directly nested classes
    pub nested_class_names: Vec<u32>,
    /// Constructors
    pub constructors: Vec<ConstructorProto>,
    /// Declared functions
    pub functions: Vec<FunctionProto>,
    /// Declared properties
    pub properties: Vec<PropertyProto>,
    /// String indices of enum entry names
    pub enum_entries: Vec<u32>,
}

/// Top-level declarations of one package part.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct PackageProto {
    /// Top-level functions
    pub functions: Vec<FunctionProto>,
    /// Top-level properties
    pub properties: Vec<PropertyProto>,
}
