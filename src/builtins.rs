//! Built-in declarations every module can resolve.
//!
//! The built-in classes (`kotlin.Any`, `kotlin.String`, `kotlin.Enum`, ...) are described by
//! in-memory messages served by a finder that the module appends after all user finders. User
//! metadata for a built-in id therefore takes precedence, and the built-in classes are
//! resolved, cached and identified exactly like any other class.
//!
//! [`BuiltIns`] is owned by the module and hands out the types the resolver itself needs: the
//! default upper bound `Any?`, the supertype of not-found placeholders, and the types of
//! synthesized enum members.

use std::{
    fmt,
    sync::{Arc, Weak},
};

use strum::{EnumCount, EnumIter, IntoEnumIterator};

use crate::{
    config::ResolverConfig,
    descriptors::{ClassRc, ClassRef},
    locator::{ClassData, MemoryClassFinder, SourceElement},
    metadata::{
        builder::{class_type, ClassProtoBuilder, FunctionProtoBuilder},
        flags::{ClassKind, Modality},
        proto::{ClassProto, TypeProto, VarianceProto},
        NameTableBuilder, TypeTable,
    },
    module::Module,
    names::ClassId,
    storage::LazyValue,
    types::{SimpleType, Type, TypeCapabilities, TypeConstructor, TypeProjection},
    Result,
};

/// Package of all built-in classes.
pub const BUILT_INS_PACKAGE: &str = "kotlin";

/// The built-in classes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, EnumCount, strum::Display)]
pub enum BuiltInClass {
    /// Root of the class hierarchy
    Any,
    /// The bottom type
    Nothing,
    /// The unit object
    Unit,
    /// Booleans
    Boolean,
    /// 32-bit integers
    Int,
    /// Strings
    String,
    /// `Array<T>`
    Array,
    /// `Enum<E : Enum<E>>`, supertype of every enum class
    Enum,
}

impl BuiltInClass {
    /// The id of this class, e.g. `kotlin/Any`.
    #[must_use]
    pub fn class_id(self) -> ClassId {
        ClassId::top_level(BUILT_INS_PACKAGE, &self.to_string())
    }

    /// Number of type parameters.
    #[must_use]
    pub fn arity(self) -> usize {
        match self {
            BuiltInClass::Array | BuiltInClass::Enum => 1,
            _ => 0,
        }
    }
}

/// Built-in types of one module.
pub struct BuiltIns {
    module: Weak<Module>,
    any_type: LazyValue<Type>,
    nullable_any_type: LazyValue<Type>,
    string_type: LazyValue<Type>,
}

impl BuiltIns {
    pub(crate) fn new(module: Weak<Module>) -> Self {
        BuiltIns {
            module,
            any_type: LazyValue::new("kotlin.Any type"),
            nullable_any_type: LazyValue::new("kotlin.Any? type"),
            string_type: LazyValue::new("kotlin.String type"),
        }
    }

    /// The class descriptor of `class`.
    ///
    /// Resolves through the module, so user metadata for the same id wins. Falls back to a
    /// not-found placeholder should the built-in finder have been shadowed by an unreadable
    /// entry.
    ///
    /// # Errors
    /// Propagates resolution errors, and returns [`crate::Error::ModuleReleased`] if the
    /// module is gone.
    pub fn class(&self, class: BuiltInClass) -> Result<ClassRc> {
        let module = upgrade_module!(self.module);
        let class_id = class.class_id();
        match module.find_class(&class_id)? {
            Some(descriptor) => Ok(descriptor),
            None => module.not_found_classes().get(&class_id, &[class.arity()]),
        }
    }

    fn class_type(
        &self,
        class: BuiltInClass,
        arguments: Vec<TypeProjection>,
        nullable: bool,
    ) -> Result<Type> {
        let descriptor = self.class(class)?;
        Ok(Type::Simple(SimpleType::resolved(
            TypeConstructor::Class(ClassRef::new(&descriptor)),
            arguments,
            nullable,
            TypeCapabilities::empty(),
        )))
    }

    /// `kotlin.Any`
    ///
    /// # Errors
    /// See [`BuiltIns::class`].
    pub fn any_type(&self) -> Result<Type> {
        self.any_type
            .get(|| self.class_type(BuiltInClass::Any, Vec::new(), false))
            .cloned()
    }

    /// `kotlin.Any?`, the upper bound of a type parameter without declared bounds.
    ///
    /// # Errors
    /// See [`BuiltIns::class`].
    pub fn default_bound(&self) -> Result<Type> {
        self.nullable_any_type
            .get(|| self.class_type(BuiltInClass::Any, Vec::new(), true))
            .cloned()
    }

    /// `kotlin.String`
    ///
    /// # Errors
    /// See [`BuiltIns::class`].
    pub fn string_type(&self) -> Result<Type> {
        self.string_type
            .get(|| self.class_type(BuiltInClass::String, Vec::new(), false))
            .cloned()
    }

    /// `kotlin.Array<element>`
    ///
    /// # Errors
    /// See [`BuiltIns::class`].
    pub fn array_type(&self, element: Type) -> Result<Type> {
        self.class_type(
            BuiltInClass::Array,
            vec![TypeProjection::invariant(element)],
            false,
        )
    }

    /// The simple type of a class without arguments, e.g. `kotlin.Unit`.
    ///
    /// # Errors
    /// See [`BuiltIns::class`].
    pub fn simple_type(&self, class: BuiltInClass) -> Result<Type> {
        self.class_type(class, Vec::new(), false)
    }
}

impl fmt::Debug for BuiltIns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuiltIns")
            .field("any_type", &self.any_type.is_computed())
            .field("string_type", &self.string_type.is_computed())
            .finish_non_exhaustive()
    }
}

/// The finder serving the built-in class messages.
///
/// All messages share one set of name pools.
pub(crate) fn built_ins_finder(config: ResolverConfig) -> Result<MemoryClassFinder> {
    let mut names = NameTableBuilder::new();
    let protos: Vec<_> = BuiltInClass::iter()
        .map(|class| built_in_proto(&mut names, class))
        .collect();

    let name_resolver = Arc::new(names.build());
    let type_table = Arc::new(TypeTable::new(Vec::new()));
    let finder = MemoryClassFinder::with_source(config, SourceElement::BuiltIns);
    for proto in protos {
        finder.add_class(ClassData {
            name_resolver: Arc::clone(&name_resolver),
            type_table: Arc::clone(&type_table),
            proto: Arc::new(proto),
            source: SourceElement::BuiltIns,
        })?;
    }
    Ok(finder)
}

fn built_in_proto(names: &mut NameTableBuilder, class: BuiltInClass) -> ClassProto {
    let any = class_type(names, "kotlin/Any");
    let int = class_type(names, "kotlin/Int");
    let string = class_type(names, "kotlin/String");
    let boolean = class_type(names, "kotlin/Boolean");

    match class {
        BuiltInClass::Any => {
            let equals = FunctionProtoBuilder::new(names, "equals")
                .modality(Modality::Open)
                .parameter("other", any.clone().with_nullable(true))
                .returns(boolean)
                .build();
            let hash_code = FunctionProtoBuilder::new(names, "hashCode")
                .modality(Modality::Open)
                .returns(int)
                .build();
            let to_string = FunctionProtoBuilder::new(names, "toString")
                .modality(Modality::Open)
                .returns(string)
                .build();
            ClassProtoBuilder::new(names, &class.class_id())
                .modality(Modality::Open)
                .constructor(Vec::new())
                .function_proto(equals)
                .function_proto(hash_code)
                .function_proto(to_string)
                .build()
        }
        BuiltInClass::Nothing => ClassProtoBuilder::new(names, &class.class_id()).build(),
        BuiltInClass::Unit => ClassProtoBuilder::new(names, &class.class_id())
            .kind(ClassKind::Object)
            .supertype(any)
            .build(),
        BuiltInClass::Boolean => {
            let not = FunctionProtoBuilder::new(names, "not").returns(boolean).build();
            ClassProtoBuilder::new(names, &class.class_id())
                .supertype(any)
                .function_proto(not)
                .build()
        }
        BuiltInClass::Int => {
            let plus = FunctionProtoBuilder::new(names, "plus")
                .parameter("other", int.clone())
                .returns(int)
                .build();
            ClassProtoBuilder::new(names, &class.class_id())
                .supertype(any)
                .function_proto(plus)
                .build()
        }
        BuiltInClass::String => {
            let plus = FunctionProtoBuilder::new(names, "plus")
                .parameter("other", any.clone().with_nullable(true))
                .returns(string)
                .build();
            ClassProtoBuilder::new(names, &class.class_id())
                .supertype(any)
                .constructor(Vec::new())
                .property("length", int)
                .function_proto(plus)
                .build()
        }
        BuiltInClass::Array => {
            let element = TypeProto::type_parameter(0);
            let get = FunctionProtoBuilder::new(names, "get")
                .parameter("index", int.clone())
                .returns(element.clone())
                .build();
            let set = FunctionProtoBuilder::new(names, "set")
                .parameter("index", int.clone())
                .parameter("value", element)
                .build();
            ClassProtoBuilder::new(names, &class.class_id())
                .type_parameter(0, "T", VarianceProto::Inv, Vec::new())
                .supertype(any)
                .constructor(vec![("size", int.clone())])
                .property("size", int)
                .function_proto(get)
                .function_proto(set)
                .build()
        }
        BuiltInClass::Enum => {
            let self_bound = class_type(names, "kotlin/Enum")
                .with_arguments(vec![TypeProto::type_parameter(0)]);
            ClassProtoBuilder::new(names, &class.class_id())
                .modality(Modality::Abstract)
                .type_parameter(0, "E", VarianceProto::Inv, vec![self_bound])
                .supertype(any)
                .constructor(vec![("name", string.clone()), ("ordinal", int.clone())])
                .property("name", string)
                .property("ordinal", int)
                .build()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::ClassDataFinder;

    #[test]
    fn built_in_ids_live_in_kotlin_package() {
        assert_eq!(BuiltInClass::Any.class_id(), ClassId::top_level("kotlin", "Any"));
        assert_eq!(BuiltInClass::Array.class_id().to_string(), "kotlin/Array");
        assert_eq!(BuiltInClass::COUNT, 8);
    }

    #[test]
    fn finder_serves_every_built_in() {
        let finder = built_ins_finder(ResolverConfig::default()).unwrap();
        for class in BuiltInClass::iter() {
            let data = finder.find_class_data(&class.class_id()).unwrap().unwrap();
            assert_eq!(data.source, SourceElement::BuiltIns);
            assert_eq!(data.proto.type_parameters.len(), class.arity(), "{class}");
        }
    }

    #[test]
    fn any_declares_the_universal_members() {
        let finder = built_ins_finder(ResolverConfig::default()).unwrap();
        let data = finder
            .find_class_data(&BuiltInClass::Any.class_id())
            .unwrap()
            .unwrap();
        let names: Vec<&str> = data
            .proto
            .functions
            .iter()
            .map(|function| data.name_resolver.string(function.name).unwrap())
            .collect();
        assert_eq!(names, vec!["equals", "hashCode", "toString"]);
        assert!(data.proto.supertypes.is_empty());
    }
}
