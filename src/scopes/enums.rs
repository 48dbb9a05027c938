//! Scopes synthesized for enum classes and their entries.

use std::{
    collections::BTreeSet,
    fmt,
    sync::{Arc, OnceLock, Weak},
};

use crate::{
    descriptors::{
        ClassRc, ClassRef, Container, FunctionDescriptor, PropertyDescriptor,
        ValueParameterDescriptor,
    },
    metadata::flags::{
        FunctionModifiers, MemberKind, Modality, ValueParameterAttributes, Visibility,
    },
    module::Module,
    names::{FqName, Name},
    scopes::overrides::{resolve_members, ReportedEvents},
    storage::{LazyValue, MemoizedFn},
    types::Type,
    Result,
};

/// Member scope of an enum entry class.
///
/// An entry declares nothing itself; its members are the fake overrides of its enum class,
/// restricted to the member names the enum class shares among all its entries.
pub struct EnumEntryScope {
    module: Weak<Module>,
    entry: ClassRef,
    enum_class: ClassRef,
    functions: MemoizedFn<Name, Vec<Arc<FunctionDescriptor>>>,
    properties: MemoizedFn<Name, Vec<Arc<PropertyDescriptor>>>,
    function_events: ReportedEvents,
    property_events: ReportedEvents,
}

impl EnumEntryScope {
    pub(crate) fn new(module: Weak<Module>, entry: ClassRef, enum_class: ClassRef) -> Self {
        EnumEntryScope {
            module,
            entry,
            enum_class,
            functions: MemoizedFn::recursion_tolerant("enum entry functions", Vec::new()),
            properties: MemoizedFn::recursion_tolerant("enum entry properties", Vec::new()),
            function_events: ReportedEvents::new(),
            property_events: ReportedEvents::new(),
        }
    }

    pub(crate) fn owner_fq_name(&self) -> FqName {
        self.entry.class_id().as_single_fq_name()
    }

    pub(crate) fn module_ref(&self) -> &Weak<Module> {
        &self.module
    }

    fn member_names(&self) -> Result<Arc<BTreeSet<Name>>> {
        let enum_class = self.enum_class.upgrade()?;
        match enum_class.as_deserialized() {
            Some(class) => class.enum_member_names(),
            None => Ok(Arc::new(BTreeSet::new())),
        }
    }

    fn entry(&self) -> Result<ClassRc> {
        self.entry.upgrade()
    }

    /// Inherited functions named `name`.
    ///
    /// # Errors
    /// Propagates resolution errors.
    pub fn functions(&self, name: &Name) -> Result<Vec<Arc<FunctionDescriptor>>> {
        if !self.member_names()?.contains(name) {
            return Ok(Vec::new());
        }
        self.functions.get_or_compute(name, |name| {
            let module = upgrade_module!(self.module);
            resolve_members(
                &module,
                &self.entry()?,
                name,
                Vec::new(),
                &self.function_events,
                |scope, name| scope.functions(name, None),
            )
        })
    }

    /// Inherited properties named `name`.
    ///
    /// # Errors
    /// Propagates resolution errors.
    pub fn properties(&self, name: &Name) -> Result<Vec<Arc<PropertyDescriptor>>> {
        if !self.member_names()?.contains(name) {
            return Ok(Vec::new());
        }
        self.properties.get_or_compute(name, |name| {
            let module = upgrade_module!(self.module);
            resolve_members(
                &module,
                &self.entry()?,
                name,
                Vec::new(),
                &self.property_events,
                |scope, name| scope.properties(name, None),
            )
        })
    }

    /// Function names shared by all entries.
    ///
    /// # Errors
    /// Propagates resolution errors of the enum class.
    pub fn function_names(&self) -> Result<BTreeSet<Name>> {
        let members = self.member_names()?;
        let enum_class = self.enum_class.upgrade()?;
        Ok(enum_class
            .member_scope()
            .function_names()?
            .into_iter()
            .filter(|name| members.contains(name))
            .collect())
    }

    /// Property names shared by all entries.
    ///
    /// # Errors
    /// Propagates resolution errors of the enum class.
    pub fn property_names(&self) -> Result<BTreeSet<Name>> {
        let members = self.member_names()?;
        let enum_class = self.enum_class.upgrade()?;
        Ok(enum_class
            .member_scope()
            .property_names()?
            .into_iter()
            .filter(|name| members.contains(name))
            .collect())
    }
}

impl fmt::Debug for EnumEntryScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnumEntryScope")
            .field("entry", &self.entry)
            .field("enum_class", &self.enum_class)
            .finish_non_exhaustive()
    }
}

/// Static scope of an enum class: the synthesized `values()` and `valueOf(value: String)`.
pub struct EnumStaticScope {
    module: Weak<Module>,
    enum_class: ClassRef,
    functions: LazyValue<Vec<Arc<FunctionDescriptor>>>,
}

impl EnumStaticScope {
    pub(crate) fn new(module: Weak<Module>, enum_class: ClassRef) -> Self {
        EnumStaticScope {
            module,
            enum_class,
            functions: LazyValue::new("enum static functions"),
        }
    }

    fn synthesized(&self) -> Result<&[Arc<FunctionDescriptor>]> {
        self.functions
            .get(|| {
                let module = upgrade_module!(self.module);
                let enum_type = self.enum_class.upgrade()?.default_type()?;
                let builtins = module.builtins();

                let values = synthesized_function(
                    &self.enum_class,
                    Name::identifier("values"),
                    Vec::new(),
                    builtins.array_type(enum_type.clone())?,
                );
                let value_of = synthesized_function(
                    &self.enum_class,
                    Name::identifier("valueOf"),
                    vec![ValueParameterDescriptor {
                        index: 0,
                        name: Name::identifier("value"),
                        ty: builtins.string_type()?,
                        vararg_element_type: None,
                        attributes: ValueParameterAttributes::empty(),
                    }],
                    enum_type,
                );
                Ok(vec![values, value_of])
            })
            .map(Vec::as_slice)
    }

    /// `values` or `valueOf`, if `name` is one of them.
    ///
    /// # Errors
    /// Propagates resolution errors of the built-in types.
    pub fn functions(&self, name: &Name) -> Result<Vec<Arc<FunctionDescriptor>>> {
        Ok(self
            .synthesized()?
            .iter()
            .filter(|function| &function.name == name)
            .cloned()
            .collect())
    }

    /// `{valueOf, values}`
    #[must_use]
    pub fn function_names(&self) -> BTreeSet<Name> {
        BTreeSet::from([Name::identifier("values"), Name::identifier("valueOf")])
    }
}

impl fmt::Debug for EnumStaticScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnumStaticScope")
            .field("enum_class", &self.enum_class)
            .finish_non_exhaustive()
    }
}

fn synthesized_function(
    owner: &ClassRef,
    name: Name,
    value_parameters: Vec<ValueParameterDescriptor>,
    return_type: Type,
) -> Arc<FunctionDescriptor> {
    Arc::new(FunctionDescriptor {
        name,
        owner: Container::Class(owner.clone()),
        visibility: Visibility::Public,
        modality: Modality::Final,
        kind: MemberKind::Synthesized,
        modifiers: FunctionModifiers::empty(),
        type_parameters: Vec::new(),
        receiver_type: None,
        value_parameters,
        return_type,
        overridden: OnceLock::from(Vec::new()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        descriptors::CallableMember,
        metadata::flags::ClassKind,
        names::ClassId,
        reporting::LookupLocation,
        test::{class_blob, module_from_blobs, TestModule},
    };

    /// `enum class Color { RED, GREEN; open fun describe(): String }`
    fn color() -> TestModule {
        let blob = class_blob(|e| {
            let string = e.class_type("kotlin/String");
            let describe = e
                .function("describe")
                .modality(Modality::Open)
                .returns(string)
                .build();
            let color = e.class_type("a/Color");
            let enum_type = e.class_type("kotlin/Enum").with_arguments(vec![color]);
            let mut b = e.class("a/Color");
            b.kind(ClassKind::EnumClass)
                .supertype(enum_type)
                .enum_entry("RED")
                .enum_entry("GREEN")
                .function_proto(describe);
            b.build()
        });
        module_from_blobs(&[blob])
    }

    fn color_class(t: &TestModule) -> ClassRc {
        t.module
            .find_class(&ClassId::parse("a/Color"))
            .unwrap()
            .unwrap()
    }

    #[test]
    fn static_scope_synthesizes_values_and_value_of() {
        let t = color();
        let color = color_class(&t);
        let statics = color.static_scope();

        assert_eq!(
            statics.function_names().unwrap(),
            BTreeSet::from([Name::identifier("valueOf"), Name::identifier("values")])
        );

        let values = statics.functions(&Name::identifier("values"), None).unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].kind(), MemberKind::Synthesized);
        assert_eq!(
            values[0].return_type().render().unwrap(),
            "kotlin/Array<a/Color>"
        );

        let value_of = statics.functions(&Name::identifier("valueOf"), None).unwrap();
        assert_eq!(
            value_of[0].value_parameters()[0].ty().render().unwrap(),
            "kotlin/String"
        );
        assert_eq!(value_of[0].return_type().render().unwrap(), "a/Color");
        assert!(statics
            .functions(&Name::identifier("describe"), None)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn static_scope_lookups_are_not_tracked() {
        let t = color();
        let color = color_class(&t);
        let location = LookupLocation::file("Main.kt");

        let values = color
            .static_scope()
            .functions(&Name::identifier("values"), Some(&location))
            .unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(t.tracker.count(), 0);

        color
            .member_scope()
            .functions(&Name::identifier("describe"), Some(&location))
            .unwrap();
        assert_eq!(t.tracker.count(), 1);
    }

    #[test]
    fn enum_class_gets_synthesized_constructor() {
        let t = color();
        let primary = color_class(&t).primary_constructor().unwrap().unwrap();
        assert!(primary.is_synthesized());
        assert_eq!(primary.visibility(), Visibility::Private);
    }

    #[test]
    fn entries_are_singletons_nested_in_the_enum() {
        let t = color();
        let color = color_class(&t);

        let red = color.enum_entry(&Name::identifier("RED")).unwrap().unwrap();
        let again = color
            .member_scope()
            .classifier(&Name::identifier("RED"), None)
            .unwrap()
            .unwrap();
        assert!(Arc::ptr_eq(&red, &again));
        assert_eq!(red.class_id(), &ClassId::parse("a/Color.RED"));
        assert_eq!(red.kind(), ClassKind::EnumEntry);
        assert!(color.enum_entry(&Name::identifier("BLUE")).unwrap().is_none());

        let supertypes = red.supertypes().unwrap();
        assert_eq!(supertypes.len(), 1);
        assert_eq!(supertypes[0].render().unwrap(), "a/Color");

        let constructor = red.primary_constructor().unwrap().unwrap();
        assert_eq!(constructor.visibility(), Visibility::Private);
        assert!(constructor.value_parameters().is_empty());
    }

    #[test]
    fn entry_scope_exposes_enum_members_as_fake_overrides() {
        let t = color();
        let color = color_class(&t);
        let green = color
            .enum_entry(&Name::identifier("GREEN"))
            .unwrap()
            .unwrap();
        let scope = green.member_scope();

        let describe = scope
            .functions(&Name::identifier("describe"), None)
            .unwrap();
        assert_eq!(describe.len(), 1);
        assert_eq!(describe[0].kind(), MemberKind::FakeOverride);
        assert!(matches!(
            describe[0].owner(),
            Container::Class(owner) if owner.points_to(&green)
        ));
        assert_eq!(describe[0].overridden()[0].owner().fq_name(), FqName::new("a.Color"));

        let name = scope.properties(&Name::identifier("name"), None).unwrap();
        assert_eq!(name.len(), 1);
        assert_eq!(name[0].return_type().render().unwrap(), "kotlin/String");

        assert!(scope.function_names().unwrap().contains(&Name::identifier("describe")));
        assert!(scope.property_names().unwrap().contains(&Name::identifier("ordinal")));
        assert!(scope
            .functions(&Name::identifier("unknown"), None)
            .unwrap()
            .is_empty());
    }
}
