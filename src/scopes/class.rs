//! Member scope of a deserialized class.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    sync::{Arc, Weak},
};

use crate::{
    deserialization::{DeserializationContext, MemberDeserializer},
    descriptors::{ClassRc, ClassRef, FunctionDescriptor, PropertyDescriptor},
    metadata::{proto::ClassProto, NameResolver},
    module::Module,
    names::{FqName, Name},
    scopes::{
        overrides::{resolve_members, ReportedEvents},
        MemberScope,
    },
    storage::{LazyValue, MemoizedFn},
    Result,
};

/// Declared members of a class plus fake overrides of everything it inherits.
///
/// Members are computed per name on first lookup and cached. A lookup that re-enters the
/// computation for the same name (possible only through a supertype loop) sees no members.
pub struct ClassMemberScope {
    module: Weak<Module>,
    class: ClassRef,
    ctx: Arc<DeserializationContext>,
    proto: Arc<ClassProto>,
    declared_functions: LazyValue<BTreeMap<Name, Vec<usize>>>,
    declared_properties: LazyValue<BTreeMap<Name, Vec<usize>>>,
    functions: MemoizedFn<Name, Vec<Arc<FunctionDescriptor>>>,
    properties: MemoizedFn<Name, Vec<Arc<PropertyDescriptor>>>,
    function_names: LazyValue<BTreeSet<Name>>,
    property_names: LazyValue<BTreeSet<Name>>,
    function_events: ReportedEvents,
    property_events: ReportedEvents,
}

impl ClassMemberScope {
    pub(crate) fn new(
        class: ClassRef,
        ctx: Arc<DeserializationContext>,
        proto: Arc<ClassProto>,
    ) -> Self {
        ClassMemberScope {
            module: ctx.module_ref(),
            class,
            ctx,
            proto,
            declared_functions: LazyValue::new("declared function index"),
            declared_properties: LazyValue::new("declared property index"),
            functions: MemoizedFn::recursion_tolerant("class functions", Vec::new()),
            properties: MemoizedFn::recursion_tolerant("class properties", Vec::new()),
            function_names: LazyValue::recursion_tolerant("class function names", BTreeSet::new()),
            property_names: LazyValue::recursion_tolerant("class property names", BTreeSet::new()),
            function_events: ReportedEvents::new(),
            property_events: ReportedEvents::new(),
        }
    }

    pub(crate) fn owner_fq_name(&self) -> FqName {
        self.class.class_id().as_single_fq_name()
    }

    pub(crate) fn module_ref(&self) -> &Weak<Module> {
        &self.module
    }

    fn owner(&self) -> Result<ClassRc> {
        self.class.upgrade()
    }

    fn declared_function_index(&self) -> Result<&BTreeMap<Name, Vec<usize>>> {
        self.declared_functions.get(|| {
            index_names(
                self.ctx.name_resolver(),
                self.proto.functions.iter().map(|function| function.name),
            )
        })
    }

    fn declared_property_index(&self) -> Result<&BTreeMap<Name, Vec<usize>>> {
        self.declared_properties.get(|| {
            index_names(
                self.ctx.name_resolver(),
                self.proto.properties.iter().map(|property| property.name),
            )
        })
    }

    /// Names of the functions and properties the class declares itself.
    pub(crate) fn declared_member_names(&self) -> Result<BTreeSet<Name>> {
        Ok(self
            .declared_function_index()?
            .keys()
            .chain(self.declared_property_index()?.keys())
            .cloned()
            .collect())
    }

    /// Functions named `name`, declared and inherited.
    ///
    /// # Errors
    /// Propagates resolution errors.
    pub fn functions(&self, name: &Name) -> Result<Vec<Arc<FunctionDescriptor>>> {
        self.functions.get_or_compute(name, |name| {
            let module = upgrade_module!(self.module);
            let class = self.owner()?;

            let deserializer = MemberDeserializer::new(&self.ctx);
            let mut declared = Vec::new();
            for &index in self.declared_function_index()?.get(name).into_iter().flatten() {
                declared.push(deserializer.function(&self.proto.functions[index])?);
            }

            resolve_members(
                &module,
                &class,
                name,
                declared,
                &self.function_events,
                |scope, name| scope.functions(name, None),
            )
        })
    }

    /// Properties named `name`, declared and inherited.
    ///
    /// # Errors
    /// Propagates resolution errors.
    pub fn properties(&self, name: &Name) -> Result<Vec<Arc<PropertyDescriptor>>> {
        self.properties.get_or_compute(name, |name| {
            let module = upgrade_module!(self.module);
            let class = self.owner()?;

            let deserializer = MemberDeserializer::new(&self.ctx);
            let mut declared = Vec::new();
            for &index in self.declared_property_index()?.get(name).into_iter().flatten() {
                declared.push(deserializer.property(&self.proto.properties[index])?);
            }

            resolve_members(
                &module,
                &class,
                name,
                declared,
                &self.property_events,
                |scope, name| scope.properties(name, None),
            )
        })
    }

    /// An enum entry or nested class named `name`. Enum entries shadow nested classes.
    ///
    /// # Errors
    /// Propagates resolution errors.
    pub fn classifier(&self, name: &Name) -> Result<Option<ClassRc>> {
        let class = self.owner()?;
        if let Some(entry) = class.enum_entry(name)? {
            return Ok(Some(entry));
        }
        if !class.nested_class_names().contains(name) {
            return Ok(None);
        }

        let module = upgrade_module!(self.module);
        module.find_class(&class.class_id().create_nested_class_id(name.clone()))
    }

    /// Names of all declared and inherited functions.
    ///
    /// # Errors
    /// Propagates resolution errors of the supertypes.
    pub fn function_names(&self) -> Result<&BTreeSet<Name>> {
        self.function_names.get(|| {
            let mut names: BTreeSet<Name> =
                self.declared_function_index()?.keys().cloned().collect();
            for scope in self.supertype_scopes()? {
                names.extend(scope.function_names()?);
            }
            Ok(names)
        })
    }

    /// Names of all declared and inherited properties.
    ///
    /// # Errors
    /// Propagates resolution errors of the supertypes.
    pub fn property_names(&self) -> Result<&BTreeSet<Name>> {
        self.property_names.get(|| {
            let mut names: BTreeSet<Name> =
                self.declared_property_index()?.keys().cloned().collect();
            for scope in self.supertype_scopes()? {
                names.extend(scope.property_names()?);
            }
            Ok(names)
        })
    }

    /// Names of the nested classes and enum entries.
    ///
    /// # Errors
    /// Returns [`crate::Error::ModuleReleased`] if the class is gone.
    pub fn classifier_names(&self) -> Result<BTreeSet<Name>> {
        let class = self.owner()?;
        Ok(class
            .nested_class_names()
            .iter()
            .chain(class.enum_entry_names())
            .cloned()
            .collect())
    }

    fn supertype_scopes(&self) -> Result<Vec<MemberScope>> {
        let class = self.owner()?;
        let mut scopes = Vec::new();
        for supertype in class.supertypes()? {
            if let Some(superclass) = supertype.class_descriptor()? {
                scopes.push(superclass.member_scope());
            }
        }
        Ok(scopes)
    }
}

impl fmt::Debug for ClassMemberScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassMemberScope")
            .field("class", &self.class)
            .field("functions", &self.functions)
            .field("properties", &self.properties)
            .finish_non_exhaustive()
    }
}

/// Groups member indices by resolved name.
pub(crate) fn index_names(
    resolver: &NameResolver,
    names: impl Iterator<Item = u32>,
) -> Result<BTreeMap<Name, Vec<usize>>> {
    let mut index: BTreeMap<Name, Vec<usize>> = BTreeMap::new();
    for (position, name) in names.enumerate() {
        index.entry(resolver.name(name)?).or_default().push(position);
    }
    Ok(index)
}
