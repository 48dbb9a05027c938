//! Member scope of a package fragment.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    sync::{Arc, Weak},
};

use crate::{
    deserialization::{DeserializationContext, MemberDeserializer},
    descriptors::{ClassRc, FunctionDescriptor, PropertyDescriptor},
    metadata::proto::PackageProto,
    module::Module,
    names::{ClassId, FqName, Name},
    scopes::class::index_names,
    storage::{LazyValue, MemoizedFn},
    Result,
};

/// One package part: the top-level declarations of one blob, with the context to read them.
#[derive(Clone, Debug)]
pub struct PackagePart {
    pub(crate) ctx: Arc<DeserializationContext>,
    pub(crate) proto: Arc<PackageProto>,
}

impl PackagePart {
    pub(crate) fn new(ctx: Arc<DeserializationContext>, proto: Arc<PackageProto>) -> Self {
        PackagePart { ctx, proto }
    }
}

type PartIndex = BTreeMap<Name, Vec<(usize, usize)>>;

/// Top-level functions, properties and classes of one package fragment.
///
/// Package members are never overridden; lookups deserialize the matching declarations of
/// every part once and cache them per name.
pub struct PackageMemberScope {
    module: Weak<Module>,
    fq_name: FqName,
    parts: Vec<PackagePart>,
    class_names: BTreeSet<Name>,
    function_index: LazyValue<PartIndex>,
    property_index: LazyValue<PartIndex>,
    functions: MemoizedFn<Name, Vec<Arc<FunctionDescriptor>>>,
    properties: MemoizedFn<Name, Vec<Arc<PropertyDescriptor>>>,
}

impl PackageMemberScope {
    pub(crate) fn new(
        module: Weak<Module>,
        fq_name: FqName,
        parts: Vec<PackagePart>,
        class_names: BTreeSet<Name>,
    ) -> Self {
        PackageMemberScope {
            module,
            fq_name,
            parts,
            class_names,
            function_index: LazyValue::new("package function index"),
            property_index: LazyValue::new("package property index"),
            functions: MemoizedFn::new("package functions"),
            properties: MemoizedFn::new("package properties"),
        }
    }

    /// The package name.
    #[must_use]
    pub fn fq_name(&self) -> &FqName {
        &self.fq_name
    }

    pub(crate) fn module_ref(&self) -> &Weak<Module> {
        &self.module
    }

    /// The parts this scope reads from.
    #[must_use]
    pub fn parts(&self) -> &[PackagePart] {
        &self.parts
    }

    fn functions_by_name(&self) -> Result<&PartIndex> {
        self.function_index.get(|| {
            let mut index = PartIndex::new();
            for (part_index, part) in self.parts.iter().enumerate() {
                let names = index_names(
                    part.ctx.name_resolver(),
                    part.proto.functions.iter().map(|function| function.name),
                )?;
                for (name, positions) in names {
                    let entry = index.entry(name).or_default();
                    entry.extend(positions.into_iter().map(|position| (part_index, position)));
                }
            }
            Ok(index)
        })
    }

    fn properties_by_name(&self) -> Result<&PartIndex> {
        self.property_index.get(|| {
            let mut index = PartIndex::new();
            for (part_index, part) in self.parts.iter().enumerate() {
                let names = index_names(
                    part.ctx.name_resolver(),
                    part.proto.properties.iter().map(|property| property.name),
                )?;
                for (name, positions) in names {
                    let entry = index.entry(name).or_default();
                    entry.extend(positions.into_iter().map(|position| (part_index, position)));
                }
            }
            Ok(index)
        })
    }

    /// Top-level functions named `name`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for corrupted declarations.
    pub fn functions(&self, name: &Name) -> Result<Vec<Arc<FunctionDescriptor>>> {
        self.functions.get_or_compute(name, |name| {
            let mut functions = Vec::new();
            for &(part, position) in self.functions_by_name()?.get(name).into_iter().flatten() {
                let part = &self.parts[part];
                let deserializer = MemberDeserializer::new(&part.ctx);
                functions.push(deserializer.function(&part.proto.functions[position])?);
            }
            Ok(functions)
        })
    }

    /// Top-level properties named `name`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for corrupted declarations.
    pub fn properties(&self, name: &Name) -> Result<Vec<Arc<PropertyDescriptor>>> {
        self.properties.get_or_compute(name, |name| {
            let mut properties = Vec::new();
            for &(part, position) in self.properties_by_name()?.get(name).into_iter().flatten() {
                let part = &self.parts[part];
                let deserializer = MemberDeserializer::new(&part.ctx);
                properties.push(deserializer.property(&part.proto.properties[position])?);
            }
            Ok(properties)
        })
    }

    /// The top-level class `name` of this fragment.
    ///
    /// # Errors
    /// Propagates resolution errors.
    pub fn classifier(&self, name: &Name) -> Result<Option<ClassRc>> {
        if !self.class_names.contains(name) {
            return Ok(None);
        }
        let module = upgrade_module!(self.module);
        module.find_class(&ClassId::new(
            self.fq_name.clone(),
            FqName::topmost(name.clone()),
            false,
        ))
    }

    /// Names of the top-level functions.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for bad name indices.
    pub fn function_names(&self) -> Result<BTreeSet<Name>> {
        Ok(self.functions_by_name()?.keys().cloned().collect())
    }

    /// Names of the top-level properties.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for bad name indices.
    pub fn property_names(&self) -> Result<BTreeSet<Name>> {
        Ok(self.properties_by_name()?.keys().cloned().collect())
    }

    /// Names of the top-level classes.
    #[must_use]
    pub fn class_names(&self) -> &BTreeSet<Name> {
        &self.class_names
    }
}

impl fmt::Debug for PackageMemberScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PackageMemberScope")
            .field("fq_name", &self.fq_name)
            .field("parts", &self.parts.len())
            .field("classes", &self.class_names.len())
            .finish_non_exhaustive()
    }
}
