//! The module: root of a resolved symbol graph.
//!
//! A [`Module`] is built once from a metadata finder and its collaborators and is then shared
//! across threads. It owns every cache of the graph (classes by id, package fragments and
//! views, sub-package enumeration, not-found placeholders, built-ins). Descriptors only hold
//! weak references to it, so dropping the last `Arc<Module>` releases the whole graph.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use metascope::{locator::FileSystemClassFinder, names::ClassId, ModuleBuilder, ResolverConfig};
//!
//! let config = ResolverConfig::default();
//! let finder = FileSystemClassFinder::new("build/metadata", config)?;
//! let module = ModuleBuilder::new("app").config(config).finder(Arc::new(finder)).build()?;
//!
//! if let Some(class) = module.find_class(&ClassId::parse("app/Main"))? {
//!     for supertype in class.supertypes()? {
//!         println!("{}", supertype.render()?);
//!     }
//! }
//! # Ok::<(), metascope::Error>(())
//! ```

use std::{
    collections::BTreeSet,
    fmt,
    sync::{Arc, Weak},
};

use tracing::{debug, trace};

use crate::{
    builtins::{built_ins_finder, BuiltIns},
    config::ResolverConfig,
    descriptors::{ClassRc, ClassRef, Container, PackageFragment, PackageView},
    deserialization::{
        AdditionalSupertypes, DeserializationContext, DeserializedClass, NoAdditionalSupertypes,
        NotFoundClasses,
    },
    locator::{ClassDataFinder, CompositeClassFinder},
    names::{ClassId, FqName},
    reporting::{ErrorReporter, LookupTracker, NoopErrorReporter, NoopLookupTracker},
    scopes::PackagePart,
    storage::MemoizedFn,
    types::{DefaultFlexibleTypeFactory, FlexibleTypeFactory},
    Result,
};

/// Collects the parts of a [`Module`] before it is built.
///
/// Finders are consulted in the order they were added; the built-in declarations are
/// always appended last, so user metadata for a built-in id wins.
pub struct ModuleBuilder {
    name: String,
    finders: Vec<Arc<dyn ClassDataFinder>>,
    config: ResolverConfig,
    error_reporter: Arc<dyn ErrorReporter>,
    lookup_tracker: Arc<dyn LookupTracker>,
    additional_supertypes: Arc<dyn AdditionalSupertypes>,
    flexible_types: Arc<dyn FlexibleTypeFactory>,
}

impl ModuleBuilder {
    /// Starts a module named `name` with default collaborators.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        ModuleBuilder {
            name: name.into(),
            finders: Vec::new(),
            config: ResolverConfig::default(),
            error_reporter: Arc::new(NoopErrorReporter),
            lookup_tracker: Arc::new(NoopLookupTracker),
            additional_supertypes: Arc::new(NoAdditionalSupertypes),
            flexible_types: Arc::new(DefaultFlexibleTypeFactory),
        }
    }

    /// Adds a metadata source.
    #[must_use]
    pub fn finder(mut self, finder: Arc<dyn ClassDataFinder>) -> Self {
        self.finders.push(finder);
        self
    }

    /// Sets the resolver configuration.
    #[must_use]
    pub fn config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the receiver of degraded-resolution events.
    #[must_use]
    pub fn error_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.error_reporter = reporter;
        self
    }

    /// Sets the receiver of member lookups.
    #[must_use]
    pub fn lookup_tracker(mut self, tracker: Arc<dyn LookupTracker>) -> Self {
        self.lookup_tracker = tracker;
        self
    }

    /// Sets the source of injected supertypes.
    #[must_use]
    pub fn additional_supertypes(mut self, provider: Arc<dyn AdditionalSupertypes>) -> Self {
        self.additional_supertypes = provider;
        self
    }

    /// Sets the factory interpreting flexible types.
    #[must_use]
    pub fn flexible_type_factory(mut self, factory: Arc<dyn FlexibleTypeFactory>) -> Self {
        self.flexible_types = factory;
        self
    }

    /// Builds the module.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the built-in declarations can not be
    /// registered.
    pub fn build(self) -> Result<Arc<Module>> {
        let mut finders = self.finders;
        finders.push(Arc::new(built_ins_finder(self.config)?));
        let finder = CompositeClassFinder::new(finders);

        debug!(
            module = %self.name,
            finders = finder.finders().len(),
            "building module"
        );

        Ok(Arc::new_cyclic(|weak: &Weak<Module>| Module {
            name: self.name,
            finder,
            config: self.config,
            error_reporter: self.error_reporter,
            lookup_tracker: self.lookup_tracker,
            additional_supertypes: self.additional_supertypes,
            flexible_types: self.flexible_types,
            classes: MemoizedFn::new("class"),
            fragments: MemoizedFn::new("package fragments"),
            packages: MemoizedFn::new("package view"),
            sub_packages: MemoizedFn::recursion_tolerant("sub-packages", Vec::new()),
            not_found: NotFoundClasses::new(weak.clone()),
            builtins: BuiltIns::new(weak.clone()),
            self_ref: weak.clone(),
        }))
    }
}

/// A resolved symbol graph over one set of metadata sources.
///
/// All lookups are lazy, memoized and safe to call from any number of threads. Every
/// identifier maps to exactly one descriptor instance for the lifetime of the module.
pub struct Module {
    name: String,
    finder: CompositeClassFinder,
    config: ResolverConfig,
    error_reporter: Arc<dyn ErrorReporter>,
    lookup_tracker: Arc<dyn LookupTracker>,
    additional_supertypes: Arc<dyn AdditionalSupertypes>,
    flexible_types: Arc<dyn FlexibleTypeFactory>,
    classes: MemoizedFn<ClassId, Option<ClassRc>>,
    fragments: MemoizedFn<FqName, Vec<Arc<PackageFragment>>>,
    packages: MemoizedFn<FqName, Arc<PackageView>>,
    sub_packages: MemoizedFn<FqName, Vec<FqName>>,
    not_found: NotFoundClasses,
    builtins: BuiltIns,
    self_ref: Weak<Module>,
}

impl Module {
    /// The module name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The resolver configuration.
    #[must_use]
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// The metadata sources, built-ins last.
    #[must_use]
    pub fn finder(&self) -> &CompositeClassFinder {
        &self.finder
    }

    /// The receiver of degraded-resolution events.
    #[must_use]
    pub fn error_reporter(&self) -> &dyn ErrorReporter {
        self.error_reporter.as_ref()
    }

    /// The receiver of member lookups.
    #[must_use]
    pub fn lookup_tracker(&self) -> &dyn LookupTracker {
        self.lookup_tracker.as_ref()
    }

    /// The source of injected supertypes.
    #[must_use]
    pub fn additional_supertypes(&self) -> &dyn AdditionalSupertypes {
        self.additional_supertypes.as_ref()
    }

    /// The factory interpreting flexible types.
    #[must_use]
    pub fn flexible_types(&self) -> &dyn FlexibleTypeFactory {
        self.flexible_types.as_ref()
    }

    /// The not-found placeholder registry.
    #[must_use]
    pub fn not_found_classes(&self) -> &NotFoundClasses {
        &self.not_found
    }

    /// The built-in types.
    #[must_use]
    pub fn builtins(&self) -> &BuiltIns {
        &self.builtins
    }

    /// The class `class_id`, `None` if no finder knows it.
    ///
    /// The descriptor is created on the first request and the same instance is returned on
    /// every later one, from any thread. A nested class is only found if its outer class is
    /// found and lists it among its nested classes.
    ///
    /// # Errors
    /// Returns blob decoding errors of the class metadata (and of its outer classes), and
    /// [`crate::Error::RecursionDetected`] for an outer-class chain that loops back.
    pub fn find_class(&self, class_id: &ClassId) -> Result<Option<ClassRc>> {
        self.classes
            .get_or_compute(class_id, |class_id| self.create_class(class_id))
    }

    fn create_class(&self, class_id: &ClassId) -> Result<Option<ClassRc>> {
        let (container, parent) = match class_id.outer_class_id() {
            Some(outer_id) => {
                let Some(outer) = self.find_class(&outer_id)? else {
                    trace!(class = %class_id, "outer class not found");
                    return Ok(None);
                };
                if !outer.nested_class_names().contains(&class_id.short_class_name()) {
                    trace!(class = %class_id, "not listed as nested class of its outer class");
                    return Ok(None);
                }
                let parent = outer.as_deserialized().map(|outer| Arc::clone(outer.ctx()));
                (Container::Class(ClassRef::new(&outer)), parent)
            }
            None => (Container::Package(class_id.package_fq_name().clone()), None),
        };

        let Some(data) = self.finder.find_class_data(class_id)? else {
            return Ok(None);
        };

        DeserializedClass::create(
            self.self_ref.clone(),
            class_id.clone(),
            data,
            container,
            parent,
        )
        .map(Some)
    }

    /// The package fragments of `fq_name`: one per metadata source that has package parts
    /// or classes in the package.
    ///
    /// # Errors
    /// Returns blob decoding errors of the package parts.
    pub fn package_fragments(&self, fq_name: &FqName) -> Result<Vec<Arc<PackageFragment>>> {
        self.fragments
            .get_or_compute(fq_name, |fq_name| self.create_fragments(fq_name))
    }

    fn create_fragments(&self, fq_name: &FqName) -> Result<Vec<Arc<PackageFragment>>> {
        let mut fragments = Vec::new();
        for finder in self.finder.finders() {
            let parts = finder.find_package_data(fq_name)?;
            let class_names: BTreeSet<_> = finder.known_class_names(fq_name)?.into_iter().collect();
            if parts.is_empty() && class_names.is_empty() {
                continue;
            }

            let parts = parts
                .into_iter()
                .map(|data| {
                    let ctx = DeserializationContext::new(
                        self.self_ref.clone(),
                        data.name_resolver,
                        data.type_table,
                        Container::Package(fq_name.clone()),
                        None,
                    );
                    PackagePart::new(ctx, data.proto)
                })
                .collect();
            fragments.push(Arc::new(PackageFragment::new(
                self.self_ref.clone(),
                fq_name.clone(),
                parts,
                class_names,
            )));
        }

        trace!(package = %fq_name, fragments = fragments.len(), "package fragments");
        Ok(fragments)
    }

    /// The view of package `fq_name` across all its fragments.
    ///
    /// A view exists for every package name, even one without declarations.
    ///
    /// # Errors
    /// Returns blob decoding errors of the package parts.
    pub fn package(&self, fq_name: &FqName) -> Result<Arc<PackageView>> {
        self.packages.get_or_compute(fq_name, |fq_name| {
            let fragments = self.package_fragments(fq_name)?;
            Ok(Arc::new(PackageView::new(
                self.self_ref.clone(),
                fq_name.clone(),
                fragments,
            )))
        })
    }

    /// Direct sub-packages of `fq_name`, sorted.
    ///
    /// Memoized per package. A re-entrant enumeration of the same package (possible with
    /// finders that follow links) sees an empty list instead of looping.
    ///
    /// # Errors
    /// Returns I/O errors of the finders.
    pub fn sub_packages_of(&self, fq_name: &FqName) -> Result<Vec<FqName>> {
        self.sub_packages
            .get_or_compute(fq_name, |fq_name| self.finder.sub_packages_of(fq_name))
    }

    /// Number of class ids requested so far, found or not.
    #[must_use]
    pub fn requested_class_count(&self) -> usize {
        self.classes.len()
    }

    /// All classes created so far.
    #[must_use]
    pub fn loaded_classes(&self) -> Vec<ClassRc> {
        self.classes.values().into_iter().flatten().collect()
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("classes", &self.classes.len())
            .field("not_found", &self.not_found.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{builtins::BuiltInClass, locator::MemoryClassFinder, test::BlobEncoder};

    fn module_with(blobs: Vec<Vec<u8>>) -> Arc<Module> {
        let finder = MemoryClassFinder::default();
        for blob in blobs {
            finder.add_blob(&blob).unwrap();
        }
        ModuleBuilder::new("test")
            .finder(Arc::new(finder))
            .build()
            .unwrap()
    }

    #[test]
    fn built_ins_are_always_available() {
        let module = module_with(Vec::new());
        let any = module
            .find_class(&BuiltInClass::Any.class_id())
            .unwrap()
            .unwrap();
        assert!(any.supertypes().unwrap().is_empty());
        assert!(!any.is_not_found());
    }

    #[test]
    fn class_identity_is_stable() {
        let mut encoder = BlobEncoder::new();
        let proto = encoder.class("p/A").build();
        let module = module_with(vec![encoder.encode_class(&proto)]);

        let id = ClassId::top_level("p", "A");
        let first = module.find_class(&id).unwrap().unwrap();
        let second = module.find_class(&id).unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(module.loaded_classes().len(), 1);
    }

    #[test]
    fn unknown_class_is_none() {
        let module = module_with(Vec::new());
        assert!(module
            .find_class(&ClassId::top_level("p", "Missing"))
            .unwrap()
            .is_none());
        assert_eq!(module.requested_class_count(), 1);
    }

    #[test]
    fn nested_class_requires_listing_in_outer() {
        let mut encoder = BlobEncoder::new();
        let outer = encoder.class("p/Outer").build();
        let outer_blob = encoder.encode_class(&outer);

        let mut encoder = BlobEncoder::new();
        let inner = encoder.class("p/Outer.Inner").build();
        let inner_blob = encoder.encode_class(&inner);

        let module = module_with(vec![outer_blob, inner_blob]);
        assert!(module
            .find_class(&ClassId::parse("p/Outer.Inner"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn dropping_module_releases_graph() {
        let mut encoder = BlobEncoder::new();
        let proto = encoder.class("p/A").build();
        let module = module_with(vec![encoder.encode_class(&proto)]);
        let class = module
            .find_class(&ClassId::top_level("p", "A"))
            .unwrap()
            .unwrap();
        let weak = Arc::downgrade(&module);

        drop(module);
        assert!(weak.upgrade().is_none());
        assert!(matches!(
            class.supertypes(),
            Err(crate::Error::ModuleReleased)
        ));
    }
}
