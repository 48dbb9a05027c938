//! In-memory metadata registry.

use dashmap::DashMap;
use tracing::trace;

use crate::{
    config::ResolverConfig,
    locator::{blob_entries, direct_sub_packages, ClassData, ClassDataFinder, PackageData, SourceElement},
    metadata::MetadataBlob,
    names::{ClassId, FqName, Name},
    Result,
};

/// A [`ClassDataFinder`] over messages registered at runtime.
///
/// Registration may happen concurrently with lookups; a lookup sees every registration that
/// completed before it started.
///
/// # Examples
///
/// ```rust,no_run
/// use metascope::locator::MemoryClassFinder;
/// use metascope::ResolverConfig;
///
/// let finder = MemoryClassFinder::new(ResolverConfig::default());
/// let bytes = std::fs::read("Foo.kmeta")?;
/// finder.add_blob(&bytes)?;
/// # Ok::<(), metascope::Error>(())
/// ```
pub struct MemoryClassFinder {
    config: ResolverConfig,
    source: SourceElement,
    classes: DashMap<ClassId, ClassData>,
    packages: DashMap<FqName, Vec<PackageData>>,
}

impl MemoryClassFinder {
    /// An empty registry that decodes blobs with `config`.
    #[must_use]
    pub fn new(config: ResolverConfig) -> Self {
        Self::with_source(config, SourceElement::Memory)
    }

    pub(crate) fn with_source(config: ResolverConfig, source: SourceElement) -> Self {
        MemoryClassFinder {
            config,
            source,
            classes: DashMap::new(),
            packages: DashMap::new(),
        }
    }

    /// Registers a class message under the id it records. A later registration of the same id
    /// replaces the earlier one.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the recorded class name is not in the name pools.
    pub fn add_class(&self, data: ClassData) -> Result<ClassId> {
        let class_id = data.class_id()?;
        trace!(class = %class_id, "registered class metadata");
        self.classes.insert(class_id.clone(), data);
        Ok(class_id)
    }

    /// Registers a package part. Parts accumulate; a package may have several.
    pub fn add_package(&self, data: PackageData) {
        trace!(package = %data.fq_name, "registered package part");
        self.packages
            .entry(data.fq_name.clone())
            .or_default()
            .push(data);
    }

    /// Decodes `data` and registers its class, or its package part with all its classes.
    ///
    /// # Errors
    /// Returns blob decoding errors. Nothing is registered if decoding fails.
    pub fn add_blob(&self, data: &[u8]) -> Result<()> {
        let blob = MetadataBlob::parse(data, &self.config)?;
        let (classes, package) = blob_entries(blob, &self.source)?;
        for (class_id, class) in classes {
            self.classes.insert(class_id, class);
        }
        if let Some(package) = package {
            self.add_package(package);
        }
        Ok(())
    }

    /// Number of registered classes.
    #[must_use]
    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    /// Returns `true` if a class is registered under `class_id`.
    #[must_use]
    pub fn contains_class(&self, class_id: &ClassId) -> bool {
        self.classes.contains_key(class_id)
    }
}

impl Default for MemoryClassFinder {
    fn default() -> Self {
        Self::new(ResolverConfig::default())
    }
}

impl ClassDataFinder for MemoryClassFinder {
    fn find_class_data(&self, class_id: &ClassId) -> Result<Option<ClassData>> {
        Ok(self.classes.get(class_id).map(|entry| entry.value().clone()))
    }

    fn find_package_data(&self, fq_name: &FqName) -> Result<Vec<PackageData>> {
        Ok(self
            .packages
            .get(fq_name)
            .map(|entry| entry.value().clone())
            .unwrap_or_default())
    }

    fn sub_packages_of(&self, fq_name: &FqName) -> Result<Vec<FqName>> {
        let mut known: Vec<FqName> = self
            .packages
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        known.extend(
            self.classes
                .iter()
                .map(|entry| entry.key().package_fq_name().clone()),
        );
        Ok(direct_sub_packages(fq_name, known.iter()))
    }

    fn known_class_names(&self, fq_name: &FqName) -> Result<Vec<Name>> {
        let mut names: Vec<Name> = self
            .classes
            .iter()
            .filter(|entry| {
                let class_id = entry.key();
                class_id.package_fq_name() == fq_name
                    && !class_id.is_nested_class()
                    && !class_id.is_local()
            })
            .map(|entry| entry.key().short_class_name())
            .collect();
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::BlobEncoder;

    #[test]
    fn add_blob_registers_class() {
        let mut encoder = BlobEncoder::new();
        let proto = encoder.class("pkg/Foo").build();
        let bytes = encoder.encode_class(&proto);

        let finder = MemoryClassFinder::default();
        finder.add_blob(&bytes).unwrap();

        let class_id = ClassId::top_level("pkg", "Foo");
        assert!(finder.contains_class(&class_id));
        let data = finder.find_class_data(&class_id).unwrap().unwrap();
        assert_eq!(data.class_id().unwrap(), class_id);
        assert_eq!(data.source, SourceElement::Memory);
        assert!(finder
            .find_class_data(&ClassId::top_level("pkg", "Bar"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn package_blob_registers_parts_and_classes() {
        let mut encoder = BlobEncoder::new();
        let package = encoder.package_proto().function("top").build();
        let class = encoder.class("a/b/Foo").build();
        let fq = encoder.names.package(&FqName::new("a.b"));
        let bytes = encoder.encode_package(fq, &package, &[class]);

        let finder = MemoryClassFinder::default();
        finder.add_blob(&bytes).unwrap();

        let parts = finder.find_package_data(&FqName::new("a.b")).unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].proto.functions.len(), 1);
        assert_eq!(
            finder.known_class_names(&FqName::new("a.b")).unwrap(),
            vec![Name::identifier("Foo")]
        );
        assert_eq!(
            finder.sub_packages_of(&FqName::root()).unwrap(),
            vec![FqName::new("a")]
        );
        assert_eq!(
            finder.sub_packages_of(&FqName::new("a")).unwrap(),
            vec![FqName::new("a.b")]
        );
    }

    #[test]
    fn failed_blob_registers_nothing() {
        let finder = MemoryClassFinder::default();
        assert!(finder.add_blob(b"KMET").is_err());
        assert!(finder.add_blob(&[]).is_err());
        assert_eq!(finder.class_count(), 0);
    }
}
