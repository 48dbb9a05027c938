//! A single package blob as a metadata source.

use std::collections::HashMap;

use crate::{
    config::ResolverConfig,
    locator::{
        blob_entries, direct_sub_packages, ClassData, ClassDataFinder, PackageData,
        SourceElement,
    },
    metadata::{BlobPayload, MetadataBlob},
    names::{ClassId, FqName, Name},
    Result,
};

/// A [`ClassDataFinder`] over one package blob: the package part and the classes it declares.
///
/// The blob is decoded eagerly when the finder is created.
#[derive(Debug)]
pub struct PackageBlobFinder {
    package: PackageData,
    classes: HashMap<ClassId, ClassData>,
}

impl PackageBlobFinder {
    /// Decodes `data`, which must be a package blob.
    ///
    /// # Errors
    /// Returns blob decoding errors, and [`crate::Error::Malformed`] for a single-class blob or
    /// a class declared outside the blob's package.
    pub fn new(data: &[u8], config: &ResolverConfig) -> Result<Self> {
        let blob = MetadataBlob::parse(data, config)?;
        if matches!(blob.payload, BlobPayload::Class(_)) {
            return Err(malformed_error!("Expected a package blob, found a class blob"));
        }

        // Source depends on the package name, which is only known once the pools are decoded.
        let (entries, package) = blob_entries(blob, &SourceElement::Memory)?;
        let Some(mut package) = package else {
            return Err(malformed_error!("Package blob without package part"));
        };
        let source = SourceElement::PackageBlob(package.fq_name.clone());
        package.source = source.clone();

        let mut classes = HashMap::with_capacity(entries.len());
        for (class_id, mut data) in entries {
            if class_id.package_fq_name() != &package.fq_name {
                return Err(malformed_error!(
                    "Class {} declared in package blob of {}",
                    class_id,
                    package.fq_name
                ));
            }
            data.source = source.clone();
            classes.insert(class_id, data);
        }

        Ok(PackageBlobFinder { package, classes })
    }

    /// The package this blob describes.
    #[must_use]
    pub fn fq_name(&self) -> &FqName {
        &self.package.fq_name
    }
}

impl ClassDataFinder for PackageBlobFinder {
    fn find_class_data(&self, class_id: &ClassId) -> Result<Option<ClassData>> {
        Ok(self.classes.get(class_id).cloned())
    }

    fn find_package_data(&self, fq_name: &FqName) -> Result<Vec<PackageData>> {
        if fq_name == &self.package.fq_name {
            Ok(vec![self.package.clone()])
        } else {
            Ok(Vec::new())
        }
    }

    fn sub_packages_of(&self, fq_name: &FqName) -> Result<Vec<FqName>> {
        Ok(direct_sub_packages(
            fq_name,
            std::iter::once(&self.package.fq_name),
        ))
    }

    fn known_class_names(&self, fq_name: &FqName) -> Result<Vec<Name>> {
        if fq_name != &self.package.fq_name {
            return Ok(Vec::new());
        }
        let mut names: Vec<Name> = self
            .classes
            .keys()
            .filter(|class_id| !class_id.is_nested_class())
            .map(ClassId::short_class_name)
            .collect();
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{test::BlobEncoder, Error};

    #[test]
    fn package_blob_serves_its_classes() {
        let mut encoder = BlobEncoder::new();
        let a = encoder.class("lib/A").nested_class("N").build();
        let n = encoder.class("lib/A.N").build();
        let package = encoder.package_proto().function("helper").build();
        let fq = encoder.names.package(&FqName::new("lib"));
        let bytes = encoder.encode_package(fq, &package, &[a, n]);

        let finder = PackageBlobFinder::new(&bytes, &ResolverConfig::default()).unwrap();
        assert_eq!(finder.fq_name(), &FqName::new("lib"));

        let data = finder
            .find_class_data(&ClassId::parse("lib/A.N"))
            .unwrap()
            .unwrap();
        assert_eq!(data.source, SourceElement::PackageBlob(FqName::new("lib")));
        assert_eq!(
            finder.known_class_names(&FqName::new("lib")).unwrap(),
            vec![Name::identifier("A")]
        );
        assert_eq!(finder.find_package_data(&FqName::new("lib")).unwrap().len(), 1);
        assert!(finder.find_package_data(&FqName::new("other")).unwrap().is_empty());
        assert_eq!(
            finder.sub_packages_of(&FqName::root()).unwrap(),
            vec![FqName::new("lib")]
        );
    }

    #[test]
    fn class_blob_is_rejected() {
        let mut encoder = BlobEncoder::new();
        let a = encoder.class("lib/A").build();
        let bytes = encoder.encode_class(&a);

        let result = PackageBlobFinder::new(&bytes, &ResolverConfig::default());
        assert!(matches!(result, Err(Error::Malformed { .. })));
    }

    #[test]
    fn foreign_class_is_rejected() {
        let mut encoder = BlobEncoder::new();
        let a = encoder.class("other/A").build();
        let package = encoder.package_proto().build();
        let fq = encoder.names.package(&FqName::new("lib"));
        let bytes = encoder.encode_package(fq, &package, &[a]);

        let result = PackageBlobFinder::new(&bytes, &ResolverConfig::default());
        assert!(matches!(result, Err(Error::Malformed { .. })));
    }
}
