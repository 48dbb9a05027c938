//! Locating class and package metadata.
//!
//! A [`ClassDataFinder`] answers "where is the metadata of this class or package?" and hands
//! back the decoded message together with the name pools and type table it must be read with.
//! Finders never build descriptors and never fail for an absent class; they return `None` (or
//! nothing) and leave the decision to the module.
//!
//! # Key Components
//!
//! - [`MemoryClassFinder`] - In-memory registry, filled from messages or encoded blobs
//! - [`FileSystemClassFinder`] - Memory-mapped `.kmeta` files in a directory tree
//! - [`PackageBlobFinder`] - One package blob with its classes
//! - [`CompositeClassFinder`] - Several finders; first match wins for classes

use std::{fmt, path::PathBuf, sync::Arc};

use crate::{
    metadata::{
        proto::{ClassProto, PackageProto},
        BlobPayload, MetadataBlob, NameResolver, TypeTable,
    },
    names::{ClassId, FqName, Name},
    Result,
};

pub mod blob;
pub mod composite;
pub mod filesystem;
pub mod memory;

pub use blob::PackageBlobFinder;
pub use composite::CompositeClassFinder;
pub use filesystem::FileSystemClassFinder;
pub use memory::MemoryClassFinder;

/// File extension of metadata blobs.
pub const METADATA_FILE_EXTENSION: &str = "kmeta";

/// File name of the package part blob inside a package directory.
pub const PACKAGE_FILE_NAME: &str = "package.kmeta";

/// The origin of a piece of metadata.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceElement {
    /// Registered in memory
    Memory,
    /// Read from a file
    File(PathBuf),
    /// Part of the package blob of the given package
    PackageBlob(FqName),
    /// The built-in declarations of the module
    BuiltIns,
}

impl fmt::Display for SourceElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceElement::Memory => f.write_str("<memory>"),
            SourceElement::File(path) => write!(f, "{}", path.display()),
            SourceElement::PackageBlob(fq_name) => write!(f, "<package blob {fq_name}>"),
            SourceElement::BuiltIns => f.write_str("<built-ins>"),
        }
    }
}

/// A located class message.
#[derive(Clone, Debug)]
pub struct ClassData {
    /// Name pools of the message's blob
    pub name_resolver: Arc<NameResolver>,
    /// Type table of the message's blob
    pub type_table: Arc<TypeTable>,
    /// The class message
    pub proto: Arc<ClassProto>,
    /// Where it came from
    pub source: SourceElement,
}

impl ClassData {
    /// The id the message records for its class.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for a bad name index.
    pub fn class_id(&self) -> Result<ClassId> {
        self.name_resolver.class_id(self.proto.fq_name)
    }
}

/// A located package part.
#[derive(Clone, Debug)]
pub struct PackageData {
    /// The package
    pub fq_name: FqName,
    /// Name pools of the message's blob
    pub name_resolver: Arc<NameResolver>,
    /// Type table of the message's blob
    pub type_table: Arc<TypeTable>,
    /// The package part message
    pub proto: Arc<PackageProto>,
    /// Where it came from
    pub source: SourceElement,
}

/// Source of class and package metadata.
pub trait ClassDataFinder: Send + Sync {
    /// The metadata of `class_id`, `None` if this finder does not know the class.
    ///
    /// # Errors
    /// Returns I/O errors and blob decoding errors, including
    /// [`crate::Error::IncompatibleVersion`].
    fn find_class_data(&self, class_id: &ClassId) -> Result<Option<ClassData>>;

    /// All parts of package `fq_name` this finder knows.
    ///
    /// # Errors
    /// Returns I/O errors and blob decoding errors.
    fn find_package_data(&self, _fq_name: &FqName) -> Result<Vec<PackageData>> {
        Ok(Vec::new())
    }

    /// Direct sub-packages of `fq_name`.
    ///
    /// # Errors
    /// Returns I/O errors.
    fn sub_packages_of(&self, _fq_name: &FqName) -> Result<Vec<FqName>> {
        Ok(Vec::new())
    }

    /// Names of the top-level classes of `fq_name`.
    ///
    /// # Errors
    /// Returns I/O errors.
    fn known_class_names(&self, _fq_name: &FqName) -> Result<Vec<Name>> {
        Ok(Vec::new())
    }
}

/// Splits a decoded blob into class and package entries.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] for bad name indices in the payload.
pub(crate) fn blob_entries(
    blob: MetadataBlob,
    source: &SourceElement,
) -> Result<(Vec<(ClassId, ClassData)>, Option<PackageData>)> {
    let class_data = |proto: Arc<ClassProto>| -> Result<(ClassId, ClassData)> {
        let data = ClassData {
            name_resolver: Arc::clone(&blob.name_resolver),
            type_table: Arc::clone(&blob.type_table),
            proto,
            source: source.clone(),
        };
        Ok((data.class_id()?, data))
    };

    match &blob.payload {
        BlobPayload::Class(proto) => Ok((vec![class_data(Arc::clone(proto))?], None)),
        BlobPayload::Package {
            fq_name,
            package,
            classes,
        } => {
            let fq_name = match fq_name {
                Some(index) => blob.name_resolver.fq_name(*index)?,
                None => FqName::root(),
            };
            let mut entries = Vec::with_capacity(classes.len());
            for proto in classes {
                entries.push(class_data(Arc::clone(proto))?);
            }
            let package = PackageData {
                fq_name,
                name_resolver: Arc::clone(&blob.name_resolver),
                type_table: Arc::clone(&blob.type_table),
                proto: Arc::clone(package),
                source: source.clone(),
            };
            Ok((entries, Some(package)))
        }
    }
}

/// Direct children of `parent` among `packages` and their ancestors.
pub(crate) fn direct_sub_packages<'a>(
    parent: &FqName,
    packages: impl Iterator<Item = &'a FqName>,
) -> Vec<FqName> {
    let mut children: Vec<FqName> = packages
        .filter(|package| package.len() > parent.len() && package.starts_with(parent))
        .map(|package| parent.child(package.segments()[parent.len()].clone()))
        .collect();
    children.sort();
    children.dedup();
    children
}
