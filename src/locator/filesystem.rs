//! Metadata stored as `.kmeta` files in a directory tree.
//!
//! The layout mirrors the package structure:
//!
//! ```text
//! <root>/a/b/package.kmeta        package part of `a.b`
//! <root>/a/b/Outer.kmeta          class a/b/Outer
//! <root>/a/b/Outer$Inner.kmeta    class a/b/Outer.Inner
//! ```
//!
//! Files are memory mapped while they are decoded; the decoded messages do not borrow from
//! the mapping.

use std::{
    fs,
    path::{Path, PathBuf},
};

use memmap2::Mmap;
use tracing::debug;

use crate::{
    config::ResolverConfig,
    locator::{
        blob_entries, ClassData, ClassDataFinder, PackageData, SourceElement,
        METADATA_FILE_EXTENSION, PACKAGE_FILE_NAME,
    },
    metadata::{BlobPayload, MetadataBlob},
    names::{ClassId, FqName, Name},
    Error::{self, FileError},
    Result,
};

/// A [`ClassDataFinder`] reading `.kmeta` files below a root directory.
pub struct FileSystemClassFinder {
    root: PathBuf,
    config: ResolverConfig,
}

impl FileSystemClassFinder {
    /// Creates a finder for the tree at `root`.
    ///
    /// # Errors
    /// Returns [`Error::FileError`] if `root` is not an accessible directory.
    pub fn new(root: impl AsRef<Path>, config: ResolverConfig) -> Result<Self> {
        let root = root.as_ref();
        let metadata = fs::metadata(root).map_err(FileError)?;
        if !metadata.is_dir() {
            return Err(Error::Error(format!(
                "{} is not a directory",
                root.display()
            )));
        }

        Ok(FileSystemClassFinder {
            root: root.to_path_buf(),
            config,
        })
    }

    /// The root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn package_dir(&self, fq_name: &FqName) -> PathBuf {
        let mut path = self.root.clone();
        for segment in fq_name.segments() {
            path.push(segment.as_str());
        }
        path
    }

    /// Path of the file holding `class_id`.
    #[must_use]
    pub fn class_file(&self, class_id: &ClassId) -> PathBuf {
        let file_name = class_id
            .relative_class_name()
            .join("$");
        self.package_dir(class_id.package_fq_name())
            .join(format!("{file_name}.{METADATA_FILE_EXTENSION}"))
    }

    /// Decodes the file at `path`; `None` if the file does not exist.
    fn read_blob(&self, path: &Path) -> Result<Option<MetadataBlob>> {
        let file = match fs::File::open(path) {
            Ok(file) => file,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(FileError(error)),
        };

        if file.metadata().map_err(FileError)?.len() == 0 {
            return Err(Error::Empty);
        }

        let mmap = match unsafe { Mmap::map(&file) } {
            Ok(mmap) => mmap,
            Err(error) => return Err(Error::Error(error.to_string())),
        };

        debug!(path = %path.display(), size = mmap.len(), "decoding metadata file");
        MetadataBlob::parse(&mmap, &self.config).map(Some)
    }

    fn list_dir(&self, dir: &Path) -> Result<Vec<fs::DirEntry>> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => return Err(FileError(error)),
        };

        let mut result = Vec::new();
        for entry in entries {
            result.push(entry.map_err(FileError)?);
        }
        Ok(result)
    }
}

impl ClassDataFinder for FileSystemClassFinder {
    fn find_class_data(&self, class_id: &ClassId) -> Result<Option<ClassData>> {
        if class_id.is_local() {
            return Ok(None);
        }

        let path = self.class_file(class_id);
        let Some(blob) = self.read_blob(&path)? else {
            return Ok(None);
        };

        if !matches!(blob.payload, BlobPayload::Class(_)) {
            return Err(malformed_error!(
                "{} holds a package blob, expected class {}",
                path.display(),
                class_id
            ));
        }

        let (mut classes, _) = blob_entries(blob, &SourceElement::File(path))?;
        Ok(classes.pop().map(|(_, data)| data))
    }

    fn find_package_data(&self, fq_name: &FqName) -> Result<Vec<PackageData>> {
        let path = self.package_dir(fq_name).join(PACKAGE_FILE_NAME);
        let Some(blob) = self.read_blob(&path)? else {
            return Ok(Vec::new());
        };

        if matches!(blob.payload, BlobPayload::Class(_)) {
            return Err(malformed_error!(
                "{} holds a class blob, expected package {}",
                path.display(),
                fq_name
            ));
        }

        let (_, package) = blob_entries(blob, &SourceElement::File(path.clone()))?;
        match package {
            Some(package) if &package.fq_name == fq_name => Ok(vec![package]),
            Some(package) => Err(malformed_error!(
                "{} declares package {}, expected {}",
                path.display(),
                package.fq_name,
                fq_name
            )),
            None => Ok(Vec::new()),
        }
    }

    fn sub_packages_of(&self, fq_name: &FqName) -> Result<Vec<FqName>> {
        let mut children = Vec::new();
        for entry in self.list_dir(&self.package_dir(fq_name))? {
            if !entry.file_type().map_err(FileError)?.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                children.push(fq_name.child(Name::identifier(name)));
            }
        }
        children.sort();
        Ok(children)
    }

    fn known_class_names(&self, fq_name: &FqName) -> Result<Vec<Name>> {
        let mut names = Vec::new();
        for entry in self.list_dir(&self.package_dir(fq_name))? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(METADATA_FILE_EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            if entry.file_name() == PACKAGE_FILE_NAME || stem.contains('$') {
                continue;
            }
            names.push(Name::identifier(stem));
        }
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::BlobEncoder;

    #[test]
    fn nested_class_file_uses_runtime_name() {
        let dir = tempfile::tempdir().unwrap();
        let finder = FileSystemClassFinder::new(dir.path(), ResolverConfig::default()).unwrap();

        let path = finder.class_file(&ClassId::parse("a/b/Outer.Inner"));
        assert_eq!(path, dir.path().join("a").join("b").join("Outer$Inner.kmeta"));
    }

    #[test]
    fn missing_files_are_not_errors() {
        let dir = tempfile::tempdir().unwrap();
        let finder = FileSystemClassFinder::new(dir.path(), ResolverConfig::default()).unwrap();

        let class_id = ClassId::top_level("nowhere", "Foo");
        assert!(finder.find_class_data(&class_id).unwrap().is_none());
        assert!(finder.find_package_data(&FqName::new("nowhere")).unwrap().is_empty());
        assert!(finder.sub_packages_of(&FqName::new("nowhere")).unwrap().is_empty());
    }

    #[test]
    fn reads_class_and_lists_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("pkg").join("sub")).unwrap();

        let mut encoder = BlobEncoder::new();
        let foo = encoder.class("pkg/Foo").nested_class("Inner").build();
        fs::write(dir.path().join("pkg").join("Foo.kmeta"), encoder.encode_class(&foo)).unwrap();

        let mut encoder = BlobEncoder::new();
        let inner = encoder.class("pkg/Foo.Inner").build();
        fs::write(
            dir.path().join("pkg").join("Foo$Inner.kmeta"),
            encoder.encode_class(&inner),
        )
        .unwrap();

        let finder = FileSystemClassFinder::new(dir.path(), ResolverConfig::default()).unwrap();
        let data = finder
            .find_class_data(&ClassId::top_level("pkg", "Foo"))
            .unwrap()
            .unwrap();
        assert_eq!(
            data.source,
            SourceElement::File(dir.path().join("pkg").join("Foo.kmeta"))
        );
        assert!(finder
            .find_class_data(&ClassId::parse("pkg/Foo.Inner"))
            .unwrap()
            .is_some());

        assert_eq!(
            finder.known_class_names(&FqName::new("pkg")).unwrap(),
            vec![Name::identifier("Foo")]
        );
        assert_eq!(
            finder.sub_packages_of(&FqName::new("pkg")).unwrap(),
            vec![FqName::new("pkg.sub")]
        );
    }

    #[test]
    fn empty_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Empty.kmeta"), b"").unwrap();

        let finder = FileSystemClassFinder::new(dir.path(), ResolverConfig::default()).unwrap();
        let result = finder.find_class_data(&ClassId::top_level("", "Empty"));
        assert!(matches!(result, Err(Error::Empty)));
    }

    #[test]
    fn root_must_be_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("file");
        fs::write(&file, b"x").unwrap();

        assert!(FileSystemClassFinder::new(&file, ResolverConfig::default()).is_err());
        assert!(FileSystemClassFinder::new(dir.path().join("missing"), ResolverConfig::default()).is_err());
    }
}
