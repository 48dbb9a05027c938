//! Name tables of a metadata blob.
//!
//! Messages refer to names by index. Simple names index the string pool; class and package
//! names index the qualified-name pool, in which every entry is a short name plus an optional
//! parent entry, so `kotlin.collections.Map.Entry` is stored as a chain of four links that
//! share their prefixes with every other name of the blob.
//!
//! # Key Components
//!
//! - [`NameResolver`] - read side, resolving indices to [`Name`], [`FqName`] and [`ClassId`]
//! - [`NameTableBuilder`] - in-memory construction of a resolver (built-ins, tests)
//!
//! An index outside its pool can only come from corrupted input, so every accessor reports it
//! as [`crate::Error::Malformed`].

use std::collections::HashMap;

use crate::{
    names::{ClassId, FqName, Name},
    Result,
};

/// Kind of a qualified-name link.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QualifiedNameKind {
    /// A class segment
    Class,
    /// A package segment
    Package,
    /// A segment of a local class
    Local,
}

/// One link of the qualified-name pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct QualifiedName {
    /// Index of the enclosing link, `None` below the root package
    pub parent: Option<u32>,
    /// String index of the segment
    pub short_name: u32,
    /// What the segment names
    pub kind: QualifiedNameKind,
}

/// Resolves string and qualified-name indices of one blob.
#[derive(Debug, Default)]
pub struct NameResolver {
    strings: Vec<String>,
    qualified_names: Vec<QualifiedName>,
}

impl NameResolver {
    /// Creates a resolver over decoded pools.
    #[must_use]
    pub fn new(strings: Vec<String>, qualified_names: Vec<QualifiedName>) -> Self {
        NameResolver {
            strings,
            qualified_names,
        }
    }

    /// Returns the string at `index`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if `index` is outside the string pool.
    pub fn string(&self, index: u32) -> Result<&str> {
        self.strings
            .get(index as usize)
            .map(String::as_str)
            .ok_or_else(|| {
                malformed_error!(
                    "String index {} out of range (pool size {})",
                    index,
                    self.strings.len()
                )
            })
    }

    /// Returns the string at `index` as a [`Name`].
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if `index` is outside the string pool.
    pub fn name(&self, index: u32) -> Result<Name> {
        let text = self.string(index)?;
        if text.starts_with('<') {
            Ok(Name::special(text))
        } else {
            Ok(Name::identifier(text))
        }
    }

    fn qualified(&self, index: u32) -> Result<&QualifiedName> {
        self.qualified_names.get(index as usize).ok_or_else(|| {
            malformed_error!(
                "Qualified name index {} out of range (pool size {})",
                index,
                self.qualified_names.len()
            )
        })
    }

    /// Resolves a qualified-name index into a class id.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for an out-of-range index anywhere in the chain or a
    /// parent chain that does not terminate.
    pub fn class_id(&self, index: u32) -> Result<ClassId> {
        let mut package = Vec::new();
        let mut relative = Vec::new();
        let mut local = false;

        let mut current = Some(index);
        let mut steps = 0usize;
        while let Some(link_index) = current {
            steps += 1;
            if steps > self.qualified_names.len() {
                return Err(malformed_error!(
                    "Qualified name chain starting at {} does not terminate",
                    index
                ));
            }

            let link = self.qualified(link_index)?;
            let segment = self.name(link.short_name)?;
            match link.kind {
                QualifiedNameKind::Class => relative.push(segment),
                QualifiedNameKind::Package => package.push(segment),
                QualifiedNameKind::Local => {
                    relative.push(segment);
                    local = true;
                }
            }
            current = link.parent;
        }

        package.reverse();
        relative.reverse();
        if relative.is_empty() {
            return Err(malformed_error!(
                "Qualified name {} names a package, a class was expected",
                index
            ));
        }

        Ok(ClassId::new(
            FqName::from_segments(package),
            FqName::from_segments(relative),
            local,
        ))
    }

    /// Resolves a qualified-name index into a dot separated name, regardless of segment kinds.
    ///
    /// # Errors
    /// Same as [`NameResolver::class_id`].
    pub fn fq_name(&self, index: u32) -> Result<FqName> {
        let mut segments = Vec::new();
        let mut current = Some(index);
        while let Some(link_index) = current {
            if segments.len() >= self.qualified_names.len() {
                return Err(malformed_error!(
                    "Qualified name chain starting at {} does not terminate",
                    index
                ));
            }
            let link = self.qualified(link_index)?;
            segments.push(self.name(link.short_name)?);
            current = link.parent;
        }
        segments.reverse();
        Ok(FqName::from_segments(segments))
    }

    /// Size of the string pool.
    #[must_use]
    pub fn string_count(&self) -> usize {
        self.strings.len()
    }

    /// Size of the qualified-name pool.
    #[must_use]
    pub fn qualified_name_count(&self) -> usize {
        self.qualified_names.len()
    }

    /// The raw string pool.
    #[must_use]
    pub fn strings(&self) -> &[String] {
        &self.strings
    }

    /// The raw qualified-name pool.
    #[must_use]
    pub fn qualified_names(&self) -> &[QualifiedName] {
        &self.qualified_names
    }
}

/// Interns strings and qualified names into fresh pools.
///
/// # Examples
///
/// ```rust
/// use metascope::metadata::NameTableBuilder;
/// use metascope::names::ClassId;
///
/// let mut names = NameTableBuilder::new();
/// let string_index = names.string("f");
/// let class_index = names.class_id(&ClassId::top_level("a.b", "C"));
/// let resolver = names.build();
///
/// assert_eq!(resolver.string(string_index)?, "f");
/// assert_eq!(resolver.class_id(class_index)?, ClassId::top_level("a.b", "C"));
/// # Ok::<(), metascope::Error>(())
/// ```
#[derive(Clone, Debug, Default)]
pub struct NameTableBuilder {
    strings: Vec<String>,
    string_index: HashMap<String, u32>,
    qualified_names: Vec<QualifiedName>,
    qualified_index: HashMap<QualifiedName, u32>,
}

impl NameTableBuilder {
    /// Creates empty pools.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns a string and returns its index.
    pub fn string(&mut self, text: &str) -> u32 {
        if let Some(index) = self.string_index.get(text) {
            return *index;
        }
        let index = self.strings.len() as u32;
        self.strings.push(text.to_string());
        self.string_index.insert(text.to_string(), index);
        index
    }

    /// Interns a simple name and returns its string index.
    pub fn name(&mut self, name: &Name) -> u32 {
        self.string(name.as_str())
    }

    fn link(&mut self, parent: Option<u32>, segment: &Name, kind: QualifiedNameKind) -> u32 {
        let link = QualifiedName {
            parent,
            short_name: self.name(segment),
            kind,
        };
        if let Some(index) = self.qualified_index.get(&link) {
            return *index;
        }
        let index = self.qualified_names.len() as u32;
        self.qualified_names.push(link);
        self.qualified_index.insert(link, index);
        index
    }

    /// Interns a package name; returns `None` for the root package.
    pub fn package(&mut self, fq_name: &FqName) -> Option<u32> {
        let mut parent = None;
        for segment in fq_name.segments() {
            parent = Some(self.link(parent, segment, QualifiedNameKind::Package));
        }
        parent
    }

    /// Interns a class id and returns its qualified-name index.
    pub fn class_id(&mut self, class_id: &ClassId) -> u32 {
        let kind = if class_id.is_local() {
            QualifiedNameKind::Local
        } else {
            QualifiedNameKind::Class
        };

        let mut parent = self.package(class_id.package_fq_name());
        let mut index = 0;
        for segment in class_id.relative_class_name().segments() {
            index = self.link(parent, segment, kind);
            parent = Some(index);
        }
        index
    }

    /// Finishes the pools.
    #[must_use]
    pub fn build(self) -> NameResolver {
        NameResolver::new(self.strings, self.qualified_names)
    }
}
