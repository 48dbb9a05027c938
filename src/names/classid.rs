use std::fmt;

use crate::names::{FqName, Name};

/// Identifies a class by its package and its path of nested class names.
///
/// `kotlin.collections.Map.Entry` is the class id (`kotlin.collections`, `Map.Entry`). Local
/// classes (declared inside a function body) carry the `local` marker; they can never be looked
/// up globally.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClassId {
    package: FqName,
    relative: FqName,
    local: bool,
}

impl ClassId {
    /// Creates a class id from its parts.
    ///
    /// # Arguments
    ///
    /// * `package` - The package the outermost class lives in
    /// * `relative` - The class path relative to the package, outermost class first
    /// * `local` - Whether the class is local to a function body
    #[must_use]
    pub fn new(package: FqName, relative: FqName, local: bool) -> Self {
        ClassId {
            package,
            relative,
            local,
        }
    }

    /// Convenience constructor for a top-level class, e.g. `ClassId::top_level("kotlin", "Any")`.
    #[must_use]
    pub fn top_level(package: &str, name: &str) -> Self {
        ClassId::new(
            FqName::new(package),
            FqName::topmost(Name::identifier(name)),
            false,
        )
    }

    /// Interprets a fully qualified name as a top-level class.
    ///
    /// Returns `None` for the root name.
    #[must_use]
    pub fn top_level_from(fq_name: &FqName) -> Option<Self> {
        let short = fq_name.short_name()?.clone();
        Some(ClassId::new(fq_name.parent(), FqName::topmost(short), false))
    }

    /// Parses the string form produced by [`fmt::Display`]: `a/b/Outer.Inner`.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let (package, relative) = match text.rfind('/') {
            Some(pos) => (text[..pos].replace('/', "."), &text[pos + 1..]),
            None => (String::new(), text),
        };
        ClassId::new(FqName::new(&package), FqName::new(relative), false)
    }

    /// The package containing the outermost class.
    #[must_use]
    pub fn package_fq_name(&self) -> &FqName {
        &self.package
    }

    /// The class path relative to the package.
    #[must_use]
    pub fn relative_class_name(&self) -> &FqName {
        &self.relative
    }

    /// The simple name of the class itself.
    #[must_use]
    pub fn short_class_name(&self) -> Name {
        self.relative
            .short_name()
            .cloned()
            .unwrap_or_else(|| Name::special("no name provided"))
    }

    /// Returns `true` for local classes.
    #[must_use]
    pub fn is_local(&self) -> bool {
        self.local
    }

    /// Returns `true` if the class is nested inside another class.
    #[must_use]
    pub fn is_nested_class(&self) -> bool {
        self.relative.len() > 1
    }

    /// The id of the directly enclosing class, `None` for top-level classes.
    #[must_use]
    pub fn outer_class_id(&self) -> Option<ClassId> {
        if !self.is_nested_class() {
            return None;
        }
        Some(ClassId::new(
            self.package.clone(),
            self.relative.parent(),
            self.local,
        ))
    }

    /// The id of the outermost enclosing class (the class itself if it is top-level).
    #[must_use]
    pub fn outermost_class_id(&self) -> ClassId {
        match self.relative.segments().first() {
            Some(first) => ClassId::new(
                self.package.clone(),
                FqName::topmost(first.clone()),
                self.local,
            ),
            None => self.clone(),
        }
    }

    /// Number of classes in the nesting chain, `1` for a top-level class.
    #[must_use]
    pub fn nesting_level(&self) -> usize {
        self.relative.len()
    }

    /// The id of a class nested directly inside this one.
    #[must_use]
    pub fn create_nested_class_id(&self, name: Name) -> ClassId {
        ClassId::new(self.package.clone(), self.relative.child(name), self.local)
    }

    /// The dot separated fully qualified name; nested and package segments are not told apart.
    #[must_use]
    pub fn as_single_fq_name(&self) -> FqName {
        let mut segments = self.package.segments().to_vec();
        segments.extend_from_slice(self.relative.segments());
        FqName::from_segments(segments)
    }

    /// The name the class has on a file system or class path: package segments joined with `/`,
    /// nested classes joined with `$` (`a/b/Outer$Inner`).
    #[must_use]
    pub fn to_runtime_name(&self) -> String {
        let relative = self.relative.join("$");
        if self.package.is_root() {
            relative
        } else {
            format!("{}/{}", self.package.join("/"), relative)
        }
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.package.is_root() {
            write!(f, "{}/", self.package.join("/"))?;
        }
        f.write_str(&self.relative.join("."))
    }
}

impl fmt::Debug for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.local {
            write!(f, "ClassId({self}, local)")
        } else {
            write!(f, "ClassId({self})")
        }
    }
}
