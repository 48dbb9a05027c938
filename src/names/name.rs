use std::{fmt, sync::Arc};

/// A simple (unqualified) name.
///
/// Names starting with `<` are *special* names that can never be written in source code,
/// e.g. `<init>` for constructors or `<no name provided>` for anonymous declarations.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Name(Arc<str>);

impl Name {
    /// Creates an ordinary identifier name.
    #[must_use]
    pub fn identifier(name: impl AsRef<str>) -> Self {
        Name(Arc::from(name.as_ref()))
    }

    /// Creates a special name; the name is wrapped in angle brackets if it is not already.
    #[must_use]
    pub fn special(name: impl AsRef<str>) -> Self {
        let name = name.as_ref();
        if name.starts_with('<') && name.ends_with('>') {
            Name(Arc::from(name))
        } else {
            Name(Arc::from(format!("<{name}>")))
        }
    }

    /// The name shared by all constructors.
    #[must_use]
    pub fn init() -> Self {
        Name::special("init")
    }

    /// Returns `true` for names that can not be written in source code.
    #[must_use]
    pub fn is_special(&self) -> bool {
        self.0.starts_with('<')
    }

    /// Returns the name text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({})", self.0)
    }
}

impl From<&str> for Name {
    fn from(value: &str) -> Self {
        Name::identifier(value)
    }
}

/// A fully qualified, dot separated name such as `kotlin.collections.List`.
///
/// The root (empty) name is the default package.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct FqName {
    segments: Arc<[Name]>,
}

impl FqName {
    /// Parses a dot separated name. An empty string yields the root.
    #[must_use]
    pub fn new(name: &str) -> Self {
        if name.is_empty() {
            return FqName::root();
        }
        FqName::from_segments(name.split('.').map(Name::identifier).collect())
    }

    /// The root name (the default package).
    #[must_use]
    pub fn root() -> Self {
        FqName {
            segments: Arc::from(Vec::new()),
        }
    }

    /// Builds a name from its segments, outermost first.
    #[must_use]
    pub fn from_segments(segments: Vec<Name>) -> Self {
        FqName {
            segments: Arc::from(segments),
        }
    }

    /// Builds a name of exactly one segment.
    #[must_use]
    pub fn topmost(name: Name) -> Self {
        FqName::from_segments(vec![name])
    }

    /// Returns `true` for the root name.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// The segments, outermost first.
    #[must_use]
    pub fn segments(&self) -> &[Name] {
        &self.segments
    }

    /// The last segment, `None` for the root.
    #[must_use]
    pub fn short_name(&self) -> Option<&Name> {
        self.segments.last()
    }

    /// The name without its last segment; the root is its own parent.
    #[must_use]
    pub fn parent(&self) -> FqName {
        match self.segments.split_last() {
            Some((_, parent)) => FqName::from_segments(parent.to_vec()),
            None => FqName::root(),
        }
    }

    /// Appends one segment.
    #[must_use]
    pub fn child(&self, name: Name) -> FqName {
        let mut segments = self.segments.to_vec();
        segments.push(name);
        FqName::from_segments(segments)
    }

    /// Returns `true` if `prefix` is a segment-wise prefix of this name.
    #[must_use]
    pub fn starts_with(&self, prefix: &FqName) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    /// Number of segments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Same as [`FqName::is_root`].
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Joins the segments with `separator`.
    #[must_use]
    pub fn join(&self, separator: &str) -> String {
        self.segments
            .iter()
            .map(Name::as_str)
            .collect::<Vec<_>>()
            .join(separator)
    }
}

impl fmt::Display for FqName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return f.write_str("<root>");
        }
        f.write_str(&self.join("."))
    }
}

impl fmt::Debug for FqName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FqName({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_special_names() {
        assert!(Name::init().is_special());
        assert_eq!(Name::init().as_str(), "<init>");
        assert_eq!(Name::special("<init>"), Name::init());
        assert!(!Name::identifier("f").is_special());
    }

    #[test]
    fn test_fq_name_navigation() {
        let name = FqName::new("kotlin.collections.List");
        assert_eq!(name.len(), 3);
        assert_eq!(name.short_name().unwrap().as_str(), "List");
        assert_eq!(name.parent(), FqName::new("kotlin.collections"));
        assert_eq!(
            name.parent().child(Name::identifier("Set")),
            FqName::new("kotlin.collections.Set")
        );
        assert!(name.starts_with(&FqName::new("kotlin")));
        assert!(!name.starts_with(&FqName::new("kotlinx")));
    }

    #[test]
    fn test_root() {
        let root = FqName::new("");
        assert!(root.is_root());
        assert_eq!(root, FqName::root());
        assert_eq!(root.parent(), root);
        assert!(root.short_name().is_none());
        assert_eq!(root.to_string(), "<root>");
    }

    #[test]
    fn test_structural_equality() {
        assert_eq!(FqName::new("a.b"), FqName::new("a").child(Name::identifier("b")));
        assert_ne!(FqName::new("a.b"), FqName::new("a.b.c"));
    }
}
