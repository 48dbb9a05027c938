//! Resolver configuration.
//!
//! [`ResolverConfig`] is handed to [`crate::ModuleBuilder`] once and stays fixed for the
//! lifetime of the module. It is a plain `Copy` value so every layer can carry its own copy.

/// Configuration for metadata resolution.
///
/// # Examples
///
/// ```rust
/// use metascope::ResolverConfig;
///
/// let config = ResolverConfig::default();
/// assert!(!config.skip_metadata_version_check);
/// assert!(config.detect_supertype_loops);
///
/// let lenient = ResolverConfig::permissive();
/// assert!(lenient.skip_metadata_version_check);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Decode blobs even if their version marker is not compatible with this library
    pub skip_metadata_version_check: bool,

    /// Search the supertype graph for loops and disconnect looping supertypes
    pub detect_supertype_loops: bool,

    /// Maximum depth for walks over the supertype graph and for type parameter erasure
    /// (default: 256)
    pub max_hierarchy_depth: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            skip_metadata_version_check: false,
            detect_supertype_loops: true,
            max_hierarchy_depth: 256,
        }
    }
}

impl ResolverConfig {
    /// All checks enabled; identical to the default.
    #[must_use]
    pub fn strict() -> Self {
        Self::default()
    }

    /// Accepts blobs of any version and skips the supertype loop search.
    ///
    /// **Warning**: a blob of an unknown version may decode into garbage, and a looping
    /// hierarchy is only cut by `max_hierarchy_depth`. Use for inspection tools, not for
    /// anything that trusts the result.
    #[must_use]
    pub fn permissive() -> Self {
        Self {
            skip_metadata_version_check: true,
            detect_supertype_loops: false,
            max_hierarchy_depth: 256,
        }
    }

    /// Returns the same configuration with a different hierarchy depth bound.
    #[must_use]
    pub fn with_max_hierarchy_depth(mut self, depth: usize) -> Self {
        self.max_hierarchy_depth = depth;
        self
    }
}
