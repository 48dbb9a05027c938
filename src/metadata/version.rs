//! Binary format version marker and its compatibility rule.

use std::fmt;

/// Version of the metadata format a blob was written with.
///
/// Compatibility follows the usual reader rule: the major version must match exactly, and the
/// minor version must not be newer than the one this library implements. Patch releases never
/// change the layout.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct BinaryVersion {
    /// Incompatible layout changes
    pub major: u32,
    /// Backwards compatible additions
    pub minor: u32,
    /// Fixes without layout impact
    pub patch: u32,
}

impl BinaryVersion {
    /// The newest version this library reads and the one the test encoder writes.
    pub const CURRENT: BinaryVersion = BinaryVersion::new(1, 1, 0);

    /// Creates a version triple.
    #[must_use]
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        BinaryVersion {
            major,
            minor,
            patch,
        }
    }

    /// Returns `true` if a blob of this version can be decoded by this library.
    #[must_use]
    pub fn is_compatible(&self) -> bool {
        self.major == Self::CURRENT.major && self.minor <= Self::CURRENT.minor
    }
}

impl fmt::Display for BinaryVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}
