//! Binary metadata: the raw, unresolved layer.
//!
//! This module decodes metadata blobs into immutable message structures and provides the name
//! pools and type tables needed to interpret them. Nothing here links entities together; that
//! happens lazily in [`crate::deserialization`].
//!
//! # Key Components
//!
//! - [`blob`] - Blob decoder with the up-front version check
//! - [`flags`] - Packed flag words (visibility, modality, kinds and attribute bits)
//! - [`proto`] - Decoded messages (classes, members, types, type parameters)
//! - [`NameResolver`] / [`NameTableBuilder`] - String and qualified-name pools
//! - [`TypeTable`] - Types shared by index within one blob
//! - [`BinaryVersion`] - Format version marker and compatibility rule
//! - `builder` / `writer` - Fabricating blobs in memory, behind the `test-support` feature
//!
//! # Examples
//!
//! ```rust
//! use metascope::metadata::{flags::Visibility, NameTableBuilder};
//! use metascope::names::ClassId;
//!
//! let mut names = NameTableBuilder::new();
//! let index = names.class_id(&ClassId::top_level("kotlin.collections", "List"));
//! let resolver = names.build();
//!
//! assert_eq!(resolver.fq_name(index)?.to_string(), "kotlin.collections.List");
//! assert_eq!(Visibility::from_flags(0b110), Visibility::Public);
//! # Ok::<(), metascope::Error>(())
//! ```

/// Decoder for serialized metadata blobs
pub mod blob;
/// In-memory message construction
#[cfg(feature = "test-support")]
pub mod builder;
#[cfg(not(feature = "test-support"))]
#[allow(dead_code)]
pub(crate) mod builder;
/// Packed declaration flags
pub mod flags;
/// String and qualified-name pools
pub mod nameresolver;
/// Decoded metadata messages
pub mod proto;
/// Shared type table of a blob
pub mod typetable;
/// Binary format version
pub mod version;
/// Blob encoder
#[cfg(any(test, feature = "test-support"))]
pub mod writer;

pub use blob::{BlobPayload, MetadataBlob};
pub use nameresolver::{NameResolver, NameTableBuilder, QualifiedName, QualifiedNameKind};
pub use typetable::TypeTable;
pub use version::BinaryVersion;
