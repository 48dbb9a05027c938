//! Binary blob access for serialized class metadata.
//!
//! This module contains the byte-level layer of the crate. It knows nothing about classes or
//! types; it only offers bounds-checked, cursor-based reading of the primitive encodings the
//! metadata format is built from.
//!
//! # Key Components
//!
//! - [`crate::file::parser::Parser`] - Cursor over a byte slice with compressed-integer and
//!   length-prefixed string support
//! - [`crate::file::io`] - Endian-aware primitive reads used by the parser
//!
//! Memory-mapping of metadata files lives in the file-system locator
//! ([`crate::locator::FileSystemClassFinder`]); blobs reach this layer as plain slices.

pub mod io;
pub mod parser;

pub use parser::Parser;
