//! Symbolic identifiers used as cache keys across the whole graph.
//!
//! All identifiers are immutable and structurally comparable: two identifiers are equal iff
//! their segment sequences are equal. They are cheap to clone (segments are shared behind an
//! [`std::sync::Arc`]) since every memoization table keys on them.
//!
//! # Key Components
//!
//! - [`Name`] - A single simple name (`String`, `<init>`)
//! - [`FqName`] - A dot separated fully qualified name (`kotlin.collections`)
//! - [`ClassId`] - Package path plus nested class path (`kotlin/Map.Entry`)
//!
//! # Examples
//!
//! ```rust
//! use metascope::names::{ClassId, FqName, Name};
//!
//! let entry = ClassId::top_level("kotlin.collections", "Map").create_nested_class_id(Name::identifier("Entry"));
//! assert_eq!(entry.to_string(), "kotlin/collections/Map.Entry");
//! assert_eq!(entry.to_runtime_name(), "kotlin/collections/Map$Entry");
//! assert_eq!(entry.outer_class_id().unwrap().short_class_name().as_str(), "Map");
//! assert_eq!(entry.package_fq_name(), &FqName::new("kotlin.collections"));
//! ```

mod classid;
mod name;

pub use classid::ClassId;
pub use name::{FqName, Name};
