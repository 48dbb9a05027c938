// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(clippy::too_many_arguments)]
//#![deny(unsafe_code)]
// - 'locator/filesystem.rs' uses mmap to map a metadata file into memory

//! # metascope
//!
//! A lazy, thread-safe resolution engine that rebuilds a linked symbol graph (classes, members,
//! types, type parameters, packages) from compact binary class metadata.
//!
//! Metadata is stored per class or per package part in self-contained blobs. Each blob carries
//! its own name pools and type table; descriptors are only created when a query reaches them,
//! each at most once per [`Module`], and every derived property (supertypes, member lists,
//! constructors, type arguments) is computed on first access and cached.
//!
//! ## Features
//!
//! - **Lazy everywhere** - Nothing is deserialized until a query needs it
//! - **Stable identity** - One descriptor instance per class id, even under concurrent first access
//! - **Partial class paths** - Missing classes become not-found placeholders instead of errors
//! - **Fake overrides** - Inherited members are materialized per class with substituted signatures
//! - **Out-of-band reporting** - Degraded situations go to an [`reporting::ErrorReporter`]
//! - **Pluggable sources** - In-memory, file system, package blobs, or any [`locator::ClassDataFinder`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use metascope::prelude::*;
//! use std::sync::Arc;
//!
//! let finder = FileSystemClassFinder::new("build/metadata", ResolverConfig::default())?;
//! let module = ModuleBuilder::new("app").finder(Arc::new(finder)).build()?;
//!
//! let class = module.find_class(&ClassId::parse("app/Service"))?.expect("class exists");
//! for function in class.member_scope().functions(&Name::identifier("start"), None)? {
//!     println!("{:?} {} (overrides {})", function.kind(), function.name(), function.overridden().len());
//! }
//! # Ok::<(), metascope::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`metadata`] decodes blobs into immutable messages ([`metadata::proto`])
//! - [`locator`] finds the message for a class id or package name
//! - [`deserialization`] turns messages into descriptors lazily
//! - [`descriptors`], [`types`] and [`scopes`] form the resolved graph
//! - [`module`] owns all caches and ties the collaborators together
//! - [`storage`] provides the memoization primitives everything is built on
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T>`]. Errors are reserved for corrupted metadata,
//! incompatible blobs, I/O failures and broken structural contracts; a class that simply is
//! not on the class path never produces an error.

#[macro_use]
pub(crate) mod macros;

#[macro_use]
pub(crate) mod error;
pub(crate) mod utils;

/// Shared functionality which is used in unit- and integration-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust,no_run
/// use metascope::prelude::*;
///
/// let module = ModuleBuilder::new("empty").build()?;
/// let any = module.find_class(&BuiltInClass::Any.class_id())?;
/// assert!(any.is_some());
/// # Ok::<(), metascope::Error>(())
/// ```
pub mod prelude;

/// Low-level byte parsing used by the blob decoder.
pub mod file;

/// Resolver configuration.
pub mod config;

/// Simple names, qualified names and class ids.
pub mod names;

/// Lazy values and memoized functions with recursion detection.
pub mod storage;

/// The binary metadata format: version marker, name pools, type table and messages.
///
/// # Key Components
///
/// - [`metadata::MetadataBlob`] - Decoder for one blob
/// - [`metadata::NameResolver`] / [`metadata::TypeTable`] - Per-blob lookup tables
/// - [`metadata::proto`] - The decoded messages
/// - [`metadata::flags`] - Flag words and their typed views
///
/// With the `test-support` feature, `metadata::writer` and `metadata::builder` fabricate blobs
/// for tests, benchmarks and fuzzing. They are not a serializer for real class files.
pub mod metadata;

/// Sources of class and package metadata.
pub mod locator;

/// Built-in declarations (`kotlin.Any`, `kotlin.String`, ...).
pub mod builtins;

/// Descriptors of classes, members, type parameters and packages.
pub mod descriptors;

/// Lazy deserialization of messages into descriptors.
pub mod deserialization;

/// Resolved types, substitution and erasure.
pub mod types;

/// Member scopes and override resolution.
pub mod scopes;

/// Out-of-band reporting of degraded resolution and member lookups.
pub mod reporting;

/// The module: root of the symbol graph.
pub mod module;

/// `metascope` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `metascope` Error type
///
/// # Examples
///
/// ```rust
/// use metascope::{metadata::MetadataBlob, Error, ResolverConfig};
///
/// match MetadataBlob::parse(b"not a blob", &ResolverConfig::default()) {
///     Ok(_) => println!("decoded"),
///     Err(Error::NotSupported) => println!("not a metadata blob"),
///     Err(Error::IncompatibleVersion { actual, .. }) => println!("written by {actual}"),
///     Err(e) => println!("Error: {e}"),
/// }
/// ```
pub use error::Error;

/// Resolver configuration, see [`config::ResolverConfig`].
pub use config::ResolverConfig;

/// Byte-level reader for blobs.
pub use file::Parser;

/// The graph root and its builder.
pub use module::{Module, ModuleBuilder};
