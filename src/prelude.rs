//! # metascope Prelude
//!
//! The most commonly used types and traits of the library. Import this module to get quick
//! access to the module builder, the finders, names and descriptors.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all metascope operations
pub use crate::Error;

/// The result type used throughout metascope
pub use crate::Result;

/// Resolver configuration
pub use crate::ResolverConfig;

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// The graph root and its builder
pub use crate::module::{Module, ModuleBuilder};

/// Metadata sources
pub use crate::locator::{
    ClassDataFinder, CompositeClassFinder, FileSystemClassFinder, MemoryClassFinder,
    PackageBlobFinder,
};

// ================================================================================================
// Names
// ================================================================================================

pub use crate::names::{ClassId, FqName, Name};

// ================================================================================================
// Descriptors, Types and Scopes
// ================================================================================================

pub use crate::builtins::BuiltInClass;
pub use crate::descriptors::{
    CallableMember, ClassDescriptor, ClassRc, ClassRef, ConstructorDescriptor, FunctionDescriptor,
    PackageFragment, PackageView, PropertyDescriptor, TypeParameterDescriptor,
    ValueParameterDescriptor,
};
pub use crate::metadata::flags::{ClassKind, MemberKind, Modality, Visibility};
pub use crate::scopes::MemberScope;
pub use crate::types::{Type, TypeConstructor, TypeProjection, Variance};

// ================================================================================================
// Reporting
// ================================================================================================

pub use crate::reporting::{
    DiagnosticsReporter, ErrorReporter, LookupLocation, LookupTracker, RecordingLookupTracker,
};
