use thiserror::Error;

use crate::{metadata::version::BinaryVersion, names::ClassId};

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! out_of_bounds_error {
    () => {
        crate::Error::OutOfBounds
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Errors returned by this crate are always *fatal* for the query that triggered them: corrupted
/// metadata, an incompatible binary format, or a broken structural contract. Degraded situations
/// that real-world partial class paths produce (a missing supertype, an unresolvable referenced
/// class, a diamond override conflict) never surface here. They are absorbed into placeholder
/// descriptors and reported out-of-band through [`crate::reporting::ErrorReporter`].
///
/// # Error Categories
///
/// ## Binary Format Errors
/// - [`Error::Malformed`] - Corrupted metadata (bad name index, unknown type parameter, ...)
/// - [`Error::OutOfBounds`] - Attempted to read beyond the end of a blob
/// - [`Error::IncompatibleVersion`] - Blob written by an unsupported format version
/// - [`Error::NotSupported`] - Not a metadata blob at all
/// - [`Error::Empty`] - Empty input provided
///
/// ## I/O Errors
/// - [`Error::FileError`] - Filesystem I/O errors from the file-system locator
///
/// ## Resolution Errors
/// - [`Error::RecursionDetected`] - A lazy value re-entered itself and has no fallback
/// - [`Error::LocalClassRequested`] - A placeholder was requested for a local class
/// - [`Error::ParameterCountMismatch`] - A substituted member copy changed its arity
/// - [`Error::FlexibleTypesRejected`] - A flexible type was met in a context that forbids them
/// - [`Error::ModuleReleased`] - A descriptor outlived its owning module
///
/// # Examples
///
/// ```rust,no_run
/// use metascope::{Error, ModuleBuilder, names::ClassId};
///
/// let module = ModuleBuilder::new("app").build()?;
/// match module.find_class(&ClassId::top_level("a.b", "Missing")) {
///     Ok(Some(class)) => println!("found {}", class.class_id()),
///     Ok(None) => println!("class is simply absent"),
///     Err(Error::IncompatibleVersion { expected, actual }) => {
///         eprintln!("metadata {actual} is not readable by {expected}");
///     }
///     Err(e) => eprintln!("corrupted metadata: {e}"),
/// }
/// # Ok::<(), metascope::Error>(())
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The metadata is damaged and could not be interpreted.
    ///
    /// Covers every integrity violation of the binary format, e.g. a name index that points
    /// outside the string pool or a type referring to an undeclared type parameter. The error
    /// includes the source location where the malformation was detected for debugging purposes.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while decoding a blob.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// The input is not a metadata blob.
    ///
    /// Returned when the leading magic does not match.
    #[error("This file type is not supported")]
    NotSupported,

    /// Provided input was empty.
    #[error("Provided input was empty")]
    Empty,

    /// The blob was written by a format version this library can not read.
    ///
    /// Detected right after the magic, before any pool or message is decoded, so no descriptor
    /// is ever built from such a blob. This is distinct from a class that is simply absent,
    /// which every lookup reports as `Ok(None)`.
    #[error("Incompatible metadata version {actual}, expected {expected}")]
    IncompatibleVersion {
        /// The newest version this library understands
        expected: BinaryVersion,
        /// The version recorded in the blob
        actual: BinaryVersion,
    },

    /// File I/O error.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// Generic error for miscellaneous failures.
    #[error("{0}")]
    Error(String),

    /// A lazy value was re-entered on the same thread while it was being computed, and the
    /// value has no documented recursion fallback.
    ///
    /// The associated string names the cell that recursed.
    #[error("Recursive evaluation of {0} detected")]
    RecursionDetected(String),

    /// A not-found placeholder was requested for a local class.
    ///
    /// Placeholders only stand in for globally addressable classes; asking for a local one is
    /// a contract violation of the caller.
    #[error("Unresolved local class: {0}")]
    LocalClassRequested(ClassId),

    /// A substituted copy of a member was given a different number of value parameters than
    /// the member it copies.
    #[error("Parameter count mismatch - expected {expected}, got {actual}")]
    ParameterCountMismatch {
        /// Number of parameters of the original member
        expected: usize,
        /// Number of parameter types supplied for the copy
        actual: usize,
    },

    /// A flexible type was encountered by a [`crate::types::FlexibleTypeFactory`] that forbids
    /// them.
    ///
    /// The associated string is the flexible type id recorded in the metadata.
    #[error("Flexible types are not supported here - {0}")]
    FlexibleTypesRejected(String),

    /// A descriptor was used after the [`crate::Module`] owning its graph was released.
    #[error("The owning module has been released")]
    ModuleReleased,

    /// Failed to lock target.
    #[error("Failed to lock target")]
    LockError,
}
