//! Out-of-band reporting collaborators.
//!
//! The resolver consumes two sinks that are injected through [`crate::ModuleBuilder`]:
//!
//! - [`ErrorReporter`] receives structured events for every degradation (missing supertypes,
//!   override conflicts, supertype cycles, visibility policy decisions). [`NoopErrorReporter`]
//!   is the default; [`DiagnosticsReporter`] collects into [`Diagnostics`] and logs via `tracing`.
//! - [`LookupTracker`] receives every located member lookup. [`NoopLookupTracker`] is the
//!   default; [`RecordingLookupTracker`] keeps them in memory.

pub mod diagnostics;
pub mod errors;
pub mod lookup;

pub use diagnostics::{Diagnostic, DiagnosticCategory, DiagnosticSeverity, Diagnostics};
pub use errors::{DiagnosticsReporter, ErrorReporter, NoopErrorReporter};
pub use lookup::{
    LookupLocation, LookupRecord, LookupTracker, NoopLookupTracker, Position,
    RecordingLookupTracker, ScopeKind,
};
