//! Usage tracking for incremental builds.
//!
//! Every lookup of a contributed member (a function, property or classifier looked up by name
//! in a class or package scope) that carries a [`LookupLocation`] is forwarded to the module's
//! [`LookupTracker`]. A build system can use the records to find out which files depend on which
//! names.

use crate::names::{FqName, Name};

/// Line and column inside a source file, both 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    /// Line number
    pub line: u32,
    /// Column number
    pub column: u32,
}

/// Where a lookup originates from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LookupLocation {
    /// Path of the file performing the lookup
    pub file_path: String,
    /// Position inside the file, if known
    pub position: Option<Position>,
}

impl LookupLocation {
    /// A location without a position.
    #[must_use]
    pub fn file(file_path: impl Into<String>) -> Self {
        LookupLocation {
            file_path: file_path.into(),
            position: None,
        }
    }

    /// A location with a position.
    #[must_use]
    pub fn at(file_path: impl Into<String>, line: u32, column: u32) -> Self {
        LookupLocation {
            file_path: file_path.into(),
            position: Some(Position { line, column }),
        }
    }
}

/// What kind of scope a lookup went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum ScopeKind {
    /// The member scope of a class
    Classifier,
    /// The member scope of a package
    Package,
}

/// Consumer of lookup events.
pub trait LookupTracker: Send + Sync {
    /// Whether positions should be passed to [`LookupTracker::record`].
    fn requires_position(&self) -> bool;

    /// Records one lookup of `name` in the scope owned by `scope_fq_name`.
    fn record(
        &self,
        file_path: &str,
        position: Option<Position>,
        scope_fq_name: &FqName,
        scope_kind: ScopeKind,
        name: &Name,
    );
}

/// Tracks nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLookupTracker;

impl LookupTracker for NoopLookupTracker {
    fn requires_position(&self) -> bool {
        false
    }

    fn record(
        &self,
        _file_path: &str,
        _position: Option<Position>,
        _scope_fq_name: &FqName,
        _scope_kind: ScopeKind,
        _name: &Name,
    ) {
    }
}

/// One recorded lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupRecord {
    /// Path of the file performing the lookup
    pub file_path: String,
    /// Position, present only if the tracker requires positions
    pub position: Option<Position>,
    /// Owner of the scope that was searched
    pub scope_fq_name: FqName,
    /// Kind of the scope that was searched
    pub scope_kind: ScopeKind,
    /// The name looked up
    pub name: Name,
}

/// Keeps every lookup in a lock-free append-only list.
#[derive(Debug, Default)]
pub struct RecordingLookupTracker {
    records: boxcar::Vec<LookupRecord>,
    with_positions: bool,
}

impl RecordingLookupTracker {
    /// Creates a tracker that ignores positions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a tracker that asks for positions.
    #[must_use]
    pub fn with_positions() -> Self {
        RecordingLookupTracker {
            records: boxcar::Vec::new(),
            with_positions: true,
        }
    }

    /// All records in insertion order.
    pub fn records(&self) -> Vec<LookupRecord> {
        self.records.iter().map(|(_, r)| r.clone()).collect()
    }

    /// Number of records.
    pub fn count(&self) -> usize {
        self.records.count()
    }
}

impl LookupTracker for RecordingLookupTracker {
    fn requires_position(&self) -> bool {
        self.with_positions
    }

    fn record(
        &self,
        file_path: &str,
        position: Option<Position>,
        scope_fq_name: &FqName,
        scope_kind: ScopeKind,
        name: &Name,
    ) {
        self.records.push(LookupRecord {
            file_path: file_path.to_string(),
            position,
            scope_fq_name: scope_fq_name.clone(),
            scope_kind,
            name: name.clone(),
        });
    }
}

/// Forwards one lookup to `tracker`, dropping the position unless the tracker wants it.
pub(crate) fn record_lookup(
    tracker: &dyn LookupTracker,
    location: Option<&LookupLocation>,
    scope_fq_name: &FqName,
    scope_kind: ScopeKind,
    name: &Name,
) {
    let Some(location) = location else {
        return;
    };
    let position = if tracker.requires_position() {
        location.position
    } else {
        None
    };
    tracker.record(&location.file_path, position, scope_fq_name, scope_kind, name);
}
