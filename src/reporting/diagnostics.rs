//! Collected resolution diagnostics.
//!
//! Resolution never fails because a dependency is missing or a hierarchy is inconsistent.
//! [`crate::reporting::DiagnosticsReporter`] turns each such event into a [`Diagnostic`] and
//! appends it here, so a caller can inspect what degraded after its queries completed.
//!
//! Entries are appended to a `boxcar::Vec`: lazily resolved descriptors report from whichever
//! thread first touches them, and appends never block readers.
//!
//! ```rust
//! use metascope::names::ClassId;
//! use metascope::reporting::{Diagnostic, DiagnosticCategory, Diagnostics};
//!
//! let diagnostics = Diagnostics::new();
//! diagnostics.push(
//!     Diagnostic::new(DiagnosticCategory::IncompleteHierarchy, "Supertypes not found: a/Missing")
//!         .with_class(ClassId::top_level("a", "Derived")),
//! );
//!
//! assert_eq!(diagnostics.warning_count(), 1);
//! assert_eq!(diagnostics.category_counts()[0].1, 1);
//! ```

use std::fmt::{self, Write};

use strum::IntoEnumIterator;

use crate::names::{ClassId, Name};

/// How much a diagnostic degrades the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, strum::Display)]
pub enum DiagnosticSeverity {
    /// Part of the graph was replaced by a placeholder or a deterministic pick.
    #[strum(to_string = "WARN")]
    Warning,

    /// Metadata contradicts itself and resolution had to cut through it.
    #[strum(to_string = "ERROR")]
    Error,
}

/// The degraded-resolution event a diagnostic records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
pub enum DiagnosticCategory {
    /// A supertype could not be located and was replaced by a placeholder.
    IncompleteHierarchy,

    /// Inherited members with the same signature disagree on their return type.
    OverrideConflict,

    /// A class is (transitively) its own supertype.
    CyclicHierarchy,

    /// The visibility of a synthesized override had to be chosen by policy.
    Visibility,
}

impl DiagnosticCategory {
    /// Severity of every diagnostic in this category.
    #[must_use]
    pub fn severity(self) -> DiagnosticSeverity {
        match self {
            DiagnosticCategory::CyclicHierarchy => DiagnosticSeverity::Error,
            DiagnosticCategory::IncompleteHierarchy
            | DiagnosticCategory::OverrideConflict
            | DiagnosticCategory::Visibility => DiagnosticSeverity::Warning,
        }
    }
}

/// One recorded event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Derived from the category
    pub severity: DiagnosticSeverity,
    /// What happened
    pub category: DiagnosticCategory,
    /// Human-readable description
    pub message: String,
    /// The class the event was observed on
    pub class: Option<ClassId>,
    /// The member the event concerns
    pub member: Option<Name>,
}

impl Diagnostic {
    /// Creates an entry not yet attached to a class.
    pub fn new(category: DiagnosticCategory, message: impl Into<String>) -> Self {
        Diagnostic {
            severity: category.severity(),
            category,
            message: message.into(),
            class: None,
            member: None,
        }
    }

    /// Attaches the class the event was observed on.
    #[must_use]
    pub fn with_class(mut self, class: ClassId) -> Self {
        self.class = Some(class);
        self
    }

    /// Attaches the member the event concerns.
    #[must_use]
    pub fn with_member(mut self, member: Name) -> Self {
        self.member = Some(member);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.category)?;
        match (&self.class, &self.member) {
            (Some(class), Some(member)) => write!(f, " {class}.{member}")?,
            (Some(class), None) => write!(f, " {class}")?,
            (None, Some(member)) => write!(f, " {member}")?,
            (None, None) => {}
        }
        write!(f, ": {}", self.message)
    }
}

/// Append-only, thread-safe list of diagnostics.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: boxcar::Vec<Diagnostic>,
}

impl Diagnostics {
    /// Creates an empty container.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry.
    pub fn push(&self, diagnostic: Diagnostic) {
        self.entries.push(diagnostic);
    }

    /// Number of entries.
    pub fn count(&self) -> usize {
        self.entries.count()
    }

    /// Returns `true` if nothing was reported.
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// All entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().map(|(_, d)| d)
    }

    /// Number of error-level entries.
    pub fn error_count(&self) -> usize {
        self.iter()
            .filter(|d| d.severity == DiagnosticSeverity::Error)
            .count()
    }

    /// Number of warning-level entries.
    pub fn warning_count(&self) -> usize {
        self.iter()
            .filter(|d| d.severity == DiagnosticSeverity::Warning)
            .count()
    }

    /// Entries of one category.
    pub fn by_category(&self, category: DiagnosticCategory) -> Vec<&Diagnostic> {
        self.iter().filter(|d| d.category == category).collect()
    }

    /// Entries observed on `class`.
    pub fn for_class(&self, class: &ClassId) -> Vec<&Diagnostic> {
        self.iter()
            .filter(|d| d.class.as_ref() == Some(class))
            .collect()
    }

    /// Entries concerning member `name` of `class`.
    pub fn for_member(&self, class: &ClassId, name: &Name) -> Vec<&Diagnostic> {
        self.iter()
            .filter(|d| d.class.as_ref() == Some(class) && d.member.as_ref() == Some(name))
            .collect()
    }

    /// Number of entries per category, in declaration order of the categories.
    pub fn category_counts(&self) -> Vec<(DiagnosticCategory, usize)> {
        DiagnosticCategory::iter()
            .map(|category| {
                let count = self.iter().filter(|d| d.category == category).count();
                (category, count)
            })
            .collect()
    }

    /// Multi-line report: one count line, then every entry, errors first.
    pub fn summary(&self) -> String {
        let mut output = String::new();
        let _ = write!(output, "{} diagnostic(s)", self.count());
        for (category, count) in self.category_counts() {
            if count > 0 {
                let _ = write!(output, ", {category}: {count}");
            }
        }
        output.push('\n');

        let mut entries: Vec<&Diagnostic> = self.iter().collect();
        entries.sort_by(|a, b| b.severity.cmp(&a.severity));
        for entry in entries {
            let _ = writeln!(output, "  {entry}");
        }
        output
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}
