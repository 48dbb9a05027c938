//! Structured reporting of recoverable resolution problems.
//!
//! Resolution absorbs missing dependencies and inconsistent hierarchies into placeholders and
//! deterministic picks. Each such event is handed to the [`ErrorReporter`] injected into the
//! module; the core never renders messages itself.

use std::sync::Arc;

use tracing::warn;

use crate::{
    metadata::flags::Visibility,
    names::{ClassId, Name},
    reporting::diagnostics::{Diagnostic, DiagnosticCategory, Diagnostics},
};

/// Sink for degraded-resolution events.
///
/// Every method is invoked at most once per event: an incomplete hierarchy once per class, an
/// override conflict once per class and member name.
pub trait ErrorReporter: Send + Sync {
    /// Some supertypes of `class` could not be located and were replaced by placeholders.
    fn report_incomplete_hierarchy(&self, class: &ClassId, missing: &[ClassId]);

    /// Inherited members `name` of `class` have equal signatures but incompatible return types.
    /// `candidates` lists the declaring classes in supertype declaration order; the first one was
    /// picked as the representative.
    fn report_override_conflict(&self, class: &ClassId, name: &Name, candidates: &[ClassId]);

    /// The supertypes `looping` of `class` lead back to `class` and were disconnected.
    fn report_cyclic_hierarchy(&self, class: &ClassId, looping: &[ClassId]);

    /// The visibility of the synthesized override `name` of `class` could not be derived from
    /// `candidates`; `chosen` was used.
    fn report_cannot_infer_visibility(
        &self,
        class: &ClassId,
        name: &Name,
        candidates: &[Visibility],
        chosen: Visibility,
    );
}

/// Drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopErrorReporter;

impl ErrorReporter for NoopErrorReporter {
    fn report_incomplete_hierarchy(&self, _class: &ClassId, _missing: &[ClassId]) {}

    fn report_override_conflict(&self, _class: &ClassId, _name: &Name, _candidates: &[ClassId]) {}

    fn report_cyclic_hierarchy(&self, _class: &ClassId, _looping: &[ClassId]) {}

    fn report_cannot_infer_visibility(
        &self,
        _class: &ClassId,
        _name: &Name,
        _candidates: &[Visibility],
        _chosen: Visibility,
    ) {
    }
}

/// Records every event in a shared [`Diagnostics`] container and logs it with `tracing`.
///
/// # Examples
///
/// ```rust
/// use metascope::reporting::{DiagnosticsReporter, ErrorReporter};
/// use metascope::names::ClassId;
///
/// let reporter = DiagnosticsReporter::new();
/// reporter.report_incomplete_hierarchy(
///     &ClassId::top_level("a", "Derived"),
///     &[ClassId::top_level("b", "Missing")],
/// );
/// assert_eq!(reporter.diagnostics().count(), 1);
/// ```
#[derive(Debug, Default, Clone)]
pub struct DiagnosticsReporter {
    diagnostics: Arc<Diagnostics>,
}

impl DiagnosticsReporter {
    /// Creates a reporter with a fresh container.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a reporter writing into an existing container.
    #[must_use]
    pub fn with_diagnostics(diagnostics: Arc<Diagnostics>) -> Self {
        DiagnosticsReporter { diagnostics }
    }

    /// The collected events.
    #[must_use]
    pub fn diagnostics(&self) -> &Arc<Diagnostics> {
        &self.diagnostics
    }
}

fn join_ids(ids: &[ClassId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl ErrorReporter for DiagnosticsReporter {
    fn report_incomplete_hierarchy(&self, class: &ClassId, missing: &[ClassId]) {
        warn!(class = %class, missing = ?missing, "incomplete class hierarchy");
        self.diagnostics.push(
            Diagnostic::new(
                DiagnosticCategory::IncompleteHierarchy,
                format!("Supertypes not found: {}", join_ids(missing)),
            )
            .with_class(class.clone()),
        );
    }

    fn report_override_conflict(&self, class: &ClassId, name: &Name, candidates: &[ClassId]) {
        warn!(class = %class, member = %name, candidates = ?candidates, "inherited member conflict");
        self.diagnostics.push(
            Diagnostic::new(
                DiagnosticCategory::OverrideConflict,
                format!(
                    "Incompatible inherited declarations from {}",
                    join_ids(candidates)
                ),
            )
            .with_class(class.clone())
            .with_member(name.clone()),
        );
    }

    fn report_cyclic_hierarchy(&self, class: &ClassId, looping: &[ClassId]) {
        warn!(class = %class, looping = ?looping, "cyclic class hierarchy");
        self.diagnostics.push(
            Diagnostic::new(
                DiagnosticCategory::CyclicHierarchy,
                format!("Supertypes lead back to the class: {}", join_ids(looping)),
            )
            .with_class(class.clone()),
        );
    }

    fn report_cannot_infer_visibility(
        &self,
        class: &ClassId,
        name: &Name,
        candidates: &[Visibility],
        chosen: Visibility,
    ) {
        warn!(class = %class, member = %name, candidates = ?candidates, chosen = %chosen, "cannot infer visibility");
        self.diagnostics.push(
            Diagnostic::new(
                DiagnosticCategory::Visibility,
                format!("Incomparable inherited visibilities {candidates:?}, using {chosen}"),
            )
            .with_class(class.clone())
            .with_member(name.clone()),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostics_reporter_categories() {
        let reporter = DiagnosticsReporter::new();
        let class = ClassId::top_level("a", "C");
        let name = Name::identifier("f");

        reporter.report_incomplete_hierarchy(&class, &[ClassId::top_level("b", "Gone")]);
        reporter.report_override_conflict(
            &class,
            &name,
            &[ClassId::top_level("a", "A"), ClassId::top_level("a", "B")],
        );
        reporter.report_cyclic_hierarchy(&class, &[class.clone()]);
        reporter.report_cannot_infer_visibility(
            &class,
            &name,
            &[Visibility::Protected, Visibility::Internal],
            Visibility::Public,
        );

        let diagnostics = reporter.diagnostics();
        assert_eq!(diagnostics.count(), 4);
        assert_eq!(diagnostics.error_count(), 1);
        assert_eq!(diagnostics.for_class(&class).len(), 4);

        let conflict = &diagnostics.by_category(DiagnosticCategory::OverrideConflict)[0];
        assert_eq!(conflict.member, Some(name));
        assert!(conflict.message.contains("a/A, a/B"));

        let missing = &diagnostics.by_category(DiagnosticCategory::IncompleteHierarchy)[0];
        assert!(missing.message.contains("b/Gone"));
    }

    #[test]
    fn test_shared_container() {
        let diagnostics = Arc::new(Diagnostics::new());
        let first = DiagnosticsReporter::with_diagnostics(Arc::clone(&diagnostics));
        let second = first.clone();

        first.report_cyclic_hierarchy(&ClassId::top_level("a", "A"), &[]);
        second.report_cyclic_hierarchy(&ClassId::top_level("a", "B"), &[]);
        assert_eq!(diagnostics.count(), 2);
    }
}
