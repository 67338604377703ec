//! Cheap checks suitable for running on every save.

use crate::domain::{Diagnostic, DiagnosticKind, DuplicateIdFault, RequirementIndex, Severity};

/// Duplicate-id and dangling-link diagnostics.
///
/// Duplicates are reported at the location of the record that lost, with the
/// surviving record's location in the message. Dangling links are reported
/// once per `(record, link type, target)`.
#[must_use]
pub fn quick_check(index: &RequirementIndex, duplicates: &[DuplicateIdFault]) -> Vec<Diagnostic> {
    let mut diagnostics: Vec<Diagnostic> = duplicates
        .iter()
        .map(|fault| {
            Diagnostic::new(
                DiagnosticKind::DuplicateId,
                Severity::High,
                format!("duplicate id '{}', also defined at {}", fault.id, fault.incoming),
            )
            .at(Some(fault.existing.clone()))
            .related([&fault.id])
        })
        .collect();

    for record in index.sorted() {
        let mut reported = std::collections::BTreeSet::new();
        for (link_type, target) in record.outgoing() {
            if index.contains(target) || !reported.insert((link_type, target)) {
                continue;
            }
            diagnostics.push(
                Diagnostic::new(
                    DiagnosticKind::DanglingLink,
                    Severity::Medium,
                    format!("{} links to unknown id '{target}' via '{link_type}'", record.id),
                )
                .at(Some(record.location.clone()))
                .related([record.id.as_str(), target]),
            );
        }
    }

    diagnostics
}
