use serde::Serialize;

use crate::domain::{Location, Priority, RequirementIndex, Severity, SeverityTable};

/// How a record is disconnected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrphanCategory {
    /// No links in or out.
    TrueOrphan,
    /// Linked to, but links nowhere. Often a legitimate leaf.
    DeadEnd,
    /// Links out, but nothing links to it. Often a legitimate root.
    SourceOnly,
}

impl OrphanCategory {
    /// Snake-case tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TrueOrphan => "true_orphan",
            Self::DeadEnd => "dead_end",
            Self::SourceOnly => "source_only",
        }
    }
}

/// A record with zero in-degree, zero out-degree, or both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Orphan {
    /// The record.
    pub id: String,
    /// Which degree is missing.
    pub category: OrphanCategory,
    /// The record's priority bucket.
    pub priority: Priority,
    /// Graded from the priority.
    pub severity: Severity,
    /// Existing records linking to this one.
    pub in_degree: usize,
    /// Outgoing links across all types.
    pub out_degree: usize,
    /// Where the record is defined.
    pub location: Location,
}

/// Classifies every record by its in/out-degree combination.
///
/// Connected records are not reported. Output is sorted by id.
#[must_use]
pub fn classify_orphans(index: &RequirementIndex, table: &SeverityTable) -> Vec<Orphan> {
    index
        .sorted()
        .into_iter()
        .filter_map(|record| {
            let out_degree = record.outgoing().count();
            let in_degree = index.incoming(&record.id).count();

            let category = match (out_degree, in_degree) {
                (0, 0) => OrphanCategory::TrueOrphan,
                (0, _) => OrphanCategory::DeadEnd,
                (_, 0) => OrphanCategory::SourceOnly,
                _ => return None,
            };

            let priority = record.priority();
            let severity = match category {
                OrphanCategory::TrueOrphan => table.get(priority),
                OrphanCategory::DeadEnd | OrphanCategory::SourceOnly => {
                    table.get(priority).downgrade()
                }
            };

            Some(Orphan {
                id: record.id.clone(),
                category,
                priority,
                severity,
                in_degree,
                out_degree,
                location: record.location.clone(),
            })
        })
        .collect()
}
