//! Ordered-status invariants across directed edges.

use serde::Serialize;

use crate::{
    analysis::TypedGraph,
    domain::{AnalysisConfig, Location, Priority, RequirementIndex, RequirementObject, Severity},
};

const DRAFT: &str = "draft";
const REVIEW: &str = "review";
const APPROVED: &str = "approved";
const IMPLEMENTED: &str = "implemented";
const BASELINED: &str = "baselined";

/// Which ordering rule an edge breaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// An approved record links to a draft.
    ApprovedToDraft,
    /// An implemented record links to a draft.
    ImplementedToDraft,
    /// A baselined record links to a draft or a record under review.
    BaselinedToDraft,
}

impl ViolationKind {
    /// Snake-case tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ApprovedToDraft => "approved_to_draft",
            Self::ImplementedToDraft => "implemented_to_draft",
            Self::BaselinedToDraft => "baselined_to_draft",
        }
    }
}

/// A "more final" record linking to a "less final" one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusInconsistency {
    /// The rule broken.
    pub kind: ViolationKind,
    /// `[from, to]`.
    pub chain: [String; 2],
    /// Status of the linking record.
    pub from_status: String,
    /// Status of the linked record.
    pub to_status: String,
    /// Link type of the offending edge.
    pub link_type: String,
    /// Graded from the kind and the linking record's priority.
    pub severity: Severity,
    /// Where the linking record is defined.
    pub location: Location,
}

/// Checks every typed edge against the ordered status vocabulary.
///
/// Edges where either end has no status, or a status outside the vocabulary,
/// are skipped. Dangling targets are skipped.
#[must_use]
pub fn check_status_consistency(
    index: &RequirementIndex,
    graph: &TypedGraph<'_>,
    config: &AnalysisConfig,
) -> Vec<StatusInconsistency> {
    let mut violations = Vec::new();

    for from in index.sorted() {
        let Some((from_status, from_rank)) = ranked(from, config) else {
            continue;
        };

        for (link_type, target) in graph.successors(&from.id) {
            let Some(to) = index.get(target) else {
                continue;
            };
            let Some((to_status, to_rank)) = ranked(to, config) else {
                continue;
            };
            if from_rank <= to_rank {
                continue;
            }
            let Some(kind) = violation(from, from_status, to_status, config) else {
                continue;
            };

            violations.push(StatusInconsistency {
                kind,
                chain: [from.id.clone(), to.id.clone()],
                from_status: from_status.to_string(),
                to_status: to_status.to_string(),
                link_type: link_type.to_string(),
                severity: severity(kind, from.priority()),
                location: from.location.clone(),
            });
        }
    }

    violations
}

fn ranked<'r>(record: &'r RequirementObject, config: &AnalysisConfig) -> Option<(&'r str, usize)> {
    let status = record.status.as_deref()?;
    config.status_rank(status).map(|rank| (status, rank))
}

fn violation(
    from: &RequirementObject,
    from_status: &str,
    to_status: &str,
    config: &AnalysisConfig,
) -> Option<ViolationKind> {
    let rules = &config.status_rules;
    match (from_status, to_status) {
        (APPROVED, DRAFT) if rules.approved_to_draft => Some(ViolationKind::ApprovedToDraft),
        (IMPLEMENTED, DRAFT) if rules.implemented_to_draft => {
            Some(ViolationKind::ImplementedToDraft)
        }
        (BASELINED, DRAFT | REVIEW) if rules.baselined_to_draft && from.baseline().is_some() => {
            Some(ViolationKind::BaselinedToDraft)
        }
        _ => None,
    }
}

const fn severity(kind: ViolationKind, priority: Priority) -> Severity {
    let base = match kind {
        ViolationKind::BaselinedToDraft => return Severity::High,
        ViolationKind::ImplementedToDraft => Severity::High,
        ViolationKind::ApprovedToDraft => Severity::Medium,
    };
    match priority {
        Priority::Critical => base.escalate(),
        Priority::Low => base.downgrade(),
        Priority::High | Priority::Medium => base,
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;
    use crate::domain::{IndexBuilder, StatusRules};

    fn record(id: &str, status: &str) -> RequirementObject {
        RequirementObject::new(id, "requirement", Location::new("a.rst", 3)).with_status(status)
    }

    fn check(records: Vec<RequirementObject>, config: &AnalysisConfig) -> Vec<StatusInconsistency> {
        let builder = IndexBuilder::from_records(records);
        let index = builder.index();
        let graph = TypedGraph::build(index.iter());
        check_status_consistency(index, &graph, config)
    }

    #[test]
    fn approved_linking_to_draft_is_reported() {
        let violations = check(
            vec![record("A", "approved").with_link("satisfies", "B"), record("B", "draft")],
            &AnalysisConfig::default(),
        );

        assert_eq!(violations.len(), 1);
        let violation = &violations[0];
        assert_eq!(violation.kind, ViolationKind::ApprovedToDraft);
        assert_eq!(violation.chain, ["A".to_string(), "B".to_string()]);
        assert_eq!(violation.from_status, "approved");
        assert_eq!(violation.to_status, "draft");
        assert_eq!(violation.link_type, "satisfies");
        assert_eq!(violation.severity, Severity::Medium);
        assert_eq!(violation.location, Location::new("a.rst", 3));
    }

    #[test]
    fn disabled_rule_is_not_enforced() {
        let config = AnalysisConfig {
            status_rules: StatusRules {
                approved_to_draft: false,
                ..StatusRules::default()
            },
            ..AnalysisConfig::default()
        };
        let violations = check(
            vec![record("A", "approved").with_link("satisfies", "B"), record("B", "draft")],
            &config,
        );
        assert!(violations.is_empty());
    }

    #[test]
    fn draft_linking_to_approved_is_fine() {
        let violations = check(
            vec![record("A", "draft").with_link("satisfies", "B"), record("B", "approved")],
            &AnalysisConfig::default(),
        );
        assert!(violations.is_empty());
    }

    #[test]
    fn unknown_statuses_are_skipped() {
        let violations = check(
            vec![
                record("A", "approved").with_link("satisfies", "B"),
                record("B", "wip"),
                record("C", "shipped").with_link("satisfies", "D"),
                record("D", "draft"),
                RequirementObject::new("E", "requirement", Location::new("a.rst", 1))
                    .with_link("satisfies", "D"),
            ],
            &AnalysisConfig::default(),
        );
        assert!(violations.is_empty());
    }

    #[test]
    fn empty_vocabulary_disables_the_check() {
        let config = AnalysisConfig {
            statuses: Vec::new(),
            ..AnalysisConfig::default()
        };
        let violations = check(
            vec![record("A", "approved").with_link("satisfies", "B"), record("B", "draft")],
            &config,
        );
        assert!(violations.is_empty());
    }

    #[test]
    fn baselined_needs_a_baseline_tag() {
        let records = vec![
            record("A", "baselined")
                .with_baseline("v1.0")
                .with_link("satisfies", "C"),
            record("B", "baselined").with_link("satisfies", "C"),
            record("C", "review"),
        ];
        let violations = check(records, &AnalysisConfig::default());

        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].kind, ViolationKind::BaselinedToDraft);
        assert_eq!(violations[0].chain[0], "A");
        assert_eq!(violations[0].severity, Severity::High);
    }

    #[test]
    fn each_link_type_is_a_separate_violation() {
        let violations = check(
            vec![
                record("A", "implemented")
                    .with_link("satisfies", "B")
                    .with_link("implements", "B")
                    .with_link("implements", "B"),
                record("B", "draft"),
            ],
            &AnalysisConfig::default(),
        );

        let link_types: Vec<_> = violations.iter().map(|v| v.link_type.as_str()).collect();
        assert_eq!(link_types, vec!["implements", "satisfies"]);
        assert!(violations.iter().all(|v| v.kind == ViolationKind::ImplementedToDraft));
    }

    #[test_case(ViolationKind::ApprovedToDraft, Priority::Critical => Severity::High)]
    #[test_case(ViolationKind::ApprovedToDraft, Priority::Medium => Severity::Medium)]
    #[test_case(ViolationKind::ApprovedToDraft, Priority::Low => Severity::Low)]
    #[test_case(ViolationKind::ImplementedToDraft, Priority::Critical => Severity::Blocker)]
    #[test_case(ViolationKind::ImplementedToDraft, Priority::High => Severity::High)]
    #[test_case(ViolationKind::ImplementedToDraft, Priority::Low => Severity::Medium)]
    #[test_case(ViolationKind::BaselinedToDraft, Priority::Low => Severity::High)]
    #[test_case(ViolationKind::BaselinedToDraft, Priority::Critical => Severity::High)]
    fn severity_by_kind_and_priority(kind: ViolationKind, priority: Priority) -> Severity {
        severity(kind, priority)
    }
}
