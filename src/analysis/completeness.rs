//! Multi-hop traceability chains across an ordered type sequence.

use std::{collections::BTreeSet, sync::LazyLock};

use regex::Regex;
use serde::Serialize;

use crate::{
    analysis::TypedGraph,
    domain::{Location, Priority, RequirementIndex, RequirementObject, Severity},
};

static TYPE_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z]+)[-_]?\d").expect("valid regex"));

/// A chain that stops before the end of the type sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncompleteChain {
    /// The record the chain starts from.
    pub start: String,
    /// The broken segment, e.g. `SYS→DSG`.
    pub missing: String,
    /// Segments from the break to the end of the sequence.
    pub missing_segments: usize,
    /// Types reached before the break, starting type included.
    pub reached: Vec<String>,
    /// Graded from the starting record's priority.
    pub severity: Severity,
    /// Where the starting record is defined.
    pub location: Location,
}

/// Outcome of tracing every chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompletenessReport {
    /// Records whose type matches the first element of the sequence.
    pub checked: usize,
    /// Of those, chains that reach the last element.
    pub complete: usize,
    /// The rest.
    pub incomplete: Vec<IncompleteChain>,
}

/// Derives a record's type from an id such as `SYS-012` or `dsg_3`.
#[must_use]
pub fn type_prefix(id: &str) -> Option<&str> {
    TYPE_PREFIX
        .captures(id)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str())
}

fn has_type(record: &RequirementObject, expected: &str) -> bool {
    record.kind.eq_ignore_ascii_case(expected)
        || type_prefix(&record.id).is_some_and(|prefix| prefix.eq_ignore_ascii_case(expected))
}

/// Traces the type sequence from every record of its first type.
///
/// Each step expands the whole frontier at once: the chain continues as long
/// as any current record links to a record of the next type. Sequences with
/// fewer than two types are skipped.
#[must_use]
pub fn trace_completeness(
    index: &RequirementIndex,
    graph: &TypedGraph<'_>,
    chain: &[String],
) -> CompletenessReport {
    let mut report = CompletenessReport::default();
    let Some(first) = chain.first() else {
        return report;
    };
    if chain.len() < 2 {
        return report;
    }

    for start in index.sorted().into_iter().filter(|r| has_type(r, first)) {
        report.checked += 1;

        let mut frontier = BTreeSet::from([start.id.as_str()]);
        let mut broken = None;

        for (step, window) in chain.windows(2).enumerate() {
            let [previous, next] = window else {
                continue;
            };
            frontier = frontier
                .iter()
                .flat_map(|&id| graph.neighbours(id))
                .filter(|&target| index.get(target).is_some_and(|r| has_type(r, next)))
                .collect();

            if frontier.is_empty() {
                broken = Some((step + 1, format!("{previous}→{next}")));
                break;
            }
        }

        let Some((reached, missing)) = broken else {
            report.complete += 1;
            continue;
        };

        let missing_segments = chain.len() - reached;
        report.incomplete.push(IncompleteChain {
            start: start.id.clone(),
            missing,
            missing_segments,
            reached: chain[..reached].to_vec(),
            severity: severity(start.priority(), missing_segments),
            location: start.location.clone(),
        });
    }

    report
}

const fn severity(priority: Priority, missing_segments: usize) -> Severity {
    match priority {
        Priority::Critical => Severity::Blocker,
        Priority::High if missing_segments > 1 => Severity::High,
        _ => Severity::Medium,
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;
    use crate::domain::IndexBuilder;

    fn record(id: &str, kind: &str) -> RequirementObject {
        RequirementObject::new(id, kind, Location::new("chain.rst", 1))
    }

    fn chain() -> Vec<String> {
        ["STK", "SYS", "DSG", "TST"].map(String::from).to_vec()
    }

    fn trace(records: Vec<RequirementObject>) -> CompletenessReport {
        let builder = IndexBuilder::from_records(records);
        let index = builder.index();
        trace_completeness(index, &TypedGraph::build(index.iter()), &chain())
    }

    #[test_case("SYS-012" => Some("SYS"))]
    #[test_case("dsg_3" => Some("dsg"))]
    #[test_case("TST7" => Some("TST"))]
    #[test_case("REQ-ABC" => None)]
    #[test_case("42" => None)]
    fn derives_type_prefix(id: &str) -> Option<&str> {
        type_prefix(id)
    }

    #[test]
    fn full_chain_is_complete() {
        let report = trace(vec![
            record("S1", "STK").with_link("satisfies", "Y1"),
            record("Y1", "SYS").with_link("refines", "D1"),
            record("D1", "DSG").with_link("verifiedby", "T1"),
            record("T1", "TST"),
        ]);

        assert_eq!(report.checked, 1);
        assert_eq!(report.complete, 1);
        assert!(report.incomplete.is_empty());
    }

    #[test]
    fn break_point_is_recorded() {
        let report = trace(vec![
            record("S1", "STK")
                .with_metadata("priority", "high")
                .with_link("satisfies", "Y1"),
            record("Y1", "SYS"),
        ]);

        assert_eq!(report.incomplete.len(), 1);
        let chain = &report.incomplete[0];
        assert_eq!(chain.start, "S1");
        assert_eq!(chain.missing, "SYS→DSG");
        assert_eq!(chain.missing_segments, 2);
        assert_eq!(chain.reached, vec!["STK", "SYS"]);
        assert_eq!(chain.severity, Severity::High);
    }

    #[test]
    fn frontier_continues_through_any_branch() {
        let report = trace(vec![
            record("S1", "STK")
                .with_link("satisfies", "Y1")
                .with_link("satisfies", "Y2"),
            record("Y1", "SYS"),
            record("Y2", "SYS").with_link("refines", "D1"),
            record("D1", "DSG").with_link("verifiedby", "T1"),
            record("T1", "TST"),
        ]);
        assert_eq!(report.complete, 1);
    }

    #[test]
    fn type_is_derived_from_the_id_prefix() {
        let report = trace(vec![
            record("STK-1", "requirement").with_link("satisfies", "SYS-1"),
            record("SYS-1", "requirement").with_link("refines", "dsg_1"),
            record("dsg_1", "requirement").with_link("verifiedby", "TST1"),
            record("TST1", "requirement"),
        ]);
        assert_eq!((report.checked, report.complete), (1, 1));
    }

    #[test]
    fn dangling_and_wrong_type_targets_break_the_chain() {
        let report = trace(vec![
            record("S1", "STK")
                .with_link("satisfies", "missing")
                .with_link("satisfies", "T1"),
            record("T1", "TST"),
        ]);

        assert_eq!(report.incomplete[0].missing, "STK→SYS");
        assert_eq!(report.incomplete[0].missing_segments, 3);
        assert_eq!(report.incomplete[0].severity, Severity::Medium);
    }

    #[test]
    fn short_sequences_are_skipped() {
        let builder = IndexBuilder::from_records(vec![record("S1", "STK")]);
        let index = builder.index();
        let graph = TypedGraph::build(index.iter());

        assert_eq!(trace_completeness(index, &graph, &[]), CompletenessReport::default());
        assert_eq!(
            trace_completeness(index, &graph, &["STK".to_string()]),
            CompletenessReport::default()
        );
    }

    #[test_case(Priority::Critical, 1 => Severity::Blocker)]
    #[test_case(Priority::High, 2 => Severity::High)]
    #[test_case(Priority::High, 1 => Severity::Medium)]
    #[test_case(Priority::Medium, 3 => Severity::Medium)]
    #[test_case(Priority::Low, 3 => Severity::Medium)]
    fn severity_by_priority(priority: Priority, missing: usize) -> Severity {
        severity(priority, missing)
    }
}
