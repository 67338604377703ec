//! Hierarchical and priority-weighted coverage statistics.

use serde::Serialize;

use crate::domain::{CoverageRule, Priority, PriorityThresholds, RequirementIndex, Severity};

/// Outcome of one hierarchical coverage rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleCoverage {
    /// The link type that provides coverage.
    pub link_type: String,
    /// Record types the rule applies to.
    pub source_types: Vec<String>,
    /// Record types a link must reach to count.
    pub target_types: Vec<String>,
    /// Required percentage.
    pub threshold: u8,
    /// Records whose type is in `source_types`.
    pub total: usize,
    /// Of those, records with a qualifying link.
    pub covered: usize,
    /// `covered / total`, rounded. Zero when `total` is zero.
    pub percentage: u8,
    /// Whether `percentage` reaches `threshold`.
    ///
    /// A rule with nothing to cover is met.
    pub meets_threshold: bool,
    /// Uncovered source records, sorted.
    pub missing: Vec<String>,
}

/// Outcome for one priority bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriorityCoverage {
    /// The bucket.
    pub priority: Priority,
    /// Records in the bucket.
    pub total: usize,
    /// Records in the bucket with any outgoing link.
    pub covered: usize,
    /// `covered / total`, rounded. Zero when `total` is zero.
    pub percentage: u8,
    /// Target percentage for the bucket.
    pub threshold: u8,
    /// Whether `percentage` reaches `threshold`.
    pub meets_threshold: bool,
    /// Records in the bucket with no outgoing link, sorted.
    pub uncovered: Vec<String>,
}

/// Both coverage statistics for one analysis run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CoverageReport {
    /// One entry per configured rule, in configuration order.
    pub rules: Vec<RuleCoverage>,
    /// One entry per priority bucket, most important first.
    pub priorities: Vec<PriorityCoverage>,
    /// Total-weighted average of the rule percentages.
    pub overall: u8,
}

impl RuleCoverage {
    /// HIGH when coverage is below half the threshold, otherwise MEDIUM.
    #[must_use]
    pub fn severity(&self) -> Severity {
        if u16::from(self.percentage) * 2 < u16::from(self.threshold) {
            Severity::High
        } else {
            Severity::Medium
        }
    }
}

impl CoverageReport {
    /// Rules that fall short of their threshold.
    pub fn failing_rules(&self) -> impl Iterator<Item = &RuleCoverage> {
        self.rules.iter().filter(|rule| !rule.meets_threshold)
    }
}

/// Computes both coverage statistics.
///
/// Rules with an empty link type, source list or target list are skipped.
#[must_use]
pub fn analyze_coverage(
    index: &RequirementIndex,
    rules: &[CoverageRule],
    thresholds: &PriorityThresholds,
) -> CoverageReport {
    let rules: Vec<RuleCoverage> = rules
        .iter()
        .filter(|rule| {
            !rule.link_type.is_empty()
                && !rule.source_types.is_empty()
                && !rule.target_types.is_empty()
        })
        .map(|rule| rule_coverage(index, rule))
        .collect();

    let weighted: usize = rules.iter().map(|r| usize::from(r.percentage) * r.total).sum();
    let total: usize = rules.iter().map(|r| r.total).sum();

    CoverageReport {
        overall: percentage(weighted, total * 100),
        priorities: priority_coverage(index, *thresholds),
        rules,
    }
}

fn rule_coverage(index: &RequirementIndex, rule: &CoverageRule) -> RuleCoverage {
    let is_target = |id: &String| {
        index
            .get(id)
            .is_some_and(|target| rule.target_types.contains(&target.kind))
    };

    let mut total = 0;
    let mut missing = Vec::new();
    for record in index.sorted() {
        if !rule.source_types.contains(&record.kind) {
            continue;
        }
        total += 1;
        let covered = record
            .links
            .get(&rule.link_type)
            .is_some_and(|targets| targets.iter().any(is_target));
        if !covered {
            missing.push(record.id.clone());
        }
    }

    let covered = total - missing.len();
    let percentage = percentage(covered, total);

    RuleCoverage {
        link_type: rule.link_type.clone(),
        source_types: rule.source_types.clone(),
        target_types: rule.target_types.clone(),
        threshold: rule.threshold,
        total,
        covered,
        percentage,
        meets_threshold: total == 0 || percentage >= rule.threshold,
        missing,
    }
}

fn priority_coverage(
    index: &RequirementIndex,
    thresholds: PriorityThresholds,
) -> Vec<PriorityCoverage> {
    let records = index.sorted();

    Priority::ALL
        .into_iter()
        .map(|priority| {
            let mut total = 0;
            let mut uncovered = Vec::new();
            for record in records.iter().filter(|r| r.priority() == priority) {
                total += 1;
                if !record.has_links() {
                    uncovered.push(record.id.clone());
                }
            }
            let covered = total - uncovered.len();
            let percentage = percentage(covered, total);
            let threshold = thresholds.get(priority);

            PriorityCoverage {
                priority,
                total,
                covered,
                percentage,
                threshold,
                meets_threshold: total == 0 || percentage >= threshold,
                uncovered,
            }
        })
        .collect()
}

/// `part / whole` as a percentage, rounded half up. Zero when `whole` is zero.
fn percentage(part: usize, whole: usize) -> u8 {
    if whole == 0 {
        return 0;
    }
    let rounded = (part * 100 + whole / 2) / whole;
    u8::try_from(rounded.min(100)).unwrap_or(100)
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;
    use crate::domain::{IndexBuilder, Location, RequirementObject};

    fn record(id: &str, kind: &str) -> RequirementObject {
        RequirementObject::new(id, kind, Location::new("a.rst", 1))
    }

    fn rule(link_type: &str, sources: &[&str], targets: &[&str], threshold: u8) -> CoverageRule {
        CoverageRule {
            link_type: link_type.to_string(),
            source_types: sources.iter().map(ToString::to_string).collect(),
            target_types: targets.iter().map(ToString::to_string).collect(),
            threshold,
        }
    }

    fn index(records: Vec<RequirementObject>) -> RequirementIndex {
        IndexBuilder::from_records(records).index().clone()
    }

    #[test_case(0, 0 => 0)]
    #[test_case(1, 3 => 33)]
    #[test_case(2, 3 => 67)]
    #[test_case(1, 2 => 50)]
    #[test_case(1, 200 => 1; "half rounds up")]
    #[test_case(3, 3 => 100)]
    fn percentage_rounds(part: usize, whole: usize) -> u8 {
        percentage(part, whole)
    }

    #[test]
    fn implemented_chain_is_fully_covered() {
        let index = index(vec![
            record("A", "STK").with_link("implements", "B"),
            record("B", "SYS").with_link("implements", "C"),
            record("C", "DSG"),
        ]);
        let report = analyze_coverage(
            &index,
            &[rule("implements", &["STK", "SYS"], &["SYS", "DSG"], 80)],
            &PriorityThresholds::default(),
        );

        let coverage = &report.rules[0];
        assert_eq!(coverage.total, 2);
        assert_eq!(coverage.covered, 2);
        assert_eq!(coverage.percentage, 100);
        assert!(coverage.meets_threshold);
        assert!(coverage.missing.is_empty());
        assert_eq!(report.overall, 100);
    }

    #[test]
    fn dangling_and_wrong_type_targets_do_not_cover() {
        let index = index(vec![
            record("A", "STK").with_link("satisfies", "missing"),
            record("B", "STK").with_link("satisfies", "C"),
            record("C", "TST"),
            record("D", "STK").with_link("satisfies", "E"),
            record("E", "SYS"),
        ]);
        let report = analyze_coverage(
            &index,
            &[rule("satisfies", &["STK"], &["SYS"], 50)],
            &PriorityThresholds::default(),
        );

        let coverage = &report.rules[0];
        assert_eq!(coverage.total, 3);
        assert_eq!(coverage.covered, 1);
        assert_eq!(coverage.percentage, 33);
        assert!(!coverage.meets_threshold);
        assert_eq!(coverage.missing, vec!["A", "B"]);
        assert_eq!(report.failing_rules().count(), 1);
        assert_eq!(coverage.severity(), Severity::Medium);
    }

    #[test]
    fn empty_population_is_zero_percent() {
        let index = index(vec![record("A", "SYS")]);
        let report = analyze_coverage(
            &index,
            &[rule("satisfies", &["STK"], &["SYS"], 80)],
            &PriorityThresholds::default(),
        );

        assert_eq!(report.rules[0].total, 0);
        assert_eq!(report.rules[0].percentage, 0);
        assert!(report.rules[0].meets_threshold);
        assert_eq!(report.overall, 0);
    }

    #[test]
    fn incomplete_rules_are_skipped() {
        let index = index(vec![record("A", "STK")]);
        let report = analyze_coverage(
            &index,
            &[rule("", &["STK"], &["SYS"], 80), rule("satisfies", &[], &["SYS"], 80)],
            &PriorityThresholds::default(),
        );
        assert!(report.rules.is_empty());
    }

    #[test]
    fn overall_is_weighted_by_population() {
        let index = index(vec![
            // 1 of 1 covered
            record("A", "STK").with_link("satisfies", "B"),
            record("B", "SYS"),
            // 0 of 3 covered
            record("T1", "TST"),
            record("T2", "TST"),
            record("T3", "TST"),
        ]);
        let report = analyze_coverage(
            &index,
            &[
                rule("satisfies", &["STK"], &["SYS"], 80),
                rule("verifies", &["TST"], &["SYS"], 80),
            ],
            &PriorityThresholds::default(),
        );

        assert_eq!(report.rules[0].percentage, 100);
        assert_eq!(report.rules[1].percentage, 0);
        assert_eq!(report.rules[1].severity(), Severity::High);
        assert_eq!(report.overall, 25);
    }

    #[test]
    fn priority_buckets_default_to_medium() {
        let index = index(vec![
            record("A", "STK")
                .with_metadata("priority", "critical")
                .with_link("links", "B"),
            record("B", "SYS").with_metadata("priority", "critical"),
            record("C", "SYS"),
            record("D", "SYS").with_metadata("priority", "bogus"),
        ]);
        let report = analyze_coverage(&index, &[], &PriorityThresholds::default());

        let critical = &report.priorities[0];
        assert_eq!(critical.priority, Priority::Critical);
        assert_eq!((critical.total, critical.covered, critical.percentage), (2, 1, 50));
        assert!(!critical.meets_threshold);
        assert_eq!(critical.uncovered, vec!["B"]);

        let medium = &report.priorities[2];
        assert_eq!(medium.total, 2);
        assert_eq!(medium.covered, 0);

        let low = &report.priorities[3];
        assert_eq!((low.total, low.percentage), (0, 0));
        assert!(low.meets_threshold);
    }
}
