//! Synthesis of analyzer findings into one ranked action list.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::{
    analysis::{
        BaselineIssueKind, DeepValidationReport, OrphanCategory, ViolationKind,
    },
    domain::{Priority, Severity},
};

/// Dead-ends are only worth a recommendation above this count.
const DEAD_END_THRESHOLD: usize = 5;

/// Which analyzer a recommendation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Link cycles.
    Cycles,
    /// Hierarchical coverage rules.
    Coverage,
    /// Disconnected records.
    Orphans,
    /// Status ordering.
    StatusConsistency,
    /// Traceability chains.
    Completeness,
    /// Baseline stability.
    Baseline,
}

impl Category {
    /// Snake-case tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cycles => "cycles",
            Self::Coverage => "coverage",
            Self::Orphans => "orphans",
            Self::StatusConsistency => "status_consistency",
            Self::Completeness => "completeness",
            Self::Baseline => "baseline",
        }
    }
}

/// Coarse estimate of the work a recommendation implies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Effort {
    /// Five records or fewer.
    Low,
    /// Up to twenty records.
    Medium,
    /// More than twenty records.
    High,
}

impl Effort {
    /// Estimate from the number of affected records.
    #[must_use]
    pub const fn for_count(affected: usize) -> Self {
        if affected > 20 {
            Self::High
        } else if affected > 5 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    /// Lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// One ranked action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recommendation {
    /// 1-based rank in the final list.
    pub priority: usize,
    /// Most severe finding in the group.
    pub severity: Severity,
    /// Source analyzer.
    pub category: Category,
    /// What to do.
    pub action: String,
    /// Why.
    pub description: String,
    /// Number of records affected.
    pub affected_count: usize,
    /// The affected ids, sorted.
    pub affected: Vec<String>,
    /// Expected effort.
    pub effort: Effort,
}

impl Recommendation {
    fn new(
        severity: Severity,
        category: Category,
        action: impl Into<String>,
        description: impl Into<String>,
        affected: BTreeSet<String>,
    ) -> Self {
        let affected: Vec<String> = affected.into_iter().collect();
        Self {
            priority: 0,
            severity,
            category,
            action: action.into(),
            description: description.into(),
            affected_count: affected.len(),
            effort: Effort::for_count(affected.len()),
            affected,
        }
    }
}

/// Groups every finding of a report into a flat list, ordered by severity,
/// then by descending affected count.
#[must_use]
pub fn synthesize(report: &DeepValidationReport) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();
    recommendations.extend(cycles(report));
    recommendations.extend(coverage(report));
    recommendations.extend(orphans(report));
    recommendations.extend(status(report));
    recommendations.extend(completeness(report));
    recommendations.extend(baseline(report));

    let mut seen = BTreeSet::new();
    recommendations.retain(|r: &Recommendation| {
        seen.insert((r.category, r.action.clone(), r.affected.clone()))
    });

    recommendations.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| b.affected_count.cmp(&a.affected_count))
    });
    for (rank, recommendation) in recommendations.iter_mut().enumerate() {
        recommendation.priority = rank + 1;
    }
    recommendations
}

fn cycles(report: &DeepValidationReport) -> Vec<Recommendation> {
    let mut by_severity: BTreeMap<Severity, (usize, BTreeSet<String>)> = BTreeMap::new();
    for cycle in &report.cycles {
        let (count, affected) = by_severity.entry(cycle.severity).or_default();
        *count += 1;
        affected.extend(cycle.nodes.iter().cloned());
    }

    by_severity
        .into_iter()
        .rev()
        .map(|(severity, (count, affected))| {
            Recommendation::new(
                severity,
                Category::Cycles,
                format!("Break {count} {severity} severity link cycle(s)"),
                format!(
                    "{} records take part in cycles; remove or redirect one link per cycle",
                    affected.len()
                ),
                affected,
            )
        })
        .collect()
}

fn coverage(report: &DeepValidationReport) -> Vec<Recommendation> {
    report
        .coverage
        .failing_rules()
        .map(|rule| {
            Recommendation::new(
                rule.severity(),
                Category::Coverage,
                format!(
                    "Add '{}' links from {} to {}",
                    rule.link_type,
                    rule.source_types.join("/"),
                    rule.target_types.join("/")
                ),
                format!(
                    "coverage is {}% against a threshold of {}% ({} of {} covered)",
                    rule.percentage, rule.threshold, rule.covered, rule.total
                ),
                rule.missing.iter().cloned().collect(),
            )
        })
        .collect()
}

fn orphans(report: &DeepValidationReport) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    let important: Vec<_> = report
        .orphans
        .iter()
        .filter(|o| o.category == OrphanCategory::TrueOrphan)
        .filter(|o| matches!(o.priority, Priority::Critical | Priority::High))
        .collect();
    if let Some(severity) = important.iter().map(|o| o.severity).max() {
        recommendations.push(Recommendation::new(
            severity,
            Category::Orphans,
            format!("Link {} critical/high priority orphan(s)", important.len()),
            "important requirements have no links in either direction",
            important.iter().map(|o| o.id.clone()).collect(),
        ));
    }

    let dead_ends: Vec<_> = report
        .orphans
        .iter()
        .filter(|o| o.category == OrphanCategory::DeadEnd)
        .collect();
    if dead_ends.len() > DEAD_END_THRESHOLD {
        recommendations.push(Recommendation::new(
            Severity::Low,
            Category::Orphans,
            format!("Review {} dead-end requirement(s)", dead_ends.len()),
            "these requirements are linked to but link nowhere; confirm they are intended leaves",
            dead_ends.iter().map(|o| o.id.clone()).collect(),
        ));
    }

    recommendations
}

fn status(report: &DeepValidationReport) -> Vec<Recommendation> {
    let mut by_kind: BTreeMap<ViolationKind, (Severity, BTreeSet<String>)> = BTreeMap::new();
    for violation in &report.status {
        let (severity, affected) = by_kind
            .entry(violation.kind)
            .or_insert((Severity::Info, BTreeSet::new()));
        *severity = (*severity).max(violation.severity);
        affected.insert(violation.chain[0].clone());
    }

    by_kind
        .into_iter()
        .map(|(kind, (severity, affected))| {
            let action = match kind {
                ViolationKind::ApprovedToDraft => {
                    "Approve or unlink draft requirements referenced by approved ones"
                }
                ViolationKind::ImplementedToDraft => {
                    "Approve or unlink draft requirements referenced by implemented ones"
                }
                ViolationKind::BaselinedToDraft => {
                    "Stabilise requirements under review or in draft referenced by baselined ones"
                }
            };
            Recommendation::new(
                severity,
                Category::StatusConsistency,
                action,
                format!(
                    "{} record(s) link to a less final status ({})",
                    affected.len(),
                    kind.as_str()
                ),
                affected,
            )
        })
        .collect()
}

fn completeness(report: &DeepValidationReport) -> Vec<Recommendation> {
    let mut by_segment: BTreeMap<&str, (Severity, BTreeSet<String>)> = BTreeMap::new();
    for chain in &report.completeness.incomplete {
        if chain.severity < Severity::High {
            continue;
        }
        let (severity, affected) = by_segment
            .entry(chain.missing.as_str())
            .or_insert((Severity::Info, BTreeSet::new()));
        *severity = (*severity).max(chain.severity);
        affected.insert(chain.start.clone());
    }

    by_segment
        .into_iter()
        .map(|(segment, (severity, affected))| {
            Recommendation::new(
                severity,
                Category::Completeness,
                format!("Complete traceability at {segment}"),
                format!("{} important chain(s) stop at {segment}", affected.len()),
                affected,
            )
        })
        .collect()
}

fn baseline(report: &DeepValidationReport) -> Vec<Recommendation> {
    let mut by_kind: BTreeMap<BaselineIssueKind, BTreeSet<String>> = BTreeMap::new();
    for issue in &report.baseline {
        by_kind.entry(issue.kind).or_default().insert(issue.id.clone());
    }

    by_kind
        .into_iter()
        .map(|(kind, affected)| {
            let (action, description) = match kind {
                BaselineIssueKind::NotApproved => (
                    "Approve baselined requirements",
                    "baselined requirements must be approved, implemented or baselined",
                ),
                BaselineIssueKind::DownstreamNotBaselined => (
                    "Baseline downstream requirements",
                    "baselined requirements link to requirements outside any baseline",
                ),
                BaselineIssueKind::VersionConflict => (
                    "Align baseline versions",
                    "baselined requirements link to requirements in a different baseline",
                ),
            };
            Recommendation::new(kind.severity(), Category::Baseline, action, description, affected)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;
    use crate::{
        analysis::deep_validate,
        domain::{AnalysisConfig, CoverageRule, IndexBuilder, Location, RequirementObject},
    };

    fn record(id: &str, kind: &str) -> RequirementObject {
        RequirementObject::new(id, kind, Location::new("r.rst", 1))
    }

    #[test_case(0 => Effort::Low)]
    #[test_case(5 => Effort::Low)]
    #[test_case(6 => Effort::Medium)]
    #[test_case(20 => Effort::Medium)]
    #[test_case(21 => Effort::High)]
    fn effort_by_affected_count(count: usize) -> Effort {
        Effort::for_count(count)
    }

    #[test]
    fn clean_index_has_no_recommendations() {
        let builder = IndexBuilder::from_records(vec![
            record("A", "STK").with_link("satisfies", "B"),
            record("B", "SYS"),
        ]);
        let report = deep_validate(builder.index(), &AnalysisConfig::default());
        assert!(report.recommendations.is_empty());
    }

    #[test]
    fn recommendations_are_ranked_by_severity_then_size() {
        let mut records = vec![
            // HIGH cycle
            record("A", "STK").with_link("links", "B"),
            record("B", "STK").with_link("links", "A"),
            // BLOCKER orphan
            record("C", "STK").with_metadata("priority", "critical"),
            // MEDIUM approved -> draft
            record("D", "SYS").with_status("approved").with_link("links", "E"),
            record("E", "SYS").with_status("draft"),
        ];
        // six dead ends, LOW
        for i in 0..6 {
            records.push(record(&format!("L{i}"), "TST"));
            records.push(record(&format!("P{i}"), "TST").with_link("links", format!("L{i}")));
        }
        let builder = IndexBuilder::from_records(records);
        let report = deep_validate(builder.index(), &AnalysisConfig::default());

        let ranked: Vec<_> = report
            .recommendations
            .iter()
            .map(|r| (r.priority, r.severity, r.category))
            .collect();
        assert_eq!(
            ranked,
            vec![
                (1, Severity::Blocker, Category::Orphans),
                (2, Severity::High, Category::Cycles),
                (3, Severity::Medium, Category::StatusConsistency),
                (4, Severity::Low, Category::Orphans),
            ]
        );

        let dead_ends = &report.recommendations[3];
        assert_eq!(dead_ends.affected_count, 7);
        assert_eq!(dead_ends.effort, Effort::Medium);
        assert_eq!(report.recommendations[1].affected, vec!["A", "B"]);
    }

    #[test]
    fn five_dead_ends_are_not_worth_a_recommendation() {
        let mut records = Vec::new();
        for i in 0..5 {
            records.push(record(&format!("L{i}"), "TST"));
            records.push(record(&format!("P{i}"), "TST").with_link("links", format!("L{i}")));
        }
        let builder = IndexBuilder::from_records(records);
        let report = deep_validate(builder.index(), &AnalysisConfig::default());
        assert!(report.recommendations.is_empty());
    }

    #[test]
    fn failing_rule_and_important_chains_are_reported() {
        let config = AnalysisConfig {
            coverage_rules: vec![CoverageRule {
                link_type: "satisfies".to_string(),
                source_types: vec!["SYS".to_string()],
                target_types: vec!["STK".to_string()],
                threshold: 80,
            }],
            chain: vec!["STK".to_string(), "SYS".to_string()],
            ..AnalysisConfig::default()
        };
        let builder = IndexBuilder::from_records(vec![
            record("S1", "STK")
                .with_metadata("priority", "critical")
                .with_link("links", "S2"),
            record("S2", "STK").with_link("links", "S1"),
            record("S3", "STK").with_link("links", "Y1"),
            record("Y1", "SYS").with_link("links", "S3"),
        ]);
        let report = deep_validate(builder.index(), &config);

        let completeness: Vec<_> = report
            .recommendations
            .iter()
            .filter(|r| r.category == Category::Completeness)
            .collect();
        // S2's chain is MEDIUM and is filtered out.
        assert_eq!(completeness.len(), 1);
        assert_eq!(completeness[0].severity, Severity::Blocker);
        assert_eq!(completeness[0].affected, vec!["S1"]);
        assert_eq!(completeness[0].action, "Complete traceability at STK→SYS");

        let coverage: Vec<_> = report
            .recommendations
            .iter()
            .filter(|r| r.category == Category::Coverage)
            .collect();
        assert_eq!(coverage.len(), 1);
        assert_eq!(coverage[0].affected, vec!["Y1"]);
        assert_eq!(coverage[0].severity, Severity::High);
    }
}
