use serde::Serialize;

use crate::{
    analysis::{
        BaselineIssue, CompletenessReport, CoverageReport, Cycle, Orphan, Recommendation,
        RuleCoverage, StatusInconsistency,
    },
    domain::{Diagnostic, DiagnosticKind, RequirementIndex, Severity},
};

/// Headline numbers for one analysis run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    /// Records analysed.
    pub records: usize,
    /// Typed edges in the graph.
    pub links: usize,
    /// Cycles found.
    pub cycles: usize,
    /// Coverage rules below threshold.
    pub failing_rules: usize,
    /// Total-weighted hierarchical coverage.
    pub overall_coverage: u8,
    /// Orphaned records of any category.
    pub orphans: usize,
    /// Status ordering violations.
    pub status_inconsistencies: usize,
    /// Chains that stop early.
    pub incomplete_chains: usize,
    /// Baseline stability issues.
    pub baseline_issues: usize,
    /// Most severe finding, if any.
    pub max_severity: Option<Severity>,
}

/// Every analyzer output for one run, plus the ranked recommendations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeepValidationReport {
    /// Headline numbers.
    pub summary: ReportSummary,
    /// Link cycles.
    pub cycles: Vec<Cycle>,
    /// Coverage statistics.
    pub coverage: CoverageReport,
    /// Disconnected records.
    pub orphans: Vec<Orphan>,
    /// Status ordering violations.
    pub status: Vec<StatusInconsistency>,
    /// Chain tracing results.
    pub completeness: CompletenessReport,
    /// Baseline stability issues.
    pub baseline: Vec<BaselineIssue>,
    /// Ranked actions synthesised from everything above.
    pub recommendations: Vec<Recommendation>,
}

impl DeepValidationReport {
    /// Whether no analyzer found anything.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.summary.max_severity.is_none()
    }

    /// Most severe finding across all analyzers.
    #[must_use]
    pub fn max_severity(&self) -> Option<Severity> {
        let cycles = self.cycles.iter().map(|c| c.severity);
        let coverage = self.coverage.failing_rules().map(RuleCoverage::severity);
        let orphans = self.orphans.iter().map(|o| o.severity);
        let status = self.status.iter().map(|s| s.severity);
        let chains = self.completeness.incomplete.iter().map(|c| c.severity);
        let baseline = self.baseline.iter().map(|b| b.severity);

        cycles
            .chain(coverage)
            .chain(orphans)
            .chain(status)
            .chain(chains)
            .chain(baseline)
            .max()
    }

    pub(crate) fn summarize(&mut self, records: usize, links: usize) {
        self.summary = ReportSummary {
            records,
            links,
            cycles: self.cycles.len(),
            failing_rules: self.coverage.failing_rules().count(),
            overall_coverage: self.coverage.overall,
            orphans: self.orphans.len(),
            status_inconsistencies: self.status.len(),
            incomplete_chains: self.completeness.incomplete.len(),
            baseline_issues: self.baseline.len(),
            max_severity: self.max_severity(),
        };
    }

    /// Flattens every finding into editor diagnostics.
    ///
    /// Cycle and coverage diagnostics are anchored at the record's location in
    /// `index`; other findings carry their own. Sorted by descending severity.
    #[must_use]
    pub fn diagnostics(&self, index: &RequirementIndex) -> Vec<Diagnostic> {
        let location = |id: &str| index.get(id).map(|r| r.location.clone());
        let mut diagnostics = Vec::new();

        for cycle in &self.cycles {
            let path = cycle.nodes.join(" → ");
            for node in &cycle.nodes {
                diagnostics.push(
                    Diagnostic::new(
                        DiagnosticKind::Cycle,
                        cycle.severity,
                        format!("{node} is part of a cycle of length {}: {path}", cycle.length),
                    )
                    .at(location(node))
                    .related(
                        std::iter::once(node).chain(cycle.nodes.iter().filter(|n| *n != node)),
                    ),
                );
            }
        }

        for rule in self.coverage.failing_rules() {
            for id in &rule.missing {
                diagnostics.push(
                    Diagnostic::new(
                        DiagnosticKind::CoverageGap,
                        rule.severity(),
                        format!(
                            "{id} has no '{}' link to {}",
                            rule.link_type,
                            rule.target_types.join("/")
                        ),
                    )
                    .at(location(id))
                    .related([id]),
                );
            }
        }

        for orphan in &self.orphans {
            diagnostics.push(
                Diagnostic::new(
                    DiagnosticKind::Orphan,
                    orphan.severity,
                    format!(
                        "{} is a {} ({} priority)",
                        orphan.id,
                        orphan.category.as_str(),
                        orphan.priority
                    ),
                )
                .at(Some(orphan.location.clone()))
                .related([&orphan.id]),
            );
        }

        for violation in &self.status {
            let [from, to] = &violation.chain;
            diagnostics.push(
                Diagnostic::new(
                    DiagnosticKind::StatusInconsistency,
                    violation.severity,
                    format!(
                        "{from} ({}) links to {to} ({}) via '{}'",
                        violation.from_status, violation.to_status, violation.link_type
                    ),
                )
                .at(Some(violation.location.clone()))
                .related([from, to]),
            );
        }

        for chain in &self.completeness.incomplete {
            diagnostics.push(
                Diagnostic::new(
                    DiagnosticKind::IncompleteChain,
                    chain.severity,
                    format!("traceability chain from {} stops at {}", chain.start, chain.missing),
                )
                .at(Some(chain.location.clone()))
                .related([&chain.start]),
            );
        }

        for issue in &self.baseline {
            diagnostics.push(
                Diagnostic::new(
                    DiagnosticKind::BaselineIssue,
                    issue.severity,
                    issue.message.clone(),
                )
                .at(Some(issue.location.clone()))
                .related(std::iter::once(&issue.id).chain(issue.target.as_ref())),
            );
        }

        diagnostics.sort_by(|a, b| b.severity.cmp(&a.severity));
        diagnostics
    }
}
