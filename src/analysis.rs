//! Graph analyses over a snapshot of the requirement index.
//!
//! Every analyzer is a pure function of an immutable index (and, where it
//! needs direction and link types, a [`TypedGraph`] built from it). None of
//! them fail on imperfect data: missing vocabularies skip a check, dangling
//! links never count as coverage.

mod graph;
pub use graph::TypedGraph;

mod cycles;
pub use cycles::{Cycle, detect_cycles, find_minimal_cycle};

mod coverage;
pub use coverage::{CoverageReport, PriorityCoverage, RuleCoverage, analyze_coverage};

mod orphans;
pub use orphans::{Orphan, OrphanCategory, classify_orphans};

mod status;
pub use status::{StatusInconsistency, ViolationKind, check_status_consistency};

mod completeness;
pub use completeness::{CompletenessReport, IncompleteChain, trace_completeness, type_prefix};

mod baseline;
pub use baseline::{BaselineIssue, BaselineIssueKind, analyze_baselines};

mod recommendations;
pub use recommendations::{Category, Effort, Recommendation, synthesize};

mod report;
pub use report::{DeepValidationReport, ReportSummary};

mod quick;
pub use quick::quick_check;

/// Debounced and superseding analysis runs.
pub mod scheduler;

use tracing::{debug, instrument};

use crate::domain::{AnalysisConfig, RequirementIndex};

/// Runs every analyzer over `index` and synthesises recommendations.
///
/// The index is only read. Hold an `Arc` snapshot from the builder to run
/// this off the interactive path; abandoning the call publishes nothing.
#[must_use]
#[instrument(level = "debug", skip_all, fields(records = index.len()))]
pub fn deep_validate(index: &RequirementIndex, config: &AnalysisConfig) -> DeepValidationReport {
    let graph = TypedGraph::build(index.iter());

    let cycles = detect_cycles(&graph, &config.cycle_severity);
    debug!(count = cycles.len(), "cycles");

    let coverage = analyze_coverage(index, &config.coverage_rules, &config.priority_thresholds);
    debug!(rules = coverage.rules.len(), overall = coverage.overall, "coverage");

    let orphans = classify_orphans(index, &config.orphan_severity);
    debug!(count = orphans.len(), "orphans");

    let status = check_status_consistency(index, &graph, config);
    debug!(count = status.len(), "status inconsistencies");

    let completeness = trace_completeness(index, &graph, &config.chain);
    debug!(
        checked = completeness.checked,
        incomplete = completeness.incomplete.len(),
        "completeness"
    );

    let baseline = analyze_baselines(index, &graph, &config.baseline_rules);
    debug!(count = baseline.len(), "baseline issues");

    let mut report = DeepValidationReport {
        cycles,
        coverage,
        orphans,
        status,
        completeness,
        baseline,
        ..DeepValidationReport::default()
    };
    report.summarize(index.len(), graph.edge_count());
    report.recommendations = synthesize(&report);
    debug!(count = report.recommendations.len(), "recommendations");

    report
}
