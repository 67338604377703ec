use clap::Parser;
use reqindex::{
    DeepValidationReport, Severity,
    analysis::{OrphanCategory, Recommendation},
    deep_validate,
    domain::IndexStats,
};
use tracing::instrument;

use super::{
    Context, load,
    terminal::{self, Colorize},
};

#[derive(Debug, Default, Parser)]
#[command(about = "Run deep validation across every analyzer")]
pub struct Validate {
    /// Output format
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,

    /// Exit with status 2 if any finding is at least this severe
    #[arg(long, value_name = "SEVERITY", default_value = "high")]
    fail_on: FailOn,

    /// Also list every finding as a diagnostic
    #[arg(long)]
    diagnostics: bool,

    /// Suppress all output except errors
    #[arg(long, short)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
    Summary,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
enum FailOn {
    Info,
    Low,
    Medium,
    #[default]
    High,
    Blocker,
    Never,
}

impl FailOn {
    const fn threshold(self) -> Option<Severity> {
        match self {
            Self::Info => Some(Severity::Info),
            Self::Low => Some(Severity::Low),
            Self::Medium => Some(Severity::Medium),
            Self::High => Some(Severity::High),
            Self::Blocker => Some(Severity::Blocker),
            Self::Never => None,
        }
    }

    fn fails(self, report: &DeepValidationReport) -> bool {
        match (self.threshold(), report.summary.max_severity) {
            (Some(threshold), Some(worst)) => worst >= threshold,
            _ => false,
        }
    }
}

impl Validate {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, context: &Context) -> anyhow::Result<()> {
        let builder = load::index(&context.input)?;
        let config = load::config(context.config.as_deref())?;
        let index = builder.snapshot();

        let report = deep_validate(&index, &config);

        if !self.quiet {
            match self.output {
                OutputFormat::Table => {
                    output_table(&report, &index.stats());
                    if self.diagnostics {
                        println!("\n{}", "Diagnostics".dim());
                        for diagnostic in report.diagnostics(&index) {
                            println!("  {} {diagnostic}", terminal::severity(diagnostic.severity));
                        }
                    }
                }
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
                OutputFormat::Summary => output_summary(&report),
            }
        }

        if self.fail_on.fails(&report) {
            std::process::exit(2);
        }

        Ok(())
    }
}

fn output_table(report: &DeepValidationReport, stats: &IndexStats) {
    let summary = &report.summary;
    println!(
        "Validated {} requirements ({} links, {} files)\n",
        summary.records,
        summary.links,
        stats.by_file.len()
    );

    check_line(
        "Cycles:",
        summary.cycles == 0,
        || format!("{} cycle(s) found", summary.cycles),
        "no link cycles",
    );

    check_line(
        "Coverage:",
        summary.failing_rules == 0,
        || {
            format!(
                "{} rule(s) below threshold, overall {}%",
                summary.failing_rules, summary.overall_coverage
            )
        },
        &format!(
            "{} rule(s) met, overall {}%",
            report.coverage.rules.len(),
            summary.overall_coverage
        ),
    );

    let true_orphans = report
        .orphans
        .iter()
        .filter(|o| o.category == OrphanCategory::TrueOrphan)
        .count();
    check_line(
        "Orphans:",
        true_orphans == 0,
        || {
            format!(
                "{true_orphans} unlinked, {} partially linked",
                summary.orphans - true_orphans
            )
        },
        &format!("none unlinked, {} partially linked", summary.orphans),
    );

    check_line(
        "Status:",
        summary.status_inconsistencies == 0,
        || format!("{} inconsistent link(s)", summary.status_inconsistencies),
        "statuses consistent",
    );

    check_line(
        "Chains:",
        summary.incomplete_chains == 0,
        || {
            format!(
                "{} of {} incomplete",
                summary.incomplete_chains, report.completeness.checked
            )
        },
        &format!("{} complete", report.completeness.complete),
    );

    check_line(
        "Baselines:",
        summary.baseline_issues == 0,
        || format!("{} issue(s)", summary.baseline_issues),
        "stable",
    );

    if report.recommendations.is_empty() {
        println!("\n{}", "No recommendations".success());
        return;
    }

    println!("\n{}", "Recommendations".dim());
    for recommendation in &report.recommendations {
        print_recommendation(recommendation);
    }
}

fn check_line(label: &str, ok: bool, problem: impl FnOnce() -> String, fine: &str) {
    if ok {
        println!("✓ {label:<11}{fine}");
    } else {
        println!("{}", format!("✗ {label:<11}{}", problem()).warning());
    }
}

fn print_recommendation(recommendation: &Recommendation) {
    const SHOWN: usize = 8;

    println!(
        "{:>3}. {} {} {}",
        recommendation.priority,
        terminal::severity(recommendation.severity),
        recommendation.action,
        format!(
            "[{}, {} affected, {} effort]",
            recommendation.category.as_str(),
            recommendation.affected_count,
            recommendation.effort.as_str()
        )
        .dim()
    );
    println!("     {}", recommendation.description.dim());

    let mut affected = recommendation
        .affected
        .iter()
        .take(SHOWN)
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");
    if recommendation.affected_count > SHOWN {
        affected.push_str(&format!(", … (+{})", recommendation.affected_count - SHOWN));
    }
    println!("     {affected}");
}

fn output_summary(report: &DeepValidationReport) {
    let summary = &report.summary;
    let worst = summary.max_severity.map_or("none", Severity::as_str);
    println!(
        "records={} cycles={} failing_rules={} coverage={}% orphans={} status={} chains={} \
         baseline={} worst={worst}",
        summary.records,
        summary.cycles,
        summary.failing_rules,
        summary.overall_coverage,
        summary.orphans,
        summary.status_inconsistencies,
        summary.incomplete_chains,
        summary.baseline_issues,
    );
}

#[cfg(test)]
mod tests {
    use reqindex::{AnalysisConfig, IndexBuilder, Location, RequirementObject};
    use test_case::test_case;

    use super::*;

    fn report() -> DeepValidationReport {
        let builder = IndexBuilder::from_records(vec![
            RequirementObject::new("A", "STK", Location::new("a.rst", 1)).with_link("links", "B"),
            RequirementObject::new("B", "STK", Location::new("a.rst", 2)).with_link("links", "A"),
        ]);
        deep_validate(builder.index(), &AnalysisConfig::default())
    }

    #[test_case(FailOn::Never => false)]
    #[test_case(FailOn::Medium => true)]
    #[test_case(FailOn::High => true; "cycle of two is high")]
    #[test_case(FailOn::Blocker => false)]
    fn exit_status_follows_threshold(fail_on: FailOn) -> bool {
        fail_on.fails(&report())
    }

    #[test]
    fn clean_report_never_fails() {
        let report = DeepValidationReport::default();
        assert!(!FailOn::Info.fails(&report));
    }
}
