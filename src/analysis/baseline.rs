use serde::Serialize;

use crate::{
    analysis::TypedGraph,
    domain::{BaselineRules, Location, RequirementIndex, Severity},
};

/// Statuses a baselined record may carry without a `not_approved` issue.
const STABLE_STATUSES: [&str; 3] = ["approved", "implemented", "baselined"];

/// What is unstable about a baselined record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BaselineIssueKind {
    /// The record is not approved, implemented or baselined.
    NotApproved,
    /// A linked record carries no baseline.
    DownstreamNotBaselined,
    /// A linked record carries a different baseline.
    VersionConflict,
}

impl BaselineIssueKind {
    /// Snake-case tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotApproved => "not_approved",
            Self::DownstreamNotBaselined => "downstream_not_baselined",
            Self::VersionConflict => "version_conflict",
        }
    }

    /// Fixed severity of the kind.
    #[must_use]
    pub const fn severity(self) -> Severity {
        match self {
            Self::NotApproved => Severity::High,
            Self::DownstreamNotBaselined | Self::VersionConflict => Severity::Medium,
        }
    }
}

/// An instability in a baselined record or its downstream links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BaselineIssue {
    /// What is wrong.
    pub kind: BaselineIssueKind,
    /// The baselined record.
    pub id: String,
    /// Its baseline tag.
    pub baseline: String,
    /// The downstream record, for link issues.
    pub target: Option<String>,
    /// The downstream record's baseline, for version conflicts.
    pub target_baseline: Option<String>,
    /// Human-readable summary.
    pub message: String,
    /// Fixed per kind.
    pub severity: Severity,
    /// Where the baselined record is defined.
    pub location: Location,
}

/// Checks every record with a non-empty baseline tag.
///
/// Dangling targets and self-links are not checked.
#[must_use]
pub fn analyze_baselines(
    index: &RequirementIndex,
    graph: &TypedGraph<'_>,
    rules: &BaselineRules,
) -> Vec<BaselineIssue> {
    let mut issues = Vec::new();

    for record in index.sorted() {
        let Some(baseline) = record.baseline() else {
            continue;
        };
        let issue = |kind: BaselineIssueKind,
                     target: Option<&str>,
                     target_baseline: Option<&str>,
                     message: String| BaselineIssue {
            kind,
            id: record.id.clone(),
            baseline: baseline.to_string(),
            target: target.map(str::to_string),
            target_baseline: target_baseline.map(str::to_string),
            message,
            severity: kind.severity(),
            location: record.location.clone(),
        };

        let status = record.status.as_deref().unwrap_or_default();
        if rules.require_approved && !STABLE_STATUSES.contains(&status) {
            let shown = if status.is_empty() { "no status" } else { status };
            issues.push(issue(
                BaselineIssueKind::NotApproved,
                None,
                None,
                format!("{} is in baseline {baseline} but has {shown}", record.id),
            ));
        }

        for target in graph.neighbours(&record.id) {
            if target == record.id {
                continue;
            }
            let Some(downstream) = index.get(target) else {
                continue;
            };
            match downstream.baseline() {
                None if rules.check_downstream => issues.push(issue(
                    BaselineIssueKind::DownstreamNotBaselined,
                    Some(target),
                    None,
                    format!(
                        "{} is in baseline {baseline} but links to {target}, which is not \
                         baselined",
                        record.id
                    ),
                )),
                Some(other) if other != baseline && rules.check_version_conflicts => {
                    issues.push(issue(
                        BaselineIssueKind::VersionConflict,
                        Some(target),
                        Some(other),
                        format!(
                            "{} is in baseline {baseline} but links to {target} in baseline \
                             {other}",
                            record.id
                        ),
                    ));
                }
                _ => {}
            }
        }
    }

    issues
}
