use std::fmt;

use serde::Serialize;

use crate::domain::{Location, Severity};

/// What kind of problem a [`Diagnostic`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Two records share an id.
    DuplicateId,
    /// A link points at an id with no record.
    DanglingLink,
    /// The record takes part in a link cycle.
    Cycle,
    /// The record is not covered by a hierarchical coverage rule.
    CoverageGap,
    /// The record has no incoming and/or outgoing links.
    Orphan,
    /// A more final status links to a less final one.
    StatusInconsistency,
    /// A traceability chain starting at the record is broken.
    IncompleteChain,
    /// A baselined record is not stable.
    BaselineIssue,
}

impl DiagnosticKind {
    /// Stable snake-case tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DuplicateId => "duplicate_id",
            Self::DanglingLink => "dangling_link",
            Self::Cycle => "cycle",
            Self::CoverageGap => "coverage_gap",
            Self::Orphan => "orphan",
            Self::StatusInconsistency => "status_inconsistency",
            Self::IncompleteChain => "incomplete_chain",
            Self::BaselineIssue => "baseline_issue",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single finding, ready to be rendered as an editor diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// The kind of problem.
    pub kind: DiagnosticKind,
    /// Human-readable description.
    pub message: String,
    /// Where to anchor the diagnostic, if the subject record is known.
    pub location: Option<Location>,
    /// Ids involved, subject first.
    pub related: Vec<String>,
    /// How urgent the problem is.
    pub severity: Severity,
}

impl Diagnostic {
    /// Construct a diagnostic.
    #[must_use]
    pub fn new(kind: DiagnosticKind, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            location: None,
            related: Vec::new(),
            severity,
        }
    }

    /// Anchor the diagnostic at a location.
    #[must_use]
    pub fn at(mut self, location: Option<Location>) -> Self {
        self.location = location;
        self
    }

    /// Attach the ids involved.
    #[must_use]
    pub fn related<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.related = ids.into_iter().map(Into::into).collect();
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(location) = &self.location {
            write!(f, "{location}: ")?;
        }
        write!(f, "[{}] {}: {}", self.severity, self.kind, self.message)
    }
}
