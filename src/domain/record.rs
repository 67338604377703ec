use std::{collections::BTreeMap, fmt, str::FromStr};

use borsh::BorshSerialize;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Where a record was parsed from.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    BorshSerialize,
)]
pub struct Location {
    /// Source document path, as reported by the parser.
    pub file: String,
    /// 1-based line of the record's directive.
    pub line: u32,
}

impl Location {
    /// Construct a location from a file path and line number.
    #[must_use]
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// One parsed requirement-like record.
///
/// Records are produced by an external parser. The index trusts the
/// classification tags it is given: `kind`, `level` and `status` are free
/// strings that only gain meaning relative to the configured vocabularies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize)]
pub struct RequirementObject {
    /// Globally unique identifier within the project.
    pub id: String,

    /// Classification tag, e.g. `requirement` or `STK`.
    #[serde(rename = "type")]
    pub kind: String,

    /// Optional hierarchy level, e.g. `system`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    /// Optional lifecycle tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    /// Outgoing links keyed by link-type name.
    ///
    /// Duplicates within one link-type are tolerated but carry no extra
    /// meaning.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub links: BTreeMap<String, Vec<String>>,

    /// Free-form attributes. The `priority` key feeds severity logic.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,

    /// Provenance, used for reporting only.
    pub location: Location,

    /// Optional release tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline: Option<String>,
}

impl RequirementObject {
    /// Construct a record with no links, status, level, or metadata.
    #[must_use]
    pub fn new(id: impl Into<String>, kind: impl Into<String>, location: Location) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            level: None,
            status: None,
            links: BTreeMap::new(),
            metadata: BTreeMap::new(),
            location,
            baseline: None,
        }
    }

    /// Set the lifecycle status.
    #[must_use]
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Set the hierarchy level.
    #[must_use]
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = Some(level.into());
        self
    }

    /// Set the baseline tag.
    #[must_use]
    pub fn with_baseline(mut self, baseline: impl Into<String>) -> Self {
        self.baseline = Some(baseline.into());
        self
    }

    /// Append an outgoing link of the given type.
    #[must_use]
    pub fn with_link(mut self, link_type: impl Into<String>, target: impl Into<String>) -> Self {
        self.links
            .entry(link_type.into())
            .or_default()
            .push(target.into());
        self
    }

    /// Set a metadata attribute.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Iterate over every outgoing `(link_type, target)` pair, in link-type
    /// order.
    pub fn outgoing(&self) -> impl Iterator<Item = (&str, &str)> {
        self.links.iter().flat_map(|(link_type, targets)| {
            targets
                .iter()
                .map(move |target| (link_type.as_str(), target.as_str()))
        })
    }

    /// Iterate over the distinct target ids across all link types.
    pub fn targets(&self) -> impl Iterator<Item = &str> {
        let mut seen = std::collections::BTreeSet::new();
        self.outgoing()
            .filter_map(move |(_, target)| seen.insert(target).then_some(target))
    }

    /// Whether this record has at least one outgoing link of any type.
    #[must_use]
    pub fn has_links(&self) -> bool {
        self.links.values().any(|targets| !targets.is_empty())
    }

    /// The record's priority, defaulting to [`Priority::Medium`] when the
    /// metadata key is absent or unrecognised.
    #[must_use]
    pub fn priority(&self) -> Priority {
        self.metadata
            .get("priority")
            .and_then(|p| p.parse().ok())
            .unwrap_or_default()
    }

    /// The baseline tag, if present and non-empty.
    #[must_use]
    pub fn baseline(&self) -> Option<&str> {
        self.baseline.as_deref().filter(|b| !b.trim().is_empty())
    }

    /// Returns a value generated by hashing every field of the record.
    ///
    /// The fingerprint is a SHA256 hash of the Borsh encoding. Re-upserting a
    /// record with an unchanged fingerprint is a no-op.
    ///
    /// # Panics
    ///
    /// Panics if borsh serialization fails (which should never happen for this
    /// data structure).
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let encoded = borsh::to_vec(self).expect("this should never fail");
        let hash = Sha256::digest(encoded);
        format!("{hash:x}")
    }
}

/// Priority bucket read from a record's `priority` metadata.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Must never be left untraced.
    Critical,
    /// Important.
    High,
    /// The default.
    #[default]
    Medium,
    /// Nice to have.
    Low,
}

impl Priority {
    /// All buckets, most important first.
    pub const ALL: [Self; 4] = [Self::Critical, Self::High, Self::Medium, Self::Low];

    /// Lowercase name of the bucket.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The priority string was not one of the known buckets.
#[derive(Debug, thiserror::Error)]
#[error("unknown priority '{0}'")]
pub struct UnknownPriority(String);

impl FromStr for Priority {
    type Err = UnknownPriority;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "critical" => Ok(Self::Critical),
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            _ => Err(UnknownPriority(s.to_string())),
        }
    }
}

/// How urgently a finding needs attention.
///
/// Ordered so that `Blocker` compares greatest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Informational only.
    Info,
    /// Minor.
    Low,
    /// Should be addressed.
    Medium,
    /// Must be addressed.
    High,
    /// Blocks a release.
    Blocker,
}

impl Severity {
    /// Drop one step, saturating at [`Severity::Info`].
    #[must_use]
    pub const fn downgrade(self) -> Self {
        match self {
            Self::Blocker => Self::High,
            Self::High => Self::Medium,
            Self::Medium => Self::Low,
            Self::Low | Self::Info => Self::Info,
        }
    }

    /// Raise one step, saturating at [`Severity::Blocker`].
    #[must_use]
    pub const fn escalate(self) -> Self {
        match self {
            Self::Info => Self::Low,
            Self::Low => Self::Medium,
            Self::Medium => Self::High,
            Self::High | Self::Blocker => Self::Blocker,
        }
    }

    /// Uppercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Blocker => "BLOCKER",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    fn record() -> RequirementObject {
        RequirementObject::new("REQ-001", "requirement", Location::new("reqs.rst", 3))
    }

    #[test_case("critical" => Priority::Critical)]
    #[test_case("HIGH" => Priority::High)]
    #[test_case(" low " => Priority::Low)]
    #[test_case("urgent" => Priority::Medium; "unknown falls back to medium")]
    fn priority_from_metadata(value: &str) -> Priority {
        record().with_metadata("priority", value).priority()
    }

    #[test]
    fn missing_priority_defaults_to_medium() {
        assert_eq!(record().priority(), Priority::Medium);
    }

    #[test]
    fn severity_ordering_puts_blocker_first() {
        let mut severities = vec![
            Severity::Low,
            Severity::Blocker,
            Severity::Info,
            Severity::High,
            Severity::Medium,
        ];
        severities.sort_by(|a, b| b.cmp(a));
        assert_eq!(
            severities,
            vec![
                Severity::Blocker,
                Severity::High,
                Severity::Medium,
                Severity::Low,
                Severity::Info
            ]
        );
    }

    #[test]
    fn downgrade_saturates_at_info() {
        assert_eq!(Severity::Blocker.downgrade(), Severity::High);
        assert_eq!(Severity::Info.downgrade(), Severity::Info);
        assert_eq!(Severity::Blocker.escalate(), Severity::Blocker);
    }

    #[test]
    fn targets_are_distinct_across_link_types() {
        let record = record()
            .with_link("satisfies", "A")
            .with_link("implements", "A")
            .with_link("implements", "B")
            .with_link("implements", "B");
        let targets: Vec<_> = record.targets().collect();
        assert_eq!(targets, vec!["A", "B"]);
        assert_eq!(record.outgoing().count(), 4);
    }

    #[test]
    fn empty_baseline_is_ignored() {
        assert_eq!(record().with_baseline("  ").baseline(), None);
        assert_eq!(record().with_baseline("v1").baseline(), Some("v1"));
    }

    #[test]
    fn fingerprint_tracks_content() {
        let a = record();
        let b = record().with_status("draft");
        assert_eq!(a.fingerprint(), record().fingerprint());
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn serde_uses_type_key() {
        let json = r#"{"id":"X","type":"requirement","location":{"file":"a.rst","line":1}}"#;
        let record: RequirementObject = serde_json::from_str(json).unwrap();
        assert_eq!(record.kind, "requirement");
        assert!(record.links.is_empty());
    }
}
