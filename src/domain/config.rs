use serde::{Deserialize, Serialize};

use crate::{
    analysis::scheduler::Debouncer,
    domain::{Priority, Severity},
};

/// Configuration for deep validation.
///
/// This struct holds the vocabularies, thresholds and rule switches consumed by
/// the analyzers. An empty vocabulary or rule list is a legitimate state: the
/// corresponding check is skipped and reports nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Versions", into = "Versions")]
pub struct AnalysisConfig {
    /// Ordered status vocabulary, least final first.
    pub statuses: Vec<String>,

    /// Hierarchical coverage rules.
    pub coverage_rules: Vec<CoverageRule>,

    /// Target percentage per priority bucket for priority-weighted coverage.
    pub priority_thresholds: PriorityThresholds,

    /// Priority to severity table for true orphans.
    ///
    /// Dead-end and source-only orphans use the same table, downgraded one
    /// step.
    pub orphan_severity: SeverityTable,

    /// Cycle length to severity boundaries.
    pub cycle_severity: CycleSeverity,

    /// Which status-consistency rules are enforced.
    pub status_rules: StatusRules,

    /// Which baseline-stability sub-checks run.
    pub baseline_rules: BaselineRules,

    /// Ordered type sequence traced by the completeness check, e.g.
    /// `["STK", "SYS", "DSG", "TST"]`.
    ///
    /// Fewer than two entries disables the check.
    pub chain: Vec<String>,

    /// Debounce window for save-triggered checks, in milliseconds.
    pub debounce_ms: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            statuses: default_statuses(),
            coverage_rules: Vec::new(),
            priority_thresholds: PriorityThresholds::default(),
            orphan_severity: SeverityTable::default(),
            cycle_severity: CycleSeverity::default(),
            status_rules: StatusRules::default(),
            baseline_rules: BaselineRules::default(),
            chain: Vec::new(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

/// Errors raised while reading or writing configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The TOML document could not be parsed.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    /// The configuration could not be serialized.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

impl AnalysisConfig {
    /// Parses a configuration from a TOML document.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML content is invalid.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Serializes the configuration to a TOML document.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Position of `status` in the ordered vocabulary.
    ///
    /// Returns `None` for unrecognised statuses.
    #[must_use]
    pub fn status_rank(&self, status: &str) -> Option<usize> {
        self.statuses.iter().position(|s| s == status)
    }

    /// A debouncer for save-triggered checks, using `debounce_ms`.
    #[must_use]
    pub const fn debouncer(&self) -> Debouncer {
        Debouncer::from_millis(self.debounce_ms)
    }
}

/// A hierarchical coverage rule.
///
/// Records whose type is in `source_types` are covered when at least one of
/// their `link_type` links targets an existing record whose type is in
/// `target_types`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageRule {
    /// The link type that provides coverage.
    pub link_type: String,
    /// Types of the records that need coverage.
    pub source_types: Vec<String>,
    /// Types that count as valid targets.
    pub target_types: Vec<String>,
    /// Minimum acceptable percentage.
    #[serde(default = "default_rule_threshold")]
    pub threshold: u8,
}

/// Target percentage for each priority bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityThresholds {
    /// Target for critical records.
    pub critical: u8,
    /// Target for high-priority records.
    pub high: u8,
    /// Target for medium-priority records.
    pub medium: u8,
    /// Target for low-priority records.
    pub low: u8,
}

impl Default for PriorityThresholds {
    fn default() -> Self {
        Self {
            critical: 100,
            high: 90,
            medium: 80,
            low: 50,
        }
    }
}

impl PriorityThresholds {
    /// Threshold for a bucket.
    #[must_use]
    pub const fn get(&self, priority: Priority) -> u8 {
        match priority {
            Priority::Critical => self.critical,
            Priority::High => self.high,
            Priority::Medium => self.medium,
            Priority::Low => self.low,
        }
    }
}

/// Exhaustive priority to severity mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityTable {
    /// Severity for critical records.
    pub critical: Severity,
    /// Severity for high-priority records.
    pub high: Severity,
    /// Severity for medium-priority records.
    pub medium: Severity,
    /// Severity for low-priority records.
    pub low: Severity,
}

impl Default for SeverityTable {
    fn default() -> Self {
        Self {
            critical: Severity::Blocker,
            high: Severity::High,
            medium: Severity::Medium,
            low: Severity::Low,
        }
    }
}

impl SeverityTable {
    /// Severity for a bucket.
    #[must_use]
    pub const fn get(&self, priority: Priority) -> Severity {
        match priority {
            Priority::Critical => self.critical,
            Priority::High => self.high,
            Priority::Medium => self.medium,
            Priority::Low => self.low,
        }
    }
}

/// Cycle length boundaries.
///
/// Lengths up to `high_max_len` are HIGH, up to `medium_max_len` MEDIUM, and
/// anything longer LOW.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleSeverity {
    /// Longest cycle still graded HIGH.
    pub high_max_len: usize,
    /// Longest cycle still graded MEDIUM.
    pub medium_max_len: usize,
}

impl Default for CycleSeverity {
    fn default() -> Self {
        Self {
            high_max_len: 2,
            medium_max_len: 5,
        }
    }
}

impl CycleSeverity {
    /// Grade a cycle by its length.
    #[must_use]
    pub const fn for_length(&self, length: usize) -> Severity {
        if length <= self.high_max_len {
            Severity::High
        } else if length <= self.medium_max_len {
            Severity::Medium
        } else {
            Severity::Low
        }
    }
}

/// Status-consistency rule switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct StatusRules {
    /// Flag `approved -> draft` links.
    pub approved_to_draft: bool,
    /// Flag `implemented -> draft` links.
    pub implemented_to_draft: bool,
    /// Flag baselined records linking to draft or review records.
    pub baselined_to_draft: bool,
}

impl Default for StatusRules {
    fn default() -> Self {
        Self {
            approved_to_draft: true,
            implemented_to_draft: true,
            baselined_to_draft: true,
        }
    }
}

/// Baseline-stability sub-check switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct BaselineRules {
    /// Baselined records must be approved, implemented or baselined.
    pub require_approved: bool,
    /// Targets of baselined records must carry a baseline too.
    pub check_downstream: bool,
    /// Targets must carry the same baseline value.
    pub check_version_conflicts: bool,
}

impl Default for BaselineRules {
    fn default() -> Self {
        Self {
            require_approved: true,
            check_downstream: true,
            check_version_conflicts: true,
        }
    }
}

fn default_statuses() -> Vec<String> {
    ["draft", "review", "approved", "implemented", "baselined"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

const fn default_debounce_ms() -> u64 {
    500
}

const fn default_rule_threshold() -> u8 {
    80
}

/// The serialized versions of the configuration.
/// This allows for future changes to the configuration format and to the domain
/// type without breaking compatibility.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        #[serde(default = "default_statuses")]
        statuses: Vec<String>,

        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        chain: Vec<String>,

        #[serde(default = "default_debounce_ms")]
        debounce_ms: u64,

        #[serde(default)]
        priority_thresholds: PriorityThresholds,

        #[serde(default)]
        orphan_severity: SeverityTable,

        #[serde(default)]
        cycle_severity: CycleSeverity,

        #[serde(default)]
        status_rules: StatusRules,

        #[serde(default)]
        baseline_rules: BaselineRules,

        // Arrays of tables go last so that TOML output stays valid.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        coverage_rules: Vec<CoverageRule>,
    },
}

impl From<Versions> for AnalysisConfig {
    fn from(versions: Versions) -> Self {
        match versions {
            Versions::V1 {
                statuses,
                coverage_rules,
                priority_thresholds,
                orphan_severity,
                cycle_severity,
                status_rules,
                baseline_rules,
                chain,
                debounce_ms,
            } => Self {
                statuses,
                coverage_rules,
                priority_thresholds,
                orphan_severity,
                cycle_severity,
                status_rules,
                baseline_rules,
                chain,
                debounce_ms,
            },
        }
    }
}

impl From<AnalysisConfig> for Versions {
    fn from(config: AnalysisConfig) -> Self {
        let AnalysisConfig {
            statuses,
            coverage_rules,
            priority_thresholds,
            orphan_severity,
            cycle_severity,
            status_rules,
            baseline_rules,
            chain,
            debounce_ms,
        } = config;

        Self::V1 {
            statuses,
            coverage_rules,
            priority_thresholds,
            orphan_severity,
            cycle_severity,
            status_rules,
            baseline_rules,
            chain,
            debounce_ms,
        }
    }
}
