//! Domain models for the requirement index.
//!
//! This module contains the record type, the multi-index container and its
//! single writer, the analysis configuration, and diagnostic records.

mod record;
pub use record::{Location, Priority, RequirementObject, Severity, UnknownPriority};

/// The multi-index container and its read API.
pub mod index;
pub use index::{IndexStats, RequirementIndex};

/// Incremental construction and maintenance of the index.
pub mod builder;
pub use builder::{DuplicateIdFault, IndexBuilder, UpsertOutcome};

mod config;
pub use config::{
    AnalysisConfig, BaselineRules, ConfigError, CoverageRule, CycleSeverity, PriorityThresholds,
    SeverityTable, StatusRules,
};

mod diagnostic;
pub use diagnostic::{Diagnostic, DiagnosticKind};
