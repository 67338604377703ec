//! In-memory requirement index and deep traceability validation.
//!
//! Parsed requirement records are fed to an [`IndexBuilder`], which maintains a
//! multi-index and a symmetric link graph. Snapshots of the index are analysed
//! by [`deep_validate`] (cycles, coverage, orphans, status ordering, chain
//! completeness, baseline stability and ranked recommendations) or by the
//! cheaper [`quick_check`].

pub mod domain;
pub use domain::{
    AnalysisConfig, Diagnostic, DiagnosticKind, IndexBuilder, Location, Priority,
    RequirementIndex, RequirementObject, Severity,
};

/// Graph analyses and report synthesis.
pub mod analysis;
pub use analysis::{DeepValidationReport, deep_validate, quick_check};

/// Serializable snapshots of the index.
pub mod storage;
pub use storage::{IndexSnapshot, SnapshotError};
