//! Reading records, snapshots and configuration from disk.

use std::{fs, path::Path};

use anyhow::Context as _;
use reqindex::{AnalysisConfig, IndexBuilder, IndexSnapshot, RequirementObject};
use tracing::{debug, info, instrument};
use walkdir::WalkDir;

/// Builds an index from `input`.
///
/// A directory is walked for `*.json` files, each holding an array of records;
/// files are visited in name order so that duplicate resolution is
/// deterministic. A single file is read as an exported snapshot.
#[instrument(level = "debug")]
pub fn index(input: &Path) -> anyhow::Result<IndexBuilder> {
    let mut builder = IndexBuilder::new();

    if input.is_file() {
        let json = fs::read_to_string(input)
            .with_context(|| format!("failed to read snapshot {}", input.display()))?;
        let snapshot = IndexSnapshot::from_json(&json)
            .with_context(|| format!("invalid snapshot {}", input.display()))?;
        builder
            .import_snapshot(snapshot)
            .with_context(|| format!("failed to import snapshot {}", input.display()))?;
        info!(records = builder.index().len(), "loaded snapshot");
        return Ok(builder);
    }

    for entry in WalkDir::new(input).sort_by_file_name() {
        let entry = entry.with_context(|| format!("failed to walk {}", input.display()))?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().is_none_or(|ext| ext != "json") {
            continue;
        }

        let json = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let records: Vec<RequirementObject> = serde_json::from_str(&json)
            .with_context(|| format!("invalid record batch {}", path.display()))?;
        debug!(path = %path.display(), records = records.len(), "loaded batch");

        for record in records {
            builder.upsert(record);
        }
    }

    info!(records = builder.index().len(), "built index");
    Ok(builder)
}

/// Reads the analysis configuration, or falls back to the defaults.
pub fn config(path: Option<&Path>) -> anyhow::Result<AnalysisConfig> {
    let Some(path) = path else {
        return Ok(AnalysisConfig::default());
    };
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    AnalysisConfig::from_toml_str(&content)
        .with_context(|| format!("invalid config {}", path.display()))
}
