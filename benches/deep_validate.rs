//! This bench builds a large, layered requirement index and runs deep
//! validation over it.

#![allow(missing_docs)]

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use reqindex::{
    AnalysisConfig, IndexBuilder, Location, RequirementObject, deep_validate,
    domain::CoverageRule,
};

const LAYERS: [&str; 4] = ["STK", "SYS", "DSG", "TST"];
const PER_LAYER: usize = 1_000;

/// Generates records where each layer links to the next, with a sprinkling of
/// gaps, back-links (cycles) and status inversions.
fn records() -> Vec<RequirementObject> {
    let mut records = Vec::with_capacity(LAYERS.len() * PER_LAYER);
    for (layer, kind) in LAYERS.iter().enumerate() {
        for i in 0..PER_LAYER {
            let id = format!("{kind}-{i:04}");
            let file = format!("{kind}/{}.rst", i / 50);
            let line = u32::try_from(i % 50).unwrap() * 10 + 1;
            let mut record = RequirementObject::new(&id, *kind, Location::new(file, line))
                .with_status(if i % 7 == 0 { "draft" } else { "approved" });

            if let Some(next) = LAYERS.get(layer + 1) {
                if i % 13 != 0 {
                    record = record.with_link("satisfies", format!("{next}-{i:04}"));
                }
            }
            if layer > 0 && i % 97 == 0 {
                record = record.with_link("links", format!("{}-{i:04}", LAYERS[layer - 1]));
            }
            if i % 11 == 0 {
                record = record.with_metadata("priority", "critical");
            }
            records.push(record);
        }
    }
    records
}

fn config() -> AnalysisConfig {
    let rules = LAYERS
        .windows(2)
        .map(|pair| CoverageRule {
            link_type: "satisfies".to_string(),
            source_types: vec![pair[0].to_string()],
            target_types: vec![pair[1].to_string()],
            threshold: 90,
        })
        .collect();

    AnalysisConfig {
        coverage_rules: rules,
        chain: LAYERS.map(String::from).to_vec(),
        ..AnalysisConfig::default()
    }
}

fn build_index(c: &mut Criterion) {
    c.bench_function("build index", |b| {
        b.iter_batched(
            records,
            IndexBuilder::from_records,
            BatchSize::LargeInput,
        );
    });
}

fn validate(c: &mut Criterion) {
    let builder = IndexBuilder::from_records(records());
    let config = config();

    c.bench_function("deep validate", |b| {
        b.iter(|| deep_validate(builder.index(), &config));
    });
}

criterion_group!(benches, build_index, validate);
criterion_main!(benches);
