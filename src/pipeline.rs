// Wires the stages together. `clean` is the pure part (load, normalize,
// validate, derive); `run` adds aggregation and export.

use std::time::Instant;

use tracing::info;

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::features::derive_all;
use crate::loader::{self, LoadReport};
use crate::normalize::{normalize_all, NormalizeReport};
use crate::output::{self, ExportedFile};
use crate::reports::{self, AggregateViews};
use crate::types::{LoadedRecord, ServiceRequest, SummaryStats};
use crate::validate::{validate, ValidationReport};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanReport {
    pub load: LoadReport,
    pub normalize: NormalizeReport,
    pub validation: ValidationReport,
}

#[derive(Debug)]
pub struct RunOutcome {
    pub dataset: Vec<ServiceRequest>,
    pub report: CleanReport,
    pub views: AggregateViews,
    pub summary: SummaryStats,
    pub parquet_bytes: u64,
    pub exports: Vec<ExportedFile>,
}

/// Normalize, validate and derive already-loaded rows.
pub fn clean_records(
    rows: Vec<LoadedRecord>,
    config: &PipelineConfig,
) -> (Vec<ServiceRequest>, NormalizeReport, ValidationReport) {
    let (normalized, normalize_report) = normalize_all(rows);
    let (validated, validation_report) = validate(normalized, config);
    (derive_all(validated, config), normalize_report, validation_report)
}

/// Load the raw file and produce the cleaned dataset. Nothing is written.
pub fn clean(config: &PipelineConfig) -> Result<(Vec<ServiceRequest>, CleanReport)> {
    let (rows, load) = loader::load(&config.input)?;
    let (dataset, normalize, validation) = clean_records(rows, config);
    Ok((
        dataset,
        CleanReport {
            load,
            normalize,
            validation,
        },
    ))
}

pub fn run(config: &PipelineConfig) -> Result<RunOutcome> {
    let started = Instant::now();
    let (dataset, report) = clean(config)?;

    let parquet_path = config.parquet_path();
    let parquet_bytes = output::write_parquet(&parquet_path, &dataset)?;

    let summary = reports::generate_summary(&dataset, config, parquet_bytes);
    output::write_json(&config.summary_path(), &summary)?;

    let views = reports::build_all(&dataset);
    let exports = output::export_views(&config.exports_dir(), &views)?;

    info!(
        rows = dataset.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "pipeline complete"
    );
    Ok(RunOutcome {
        dataset,
        report,
        views,
        summary,
        parquet_bytes,
        exports,
    })
}
