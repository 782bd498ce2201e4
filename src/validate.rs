// Validator/Filter. Steps run in a fixed order and each one reports how
// many rows it removed.

use std::collections::HashSet;

use tracing::info;

use crate::config::PipelineConfig;
use crate::types::{NormalizedRecord, ValidatedRecord};
use crate::util::format_int;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub input_rows: usize,
    pub missing_created: usize,
    pub out_of_range: usize,
    pub missing_required: usize,
    pub duplicates: usize,
    pub retained: usize,
}

/// Required fields are checked together so a row missing several of them is
/// only counted once.
fn require(rec: NormalizedRecord) -> Option<ValidatedRecord> {
    Some(ValidatedRecord {
        unique_key: rec.unique_key?,
        created_date: rec.created_date?,
        complaint_type: rec.complaint_type?,
        borough: rec.borough?,
        latitude: rec.latitude?,
        longitude: rec.longitude?,
        closed_date: rec.closed_date,
        agency_name: rec.agency_name,
        descriptor: rec.descriptor,
        location_type: rec.location_type,
        incident_zip: rec.incident_zip,
        city: rec.city,
        status: rec.status,
        open_data_channel_type: rec.open_data_channel_type,
        channel_group: rec.channel_group,
    })
}

pub fn validate(
    rows: Vec<NormalizedRecord>,
    config: &PipelineConfig,
) -> (Vec<ValidatedRecord>, ValidationReport) {
    let mut report = ValidationReport {
        input_rows: rows.len(),
        ..Default::default()
    };

    // 1. created_date present
    let rows: Vec<NormalizedRecord> = rows
        .into_iter()
        .filter(|r| r.created_date.is_some())
        .collect();
    report.missing_created = report.input_rows - rows.len();

    // 2. created_date inside the inclusive range
    let before = rows.len();
    let rows: Vec<NormalizedRecord> = rows
        .into_iter()
        .filter(|r| r.created_date.is_some_and(|ts| config.contains(ts)))
        .collect();
    report.out_of_range = before - rows.len();
    info!(
        rows = rows.len(),
        missing_created = report.missing_created,
        out_of_range = report.out_of_range,
        range = %config.date_range_label(),
        "filtered to date range"
    );

    // 3. required fields
    let before = rows.len();
    let rows: Vec<ValidatedRecord> = rows.into_iter().filter_map(require).collect();
    report.missing_required = before - rows.len();
    info!(
        dropped = %format_int(report.missing_required),
        "dropped rows missing key fields"
    );

    // 4. first occurrence of each unique_key wins
    let before = rows.len();
    let mut seen: HashSet<i64> = HashSet::with_capacity(rows.len());
    let rows: Vec<ValidatedRecord> = rows
        .into_iter()
        .filter(|r| seen.insert(r.unique_key))
        .collect();
    report.duplicates = before - rows.len();
    info!(dropped = %format_int(report.duplicates), "dropped duplicates");

    report.retained = rows.len();
    (rows, report)
}
