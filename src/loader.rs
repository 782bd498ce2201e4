use std::path::Path;

use csv::{ReaderBuilder, StringRecord};
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::normalize::canonical_column_name;
use crate::types::{LoadedRecord, RawRow};
use crate::util::{non_empty, parse_datetime_safe, parse_f64_safe, parse_i64_safe};

/// Columns read from the raw export, in canonical form. Everything else in
/// the file is ignored.
pub const ALLOWED_COLUMNS: &[&str] = &[
    "unique_key",
    "created_date",
    "closed_date",
    "agency_name",
    "complaint_type",
    "descriptor",
    "location_type",
    "incident_zip",
    "city",
    "status",
    "borough",
    "open_data_channel_type",
    "latitude",
    "longitude",
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub total_rows: usize,
    pub loaded_rows: usize,
    pub parse_errors: usize,
}

/// Apply the declared type of every allowlisted column.
pub fn type_row(row: RawRow) -> LoadedRecord {
    let text = |v: Option<String>| non_empty(v.as_deref()).map(str::to_string);
    LoadedRecord {
        unique_key: parse_i64_safe(row.unique_key.as_deref()),
        created_date: parse_datetime_safe(row.created_date.as_deref()),
        closed_date: parse_datetime_safe(row.closed_date.as_deref()),
        latitude: parse_f64_safe(row.latitude.as_deref()),
        longitude: parse_f64_safe(row.longitude.as_deref()),
        agency_name: text(row.agency_name),
        complaint_type: text(row.complaint_type),
        descriptor: text(row.descriptor),
        location_type: text(row.location_type),
        incident_zip: text(row.incident_zip),
        city: text(row.city),
        status: text(row.status),
        borough: text(row.borough),
        open_data_channel_type: text(row.open_data_channel_type),
    }
}

pub fn load(path: &Path) -> Result<(Vec<LoadedRecord>, LoadReport)> {
    if !path.exists() {
        return Err(PipelineError::InputNotFound(path.to_path_buf()));
    }
    info!(path = %path.display(), "loading raw data");

    let mut rdr = ReaderBuilder::new().flexible(true).from_path(path)?;
    let canonical: StringRecord = rdr
        .byte_headers()?
        .iter()
        .map(|h| canonical_column_name(&String::from_utf8_lossy(h)))
        .collect();

    let missing: Vec<String> = ALLOWED_COLUMNS
        .iter()
        .filter(|col| !canonical.iter().any(|h| h == **col))
        .map(|col| col.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(PipelineError::MissingColumns {
            path: path.to_path_buf(),
            columns: missing,
        });
    }

    let mut report = LoadReport::default();
    let mut rows = Vec::new();
    for result in rdr.byte_records() {
        report.total_rows += 1;
        // Bad bytes in one field must not cost the whole row.
        let parsed = result.and_then(|raw| {
            let record: StringRecord = raw.iter().map(String::from_utf8_lossy).collect();
            record.deserialize::<RawRow>(Some(&canonical))
        });
        match parsed {
            Ok(row) => rows.push(type_row(row)),
            Err(e) => {
                report.parse_errors += 1;
                debug!(error = %e, "skipping unreadable row");
            }
        }
    }
    report.loaded_rows = rows.len();

    info!(
        total_rows = report.total_rows,
        parse_errors = report.parse_errors,
        "loaded raw rows"
    );
    Ok((rows, report))
}
