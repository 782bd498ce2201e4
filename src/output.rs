use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{
    ArrayRef, BooleanArray, DictionaryArray, Float32Array, Float64Array, Int16Array, Int64Array,
    Int8Array, StringArray, TimestampMillisecondArray,
};
use arrow::datatypes::{DataType, Field, Int32Type, Schema, SchemaRef, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDateTime;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};
use tracing::info;

use crate::error::Result;
use crate::features::weekday_name;
use crate::reports::AggregateViews;
use crate::types::ServiceRequest;
use crate::util::format_int;

pub const PARQUET_BATCH_ROWS: usize = 64 * 1024;

pub const MONTHLY_TRENDS_CSV: &str = "q1_monthly_trends.csv";
pub const COMPLAINTS_BY_BOROUGH_CSV: &str = "q2_complaints_by_borough.csv";
pub const HOURLY_PATTERNS_CSV: &str = "q3_hourly_patterns.csv";
pub const RESPONSE_BY_LOCATION_CSV: &str = "q4_response_by_location.csv";
pub const CHANNELS_BY_COMPLAINT_CSV: &str = "q5_channels_by_complaint.csv";
pub const YEARLY_SUMMARY_CSV: &str = "yearly_summary.csv";

/// What ended up on disk for one exported file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    pub path: PathBuf,
    pub rows: usize,
    pub bytes: u64,
}

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    fs::write(path, s)?;
    Ok(())
}

fn export_csv<T: Serialize>(dir: &Path, name: &str, rows: &[T]) -> Result<ExportedFile> {
    let path = dir.join(name);
    write_csv(&path, rows)?;
    let bytes = fs::metadata(&path)?.len();
    info!(
        file = name,
        rows = %format_int(rows.len()),
        kb = bytes / 1000,
        "exported view"
    );
    Ok(ExportedFile {
        path,
        rows: rows.len(),
        bytes,
    })
}

/// Writes one CSV per view into `dir`, creating it if needed.
pub fn export_views(dir: &Path, views: &AggregateViews) -> Result<Vec<ExportedFile>> {
    fs::create_dir_all(dir)?;
    Ok(vec![
        export_csv(dir, MONTHLY_TRENDS_CSV, &views.monthly_trends)?,
        export_csv(dir, COMPLAINTS_BY_BOROUGH_CSV, &views.complaints_by_borough)?,
        export_csv(dir, HOURLY_PATTERNS_CSV, &views.hourly_patterns)?,
        export_csv(dir, RESPONSE_BY_LOCATION_CSV, &views.response_by_location)?,
        export_csv(dir, CHANNELS_BY_COMPLAINT_CSV, &views.channels_by_complaint)?,
        export_csv(dir, YEARLY_SUMMARY_CSV, &views.yearly_summary)?,
    ])
}

/// Column layout of the cleaned dataset. Low-cardinality text is
/// dictionary-encoded, coordinates are stored as `Float32`.
pub fn cleaned_schema() -> SchemaRef {
    let dict = || DataType::Dictionary(Box::new(DataType::Int32), Box::new(DataType::Utf8));
    let ts = || DataType::Timestamp(TimeUnit::Millisecond, None);
    Arc::new(Schema::new(vec![
        Field::new("unique_key", DataType::Int64, false),
        Field::new("created_date", ts(), false),
        Field::new("closed_date", ts(), true),
        Field::new("year", DataType::Int16, false),
        Field::new("month", DataType::Int8, false),
        Field::new("month_name", dict(), false),
        Field::new("day_of_week", dict(), false),
        Field::new("hour", DataType::Int8, false),
        Field::new("season", dict(), false),
        Field::new("is_weekend", DataType::Boolean, false),
        Field::new("complaint_type", dict(), false),
        Field::new("descriptor", dict(), true),
        Field::new("status", dict(), true),
        Field::new("agency_name", dict(), true),
        Field::new("borough", dict(), false),
        Field::new("city", dict(), true),
        Field::new("incident_zip", DataType::Utf8, true),
        Field::new("location_type", dict(), true),
        Field::new("open_data_channel_type", dict(), true),
        Field::new("channel_group", dict(), false),
        Field::new("latitude", DataType::Float32, false),
        Field::new("longitude", DataType::Float32, false),
        Field::new("response_hours", DataType::Float64, true),
    ]))
}

fn millis(ts: NaiveDateTime) -> i64 {
    ts.and_utc().timestamp_millis()
}

fn dict_column<'a, I>(values: I) -> ArrayRef
where
    I: Iterator<Item = Option<&'a str>>,
{
    Arc::new(values.collect::<DictionaryArray<Int32Type>>())
}

fn records_to_batch(records: &[ServiceRequest], schema: SchemaRef) -> Result<RecordBatch> {
    let columns: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from(
            records.iter().map(|r| r.unique_key).collect::<Vec<_>>(),
        )),
        Arc::new(TimestampMillisecondArray::from(
            records.iter().map(|r| millis(r.created_date)).collect::<Vec<_>>(),
        )),
        Arc::new(TimestampMillisecondArray::from(
            records
                .iter()
                .map(|r| r.closed_date.map(millis))
                .collect::<Vec<_>>(),
        )),
        Arc::new(Int16Array::from(
            records.iter().map(|r| r.year as i16).collect::<Vec<_>>(),
        )),
        Arc::new(Int8Array::from(
            records.iter().map(|r| r.month as i8).collect::<Vec<_>>(),
        )),
        dict_column(records.iter().map(|r| Some(r.month_name))),
        dict_column(records.iter().map(|r| Some(weekday_name(r.day_of_week)))),
        Arc::new(Int8Array::from(
            records.iter().map(|r| r.hour as i8).collect::<Vec<_>>(),
        )),
        dict_column(records.iter().map(|r| Some(r.season.as_str()))),
        Arc::new(BooleanArray::from(
            records.iter().map(|r| r.is_weekend).collect::<Vec<_>>(),
        )),
        dict_column(records.iter().map(|r| Some(r.complaint_type.as_str()))),
        dict_column(records.iter().map(|r| r.descriptor.as_deref())),
        dict_column(records.iter().map(|r| r.status.as_deref())),
        dict_column(records.iter().map(|r| r.agency_name.as_deref())),
        dict_column(records.iter().map(|r| Some(r.borough.as_str()))),
        dict_column(records.iter().map(|r| r.city.as_deref())),
        Arc::new(StringArray::from(
            records
                .iter()
                .map(|r| r.incident_zip.as_deref())
                .collect::<Vec<_>>(),
        )),
        dict_column(records.iter().map(|r| r.location_type.as_deref())),
        dict_column(records.iter().map(|r| r.open_data_channel_type.as_deref())),
        dict_column(records.iter().map(|r| Some(r.channel_group.as_str()))),
        Arc::new(Float32Array::from(
            records.iter().map(|r| r.latitude as f32).collect::<Vec<_>>(),
        )),
        Arc::new(Float32Array::from(
            records.iter().map(|r| r.longitude as f32).collect::<Vec<_>>(),
        )),
        Arc::new(Float64Array::from(
            records.iter().map(|r| r.response_hours).collect::<Vec<_>>(),
        )),
    ];
    Ok(RecordBatch::try_new(schema, columns)?)
}

/// Writes the cleaned dataset as Snappy-compressed Parquet in row batches and
/// returns the size of the file.
pub fn write_parquet(path: &Path, records: &[ServiceRequest]) -> Result<u64> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let schema = cleaned_schema();
    let file = File::create(path)?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .set_max_row_group_size(PARQUET_BATCH_ROWS)
        .build();

    let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(props))?;
    for chunk in records.chunks(PARQUET_BATCH_ROWS) {
        let batch = records_to_batch(chunk, schema.clone())?;
        writer.write(&batch)?;
    }
    writer.close()?;

    let bytes = fs::metadata(path)?.len();
    info!(
        path = %path.display(),
        rows = %format_int(records.len()),
        mb = bytes as f64 / 1e6,
        "wrote parquet"
    );
    Ok(bytes)
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}
