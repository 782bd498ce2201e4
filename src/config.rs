// Pipeline configuration: where to read, where to write, and the bounds the
// cleaned dataset has to respect.

use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::{PipelineError, Result};

/// 45 days.
pub const DEFAULT_MAX_RESPONSE_HOURS: f64 = 24.0 * 45.0;
pub const DEFAULT_INPUT: &str = "311_Service_Requests.csv";
pub const DEFAULT_DATASET_NAME: &str = "311_curated_2010_2024";
pub const EXPORTS_DIR: &str = "exports";

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub dataset_name: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub max_response_hours: f64,
}

impl PipelineConfig {
    pub fn new(
        input: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        dataset_name: impl Into<String>,
        start: NaiveDateTime,
        end: NaiveDateTime,
        max_response_hours: f64,
    ) -> Result<Self> {
        if start > end {
            return Err(PipelineError::InvalidConfig(format!(
                "start {} is after end {}",
                start, end
            )));
        }
        if !max_response_hours.is_finite() || max_response_hours <= 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "max response hours must be positive, got {}",
                max_response_hours
            )));
        }
        let dataset_name = dataset_name.into();
        if dataset_name.trim().is_empty() {
            return Err(PipelineError::InvalidConfig(
                "dataset name must not be empty".to_string(),
            ));
        }
        Ok(Self {
            input: input.into(),
            output_dir: output_dir.into(),
            dataset_name,
            start,
            end,
            max_response_hours,
        })
    }

    /// Same settings, different date bounds. Re-validates.
    pub fn with_range(self, start: NaiveDateTime, end: NaiveDateTime) -> Result<Self> {
        Self::new(
            self.input,
            self.output_dir,
            self.dataset_name,
            start,
            end,
            self.max_response_hours,
        )
    }

    pub fn contains(&self, ts: NaiveDateTime) -> bool {
        ts >= self.start && ts <= self.end
    }

    /// Label used in the summary record, e.g. `2010-2024 (inclusive)`.
    pub fn date_range_label(&self) -> String {
        use chrono::Datelike;
        format!("{}-{} (inclusive)", self.start.year(), self.end.year())
    }

    pub fn parquet_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}.parquet", self.dataset_name))
    }

    pub fn summary_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}_summary.json", self.dataset_name))
    }

    pub fn exports_dir(&self) -> PathBuf {
        self.output_dir.join(EXPORTS_DIR)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from(DEFAULT_INPUT),
            output_dir: PathBuf::from("."),
            dataset_name: DEFAULT_DATASET_NAME.to_string(),
            start: NaiveDate::from_ymd_opt(2010, 1, 1)
                .unwrap_or_default()
                .and_time(NaiveTime::MIN),
            end: NaiveDate::from_ymd_opt(2024, 12, 31)
                .and_then(|d| d.and_hms_opt(23, 59, 59))
                .unwrap_or_default(),
            max_response_hours: DEFAULT_MAX_RESPONSE_HOURS,
        }
    }
}

/// Parse a range bound given on the command line or in the environment.
///
/// A bare date expands to the start of the day for a lower bound and to
/// `23:59:59` for an upper bound, so `--end 2024-12-31` covers the whole day.
pub fn parse_bound(s: &str, upper: bool) -> Result<NaiveDateTime> {
    let s = s.trim();
    if let Ok(ts) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Ok(ts);
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Ok(ts);
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| PipelineError::InvalidConfig(format!("unrecognized date bound {:?}", s)))?;
    let time = if upper {
        NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN)
    } else {
        NaiveTime::MIN
    };
    Ok(date.and_time(time))
}
