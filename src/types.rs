use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};
use tabled::Tabled;

use crate::util::display_opt;

/// One CSV row restricted to the allowlisted columns.
///
/// Headers are canonicalized before deserialization, so field names here are
/// the snake-case forms of the published column names.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawRow {
    pub unique_key: Option<String>,
    pub created_date: Option<String>,
    pub closed_date: Option<String>,
    pub agency_name: Option<String>,
    pub complaint_type: Option<String>,
    pub descriptor: Option<String>,
    pub location_type: Option<String>,
    pub incident_zip: Option<String>,
    pub city: Option<String>,
    pub status: Option<String>,
    pub borough: Option<String>,
    pub open_data_channel_type: Option<String>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
}

/// A row after per-column typing. Nothing has been normalized yet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedRecord {
    pub unique_key: Option<i64>,
    pub created_date: Option<NaiveDateTime>,
    pub closed_date: Option<NaiveDateTime>,
    pub agency_name: Option<String>,
    pub complaint_type: Option<String>,
    pub descriptor: Option<String>,
    pub location_type: Option<String>,
    pub incident_zip: Option<String>,
    pub city: Option<String>,
    pub status: Option<String>,
    pub borough: Option<String>,
    pub open_data_channel_type: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// A row after the Normalizer: categorical fields are enumerations, text is
/// title-cased, the zip is either a valid 5-digit string or absent.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    pub unique_key: Option<i64>,
    pub created_date: Option<NaiveDateTime>,
    pub closed_date: Option<NaiveDateTime>,
    pub agency_name: Option<String>,
    pub complaint_type: Option<String>,
    pub descriptor: Option<String>,
    pub location_type: Option<String>,
    pub incident_zip: Option<String>,
    pub city: Option<String>,
    pub status: Option<String>,
    pub borough: Option<Borough>,
    pub open_data_channel_type: Option<String>,
    pub channel_group: ChannelGroup,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// A row that passed every filter. Required fields are no longer optional.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRecord {
    pub unique_key: i64,
    pub created_date: NaiveDateTime,
    pub closed_date: Option<NaiveDateTime>,
    pub agency_name: Option<String>,
    pub complaint_type: String,
    pub descriptor: Option<String>,
    pub location_type: Option<String>,
    pub incident_zip: Option<String>,
    pub city: Option<String>,
    pub status: Option<String>,
    pub borough: Borough,
    pub open_data_channel_type: Option<String>,
    pub channel_group: ChannelGroup,
    pub latitude: f64,
    pub longitude: f64,
}

/// A row of the cleaned dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceRequest {
    pub unique_key: i64,
    pub created_date: NaiveDateTime,
    pub closed_date: Option<NaiveDateTime>,
    pub year: i32,
    pub month: u32,
    pub month_name: &'static str,
    pub day_of_week: Weekday,
    pub hour: u32,
    pub season: Season,
    pub is_weekend: bool,
    pub complaint_type: String,
    pub descriptor: Option<String>,
    pub status: Option<String>,
    pub agency_name: Option<String>,
    pub borough: Borough,
    pub city: Option<String>,
    pub incident_zip: Option<String>,
    pub location_type: Option<String>,
    pub open_data_channel_type: Option<String>,
    pub channel_group: ChannelGroup,
    pub latitude: f64,
    pub longitude: f64,
    pub response_hours: Option<f64>,
}

/// Variants are declared in name order so the derived `Ord` sorts the same
/// way the labels do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Borough {
    Bronx,
    Brooklyn,
    Manhattan,
    Queens,
    #[serde(rename = "Staten Island")]
    StatenIsland,
    Unknown,
}

impl Borough {
    pub fn as_str(self) -> &'static str {
        match self {
            Borough::Bronx => "Bronx",
            Borough::Brooklyn => "Brooklyn",
            Borough::Manhattan => "Manhattan",
            Borough::Queens => "Queens",
            Borough::StatenIsland => "Staten Island",
            Borough::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Borough {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ChannelGroup {
    Email,
    Mobile,
    Other,
    Phone,
    Unknown,
    Web,
}

impl ChannelGroup {
    pub fn as_str(self) -> &'static str {
        match self {
            ChannelGroup::Email => "Email",
            ChannelGroup::Mobile => "Mobile",
            ChannelGroup::Other => "Other",
            ChannelGroup::Phone => "Phone",
            ChannelGroup::Unknown => "Unknown",
            ChannelGroup::Web => "Web",
        }
    }
}

impl fmt::Display for ChannelGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Fall,
}

impl Season {
    pub fn as_str(self) -> &'static str {
        match self {
            Season::Winter => "Winter",
            Season::Spring => "Spring",
            Season::Summer => "Summer",
            Season::Fall => "Fall",
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct MonthlyTrendRow {
    pub date: NaiveDate,
    pub borough: Borough,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct ComplaintByBoroughRow {
    pub year: i32,
    pub borough: Borough,
    pub complaint_type: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct HourlyPatternRow {
    pub complaint_type: String,
    pub day_of_week: &'static str,
    pub hour: u32,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct ResponseByLocationRow {
    pub year: i32,
    pub zip: String,
    pub borough: Borough,
    pub lat: f64,
    pub lng: f64,
    pub median_response_hours: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct ChannelByComplaintRow {
    pub year: i32,
    pub complaint_type: String,
    pub channel_group: ChannelGroup,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct YearlySummaryRow {
    pub year: i32,
    pub total_requests: usize,
    #[tabled(display_with = "display_opt")]
    pub median_response_hours: Option<f64>,
}

/// The dataset-level summary written next to the Parquet file.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryStats {
    pub rows_written: usize,
    pub date_range: String,
    pub earliest_date: Option<String>,
    pub latest_date: Option<String>,
    pub file_size_mb: f64,
    pub boroughs: serde_json::Map<String, serde_json::Value>,
    pub top_complaints: serde_json::Map<String, serde_json::Value>,
    pub years_covered: Vec<i32>,
}
