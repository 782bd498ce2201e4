// Feature Deriver: calendar fields and response time. Timestamps are taken
// as already local; no timezone conversion happens here.

use chrono::{Datelike, Month, NaiveDateTime, Timelike, Weekday};
use tracing::info;

use crate::config::PipelineConfig;
use crate::types::{Season, ServiceRequest, ValidatedRecord};

const SEASONS: [Season; 12] = [
    Season::Winter,
    Season::Winter,
    Season::Spring,
    Season::Spring,
    Season::Spring,
    Season::Summer,
    Season::Summer,
    Season::Summer,
    Season::Fall,
    Season::Fall,
    Season::Fall,
    Season::Winter,
];

/// `month` is 1-based.
pub fn season_for_month(month: u32) -> Season {
    SEASONS[(month.clamp(1, 12) - 1) as usize]
}

pub fn month_name(month: u32) -> &'static str {
    u8::try_from(month)
        .ok()
        .and_then(|m| Month::try_from(m).ok())
        .map(|m| m.name())
        .unwrap_or("")
}

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

pub fn is_weekend(day: Weekday) -> bool {
    matches!(day, Weekday::Sat | Weekday::Sun)
}

/// Hours from creation to closure, clamped to `[0, max_response_hours]`.
///
/// `None` when the request has no closure or was closed after the end of the
/// configured range.
pub fn response_hours(
    created: NaiveDateTime,
    closed: Option<NaiveDateTime>,
    config: &PipelineConfig,
) -> Option<f64> {
    let closed = closed.filter(|c| *c <= config.end)?;
    let hours = (closed - created).num_milliseconds() as f64 / 3_600_000.0;
    Some(hours.clamp(0.0, config.max_response_hours))
}

pub fn derive(rec: ValidatedRecord, config: &PipelineConfig) -> ServiceRequest {
    let created = rec.created_date;
    let month = created.month();
    let day = created.weekday();
    ServiceRequest {
        unique_key: rec.unique_key,
        created_date: created,
        closed_date: rec.closed_date,
        year: created.year(),
        month,
        month_name: month_name(month),
        day_of_week: day,
        hour: created.hour(),
        season: season_for_month(month),
        is_weekend: is_weekend(day),
        response_hours: response_hours(created, rec.closed_date, config),
        complaint_type: rec.complaint_type,
        descriptor: rec.descriptor,
        status: rec.status,
        agency_name: rec.agency_name,
        borough: rec.borough,
        city: rec.city,
        incident_zip: rec.incident_zip,
        location_type: rec.location_type,
        open_data_channel_type: rec.open_data_channel_type,
        channel_group: rec.channel_group,
        latitude: rec.latitude,
        longitude: rec.longitude,
    }
}

pub fn derive_all(rows: Vec<ValidatedRecord>, config: &PipelineConfig) -> Vec<ServiceRequest> {
    let out: Vec<ServiceRequest> = rows.into_iter().map(|r| derive(r, config)).collect();
    let with_response = out.iter().filter(|r| r.response_hours.is_some()).count();
    info!(
        rows = out.len(),
        with_response_hours = with_response,
        "derived temporal features"
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Borough, ChannelGroup};

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn validated(created: &str, closed: Option<&str>) -> ValidatedRecord {
        ValidatedRecord {
            unique_key: 1,
            created_date: ts(created),
            closed_date: closed.map(ts),
            agency_name: None,
            complaint_type: "Noise".into(),
            descriptor: None,
            location_type: None,
            incident_zip: None,
            city: None,
            status: None,
            borough: Borough::Bronx,
            open_data_channel_type: None,
            channel_group: ChannelGroup::Unknown,
            latitude: 40.8,
            longitude: -73.9,
        }
    }

    #[test]
    fn season_table_is_meteorological() {
        assert_eq!(season_for_month(12), Season::Winter);
        assert_eq!(season_for_month(1), Season::Winter);
        assert_eq!(season_for_month(2), Season::Winter);
        assert_eq!(season_for_month(3), Season::Spring);
        assert_eq!(season_for_month(6), Season::Summer);
        assert_eq!(season_for_month(8), Season::Summer);
        assert_eq!(season_for_month(9), Season::Fall);
        assert_eq!(season_for_month(11), Season::Fall);
    }

    #[test]
    fn two_days_is_48_hours() {
        let r = derive(
            validated("2020-01-01 00:00:00", Some("2020-01-03 00:00:00")),
            &PipelineConfig::default(),
        );
        assert_eq!(r.response_hours, Some(48.0));
    }

    #[test]
    fn response_hours_are_clamped() {
        let cfg = PipelineConfig::default();
        let early = derive(
            validated("2020-01-03 00:00:00", Some("2020-01-01 00:00:00")),
            &cfg,
        );
        assert_eq!(early.response_hours, Some(0.0));
        let late = derive(
            validated("2020-01-01 00:00:00", Some("2020-06-01 00:00:00")),
            &cfg,
        );
        assert_eq!(late.response_hours, Some(cfg.max_response_hours));
    }

    #[test]
    fn closure_missing_or_after_range_is_absent() {
        let cfg = PipelineConfig::default();
        assert_eq!(derive(validated("2020-01-01 00:00:00", None), &cfg).response_hours, None);
        let after = derive(
            validated("2024-12-30 00:00:00", Some("2025-01-02 00:00:00")),
            &cfg,
        );
        assert_eq!(after.response_hours, None);
    }

    #[test]
    fn calendar_fields() {
        // 2021-07-04 was a Sunday.
        let r = derive(validated("2021-07-04 13:45:00", None), &PipelineConfig::default());
        assert_eq!(r.year, 2021);
        assert_eq!(r.month, 7);
        assert_eq!(r.month_name, "July");
        assert_eq!(r.day_of_week, Weekday::Sun);
        assert_eq!(weekday_name(r.day_of_week), "Sunday");
        assert_eq!(r.hour, 13);
        assert_eq!(r.season, Season::Summer);
        assert!(r.is_weekend);

        let weekday = derive(validated("2021-07-06 08:00:00", None), &PipelineConfig::default());
        assert!(!weekday.is_weekend);
        assert_eq!(weekday_name(weekday.day_of_week), "Tuesday");
    }
}
