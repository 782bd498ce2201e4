use crate::config::PipelineConfig;
use crate::features::weekday_name;
use crate::types::{
    Borough, ChannelByComplaintRow, ChannelGroup, ComplaintByBoroughRow, HourlyPatternRow,
    MonthlyTrendRow, ResponseByLocationRow, ServiceRequest, SummaryStats, YearlySummaryRow,
};
use crate::util::{average, median, round_to};
use chrono::{Datelike, NaiveDate, Weekday};
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashMap};
use std::thread;

pub const TOP_HOURLY_COMPLAINTS: usize = 20;
pub const TOP_SUMMARY_COMPLAINTS: usize = 10;

/// Every aggregation view, computed from one cleaned dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateViews {
    pub monthly_trends: Vec<MonthlyTrendRow>,
    pub complaints_by_borough: Vec<ComplaintByBoroughRow>,
    pub hourly_patterns: Vec<HourlyPatternRow>,
    pub response_by_location: Vec<ResponseByLocationRow>,
    pub channels_by_complaint: Vec<ChannelByComplaintRow>,
    pub yearly_summary: Vec<YearlySummaryRow>,
}

/// Counts per value, most frequent first, ties by value.
fn ranked_counts<K, I>(values: I) -> Vec<(K, usize)>
where
    K: Ord + std::hash::Hash,
    I: Iterator<Item = K>,
{
    let mut counts: HashMap<K, usize> = HashMap::new();
    for v in values {
        *counts.entry(v).or_default() += 1;
    }
    let mut ranked: Vec<(K, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
}

fn weekday_order(day: Weekday) -> u32 {
    day.num_days_from_monday()
}

pub fn monthly_trends(data: &[ServiceRequest]) -> Vec<MonthlyTrendRow> {
    let mut map: HashMap<(NaiveDate, Borough), usize> = HashMap::new();
    for r in data {
        let d = r.created_date.date();
        let Some(month_start) = NaiveDate::from_ymd_opt(d.year(), d.month(), 1) else {
            continue;
        };
        *map.entry((month_start, r.borough)).or_default() += 1;
    }
    let mut rows: Vec<MonthlyTrendRow> = map
        .into_iter()
        .map(|((date, borough), count)| MonthlyTrendRow {
            date,
            borough,
            count,
        })
        .collect();
    rows.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.borough.cmp(&b.borough)));
    rows
}

pub fn complaints_by_borough(data: &[ServiceRequest]) -> Vec<ComplaintByBoroughRow> {
    let mut map: HashMap<(i32, Borough, &str), usize> = HashMap::new();
    for r in data {
        *map.entry((r.year, r.borough, r.complaint_type.as_str()))
            .or_default() += 1;
    }
    let mut rows: Vec<ComplaintByBoroughRow> = map
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .map(|((year, borough, complaint), count)| ComplaintByBoroughRow {
            year,
            borough,
            complaint_type: complaint.to_string(),
            count,
        })
        .collect();
    rows.sort_by(|a, b| {
        a.year
            .cmp(&b.year)
            .then_with(|| a.borough.cmp(&b.borough))
            .then_with(|| b.count.cmp(&a.count))
            .then_with(|| a.complaint_type.cmp(&b.complaint_type))
    });
    rows
}

pub fn hourly_patterns(data: &[ServiceRequest]) -> Vec<HourlyPatternRow> {
    let top: Vec<&str> = ranked_counts(data.iter().map(|r| r.complaint_type.as_str()))
        .into_iter()
        .take(TOP_HOURLY_COMPLAINTS)
        .map(|(c, _)| c)
        .collect();

    let mut map: HashMap<(&str, Weekday, u32), usize> = HashMap::new();
    for r in data.iter().filter(|r| top.contains(&r.complaint_type.as_str())) {
        *map.entry((r.complaint_type.as_str(), r.day_of_week, r.hour))
            .or_default() += 1;
    }
    let mut keyed: Vec<((&str, Weekday, u32), usize)> = map.into_iter().collect();
    keyed.sort_by(|(a, _), (b, _)| {
        a.0.cmp(b.0)
            .then_with(|| weekday_order(a.1).cmp(&weekday_order(b.1)))
            .then_with(|| a.2.cmp(&b.2))
    });
    keyed
        .into_iter()
        .map(|((complaint, day, hour), count)| HourlyPatternRow {
            complaint_type: complaint.to_string(),
            day_of_week: weekday_name(day),
            hour,
            count,
        })
        .collect()
}

pub fn response_by_location(data: &[ServiceRequest]) -> Vec<ResponseByLocationRow> {
    #[derive(Default)]
    struct Acc {
        lats: Vec<f64>,
        lngs: Vec<f64>,
        hours: Vec<f64>,
        count: usize,
    }
    let mut map: HashMap<(i32, &str, Borough), Acc> = HashMap::new();
    for r in data {
        // Rows without a zip have no location group.
        let Some(zip) = r.incident_zip.as_deref() else {
            continue;
        };
        let e = map.entry((r.year, zip, r.borough)).or_default();
        e.lats.push(r.latitude);
        e.lngs.push(r.longitude);
        if let Some(h) = r.response_hours {
            e.hours.push(h);
        }
        e.count += 1;
    }
    let mut rows: Vec<ResponseByLocationRow> = map
        .into_iter()
        .filter(|(_, acc)| acc.count > 0)
        .filter_map(|((year, zip, borough), acc)| {
            let med = median(acc.hours)?;
            Some(ResponseByLocationRow {
                year,
                zip: zip.to_string(),
                borough,
                lat: round_to(average(&acc.lats), 5),
                lng: round_to(average(&acc.lngs), 5),
                median_response_hours: round_to(med, 2),
                count: acc.count,
            })
        })
        .collect();
    rows.sort_by(|a, b| {
        a.year
            .cmp(&b.year)
            .then_with(|| a.zip.cmp(&b.zip))
            .then_with(|| a.borough.cmp(&b.borough))
    });
    rows
}

pub fn channels_by_complaint(data: &[ServiceRequest]) -> Vec<ChannelByComplaintRow> {
    let mut map: HashMap<(i32, &str, ChannelGroup), usize> = HashMap::new();
    for r in data {
        *map.entry((r.year, r.complaint_type.as_str(), r.channel_group))
            .or_default() += 1;
    }
    let mut rows: Vec<ChannelByComplaintRow> = map
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .map(|((year, complaint, channel_group), count)| ChannelByComplaintRow {
            year,
            complaint_type: complaint.to_string(),
            channel_group,
            count,
        })
        .collect();
    rows.sort_by(|a, b| {
        a.year
            .cmp(&b.year)
            .then_with(|| a.complaint_type.cmp(&b.complaint_type))
            .then_with(|| b.count.cmp(&a.count))
            .then_with(|| a.channel_group.cmp(&b.channel_group))
    });
    rows
}

pub fn yearly_summary(data: &[ServiceRequest]) -> Vec<YearlySummaryRow> {
    let mut map: HashMap<i32, (usize, Vec<f64>)> = HashMap::new();
    for r in data {
        let e = map.entry(r.year).or_default();
        e.0 += 1;
        if let Some(h) = r.response_hours {
            e.1.push(h);
        }
    }
    let mut rows: Vec<YearlySummaryRow> = map
        .into_iter()
        .map(|(year, (total, hours))| YearlySummaryRow {
            year,
            total_requests: total,
            median_response_hours: median(hours).map(|m| round_to(m, 2)),
        })
        .collect();
    rows.sort_by_key(|r| r.year);
    rows
}

/// A panicking view is a bug; re-raise it on the caller's thread.
fn join_view<T>(handle: thread::ScopedJoinHandle<'_, T>) -> T {
    match handle.join() {
        Ok(v) => v,
        Err(payload) => std::panic::resume_unwind(payload),
    }
}

/// Computes all six views on scoped threads. The views only read `data`, so
/// the result is identical to calling each function in turn.
pub fn build_all(data: &[ServiceRequest]) -> AggregateViews {
    thread::scope(|s| {
        let monthly = s.spawn(|| monthly_trends(data));
        let complaints = s.spawn(|| complaints_by_borough(data));
        let hourly = s.spawn(|| hourly_patterns(data));
        let location = s.spawn(|| response_by_location(data));
        let channels = s.spawn(|| channels_by_complaint(data));
        let yearly = yearly_summary(data);

        AggregateViews {
            monthly_trends: join_view(monthly),
            complaints_by_borough: join_view(complaints),
            hourly_patterns: join_view(hourly),
            response_by_location: join_view(location),
            channels_by_complaint: join_view(channels),
            yearly_summary: yearly,
        }
    })
}

pub fn generate_summary(
    data: &[ServiceRequest],
    config: &PipelineConfig,
    file_size_bytes: u64,
) -> SummaryStats {
    let earliest = data.iter().map(|r| r.created_date).min();
    let latest = data.iter().map(|r| r.created_date).max();

    let boroughs: Map<String, Value> = ranked_counts(data.iter().map(|r| r.borough))
        .into_iter()
        .map(|(b, n)| (b.to_string(), Value::from(n)))
        .collect();
    let top_complaints: Map<String, Value> =
        ranked_counts(data.iter().map(|r| r.complaint_type.as_str()))
            .into_iter()
            .take(TOP_SUMMARY_COMPLAINTS)
            .map(|(c, n)| (c.to_string(), Value::from(n)))
            .collect();
    let years: BTreeSet<i32> = data.iter().map(|r| r.year).collect();

    SummaryStats {
        rows_written: data.len(),
        date_range: config.date_range_label(),
        earliest_date: earliest.map(|d| d.format("%Y-%m-%d").to_string()),
        latest_date: latest.map(|d| d.format("%Y-%m-%d").to_string()),
        file_size_mb: file_size_bytes as f64 / 1e6,
        boroughs,
        top_complaints,
        years_covered: years.into_iter().collect(),
    }
}
