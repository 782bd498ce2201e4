// Normalizer: canonical column names and the categorical clean-up applied to
// every loaded row.
//
// Borough and channel handling are total functions from raw text to an
// enumeration, so the fallback for unrecognized input lives in exactly one
// match arm each.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use tracing::{info, warn};

use crate::types::{Borough, ChannelGroup, LoadedRecord, NormalizedRecord};
use crate::util::{non_empty, round_to};

/// ~1 m at NYC latitudes.
pub const COORD_DECIMALS: i32 = 5;

/// Keys are trimmed, uppercased raw values.
static BOROUGH_LOOKUP: Lazy<HashMap<&'static str, Borough>> = Lazy::new(|| {
    HashMap::from([
        ("MANHATTAN", Borough::Manhattan),
        ("NEW YORK", Borough::Manhattan),
        ("BRONX", Borough::Bronx),
        ("THE BRONX", Borough::Bronx),
        ("BROOKLYN", Borough::Brooklyn),
        ("KINGS", Borough::Brooklyn),
        ("QUEENS", Borough::Queens),
        ("STATEN ISLAND", Borough::StatenIsland),
        ("RICHMOND", Borough::StatenIsland),
        ("RICHMOND / STATEN ISLAND", Borough::StatenIsland),
    ])
});

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    /// Present borough values that matched nothing in the lookup table.
    pub unknown_borough: usize,
    /// Present zip values that failed the 5-digit check.
    pub invalid_zip: usize,
}

/// `Created Date` -> `created_date`.
pub fn canonical_column_name(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}

impl Borough {
    /// Total mapping from raw text. Anything present but unrecognized lands
    /// in [`Borough::Unknown`].
    pub fn from_raw(raw: &str) -> Borough {
        let key = raw.trim().to_uppercase();
        BOROUGH_LOOKUP
            .get(key.as_str())
            .copied()
            .unwrap_or(Borough::Unknown)
    }
}

impl ChannelGroup {
    /// Case-insensitive keyword match. Groups are tested in a fixed order and
    /// the first hit wins.
    pub fn from_raw(raw: Option<&str>) -> ChannelGroup {
        const RULES: &[(&[&str], ChannelGroup)] = &[
            (&["PHONE", "CALL"], ChannelGroup::Phone),
            (&["MOBILE", "APP"], ChannelGroup::Mobile),
            (&["WEBSITE", "WEB", "ONLINE"], ChannelGroup::Web),
            (&["EMAIL"], ChannelGroup::Email),
        ];
        let Some(raw) = non_empty(raw) else {
            return ChannelGroup::Unknown;
        };
        let upper = raw.to_uppercase();
        RULES
            .iter()
            .find(|(keywords, _)| keywords.iter().any(|k| upper.contains(k)))
            .map(|(_, group)| *group)
            .unwrap_or(ChannelGroup::Other)
    }
}

/// Trim, drop a trailing `.0` left by numeric coercion, left-pad with zeros
/// to five characters, then require exactly five ASCII digits.
pub fn normalize_zip(raw: Option<&str>) -> Option<String> {
    let s = non_empty(raw)?;
    let s = s.strip_suffix(".0").unwrap_or(s);
    let padded = format!("{:0>5}", s);
    if padded.len() == 5 && padded.bytes().all(|b| b.is_ascii_digit()) {
        Some(padded)
    } else {
        None
    }
}

/// Title-case with collapsed whitespace. The first letter of every alphabetic
/// run is uppercased unless it directly follows an apostrophe.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev: Option<char> = None;
    for word in s.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
            prev = Some(' ');
        }
        for c in word.chars() {
            let starts_run = match prev {
                Some(p) => !p.is_alphabetic() && p != '\'',
                None => true,
            };
            if c.is_alphabetic() && starts_run {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            prev = Some(c);
        }
    }
    out
}

pub fn normalize_text(raw: Option<&str>) -> Option<String> {
    non_empty(raw).map(title_case)
}

pub fn normalize_record(rec: LoadedRecord) -> NormalizedRecord {
    NormalizedRecord {
        unique_key: rec.unique_key,
        created_date: rec.created_date,
        closed_date: rec.closed_date,
        agency_name: normalize_text(rec.agency_name.as_deref()),
        complaint_type: normalize_text(rec.complaint_type.as_deref()),
        descriptor: normalize_text(rec.descriptor.as_deref()),
        location_type: normalize_text(rec.location_type.as_deref()),
        incident_zip: normalize_zip(rec.incident_zip.as_deref()),
        city: normalize_text(rec.city.as_deref()),
        status: normalize_text(rec.status.as_deref()),
        borough: non_empty(rec.borough.as_deref()).map(Borough::from_raw),
        channel_group: ChannelGroup::from_raw(rec.open_data_channel_type.as_deref()),
        open_data_channel_type: non_empty(rec.open_data_channel_type.as_deref())
            .map(str::to_string),
        latitude: rec.latitude.map(|v| round_to(v, COORD_DECIMALS)),
        longitude: rec.longitude.map(|v| round_to(v, COORD_DECIMALS)),
    }
}

pub fn normalize_all(rows: Vec<LoadedRecord>) -> (Vec<NormalizedRecord>, NormalizeReport) {
    let mut report = NormalizeReport::default();
    let out: Vec<NormalizedRecord> = rows
        .into_iter()
        .map(|rec| {
            let had_zip = non_empty(rec.incident_zip.as_deref()).is_some();
            let n = normalize_record(rec);
            if had_zip && n.incident_zip.is_none() {
                report.invalid_zip += 1;
            }
            if n.borough == Some(Borough::Unknown) {
                report.unknown_borough += 1;
            }
            n
        })
        .collect();

    if report.unknown_borough > 0 {
        warn!(
            rows = report.unknown_borough,
            "borough values outside the known set mapped to Unknown"
        );
    }
    info!(
        rows = out.len(),
        invalid_zip = report.invalid_zip,
        "normalized rows"
    );
    (out, report)
}
