use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::PathBuf;

use nyc311_curate::config::{parse_bound, PipelineConfig};
use nyc311_curate::pipeline::{clean, run};
use nyc311_curate::reports::{build_all, complaints_by_borough};
use nyc311_curate::types::{Borough, ChannelGroup};
use nyc311_curate::PipelineError;

const HEADER: &str = "Unique Key,Created Date,Closed Date,Agency,Agency Name,Complaint Type,Descriptor,Location Type,Incident Zip,Incident Address,City,Status,Borough,Open Data Channel Type,Latitude,Longitude";

const ROWS: &[&str] = &[
    // in range, two-day response, zip artifact, web channel
    "42,01/01/2020 12:00:00 AM,01/03/2020 12:00:00 AM,NYPD,New York City Police Department,NOISE - RESIDENTIAL,Loud Music/Party,Residential Building/House,10001.0,1 MAIN ST,NEW YORK,Closed,MANHATTAN,ONLINE,40.7484405,-73.9856644",
    // duplicate key, must lose to the row above
    "42,02/01/2020 12:00:00 AM,,NYPD,New York City Police Department,Illegal Parking,Blocked Hydrant,Street/Sidewalk,10002,2 MAIN ST,NEW YORK,Open,MANHATTAN,PHONE,40.71,-73.99",
    // before the range
    "7,12/31/2009 11:00:00 PM,01/01/2010 01:00:00 AM,DOT,Department of Transportation,Street Condition,Pothole,Street,11201,3 MAIN ST,BROOKLYN,Closed,BROOKLYN,PHONE,40.69,-73.99",
    // unparsable created date
    "8,not a date,,DOT,Department of Transportation,Street Condition,Pothole,Street,11201,4 MAIN ST,BROOKLYN,Closed,BROOKLYN,PHONE,40.69,-73.99",
    // missing coordinates
    "9,03/01/2021 08:00:00 AM,,DEP,Department of Environmental Protection,Noise,Noise: Construction,Street,11101,5 MAIN ST,QUEENS,Open,QUEENS,MOBILE,,",
    // Richmond variant, response capped at 45 days
    "10,03/01/2021 08:00:00 AM,06/01/2021 08:00:00 AM,DSNY,Department of Sanitation,Missed Collection,Trash,Street,10301,6 MAIN ST,STATEN ISLAND,Closed,Richmond,Call Center,40.64,-74.08",
    // unknown borough is kept, malformed zip nulled
    "11,07/04/2021 01:30:00 PM,07/04/2021 03:30:00 PM,HPD,Housing Preservation and Development,HEAT/HOT WATER,Entire Building,Residential Building,ABCDE,7 MAIN ST,BRONX,Closed,Unspecified,EMAIL,40.85,-73.88",
    // closed after the range end: no response time
    "12,12/31/2024 11:00:00 PM,01/02/2025 11:00:00 PM,NYPD,New York City Police Department,Noise - Residential,Banging/Pounding,Residential Building/House,10451,8 MAIN ST,BRONX,Closed,BRONX,UNKNOWN,40.82,-73.92",
    // missing borough
    "13,05/05/2022 05:00:00 PM,,NYPD,New York City Police Department,Noise - Street/Sidewalk,Loud Talking,Street/Sidewalk,10003,9 MAIN ST,NEW YORK,Open,,PHONE,40.73,-73.99",
];

fn fixture(name: &str) -> (PathBuf, PipelineConfig) {
    let dir = env::temp_dir().join(name);
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    let input = dir.join("raw.csv");
    let mut body = String::from(HEADER);
    for row in ROWS {
        body.push('\n');
        body.push_str(row);
    }
    body.push('\n');
    fs::write(&input, body).unwrap();

    let cfg = PipelineConfig::new(
        &input,
        dir.join("out"),
        "curated",
        parse_bound("2010-01-01", false).unwrap(),
        parse_bound("2024-12-31", true).unwrap(),
        24.0 * 45.0,
    )
    .unwrap();
    (dir, cfg)
}

#[test]
fn cleaned_dataset_honors_invariants() {
    let (dir, cfg) = fixture("nyc311_it_invariants");
    let (data, report) = clean(&cfg).unwrap();

    assert_eq!(report.load.total_rows, ROWS.len());
    assert_eq!(report.validation.missing_created, 1);
    assert_eq!(report.validation.out_of_range, 1);
    assert_eq!(report.validation.missing_required, 2);
    assert_eq!(report.validation.duplicates, 1);
    assert_eq!(data.len(), 4);

    let keys: HashSet<i64> = data.iter().map(|r| r.unique_key).collect();
    assert_eq!(keys.len(), data.len());
    assert!(!keys.contains(&7));

    for r in &data {
        assert!(cfg.contains(r.created_date));
        assert!(!r.complaint_type.is_empty());
        if let Some(h) = r.response_hours {
            assert!((0.0..=cfg.max_response_hours).contains(&h));
        }
    }
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn scenario_values_come_through() {
    let (dir, cfg) = fixture("nyc311_it_scenarios");
    let (data, _) = clean(&cfg).unwrap();
    let by_key = |k: i64| data.iter().find(|r| r.unique_key == k).unwrap();

    let first = by_key(42);
    assert_eq!(first.complaint_type, "Noise - Residential");
    assert_eq!(first.incident_zip.as_deref(), Some("10001"));
    assert_eq!(first.channel_group, ChannelGroup::Web);
    assert_eq!(first.response_hours, Some(48.0));
    assert_eq!(first.latitude, 40.74844);

    let richmond = by_key(10);
    assert_eq!(richmond.borough, Borough::StatenIsland);
    assert_eq!(richmond.channel_group, ChannelGroup::Phone);
    assert_eq!(richmond.response_hours, Some(1080.0));

    let unknown = by_key(11);
    assert_eq!(unknown.borough, Borough::Unknown);
    assert_eq!(unknown.incident_zip, None);
    assert_eq!(unknown.complaint_type, "Heat/Hot Water");
    assert_eq!(unknown.response_hours, Some(2.0));
    assert!(unknown.is_weekend);

    assert_eq!(by_key(12).response_hours, None);
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn narrower_range_excludes_more_rows() {
    let (dir, cfg) = fixture("nyc311_it_narrow");
    let cfg = cfg
        .with_range(
            parse_bound("2021-01-01", false).unwrap(),
            parse_bound("2021-12-31", true).unwrap(),
        )
        .unwrap();
    let (data, _) = clean(&cfg).unwrap();
    assert!(data.iter().all(|r| r.year == 2021));
    let keys: Vec<i64> = data.iter().map(|r| r.unique_key).collect();
    assert_eq!(keys, vec![10, 11]);
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn top_complaints_view_matches_yearly_totals() {
    let (dir, cfg) = fixture("nyc311_it_totals");
    let (data, _) = clean(&cfg).unwrap();
    let view = complaints_by_borough(&data);
    let years: HashSet<i32> = data.iter().map(|r| r.year).collect();
    for year in years {
        let from_view: usize = view.iter().filter(|r| r.year == year).map(|r| r.count).sum();
        let from_data = data.iter().filter(|r| r.year == year).count();
        assert_eq!(from_view, from_data);
    }
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn rerun_is_idempotent() {
    let (dir, cfg) = fixture("nyc311_it_idempotent");
    let (a, _) = clean(&cfg).unwrap();
    let (b, _) = clean(&cfg).unwrap();
    assert_eq!(a, b);
    assert_eq!(build_all(&a), build_all(&b));
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn full_run_writes_every_output() {
    let (dir, cfg) = fixture("nyc311_it_full_run");
    let outcome = run(&cfg).unwrap();

    assert!(cfg.parquet_path().exists());
    assert!(outcome.parquet_bytes > 0);
    assert_eq!(outcome.exports.len(), 6);
    for file in &outcome.exports {
        assert!(file.path.exists());
        assert!(file.bytes > 0);
    }

    let summary: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(cfg.summary_path()).unwrap()).unwrap();
    assert_eq!(summary["rows_written"], 4);
    assert_eq!(summary["date_range"], "2010-2024 (inclusive)");
    assert_eq!(summary["earliest_date"], "2020-01-01");
    assert_eq!(summary["latest_date"], "2024-12-31");
    assert_eq!(summary["years_covered"], serde_json::json!([2020, 2021, 2024]));
    assert_eq!(summary["boroughs"]["Bronx"], 1);

    let yearly = fs::read_to_string(cfg.exports_dir().join("yearly_summary.csv")).unwrap();
    let mut lines = yearly.lines();
    assert_eq!(lines.next(), Some("year,total_requests,median_response_hours"));
    assert_eq!(lines.next(), Some("2020,1,48.0"));
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn missing_input_fails_before_writing() {
    let (dir, cfg) = fixture("nyc311_it_missing");
    fs::remove_file(&cfg.input).unwrap();
    match run(&cfg) {
        Err(PipelineError::InputNotFound(_)) => {}
        other => panic!("expected InputNotFound, got {:?}", other.map(|o| o.dataset.len())),
    }
    assert!(!cfg.parquet_path().exists());
    fs::remove_dir_all(&dir).unwrap();
}
