// Entry point and high-level CLI flow.
//
// One invocation runs the whole batch: load and clean the raw export, write
// the Parquet dataset and its JSON summary, then export the aggregation views
// and print a short preview of each.
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use nyc311_curate::config::{self, PipelineConfig};
use nyc311_curate::output;
use nyc311_curate::pipeline::{self, RunOutcome};
use nyc311_curate::util::{format_int, format_number};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "nyc311_curate")]
#[command(about = "Clean the NYC 311 export and build the visualization summaries", long_about = None)]
struct Cli {
    /// Raw 311 CSV export
    #[arg(short, long, env = "NYC311_INPUT", default_value = config::DEFAULT_INPUT)]
    input: PathBuf,

    /// Directory for the Parquet file, summary JSON and exports/
    #[arg(short, long, env = "NYC311_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Base name of the Parquet and summary files
    #[arg(long, env = "NYC311_DATASET_NAME", default_value = config::DEFAULT_DATASET_NAME)]
    dataset_name: String,

    /// First timestamp kept, inclusive (YYYY-MM-DD or YYYY-MM-DD HH:MM:SS)
    #[arg(long, env = "NYC311_START", default_value = "2010-01-01 00:00:00")]
    start: String,

    /// Last timestamp kept, inclusive; a bare date means end of that day
    #[arg(long, env = "NYC311_END", default_value = "2024-12-31 23:59:59")]
    end: String,

    /// Response times above this are capped
    #[arg(long, env = "NYC311_MAX_RESPONSE_HOURS", default_value_t = config::DEFAULT_MAX_RESPONSE_HOURS)]
    max_response_hours: f64,

    /// Rows shown per view in the console preview
    #[arg(long, default_value_t = 3)]
    preview_rows: usize,

    /// Skip the console preview
    #[arg(long, default_value_t = false)]
    no_preview: bool,
}

impl Cli {
    fn to_config(&self) -> Result<PipelineConfig> {
        let start = config::parse_bound(&self.start, false)?;
        let end = config::parse_bound(&self.end, true)?;
        Ok(PipelineConfig::new(
            self.input.clone(),
            self.output_dir.clone(),
            self.dataset_name.clone(),
            start,
            end,
            self.max_response_hours,
        )?)
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Console report after a successful run: removal counts, file sizes and a
/// markdown preview of every view.
fn print_outcome(cfg: &PipelineConfig, outcome: &RunOutcome, preview_rows: Option<usize>) {
    let load = &outcome.report.load;
    let v = &outcome.report.validation;
    println!(
        "Processing dataset... ({} rows read, {} kept for {})",
        format_int(load.total_rows),
        format_int(outcome.dataset.len()),
        cfg.date_range_label()
    );
    if load.parse_errors > 0 {
        println!(
            "Note: {} rows skipped as unreadable.",
            format_int(load.parse_errors)
        );
    }
    println!(
        "Dropped: {} without created date, {} out of range, {} missing key fields, {} duplicates.",
        format_int(v.missing_created),
        format_int(v.out_of_range),
        format_int(v.missing_required),
        format_int(v.duplicates)
    );
    if outcome.report.normalize.unknown_borough > 0 {
        println!(
            "Info: {} rows have an unrecognized borough (bucketed as Unknown).",
            format_int(outcome.report.normalize.unknown_borough)
        );
    }
    println!(
        "Parquet file: {} ({} MB)",
        cfg.parquet_path().display(),
        format_number(outcome.parquet_bytes as f64 / 1e6, 1)
    );
    println!("Summary: {}\n", cfg.summary_path().display());

    let Some(n) = preview_rows else {
        return;
    };
    let views = &outcome.views;
    let titles = [
        "Monthly Trends by Borough",
        "Top Complaints by Borough",
        "Hourly Patterns (Top 20 Complaint Types)",
        "Response Time by Location",
        "Channel Usage by Complaint Type",
        "Yearly Summary",
    ];
    for (i, (title, file)) in titles.iter().zip(&outcome.exports).enumerate() {
        println!("View {}: {}", i + 1, title);
        println!(
            "({} rows, exported to {})\n",
            format_int(file.rows),
            file.path.display()
        );
        match i {
            0 => output::preview_table_rows(&views.monthly_trends, n),
            1 => output::preview_table_rows(&views.complaints_by_borough, n),
            2 => output::preview_table_rows(&views.hourly_patterns, n),
            3 => output::preview_table_rows(&views.response_by_location, n),
            4 => output::preview_table_rows(&views.channels_by_complaint, n),
            _ => output::preview_table_rows(&views.yearly_summary, n),
        }
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_logging();

    let cli = Cli::parse();
    let cfg = cli.to_config()?;

    let outcome = pipeline::run(&cfg)
        .with_context(|| format!("pipeline failed for {}", cfg.input.display()))?;

    let preview = (!cli.no_preview).then_some(cli.preview_rows);
    print_outcome(&cfg, &outcome, preview);
    Ok(())
}
