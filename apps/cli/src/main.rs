#![deny(warnings)]

//! `plot-ev`: chart EV per play against number of trials, one line per seed,
//! from the dice runs recorded in a SQLite database.

mod config;

use anyhow::{Context, Result};
use clap::{Parser, ValueHint};
use config::PlotConfig;
use ev_core::RawRunRecord;
use ev_pipeline::{
    prepare, render, ChartOptions, Dataset, FilterReport, FilterSpec, PipelineOutcome,
};
use ev_render::PlotRenderer;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "plot-ev", version)]
#[command(long_version = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_SHA"),
    " ",
    env!("BUILD_DATE"),
    ")"
))]
#[command(about = "Plot EV vs trials per seed from SQLite")]
struct Args {
    /// Path to SQLite DB (e.g. data/sim.db)
    #[arg(value_hint = ValueHint::FilePath)]
    db: PathBuf,

    /// Keep runs with trials >= this
    #[arg(long)]
    min_trials: Option<f64>,

    /// Keep runs with trials <= this
    #[arg(long)]
    max_trials: Option<f64>,

    /// Filter to specific sides
    #[arg(long)]
    sides: Option<u32>,

    /// Filter to specific payout
    #[arg(long)]
    payout: Option<f64>,

    /// Use logarithmic x-axis for trials
    #[arg(long)]
    log_x: bool,

    /// Hide legend
    #[arg(long)]
    no_legend: bool,

    /// Chart file (.svg or .png)
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    out: Option<PathBuf>,

    /// YAML file with default settings
    #[arg(long, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Also write the plotted series as JSON
    #[arg(long, value_hint = ValueHint::FilePath)]
    emit_json: Option<PathBuf>,
}

/// Config file values with command-line overrides applied.
#[derive(Debug, Clone, PartialEq)]
struct Settings {
    filters: FilterSpec,
    options: ChartOptions,
    out: PathBuf,
    size: (u32, u32),
}

impl Settings {
    fn resolve(args: &Args, config: PlotConfig) -> Self {
        let mut filters = config.filters;
        filters.min_trials = args.min_trials.or(filters.min_trials);
        filters.max_trials = args.max_trials.or(filters.max_trials);
        filters.sides = args.sides.or(filters.sides);
        filters.payout = args.payout.or(filters.payout);

        let mut options = config.chart_options();
        options.log_x |= args.log_x;
        options.show_legend &= !args.no_legend;

        Self {
            filters,
            options,
            out: args.out.clone().unwrap_or(config.out),
            size: (config.width, config.height),
        }
    }
}

async fn load_runs(db: &Path) -> Result<Vec<RawRunRecord>> {
    let pool = persistence::open_read_only(db).await?;
    let runs = persistence::fetch_dice_runs(&pool).await;
    pool.close().await;
    Ok(runs?)
}

const NO_RECORDS: &str = "No dice rows in DB. Run the simulator with --db first.";
const NONE_SURVIVED: &str = "No rows left after filters.";

fn counts_line(report: &FilterReport) -> String {
    format!(
        "Rows before filters: {}, after filters: {}",
        report.before, report.after
    )
}

/// Lines printed to stdout for a pipeline outcome, in order.
fn diagnostics(outcome: &PipelineOutcome) -> Vec<String> {
    match outcome {
        PipelineOutcome::NoRecords => vec![NO_RECORDS.to_string()],
        PipelineOutcome::NoneSurvived(report) => {
            vec![counts_line(report), NONE_SURVIVED.to_string()]
        }
        PipelineOutcome::Ready(dataset) => vec![counts_line(&dataset.report)],
    }
}

fn write_json(path: &Path, dataset: &Dataset) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), dataset)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => PlotConfig::load(path)?,
        None => PlotConfig::default(),
    };
    let settings = Settings::resolve(&args, config);
    settings.filters.validate()?;
    info!(db = %args.db.display(), filters = ?settings.filters, "starting plot-ev");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("starting runtime")?;
    let raw = runtime
        .block_on(load_runs(&args.db))
        .with_context(|| format!("loading runs from {}", args.db.display()))?;

    let outcome = prepare(raw, &settings.filters);
    for line in diagnostics(&outcome) {
        println!("{line}");
    }
    let PipelineOutcome::Ready(dataset) = outcome else {
        return Ok(());
    };

    if let Some(path) = &args.emit_json {
        write_json(path, &dataset)?;
    }
    let mut renderer = PlotRenderer::new(&settings.out).with_size(settings.size.0, settings.size.1);
    render(&dataset, &settings.options, &mut renderer)
        .with_context(|| format!("rendering {}", settings.out.display()))?;
    println!("Chart written to {}", settings.out.display());
    Ok(())
}
