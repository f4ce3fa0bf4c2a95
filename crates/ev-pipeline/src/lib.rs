#![deny(warnings)]

//! Extraction-to-chart pipeline for dice runs.
//!
//! Raw store rows flow strictly forward: coercion, filtering, per-seed
//! aggregation, and finally a [`ChartSink`]. An empty dataset at any stage
//! ends the pipeline before the sink is touched.

pub mod aggregate;
pub mod chart;
pub mod filter;

use ev_core::{coerce_all, RawRunRecord};
use serde::Serialize;
use tracing::info;

pub use aggregate::{aggregate, Point, Series};
pub use chart::{
    ChartOptions, ChartRequest, ChartSink, DEFAULT_TITLE, LEGEND_TITLE, REFERENCE_EV,
    X_AXIS_LABEL, Y_AXIS_LABEL,
};
pub use filter::{
    apply_filters, FilterError, FilterReport, FilterSpec, FilterStage, Filtered, StageCount,
};

/// Filtered, grouped data ready to plot.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Dataset {
    pub report: FilterReport,
    pub series: Vec<Series>,
}

/// How far the pipeline got.
#[derive(Clone, Debug, PartialEq)]
pub enum PipelineOutcome {
    /// The store returned no rows at all.
    NoRecords,
    /// Rows existed but none survived filtering.
    NoneSurvived(FilterReport),
    /// Series were produced (and rendered, when a sink was given).
    Ready(Dataset),
}

impl PipelineOutcome {
    pub fn report(&self) -> Option<&FilterReport> {
        match self {
            Self::NoRecords => None,
            Self::NoneSurvived(report) => Some(report),
            Self::Ready(dataset) => Some(&dataset.report),
        }
    }
}

/// Coerce, filter and group without rendering.
pub fn prepare(raw: Vec<RawRunRecord>, spec: &FilterSpec) -> PipelineOutcome {
    if raw.is_empty() {
        info!("no run records");
        return PipelineOutcome::NoRecords;
    }
    let records = coerce_all(raw);
    let Filtered { rows, report } = apply_filters(records, spec);
    info!(before = report.before, after = report.after, "filtered runs");
    if rows.is_empty() {
        return PipelineOutcome::NoneSurvived(report);
    }
    let series = aggregate(&rows);
    info!(series = series.len(), "grouped runs by seed");
    PipelineOutcome::Ready(Dataset { report, series })
}

/// Hand a prepared dataset to the renderer.
pub fn render<S: ChartSink>(
    dataset: &Dataset,
    options: &ChartOptions,
    sink: &mut S,
) -> Result<(), S::Error> {
    sink.render(&ChartRequest::new(options, &dataset.series))
}

/// [`prepare`] then [`render`]; the sink only runs for a non-empty dataset.
pub fn run_pipeline<S: ChartSink>(
    raw: Vec<RawRunRecord>,
    spec: &FilterSpec,
    options: &ChartOptions,
    sink: &mut S,
) -> Result<PipelineOutcome, S::Error> {
    let outcome = prepare(raw, spec);
    if let PipelineOutcome::Ready(dataset) = &outcome {
        render(dataset, options, sink)?;
    }
    Ok(outcome)
}
