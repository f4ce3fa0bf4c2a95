//! Data handed to the chart renderer.

use crate::aggregate::Series;
use serde::{Deserialize, Serialize};

pub const DEFAULT_TITLE: &str = "Dice: EV per run by seed";
pub const X_AXIS_LABEL: &str = "Number of Trials";
pub const Y_AXIS_LABEL: &str = "EV per play";
pub const LEGEND_TITLE: &str = "Seed";
/// EV of a fair game; drawn as a horizontal reference line.
pub const REFERENCE_EV: f64 = 0.0;

/// Presentation switches chosen by the caller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChartOptions {
    pub title: String,
    /// Logarithmic trials axis.
    pub log_x: bool,
    pub show_legend: bool,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            log_x: false,
            show_legend: true,
        }
    }
}

/// Everything a renderer needs for one chart. Series are non-empty, ordered
/// by seed, and each one is strictly increasing in trials.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct ChartRequest<'a> {
    pub title: &'a str,
    pub x_label: &'static str,
    pub y_label: &'static str,
    pub legend_title: &'static str,
    pub reference_ev: f64,
    pub log_x: bool,
    pub show_legend: bool,
    pub series: &'a [Series],
}

impl<'a> ChartRequest<'a> {
    pub fn new(options: &'a ChartOptions, series: &'a [Series]) -> Self {
        Self {
            title: &options.title,
            x_label: X_AXIS_LABEL,
            y_label: Y_AXIS_LABEL,
            legend_title: LEGEND_TITLE,
            reference_ev: REFERENCE_EV,
            log_x: options.log_x,
            show_legend: options.show_legend,
            series,
        }
    }
}

/// Rendering collaborator.
pub trait ChartSink {
    type Error;

    fn render(&mut self, request: &ChartRequest<'_>) -> Result<(), Self::Error>;
}
