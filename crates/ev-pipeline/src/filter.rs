//! Range and equality filters over coerced run records.

use ev_core::RunRecord;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Optional predicates; `None` means the filter does not run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    /// Keep `trials >= min_trials`.
    pub min_trials: Option<f64>,
    /// Keep `trials <= max_trials`.
    pub max_trials: Option<f64>,
    /// Keep rows whose parsed `sides` equals this.
    pub sides: Option<u32>,
    /// Keep rows whose parsed `payout` equals this.
    pub payout: Option<f64>,
}

/// Rejected filter settings.
#[derive(Debug, Error, PartialEq)]
pub enum FilterError {
    #[error("{name} must be finite, got {value}")]
    NonFinite { name: &'static str, value: f64 },
    #[error("min_trials ({min}) is greater than max_trials ({max})")]
    InvertedRange { min: f64, max: f64 },
}

impl FilterSpec {
    pub fn validate(&self) -> Result<(), FilterError> {
        for (name, value) in [
            ("min_trials", self.min_trials),
            ("max_trials", self.max_trials),
            ("payout", self.payout),
        ] {
            if let Some(value) = value {
                if !value.is_finite() {
                    return Err(FilterError::NonFinite { name, value });
                }
            }
        }
        if let (Some(min), Some(max)) = (self.min_trials, self.max_trials) {
            if min > max {
                return Err(FilterError::InvertedRange { min, max });
            }
        }
        Ok(())
    }
}

/// Filter steps in the order they run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterStage {
    MinTrials,
    MaxTrials,
    Sides,
    Payout,
    /// Drop rows missing `trials`, `ev` or `seed`. Always runs.
    Complete,
}

/// Rows remaining after a stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageCount {
    pub stage: FilterStage,
    pub rows: usize,
}

/// Row accounting for one filter pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterReport {
    pub before: usize,
    pub after: usize,
    pub stages: Vec<StageCount>,
}

/// Surviving rows in their input order, plus the accounting.
#[derive(Clone, Debug, PartialEq)]
pub struct Filtered {
    pub rows: Vec<RunRecord>,
    pub report: FilterReport,
}

impl Filtered {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Apply the configured filters, then drop incomplete rows.
pub fn apply_filters(mut rows: Vec<RunRecord>, spec: &FilterSpec) -> Filtered {
    let before = rows.len();
    let mut stages = Vec::with_capacity(5);
    let mut record = |stage: FilterStage, rows: &[RunRecord]| {
        debug!(?stage, rows = rows.len(), "filter stage");
        stages.push(StageCount {
            stage,
            rows: rows.len(),
        });
    };

    if let Some(min) = spec.min_trials {
        rows.retain(|r| r.trials.is_some_and(|t| t >= min));
        record(FilterStage::MinTrials, &rows);
    }
    if let Some(max) = spec.max_trials {
        rows.retain(|r| r.trials.is_some_and(|t| t <= max));
        record(FilterStage::MaxTrials, &rows);
    }
    if let Some(sides) = spec.sides {
        rows.retain(|r| r.params.sides == Some(sides));
        record(FilterStage::Sides, &rows);
    }
    if let Some(payout) = spec.payout {
        rows.retain(|r| r.params.payout == Some(payout));
        record(FilterStage::Payout, &rows);
    }
    rows.retain(RunRecord::is_plottable);
    record(FilterStage::Complete, &rows);

    let after = rows.len();
    Filtered {
        rows,
        report: FilterReport {
            before,
            after,
            stages,
        },
    }
}
