//! Per-seed series construction.

use ev_core::{RunId, RunRecord};
use serde::{Deserialize, Serialize};

/// One plotted point.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub trials: f64,
    pub ev: f64,
}

/// EV-vs-trials points for one seed, strictly increasing in `trials`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub seed: u64,
    pub points: Vec<Point>,
}

impl Series {
    /// Display name: the seed value.
    pub fn label(&self) -> String {
        self.seed.to_string()
    }

    pub fn is_single_point(&self) -> bool {
        self.points.len() == 1
    }
}

/// Group rows by seed.
///
/// Rows are stably sorted by `(seed, trials, id)` and partitioned in one pass.
/// When several rows share a `trials` value within a seed, the one with the
/// greatest id replaces the earlier ones. Series come out in ascending seed
/// order. Rows missing `seed`, `trials` or `ev` are skipped.
pub fn aggregate(rows: &[RunRecord]) -> Vec<Series> {
    let mut keyed: Vec<(u64, f64, RunId, f64)> = rows
        .iter()
        .filter_map(|r| Some((r.params.seed?, r.trials?, r.id, r.ev?)))
        .collect();
    keyed.sort_by(|a, b| {
        a.0.cmp(&b.0)
            .then(a.1.total_cmp(&b.1))
            .then(a.2.cmp(&b.2))
    });

    let mut series: Vec<Series> = Vec::new();
    for (seed, trials, _, ev) in keyed {
        match series.last_mut() {
            Some(current) if current.seed == seed => match current.points.last_mut() {
                Some(last) if last.trials == trials => last.ev = ev,
                _ => current.points.push(Point { trials, ev }),
            },
            _ => series.push(Series {
                seed,
                points: vec![Point { trials, ev }],
            }),
        }
    }
    series
}
