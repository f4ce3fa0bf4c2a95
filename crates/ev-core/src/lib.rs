#![deny(warnings)]

//! Core data model for dice simulation runs.
//!
//! Run records arrive from the store with dynamically typed cells. This crate
//! turns them into typed records where every measurement is explicitly
//! present or absent, and extracts the game parameters encoded in the
//! free-form `params_json` column.

pub mod params;

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use params::{ParamError, ParamString, ParamToken};

/// Store-assigned identifier of a run. Only used for ordering and ties.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RunId(pub i64);

/// A cell as read from the store, tagged with its storage class.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum RawCell {
    #[default]
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

/// One `games` row before coercion.
#[derive(Clone, Debug, PartialEq)]
pub struct RawRunRecord {
    pub id: RunId,
    pub created_at: RawCell,
    pub trials: RawCell,
    pub hits: RawCell,
    pub hit_rate: RawCell,
    pub ev: RawCell,
    pub params_json: Option<String>,
}

impl RawRunRecord {
    /// Record with every measurement cell null.
    pub fn empty(id: i64) -> Self {
        Self {
            id: RunId(id),
            created_at: RawCell::Null,
            trials: RawCell::Null,
            hits: RawCell::Null,
            hit_rate: RawCell::Null,
            ev: RawCell::Null,
            params_json: None,
        }
    }
}

/// Game parameters recovered from `params_json`. Each field is independent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DiceParams {
    pub seed: Option<u64>,
    pub sides: Option<u32>,
    pub payout: Option<f64>,
}

impl DiceParams {
    pub fn from_params_json(source: Option<&str>) -> Self {
        let Some(source) = source else {
            return Self::default();
        };
        let params = ParamString::parse(source);
        Self {
            seed: params.u64("seed"),
            sides: params.u32("sides"),
            payout: params.decimal("payout"),
        }
    }
}

/// A run with numeric columns coerced and parameters parsed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: RunId,
    /// Passed through; unparsable timestamps become `None`.
    pub created_at: Option<NaiveDateTime>,
    pub trials: Option<f64>,
    pub hits: Option<f64>,
    pub hit_rate: Option<f64>,
    pub ev: Option<f64>,
    pub params_json: Option<String>,
    pub params: DiceParams,
}

impl RunRecord {
    /// Coerce every column. Never fails; bad cells become `None`.
    pub fn from_raw(raw: RawRunRecord) -> Self {
        let params = DiceParams::from_params_json(raw.params_json.as_deref());
        Self {
            id: raw.id,
            created_at: coerce_timestamp(&raw.created_at),
            trials: coerce_numeric(&raw.trials),
            hits: coerce_numeric(&raw.hits),
            hit_rate: coerce_numeric(&raw.hit_rate),
            ev: coerce_numeric(&raw.ev),
            params_json: raw.params_json,
            params,
        }
    }

    pub fn seed(&self) -> Option<u64> {
        self.params.seed
    }

    /// True when the fields needed for plotting are all present.
    pub fn is_plottable(&self) -> bool {
        self.trials.is_some() && self.ev.is_some() && self.params.seed.is_some()
    }
}

/// Numeric view of a cell. Text is trimmed and parsed; non-finite values,
/// blobs and nulls are absent.
pub fn coerce_numeric(cell: &RawCell) -> Option<f64> {
    let value = match cell {
        RawCell::Integer(v) => *v as f64,
        RawCell::Real(v) => *v,
        RawCell::Text(s) => s.trim().parse::<f64>().ok()?,
        RawCell::Null | RawCell::Blob(_) => return None,
    };
    value.is_finite().then_some(value)
}

const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// SQLite `CURRENT_TIMESTAMP` text, or integer unix seconds.
pub fn coerce_timestamp(cell: &RawCell) -> Option<NaiveDateTime> {
    match cell {
        RawCell::Text(s) => {
            let s = s.trim();
            TIMESTAMP_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        }
        RawCell::Integer(secs) => DateTime::from_timestamp(*secs, 0).map(|d| d.naive_utc()),
        _ => None,
    }
}

/// Coerce a whole batch, preserving order.
pub fn coerce_all(raw: Vec<RawRunRecord>) -> Vec<RunRecord> {
    let records: Vec<RunRecord> = raw.into_iter().map(RunRecord::from_raw).collect();
    let missing_trials = records.iter().filter(|r| r.trials.is_none()).count();
    let missing_ev = records.iter().filter(|r| r.ev.is_none()).count();
    let missing_seed = records.iter().filter(|r| r.params.seed.is_none()).count();
    debug!(
        rows = records.len(),
        missing_trials, missing_ev, missing_seed, "coerced run records"
    );
    records
}
