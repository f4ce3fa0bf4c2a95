#![deny(warnings)]

//! Seeded dice simulator.
//!
//! Bets one face of an N-sided die over a batch of trials and summarizes the
//! batch the way runs are recorded in the `games` table:
//! - hits and hit rate for the chosen face
//! - expected value per play (profit `+payout` on a hit, `-1` otherwise)
//! - a `key=value` parameter string identifying the configuration and seed

use ev_core::{RawCell, RawRunRecord, RunId};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Errors produced by simulator configuration.
#[derive(Debug, Error, PartialEq)]
pub enum SimError {
    /// A die needs at least two faces.
    #[error("sides must be >= 2, got {0}")]
    TooFewSides(u32),
    /// The bet must name an existing face.
    #[error("bet_on must be within 1..={sides}, got {bet_on}")]
    BetOutOfRange { sides: u32, bet_on: u32 },
    /// Payout must be finite and non-negative.
    #[error("invalid payout {0}")]
    InvalidPayout(f64),
    /// A run needs at least one trial.
    #[error("trials must be > 0")]
    NoTrials,
}

/// Bet configuration.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiceGame {
    /// Number of faces.
    pub sides: u32,
    /// Face being bet on.
    pub bet_on: u32,
    /// Profit on a hit; a miss loses one unit.
    pub payout: f64,
}

impl Default for DiceGame {
    fn default() -> Self {
        Self {
            sides: 6,
            bet_on: 6,
            payout: 5.0,
        }
    }
}

impl DiceGame {
    /// Game paying `sides - 1`, whose expected value is zero.
    pub fn fair(sides: u32) -> Self {
        Self {
            sides,
            bet_on: sides,
            payout: f64::from(sides.saturating_sub(1)),
        }
    }

    pub fn validate(&self) -> Result<(), SimError> {
        if self.sides < 2 {
            return Err(SimError::TooFewSides(self.sides));
        }
        if !(1..=self.sides).contains(&self.bet_on) {
            return Err(SimError::BetOutOfRange {
                sides: self.sides,
                bet_on: self.bet_on,
            });
        }
        if !self.payout.is_finite() || self.payout < 0.0 {
            return Err(SimError::InvalidPayout(self.payout));
        }
        Ok(())
    }

    /// Roll once.
    pub fn play<R: Rng + ?Sized>(&self, rng: &mut R) -> Roll {
        let face = rng.gen_range(1..=self.sides);
        let profit = if face == self.bet_on { self.payout } else { -1.0 };
        Roll { face, profit }
    }

    /// Parameter string in the stored form, e.g. `sides=6,bet_on=6,payout=5,seed=42`.
    pub fn params_json(&self, seed: u64) -> String {
        format!(
            "sides={},bet_on={},payout={},seed={}",
            self.sides, self.bet_on, self.payout, seed
        )
    }
}

/// Outcome of a single roll.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Roll {
    pub face: u32,
    pub profit: f64,
}

/// Summary of one batch of trials.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub trials: u32,
    pub hits: u32,
    pub hit_rate: f64,
    pub ev: f64,
}

impl RunSummary {
    /// In-memory store row for this run.
    pub fn into_raw(self, id: i64, game: &DiceGame, seed: u64) -> RawRunRecord {
        RawRunRecord {
            id: RunId(id),
            created_at: RawCell::Null,
            trials: RawCell::Integer(i64::from(self.trials)),
            hits: RawCell::Integer(i64::from(self.hits)),
            hit_rate: RawCell::Real(self.hit_rate),
            ev: RawCell::Real(self.ev),
            params_json: Some(game.params_json(seed)),
        }
    }
}

/// Run `trials` plays with a RNG seeded from `seed`. Same inputs, same summary.
pub fn simulate(game: &DiceGame, trials: u32, seed: u64) -> Result<RunSummary, SimError> {
    game.validate()?;
    if trials == 0 {
        return Err(SimError::NoTrials);
    }
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut hits = 0u32;
    let mut profit = 0.0f64;
    for _ in 0..trials {
        let roll = game.play(&mut rng);
        if roll.face == game.bet_on {
            hits += 1;
        }
        profit += roll.profit;
    }
    let n = f64::from(trials);
    Ok(RunSummary {
        trials,
        hits,
        hit_rate: f64::from(hits) / n,
        ev: profit / n,
    })
}

/// One run per `(seed, trials)` pair, seeds outermost, ids assigned from 1.
pub fn sweep(
    game: &DiceGame,
    seeds: &[u64],
    trial_counts: &[u32],
) -> Result<Vec<RawRunRecord>, SimError> {
    let mut rows = Vec::with_capacity(seeds.len() * trial_counts.len());
    for &seed in seeds {
        for &trials in trial_counts {
            let summary = simulate(game, trials, seed)?;
            let id = rows.len() as i64 + 1;
            rows.push(summary.into_raw(id, game, seed));
        }
    }
    debug!(runs = rows.len(), "simulated sweep");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ev_core::{DiceParams, RunRecord};
    use proptest::prelude::*;

    #[test]
    fn fair_game_ev_near_zero() {
        let s = simulate(&DiceGame::default(), 120_000, 7).unwrap();
        assert!(s.ev.abs() < 0.05, "ev = {}", s.ev);
        assert!((s.hit_rate - 1.0 / 6.0).abs() < 0.01);
    }

    #[test]
    fn seeded_runs_repeat() {
        let g = DiceGame::default();
        assert_eq!(simulate(&g, 1000, 42).unwrap(), simulate(&g, 1000, 42).unwrap());
    }

    #[test]
    fn validation() {
        assert_eq!(
            DiceGame { sides: 1, bet_on: 1, payout: 0.0 }.validate(),
            Err(SimError::TooFewSides(1))
        );
        assert!(matches!(
            DiceGame { sides: 6, bet_on: 7, payout: 5.0 }.validate(),
            Err(SimError::BetOutOfRange { .. })
        ));
        assert!(DiceGame { sides: 6, bet_on: 0, payout: 5.0 }.validate().is_err());
        assert!(DiceGame { sides: 6, bet_on: 1, payout: f64::NAN }.validate().is_err());
        assert_eq!(
            simulate(&DiceGame::default(), 0, 1),
            Err(SimError::NoTrials)
        );
        assert_eq!(DiceGame::fair(20).payout, 19.0);
    }

    #[test]
    fn params_string_parses_back() {
        let g = DiceGame { sides: 8, bet_on: 3, payout: 6.5 };
        assert_eq!(g.params_json(42), "sides=8,bet_on=3,payout=6.5,seed=42");
        assert_eq!(DiceGame::default().params_json(1), "sides=6,bet_on=6,payout=5,seed=1");
        let p = DiceParams::from_params_json(Some(&g.params_json(42)));
        assert_eq!(p.seed, Some(42));
        assert_eq!(p.sides, Some(8));
        assert_eq!(p.payout, Some(6.5));
    }

    #[test]
    fn sweep_produces_plottable_rows() {
        let rows = sweep(&DiceGame::default(), &[1, 2], &[10, 100, 1000]).unwrap();
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0].id, RunId(1));
        assert_eq!(rows[5].id, RunId(6));
        for raw in rows {
            assert!(RunRecord::from_raw(raw).is_plottable());
        }
    }

    proptest! {
        #[test]
        fn rolls_stay_on_the_die(sides in 2u32..100, seed in any::<u64>()) {
            let g = DiceGame::fair(sides);
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            for _ in 0..50 {
                let r = g.play(&mut rng);
                prop_assert!((1..=sides).contains(&r.face));
                prop_assert!(r.profit == -1.0 || r.profit == g.payout);
            }
        }

        #[test]
        fn hit_rate_is_a_fraction(trials in 1u32..2000, seed in any::<u64>()) {
            let s = simulate(&DiceGame::default(), trials, seed).unwrap();
            prop_assert!(s.hits <= s.trials);
            prop_assert!((0.0..=1.0).contains(&s.hit_rate));
            prop_assert!(s.ev >= -1.0 && s.ev <= 5.0);
        }
    }
}
