//! Hidden Markov model over price regimes.
//!
//! The transition matrix is estimated from consecutive regime labels. The
//! emission matrix encodes what a naive trader would do in each regime
//! (charge below 0.8× the mean price, discharge above 1.2×) and serves only
//! as Viterbi's observation likelihood.

pub mod viterbi;

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::config::RegimeOptions;
use crate::regime::{self, N_REGIMES, RegimeLabel};
use crate::schedule::Action;
use crate::series;

pub use viterbi::{DecodedPath, decode, decode_with_initial};

/// Row-stochastic 3×3 matrix.
pub type Matrix3 = [[f64; N_REGIMES]; N_REGIMES];

/// Pseudo-count added to every transition cell.
pub const TRANSITION_SMOOTHING: f64 = 0.1;
/// Pseudo-count added to every emission cell.
pub const EMISSION_SMOOTHING: f64 = 1.0;
/// Price below this fraction of the mean reads as a charge signal.
pub const CHARGE_PRICE_RATIO: f64 = 0.8;
/// Price above this fraction of the mean reads as a discharge signal.
pub const DISCHARGE_PRICE_RATIO: f64 = 1.2;

/// Regime-to-regime transition probabilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionMatrix(pub Matrix3);

impl TransitionMatrix {
    /// Counts `labels[i] -> labels[i + 1]` transitions and normalizes each row
    /// with Laplace smoothing. Rows without any observed outgoing transition
    /// are uniform.
    pub fn from_labels(labels: &[RegimeLabel]) -> Self {
        let mut counts = [[0.0; N_REGIMES]; N_REGIMES];
        for pair in labels.windows(2) {
            counts[pair[0].index()][pair[1].index()] += 1.0;
        }

        let mut matrix = [[0.0; N_REGIMES]; N_REGIMES];
        for (row, count_row) in matrix.iter_mut().zip(&counts) {
            let total: f64 = count_row.iter().sum();
            if total == 0.0 {
                *row = [1.0 / N_REGIMES as f64; N_REGIMES];
                continue;
            }
            let denom = total + TRANSITION_SMOOTHING * N_REGIMES as f64;
            for (cell, count) in row.iter_mut().zip(count_row) {
                *cell = (count + TRANSITION_SMOOTHING) / denom;
            }
        }
        Self(matrix)
    }

    pub fn probability(&self, from: RegimeLabel, to: RegimeLabel) -> f64 {
        self.0[from.index()][to.index()]
    }

    pub fn rows(&self) -> &Matrix3 {
        &self.0
    }
}

/// Regime-to-action likelihoods; columns are ordered charge, idle, discharge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmissionMatrix(pub Matrix3);

impl EmissionMatrix {
    /// Re-derives regime labels for `prices` with the configured classifier
    /// and builds the emission matrix from them.
    pub fn from_prices(prices: &[f64], options: &RegimeOptions, rng: &mut StdRng) -> Self {
        let labels = regime::classify(prices, options, rng);
        Self::from_labels(prices, &labels)
    }

    /// Accumulates per-regime counts of the heuristic action at each
    /// observation, adds one to every cell and normalizes rows.
    pub fn from_labels(prices: &[f64], labels: &[RegimeLabel]) -> Self {
        let mut counts = [[0.0; N_REGIMES]; N_REGIMES];
        for (label, action) in labels.iter().zip(heuristic_actions(prices)) {
            counts[label.index()][action.index()] += 1.0;
        }

        let mut matrix = [[0.0; N_REGIMES]; N_REGIMES];
        for (row, count_row) in matrix.iter_mut().zip(&counts) {
            let total: f64 = count_row.iter().sum();
            let denom = total + EMISSION_SMOOTHING * N_REGIMES as f64;
            for (cell, count) in row.iter_mut().zip(count_row) {
                *cell = (count + EMISSION_SMOOTHING) / denom;
            }
        }
        Self(matrix)
    }

    pub fn probability(&self, regime: RegimeLabel, action: Action) -> f64 {
        self.0[regime.index()][action.index()]
    }

    pub fn rows(&self) -> &Matrix3 {
        &self.0
    }
}

/// The naive trader's action for each price: charge below 0.8× the mean,
/// discharge above 1.2×, idle otherwise.
pub fn heuristic_actions(prices: &[f64]) -> Vec<Action> {
    let mean = series::mean(prices);
    prices
        .iter()
        .map(|&p| heuristic_action(p, mean))
        .collect()
}

pub(crate) fn heuristic_action(price: f64, mean: f64) -> Action {
    if price < CHARGE_PRICE_RATIO * mean {
        Action::Charge
    } else if price > DISCHARGE_PRICE_RATIO * mean {
        Action::Discharge
    } else {
        Action::Idle
    }
}
