use rand::rngs::StdRng;

use super::{RegimeClassifier, RegimeLabel, flat_fallback};
use crate::config::RegimeOptions;
use crate::series::{percentile, sorted};

/// Labels prices by position relative to two percentile cut points of the
/// sorted series: at or below the low cut is Low, at or above the high cut is
/// High.
#[derive(Debug, Clone, Copy)]
pub struct QuantileClassifier {
    pub low_percentile: f64,
    pub high_percentile: f64,
}

impl QuantileClassifier {
    pub fn new(low_percentile: f64, high_percentile: f64) -> Self {
        Self {
            low_percentile,
            high_percentile,
        }
    }

    pub fn from_options(options: &RegimeOptions) -> Self {
        Self::new(options.low_percentile, options.high_percentile)
    }

    /// Returns the `(low, high)` price cut points for `prices`.
    pub fn thresholds(&self, prices: &[f64]) -> (f64, f64) {
        let sorted = sorted(prices);
        (
            percentile(&sorted, self.low_percentile),
            percentile(&sorted, self.high_percentile),
        )
    }
}

impl Default for QuantileClassifier {
    fn default() -> Self {
        Self::new(33.0, 67.0)
    }
}

impl RegimeClassifier for QuantileClassifier {
    fn classify(&self, prices: &[f64], _rng: &mut StdRng) -> Vec<RegimeLabel> {
        if let Some(labels) = flat_fallback(prices) {
            return labels;
        }
        let (low, high) = self.thresholds(prices);
        prices
            .iter()
            .map(|&p| {
                if p <= low {
                    RegimeLabel::Low
                } else if p >= high {
                    RegimeLabel::High
                } else {
                    RegimeLabel::Medium
                }
            })
            .collect()
    }

    fn name(&self) -> &'static str {
        "quantile"
    }
}
