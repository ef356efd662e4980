use rand::rngs::StdRng;

use super::{RegimeClassifier, RegimeLabel, flat_fallback, window_stats};
use crate::config::RegimeOptions;

/// Rolling adaptive threshold: Low below `mean - band`, High above
/// `mean + band`, where `band = sensitivity * std` of the trailing window,
/// widened to at least `min_band_fraction * |mean|`.
#[derive(Debug, Clone, Copy)]
pub struct RollingThresholdClassifier {
    pub window: usize,
    pub sensitivity: f64,
    pub min_band_fraction: f64,
}

impl RollingThresholdClassifier {
    pub fn from_options(options: &RegimeOptions) -> Self {
        Self {
            window: options.window,
            sensitivity: options.sensitivity,
            min_band_fraction: options.min_band_fraction,
        }
    }

    fn band(&self, mean: f64, std: f64) -> f64 {
        (self.sensitivity * std).max(self.min_band_fraction * mean.abs())
    }
}

impl Default for RollingThresholdClassifier {
    fn default() -> Self {
        Self::from_options(&RegimeOptions::default())
    }
}

impl RegimeClassifier for RollingThresholdClassifier {
    fn classify(&self, prices: &[f64], _rng: &mut StdRng) -> Vec<RegimeLabel> {
        if let Some(labels) = flat_fallback(prices) {
            return labels;
        }
        (0..prices.len())
            .map(|i| {
                let (mean, std) = window_stats(prices, i, self.window);
                let band = self.band(mean, std);
                let p = prices[i];
                if p < mean - band {
                    RegimeLabel::Low
                } else if p > mean + band {
                    RegimeLabel::High
                } else {
                    RegimeLabel::Medium
                }
            })
            .collect()
    }

    fn name(&self) -> &'static str {
        "rolling_threshold"
    }
}
