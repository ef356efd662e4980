use rand::rngs::StdRng;

use super::{RegimeClassifier, RegimeLabel, flat_fallback};
use crate::config::RegimeOptions;
use crate::series;

/// Global z-score against fixed low/high cutoffs.
#[derive(Debug, Clone, Copy)]
pub struct ZScoreClassifier {
    pub z_low: f64,
    pub z_high: f64,
}

impl ZScoreClassifier {
    pub fn from_options(options: &RegimeOptions) -> Self {
        Self {
            z_low: options.z_low,
            z_high: options.z_high,
        }
    }
}

impl Default for ZScoreClassifier {
    fn default() -> Self {
        Self {
            z_low: -0.5,
            z_high: 0.5,
        }
    }
}

impl RegimeClassifier for ZScoreClassifier {
    fn classify(&self, prices: &[f64], _rng: &mut StdRng) -> Vec<RegimeLabel> {
        if let Some(labels) = flat_fallback(prices) {
            return labels;
        }
        let mean = series::mean(prices);
        let std = series::std_dev(prices);
        prices
            .iter()
            .map(|p| RegimeLabel::from_band((p - mean) / std, self.z_low, self.z_high))
            .collect()
    }

    fn name(&self) -> &'static str {
        "zscore"
    }
}
