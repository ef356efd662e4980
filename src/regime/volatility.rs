use rand::rngs::StdRng;

use super::{RegimeClassifier, RegimeLabel, flat_fallback, window_stats};
use crate::config::RegimeOptions;
use crate::series;

/// Switches the reference level per observation: where the rolling standard
/// deviation exceeds `threshold` times the global one, prices are scored
/// against the local mean and std; elsewhere against the global ones.
///
/// Calm stretches therefore keep a stable regime while volatile stretches
/// follow the local level.
#[derive(Debug, Clone, Copy)]
pub struct VolatilityAdaptiveClassifier {
    pub window: usize,
    pub threshold: f64,
    pub z_low: f64,
    pub z_high: f64,
}

impl VolatilityAdaptiveClassifier {
    pub fn from_options(options: &RegimeOptions) -> Self {
        Self {
            window: options.window,
            threshold: options.volatility_threshold,
            z_low: options.z_low,
            z_high: options.z_high,
        }
    }
}

impl Default for VolatilityAdaptiveClassifier {
    fn default() -> Self {
        Self::from_options(&RegimeOptions::default())
    }
}

impl RegimeClassifier for VolatilityAdaptiveClassifier {
    fn classify(&self, prices: &[f64], _rng: &mut StdRng) -> Vec<RegimeLabel> {
        if let Some(labels) = flat_fallback(prices) {
            return labels;
        }
        let global_mean = series::mean(prices);
        let global_std = series::std_dev(prices);

        (0..prices.len())
            .map(|i| {
                let (local_mean, local_std) = window_stats(prices, i, self.window);
                let (mean, std) = if local_std / global_std > self.threshold {
                    (local_mean, local_std)
                } else {
                    (global_mean, global_std)
                };
                RegimeLabel::from_band((prices[i] - mean) / std, self.z_low, self.z_high)
            })
            .collect()
    }

    fn name(&self) -> &'static str {
        "volatility_adaptive"
    }
}
