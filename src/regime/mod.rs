//! Price regime classification.
//!
//! Every strategy maps a price vector to one [`RegimeLabel`] per observation
//! and never fails on non-empty finite input. Flat series classify as all
//! Medium; series shorter than a strategy's window fall back to global
//! statistics.

/// K-means (k = 3) with k-means++ seeding.
pub mod kmeans;
/// Fixed percentile cut points.
pub mod quantile;
/// Rolling mean ± sensitivity · std band.
pub mod rolling;
/// Local versus global reference switched by volatility.
pub mod volatility;
/// Global z-score cutoffs.
pub mod zscore;

use std::fmt;
use std::str::FromStr;

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::RegimeOptions;
use crate::series::{self, is_flat};

pub use kmeans::KMeansClassifier;
pub use quantile::QuantileClassifier;
pub use rolling::RollingThresholdClassifier;
pub use volatility::VolatilityAdaptiveClassifier;
pub use zscore::ZScoreClassifier;

/// Number of latent regimes.
pub const N_REGIMES: usize = 3;

/// Latent market regime of a single price observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum RegimeLabel {
    Low = 0,
    Medium = 1,
    High = 2,
}

impl RegimeLabel {
    pub const ALL: [RegimeLabel; N_REGIMES] = [Self::Low, Self::Medium, Self::High];

    /// Row/column index in the 3×3 HMM matrices.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(idx: usize) -> Option<Self> {
        Self::ALL.get(idx).copied()
    }

    /// Labels a standardized deviation against a `[low, high]` band.
    pub(crate) fn from_band(value: f64, low: f64, high: f64) -> Self {
        if value < low {
            Self::Low
        } else if value > high {
            Self::High
        } else {
            Self::Medium
        }
    }
}

impl fmt::Display for RegimeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        };
        f.write_str(s)
    }
}

/// Selectable classification strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationMethod {
    #[default]
    Quantile,
    #[serde(rename = "kmeans")]
    KMeans,
    VolatilityAdaptive,
    RollingThreshold,
    #[serde(rename = "zscore")]
    ZScore,
}

impl ClassificationMethod {
    pub const ALL: [ClassificationMethod; 5] = [
        Self::Quantile,
        Self::KMeans,
        Self::VolatilityAdaptive,
        Self::RollingThreshold,
        Self::ZScore,
    ];

    /// Builds the strategy implementing this method.
    pub fn classifier(self, options: &RegimeOptions) -> Box<dyn RegimeClassifier> {
        match self {
            Self::Quantile => Box::new(QuantileClassifier::from_options(options)),
            Self::KMeans => Box::new(KMeansClassifier::from_options(options)),
            Self::VolatilityAdaptive => {
                Box::new(VolatilityAdaptiveClassifier::from_options(options))
            }
            Self::RollingThreshold => Box::new(RollingThresholdClassifier::from_options(options)),
            Self::ZScore => Box::new(ZScoreClassifier::from_options(options)),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Quantile => "quantile",
            Self::KMeans => "kmeans",
            Self::VolatilityAdaptive => "volatility_adaptive",
            Self::RollingThreshold => "rolling_threshold",
            Self::ZScore => "zscore",
        }
    }
}

impl fmt::Display for ClassificationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClassificationMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = Self::ALL.iter().map(|m| m.as_str()).collect();
                format!(
                    "unknown classification method \"{s}\", available: {}",
                    names.join(", ")
                )
            })
    }
}

/// A regime classification strategy.
pub trait RegimeClassifier {
    /// Labels every price. Output length always equals input length.
    ///
    /// Strategies that need randomness draw from `rng` so a single seed
    /// reproduces the whole run.
    fn classify(&self, prices: &[f64], rng: &mut StdRng) -> Vec<RegimeLabel>;

    /// Strategy name for logging.
    fn name(&self) -> &'static str;
}

/// Classifies `prices` with the method and options in `options`.
pub fn classify(prices: &[f64], options: &RegimeOptions, rng: &mut StdRng) -> Vec<RegimeLabel> {
    let classifier = options.method.classifier(options);
    let labels = classifier.classify(prices, rng);
    debug!(classifier = classifier.name(), observations = labels.len(), "classified prices");
    labels
}

/// Per-regime observation counts, indexed by [`RegimeLabel::index`].
pub fn regime_counts(labels: &[RegimeLabel]) -> [usize; N_REGIMES] {
    let mut counts = [0; N_REGIMES];
    for label in labels {
        counts[label.index()] += 1;
    }
    counts
}

/// Shared degenerate-input guard: flat (or empty) series are all Medium.
pub(crate) fn flat_fallback(prices: &[f64]) -> Option<Vec<RegimeLabel>> {
    if prices.is_empty() || is_flat(prices) {
        Some(vec![RegimeLabel::Medium; prices.len()])
    } else {
        None
    }
}

/// Mean and standard deviation of the trailing window ending at `i`.
///
/// Leading positions without a full history borrow the first full window;
/// a series shorter than `window` uses global statistics everywhere.
pub(crate) fn window_stats(prices: &[f64], i: usize, window: usize) -> (f64, f64) {
    let n = prices.len();
    if window == 0 || n <= window {
        return (series::mean(prices), series::std_dev(prices));
    }
    let end = (i + 1).max(window);
    let slice = &prices[end - window..end];
    (series::mean(slice), series::std_dev(slice))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn label_indices_are_ordered() {
        assert_eq!(RegimeLabel::Low.index(), 0);
        assert_eq!(RegimeLabel::Medium.index(), 1);
        assert_eq!(RegimeLabel::High.index(), 2);
        assert!(RegimeLabel::Low < RegimeLabel::High);
        assert_eq!(RegimeLabel::from_index(3), None);
    }

    #[test]
    fn method_names_round_trip() {
        for method in ClassificationMethod::ALL {
            assert_eq!(method.as_str().parse::<ClassificationMethod>(), Ok(method));
        }
        assert!("bogus".parse::<ClassificationMethod>().is_err());
    }

    #[test]
    fn every_method_preserves_length_on_degenerate_input() {
        let mut rng = StdRng::seed_from_u64(1);
        let inputs: [&[f64]; 4] = [&[42.0], &[7.0; 30], &[1.0, 2.0], &[3.0, 1.0, 2.0]];
        for method in ClassificationMethod::ALL {
            let options = RegimeOptions::for_method(method);
            for input in inputs {
                let labels = classify(input, &options, &mut rng);
                assert_eq!(labels.len(), input.len(), "{method} on {input:?}");
            }
        }
    }

    #[test]
    fn every_method_labels_flat_series_medium() {
        let mut rng = StdRng::seed_from_u64(1);
        let flat = vec![100.0; 24];
        for method in ClassificationMethod::ALL {
            let labels = classify(&flat, &RegimeOptions::for_method(method), &mut rng);
            assert!(
                labels.iter().all(|l| *l == RegimeLabel::Medium),
                "{method} should label a flat series Medium"
            );
        }
    }

    #[test]
    fn every_method_separates_obvious_extremes() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut prices = vec![10.0; 8];
        prices.extend(vec![50.0; 8]);
        prices.extend(vec![90.0; 8]);
        for method in ClassificationMethod::ALL {
            let labels = classify(&prices, &RegimeOptions::for_method(method), &mut rng);
            assert_eq!(labels[0], RegimeLabel::Low, "{method}");
            assert_eq!(labels[23], RegimeLabel::High, "{method}");
        }
    }

    #[test]
    fn window_stats_falls_back_to_global_for_short_series() {
        let prices = [1.0, 2.0, 3.0];
        let (m, _) = window_stats(&prices, 0, 24);
        assert_eq!(m, 2.0);
    }

    #[test]
    fn window_stats_borrows_first_full_window() {
        let prices = [1.0, 3.0, 5.0, 7.0, 9.0];
        assert_eq!(window_stats(&prices, 0, 2).0, 2.0);
        assert_eq!(window_stats(&prices, 1, 2).0, 2.0);
        assert_eq!(window_stats(&prices, 4, 2).0, 8.0);
    }

    #[test]
    fn counts_per_regime() {
        let labels = [RegimeLabel::Low, RegimeLabel::Low, RegimeLabel::High];
        assert_eq!(regime_counts(&labels), [2, 0, 1]);
    }
}
