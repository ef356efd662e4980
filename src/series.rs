//! Price series container and the summary statistics used across the pipeline.

use serde::{Deserialize, Serialize};

use crate::error::{OptimizeError, Result};

/// Ordered prices, one per timestep, with optional parallel timestamp labels.
///
/// Timestamps are opaque and only carried through for reporting; index order
/// is temporal order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    pub prices: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamps: Option<Vec<String>>,
}

impl PriceSeries {
    /// Creates a series without timestamps.
    pub fn new(prices: Vec<f64>) -> Self {
        Self {
            prices,
            timestamps: None,
        }
    }

    /// Creates a series with a parallel timestamp vector.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the two vectors differ in length.
    pub fn with_timestamps(prices: Vec<f64>, timestamps: Vec<String>) -> Result<Self> {
        if prices.len() != timestamps.len() {
            return Err(OptimizeError::invalid(format!(
                "timestamps length {} does not match prices length {}",
                timestamps.len(),
                prices.len()
            )));
        }
        Ok(Self {
            prices,
            timestamps: Some(timestamps),
        })
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// Checks the series is non-empty, finite, and timestamp-aligned.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.prices.is_empty() {
            return Err(OptimizeError::invalid("price series is empty"));
        }
        if let Some(idx) = self.prices.iter().position(|p| !p.is_finite()) {
            return Err(OptimizeError::invalid(format!(
                "price at index {idx} is not a finite number"
            )));
        }
        self.validate_alignment()
    }

    /// Checks that timestamps, when present, pair up with the prices.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` on a length mismatch.
    pub fn validate_alignment(&self) -> Result<()> {
        match &self.timestamps {
            Some(ts) if ts.len() != self.prices.len() => {
                Err(OptimizeError::invalid(format!(
                    "timestamps length {} does not match prices length {}",
                    ts.len(),
                    self.prices.len()
                )))
            }
            _ => Ok(()),
        }
    }

    /// Splits the series into consecutive periods of at most `period_len`
    /// timesteps. The last period may be shorter. Timestamps are kept only
    /// when they cover the period.
    pub fn periods(&self, period_len: usize) -> Vec<PriceSeries> {
        if period_len == 0 || self.prices.is_empty() {
            return Vec::new();
        }
        self.prices
            .chunks(period_len)
            .enumerate()
            .map(|(i, chunk)| {
                let start = i * period_len;
                PriceSeries {
                    prices: chunk.to_vec(),
                    timestamps: self
                        .timestamps
                        .as_ref()
                        .and_then(|ts| ts.get(start..start + chunk.len()))
                        .map(<[String]>::to_vec),
                }
            })
            .collect()
    }

    /// Arithmetic mean of the prices (0 for an empty series).
    pub fn mean(&self) -> f64 {
        mean(&self.prices)
    }
}

/// Arithmetic mean; 0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation; 0 for fewer than two values.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Nearest-rank percentile on a sorted slice using truncating index
/// `(n - 1) * pct / 100`.
pub fn percentile(sorted: &[f64], pct: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let pct = pct.clamp(0.0, 100.0);
    let idx = ((sorted.len() - 1) as f64 * pct / 100.0) as usize;
    sorted[idx.min(sorted.len() - 1)]
}

/// Returns an ascending copy of `values`.
pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut out = values.to_vec();
    out.sort_by(f64::total_cmp);
    out
}

/// Relative spread below which values are treated as constant.
pub const FLAT_TOLERANCE: f64 = 1e-12;

/// Whether every value is (numerically) the same.
pub fn is_flat(values: &[f64]) -> bool {
    std_dev(values) <= FLAT_TOLERANCE * mean(values).abs().max(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn validate_rejects_empty() {
        let err = PriceSeries::new(Vec::new()).validate();
        assert!(err.is_err());
    }

    #[test]
    fn validate_rejects_nan() {
        let err = PriceSeries::new(vec![1.0, f64::NAN]).validate();
        assert!(matches!(err, Err(OptimizeError::InvalidInput { .. })));
    }

    #[test]
    fn timestamps_must_align() {
        let res = PriceSeries::with_timestamps(vec![1.0, 2.0], vec!["a".into()]);
        assert!(res.is_err());
    }

    #[test]
    fn periods_drop_timestamps_that_do_not_cover_them() {
        let series = PriceSeries {
            prices: vec![1.0, 2.0, 3.0, 4.0],
            timestamps: Some(vec!["t0".into(), "t1".into(), "t2".into()]),
        };
        assert!(series.validate_alignment().is_err());
        let periods = series.periods(2);
        assert_eq!(periods.len(), 2);
        assert!(periods[0].timestamps.is_some());
        assert_eq!(periods[1].timestamps, None);
    }

    #[test]
    fn periods_keep_timestamps_aligned() {
        let series = PriceSeries::with_timestamps(
            vec![1.0, 2.0, 3.0, 4.0, 5.0],
            (0..5).map(|i| format!("t{i}")).collect(),
        )
        .ok();
        let periods = series.map(|s| s.periods(2)).unwrap_or_default();
        assert_eq!(periods.len(), 3);
        assert_eq!(periods[2].prices, vec![5.0]);
        assert_eq!(
            periods[1].timestamps.as_deref(),
            Some(&["t2".to_string(), "t3".to_string()][..])
        );
    }

    #[test]
    fn stats_basic() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_abs_diff_eq!(mean(&v), 5.0, epsilon = 1e-9);
        assert_abs_diff_eq!(std_dev(&v), 2.0, epsilon = 1e-9);
        assert!(is_flat(&[3.0, 3.0, 3.0]));
        assert!(!is_flat(&v));
    }

    #[test]
    fn percentile_truncates_index() {
        let s = sorted(&[5.0, 1.0, 4.0, 2.0, 3.0]);
        assert_eq!(percentile(&s, 33.0), 2.0);
        assert_eq!(percentile(&s, 67.0), 3.0);
        assert_eq!(percentile(&s, 100.0), 5.0);
    }
}
