//! Penalized cost of a charge/discharge decision vector.

use crate::battery::BatteryParams;
use crate::config::PenaltyConfig;
use crate::regime::RegimeLabel;
use crate::schedule::{self, ACTION_EPSILON};

/// Cost function minimized by the schedule search.
///
/// A decision vector holds `2 * T` genes interleaved as
/// `[charge_0, discharge_0, charge_1, discharge_1, ...]`. The cost is the
/// negated net revenue plus constraint and guidance penalties; lower is
/// better.
#[derive(Debug, Clone)]
pub struct CostModel<'a> {
    prices: &'a [f64],
    battery: &'a BatteryParams,
    penalties: &'a PenaltyConfig,
    /// Decoded regime path used as the guidance signal.
    guidance: &'a [RegimeLabel],
    /// Regime implied by each instantaneous price.
    price_labels: &'a [RegimeLabel],
}

impl<'a> CostModel<'a> {
    /// Creates a cost model.
    ///
    /// # Arguments
    ///
    /// * `guidance` - Regime path steering the guidance term. When it is
    ///   empty the price labels steer instead and no mismatch penalty applies.
    /// * `price_labels` - Per-price regime labels from the classifier.
    pub fn new(
        prices: &'a [f64],
        battery: &'a BatteryParams,
        penalties: &'a PenaltyConfig,
        guidance: &'a [RegimeLabel],
        price_labels: &'a [RegimeLabel],
    ) -> Self {
        Self {
            prices,
            battery,
            penalties,
            guidance,
            price_labels,
        }
    }

    /// Number of genes in a decision vector.
    pub fn dimension(&self) -> usize {
        2 * self.prices.len()
    }

    pub fn prices(&self) -> &'a [f64] {
        self.prices
    }

    /// Moves `x` onto the nearest schedule the battery can execute, so the
    /// cost scores what would actually be dispatched.
    pub fn project(&self, x: &mut [f64]) {
        schedule::project_decision_vector(self.prices, self.battery, x);
    }

    /// Evaluates a decision vector.
    ///
    /// Returns `penalties.reject` outright if any timestep both charges and
    /// discharges.
    pub fn cost(&self, x: &[f64]) -> f64 {
        let p = self.penalties;
        let mut soc = self.battery.initial_soc();
        let mut revenue = 0.0;
        let mut penalty = 0.0;

        for (t, &price) in self.prices.iter().enumerate() {
            let charge = x.get(2 * t).copied().unwrap_or(0.0);
            let discharge = x.get(2 * t + 1).copied().unwrap_or(0.0);
            let charging = charge > ACTION_EPSILON;
            let discharging = discharge > ACTION_EPSILON;
            if charging && discharging {
                return p.reject;
            }

            revenue += (discharge - charge) * price;

            soc = self.battery.next_soc(soc, charge, discharge);
            let excess = if soc > self.battery.soc_max {
                soc - self.battery.soc_max
            } else if soc < self.battery.soc_min {
                self.battery.soc_min - soc
            } else {
                0.0
            };
            if excess > 0.0 {
                penalty += p.soc * excess * excess;
                soc = self.battery.clamp_soc(soc);
            }

            let price_label = self.price_labels.get(t).copied();
            let regime = self
                .guidance
                .get(t)
                .copied()
                .or(price_label)
                .unwrap_or(RegimeLabel::Medium);
            if !self.guidance.is_empty() && price_label.is_some_and(|l| l != regime) {
                penalty += p.regime_mismatch;
            }

            if !(charging || discharging) {
                continue;
            }
            penalty += match regime {
                RegimeLabel::Low => {
                    p.contrary_action * discharge - p.aligned_action_reward * charge
                }
                RegimeLabel::High => {
                    p.contrary_action * charge - p.aligned_action_reward * discharge
                }
                RegimeLabel::Medium => p.medium_action * (charge + discharge),
            };
        }

        let shortfall = self.battery.target_soc() - soc;
        if shortfall > 0.0 {
            penalty += p.soc * shortfall * shortfall;
        }
        if revenue < 0.0 {
            penalty += p.negative_revenue * -revenue;
        }

        -revenue + penalty
    }
}
