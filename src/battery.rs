//! Storage asset parameters and single-step state-of-charge dynamics.

use serde::{Deserialize, Serialize};

use crate::error::{OptimizeError, Result};

/// A battery energy storage asset as seen by the optimizer.
///
/// Energy and power share one unit per timestep: charging `c` for one step
/// stores `c * efficiency`, discharging `d` removes `d`. The round-trip loss is
/// applied entirely on the charge side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatteryParams {
    /// Maximum charge or discharge per timestep (positive).
    pub p_max: f64,

    /// Lower state-of-charge bound.
    pub soc_min: f64,

    /// Upper state-of-charge bound.
    pub soc_max: f64,

    /// Round-trip efficiency in (0, 1], applied on charge.
    pub efficiency: f64,

    /// Starting state of charge. Defaults to the midpoint of the SoC range.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_soc: Option<f64>,

    /// Minimum state of charge at the end of the horizon. Defaults to the
    /// starting state of charge.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_soc: Option<f64>,
}

impl BatteryParams {
    /// Creates battery parameters with the default initial and target SoC.
    pub fn new(p_max: f64, soc_min: f64, soc_max: f64, efficiency: f64) -> Self {
        Self {
            p_max,
            soc_min,
            soc_max,
            efficiency,
            initial_soc: None,
            target_soc: None,
        }
    }

    /// Sets an explicit starting state of charge.
    pub fn with_initial_soc(mut self, soc: f64) -> Self {
        self.initial_soc = Some(soc);
        self
    }

    /// Sets an explicit end-of-horizon SoC floor.
    pub fn with_target_soc(mut self, soc: f64) -> Self {
        self.target_soc = Some(soc);
        self
    }

    /// Checks all physical constraints.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` naming the first violated constraint.
    pub fn validate(&self) -> Result<()> {
        if !(self.p_max.is_finite() && self.p_max > 0.0) {
            return Err(OptimizeError::invalid("p_max must be > 0"));
        }
        if !(self.soc_min.is_finite() && self.soc_max.is_finite()) {
            return Err(OptimizeError::invalid("SoC bounds must be finite"));
        }
        if self.soc_min > self.soc_max {
            return Err(OptimizeError::invalid(format!(
                "soc_min ({}) must be <= soc_max ({})",
                self.soc_min, self.soc_max
            )));
        }
        if !(self.efficiency > 0.0 && self.efficiency <= 1.0) {
            return Err(OptimizeError::invalid("efficiency must be in (0, 1]"));
        }
        for (name, value) in [
            ("initial_soc", self.initial_soc),
            ("target_soc", self.target_soc),
        ] {
            if let Some(v) = value {
                if !(self.soc_min..=self.soc_max).contains(&v) {
                    return Err(OptimizeError::invalid(format!(
                        "{name} ({v}) must lie within [{}, {}]",
                        self.soc_min, self.soc_max
                    )));
                }
            }
        }
        Ok(())
    }

    /// Usable SoC span `soc_max - soc_min`.
    pub fn soc_range(&self) -> f64 {
        self.soc_max - self.soc_min
    }

    pub fn initial_soc(&self) -> f64 {
        self.initial_soc.unwrap_or(0.5 * (self.soc_min + self.soc_max))
    }

    pub fn target_soc(&self) -> f64 {
        self.target_soc.unwrap_or_else(|| self.initial_soc())
    }

    /// Largest charge that fits in the remaining headroom at `soc`.
    pub fn max_charge(&self, soc: f64) -> f64 {
        ((self.soc_max - soc) / self.efficiency).clamp(0.0, self.p_max)
    }

    /// Largest discharge the stored energy above `soc_min` allows at `soc`.
    pub fn max_discharge(&self, soc: f64) -> f64 {
        (soc - self.soc_min).clamp(0.0, self.p_max)
    }

    /// Unclamped SoC after one step.
    pub fn next_soc(&self, soc: f64, charge: f64, discharge: f64) -> f64 {
        soc + charge * self.efficiency - discharge
    }

    pub fn clamp_soc(&self, soc: f64) -> f64 {
        soc.clamp(self.soc_min, self.soc_max)
    }
}

impl Default for BatteryParams {
    fn default() -> Self {
        Self::new(5.0, 10.0, 50.0, 0.85)
    }
}
