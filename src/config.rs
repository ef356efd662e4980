//! TOML-based optimizer configuration and preset definitions.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::battery::BatteryParams;
use crate::regime::ClassificationMethod;

/// Top-level optimizer configuration parsed from TOML.
///
/// All fields have defaults matching the `default` preset. Load from TOML
/// with [`OptimizerConfig::from_toml_file`] or use [`OptimizerConfig::default`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptimizerConfig {
    /// Storage asset parameters.
    #[serde(default)]
    pub battery: BatteryParams,
    /// Regime classification method and its options.
    #[serde(default)]
    pub regime: RegimeOptions,
    /// Differential-evolution settings.
    #[serde(default)]
    pub search: SearchConfig,
    /// Cost-function weights.
    #[serde(default)]
    pub penalties: PenaltyConfig,
    /// Run-level settings.
    #[serde(default)]
    pub run: RunConfig,
}

/// Regime classification method plus every method's tuning knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegimeOptions {
    /// Classification strategy.
    pub method: ClassificationMethod,
    /// Quantile method: upper edge of the Low regime (percent).
    pub low_percentile: f64,
    /// Quantile method: lower edge of the High regime (percent).
    pub high_percentile: f64,
    /// Rolling window length for the adaptive methods.
    pub window: usize,
    /// Volatility-adaptive: local/global std ratio above which the local mean
    /// is used as reference.
    pub volatility_threshold: f64,
    /// Rolling threshold: band half-width in local standard deviations.
    pub sensitivity: f64,
    /// Rolling threshold: minimum band half-width as a fraction of the mean.
    pub min_band_fraction: f64,
    /// Z-score cutoff below which a price is Low.
    pub z_low: f64,
    /// Z-score cutoff above which a price is High.
    pub z_high: f64,
    /// K-means iteration cap.
    pub kmeans_max_iterations: usize,
    /// K-means convergence tolerance on centroid movement.
    pub kmeans_tolerance: f64,
}

impl Default for RegimeOptions {
    fn default() -> Self {
        Self {
            method: ClassificationMethod::Quantile,
            low_percentile: 33.0,
            high_percentile: 67.0,
            window: 24,
            volatility_threshold: 1.2,
            sensitivity: 0.5,
            min_band_fraction: 0.05,
            z_low: -0.5,
            z_high: 0.5,
            kmeans_max_iterations: 100,
            kmeans_tolerance: 1e-6,
        }
    }
}

impl RegimeOptions {
    /// Default options for the given method.
    pub fn for_method(method: ClassificationMethod) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }
}

/// Differential-evolution settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchConfig {
    /// Mutation factor `F` in `x1 + F * (x2 - x3)`.
    pub mutation_factor: f64,
    /// Per-gene probability of taking the donor gene.
    pub recombination_rate: f64,
    pub population_min: usize,
    pub population_max: usize,
    pub generations_min: usize,
    pub generations_max: usize,
    /// Share of the initial population seeded from the regime path.
    pub seeded_fraction: f64,
    /// Shortest series the metaheuristic accepts.
    pub min_timesteps: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            mutation_factor: 0.5,
            recombination_rate: 0.7,
            population_min: 15,
            population_max: 30,
            generations_min: 25,
            generations_max: 50,
            seeded_fraction: 0.8,
            min_timesteps: 12,
        }
    }
}

impl SearchConfig {
    /// Population size for a horizon of `len` timesteps.
    pub fn population_size(&self, len: usize) -> usize {
        (self.population_min + len / 10).clamp(self.population_min, self.population_max)
    }

    /// Generation count for a horizon of `len` timesteps.
    pub fn generations(&self, len: usize) -> usize {
        (self.generations_min + len / 20).clamp(self.generations_min, self.generations_max)
    }
}

/// Cost-function weights.
///
/// Their relative scale sets the priority between constraint violation,
/// regime guidance and profit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PenaltyConfig {
    /// Cost of a candidate that charges and discharges in the same timestep.
    pub reject: f64,
    /// Weight of squared SoC excursions (bounds and end-of-horizon target).
    pub soc: f64,
    /// Weight of a net-negative total revenue.
    pub negative_revenue: f64,
    /// Per-unit cost of discharging in Low or charging in High.
    pub contrary_action: f64,
    /// Flat cost of acting where the price regime disagrees with the decoded one.
    pub regime_mismatch: f64,
    /// Per-unit cost of any action in the Medium regime.
    pub medium_action: f64,
    /// Per-unit reward for charging in Low or discharging in High.
    pub aligned_action_reward: f64,
}

impl Default for PenaltyConfig {
    fn default() -> Self {
        Self {
            reject: 1e20,
            soc: 1e6,
            negative_revenue: 1e4,
            contrary_action: 1e3,
            regime_mismatch: 1e2,
            medium_action: 2.0,
            aligned_action_reward: 1.0,
        }
    }
}

/// Run-level settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Seed of the single random stream driving classification and search.
    pub seed: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self { seed: 42 }
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"search.mutation_factor"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl OptimizerConfig {
    /// Returns the fast preset: small population, few generations.
    pub fn fast() -> Self {
        Self {
            search: SearchConfig {
                population_min: 10,
                population_max: 15,
                generations_min: 10,
                generations_max: 20,
                ..SearchConfig::default()
            },
            ..Self::default()
        }
    }

    /// Returns the thorough preset: larger population and generation caps.
    pub fn thorough() -> Self {
        Self {
            search: SearchConfig {
                population_min: 30,
                population_max: 60,
                generations_min: 50,
                generations_max: 150,
                ..SearchConfig::default()
            },
            ..Self::default()
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["default", "fast", "thorough"];

    /// Loads a configuration from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "default" => Ok(Self::default()),
            "fast" => Ok(Self::fast()),
            "thorough" => Ok(Self::thorough()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("config", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if let Err(e) = self.battery.validate() {
            errors.push(ConfigError::new("battery", e.to_string()));
        }

        let r = &self.regime;
        if !(0.0..=100.0).contains(&r.low_percentile)
            || !(0.0..=100.0).contains(&r.high_percentile)
        {
            errors.push(ConfigError::new(
                "regime.low_percentile",
                "percentiles must be in [0, 100]",
            ));
        } else if r.low_percentile >= r.high_percentile {
            errors.push(ConfigError::new(
                "regime.low_percentile",
                "must be < regime.high_percentile",
            ));
        }
        if r.window < 2 {
            errors.push(ConfigError::new("regime.window", "must be >= 2"));
        }
        if r.volatility_threshold <= 0.0 {
            errors.push(ConfigError::new("regime.volatility_threshold", "must be > 0"));
        }
        if r.sensitivity < 0.0 {
            errors.push(ConfigError::new("regime.sensitivity", "must be >= 0"));
        }
        if r.min_band_fraction < 0.0 {
            errors.push(ConfigError::new("regime.min_band_fraction", "must be >= 0"));
        }
        if r.z_low >= r.z_high {
            errors.push(ConfigError::new("regime.z_low", "must be < regime.z_high"));
        }
        if r.kmeans_max_iterations == 0 {
            errors.push(ConfigError::new("regime.kmeans_max_iterations", "must be > 0"));
        }

        let s = &self.search;
        if !(s.mutation_factor > 0.0 && s.mutation_factor <= 2.0) {
            errors.push(ConfigError::new("search.mutation_factor", "must be in (0, 2]"));
        }
        if !(0.0..=1.0).contains(&s.recombination_rate) {
            errors.push(ConfigError::new(
                "search.recombination_rate",
                "must be in [0, 1]",
            ));
        }
        if s.population_min < 4 {
            errors.push(ConfigError::new("search.population_min", "must be >= 4"));
        }
        if s.population_min > s.population_max {
            errors.push(ConfigError::new(
                "search.population_min",
                "must be <= search.population_max",
            ));
        }
        if s.generations_min == 0 || s.generations_min > s.generations_max {
            errors.push(ConfigError::new(
                "search.generations_min",
                "must be > 0 and <= search.generations_max",
            ));
        }
        if !(0.0..=1.0).contains(&s.seeded_fraction) {
            errors.push(ConfigError::new("search.seeded_fraction", "must be in [0, 1]"));
        }
        if s.min_timesteps == 0 {
            errors.push(ConfigError::new("search.min_timesteps", "must be > 0"));
        }

        let p = &self.penalties;
        for (field, value) in [
            ("penalties.reject", p.reject),
            ("penalties.soc", p.soc),
            ("penalties.negative_revenue", p.negative_revenue),
            ("penalties.contrary_action", p.contrary_action),
            ("penalties.regime_mismatch", p.regime_mismatch),
            ("penalties.medium_action", p.medium_action),
            ("penalties.aligned_action_reward", p.aligned_action_reward),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                errors.push(ConfigError::new(field, "must be finite and >= 0"));
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_valid() {
        let cfg = OptimizerConfig::default();
        let errors = cfg.validate();
        assert!(errors.is_empty(), "default should be valid: {errors:?}");
    }

    #[test]
    fn from_preset_unknown() {
        let err = OptimizerConfig::from_preset("nonexistent");
        assert!(err.is_err());
        let e = err.unwrap_err();
        assert!(e.message.contains("unknown preset"));
    }

    #[test]
    fn all_presets_are_valid() {
        for name in OptimizerConfig::PRESETS {
            let cfg = OptimizerConfig::from_preset(name);
            assert!(cfg.is_ok(), "preset \"{name}\" should load");
            let errors = cfg.as_ref().map(|c| c.validate()).unwrap_or_default();
            assert!(
                errors.is_empty(),
                "preset \"{name}\" should be valid: {errors:?}"
            );
        }
    }

    #[test]
    fn valid_toml_parses() {
        let toml = r#"
[battery]
p_max = 2.5
soc_min = 0.0
soc_max = 10.0
efficiency = 0.9
initial_soc = 5.0

[regime]
method = "kmeans"
kmeans_max_iterations = 50

[search]
mutation_factor = 0.8
recombination_rate = 0.9

[penalties]
medium_action = 5.0

[run]
seed = 7
"#;
        let cfg = OptimizerConfig::from_toml_str(toml);
        assert!(cfg.is_ok(), "valid TOML should parse: {:?}", cfg.err());
        let cfg = cfg.ok();
        assert_eq!(cfg.as_ref().map(|c| c.battery.p_max), Some(2.5));
        assert_eq!(cfg.as_ref().and_then(|c| c.battery.initial_soc), Some(5.0));
        assert_eq!(
            cfg.as_ref().map(|c| c.regime.method),
            Some(ClassificationMethod::KMeans)
        );
        assert_eq!(cfg.as_ref().map(|c| c.run.seed), Some(7));
        assert_eq!(cfg.as_ref().map(|c| c.search.population_min), Some(15));
    }

    #[test]
    fn invalid_toml_unknown_field() {
        let toml = r#"
[search]
bogus_field = true
"#;
        assert!(OptimizerConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn unknown_method_is_rejected() {
        let toml = r#"
[regime]
method = "astrology"
"#;
        assert!(OptimizerConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let toml = r#"
[run]
seed = 99
"#;
        let cfg = OptimizerConfig::from_toml_str(toml).ok();
        assert_eq!(cfg.as_ref().map(|c| c.run.seed), Some(99));
        assert_eq!(cfg.as_ref().map(|c| c.battery.soc_max), Some(50.0));
        assert_eq!(cfg.as_ref().map(|c| c.regime.window), Some(24));
    }

    #[test]
    fn validation_catches_inverted_percentiles() {
        let mut cfg = OptimizerConfig::default();
        cfg.regime.low_percentile = 80.0;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "regime.low_percentile"));
    }

    #[test]
    fn validation_catches_bad_battery() {
        let mut cfg = OptimizerConfig::default();
        cfg.battery.soc_min = 60.0;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "battery"));
    }

    #[test]
    fn validation_catches_tiny_population() {
        let mut cfg = OptimizerConfig::default();
        cfg.search.population_min = 3;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "search.population_min"));
    }

    #[test]
    fn population_and_generations_scale_with_length() {
        let s = SearchConfig::default();
        assert_eq!(s.population_size(24), 17);
        assert_eq!(s.population_size(10_000), 30);
        assert_eq!(s.generations(24), 26);
        assert_eq!(s.generations(10_000), 50);
        assert!(s.population_size(0) >= s.population_min);
    }

    #[test]
    fn thorough_searches_harder_than_fast() {
        let fast = OptimizerConfig::fast();
        let thorough = OptimizerConfig::thorough();
        assert!(thorough.search.population_size(96) > fast.search.population_size(96));
        assert!(thorough.search.generations(96) > fast.search.generations(96));
    }
}
