//! End-to-end pipeline: classify, fit the HMM, decode, search, report.

use std::fmt;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::battery::BatteryParams;
use crate::config::OptimizerConfig;
use crate::error::{OptimizeError, Result};
use crate::hmm::{self, EmissionMatrix, TransitionMatrix};
use crate::kpi::KpiReport;
use crate::observer::{NoopObserver, SearchObserver};
use crate::regime::{self, ClassificationMethod, N_REGIMES, RegimeLabel};
use crate::schedule::Schedule;
use crate::search::{ScheduleSearch, SearchProblem, simple_optimize};
use crate::series::PriceSeries;

/// Which algorithm produced the returned schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleMethod {
    DifferentialEvolution,
    /// Threshold heuristic used after the search failed.
    Greedy,
}

impl fmt::Display for ScheduleMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DifferentialEvolution => f.write_str("differential_evolution"),
            Self::Greedy => f.write_str("greedy"),
        }
    }
}

/// Schedule, KPIs and every intermediate artifact of one `optimize` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizationResult {
    pub schedule: Schedule,
    pub kpis: KpiReport,
    pub method: ScheduleMethod,
    pub classification: ClassificationMethod,
    pub labels: Vec<RegimeLabel>,
    pub transition: TransitionMatrix,
    pub emission: EmissionMatrix,
    pub path: Vec<RegimeLabel>,
    pub log_likelihood: f64,
}

/// Regime characterization of an arbitrary series, without scheduling.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    pub classification: ClassificationMethod,
    pub labels: Vec<RegimeLabel>,
    pub transition: TransitionMatrix,
    pub emission: EmissionMatrix,
    pub path: Vec<RegimeLabel>,
    pub log_likelihood: f64,
    /// Observations per regime in the classifier labels.
    pub regime_counts: [usize; N_REGIMES],
}

/// Runs the optimization pipeline.
///
/// Holds only configuration. Every call builds its own random stream from
/// `config.run.seed` and keeps all intermediate state local, so repeated
/// calls with the same input return identical results.
#[derive(Debug, Clone, Default)]
pub struct Optimizer {
    pub config: OptimizerConfig,
}

impl Optimizer {
    pub fn new(config: OptimizerConfig) -> Self {
        Self { config }
    }

    /// Validates the configuration before constructing the optimizer.
    ///
    /// # Errors
    ///
    /// Returns the first `ConfigError` reported by
    /// [`OptimizerConfig::validate`].
    pub fn try_new(config: OptimizerConfig) -> Result<Self> {
        let optimizer = Self { config };
        optimizer.check_config()?;
        Ok(optimizer)
    }

    /// First violated configuration constraint, if any.
    fn check_config(&self) -> Result<()> {
        match self.config.validate().into_iter().next() {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }

    pub fn battery(&self) -> &BatteryParams {
        &self.config.battery
    }

    /// Optimizes one horizon.
    ///
    /// # Errors
    ///
    /// * `InvalidInput` for empty or non-finite prices, misaligned timestamps
    ///   or invalid battery parameters.
    /// * `Config` when any other configuration constraint is violated.
    /// * `InsufficientData` when the series is shorter than
    ///   `search.min_timesteps`; no search is attempted.
    ///
    /// A failed search is not an error: the greedy schedule is returned and
    /// tagged [`ScheduleMethod::Greedy`].
    pub fn optimize(&self, series: &PriceSeries) -> Result<OptimizationResult> {
        self.optimize_observed(series, &mut NoopObserver)
    }

    /// Like [`Optimizer::optimize`], reporting search progress to `observer`.
    ///
    /// # Errors
    ///
    /// Same as [`Optimizer::optimize`].
    pub fn optimize_observed(
        &self,
        series: &PriceSeries,
        observer: &mut dyn SearchObserver,
    ) -> Result<OptimizationResult> {
        series.validate()?;
        self.config.battery.validate()?;
        self.check_config()?;
        let min = self.config.search.min_timesteps;
        if series.len() < min {
            return Err(OptimizeError::InsufficientData {
                len: series.len(),
                min,
            });
        }

        let prices = series.prices.as_slice();
        let battery = &self.config.battery;
        let method = self.config.regime.method;
        info!(timesteps = prices.len(), %method, "optimizing horizon");

        let mut rng = StdRng::seed_from_u64(self.config.run.seed);
        let labels = regime::classify(prices, &self.config.regime, &mut rng);
        let [low, medium, high] = regime::regime_counts(&labels);
        debug!(low, medium, high, "classified regimes");

        let transition = TransitionMatrix::from_labels(&labels);
        let emission = EmissionMatrix::from_labels(prices, &labels);
        let decoded = hmm::decode(&hmm::heuristic_actions(prices), &transition, &emission);
        debug!(
            log_likelihood = decoded.log_likelihood,
            "decoded regime path"
        );

        let search = ScheduleSearch::new(self.config.search.clone(), self.config.penalties.clone());
        let problem = SearchProblem {
            prices,
            battery,
            regime_path: Some(&decoded.path),
            price_labels: &labels,
            timestamps: series.timestamps.as_deref(),
        };
        let (schedule, used) = match search.search(&problem, &mut rng, observer) {
            Ok(schedule) => (schedule, ScheduleMethod::DifferentialEvolution),
            Err(err) => {
                warn!(error = %err, "schedule search failed, using greedy schedule");
                (
                    simple_optimize(prices, battery, problem.timestamps),
                    ScheduleMethod::Greedy,
                )
            }
        };

        let kpis = KpiReport::from_schedule(&schedule, prices, battery);
        info!(
            revenue = kpis.total_revenue,
            half_cycles = kpis.half_cycles,
            method = %used,
            "horizon optimized"
        );

        Ok(OptimizationResult {
            schedule,
            kpis,
            method: used,
            classification: method,
            labels,
            transition,
            emission,
            path: decoded.path,
            log_likelihood: decoded.log_likelihood,
        })
    }

    /// Optimizes consecutive periods of `period_len` timesteps independently.
    ///
    /// A failing period yields its own `Err` and does not stop the others.
    /// A series that fails validation as a whole yields a single `Err`.
    pub fn optimize_periods(
        &self,
        series: &PriceSeries,
        period_len: usize,
    ) -> Vec<Result<OptimizationResult>> {
        if let Err(err) = series.validate_alignment() {
            warn!(error = %err, "price series rejected");
            return vec![Err(err)];
        }
        series
            .periods(period_len)
            .iter()
            .enumerate()
            .map(|(index, period)| {
                let result = self.optimize(period);
                if let Err(err) = &result {
                    warn!(period = index, error = %err, "period skipped");
                }
                result
            })
            .collect()
    }

    /// Characterizes `values` into regimes and a decoded path without
    /// running the schedule search.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if `values` is empty or contains non-finite
    /// numbers, and `Config` for an invalid configuration.
    pub fn analyze(&self, values: &[f64]) -> Result<Analysis> {
        PriceSeries::new(values.to_vec()).validate()?;
        self.check_config()?;
        let mut rng = StdRng::seed_from_u64(self.config.run.seed);
        let labels = regime::classify(values, &self.config.regime, &mut rng);
        let transition = TransitionMatrix::from_labels(&labels);
        let emission = EmissionMatrix::from_labels(values, &labels);
        let decoded = hmm::decode(&hmm::heuristic_actions(values), &transition, &emission);

        Ok(Analysis {
            classification: self.config.regime.method,
            regime_counts: regime::regime_counts(&labels),
            labels,
            transition,
            emission,
            path: decoded.path,
            log_likelihood: decoded.log_likelihood,
        })
    }
}
