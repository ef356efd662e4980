//! Differential-evolution schedule search guided by the decoded regime path.
//!
//! The search minimizes [`CostModel::cost`] over the `2 * T` box
//! `[0, p_max]^{2T}` with canonical DE/rand/1/bin. Every candidate is
//! projected onto what the battery can execute before it is scored, and the
//! population best gets a pairwise swap sweep after each generation. The
//! best-ever vector is realized into a feasible [`Schedule`].

/// Penalized objective.
pub mod cost;
/// Threshold baseline schedule.
pub mod greedy;
/// Initial population seeding.
pub mod population;
/// Local refinement of the incumbent.
pub mod refine;

use rand::Rng;
use rand::rngs::StdRng;
use tracing::debug;

use crate::battery::BatteryParams;
use crate::config::{PenaltyConfig, SearchConfig};
use crate::error::SearchError;
use crate::observer::{GenerationEvent, SearchObserver};
use crate::regime::RegimeLabel;
use crate::schedule::Schedule;

pub use cost::CostModel;
pub use greedy::simple_optimize;

/// Differential-evolution optimizer for a single price horizon.
#[derive(Debug, Clone, Default)]
pub struct ScheduleSearch {
    pub config: SearchConfig,
    pub penalties: PenaltyConfig,
}

/// Inputs of one search run.
#[derive(Debug, Clone, Copy)]
pub struct SearchProblem<'a> {
    pub prices: &'a [f64],
    pub battery: &'a BatteryParams,
    /// Decoded regime path; `None` seeds from price ranking and drops the
    /// mismatch penalty.
    pub regime_path: Option<&'a [RegimeLabel]>,
    /// Classifier label of every price.
    pub price_labels: &'a [RegimeLabel],
    pub timestamps: Option<&'a [String]>,
}

impl ScheduleSearch {
    pub fn new(config: SearchConfig, penalties: PenaltyConfig) -> Self {
        Self { config, penalties }
    }

    /// Runs the search and returns the realized best-ever schedule.
    ///
    /// # Arguments
    ///
    /// * `problem` - Prices, battery and regime guidance.
    /// * `rng` - The run's single random stream; every draw comes from it.
    /// * `observer` - Receives the best cost after each generation.
    ///
    /// # Errors
    ///
    /// * `InsufficientData` if the horizon is shorter than
    ///   `config.min_timesteps`.
    /// * `NoFeasibleCandidate` if no candidate scored below the rejection
    ///   cost.
    pub fn search(
        &self,
        problem: &SearchProblem<'_>,
        rng: &mut StdRng,
        observer: &mut dyn SearchObserver,
    ) -> Result<Schedule, SearchError> {
        let prices = problem.prices;
        let battery = problem.battery;
        let n = prices.len();
        if n < self.config.min_timesteps {
            return Err(SearchError::InsufficientData {
                len: n,
                min: self.config.min_timesteps,
            });
        }

        let guidance = problem.regime_path.unwrap_or(&[]);
        let model = CostModel::new(
            prices,
            battery,
            &self.penalties,
            guidance,
            problem.price_labels,
        );
        let dim = model.dimension();
        let pop_size = self.config.population_size(n);
        let generations = self.config.generations(n);
        debug!(
            timesteps = n,
            population = pop_size,
            generations,
            "starting differential evolution"
        );

        let baseline_vector = simple_optimize(prices, battery, None).to_decision_vector();
        let labels = population::seeding_labels(prices, problem.regime_path);
        let mut population = population::initial_population(
            &labels,
            battery.p_max,
            pop_size,
            self.config.seeded_fraction,
            Some(baseline_vector),
            rng,
        );
        let mut costs: Vec<f64> = population
            .iter_mut()
            .map(|x| {
                model.project(x);
                model.cost(x)
            })
            .collect();

        let mut best_idx = argmin(&costs);
        let mut best = population[best_idx].clone();
        let mut best_cost = costs[best_idx];

        let f = self.config.mutation_factor;
        let cr = self.config.recombination_rate;
        let mut trial = vec![0.0; dim];

        for generation in 0..generations {
            for target in 0..pop_size {
                let [a, b, c] = pick_three(pop_size, target, rng);
                let forced = rng.random_range(0..dim);
                for j in 0..dim {
                    trial[j] = if j == forced || rng.random::<f64>() < cr {
                        let donor =
                            population[a][j] + f * (population[b][j] - population[c][j]);
                        donor.clamp(0.0, battery.p_max)
                    } else {
                        population[target][j]
                    };
                }
                model.project(&mut trial);

                let trial_cost = model.cost(&trial);
                if trial_cost <= costs[target] {
                    population[target].copy_from_slice(&trial);
                    costs[target] = trial_cost;
                    if trial_cost < best_cost {
                        best_cost = trial_cost;
                        best.copy_from_slice(&trial);
                    }
                }
            }
            best_idx = argmin(&costs);
            costs[best_idx] =
                refine::swap_sweep(&model, &mut population[best_idx], costs[best_idx]);
            if costs[best_idx] < best_cost {
                best_cost = costs[best_idx];
                best.copy_from_slice(&population[best_idx]);
            }
            observer.on_generation(&GenerationEvent {
                generation,
                best_cost,
                population_best: costs[best_idx],
            });
        }

        if !best_cost.is_finite() || best_cost >= self.penalties.reject {
            return Err(SearchError::NoFeasibleCandidate { best_cost });
        }
        debug!(best_cost, "differential evolution finished");

        let (charge, discharge): (Vec<f64>, Vec<f64>) =
            best.chunks_exact(2).map(|g| (g[0], g[1])).unzip();
        Ok(Schedule::realize(
            prices,
            battery,
            &charge,
            &discharge,
            problem.timestamps,
        ))
    }
}

/// Three distinct indices, all different from `target`.
///
/// Populations smaller than four reuse indices rather than fail.
fn pick_three(size: usize, target: usize, rng: &mut StdRng) -> [usize; 3] {
    if size < 4 {
        return [0, 1 % size.max(1), 2 % size.max(1)];
    }
    let mut picked = [target; 3];
    for i in 0..3 {
        loop {
            let candidate = rng.random_range(0..size);
            if candidate != target && !picked[..i].contains(&candidate) {
                picked[i] = candidate;
                break;
            }
        }
    }
    picked
}

fn argmin(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.total_cmp(b))
        .map_or(0, |(i, _)| i)
}
