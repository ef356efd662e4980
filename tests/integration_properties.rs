//! Invariants that must hold for every classifier, seed and horizon.

mod common;

use bess_arb::hmm::{self, EmissionMatrix, TransitionMatrix};
use bess_arb::observer::RecordingObserver;
use bess_arb::regime;
use bess_arb::search::simple_optimize;
use bess_arb::{ClassificationMethod, OptimizeError, Optimizer, PriceSeries, Schedule};
use rand::SeedableRng;
use rand::rngs::StdRng;

const TOL: f64 = 1e-9;

fn assert_schedule_invariants(schedule: &Schedule, battery: &bess_arb::BatteryParams) {
    for t in 0..schedule.len() {
        assert_eq!(
            schedule.charging[t] * schedule.discharging[t],
            0.0,
            "simultaneous action at step {t}"
        );
        assert!(
            schedule.soc[t] >= battery.soc_min - TOL && schedule.soc[t] <= battery.soc_max + TOL,
            "soc {} out of bounds at step {t}",
            schedule.soc[t]
        );
    }
    assert!(schedule.is_feasible(battery, 1e-6));
}

#[test]
fn every_method_yields_a_feasible_schedule() {
    for prices in [common::arbitrage_prices(), common::two_day_prices()] {
        for method in ClassificationMethod::ALL {
            let mut config = common::config_with_seed(11);
            config.regime.method = method;
            let optimizer = Optimizer::new(config);
            let result = optimizer
                .optimize(&PriceSeries::new(prices.clone()))
                .unwrap_or_else(|e| panic!("{method} failed: {e}"));
            assert_eq!(result.labels.len(), prices.len(), "{method}");
            assert_eq!(result.path.len(), prices.len(), "{method}");
            assert_schedule_invariants(&result.schedule, optimizer.battery());
        }
    }
}

#[test]
fn greedy_schedule_is_feasible() {
    let battery = common::default_battery();
    for prices in [
        common::arbitrage_prices(),
        common::two_day_prices(),
        vec![100.0; 24],
        vec![5.0],
    ] {
        let schedule = simple_optimize(&prices, &battery, None);
        assert_eq!(schedule.len(), prices.len());
        assert_schedule_invariants(&schedule, &battery);
    }
}

#[test]
fn hmm_rows_are_stochastic_for_every_method() {
    let mut rng = StdRng::seed_from_u64(5);
    let prices = common::two_day_prices();
    for method in ClassificationMethod::ALL {
        let options = bess_arb::config::RegimeOptions::for_method(method);
        let labels = regime::classify(&prices, &options, &mut rng);
        let transition = TransitionMatrix::from_labels(&labels);
        let emission = EmissionMatrix::from_prices(&prices, &options, &mut rng);
        for row in transition.rows().iter().chain(emission.rows()) {
            let sum: f64 = row.iter().sum();
            assert!((sum - 1.0).abs() < 1e-12, "{method}: row sums to {sum}");
        }
    }
}

#[test]
fn same_seed_reproduces_the_whole_run() {
    let series = PriceSeries::new(common::two_day_prices());
    for method in [ClassificationMethod::Quantile, ClassificationMethod::KMeans] {
        let mut config = common::config_with_seed(2024);
        config.regime.method = method;
        let first = Optimizer::new(config.clone())
            .optimize(&series)
            .expect("optimizes");
        let second = Optimizer::new(config).optimize(&series).expect("optimizes");
        assert_eq!(first, second, "{method}");
        assert_eq!(first.kpis.total_revenue, second.kpis.total_revenue);
        assert_eq!(first.schedule.charging, second.schedule.charging);
    }
}

#[test]
fn repeated_calls_on_one_instance_do_not_interfere() {
    let optimizer = Optimizer::new(common::config_with_seed(8));
    let day = common::arbitrage_series();
    let before = optimizer.optimize(&day).expect("optimizes");
    let _other = optimizer
        .optimize(&PriceSeries::new(common::two_day_prices()))
        .expect("optimizes");
    let after = optimizer.optimize(&day).expect("optimizes");
    assert_eq!(before, after);
}

#[test]
fn best_cost_is_monotone_across_generations() {
    let optimizer = Optimizer::new(common::config_with_seed(3));
    let mut recorder = RecordingObserver::default();
    optimizer
        .optimize_observed(&common::arbitrage_series(), &mut recorder)
        .expect("optimizes");
    let expected = optimizer.config.search.generations(24);
    assert_eq!(recorder.events.len(), expected);
    for pair in recorder.events.windows(2) {
        assert!(pair[1].best_cost <= pair[0].best_cost);
        assert!(pair[1].best_cost <= pair[1].population_best);
    }
}

#[test]
fn batch_periods_are_isolated() {
    let prices = common::two_day_prices();
    let series = PriceSeries::with_timestamps(prices.clone(), common::hourly_timestamps(48))
        .expect("aligned");
    let optimizer = Optimizer::new(common::config_with_seed(21));

    let results = optimizer.optimize_periods(&series, 24);
    assert_eq!(results.len(), 2);
    let second = results[1].as_ref().expect("second day optimizes");
    let direct = optimizer
        .optimize(&series.periods(24)[1])
        .expect("optimizes");
    assert_eq!(second, &direct);
}

#[test]
fn a_broken_period_does_not_abort_the_batch() {
    let mut prices = common::two_day_prices();
    prices[30] = f64::NAN;
    prices.extend([40.0; 5]);
    let optimizer = Optimizer::new(common::config_with_seed(21));

    let results = optimizer.optimize_periods(&PriceSeries::new(prices), 24);
    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok());
    assert!(matches!(
        results[1],
        Err(OptimizeError::InvalidInput { .. })
    ));
    assert!(matches!(
        results[2],
        Err(OptimizeError::InsufficientData { len: 5, .. })
    ));
}

#[test]
fn analyze_characterizes_a_balancing_signal() {
    // signed imbalance volumes, no scheduling involved
    let signal: Vec<f64> = (0..96)
        .map(|t| 120.0 * ((t as f64) / 9.0).sin() - 15.0)
        .collect();
    for method in ClassificationMethod::ALL {
        let mut config = common::config_with_seed(4);
        config.regime.method = method;
        let analysis = Optimizer::new(config).analyze(&signal).expect("analyzes");
        assert_eq!(analysis.labels.len(), signal.len());
        assert_eq!(analysis.path.len(), signal.len());
        assert!(analysis.log_likelihood.is_finite());
        assert_eq!(analysis.regime_counts.iter().sum::<usize>(), signal.len());
    }
}

#[test]
fn decoding_a_constant_observation_sequence_is_constant() {
    let labels = vec![bess_arb::RegimeLabel::Medium; 10];
    let prices = vec![70.0; 10];
    let transition = TransitionMatrix::from_labels(&labels);
    let emission = EmissionMatrix::from_labels(&prices, &labels);
    let decoded = hmm::decode(&hmm::heuristic_actions(&prices), &transition, &emission);
    assert!(decoded.path.windows(2).all(|w| w[0] == w[1]));
    assert!(hmm::decode(&[], &transition, &emission).path.is_empty());
}
