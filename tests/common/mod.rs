//! Shared test fixtures for integration tests.
#![allow(dead_code)]

use bess_arb::{BatteryParams, OptimizerConfig, PriceSeries};

/// 24-point price curve: a morning trough, an afternoon peak and an evening
/// decline. Mean 70.
pub fn arbitrage_prices() -> Vec<f64> {
    vec![
        50.0, 45.0, 40.0, 35.0, 30.0, 25.0, 60.0, 65.0, 70.0, 75.0, 80.0, 85.0, 90.0, 95.0, 100.0,
        105.0, 110.0, 115.0, 80.0, 75.0, 70.0, 65.0, 60.0, 55.0,
    ]
}

pub fn arbitrage_series() -> PriceSeries {
    PriceSeries::new(arbitrage_prices())
}

/// Battery with SoC 10 to 50, 5 per step, 85% round trip.
pub fn default_battery() -> BatteryParams {
    BatteryParams::new(5.0, 10.0, 50.0, 0.85)
}

/// Default config using [`default_battery`] and the given seed.
pub fn config_with_seed(seed: u64) -> OptimizerConfig {
    let mut config = OptimizerConfig::default();
    config.battery = default_battery();
    config.run.seed = seed;
    config
}

/// Two days of hourly prices with a noisy double-peak shape.
pub fn two_day_prices() -> Vec<f64> {
    (0..48)
        .map(|t| {
            let h = (t % 24) as f64;
            let morning = 25.0 * (-(h - 8.0).powi(2) / 6.0).exp();
            let evening = 40.0 * (-(h - 19.0).powi(2) / 4.0).exp();
            let wiggle = 3.0 * ((t * 7 % 5) as f64 - 2.0);
            45.0 + morning + evening + wiggle
        })
        .collect()
}

/// Timestamps `2024-01-01T00:00`, `2024-01-01T01:00`, ... for `n` hours.
pub fn hourly_timestamps(n: usize) -> Vec<String> {
    (0..n)
        .map(|t| format!("2024-01-{:02}T{:02}:00", 1 + t / 24, t % 24))
        .collect()
}
