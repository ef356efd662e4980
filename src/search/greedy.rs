//! Threshold heuristic used as the search baseline and fallback.

use crate::battery::BatteryParams;
use crate::hmm::{CHARGE_PRICE_RATIO, DISCHARGE_PRICE_RATIO};
use crate::schedule::Schedule;
use crate::series;

/// Greedy schedule: charge when the price is below 0.8x the mean and there
/// is headroom, discharge when above 1.2x the mean and there is stored
/// energy, otherwise idle.
///
/// Always succeeds, and the result satisfies every schedule invariant
/// including the end-of-horizon SoC target.
pub fn simple_optimize(
    prices: &[f64],
    battery: &BatteryParams,
    timestamps: Option<&[String]>,
) -> Schedule {
    let mean = series::mean(prices);
    let n = prices.len();
    let mut charge = vec![0.0; n];
    let mut discharge = vec![0.0; n];
    let mut soc = battery.initial_soc();

    for (t, &price) in prices.iter().enumerate() {
        if price < CHARGE_PRICE_RATIO * mean {
            charge[t] = battery.max_charge(soc);
        } else if price > DISCHARGE_PRICE_RATIO * mean {
            discharge[t] = battery.max_discharge(soc);
        }
        soc = battery.clamp_soc(battery.next_soc(soc, charge[t], discharge[t]));
    }

    Schedule::realize(prices, battery, &charge, &discharge, timestamps)
}
