//! Pairwise swap refinement of the incumbent between generations.

use super::CostModel;

/// One first-improvement sweep over timestep pairs.
///
/// Exchanges the genes of timesteps `i` and `j`, projects the result and
/// keeps it when the cost drops. `x` must already be projected and `cost`
/// must be its cost. Returns the cost of `x` after the sweep.
pub fn swap_sweep(model: &CostModel<'_>, x: &mut [f64], mut cost: f64) -> f64 {
    let n = x.len() / 2;
    let mut candidate = x.to_vec();
    for i in 0..n {
        for j in i + 1..n {
            if x[2 * i] == x[2 * j] && x[2 * i + 1] == x[2 * j + 1] {
                continue;
            }
            candidate.copy_from_slice(x);
            candidate.swap(2 * i, 2 * j);
            candidate.swap(2 * i + 1, 2 * j + 1);
            model.project(&mut candidate);
            let candidate_cost = model.cost(&candidate);
            if candidate_cost < cost {
                x.copy_from_slice(&candidate);
                cost = candidate_cost;
            }
        }
    }
    cost
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battery::BatteryParams;
    use crate::config::PenaltyConfig;
    use crate::regime::RegimeLabel::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn moves_a_charge_to_the_cheaper_hour() {
        let prices = vec![50.0, 25.0, 100.0];
        let battery = BatteryParams::new(5.0, 0.0, 10.0, 1.0);
        let penalties = PenaltyConfig::default();
        let labels = vec![Low, Low, High];
        let model = CostModel::new(&prices, &battery, &penalties, &labels, &labels);

        let mut x = vec![5.0, 0.0, 0.0, 0.0, 0.0, 5.0];
        let start = model.cost(&x);
        assert_abs_diff_eq!(start, -260.0, epsilon = 1e-9);

        let refined = swap_sweep(&model, &mut x, start);
        assert_eq!(x, vec![0.0, 0.0, 5.0, 0.0, 0.0, 5.0]);
        assert_abs_diff_eq!(refined, -385.0, epsilon = 1e-9);
        assert_eq!(refined, model.cost(&x));
    }

    #[test]
    fn idle_vector_is_left_alone() {
        let prices = vec![50.0, 25.0, 100.0];
        let battery = BatteryParams::new(5.0, 0.0, 10.0, 1.0);
        let penalties = PenaltyConfig::default();
        let labels = vec![Low, Low, High];
        let model = CostModel::new(&prices, &battery, &penalties, &labels, &labels);
        let mut x = vec![0.0; 6];
        assert_eq!(swap_sweep(&model, &mut x, 0.0), 0.0);
        assert_eq!(x, vec![0.0; 6]);
    }
}
