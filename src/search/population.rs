//! Initial population for the differential-evolution search.

use rand::Rng;
use rand::rngs::StdRng;

use crate::regime::RegimeLabel;

/// Marks each timestep Low/Medium/High for seeding.
///
/// Uses the decoded path when one is available, otherwise ranks prices and
/// takes the cheapest third as Low and the dearest third as High.
pub fn seeding_labels(prices: &[f64], path: Option<&[RegimeLabel]>) -> Vec<RegimeLabel> {
    if let Some(path) = path.filter(|p| p.len() == prices.len()) {
        return path.to_vec();
    }
    let n = prices.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| prices[a].total_cmp(&prices[b]).then(a.cmp(&b)));
    let third = n / 3;
    let mut labels = vec![RegimeLabel::Medium; n];
    for (rank, &t) in order.iter().enumerate() {
        if rank < third {
            labels[t] = RegimeLabel::Low;
        } else if rank >= n - third {
            labels[t] = RegimeLabel::High;
        }
    }
    labels
}

/// Builds `size` decision vectors of `2 * labels.len()` genes.
///
/// `baseline`, if given, becomes the first individual. Of the rest, a
/// `seeded_fraction` share only charges at Low steps and only discharges at
/// High steps, with random amounts in `[0, p_max]`; the remainder is
/// uniformly random over the whole box.
pub fn initial_population(
    labels: &[RegimeLabel],
    p_max: f64,
    size: usize,
    seeded_fraction: f64,
    baseline: Option<Vec<f64>>,
    rng: &mut StdRng,
) -> Vec<Vec<f64>> {
    let dim = 2 * labels.len();
    let mut population = Vec::with_capacity(size);
    if let Some(baseline) = baseline.filter(|b| b.len() == dim) {
        population.push(baseline);
    }
    let remaining = size.saturating_sub(population.len());
    let seeded = (remaining as f64 * seeded_fraction).round() as usize;

    for i in 0..remaining {
        let mut x = vec![0.0; dim];
        if i < seeded {
            for (t, label) in labels.iter().enumerate() {
                match label {
                    RegimeLabel::Low => x[2 * t] = rng.random_range(0.0..=p_max),
                    RegimeLabel::High => x[2 * t + 1] = rng.random_range(0.0..=p_max),
                    RegimeLabel::Medium => {}
                }
            }
        } else {
            for gene in x.iter_mut() {
                *gene = rng.random_range(0.0..=p_max);
            }
        }
        population.push(x);
    }
    population.truncate(size);
    population
}
