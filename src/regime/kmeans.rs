use rand::Rng;
use rand::rngs::StdRng;

use super::{N_REGIMES, QuantileClassifier, RegimeClassifier, RegimeLabel, flat_fallback};
use crate::config::RegimeOptions;

/// One-dimensional k-means with `k = 3` and k-means++ seeding.
///
/// Final clusters are relabelled by ascending centroid so Low < Medium < High
/// holds regardless of the order the centroids were seeded in.
#[derive(Debug, Clone, Copy)]
pub struct KMeansClassifier {
    pub max_iterations: usize,
    pub tolerance: f64,
    fallback: QuantileClassifier,
}

impl KMeansClassifier {
    pub fn new(max_iterations: usize, tolerance: f64) -> Self {
        Self {
            max_iterations: max_iterations.max(1),
            tolerance,
            fallback: QuantileClassifier::default(),
        }
    }

    pub fn from_options(options: &RegimeOptions) -> Self {
        Self {
            fallback: QuantileClassifier::from_options(options),
            ..Self::new(options.kmeans_max_iterations, options.kmeans_tolerance)
        }
    }

    /// Runs Lloyd iterations and returns `(centroids, assignment)` with
    /// centroids sorted ascending and assignments pointing into them.
    pub fn fit(&self, prices: &[f64], rng: &mut StdRng) -> ([f64; N_REGIMES], Vec<usize>) {
        let mut centroids = seed_centroids(prices, rng);
        let mut assignment = vec![0usize; prices.len()];

        for _ in 0..self.max_iterations {
            for (slot, &p) in assignment.iter_mut().zip(prices) {
                *slot = nearest(&centroids, p);
            }

            let mut sums = [0.0; N_REGIMES];
            let mut counts = [0usize; N_REGIMES];
            for (&k, &p) in assignment.iter().zip(prices) {
                sums[k] += p;
                counts[k] += 1;
            }

            let mut max_shift = 0.0_f64;
            for k in 0..N_REGIMES {
                // Empty clusters keep their previous centroid.
                if counts[k] > 0 {
                    let updated = sums[k] / counts[k] as f64;
                    max_shift = max_shift.max((updated - centroids[k]).abs());
                    centroids[k] = updated;
                }
            }
            if max_shift < self.tolerance {
                break;
            }
        }

        for (slot, &p) in assignment.iter_mut().zip(prices) {
            *slot = nearest(&centroids, p);
        }

        // Relabel by ascending centroid value.
        let mut order = [0usize, 1, 2];
        order.sort_by(|&a, &b| centroids[a].total_cmp(&centroids[b]));
        let mut rank = [0usize; N_REGIMES];
        for (r, &k) in order.iter().enumerate() {
            rank[k] = r;
        }
        let sorted_centroids = [
            centroids[order[0]],
            centroids[order[1]],
            centroids[order[2]],
        ];
        let assignment = assignment.into_iter().map(|k| rank[k]).collect();
        (sorted_centroids, assignment)
    }
}

impl Default for KMeansClassifier {
    fn default() -> Self {
        Self::new(100, 1e-6)
    }
}

impl RegimeClassifier for KMeansClassifier {
    fn classify(&self, prices: &[f64], rng: &mut StdRng) -> Vec<RegimeLabel> {
        if let Some(labels) = flat_fallback(prices) {
            return labels;
        }
        if distinct_values(prices) < N_REGIMES {
            return self.fallback.classify(prices, rng);
        }
        let (_, assignment) = self.fit(prices, rng);
        assignment
            .into_iter()
            .map(|k| RegimeLabel::from_index(k).unwrap_or(RegimeLabel::Medium))
            .collect()
    }

    fn name(&self) -> &'static str {
        "kmeans"
    }
}

/// k-means++: first centroid uniformly at random, each following one drawn
/// with probability proportional to its squared distance from the nearest
/// centroid chosen so far.
fn seed_centroids(prices: &[f64], rng: &mut StdRng) -> [f64; N_REGIMES] {
    let mut centroids = [prices[rng.random_range(0..prices.len())]; N_REGIMES];

    for k in 1..N_REGIMES {
        let distances: Vec<f64> = prices
            .iter()
            .map(|&p| {
                centroids[..k]
                    .iter()
                    .map(|c| (p - c).powi(2))
                    .fold(f64::INFINITY, f64::min)
            })
            .collect();
        let total: f64 = distances.iter().sum();
        if total <= 0.0 {
            break;
        }

        let mut target = rng.random::<f64>() * total;
        let mut chosen = prices.len() - 1;
        for (i, d) in distances.iter().enumerate() {
            if *d > 0.0 && target < *d {
                chosen = i;
                break;
            }
            target -= d;
        }
        centroids[k] = prices[chosen];
    }
    centroids
}

fn nearest(centroids: &[f64; N_REGIMES], p: f64) -> usize {
    let mut best = 0;
    for k in 1..N_REGIMES {
        if (p - centroids[k]).abs() < (p - centroids[best]).abs() {
            best = k;
        }
    }
    best
}

fn distinct_values(prices: &[f64]) -> usize {
    let sorted = crate::series::sorted(prices);
    let mut count = usize::from(!sorted.is_empty());
    for pair in sorted.windows(2) {
        if pair[1] > pair[0] {
            count += 1;
        }
    }
    count
}
