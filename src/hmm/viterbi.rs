//! Log-domain Viterbi decoding over the three price regimes.

use serde::{Deserialize, Serialize};

use super::{EmissionMatrix, TransitionMatrix};
use crate::regime::{N_REGIMES, RegimeLabel};
use crate::schedule::Action;

/// Probabilities below this are floored before taking logs.
pub const PROBABILITY_FLOOR: f64 = 1e-3;

/// Uniform initial regime distribution.
pub const UNIFORM_INITIAL: [f64; N_REGIMES] = [1.0 / 3.0; N_REGIMES];

/// Most likely regime path and its joint log-likelihood.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedPath {
    pub path: Vec<RegimeLabel>,
    pub log_likelihood: f64,
}

/// Decodes with a uniform initial distribution.
pub fn decode(
    observations: &[Action],
    transition: &TransitionMatrix,
    emission: &EmissionMatrix,
) -> DecodedPath {
    decode_with_initial(observations, transition, emission, &UNIFORM_INITIAL)
}

/// Standard Viterbi recursion in log space.
///
/// `V[0][s] = ln π[s] + ln B[s][o0]` and
/// `V[t][s] = max_p (V[t-1][p] + ln A[p][s]) + ln B[s][o_t]`, backtracking
/// from the best final state. An empty observation sequence yields an empty
/// path with log-likelihood 0.
pub fn decode_with_initial(
    observations: &[Action],
    transition: &TransitionMatrix,
    emission: &EmissionMatrix,
    initial: &[f64; N_REGIMES],
) -> DecodedPath {
    let Some(first) = observations.first() else {
        return DecodedPath {
            path: Vec::new(),
            log_likelihood: 0.0,
        };
    };

    let log_a = log_matrix(transition.rows());
    let log_b = log_matrix(emission.rows());

    let mut scores = [0.0; N_REGIMES];
    for s in 0..N_REGIMES {
        scores[s] = floored_ln(initial[s]) + log_b[s][first.index()];
    }

    let mut backpointers: Vec<[usize; N_REGIMES]> = Vec::with_capacity(observations.len());
    for obs in &observations[1..] {
        let mut next = [f64::NEG_INFINITY; N_REGIMES];
        let mut back = [0usize; N_REGIMES];
        for s in 0..N_REGIMES {
            for p in 0..N_REGIMES {
                let candidate = scores[p] + log_a[p][s];
                if candidate > next[s] {
                    next[s] = candidate;
                    back[s] = p;
                }
            }
            next[s] += log_b[s][obs.index()];
        }
        scores = next;
        backpointers.push(back);
    }

    let (mut state, log_likelihood) = argmax(&scores);
    let mut path = vec![RegimeLabel::Medium; observations.len()];
    path[observations.len() - 1] = RegimeLabel::ALL[state];
    for (t, back) in backpointers.iter().enumerate().rev() {
        state = back[state];
        path[t] = RegimeLabel::ALL[state];
    }

    DecodedPath {
        path,
        log_likelihood,
    }
}

fn floored_ln(p: f64) -> f64 {
    if p.is_finite() {
        p.max(PROBABILITY_FLOOR).ln()
    } else {
        PROBABILITY_FLOOR.ln()
    }
}

fn log_matrix(m: &[[f64; N_REGIMES]; N_REGIMES]) -> [[f64; N_REGIMES]; N_REGIMES] {
    let mut out = [[0.0; N_REGIMES]; N_REGIMES];
    for (out_row, row) in out.iter_mut().zip(m) {
        for (cell, p) in out_row.iter_mut().zip(row) {
            *cell = floored_ln(*p);
        }
    }
    out
}

/// First index of the maximum score; ties resolve to the lower regime.
fn argmax(scores: &[f64; N_REGIMES]) -> (usize, f64) {
    let mut best = 0;
    for s in 1..N_REGIMES {
        if scores[s] > scores[best] {
            best = s;
        }
    }
    (best, scores[best])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hmm::{Matrix3, heuristic_actions};

    fn sticky() -> TransitionMatrix {
        TransitionMatrix([[0.8, 0.1, 0.1], [0.1, 0.8, 0.1], [0.1, 0.1, 0.8]])
    }

    fn informative() -> EmissionMatrix {
        EmissionMatrix([[0.8, 0.15, 0.05], [0.1, 0.8, 0.1], [0.05, 0.15, 0.8]])
    }

    #[test]
    fn empty_observations_give_empty_path() {
        let decoded = decode(&[], &sticky(), &informative());
        assert!(decoded.path.is_empty());
        assert_eq!(decoded.log_likelihood, 0.0);
    }

    #[test]
    fn constant_observations_give_constant_path() {
        let obs = vec![Action::Idle; 20];
        let decoded = decode(&obs, &sticky(), &informative());
        assert_eq!(decoded.path, vec![RegimeLabel::Medium; 20]);
    }

    #[test]
    fn follows_clear_signal() {
        use Action::*;
        let obs = [Charge, Charge, Charge, Idle, Idle, Discharge, Discharge, Discharge];
        let decoded = decode(&obs, &sticky(), &informative());
        assert_eq!(decoded.path[0], RegimeLabel::Low);
        assert_eq!(decoded.path[4], RegimeLabel::Medium);
        assert_eq!(decoded.path[7], RegimeLabel::High);
        assert!(decoded.log_likelihood < 0.0);
    }

    #[test]
    fn sticky_transitions_smooth_isolated_blips() {
        use Action::*;
        let very_sticky = TransitionMatrix([
            [0.98, 0.01, 0.01],
            [0.01, 0.98, 0.01],
            [0.01, 0.01, 0.98],
        ]);
        let obs = [Idle, Idle, Idle, Charge, Idle, Idle, Idle];
        let decoded = decode(&obs, &very_sticky, &informative());
        assert_eq!(decoded.path, vec![RegimeLabel::Medium; 7]);
    }

    #[test]
    fn zero_entries_do_not_produce_infinities() {
        let zeros: Matrix3 = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        let obs = heuristic_actions(&[10.0, 100.0, 200.0, 10.0]);
        let decoded = decode(&obs, &TransitionMatrix(zeros), &EmissionMatrix(zeros));
        assert!(decoded.log_likelihood.is_finite());
        assert_eq!(decoded.path.len(), 4);
    }

    #[test]
    fn initial_distribution_breaks_ties() {
        let uniform = TransitionMatrix([[1.0 / 3.0; 3]; 3]);
        let flat = EmissionMatrix([[1.0 / 3.0; 3]; 3]);
        let decoded = decode_with_initial(&[Action::Idle], &uniform, &flat, &[0.1, 0.1, 0.8]);
        assert_eq!(decoded.path, vec![RegimeLabel::High]);
    }
}
