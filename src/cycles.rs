//! Half-cycle counting over a state-of-charge trajectory.

use crate::battery::BatteryParams;

/// Steps moving less than this share of the SoC range are neutral.
pub const NOISE_FLOOR_FRACTION: f64 = 0.1;
/// A segment must traverse at least this share of the SoC range to count.
pub const HALF_CYCLE_FRACTION: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Up,
    Down,
}

/// Counts directional half-cycles in `soc`.
///
/// A half-cycle is counted when the direction of travel reverses and the SoC
/// moved at least half the usable range since the previous reversal. A final
/// segment meeting the same threshold counts as a trailing half-cycle. Steps
/// smaller than 10% of the range are ignored when detecting direction.
pub fn count_cycles(soc: &[f64], battery: &BatteryParams) -> usize {
    let range = battery.soc_range();
    if soc.len() < 2 || range <= 0.0 {
        return 0;
    }
    let noise = NOISE_FLOOR_FRACTION * range;
    let threshold = HALF_CYCLE_FRACTION * range;

    let mut count = 0;
    let mut direction: Option<Direction> = None;
    let mut segment_start = soc[0];

    for i in 1..soc.len() {
        let delta = soc[i] - soc[i - 1];
        if delta.abs() < noise {
            continue;
        }
        let dir = if delta > 0.0 {
            Direction::Up
        } else {
            Direction::Down
        };
        if direction.is_some_and(|d| d != dir) {
            if (soc[i - 1] - segment_start).abs() >= threshold {
                count += 1;
            }
            segment_start = soc[i - 1];
        }
        direction = Some(dir);
    }

    if let Some(last) = soc.last() {
        if direction.is_some() && (last - segment_start).abs() >= threshold {
            count += 1;
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    fn battery() -> BatteryParams {
        BatteryParams::new(5.0, 10.0, 50.0, 0.85)
    }

    fn ramp(from: f64, to: f64, step: f64) -> Vec<f64> {
        let n = ((to - from).abs() / step).round() as usize;
        let sign = if to >= from { 1.0 } else { -1.0 };
        (1..=n).map(|k| from + sign * step * k as f64).collect()
    }

    #[test]
    fn flat_trajectory_has_no_cycles() {
        assert_eq!(count_cycles(&[30.0; 24], &battery()), 0);
        assert_eq!(count_cycles(&[], &battery()), 0);
    }

    #[test]
    fn full_swing_counts_two_half_cycles() {
        let mut soc = vec![10.0];
        soc.extend(ramp(10.0, 50.0, 5.0));
        soc.extend(ramp(50.0, 10.0, 5.0));
        assert_eq!(count_cycles(&soc, &battery()), 2);
    }

    #[test]
    fn micro_oscillations_are_ignored() {
        let soc = [30.0, 35.0, 30.0, 35.0, 30.0, 35.0];
        assert_eq!(count_cycles(&soc, &battery()), 0);
    }

    #[test]
    fn noise_is_neutral() {
        let soc = [30.0, 31.0, 30.0, 31.0, 30.0];
        assert_eq!(count_cycles(&soc, &battery()), 0);
    }

    #[test]
    fn more_reversals_never_count_less() {
        let mut soc = vec![10.0];
        soc.extend(ramp(10.0, 50.0, 5.0));
        soc.extend(ramp(50.0, 10.0, 5.0));
        let before = count_cycles(&soc, &battery());
        soc.extend(ramp(10.0, 50.0, 5.0));
        let after = count_cycles(&soc, &battery());
        assert!(after >= before);
        assert_eq!(after, 3);
    }

    #[test]
    fn degenerate_range() {
        let b = BatteryParams::new(5.0, 20.0, 20.0, 0.9);
        assert_eq!(count_cycles(&[20.0, 20.0], &b), 0);
    }
}
