//! Per-timestep charge/discharge schedule and its feasibility repair.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::battery::BatteryParams;

/// Amounts at or below this are treated as no action.
pub const ACTION_EPSILON: f64 = 1e-6;

/// Tolerance on the end-of-horizon SoC target.
const TARGET_TOLERANCE: f64 = 1e-9;

/// What the asset does in one timestep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Action {
    Charge = 0,
    Idle = 1,
    Discharge = 2,
}

impl Action {
    /// Column index in the emission matrix.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_amounts(charge: f64, discharge: f64) -> Self {
        if charge > ACTION_EPSILON {
            Self::Charge
        } else if discharge > ACTION_EPSILON {
            Self::Discharge
        } else {
            Self::Idle
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Charge => "charge",
            Self::Idle => "idle",
            Self::Discharge => "discharge",
        };
        f.write_str(s)
    }
}

/// A feasible schedule: parallel per-timestep arrays.
///
/// At every timestep at most one of `charging`/`discharging` is non-zero,
/// `soc` stays within the battery bounds and
/// `soc[t] = soc[t-1] + charging[t] * efficiency - discharging[t]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub charging: Vec<f64>,
    pub discharging: Vec<f64>,
    /// SoC after each timestep.
    pub soc: Vec<f64>,
    /// Cash flow per timestep: `(discharging - charging) * price`.
    pub revenue: Vec<f64>,
    pub action: Vec<Action>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamps: Option<Vec<String>>,
}

impl Schedule {
    /// Turns requested per-timestep amounts into a feasible schedule.
    ///
    /// Simultaneous charge and discharge are netted against each other,
    /// amounts are clipped to `[0, p_max]` and then to the SoC headroom or
    /// stored energy available at that step. If the horizon would end below
    /// the battery's target SoC, discharges are trimmed cheapest-first until
    /// it does not.
    pub fn realize(
        prices: &[f64],
        battery: &BatteryParams,
        charge: &[f64],
        discharge: &[f64],
        timestamps: Option<&[String]>,
    ) -> Self {
        let Trajectory {
            charging,
            discharging,
            soc,
            ..
        } = repair(prices, battery, charge, discharge);
        let revenue = prices
            .iter()
            .zip(charging.iter().zip(&discharging))
            .map(|(p, (c, d))| (d - c) * p)
            .collect();
        let action = charging
            .iter()
            .zip(&discharging)
            .map(|(&c, &d)| Action::from_amounts(c, d))
            .collect();

        Self {
            charging,
            discharging,
            soc,
            revenue,
            action,
            timestamps: timestamps.map(<[String]>::to_vec),
        }
    }

    /// An all-idle schedule holding the initial SoC.
    pub fn idle(prices: &[f64], battery: &BatteryParams, timestamps: Option<&[String]>) -> Self {
        let zeros = vec![0.0; prices.len()];
        Self::realize(prices, battery, &zeros, &zeros, timestamps)
    }

    pub fn len(&self) -> usize {
        self.soc.len()
    }

    pub fn is_empty(&self) -> bool {
        self.soc.is_empty()
    }

    /// Interleaved decision vector `[c0, d0, c1, d1, ...]`.
    pub fn to_decision_vector(&self) -> Vec<f64> {
        self.charging
            .iter()
            .zip(&self.discharging)
            .flat_map(|(&c, &d)| [c, d])
            .collect()
    }

    /// Whether every schedule invariant holds within `tolerance`.
    pub fn is_feasible(&self, battery: &BatteryParams, tolerance: f64) -> bool {
        let mut prev = battery.initial_soc();
        for t in 0..self.len() {
            let (c, d, soc) = (self.charging[t], self.discharging[t], self.soc[t]);
            if c * d != 0.0 || c < 0.0 || d < 0.0 {
                return false;
            }
            if c > battery.p_max + tolerance || d > battery.p_max + tolerance {
                return false;
            }
            if soc < battery.soc_min - tolerance || soc > battery.soc_max + tolerance {
                return false;
            }
            if (battery.next_soc(prev, c, d) - soc).abs() > tolerance {
                return false;
            }
            prev = soc;
        }
        true
    }
}

/// Projects an interleaved decision vector `[c0, d0, c1, d1, ...]` in place
/// onto the amounts [`Schedule::realize`] would execute for it.
///
/// Projecting a vector twice leaves it unchanged.
pub fn project_decision_vector(prices: &[f64], battery: &BatteryParams, x: &mut [f64]) {
    let (charge, discharge): (Vec<f64>, Vec<f64>) =
        x.chunks_exact(2).map(|g| (g[0], g[1])).unzip();
    let trajectory = repair(prices, battery, &charge, &discharge);
    for (t, genes) in x.chunks_exact_mut(2).enumerate() {
        genes[0] = trajectory.charging[t];
        genes[1] = trajectory.discharging[t];
    }
}

fn repair(
    prices: &[f64],
    battery: &BatteryParams,
    charge: &[f64],
    discharge: &[f64],
) -> Trajectory {
    let n = prices.len();
    let mut req_charge = vec![0.0; n];
    let mut req_discharge = vec![0.0; n];
    for t in 0..n {
        let c = charge.get(t).copied().unwrap_or(0.0).clamp(0.0, battery.p_max);
        let d = discharge.get(t).copied().unwrap_or(0.0).clamp(0.0, battery.p_max);
        let net = c - d;
        if net > ACTION_EPSILON {
            req_charge[t] = net;
        } else if net < -ACTION_EPSILON {
            req_discharge[t] = -net;
        }
    }

    let target = battery.target_soc();
    let mut cheapest_first: Vec<usize> = (0..n).collect();
    cheapest_first.sort_by(|&a, &b| prices[a].total_cmp(&prices[b]).then(a.cmp(&b)));

    let mut trajectory = simulate(battery, &req_charge, &req_discharge);
    // Each pass lowers total requested discharge; the cap only guards
    // against slow convergence on many tiny discharges.
    for _ in 0..4 * n + 4 {
        let deficit = target - trajectory.final_soc;
        if deficit <= TARGET_TOLERANCE {
            break;
        }
        let Some(&t) = cheapest_first
            .iter()
            .find(|&&t| req_discharge[t] > ACTION_EPSILON)
        else {
            break;
        };
        req_discharge[t] = (req_discharge[t] - deficit).max(0.0);
        if req_discharge[t] <= ACTION_EPSILON {
            req_discharge[t] = 0.0;
        }
        trajectory = simulate(battery, &req_charge, &req_discharge);
    }
    if target - trajectory.final_soc > TARGET_TOLERANCE {
        req_discharge.iter_mut().for_each(|d| *d = 0.0);
        trajectory = simulate(battery, &req_charge, &req_discharge);
    }
    trajectory
}

struct Trajectory {
    charging: Vec<f64>,
    discharging: Vec<f64>,
    soc: Vec<f64>,
    final_soc: f64,
}

/// Forward pass clipping each request to what the SoC allows at that step.
fn simulate(battery: &BatteryParams, charge: &[f64], discharge: &[f64]) -> Trajectory {
    let n = charge.len();
    let mut soc = battery.initial_soc();
    let mut out = Trajectory {
        charging: vec![0.0; n],
        discharging: vec![0.0; n],
        soc: Vec::with_capacity(n),
        final_soc: soc,
    };
    for t in 0..n {
        let c = charge[t].min(battery.max_charge(soc));
        let d = discharge[t].min(battery.max_discharge(soc));
        if c > ACTION_EPSILON {
            out.charging[t] = c;
        } else if d > ACTION_EPSILON {
            out.discharging[t] = d;
        }
        soc = battery.clamp_soc(battery.next_soc(soc, out.charging[t], out.discharging[t]));
        out.soc.push(soc);
    }
    out.final_soc = soc;
    out
}
