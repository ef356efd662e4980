//! Post-hoc KPI computation from a realized schedule.

use std::fmt;

use serde::Serialize;

use crate::battery::BatteryParams;
use crate::cycles::count_cycles;
use crate::schedule::{Action, Schedule};
use crate::series;

/// Aggregate performance indicators of one optimized horizon.
///
/// Computed from the schedule arrays so reported totals always agree with
/// the per-timestep data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiReport {
    /// Net cash flow, sum of `(discharge - charge) * price`.
    pub total_revenue: f64,
    /// Energy bought.
    pub energy_charged: f64,
    /// Energy sold.
    pub energy_discharged: f64,
    /// `energy_discharged / energy_charged`, 0 when nothing was charged.
    pub operational_efficiency: f64,
    /// Mean price over the horizon.
    pub average_price: f64,
    /// Half-cycles of the SoC trajectory.
    pub half_cycles: usize,
    /// Volume-weighted price of charge actions.
    pub charge_vwap: Option<f64>,
    /// Volume-weighted price of discharge actions.
    pub discharge_vwap: Option<f64>,
    pub charge_steps: usize,
    pub idle_steps: usize,
    pub discharge_steps: usize,
}

impl KpiReport {
    /// Computes all KPIs for `schedule` executed against `prices`.
    ///
    /// # Arguments
    ///
    /// * `schedule` - Realized schedule
    /// * `prices` - Prices the schedule was optimized against
    /// * `battery` - Battery the schedule runs on, for cycle counting
    pub fn from_schedule(schedule: &Schedule, prices: &[f64], battery: &BatteryParams) -> Self {
        let mut charged = 0.0;
        let mut discharged = 0.0;
        let mut charge_cost = 0.0;
        let mut discharge_value = 0.0;
        let mut counts = [0_usize; 3];

        for (t, &price) in prices.iter().enumerate().take(schedule.len()) {
            let c = schedule.charging[t];
            let d = schedule.discharging[t];
            charged += c;
            discharged += d;
            charge_cost += c * price;
            discharge_value += d * price;
            counts[schedule.action[t].index()] += 1;
        }

        // soc[0] is already after the first step
        let trajectory: Vec<f64> = std::iter::once(battery.initial_soc())
            .chain(schedule.soc.iter().copied())
            .collect();
        let vwap = |value: f64, volume: f64| (volume > 0.0).then(|| value / volume);

        Self {
            total_revenue: schedule.revenue.iter().sum(),
            energy_charged: charged,
            energy_discharged: discharged,
            operational_efficiency: if charged > 0.0 {
                discharged / charged
            } else {
                0.0
            },
            average_price: series::mean(prices),
            half_cycles: count_cycles(&trajectory, battery),
            charge_vwap: vwap(charge_cost, charged),
            discharge_vwap: vwap(discharge_value, discharged),
            charge_steps: counts[Action::Charge.index()],
            idle_steps: counts[Action::Idle.index()],
            discharge_steps: counts[Action::Discharge.index()],
        }
    }

    /// Discharge VWAP minus charge VWAP, when both sides traded.
    pub fn price_spread(&self) -> Option<f64> {
        Some(self.discharge_vwap? - self.charge_vwap?)
    }
}

impl fmt::Display for KpiReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let opt = |v: Option<f64>| v.map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}"));
        writeln!(f, "--- KPI Report ---")?;
        writeln!(f, "Total revenue:         {:.2}", self.total_revenue)?;
        writeln!(f, "Energy charged:        {:.3}", self.energy_charged)?;
        writeln!(f, "Energy discharged:     {:.3}", self.energy_discharged)?;
        writeln!(
            f,
            "Operational efficiency: {:.1}%",
            100.0 * self.operational_efficiency
        )?;
        writeln!(f, "Average price:         {:.2}", self.average_price)?;
        writeln!(f, "Charge VWAP:           {}", opt(self.charge_vwap))?;
        writeln!(f, "Discharge VWAP:        {}", opt(self.discharge_vwap))?;
        writeln!(f, "Half cycles:           {}", self.half_cycles)?;
        write!(
            f,
            "Actions:               {} charge / {} idle / {} discharge",
            self.charge_steps, self.idle_steps, self.discharge_steps
        )
    }
}
