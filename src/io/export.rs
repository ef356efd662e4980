//! CSV export of optimized schedules.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use super::IoError;
use crate::optimizer::OptimizationResult;

/// Column header for schedule export.
const HEADER: &str = "timestep,timestamp,price,regime,charge,discharge,soc,revenue,action";

/// Exports an optimization result's schedule to a CSV file at `path`.
///
/// # Errors
///
/// Returns an `IoError` if file creation or writing fails.
pub fn export_schedule_csv(
    result: &OptimizationResult,
    prices: &[f64],
    path: &Path,
) -> Result<(), IoError> {
    let file = File::create(path)?;
    write_schedule_csv(result, prices, io::BufWriter::new(file))
}

/// Writes one row per timestep: index, timestamp (empty if none), price,
/// decoded regime, charge, discharge, SoC, revenue and action.
///
/// # Arguments
///
/// * `result` - Optimization result holding the schedule and regime path
/// * `prices` - Prices the result was computed from
/// * `writer` - Destination implementing `Write`
///
/// # Errors
///
/// Returns an `IoError` if writing fails.
pub fn write_schedule_csv(
    result: &OptimizationResult,
    prices: &[f64],
    writer: impl Write,
) -> Result<(), IoError> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(HEADER.split(','))?;

    let s = &result.schedule;
    for t in 0..s.len() {
        let timestamp = s
            .timestamps
            .as_ref()
            .and_then(|ts| ts.get(t))
            .map_or("", String::as_str);
        let regime = result
            .path
            .get(t)
            .map_or_else(String::new, ToString::to_string);
        wtr.write_record([
            t.to_string(),
            timestamp.to_string(),
            prices.get(t).map_or_else(String::new, |p| format!("{p:.4}")),
            regime,
            format!("{:.6}", s.charging[t]),
            format!("{:.6}", s.discharging[t]),
            format!("{:.6}", s.soc[t]),
            format!("{:.6}", s.revenue[t]),
            s.action[t].to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::Optimizer;
    use crate::series::PriceSeries;

    fn result() -> (Vec<f64>, OptimizationResult) {
        let prices: Vec<f64> = (0..24)
            .map(|t| 60.0 + 30.0 * ((t as f64) * std::f64::consts::PI / 12.0).sin())
            .collect();
        let series = PriceSeries::with_timestamps(
            prices.clone(),
            (0..24).map(|h| format!("2024-01-01T{h:02}:00")).collect(),
        )
        .expect("aligned");
        let result = Optimizer::default().optimize(&series).expect("optimizes");
        (prices, result)
    }

    #[test]
    fn header_and_row_count() {
        let (prices, result) = result();
        let mut buf = Vec::new();
        write_schedule_csv(&result, &prices, &mut buf).expect("writes");
        let output = String::from_utf8(buf).unwrap_or_default();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], HEADER);
        // 1 header + 24 data rows
        assert_eq!(lines.len(), 25);
        assert!(lines[1].starts_with("0,2024-01-01T00:00,"));
    }

    #[test]
    fn deterministic_output() {
        let (prices, result) = result();
        let mut buf1 = Vec::new();
        let mut buf2 = Vec::new();
        write_schedule_csv(&result, &prices, &mut buf1).expect("writes");
        write_schedule_csv(&result, &prices, &mut buf2).expect("writes");
        assert_eq!(buf1, buf2);
    }

    #[test]
    fn numeric_columns_parse() {
        let (prices, result) = result();
        let mut buf = Vec::new();
        write_schedule_csv(&result, &prices, &mut buf).expect("writes");

        let mut rdr = csv::ReaderBuilder::new().from_reader(buf.as_slice());
        let mut rows = 0;
        for record in rdr.records() {
            let rec = record.expect("every row should parse");
            for i in [2, 4, 5, 6, 7] {
                assert!(rec[i].parse::<f64>().is_ok(), "column {i} should be numeric");
            }
            assert!(["charge", "idle", "discharge"].contains(&&rec[8]));
            assert!(["low", "medium", "high"].contains(&&rec[3]));
            rows += 1;
        }
        assert_eq!(rows, 24);
    }
}
