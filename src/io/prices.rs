use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::Deserialize;

use super::IoError;
use crate::series::PriceSeries;

/// One row of a price file. The timestamp column is optional.
#[derive(Debug, Deserialize)]
struct PriceRecord {
    #[serde(default)]
    timestamp: Option<String>,
    price: f64,
}

/// Reads a headed CSV with a `price` column and an optional `timestamp`
/// column.
///
/// Timestamps are kept only if every row has one.
///
/// # Errors
///
/// Returns `IoError::Csv` for malformed rows and `IoError::Data` if the file
/// has no rows.
pub fn read_prices(reader: impl Read) -> Result<PriceSeries, IoError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut prices = Vec::new();
    let mut timestamps = Vec::new();
    for record in rdr.deserialize::<PriceRecord>() {
        let record = record?;
        prices.push(record.price);
        if let Some(ts) = record.timestamp.filter(|ts| !ts.is_empty()) {
            timestamps.push(ts);
        }
    }

    if prices.is_empty() {
        return Err(IoError::Data("price file contains no rows".to_string()));
    }
    if timestamps.len() == prices.len() {
        Ok(PriceSeries {
            prices,
            timestamps: Some(timestamps),
        })
    } else {
        Ok(PriceSeries::new(prices))
    }
}

/// Loads a price CSV from `path`. See [`read_prices`].
///
/// # Errors
///
/// Returns `IoError::Io` if the file cannot be opened.
pub fn load_prices(path: &Path) -> Result<PriceSeries, IoError> {
    let file = File::open(path)?;
    read_prices(BufReader::new(file))
}
