//! CSV input of price series and CSV output of schedules.

/// Schedule export.
pub mod export;
/// Price series loading.
pub mod prices;

use thiserror::Error;

pub use export::{export_schedule_csv, write_schedule_csv};
pub use prices::{load_prices, read_prices};

/// Failure reading or writing a data file.
#[derive(Debug, Error)]
pub enum IoError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid price data: {0}")]
    Data(String),
}
