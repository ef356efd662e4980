//! Regime-guided battery arbitrage optimizer.
//!
//! Classifies prices into Low/Medium/High regimes, fits a small hidden
//! Markov model over them, decodes the most likely regime path and uses it
//! to steer a differential-evolution search for a charge/discharge schedule.

pub mod battery;
/// Command-line parsing for the binary.
pub mod cli;
pub mod config;
pub mod cycles;
pub mod error;
/// Transition/emission matrices and Viterbi decoding.
pub mod hmm;
pub mod io;
pub mod kpi;
pub mod logging;
pub mod observer;
pub mod optimizer;
/// Price regime classifiers.
pub mod regime;
pub mod schedule;
/// Differential-evolution schedule search and greedy fallback.
pub mod search;
pub mod series;

pub use battery::BatteryParams;
pub use config::OptimizerConfig;
pub use error::{OptimizeError, SearchError};
pub use optimizer::{Analysis, OptimizationResult, Optimizer, ScheduleMethod};
pub use regime::{ClassificationMethod, RegimeLabel};
pub use schedule::{Action, Schedule};
pub use series::PriceSeries;
