//! Error types shared by the optimization pipeline.

use thiserror::Error;

pub use crate::config::ConfigError;

/// Failure of the metaheuristic schedule search.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SearchError {
    #[error("no feasible candidate found (best cost {best_cost})")]
    NoFeasibleCandidate { best_cost: f64 },

    #[error("insufficient data: {len} timesteps, at least {min} required")]
    InsufficientData { len: usize, min: usize },
}

/// Caller-facing failure of [`crate::optimizer::Optimizer`].
///
/// Only invalid input, short series, configuration problems and an exhausted
/// fallback surface here; numeric degeneracy is handled inside the pipeline.
#[derive(Debug, Error)]
pub enum OptimizeError {
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("insufficient data: {len} timesteps, at least {min} required")]
    InsufficientData { len: usize, min: usize },

    #[error("schedule search failed: {0}")]
    Search(#[from] SearchError),

    #[error("{0}")]
    Config(#[from] ConfigError),
}

impl OptimizeError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Whether the caller should skip or flag the period instead of retrying.
    pub fn is_insufficient_data(&self) -> bool {
        matches!(self, Self::InsufficientData { .. })
    }
}

pub type Result<T> = std::result::Result<T, OptimizeError>;
