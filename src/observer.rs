//! Progress callbacks for the schedule search.

use serde::Serialize;
use tracing::debug;

/// Snapshot emitted after every differential-evolution generation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GenerationEvent {
    /// Zero-based generation index.
    pub generation: usize,
    /// Lowest cost seen in any generation so far.
    pub best_cost: f64,
    /// Lowest cost in the current population.
    pub population_best: f64,
}

/// Receives search progress. Implementations must not affect the search.
pub trait SearchObserver {
    fn on_generation(&mut self, event: &GenerationEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl SearchObserver for NoopObserver {
    fn on_generation(&mut self, _event: &GenerationEvent) {}
}

/// Forwards events to `tracing` at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl SearchObserver for TracingObserver {
    fn on_generation(&mut self, event: &GenerationEvent) {
        debug!(
            generation = event.generation,
            best_cost = event.best_cost,
            population_best = event.population_best,
            "generation complete"
        );
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default, Clone)]
pub struct RecordingObserver {
    pub events: Vec<GenerationEvent>,
}

impl SearchObserver for RecordingObserver {
    fn on_generation(&mut self, event: &GenerationEvent) {
        self.events.push(*event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorder_keeps_order() {
        let mut rec = RecordingObserver::default();
        for generation in 0..3 {
            rec.on_generation(&GenerationEvent {
                generation,
                best_cost: -(generation as f64),
                population_best: 0.0,
            });
        }
        let gens: Vec<usize> = rec.events.iter().map(|e| e.generation).collect();
        assert_eq!(gens, vec![0, 1, 2]);
    }
}
