//! Lightweight stage timing for run summaries.
//!
//! Every adapter run is a short batch job; the run service records how long
//! each conversion stage and the engine itself took and reports it back to
//! the caller.

use std::time::Instant;

/// A simple timer that measures elapsed wall time.
pub struct Timer {
    label: &'static str,
    start: Instant,
}

impl Timer {
    /// Create and start a new timer with the given label.
    pub fn start(label: &'static str) -> Self {
        Self {
            label,
            start: Instant::now(),
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Elapsed time in seconds without stopping the timer.
    pub fn elapsed_s(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    /// Stop the timer and return elapsed time in seconds.
    pub fn stop(self) -> f64 {
        self.elapsed_s()
    }
}

/// Durations of the individual pipeline stages, in seconds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageTimings {
    pub entries: Vec<(&'static str, f64)>,
}

impl StageTimings {
    /// Stop `timer` and record it under its label.
    pub fn record(&mut self, timer: Timer) -> f64 {
        let label = timer.label();
        let elapsed = timer.stop();
        self.entries.push((label, elapsed));
        elapsed
    }

    pub fn get(&self, label: &str) -> Option<f64> {
        self.entries
            .iter()
            .filter(|(l, _)| *l == label)
            .map(|(_, s)| *s)
            .reduce(|a, b| a + b)
    }

    pub fn total_s(&self) -> f64 {
        self.entries.iter().map(|(_, s)| s).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_by_label() {
        let mut timings = StageTimings::default();
        timings.record(Timer::start("ingest"));
        timings.record(Timer::start("engine"));
        timings.record(Timer::start("ingest"));

        assert_eq!(timings.entries.len(), 3);
        assert!(timings.get("ingest").is_some());
        assert!(timings.get("aggregate").is_none());
        assert!(timings.total_s() >= 0.0);
    }
}
