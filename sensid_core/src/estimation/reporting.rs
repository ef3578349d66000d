// sensid_core/src/estimation/reporting.rs

use std::time::Duration;
use tracing::info;

use crate::params::FreeParameters;

/// Diagnostics emitted once per outer iteration, before the update.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationRecord {
    pub iteration: usize,
    /// `β` the cost was evaluated at.
    pub parameters: FreeParameters,
    pub cost: f64,
}

/// Emitted once when the loop terminates without a fatal error.
#[derive(Debug, Clone, PartialEq)]
pub struct EstimationSummary {
    pub parameters: FreeParameters,
    pub cost: f64,
    pub iterations: usize,
    pub converged: bool,
    pub elapsed: Duration,
}

/// A sink for per-iteration diagnostics and the final summary.
///
/// Reporters observe the run; they cannot influence or abort it.
pub trait Reporter {
    fn on_iteration(&mut self, record: &IterationRecord);

    fn on_finish(&mut self, summary: &EstimationSummary);
}

/// A reporter that drops everything.
#[derive(Default, Debug, Clone)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn on_iteration(&mut self, _record: &IterationRecord) {
        // No-op
    }

    fn on_finish(&mut self, _summary: &EstimationSummary) {
        // No-op
    }
}

/// Keeps every record in memory.
#[derive(Default, Debug, Clone)]
pub struct MemoryReporter {
    pub iterations: Vec<IterationRecord>,
    pub summary: Option<EstimationSummary>,
}

impl Reporter for MemoryReporter {
    fn on_iteration(&mut self, record: &IterationRecord) {
        self.iterations.push(record.clone());
    }

    fn on_finish(&mut self, summary: &EstimationSummary) {
        self.summary = Some(summary.clone());
    }
}

/// Forwards records to the `tracing` subscriber at INFO level.
#[derive(Default, Debug, Clone)]
pub struct TracingReporter;

fn format_parameters(parameters: &FreeParameters) -> String {
    parameters
        .iter()
        .map(|(name, value)| format!("{name}={value:.6}"))
        .collect::<Vec<_>>()
        .join(", ")
}

impl Reporter for TracingReporter {
    fn on_iteration(&mut self, record: &IterationRecord) {
        info!(
            "iteration {}: {} cost={:.6e}",
            record.iteration,
            format_parameters(&record.parameters),
            record.cost
        );
    }

    fn on_finish(&mut self, summary: &EstimationSummary) {
        info!(
            "finished after {} iteration(s) in {:.2?} (converged: {}): {} cost={:.6e}",
            summary.iterations,
            summary.elapsed,
            summary.converged,
            format_parameters(&summary.parameters),
            summary.cost
        );
    }
}

/// Sends every record to each inner reporter in order.
#[derive(Default)]
pub struct FanoutReporter<'a> {
    sinks: Vec<&'a mut dyn Reporter>,
}

impl<'a> FanoutReporter<'a> {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn with(mut self, sink: &'a mut dyn Reporter) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl Reporter for FanoutReporter<'_> {
    fn on_iteration(&mut self, record: &IterationRecord) {
        for sink in self.sinks.iter_mut() {
            sink.on_iteration(record);
        }
    }

    fn on_finish(&mut self, summary: &EstimationSummary) {
        for sink in self.sinks.iter_mut() {
            sink.on_finish(summary);
        }
    }
}
