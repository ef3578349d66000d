// sensid_sim/src/prelude.rs

pub use crate::config::{load_scenario, parse_scenario, ScenarioConfig};
pub use crate::io::measurements::{load_observations, write_observations};
pub use crate::io::reporter::{FileReporter, OutputFiles};
pub use crate::pipeline::{render_report, run_batch, run_scenario, BatchEntry, ScenarioOutcome};

pub use sensid_core::prelude::*;
