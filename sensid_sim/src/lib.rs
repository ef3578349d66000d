// sensid_sim/src/lib.rs

// This prelude is for convenience for other files WITHIN the sensid_sim crate
// and for the integration tests.
pub mod prelude;

pub mod cli;
pub mod config;
pub mod io;
pub mod logging;
pub mod pipeline;
pub mod synthetic;
