// sensid_core/src/lib.rs

// This file defines the public modules of the library.
pub mod error;
pub mod estimation;
pub mod models;
pub mod params;
pub mod prelude;
pub mod sensitivity;
pub mod simulation;
pub mod trajectory;
pub mod types;
pub mod utils;
