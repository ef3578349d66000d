// sensid_sim/src/io/mod.rs

//! Everything that touches the filesystem.

pub mod comparison;
pub mod measurements;
pub mod reporter;
