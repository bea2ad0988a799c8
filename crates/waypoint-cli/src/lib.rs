//! Waypoint command line support
//!
//! The binary is a thin clap front end; the work lives here so it can be
//! tested without spawning processes.

pub mod simulate;
pub mod stages;

pub use simulate::{run_simulation, SimulationOptions, SimulationReport};
pub use stages::{stage_table, StageRow};
