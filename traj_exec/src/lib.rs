//! # Trajectory interpolation library.
//!
//! This library allows other crates in the workspace, and the benchmarks, to access items defined
//! inside the trajectory interpolation crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Trajectory interpolation - turns the raw planner trajectory into one the controller can track
pub mod interp;

/// Trajectory interpolation manager - keeps the state carried between cycles
pub mod interp_mgr;
