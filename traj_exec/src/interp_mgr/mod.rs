//! # Trajectory interpolation manager
//!
//! The manager owns everything which persists between cycles: the parameters, the smoothers, the
//! ego history and the last valid output. Each cycle it prepares the raw trajectory, runs the
//! interpolation pipeline, and decides what (if anything) is output.
//!
//! When a cycle produces no valid trajectory the last valid output may be republished instead:
//!
//! - with `publish_last_trajectory` set it is always republished,
//! - otherwise with `keep_last_trajectory` set it is republished while it is younger than
//!   `keep_last_trajectory_s`.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod state;

// ---------------------------------------------------------------------------
// EXPORTS
// ---------------------------------------------------------------------------

pub use state::*;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use crate::interp::ParamsError;
use util::params::LoadError;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Potential errors that could occur during initialisation of the manager.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("Could not load the parameters: {0}")]
    ParamLoadError(#[from] LoadError),

    #[error("Invalid parameters: {0}")]
    InvalidParams(#[from] ParamsError),
}

/// Potential errors that can occur during processing.
#[derive(Debug, thiserror::Error)]
pub enum ProcError {
    #[error("The vehicle pose is not finite")]
    InvalidEgoPose,
}
