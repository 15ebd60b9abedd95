//! # Trajectory interpolation module
//!
//! Trajectory interpolation post-processes the raw candidate trajectory produced by the planner
//! into a trajectory which the controller can track. The processing runs once per planning cycle
//! as a fixed sequence of stages, each enabled by a parameter toggle:
//!
//! 1. Sanitisation - points closer than 1 cm to their predecessor are removed, the orientation of
//!    each point is reset to point at its successor, and points making a turn sharper than 90
//!    degrees are removed until the trajectory stops changing.
//! 1. Velocity shaping - when the vehicle is slower than the pull-out speed the profile is
//!    floored at the pull-out speed and acceleration, and the profile is capped at the maximum
//!    speed.
//! 1. Velocity smoothing - an external smoother limits lateral acceleration and steering rate,
//!    resamples the trajectory, and optimises the profile starting from the vehicle.
//! 1. Spline re-interpolation - the geometry is replaced by an Akima spline through the points,
//!    sampled at a fixed arc-length resolution.
//! 1. Elastic band smoothing - an external path smoother relaxes the geometry.
//! 1. Timing - the time from start of every point is recomputed from the vehicle position.
//!
//! Every stage degrades locally: a failing stage leaves the trajectory as it was (or as documented
//! on the corresponding [`InterpError`] variant) and the cycle continues. Only a trajectory with
//! fewer than two points at the end of the cycle results in no output.
//!
//! The velocity smoother and path smoother are long-lived collaborators implementing
//! [`VelocitySmoother`] and [`PathSmoother`]. Reference implementations are provided by
//! [`AccelLimitedSmoother`] and [`ElasticBand`].

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod accel_limited;
pub mod elastic_band;
pub mod geom;
pub mod history;
pub mod params;
pub mod path_smoother;
pub mod pipeline;
pub mod resample;
pub mod sanitise;
pub mod spline;
pub mod vel_smoother;
pub mod velocity;

// ---------------------------------------------------------------------------
// EXPORTS
// ---------------------------------------------------------------------------

pub use accel_limited::{AccelLimitedParams, AccelLimitedSmoother};
pub use elastic_band::{ElasticBand, ElasticBandParams};
pub use params::{Params, ParamsError};
pub use path_smoother::PathSmoother;
pub use pipeline::{interpolate_trajectory, Collaborators};
pub use spline::SplineError;
pub use vel_smoother::{SmootherError, VelocitySmoother};
pub use velocity::InitialMotion;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;
use std::fmt::{self, Display};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Minimum number of points for a trajectory to be processed.
pub const MIN_TRAJ_POINTS: usize = 2;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Report on the processing performed during one cycle.
#[derive(Debug, Default, Clone, Serialize)]
pub struct StatusReport {
    /// Number of points in the raw trajectory
    pub num_input_points: usize,

    /// Number of points in the processed trajectory
    pub num_output_points: usize,

    /// Number of points removed by sanitisation
    pub num_sanitised_points: usize,

    /// The initial motion the profile was built from
    pub initial_motion: InitialMotion,

    /// If true the profile was floored at the pull-out speed and acceleration
    pub engage_clamp_applied: bool,

    /// If true the profile was capped at the maximum speed
    pub velocity_limited: bool,

    /// If true velocity smoothing could not run or stopped early
    pub velocity_smoothing_skipped: bool,

    /// If true the velocity optimisation failed and the pre-optimisation profile was kept
    pub optimisation_failed: bool,

    /// If true the spline re-interpolation failed and the geometry was kept
    pub spline_failed: bool,

    /// If true the elastic band could not be run
    pub elastic_band_failed: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The stages of the pipeline, used to locate errors.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum Stage {
    Sanitise,
    Spline,
    TimeResample,
    Output,
}

/// Errors which can occur in the stages of the pipeline.
///
/// None of these are fatal. Unless documented otherwise the stage which raised the error has left
/// the trajectory unmodified.
#[derive(Debug, thiserror::Error)]
pub enum InterpError {
    /// The trajectory had too few points for the stage to run.
    #[error("Not enough points in trajectory during {stage} (found {num_points}, need at least 2)")]
    InsufficientPoints { stage: Stage, num_points: usize },

    #[error("The velocity smoother has not been initialised")]
    SmootherNotInit,

    #[error("The elastic band path smoother has not been initialised")]
    PathSmootherNotInit,

    /// The velocity optimisation failed. The trajectory holds the filtered, resampled and clipped
    /// profile from before the optimisation.
    #[error("Failed to solve the velocity optimisation: {0}")]
    OptimisationFailed(SmootherError),

    #[error("Spline interpolation failed: {0}")]
    SplineFailed(SplineError),

    #[error("Time step of {0} s is below the minimum of 0.01 s")]
    InvalidTimeStep(f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Sanitise => "sanitisation",
            Stage::Spline => "spline interpolation",
            Stage::TimeResample => "time resampling",
            Stage::Output => "output",
        };
        write!(f, "{}", name)
    }
}

impl InterpError {
    /// Build an `InsufficientPoints` error for the given stage.
    pub fn insufficient(stage: Stage, num_points: usize) -> Self {
        InterpError::InsufficientPoints { stage, num_points }
    }
}
