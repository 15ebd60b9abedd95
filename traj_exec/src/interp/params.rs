//! Trajectory interpolation parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// Internal
use super::{AccelLimitedParams, ElasticBandParams};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for trajectory interpolation
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Params {
    /// Distance within which a trajectory point is considered near the vehicle. Also the distance
    /// above which the vehicle is considered to have jumped away from its history.
    pub nearest_dist_threshold_m: f64,

    /// Heading difference within which a trajectory point is considered aligned with the vehicle.
    pub nearest_yaw_threshold_rad: f64,

    /// Speed the trajectory starts from when the vehicle is slower than this.
    pub target_pull_out_speed_mps: f64,

    /// Acceleration the trajectory starts from when the vehicle is slower than the pull-out
    /// speed.
    pub target_pull_out_acc_mps2: f64,

    /// Maximum speed of the trajectory when `limit_velocity` is set.
    pub max_speed_mps: f64,

    /// Arc-length separation of the points produced by spline re-interpolation.
    pub spline_interpolation_resolution_m: f64,

    /// Length of the ego history kept behind the vehicle.
    pub backward_path_extension_m: f64,

    /// Maximum age of the last output for it to be republished on a failed cycle.
    pub keep_last_trajectory_s: f64,

    /// Re-interpolate the trajectory geometry with an Akima spline.
    pub use_akima_spline_interpolation: bool,

    /// Smooth the velocity profile with the velocity smoother.
    pub smooth_velocities: bool,

    /// Smooth the geometry with the elastic band.
    pub smooth_trajectories: bool,

    /// Cap the velocity profile at `max_speed_mps`.
    pub limit_velocity: bool,

    /// Remove overlapping points and points with invalid orientation.
    pub fix_invalid_points: bool,

    /// Republish the last output on a failed cycle regardless of its age.
    pub publish_last_trajectory: bool,

    /// Republish the last output on a failed cycle if it is younger than
    /// `keep_last_trajectory_s`.
    pub keep_last_trajectory: bool,

    /// Prepend the ego history to the raw trajectory before processing.
    pub extend_trajectory_backward: bool,

    /// If set the output is resampled at this fixed time step.
    pub output_time_step_s: Option<f64>,

    /// Parameters of the reference velocity smoother
    pub velocity_smoother: AccelLimitedParams,

    /// Parameters of the reference elastic band
    pub elastic_band: ElasticBandParams,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Reasons a parameter set can be rejected.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ParamsError {
    #[error("Parameter `{0}` must be strictly positive, found {1}")]
    NotPositive(&'static str, f64),

    #[error("Parameter `{0}` must not be negative, found {1}")]
    IsNegative(&'static str, f64),

    #[error("Parameter `{0}` must be strictly negative, found {1}")]
    NotNegative(&'static str, f64),

    #[error("Parameter `{name}` must be between {min} and {max}, found {value}")]
    OutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("The output time step must be at least 0.01 s, found {0}")]
    TimeStepTooSmall(f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            nearest_dist_threshold_m: 3.0,
            nearest_yaw_threshold_rad: 1.046,
            target_pull_out_speed_mps: 1.0,
            target_pull_out_acc_mps2: 1.0,
            max_speed_mps: 8.33,
            spline_interpolation_resolution_m: 0.5,
            backward_path_extension_m: 5.0,
            keep_last_trajectory_s: 1.0,
            use_akima_spline_interpolation: true,
            smooth_velocities: true,
            smooth_trajectories: false,
            limit_velocity: true,
            fix_invalid_points: true,
            publish_last_trajectory: false,
            keep_last_trajectory: true,
            extend_trajectory_backward: false,
            output_time_step_s: None,
            velocity_smoother: AccelLimitedParams::default(),
            elastic_band: ElasticBandParams::default(),
        }
    }
}

impl Params {
    /// Check that the parameters are usable.
    pub fn validate(&self) -> Result<(), ParamsError> {
        positive("nearest_dist_threshold_m", self.nearest_dist_threshold_m)?;
        positive("nearest_yaw_threshold_rad", self.nearest_yaw_threshold_rad)?;
        positive(
            "spline_interpolation_resolution_m",
            self.spline_interpolation_resolution_m,
        )?;
        positive("max_speed_mps", self.max_speed_mps)?;
        not_negative("target_pull_out_speed_mps", self.target_pull_out_speed_mps)?;
        not_negative("backward_path_extension_m", self.backward_path_extension_m)?;
        not_negative("keep_last_trajectory_s", self.keep_last_trajectory_s)?;

        if let Some(dt) = self.output_time_step_s {
            if !(dt >= super::resample::MIN_TIME_STEP_S) {
                return Err(ParamsError::TimeStepTooSmall(dt));
            }
        }

        self.velocity_smoother.validate()?;
        self.elastic_band.validate()?;

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Check that a parameter is strictly positive (NaN is rejected).
pub(crate) fn positive(name: &'static str, value: f64) -> Result<(), ParamsError> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(ParamsError::NotPositive(name, value))
    }
}

/// Check that a parameter is within `[min, max]` (NaN is rejected).
pub(crate) fn in_range(
    name: &'static str,
    value: f64,
    min: f64,
    max: f64,
) -> Result<(), ParamsError> {
    if value >= min && value <= max {
        Ok(())
    } else {
        Err(ParamsError::OutOfRange {
            name,
            value,
            min,
            max,
        })
    }
}

/// Check that a parameter is strictly negative (NaN is rejected).
pub(crate) fn negative(name: &'static str, value: f64) -> Result<(), ParamsError> {
    if value < 0.0 {
        Ok(())
    } else {
        Err(ParamsError::NotNegative(name, value))
    }
}

/// Check that a parameter is zero or positive (NaN is rejected).
pub(crate) fn not_negative(name: &'static str, value: f64) -> Result<(), ParamsError> {
    if value >= 0.0 {
        Ok(())
    } else {
        Err(ParamsError::IsNegative(name, value))
    }
}
