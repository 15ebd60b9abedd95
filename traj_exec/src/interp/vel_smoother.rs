//! # Velocity smoother interface
//!
//! The velocity smoother is an external collaborator which reshapes the velocity profile of a
//! trajectory so that it is comfortable and trackable. This module defines the interface the
//! pipeline needs from it, and the adapter which drives it once per cycle.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::msg::{Odometry, Pose, TrajectoryPoint};
use log::debug;

use super::geom;
use super::{InitialMotion, InterpError, Params, MIN_TRAJ_POINTS};

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Operations the pipeline requires from a velocity smoother.
///
/// Only [`VelocitySmoother::apply`] may keep state between calls.
pub trait VelocitySmoother {
    /// Limit the velocity of each point so that the lateral acceleration in curves stays bounded.
    ///
    /// When `enable_smooth_limit` is set the limit is applied ahead of curves so the vehicle
    /// slows down before entering them. When `use_resampling` is set the trajectory is resampled
    /// before the curvature is estimated.
    fn apply_lateral_acceleration_filter(
        &self,
        points: &[TrajectoryPoint],
        initial_motion: &InitialMotion,
        enable_smooth_limit: bool,
        use_resampling: bool,
    ) -> Vec<TrajectoryPoint>;

    /// Limit the velocity of each point so that the steering rate stays bounded.
    fn apply_steering_rate_limit(
        &self,
        points: &[TrajectoryPoint],
        use_resampling: bool,
    ) -> Vec<TrajectoryPoint>;

    /// Resample the trajectory at an interval suited to the current speed, starting near `pose`.
    fn resample_trajectory(
        &self,
        points: &[TrajectoryPoint],
        speed_ms: f64,
        pose: &Pose,
        dist_threshold_m: f64,
        yaw_threshold_rad: f64,
    ) -> Vec<TrajectoryPoint>;

    /// Index of the point nearest to `pose`, preferring points within the given thresholds.
    fn find_nearest_index(
        &self,
        points: &[TrajectoryPoint],
        pose: &Pose,
        dist_threshold_m: f64,
        yaw_threshold_rad: f64,
    ) -> Option<usize> {
        geom::find_first_nearest_index_with_soft_constraints(
            points,
            pose,
            dist_threshold_m,
            yaw_threshold_rad,
        )
    }

    /// Optimise the velocity profile so that it starts from `initial_motion`.
    fn apply(
        &mut self,
        initial_motion: &InitialMotion,
        points: &[TrajectoryPoint],
    ) -> Result<Vec<TrajectoryPoint>, SmootherError>;
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Reasons the velocity optimisation can fail.
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum SmootherError {
    #[error("Cannot optimise a trajectory with {0} points")]
    TooFewPoints(usize),

    #[error("The optimised profile contains a non-finite value at point {0}")]
    NonFiniteResult(usize),
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Smooth the velocity profile of the trajectory, starting from the vehicle.
///
/// The stages run in order: lateral acceleration filter, steering rate limit, resampling around
/// the vehicle, clipping of the points behind the nearest point to the vehicle, and the
/// optimisation. If the resampled trajectory has fewer than two points the remaining stages are
/// skipped and the resampled trajectory is kept.
///
/// If the optimisation fails the trajectory is left as it was after clipping and
/// [`InterpError::OptimisationFailed`] is returned.
pub fn filter_velocity<S: VelocitySmoother + ?Sized>(
    points: &mut Vec<TrajectoryPoint>,
    initial_motion: &InitialMotion,
    params: &Params,
    smoother: Option<&mut S>,
    odom: &Odometry,
) -> Result<(), InterpError> {
    let smoother = smoother.ok_or(InterpError::SmootherNotInit)?;

    let filtered = smoother.apply_lateral_acceleration_filter(points, initial_motion, true, true);
    let filtered = smoother.apply_steering_rate_limit(&filtered, false);
    *points = smoother.resample_trajectory(
        &filtered,
        initial_motion.speed_ms,
        &odom.pose,
        params.nearest_dist_threshold_m,
        params.nearest_yaw_threshold_rad,
    );

    if points.len() < MIN_TRAJ_POINTS {
        debug!(
            "Resampled trajectory has {} points, skipping optimisation",
            points.len()
        );
        return Ok(());
    }

    let nearest_idx = smoother
        .find_nearest_index(
            points,
            &odom.pose,
            params.nearest_dist_threshold_m,
            params.nearest_yaw_threshold_rad,
        )
        .unwrap_or(0);
    points.drain(..nearest_idx);

    *points = smoother
        .apply(initial_motion, points)
        .map_err(InterpError::OptimisationFailed)?;

    Ok(())
}
