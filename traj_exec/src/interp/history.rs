//! # Ego history
//!
//! Maintains the trail of poses the vehicle has driven through and stitches it to the front of
//! new trajectories, so that the processed trajectory extends behind the vehicle.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::msg::{Odometry, TrajectoryPoint};
use log::debug;

use super::geom::{self, normalize_radian};
use super::Params;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Distance below which the vehicle is considered not to have moved.
pub const EGO_MOVE_DIST_EPSILON_M: f64 = 1e-2;

/// Heading change below which the vehicle is considered not to have turned.
pub const EGO_MOVE_YAW_EPSILON_RAD: f64 = 1e-2;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Append the current vehicle state to the ego history.
///
/// - An empty history becomes the vehicle state alone.
/// - If the vehicle has neither moved nor turned since the last point, nothing changes.
/// - If the vehicle has jumped by more than the nearest point thresholds the history is stale and
///   is replaced by the vehicle state alone.
/// - Otherwise the vehicle state is appended and points further than
///   `backward_path_extension_m` behind it (along the history) are removed.
pub fn add_ego_state_to_trajectory(
    history: &mut Vec<TrajectoryPoint>,
    odom: &Odometry,
    params: &Params,
) {
    let ego = TrajectoryPoint {
        pose: odom.pose,
        long_velocity_ms: odom.speed_ms(),
        ..TrajectoryPoint::default()
    };

    if history.is_empty() {
        history.push(ego);
        return;
    }
    let last = &history[history.len() - 1];

    let dist_m = geom::distance2d(&ego, last);
    let yaw_diff_rad = normalize_radian(ego.pose.yaw() - last.pose.yaw()).abs();

    if dist_m < EGO_MOVE_DIST_EPSILON_M && yaw_diff_rad < EGO_MOVE_YAW_EPSILON_RAD {
        return;
    }

    if dist_m > params.nearest_dist_threshold_m || yaw_diff_rad > params.nearest_yaw_threshold_rad
    {
        debug!(
            "Vehicle jumped by {:.3} m, {:.3} rad from its history, resetting the history",
            dist_m, yaw_diff_rad
        );
        history.clear();
        history.push(ego);
        return;
    }

    history.push(ego);

    let mut length_m = 0.0;
    let mut clip_idx = 0;
    for i in (1..history.len()).rev() {
        length_m += geom::distance2d(&history[i - 1], &history[i]);
        if length_m > params.backward_path_extension_m {
            clip_idx = i;
            break;
        }
    }
    history.drain(..clip_idx);
}

/// Prepend the ego history to the trajectory. Nothing happens if either is empty.
pub fn expand_trajectory_with_ego_history(
    points: &mut Vec<TrajectoryPoint>,
    history: &[TrajectoryPoint],
) {
    if points.is_empty() || history.is_empty() {
        return;
    }

    points.splice(0..0, history.iter().copied());
}
