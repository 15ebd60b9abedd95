//! # Point sanitisation
//!
//! Removes points which would corrupt later stages: points overlapping their predecessor (whose
//! heading is undefined) and points which make the trajectory turn back on itself.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::f64::consts::FRAC_PI_2;

use comms_if::msg::TrajectoryPoint;
use log::trace;

use super::geom::{self, normalize_radian};
use super::{InterpError, Stage, MIN_TRAJ_POINTS};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Points closer than this to their predecessor are removed.
pub const MIN_POINT_SEPARATION_M: f64 = 1e-2;

/// Maximum change in heading between two consecutive points.
pub const MAX_YAW_DIFF_RAD: f64 = FRAC_PI_2;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Remove overlapping and backtracking points from the trajectory.
///
/// Returns an error if the trajectory has fewer than two points, in which case it is left
/// unmodified. Otherwise the trajectory is modified in place until it no longer changes: every
/// remaining point is at least [`MIN_POINT_SEPARATION_M`] from its predecessor, faces its
/// successor, and turns by no more than [`MAX_YAW_DIFF_RAD`] relative to its predecessor.
pub fn remove_invalid_points(points: &mut Vec<TrajectoryPoint>) -> Result<(), InterpError> {
    if points.len() < MIN_TRAJ_POINTS {
        return Err(InterpError::insufficient(Stage::Sanitise, points.len()));
    }

    remove_close_proximity_points(points, MIN_POINT_SEPARATION_M);

    // Each pass removes at most one point, and the loop stops at the first pass which removes
    // nothing, so it runs at most once per point.
    let max_passes = points.len() + 1;
    for _ in 0..max_passes {
        insert_orientation(points, true);
        if !remove_first_invalid_orientation_point(points, MAX_YAW_DIFF_RAD) {
            break;
        }
    }

    Ok(())
}

/// Remove every point closer than `min_dist_m` to the previously retained point.
///
/// The first point is always kept. Trajectories with fewer than two points are not modified.
pub fn remove_close_proximity_points(points: &mut Vec<TrajectoryPoint>, min_dist_m: f64) {
    if points.len() < MIN_TRAJ_POINTS {
        return;
    }

    let num_before = points.len();
    let mut retained: Vec<TrajectoryPoint> = Vec::with_capacity(num_before);

    for p in points.drain(..) {
        match retained.last() {
            Some(prev) if geom::distance2d(prev, &p) < min_dist_m => (),
            _ => retained.push(p),
        }
    }

    *points = retained;

    if points.len() != num_before {
        trace!(
            "Removed {} points closer than {} m to their predecessor",
            num_before - points.len(),
            min_dist_m
        );
    }
}

/// Set the orientation of every point to face the next point.
///
/// The last point takes the orientation of the one before it. When `is_driving_forward` is false
/// the points face away from their successor. Trajectories with fewer than two points are not
/// modified.
pub fn insert_orientation(points: &mut [TrajectoryPoint], is_driving_forward: bool) {
    let num_points = points.len();
    if num_points < MIN_TRAJ_POINTS {
        return;
    }

    for i in 0..num_points - 1 {
        let pitch_rad = geom::pitch(&points[i], &points[i + 1]);
        let mut yaw_rad = geom::azimuth(&points[i], &points[i + 1]);
        if !is_driving_forward {
            yaw_rad = normalize_radian(yaw_rad + std::f64::consts::PI);
        }
        points[i].pose.set_pitch_yaw(pitch_rad, yaw_rad);
    }

    points[num_points - 1].pose.orientation_q = points[num_points - 2].pose.orientation_q;
}

/// Remove the first point whose heading differs from its predecessor's by more than
/// `max_yaw_diff_rad`, or which lies behind its predecessor.
///
/// Returns true if a point was removed.
pub fn remove_first_invalid_orientation_point(
    points: &mut Vec<TrajectoryPoint>,
    max_yaw_diff_rad: f64,
) -> bool {
    let invalid = points.windows(2).position(|pair| {
        let yaw_diff_rad = normalize_radian(pair[0].pose.yaw() - pair[1].pose.yaw());
        yaw_diff_rad.abs() > max_yaw_diff_rad || !geom::is_driving_forward(&pair[0], &pair[1])
    });

    match invalid {
        Some(i) => {
            trace!("Removing point {} with invalid orientation", i + 1);
            points.remove(i + 1);
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn straight(num_points: usize, spacing_m: f64) -> Vec<TrajectoryPoint> {
        (0..num_points)
            .map(|i| TrajectoryPoint::new(i as f64 * spacing_m, 0.0, 0.0, 1.0, 0.0))
            .collect()
    }

    #[test]
    fn test_remove_close_proximity_points() {
        let mut points = straight(5, 1.0);
        points.insert(2, TrajectoryPoint::new(1.005, 0.0, 0.0, 1.0, 0.0));
        points.push(TrajectoryPoint::new(4.0, 0.0, 0.0, 1.0, 0.0));

        remove_close_proximity_points(&mut points, MIN_POINT_SEPARATION_M);
        assert_eq!(points.len(), 5);
        for (i, p) in points.iter().enumerate() {
            assert_eq!(p.pose.position_m.x, i as f64);
        }

        // Infinite minimum distance keeps only the first point
        let mut points = straight(5, 1.0);
        remove_close_proximity_points(&mut points, f64::INFINITY);
        assert_eq!(points.len(), 1);

        // Single points are untouched
        let mut points = straight(1, 1.0);
        remove_close_proximity_points(&mut points, f64::INFINITY);
        assert_eq!(points.len(), 1);
    }

    #[test]
    fn test_insert_orientation() {
        let mut points = vec![
            TrajectoryPoint::new(0.0, 0.0, 2.0, 1.0, 0.0),
            TrajectoryPoint::new(1.0, 0.0, 2.0, 1.0, 0.0),
            TrajectoryPoint::new(1.0, 1.0, 2.0, 1.0, 0.0),
        ];

        insert_orientation(&mut points, true);
        assert!(points[0].pose.yaw().abs() < 1e-9);
        assert!((points[1].pose.yaw() - FRAC_PI_2).abs() < 1e-9);
        assert!((points[2].pose.yaw() - FRAC_PI_2).abs() < 1e-9);

        insert_orientation(&mut points, false);
        assert!((points[0].pose.yaw().abs() - std::f64::consts::PI).abs() < 1e-9);
    }

    #[test]
    fn test_remove_invalid_points() {
        // Too short
        let mut points = straight(1, 1.0);
        assert!(matches!(
            remove_invalid_points(&mut points),
            Err(InterpError::InsufficientPoints {
                stage: Stage::Sanitise,
                num_points: 1
            })
        ));
        assert_eq!(points.len(), 1);

        // Trajectory which doubles back on itself at the end
        let mut points = straight(5, 1.0);
        points.push(TrajectoryPoint::new(3.5, 0.0, 0.0, 1.0, 0.0));
        remove_invalid_points(&mut points).unwrap();

        for pair in points.windows(2) {
            assert!(geom::distance2d(&pair[0], &pair[1]) >= MIN_POINT_SEPARATION_M);
            assert!(
                normalize_radian(pair[0].pose.yaw() - pair[1].pose.yaw()).abs()
                    <= MAX_YAW_DIFF_RAD
            );
            assert!(geom::is_driving_forward(&pair[0], &pair[1]));
        }
        assert!(points.iter().all(|p| p.pose.position_m.x >= 0.0));
    }

    #[test]
    fn test_remove_invalid_points_idempotent() {
        let mut points = straight(6, 1.0);
        points.insert(3, TrajectoryPoint::new(2.001, 0.0, 0.0, 1.0, 0.0));
        points.push(TrajectoryPoint::new(4.0, 1.0, 0.0, 1.0, 0.0));
        points.push(TrajectoryPoint::new(3.0, 1.0, 0.0, 1.0, 0.0));

        remove_invalid_points(&mut points).unwrap();
        let once = points.clone();
        remove_invalid_points(&mut points).unwrap();

        assert_eq!(once, points);
    }
}
