//! # Resampling
//!
//! Resampling of trajectories at fixed intervals of distance or time, and recomputation of the
//! time from start of each point from its velocity.
//!
//! Interpolated points take their position from a linear interpolation between the two
//! surrounding points and every other field, including the orientation, from the first of the
//! two. Only the heading rate (when resampling by time) and the time from start (when resampling
//! by distance) are interpolated.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::msg::{Pose, TrajectoryPoint};
use log::trace;
use util::maths::lerp;

use super::geom;
use super::{InterpError, Stage, MIN_TRAJ_POINTS};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Minimum time step of a time resampled trajectory.
pub const MIN_TIME_STEP_S: f64 = 1e-2;

/// Speed used in place of zero when computing the time to cover a segment.
pub const MIN_TIMING_SPEED_MS: f64 = 1e-3;

/// Tolerance on distances accumulated along a segment.
const DIST_EPSILON_M: f64 = 1e-6;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Resample the trajectory at a fixed time step along its velocity profile.
///
/// The output starts with the first point. Along each segment the point advances by the velocity
/// of the segment start multiplied by `time_step_s`. Segments shorter than one step, segments
/// which start with zero or non-finite velocity, and segments of non-finite length produce no
/// points. The time from start of the n-th output
/// point is exactly `n * time_step_s`.
///
/// Returns an error and leaves the trajectory unmodified if the time step is below
/// [`MIN_TIME_STEP_S`] or the trajectory has fewer than two points.
pub fn resample_trajectory_by_time(
    points: &mut Vec<TrajectoryPoint>,
    time_step_s: f64,
) -> Result<(), InterpError> {
    if !(time_step_s >= MIN_TIME_STEP_S) {
        return Err(InterpError::InvalidTimeStep(time_step_s));
    }
    if points.len() < MIN_TRAJ_POINTS {
        return Err(InterpError::insufficient(Stage::TimeResample, points.len()));
    }

    let mut output = Vec::with_capacity(points.len());
    let mut first = points[0];
    first.time_from_start_s = 0.0;
    output.push(first);

    for pair in points.windows(2) {
        let (start, end) = (&pair[0], &pair[1]);
        let seg_len_m = geom::distance2d(start, end);
        let step_m = start.long_velocity_ms * time_step_s;

        // Without this a stationary segment would never be left. Written so that a NaN step is
        // skipped too.
        if !(step_m > DIST_EPSILON_M) || !seg_len_m.is_finite() {
            trace!("Skipping segment with zero or invalid velocity during time resampling");
            continue;
        }
        if step_m > seg_len_m {
            continue;
        }

        let num_steps = ((seg_len_m + DIST_EPSILON_M) / step_m).floor() as usize;
        for n in 1..=num_steps {
            let ratio = n as f64 * step_m / seg_len_m;
            let mut sample = *start;
            sample.pose = geom::lerp_position(&start.pose, &end.pose, ratio);
            sample.heading_rate_rads = lerp(start.heading_rate_rads, end.heading_rate_rads, ratio);
            sample.time_from_start_s = time_step_s * output.len() as f64;
            output.push(sample);
        }
    }

    *points = output;

    Ok(())
}

/// Resample the trajectory every `interval_m` of arc length.
///
/// The last point is always kept. Trajectories with fewer than two points, a non-finite length,
/// or a non-positive interval, are returned as they are.
pub fn resample_by_distance(points: &[TrajectoryPoint], interval_m: f64) -> Vec<TrajectoryPoint> {
    if points.len() < MIN_TRAJ_POINTS || !(interval_m > 0.0) {
        return points.to_vec();
    }

    let arcs = geom::arc_lengths(points);
    let total_m = arcs[arcs.len() - 1];
    if !total_m.is_finite() {
        trace!("Trajectory length is not finite, not resampling by distance");
        return points.to_vec();
    }

    // Samples at 0, interval, ... up to but excluding the end of the trajectory
    let num_samples = if total_m > DIST_EPSILON_M {
        ((total_m - DIST_EPSILON_M) / interval_m).floor() as usize + 1
    } else {
        0
    };

    let mut output = Vec::with_capacity(num_samples + 1);
    let mut seg = 0;

    for step in 0..num_samples {
        let s_m = step as f64 * interval_m;

        while seg < points.len() - 2 && arcs[seg + 1] <= s_m {
            seg += 1;
        }

        let seg_len_m = arcs[seg + 1] - arcs[seg];
        let ratio = if seg_len_m < DIST_EPSILON_M {
            0.0
        } else {
            (s_m - arcs[seg]) / seg_len_m
        };

        let (start, end) = (&points[seg], &points[seg + 1]);
        let mut sample = *start;
        sample.pose = geom::lerp_position(&start.pose, &end.pose, ratio);
        sample.time_from_start_s = lerp(start.time_from_start_s, end.time_from_start_s, ratio);
        output.push(sample);
    }

    if let Some(last) = points.last() {
        output.push(*last);
    }

    output
}

/// Recompute the time from start of every point, counting from the segment nearest to `ego_pose`.
///
/// Points up to and including the start of the nearest segment get a time of zero. Each following
/// point adds the time to cover its segment at the velocity of the segment start, which is
/// floored at [`MIN_TIMING_SPEED_MS`]. Trajectories with fewer than two points are not modified.
pub fn calculate_time_from_start(points: &mut [TrajectoryPoint], ego_pose: &Pose) {
    let nearest_seg = match geom::find_nearest_segment_index(points, ego_pose) {
        Some(i) => i,
        None => return,
    };

    for p in points.iter_mut() {
        p.time_from_start_s = 0.0;
    }

    for i in nearest_seg + 1..points.len() {
        let from = &points[i - 1];
        let dist_m = geom::distance2d(from, &points[i]);
        let speed_ms = from.long_velocity_ms.abs().max(MIN_TIMING_SPEED_MS);
        points[i].time_from_start_s = from.time_from_start_s + dist_m / speed_ms;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn straight(num_points: usize, spacing_m: f64, velocity_ms: f64) -> Vec<TrajectoryPoint> {
        (0..num_points)
            .map(|i| TrajectoryPoint::new(i as f64 * spacing_m, 0.0, 0.0, velocity_ms, 0.0))
            .collect()
    }

    #[test]
    fn test_resample_by_time() {
        let mut points = straight(3, 1.0, 1.0);
        points[0].heading_rate_rads = 0.0;
        points[1].heading_rate_rads = 1.0;
        points[0].pose = Pose::from_xy_yaw(0.0, 0.0, 0.3);

        resample_trajectory_by_time(&mut points, 0.25).unwrap();

        // First point plus four samples per segment
        assert_eq!(points.len(), 9);
        for (i, p) in points.iter().enumerate() {
            assert!((p.time_from_start_s - 0.25 * i as f64).abs() < 1e-12);
            assert!((p.pose.position_m.x - 0.25 * i as f64).abs() < 1e-9);
        }
        assert!((points[2].heading_rate_rads - 0.5).abs() < 1e-9);

        // Orientation is taken from the segment start, not interpolated
        for p in points[..5].iter() {
            assert!((p.pose.yaw() - 0.3).abs() < 1e-9);
        }
        assert!(points[5].pose.yaw().abs() < 1e-9);
    }

    #[test]
    fn test_resample_by_time_skips_short_segments() {
        // Each step is longer than the segment
        let mut points = straight(5, 0.1, 10.0);
        resample_trajectory_by_time(&mut points, 0.1).unwrap();
        assert_eq!(points.len(), 1);

        // Stationary segments are skipped rather than looping
        let mut points = straight(3, 1.0, 0.0);
        resample_trajectory_by_time(&mut points, 0.1).unwrap();
        assert_eq!(points.len(), 1);
    }

    #[test]
    fn test_resample_by_time_non_finite() {
        // The NaN segment is skipped and the next one sampled as usual
        let mut points = straight(3, 1.0, 1.0);
        points[0].long_velocity_ms = std::f64::NAN;
        resample_trajectory_by_time(&mut points, 0.1).unwrap();
        assert_eq!(points.len(), 11);
        assert!((points.last().unwrap().pose.position_m.x - 2.0).abs() < 1e-9);

        let mut points = straight(3, 1.0, 1.0);
        points[2].pose.position_m.x = std::f64::INFINITY;
        resample_trajectory_by_time(&mut points, 0.25).unwrap();
        assert_eq!(points.len(), 5);
    }

    #[test]
    fn test_resample_by_time_errors() {
        let mut points = straight(3, 1.0, 1.0);
        assert!(matches!(
            resample_trajectory_by_time(&mut points, 0.001),
            Err(InterpError::InvalidTimeStep(_))
        ));
        assert_eq!(points.len(), 3);

        let mut points = straight(1, 1.0, 1.0);
        assert!(matches!(
            resample_trajectory_by_time(&mut points, 0.1),
            Err(InterpError::InsufficientPoints {
                stage: Stage::TimeResample,
                ..
            })
        ));
    }

    #[test]
    fn test_resample_by_distance() {
        let points = straight(4, 1.0, 1.0);
        let output = resample_by_distance(&points, 0.4);

        // 0.0, 0.4, ..., 2.8 then the last point
        assert_eq!(output.len(), 9);
        assert_eq!(output.last().unwrap().pose.position_m.x, 3.0);
        for pair in output.windows(2) {
            assert!(geom::distance2d(&pair[0], &pair[1]) <= 0.4 + 1e-9);
        }
    }

    #[test]
    fn test_resample_by_distance_non_finite() {
        let mut points = straight(4, 1.0, 1.0);
        points[2].pose.position_m.x = std::f64::NAN;
        let output = resample_by_distance(&points, 0.4);
        assert_eq!(output.len(), 4);

        let mut points = straight(4, 1.0, 1.0);
        points[3].pose.position_m.y = std::f64::INFINITY;
        assert_eq!(resample_by_distance(&points, 0.4).len(), 4);
    }

    #[test]
    fn test_calculate_time_from_start() {
        let mut points = straight(6, 1.0, 2.0);
        points[3].long_velocity_ms = 0.0;
        let ego = Pose::from_xy_yaw(1.4, 0.2, 0.0);

        calculate_time_from_start(&mut points, &ego);

        assert_eq!(points[0].time_from_start_s, 0.0);
        assert_eq!(points[1].time_from_start_s, 0.0);
        assert!((points[2].time_from_start_s - 0.5).abs() < 1e-9);
        assert!((points[3].time_from_start_s - 1.0).abs() < 1e-9);
        assert!((points[4].time_from_start_s - 1001.0).abs() < 1e-6);
        for pair in points.windows(2) {
            assert!(pair[0].time_from_start_s <= pair[1].time_from_start_s);
        }
    }
}
