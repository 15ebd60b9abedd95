//! # Velocity shaping
//!
//! Elementwise floors and ceilings applied to the velocity profile of a trajectory, and the
//! derivation of the initial motion the profile must start from.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::msg::{AccelStamped, Odometry, TrajectoryPoint};
use serde::Serialize;

use super::Params;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The speed and acceleration a trajectory must start from.
///
/// Derived fresh each cycle, never stored.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize)]
pub struct InitialMotion {
    pub speed_ms: f64,
    pub acc_ms2: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl InitialMotion {
    /// Derive the initial motion from the current vehicle state.
    ///
    /// Above the pull-out speed the vehicle's own speed and acceleration are used, otherwise the
    /// configured pull-out targets are used so that the vehicle can engage from standstill.
    pub fn from_vehicle_state(odom: &Odometry, accel: &AccelStamped, params: &Params) -> Self {
        let current_speed_ms = odom.speed_ms();

        if current_speed_ms > params.target_pull_out_speed_mps {
            Self {
                speed_ms: current_speed_ms,
                acc_ms2: accel.long_acc_ms2(),
            }
        } else {
            Self {
                speed_ms: params.target_pull_out_speed_mps,
                acc_ms2: params.target_pull_out_acc_mps2,
            }
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Floor the velocity and acceleration of every point.
pub fn clamp_velocities(points: &mut [TrajectoryPoint], min_velocity_ms: f64, min_acc_ms2: f64) {
    for p in points.iter_mut() {
        p.long_velocity_ms = p.long_velocity_ms.max(min_velocity_ms);
        p.acceleration_ms2 = p.acceleration_ms2.max(min_acc_ms2);
    }
}

/// Cap the velocity of every point.
pub fn set_max_velocity(points: &mut [TrajectoryPoint], max_velocity_ms: f64) {
    for p in points.iter_mut() {
        p.long_velocity_ms = p.long_velocity_ms.min(max_velocity_ms);
    }
}

/// Replace negative velocities with zero.
pub fn clamp_negative_velocities(points: &mut [TrajectoryPoint]) {
    for p in points.iter_mut() {
        if p.long_velocity_ms < 0.0 {
            p.long_velocity_ms = 0.0;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::msg::Pose;

    fn sample() -> Vec<TrajectoryPoint> {
        (0..10)
            .map(|i| TrajectoryPoint::new(i as f64, i as f64, 0.0, 1.0, 0.1))
            .collect()
    }

    #[test]
    fn test_clamp_velocities() {
        let mut points = sample();
        clamp_velocities(&mut points, 2.0, 0.5);

        for p in points.iter() {
            assert!(p.long_velocity_ms >= 2.0);
            assert!(p.acceleration_ms2 >= 0.5);
        }

        // Values already above the floor are untouched
        let mut points = sample();
        clamp_velocities(&mut points, 0.5, -1.0);
        assert!(points.iter().all(|p| p.long_velocity_ms == 1.0 && p.acceleration_ms2 == 0.1));
    }

    #[test]
    fn test_set_max_velocity() {
        let mut points = sample();
        points[3].long_velocity_ms = 7.0;
        set_max_velocity(&mut points, 2.0);

        assert!(points.iter().all(|p| p.long_velocity_ms <= 2.0));
        assert_eq!(points[3].long_velocity_ms, 2.0);
        assert_eq!(points[0].long_velocity_ms, 1.0);
    }

    #[test]
    fn test_clamp_negative_velocities() {
        let mut points = sample();
        points[2].long_velocity_ms = -0.5;
        clamp_negative_velocities(&mut points);
        assert_eq!(points[2].long_velocity_ms, 0.0);
        assert_eq!(points[1].long_velocity_ms, 1.0);
    }

    #[test]
    fn test_initial_motion() {
        let params = Params::default();
        let accel = AccelStamped::new(0.7);

        // Stationary vehicle takes the pull-out targets
        let odom = Odometry::new(Pose::default(), 0.0);
        let motion = InitialMotion::from_vehicle_state(&odom, &accel, &params);
        assert_eq!(motion.speed_ms, params.target_pull_out_speed_mps);
        assert_eq!(motion.acc_ms2, params.target_pull_out_acc_mps2);

        // Moving vehicle takes its own state
        let odom = Odometry::new(Pose::default(), params.target_pull_out_speed_mps + 1.0);
        let motion = InitialMotion::from_vehicle_state(&odom, &accel, &params);
        assert_eq!(motion.speed_ms, params.target_pull_out_speed_mps + 1.0);
        assert_eq!(motion.acc_ms2, 0.7);
    }
}
