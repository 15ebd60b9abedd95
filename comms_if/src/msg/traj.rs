//! # Trajectory Messages

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use nalgebra::{Quaternion, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

// -----------------------------------------------------------------------------------------------
// STRUCTS
// -----------------------------------------------------------------------------------------------

/// A pose in the map frame.
///
/// The orientation is stored as a raw (not necessarily unit) quaternion so that numerically
/// corrupted values survive deserialisation and can be detected downstream.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Position in the map frame
    pub position_m: Vector3<f64>,

    /// Orientation quaternion rotating the map frame into the vehicle body frame
    pub orientation_q: Quaternion<f64>,
}

/// A single sample of planned motion.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    /// Time elapsed from the start of the trajectory to this point
    #[serde(default)]
    pub time_from_start_s: f64,

    /// Pose of the vehicle at this point
    pub pose: Pose,

    /// Longitudinal velocity demand
    #[serde(default)]
    pub long_velocity_ms: f64,

    /// Lateral velocity demand
    #[serde(default)]
    pub lat_velocity_ms: f64,

    /// Longitudinal acceleration demand
    #[serde(default)]
    pub acceleration_ms2: f64,

    /// Rate of change of heading
    #[serde(default)]
    pub heading_rate_rads: f64,
}

/// An ordered sequence of trajectory points, first to last along the direction of travel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    /// Time at which the trajectory was produced
    pub stamp: DateTime<Utc>,

    /// Points of the trajectory
    pub points: Vec<TrajectoryPoint>,
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl Default for Pose {
    fn default() -> Self {
        Self {
            position_m: Vector3::zeros(),
            orientation_q: Quaternion::identity(),
        }
    }
}

impl Pose {
    /// Create a new pose from a planar position and a heading.
    pub fn from_xy_yaw(x_m: f64, y_m: f64, yaw_rad: f64) -> Self {
        Self {
            position_m: Vector3::new(x_m, y_m, 0.0),
            orientation_q: UnitQuaternion::from_euler_angles(0.0, 0.0, yaw_rad).into_inner(),
        }
    }

    /// Return the heading (angle to the positive X axis) in radians, in the range [-pi, pi].
    pub fn yaw(&self) -> f64 {
        let q = &self.orientation_q;
        let siny_cosp = 2.0 * (q.w * q.k + q.i * q.j);
        let cosy_cosp = 1.0 - 2.0 * (q.j * q.j + q.k * q.k);
        siny_cosp.atan2(cosy_cosp)
    }

    /// Replace the orientation with one built from the given pitch and yaw (no roll).
    pub fn set_pitch_yaw(&mut self, pitch_rad: f64, yaw_rad: f64) {
        self.orientation_q = UnitQuaternion::from_euler_angles(0.0, pitch_rad, yaw_rad).into_inner();
    }
}

impl Default for TrajectoryPoint {
    fn default() -> Self {
        Self {
            time_from_start_s: 0.0,
            pose: Pose::default(),
            long_velocity_ms: 0.0,
            lat_velocity_ms: 0.0,
            acceleration_ms2: 0.0,
            heading_rate_rads: 0.0,
        }
    }
}

impl TrajectoryPoint {
    /// Create a point at the given planar pose with the given velocity and acceleration.
    pub fn new(x_m: f64, y_m: f64, yaw_rad: f64, long_velocity_ms: f64, acceleration_ms2: f64) -> Self {
        Self {
            pose: Pose::from_xy_yaw(x_m, y_m, yaw_rad),
            long_velocity_ms,
            acceleration_ms2,
            ..Self::default()
        }
    }
}

impl Trajectory {
    /// Number of points in the trajectory
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_pose_yaw() {
        assert!(Pose::default().yaw().abs() < 1e-12);
        assert!((Pose::from_xy_yaw(1.0, 2.0, FRAC_PI_2).yaw() - FRAC_PI_2).abs() < 1e-12);
        assert!((Pose::from_xy_yaw(0.0, 0.0, -3.0).yaw() + 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_point_deserialise_defaults() {
        let json = r#"{
            "pose": {
                "position_m": [1.0, 2.0, 0.0],
                "orientation_q": [0.0, 0.0, 0.0, 1.0]
            },
            "long_velocity_ms": 1.5
        }"#;

        let point: TrajectoryPoint = serde_json::from_str(json).unwrap();

        assert_eq!(point.pose.position_m, Vector3::new(1.0, 2.0, 0.0));
        assert_eq!(point.long_velocity_ms, 1.5);
        assert_eq!(point.acceleration_ms2, 0.0);
        assert_eq!(point.time_from_start_s, 0.0);
        assert!(point.pose.yaw().abs() < 1e-12);
    }
}
