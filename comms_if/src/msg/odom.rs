//! # Vehicle State Messages

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use super::Pose;

// -----------------------------------------------------------------------------------------------
// STRUCTS
// -----------------------------------------------------------------------------------------------

/// Odometry of the vehicle: pose and body-frame twist.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Odometry {
    /// Time at which the odometry was estimated
    pub stamp: DateTime<Utc>,

    /// Pose of the vehicle in the map frame
    pub pose: Pose,

    /// Linear velocity in the body frame, X is the longitudinal direction
    pub linear_velocity_ms: Vector3<f64>,

    /// Angular velocity in the body frame
    #[serde(default)]
    pub angular_velocity_rads: Vector3<f64>,
}

/// Acceleration estimate of the vehicle in the body frame.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccelStamped {
    /// Time at which the acceleration was estimated
    pub stamp: DateTime<Utc>,

    /// Linear acceleration, X is the longitudinal direction
    pub linear_ms2: Vector3<f64>,
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl Odometry {
    /// Create odometry at the given pose moving forwards at the given speed.
    pub fn new(pose: Pose, speed_ms: f64) -> Self {
        Self {
            stamp: Utc::now(),
            pose,
            linear_velocity_ms: Vector3::new(speed_ms, 0.0, 0.0),
            angular_velocity_rads: Vector3::zeros(),
        }
    }

    /// Longitudinal speed of the vehicle
    pub fn speed_ms(&self) -> f64 {
        self.linear_velocity_ms[0]
    }
}

impl AccelStamped {
    /// Create an acceleration estimate with the given longitudinal component.
    pub fn new(long_acc_ms2: f64) -> Self {
        Self {
            stamp: Utc::now(),
            linear_ms2: Vector3::new(long_acc_ms2, 0.0, 0.0),
        }
    }

    /// Longitudinal acceleration of the vehicle
    pub fn long_acc_ms2(&self) -> f64 {
        self.linear_ms2[0]
    }
}
