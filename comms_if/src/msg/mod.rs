//! # Planning Messages
//!
//! This module defines the messages exchanged between the trajectory interpolator and the host
//! transport layer: the candidate trajectory coming from the planner, the vehicle state estimates,
//! and the processed trajectory going to the controller.

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod odom;
pub mod traj;

// -----------------------------------------------------------------------------------------------
// EXPORTS
// -----------------------------------------------------------------------------------------------

pub use odom::{AccelStamped, Odometry};
pub use traj::{Pose, Trajectory, TrajectoryPoint};

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// -----------------------------------------------------------------------------------------------
// STRUCTS
// -----------------------------------------------------------------------------------------------

/// All inputs delivered by the transport layer for a single planning cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleInput {
    /// The raw candidate trajectory from the planner.
    pub trajectory: Trajectory,

    /// The latest odometry of the vehicle.
    pub odometry: Odometry,

    /// The latest acceleration estimate of the vehicle.
    pub acceleration: AccelStamped,
}
