//! # Path smoother interface
//!
//! The path smoother is an external collaborator which relaxes the geometry of a trajectory. It
//! may keep state between calls, but the pipeline clears that state after every use so each cycle
//! starts from a clean slate.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::msg::{Odometry, Pose, TrajectoryPoint};

use super::InterpError;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Operations the pipeline requires from a path smoother.
pub trait PathSmoother {
    /// Smooth the geometry of the trajectory relative to the vehicle pose.
    fn smooth_trajectory(
        &mut self,
        points: &[TrajectoryPoint],
        ego_pose: &Pose,
    ) -> Vec<TrajectoryPoint>;

    /// Discard any state kept from previous calls.
    fn reset_previous_data(&mut self);
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Smooth the trajectory with the path smoother, then reset the smoother.
///
/// If no smoother is given an error is returned and the trajectory is left unmodified.
pub fn smooth_trajectory_with_elastic_band<S: PathSmoother + ?Sized>(
    points: &mut Vec<TrajectoryPoint>,
    odom: &Odometry,
    smoother: Option<&mut S>,
) -> Result<(), InterpError> {
    let smoother = smoother.ok_or(InterpError::PathSmootherNotInit)?;

    *points = smoother.smooth_trajectory(points, &odom.pose);
    smoother.reset_previous_data();

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::interp::ElasticBand;

    /// Smoother which shifts the trajectory sideways and counts resets.
    #[derive(Default)]
    struct ShiftSmoother {
        num_calls: usize,
        num_resets: usize,
    }

    impl PathSmoother for ShiftSmoother {
        fn smooth_trajectory(&mut self, points: &[TrajectoryPoint], _: &Pose) -> Vec<TrajectoryPoint> {
            self.num_calls += 1;
            points
                .iter()
                .map(|p| {
                    let mut p = *p;
                    p.pose.position_m.y += 1.0;
                    p
                })
                .collect()
        }

        fn reset_previous_data(&mut self) {
            self.num_resets += 1;
        }
    }

    #[test]
    fn test_smoother_reset_after_use() {
        let mut points = vec![TrajectoryPoint::default(); 3];
        let odom = Odometry::new(Pose::default(), 0.0);
        let mut smoother = ShiftSmoother::default();

        smooth_trajectory_with_elastic_band(&mut points, &odom, Some(&mut smoother)).unwrap();
        smooth_trajectory_with_elastic_band(&mut points, &odom, Some(&mut smoother)).unwrap();

        assert_eq!(smoother.num_calls, 2);
        assert_eq!(smoother.num_resets, 2);
        assert!(points.iter().all(|p| p.pose.position_m.y == 2.0));
    }

    #[test]
    fn test_smoother_not_init() {
        let mut points = vec![TrajectoryPoint::default(); 3];
        let odom = Odometry::new(Pose::default(), 0.0);

        assert!(matches!(
            smooth_trajectory_with_elastic_band::<ElasticBand>(&mut points, &odom, None),
            Err(InterpError::PathSmootherNotInit)
        ));
    }
}
