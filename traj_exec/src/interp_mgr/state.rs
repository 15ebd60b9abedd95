//! Trajectory interpolation manager state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::Serialize;

// Internal
use super::{InitError, ProcError};
use crate::interp::{
    self, geom, history, interpolate_trajectory, resample, velocity, Collaborators, Params,
    ParamsError,
};
use comms_if::msg::{CycleInput, Trajectory, TrajectoryPoint};
use util::{module::State, params, session::Session, time};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

pub struct TrajInterpMgr {
    params: Params,

    /// Smoothers, kept across cycles
    collaborators: Collaborators,

    /// Trail of vehicle states, most recent last
    ego_history: Vec<TrajectoryPoint>,

    /// The last valid output
    last_output: Option<Trajectory>,
}

/// The status report of one cycle of the manager.
#[derive(Debug, Default, Clone, Serialize)]
pub struct StatusReport {
    /// Report from the pipeline, if it produced a trajectory
    pub interp: Option<interp::StatusReport>,

    /// The reason the pipeline produced no trajectory
    pub interp_error: Option<String>,

    /// If true the last valid output was republished
    pub republished_last: bool,

    /// If true the output was resampled at the output time step
    pub output_resampled: bool,

    /// Number of points in the ego history
    pub ego_history_len: usize,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for TrajInterpMgr {
    type InitData = &'static str;
    type InitError = InitError;

    type InputData = CycleInput;
    type OutputData = Option<Trajectory>;
    type StatusReport = StatusReport;
    type ProcError = ProcError;

    /// Initialise the manager.
    ///
    /// Expected init data is the path to the parameter file, relative to the parameters
    /// directory.
    fn init(init_data: Self::InitData, _session: Option<&Session>) -> Result<Self, Self::InitError> {
        let params: Params = params::load(init_data)?;
        Self::new(params)
    }

    /// Process one cycle.
    ///
    /// Processing involves:
    ///  1. Clamping negative velocities in the raw trajectory to zero.
    ///  1. Adding the vehicle state to the ego history, and prepending the history to the
    ///     trajectory if `extend_trajectory_backward` is set.
    ///  1. Running the interpolation pipeline.
    ///  1. On success, resampling the output in time if `output_time_step_s` is set and storing
    ///     it as the last valid output. On failure, possibly republishing the last valid output.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        let odom = &input_data.odometry;
        if !geom::is_valid_pose(&odom.pose) {
            return Err(ProcError::InvalidEgoPose);
        }

        let mut report = StatusReport::default();

        let mut points = input_data.trajectory.points.clone();
        velocity::clamp_negative_velocities(&mut points);

        history::add_ego_state_to_trajectory(&mut self.ego_history, odom, &self.params);
        report.ego_history_len = self.ego_history.len();

        if self.params.extend_trajectory_backward {
            history::expand_trajectory_with_ego_history(&mut points, &self.ego_history);
        }

        let result = interpolate_trajectory(
            &mut points,
            odom,
            &input_data.acceleration,
            &self.params,
            &mut self.collaborators,
        );

        let interp_report = match result {
            Ok(r) => r,
            Err(e) => {
                report.interp_error = Some(e.to_string());
                let output = self.last_output_to_republish(odom.stamp);
                report.republished_last = output.is_some();
                return Ok((output, report));
            }
        };
        report.interp = Some(interp_report);

        if let Some(time_step_s) = self.params.output_time_step_s {
            let mut resampled = points.clone();
            match resample::resample_trajectory_by_time(&mut resampled, time_step_s) {
                Ok(()) if resampled.len() >= interp::MIN_TRAJ_POINTS => {
                    points = resampled;
                    report.output_resampled = true;
                }
                Ok(()) => warn!(
                    "Resampling at {} s left {} points, output not resampled",
                    time_step_s,
                    resampled.len()
                ),
                Err(e) => warn!("Output not resampled: {}", e),
            }
        }

        let output = Trajectory {
            stamp: input_data.trajectory.stamp,
            points,
        };
        self.last_output = Some(output.clone());

        Ok((Some(output), report))
    }
}

impl TrajInterpMgr {
    /// Create a new manager from a set of parameters, with the reference smoothers.
    pub fn new(params: Params) -> Result<Self, InitError> {
        params.validate()?;

        Ok(Self {
            collaborators: Collaborators::from_params(&params),
            params,
            ego_history: Vec::new(),
            last_output: None,
        })
    }

    /// Replace the smoothers used by the pipeline.
    pub fn with_collaborators(mut self, collaborators: Collaborators) -> Self {
        self.collaborators = collaborators;
        self
    }

    /// Update the parameters, effective from the next cycle.
    ///
    /// Invalid parameters are rejected and the current ones kept. The reference smoothers are
    /// rebuilt if their parameters changed.
    pub fn set_params(&mut self, params: Params) -> Result<(), ParamsError> {
        params.validate()?;

        if params.velocity_smoother != self.params.velocity_smoother
            || params.elastic_band != self.params.elastic_band
        {
            self.collaborators = Collaborators::from_params(&params);
        }
        self.params = params;

        info!("TrajInterpMgr parameters updated");

        Ok(())
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn ego_history(&self) -> &[TrajectoryPoint] {
        &self.ego_history
    }

    /// The last valid output, if it should be republished at time `now`.
    fn last_output_to_republish(&self, now: DateTime<Utc>) -> Option<Trajectory> {
        let last = self.last_output.as_ref()?;

        if self.params.publish_last_trajectory {
            return Some(last.clone());
        }
        if !self.params.keep_last_trajectory {
            return None;
        }

        let age_s = time::duration_to_seconds(now - last.stamp)?;
        if age_s <= self.params.keep_last_trajectory_s {
            Some(last.clone())
        } else {
            debug!("Last output is {:.3} s old, not republishing", age_s);
            None
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::msg::{AccelStamped, Odometry, Pose};

    fn cycle(start_x_m: f64, stamp: DateTime<Utc>, speed_ms: f64) -> CycleInput {
        let points = (0..10)
            .map(|i| TrajectoryPoint::new(start_x_m + i as f64, 0.0, 0.0, 2.0, 0.0))
            .collect();

        let mut odometry = Odometry::new(Pose::from_xy_yaw(start_x_m, 0.0, 0.0), speed_ms);
        odometry.stamp = stamp;

        CycleInput {
            trajectory: Trajectory { stamp, points },
            odometry,
            acceleration: AccelStamped::new(0.0),
        }
    }

    fn failing_cycle(stamp: DateTime<Utc>) -> CycleInput {
        let mut input = cycle(0.0, stamp, 0.0);
        input.trajectory.points.truncate(1);
        input
    }

    #[test]
    fn test_invalid_params() {
        let params = Params {
            spline_interpolation_resolution_m: -1.0,
            ..Params::default()
        };
        assert!(matches!(
            TrajInterpMgr::new(params),
            Err(InitError::InvalidParams(_))
        ));

        let mut mgr = TrajInterpMgr::new(Params::default()).unwrap();
        let params = Params {
            max_speed_mps: 0.0,
            ..Params::default()
        };
        assert!(mgr.set_params(params).is_err());
        assert_eq!(mgr.params(), &Params::default());
    }

    #[test]
    fn test_proc_outputs_trajectory() {
        let mut mgr = TrajInterpMgr::new(Params::default()).unwrap();
        let now = Utc::now();

        let (output, report) = mgr.proc(&cycle(0.0, now, 0.0)).unwrap();

        let output = output.unwrap();
        assert!(output.len() >= 2);
        assert_eq!(output.stamp, now);
        assert!(report.interp.is_some());
        assert!(!report.republished_last);
        assert_eq!(report.ego_history_len, 1);
    }

    #[test]
    fn test_invalid_ego_pose() {
        let mut mgr = TrajInterpMgr::new(Params::default()).unwrap();
        let mut input = cycle(0.0, Utc::now(), 0.0);
        input.odometry.pose.position_m.x = std::f64::NAN;

        assert!(matches!(mgr.proc(&input), Err(ProcError::InvalidEgoPose)));
        assert!(mgr.ego_history().is_empty());
    }

    #[test]
    fn test_keep_last_trajectory() {
        let mut mgr = TrajInterpMgr::new(Params::default()).unwrap();
        let now = Utc::now();

        let (first, _) = mgr.proc(&cycle(0.0, now, 0.0)).unwrap();

        // Within the keep time the last output is republished
        let later = now + chrono::Duration::milliseconds(500);
        let (output, report) = mgr.proc(&failing_cycle(later)).unwrap();
        assert!(report.interp_error.is_some());
        assert!(report.republished_last);
        assert_eq!(output, first);

        // After the keep time nothing is output
        let later = now + chrono::Duration::milliseconds(1500);
        let (output, report) = mgr.proc(&failing_cycle(later)).unwrap();
        assert!(output.is_none());
        assert!(!report.republished_last);

        // Unless the last trajectory is always published
        mgr.set_params(Params {
            publish_last_trajectory: true,
            ..Params::default()
        })
        .unwrap();
        let (output, _) = mgr.proc(&failing_cycle(later)).unwrap();
        assert_eq!(output, first);
    }

    #[test]
    fn test_extend_backward() {
        let params = Params {
            extend_trajectory_backward: true,
            smooth_velocities: false,
            use_akima_spline_interpolation: false,
            ..Params::default()
        };
        let mut mgr = TrajInterpMgr::new(params).unwrap();
        let now = Utc::now();

        mgr.proc(&cycle(0.0, now, 2.0)).unwrap();
        let (output, report) = mgr.proc(&cycle(1.0, now, 2.0)).unwrap();

        // The history point at the origin is kept in front of the new trajectory
        let output = output.unwrap();
        assert_eq!(report.ego_history_len, 2);
        assert_eq!(output.points[0].pose.position_m.x, 0.0);
        assert_eq!(output.points.last().unwrap().pose.position_m.x, 10.0);
        assert_eq!(output.points[0].time_from_start_s, 0.0);
    }

    #[test]
    fn test_negative_velocities_and_time_resample() {
        let params = Params {
            smooth_velocities: false,
            use_akima_spline_interpolation: false,
            limit_velocity: false,
            output_time_step_s: Some(0.1),
            ..Params::default()
        };
        let mut mgr = TrajInterpMgr::new(params).unwrap();
        let mut input = cycle(0.0, Utc::now(), 3.0);
        for p in input.trajectory.points.iter_mut().take(3) {
            p.long_velocity_ms = -1.0;
        }

        let (output, report) = mgr.proc(&input).unwrap();
        let output = output.unwrap();

        assert!(report.output_resampled);
        assert!(output.points.iter().all(|p| p.long_velocity_ms >= 0.0));
        for (i, p) in output.points.iter().enumerate() {
            assert!((p.time_from_start_s - 0.1 * i as f64).abs() < 1e-9);
        }
    }

    #[test]
    fn test_time_resample_with_invalid_velocity() {
        let params = Params {
            smooth_velocities: false,
            use_akima_spline_interpolation: false,
            limit_velocity: false,
            output_time_step_s: Some(0.1),
            ..Params::default()
        };
        let mut mgr = TrajInterpMgr::new(params).unwrap();
        let mut input = cycle(0.0, Utc::now(), 3.0);
        input.trajectory.points[0].long_velocity_ms = std::f64::NAN;

        let (output, report) = mgr.proc(&input).unwrap();
        let output = output.unwrap();

        // The first segment is skipped, the other eight give five samples each at 2 m/s
        assert!(report.output_resampled);
        assert_eq!(output.len(), 41);
        assert!((output.points.last().unwrap().pose.position_m.x - 9.0).abs() < 1e-9);
    }

    #[test]
    fn test_without_smoothers() {
        let mut mgr = TrajInterpMgr::new(Params {
            smooth_trajectories: true,
            ..Params::default()
        })
        .unwrap()
        .with_collaborators(Collaborators::default());

        let (output, report) = mgr.proc(&cycle(0.0, Utc::now(), 0.0)).unwrap();

        // Both smoothing stages are skipped but a trajectory is still produced
        let interp_report = report.interp.unwrap();
        assert!(interp_report.velocity_smoothing_skipped);
        assert!(interp_report.elastic_band_failed);
        assert!(output.unwrap().len() >= 2);
    }
}
