//! # Pipeline
//!
//! Runs the stages of trajectory interpolation in order, once per cycle.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::msg::{AccelStamped, Odometry, TrajectoryPoint};
use log::{debug, error, warn};

use super::path_smoother::smooth_trajectory_with_elastic_band;
use super::resample::calculate_time_from_start;
use super::sanitise::remove_invalid_points;
use super::spline::apply_spline;
use super::vel_smoother::filter_velocity;
use super::velocity::{clamp_velocities, set_max_velocity};
use super::{
    AccelLimitedSmoother, ElasticBand, InitialMotion, InterpError, Params, PathSmoother, Stage,
    StatusReport, VelocitySmoother, MIN_TRAJ_POINTS,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The long-lived smoothers used by the pipeline.
///
/// The smoothers keep state between cycles so must be created once and reused. A missing smoother
/// causes the corresponding stage to be skipped.
#[derive(Default)]
pub struct Collaborators {
    pub velocity_smoother: Option<Box<dyn VelocitySmoother>>,
    pub path_smoother: Option<Box<dyn PathSmoother>>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Collaborators {
    /// Create the reference smoothers from the parameters.
    pub fn from_params(params: &Params) -> Self {
        Self {
            velocity_smoother: Some(Box::new(AccelLimitedSmoother::new(
                params.velocity_smoother.clone(),
            ))),
            path_smoother: Some(Box::new(ElasticBand::new(params.elastic_band.clone()))),
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Process the raw trajectory in place.
///
/// Stage failures are logged and recorded in the returned report, and processing continues with
/// the trajectory as the failed stage left it. An error is only returned if the trajectory has
/// fewer than two points after sanitisation or at the end of processing, in which case there is
/// no valid output this cycle.
pub fn interpolate_trajectory(
    points: &mut Vec<TrajectoryPoint>,
    odom: &Odometry,
    accel: &AccelStamped,
    params: &Params,
    collaborators: &mut Collaborators,
) -> Result<StatusReport, InterpError> {
    let mut report = StatusReport {
        num_input_points: points.len(),
        ..StatusReport::default()
    };

    if params.fix_invalid_points {
        remove_invalid_points(points).map_err(log_stage_error)?;
        report.num_sanitised_points = report.num_input_points - points.len();
    }

    if points.len() < MIN_TRAJ_POINTS {
        return Err(log_stage_error(InterpError::insufficient(
            Stage::Sanitise,
            points.len(),
        )));
    }

    let initial_motion = InitialMotion::from_vehicle_state(odom, accel, params);
    report.initial_motion = initial_motion;

    if odom.speed_ms() < params.target_pull_out_speed_mps {
        clamp_velocities(points, initial_motion.speed_ms, initial_motion.acc_ms2);
        report.engage_clamp_applied = true;
    }

    if params.limit_velocity {
        set_max_velocity(points, params.max_speed_mps);
        report.velocity_limited = true;
    }

    if params.smooth_velocities {
        if let Err(e) = filter_velocity(
            points,
            &initial_motion,
            params,
            collaborators.velocity_smoother.as_deref_mut(),
            odom,
        ) {
            report.optimisation_failed = matches!(e, InterpError::OptimisationFailed(_));
            report.velocity_smoothing_skipped = !report.optimisation_failed;
            log_stage_error(e);
        }
    }

    if params.use_akima_spline_interpolation {
        if let Err(e) = apply_spline(points, params.spline_interpolation_resolution_m) {
            report.spline_failed = true;
            log_stage_error(e);
        }
    }

    if params.smooth_trajectories {
        if let Err(e) = smooth_trajectory_with_elastic_band(
            points,
            odom,
            collaborators.path_smoother.as_deref_mut(),
        ) {
            report.elastic_band_failed = true;
            log_stage_error(e);
        }
    }

    calculate_time_from_start(points, &odom.pose);

    if points.len() < MIN_TRAJ_POINTS {
        return Err(log_stage_error(InterpError::insufficient(
            Stage::Output,
            points.len(),
        )));
    }

    report.num_output_points = points.len();
    debug!(
        "Interpolated trajectory of {} points into {} points",
        report.num_input_points, report.num_output_points
    );

    Ok(report)
}

/// Log a stage error at the level matching its severity, and return it.
fn log_stage_error(e: InterpError) -> InterpError {
    match e {
        InterpError::OptimisationFailed(_) | InterpError::SplineFailed(_) => warn!("{}", e),
        _ => error!("{}", e),
    }
    e
}

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::msg::Pose;

    fn straight(num_points: usize) -> Vec<TrajectoryPoint> {
        (0..num_points)
            .map(|i| TrajectoryPoint::new(i as f64, 0.0, 0.0, 1.0, 0.1))
            .collect()
    }

    fn all_enabled() -> Params {
        Params {
            use_akima_spline_interpolation: true,
            smooth_velocities: true,
            smooth_trajectories: true,
            limit_velocity: true,
            fix_invalid_points: true,
            ..Params::default()
        }
    }

    #[test]
    fn test_end_to_end() {
        let params = all_enabled();
        let mut collaborators = Collaborators::from_params(&params);
        let mut points = straight(10);
        let odom = Odometry::new(Pose::default(), 0.0);
        let accel = AccelStamped::new(0.0);

        let report =
            interpolate_trajectory(&mut points, &odom, &accel, &params, &mut collaborators)
                .unwrap();

        assert!(points.len() >= 2);
        assert_eq!(report.num_output_points, points.len());
        assert!(report.engage_clamp_applied);
        assert!(!report.optimisation_failed);
        assert!(!report.spline_failed);
        assert!(!report.elastic_band_failed);

        for pair in points.windows(2) {
            assert!(pair[0].time_from_start_s <= pair[1].time_from_start_s);
        }
        assert!(points
            .iter()
            .all(|p| p.long_velocity_ms <= params.max_speed_mps));

        let last = points.last().unwrap();
        assert!((last.pose.position_m.x - 9.0).abs() < 1e-2);
    }

    #[test]
    fn test_insufficient_points() {
        let params = all_enabled();
        let mut collaborators = Collaborators::from_params(&params);
        let odom = Odometry::new(Pose::default(), 0.0);
        let accel = AccelStamped::new(0.0);

        let mut points = straight(1);
        assert!(matches!(
            interpolate_trajectory(&mut points, &odom, &accel, &params, &mut collaborators),
            Err(InterpError::InsufficientPoints {
                stage: Stage::Sanitise,
                ..
            })
        ));

        // Without sanitisation the same check applies
        let params = Params {
            fix_invalid_points: false,
            ..all_enabled()
        };
        let mut points = Vec::new();
        assert!(interpolate_trajectory(
            &mut points,
            &odom,
            &accel,
            &params,
            &mut collaborators
        )
        .is_err());
    }

    #[test]
    fn test_missing_collaborators_degrade() {
        let params = all_enabled();
        let mut collaborators = Collaborators::default();
        let mut points = straight(10);
        let odom = Odometry::new(Pose::default(), 0.0);
        let accel = AccelStamped::new(0.0);

        let report =
            interpolate_trajectory(&mut points, &odom, &accel, &params, &mut collaborators)
                .unwrap();

        assert!(report.velocity_smoothing_skipped);
        assert!(report.elastic_band_failed);
        assert!(!report.spline_failed);
        assert!(points.len() >= 2);
    }

    #[test]
    fn test_non_finite_position_without_sanitisation() {
        let params = Params {
            fix_invalid_points: false,
            ..Params::default()
        };
        let mut collaborators = Collaborators::from_params(&params);
        let mut points = straight(10);
        points[5].pose.position_m.x = std::f64::NAN;
        let odom = Odometry::new(Pose::default(), 0.0);
        let accel = AccelStamped::new(0.0);

        // Every stage must finish, the spline cannot be fitted through the invalid point
        let report =
            interpolate_trajectory(&mut points, &odom, &accel, &params, &mut collaborators)
                .unwrap();

        assert!(report.spline_failed);
        assert_eq!(report.num_output_points, points.len());
    }

    #[test]
    fn test_moving_vehicle_uses_own_motion() {
        let params = Params {
            smooth_velocities: false,
            use_akima_spline_interpolation: false,
            ..Params::default()
        };
        let mut collaborators = Collaborators::default();
        let mut points = straight(10);
        let odom = Odometry::new(Pose::default(), 3.0);
        let accel = AccelStamped::new(0.2);

        let report =
            interpolate_trajectory(&mut points, &odom, &accel, &params, &mut collaborators)
                .unwrap();

        assert!(!report.engage_clamp_applied);
        assert_eq!(report.initial_motion.speed_ms, 3.0);
        assert_eq!(report.initial_motion.acc_ms2, 0.2);
        assert!(points.iter().all(|p| p.long_velocity_ms == 1.0));
    }
}
