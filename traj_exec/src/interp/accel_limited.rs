//! # Acceleration limited velocity smoother
//!
//! Reference [`VelocitySmoother`] which bounds the velocity profile with kinematic limits rather
//! than solving an optimisation problem:
//!
//! - lateral acceleration in curves, from the three point curvature of the path,
//! - steering rate, using a bicycle model to convert curvature into steering angle,
//! - longitudinal acceleration and deceleration, with a forward then a backward pass over the
//!   profile.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::msg::{Pose, TrajectoryPoint};
use serde::Deserialize;

use super::params::{negative, not_negative, positive};
use super::resample::resample_by_distance;
use super::{geom, InitialMotion, ParamsError, SmootherError, VelocitySmoother};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters of the acceleration limited smoother
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct AccelLimitedParams {
    /// Maximum lateral acceleration in curves
    pub max_lateral_acc_ms2: f64,

    /// Curves never limit the velocity below this
    pub min_curve_velocity_ms: f64,

    /// Distance ahead of a curve over which its limit is applied
    pub curve_lookahead_m: f64,

    /// Interval at which the path is resampled to estimate curvature
    pub curvature_interval_m: f64,

    /// Distance between the front and rear axles
    pub wheel_base_m: f64,

    /// Maximum rate of change of the steering angle
    pub max_steering_rate_rads: f64,

    /// Maximum longitudinal acceleration
    pub max_acc_ms2: f64,

    /// Maximum longitudinal deceleration, negative
    pub min_decel_ms2: f64,

    /// Time the vehicle takes to cover one resampling interval
    pub resample_dt_s: f64,

    /// Minimum resampling interval
    pub min_resample_interval_m: f64,
}

/// Velocity smoother bounding the profile with lateral and longitudinal acceleration limits.
#[derive(Debug, Clone, Default)]
pub struct AccelLimitedSmoother {
    params: AccelLimitedParams,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for AccelLimitedParams {
    fn default() -> Self {
        Self {
            max_lateral_acc_ms2: 1.0,
            min_curve_velocity_ms: 2.74,
            curve_lookahead_m: 5.0,
            curvature_interval_m: 1.0,
            wheel_base_m: 2.79,
            max_steering_rate_rads: 0.698,
            max_acc_ms2: 1.0,
            min_decel_ms2: -1.0,
            resample_dt_s: 0.1,
            min_resample_interval_m: 0.1,
        }
    }
}

impl AccelLimitedParams {
    pub fn validate(&self) -> Result<(), ParamsError> {
        positive("velocity_smoother.max_lateral_acc_ms2", self.max_lateral_acc_ms2)?;
        not_negative("velocity_smoother.min_curve_velocity_ms", self.min_curve_velocity_ms)?;
        not_negative("velocity_smoother.curve_lookahead_m", self.curve_lookahead_m)?;
        positive("velocity_smoother.curvature_interval_m", self.curvature_interval_m)?;
        positive("velocity_smoother.wheel_base_m", self.wheel_base_m)?;
        positive(
            "velocity_smoother.max_steering_rate_rads",
            self.max_steering_rate_rads,
        )?;
        positive("velocity_smoother.max_acc_ms2", self.max_acc_ms2)?;
        negative("velocity_smoother.min_decel_ms2", self.min_decel_ms2)?;
        not_negative("velocity_smoother.resample_dt_s", self.resample_dt_s)?;
        positive(
            "velocity_smoother.min_resample_interval_m",
            self.min_resample_interval_m,
        )
    }
}

impl AccelLimitedSmoother {
    pub fn new(params: AccelLimitedParams) -> Self {
        Self { params }
    }

    /// Speed limit in a curve of the given curvature.
    fn curve_speed_limit_ms(&self, curvature_m: f64) -> f64 {
        let limit_ms = if curvature_m.abs() < std::f64::EPSILON {
            std::f64::INFINITY
        } else {
            (self.params.max_lateral_acc_ms2 / curvature_m.abs()).sqrt()
        };

        limit_ms.max(self.params.min_curve_velocity_ms)
    }
}

impl VelocitySmoother for AccelLimitedSmoother {
    fn apply_lateral_acceleration_filter(
        &self,
        points: &[TrajectoryPoint],
        initial_motion: &InitialMotion,
        enable_smooth_limit: bool,
        use_resampling: bool,
    ) -> Vec<TrajectoryPoint> {
        let mut output = if use_resampling {
            resample_by_distance(points, self.params.curvature_interval_m)
        } else {
            points.to_vec()
        };

        if output.len() < 3 {
            return output;
        }

        let mut limits_ms: Vec<f64> = curvatures(&output)
            .into_iter()
            .map(|k| self.curve_speed_limit_ms(k))
            .collect();

        if enable_smooth_limit {
            let arcs = geom::arc_lengths(&output);

            // Slow down before entering a curve
            let lookahead = limits_ms.clone();
            for i in 0..limits_ms.len() {
                limits_ms[i] = (i..lookahead.len())
                    .take_while(|&j| arcs[j] - arcs[i] <= self.params.curve_lookahead_m)
                    .map(|j| lookahead[j])
                    .fold(std::f64::INFINITY, f64::min);

                // Never ask for a harsher deceleration than the vehicle can achieve from its
                // current speed
                let reachable_sq =
                    initial_motion.speed_ms.powi(2) + 2.0 * self.params.min_decel_ms2 * arcs[i];
                limits_ms[i] = limits_ms[i].max(reachable_sq.max(0.0).sqrt());
            }
        }

        for (p, limit_ms) in output.iter_mut().zip(limits_ms) {
            p.long_velocity_ms = p.long_velocity_ms.min(limit_ms);
        }

        output
    }

    fn apply_steering_rate_limit(
        &self,
        points: &[TrajectoryPoint],
        use_resampling: bool,
    ) -> Vec<TrajectoryPoint> {
        let mut output = if use_resampling {
            resample_by_distance(points, self.params.curvature_interval_m)
        } else {
            points.to_vec()
        };

        if output.len() < 3 {
            return output;
        }

        let steering_rad: Vec<f64> = curvatures(&output)
            .into_iter()
            .map(|k| (self.params.wheel_base_m * k).atan())
            .collect();

        for i in 0..output.len() - 1 {
            let ds_m = geom::distance2d(&output[i], &output[i + 1]);
            let steering_diff_rad = (steering_rad[i + 1] - steering_rad[i]).abs();
            if ds_m < std::f64::EPSILON || steering_diff_rad < std::f64::EPSILON {
                continue;
            }

            // Time to cover the segment is ds / v, so the steering rate is dδ v / ds
            let limit_ms = (self.params.max_steering_rate_rads * ds_m / steering_diff_rad)
                .max(self.params.min_curve_velocity_ms);

            output[i].long_velocity_ms = output[i].long_velocity_ms.min(limit_ms);
            output[i + 1].long_velocity_ms = output[i + 1].long_velocity_ms.min(limit_ms);
        }

        output
    }

    fn resample_trajectory(
        &self,
        points: &[TrajectoryPoint],
        speed_ms: f64,
        pose: &Pose,
        dist_threshold_m: f64,
        yaw_threshold_rad: f64,
    ) -> Vec<TrajectoryPoint> {
        let start_idx = match self.find_nearest_index(
            points,
            pose,
            dist_threshold_m,
            yaw_threshold_rad,
        ) {
            Some(i) => i.saturating_sub(1),
            None => return Vec::new(),
        };

        let interval_m =
            (speed_ms.abs() * self.params.resample_dt_s).max(self.params.min_resample_interval_m);

        resample_by_distance(&points[start_idx..], interval_m)
    }

    /// Bound the profile by the acceleration limits.
    ///
    /// The first point takes the initial speed, which is kept even if the deceleration limit
    /// cannot be met after it.
    fn apply(
        &mut self,
        initial_motion: &InitialMotion,
        points: &[TrajectoryPoint],
    ) -> Result<Vec<TrajectoryPoint>, SmootherError> {
        let num_points = points.len();
        if num_points < 2 {
            return Err(SmootherError::TooFewPoints(num_points));
        }

        let mut output = points.to_vec();
        let ds_m: Vec<f64> = output
            .windows(2)
            .map(|w| geom::distance2d(&w[0], &w[1]))
            .collect();

        output[0].long_velocity_ms = initial_motion.speed_ms;

        for i in 1..num_points {
            let reachable_ms = (output[i - 1].long_velocity_ms.powi(2)
                + 2.0 * self.params.max_acc_ms2 * ds_m[i - 1])
                .sqrt();
            output[i].long_velocity_ms = output[i].long_velocity_ms.min(reachable_ms);
        }

        for i in (1..num_points - 1).rev() {
            let stoppable_ms = (output[i + 1].long_velocity_ms.powi(2)
                - 2.0 * self.params.min_decel_ms2 * ds_m[i])
                .sqrt();
            output[i].long_velocity_ms = output[i].long_velocity_ms.min(stoppable_ms);
        }

        for i in 0..num_points - 1 {
            output[i].acceleration_ms2 = if ds_m[i] < std::f64::EPSILON {
                0.0
            } else {
                (output[i + 1].long_velocity_ms.powi(2) - output[i].long_velocity_ms.powi(2))
                    / (2.0 * ds_m[i])
            };
        }
        output[num_points - 1].acceleration_ms2 = 0.0;

        if let Some(i) = output
            .iter()
            .position(|p| !p.long_velocity_ms.is_finite() || !p.acceleration_ms2.is_finite())
        {
            return Err(SmootherError::NonFiniteResult(i));
        }

        Ok(output)
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Signed curvature at each point from the circle through it and its neighbours.
///
/// The end points take the curvature of their neighbour. Needs at least three points.
fn curvatures(points: &[TrajectoryPoint]) -> Vec<f64> {
    let n = points.len();
    let mut curvatures = vec![0.0; n];

    for i in 1..n - 1 {
        let p0 = &points[i - 1].pose.position_m;
        let p1 = &points[i].pose.position_m;
        let p2 = &points[i + 1].pose.position_m;

        let a = geom::distance2d(&points[i - 1], &points[i]);
        let b = geom::distance2d(&points[i], &points[i + 1]);
        let c = geom::distance2d(&points[i - 1], &points[i + 1]);
        let cross = (p1.x - p0.x) * (p2.y - p0.y) - (p1.y - p0.y) * (p2.x - p0.x);

        let denom = a * b * c;
        curvatures[i] = if denom < std::f64::EPSILON {
            0.0
        } else {
            2.0 * cross / denom
        };
    }

    curvatures[0] = curvatures[1];
    curvatures[n - 1] = curvatures[n - 2];

    curvatures
}
