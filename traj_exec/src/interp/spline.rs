//! # Spline re-interpolation
//!
//! Replaces the geometry of a trajectory with a smooth curve through its points, sampled at a
//! fixed arc-length resolution.
//!
//! The planar position is fitted with an Akima spline in arc length, which avoids the overshoot a
//! natural cubic spline shows around sharp changes in curvature. Height and time from start are
//! interpolated linearly, and the velocity, acceleration and heading rate of a sample are taken
//! from the start of the segment it lies on.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::msg::TrajectoryPoint;
use log::trace;

use super::geom::{self, is_valid_pose};
use super::{InterpError, Stage, MIN_TRAJ_POINTS};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// If the last sample is further than this from the last input point the input point is appended.
pub const END_POINT_TOLERANCE_M: f64 = 1e-2;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An Akima spline through a set of knots.
///
/// Each segment `i` is the cubic `a + b dx + c dx^2 + d dx^3` with `dx = s - bases[i]`.
#[derive(Debug, Clone)]
pub struct AkimaSpline {
    bases: Vec<f64>,
    a: Vec<f64>,
    b: Vec<f64>,
    c: Vec<f64>,
    d: Vec<f64>,
}

/// A trajectory interpolated along its arc length.
#[derive(Debug, Clone)]
pub struct InterpolatedTrajectory {
    /// Arc length of each source point
    bases: Vec<f64>,

    x: AkimaSpline,
    y: AkimaSpline,

    /// The source points, used for the fields which are not fitted
    points: Vec<TrajectoryPoint>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum SplineError {
    #[error("An Akima spline needs at least {required} knots, found {found}")]
    TooFewKnots { found: usize, required: usize },

    #[error("Found {num_bases} bases but {num_values} values")]
    LengthMismatch { num_bases: usize, num_values: usize },

    #[error("Base {0} is not strictly greater than the previous base")]
    NonIncreasingBases(usize),

    #[error("Knot {0} is not finite")]
    NonFiniteKnot(usize),

    #[error("The sampling resolution must be strictly positive, found {0}")]
    InvalidResolution(f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl AkimaSpline {
    /// Minimum number of knots needed to fit the spline.
    pub const MIN_KNOTS: usize = 5;

    /// Fit a spline through the given knots. `bases` must be strictly increasing.
    pub fn new(bases: &[f64], values: &[f64]) -> Result<Self, SplineError> {
        if bases.len() != values.len() {
            return Err(SplineError::LengthMismatch {
                num_bases: bases.len(),
                num_values: values.len(),
            });
        }
        if bases.len() < Self::MIN_KNOTS {
            return Err(SplineError::TooFewKnots {
                found: bases.len(),
                required: Self::MIN_KNOTS,
            });
        }
        if let Some(i) = (0..bases.len()).find(|&i| !bases[i].is_finite() || !values[i].is_finite()) {
            return Err(SplineError::NonFiniteKnot(i));
        }
        if let Some(i) = (1..bases.len()).find(|&i| !(bases[i] > bases[i - 1])) {
            return Err(SplineError::NonIncreasingBases(i));
        }

        let n = bases.len();
        let h: Vec<f64> = bases.windows(2).map(|w| w[1] - w[0]).collect();

        // Segment slopes, extended by two on each side by linear extrapolation. Slope `m_i` is
        // at index `i + 2`.
        let mut m = Vec::with_capacity(n + 3);
        m.push(0.0);
        m.push(0.0);
        for i in 0..n - 1 {
            m.push((values[i + 1] - values[i]) / h[i]);
        }
        m[1] = 2.0 * m[2] - m[3];
        m[0] = 2.0 * m[1] - m[2];
        let last = m.len() - 1;
        m.push(2.0 * m[last] - m[last - 1]);
        m.push(2.0 * m[last + 1] - m[last]);

        // Knot derivatives
        let t: Vec<f64> = (0..n)
            .map(|i| {
                let j = i + 2;
                let w_next = (m[j + 1] - m[j]).abs();
                let w_prev = (m[j - 1] - m[j - 2]).abs();
                if w_next + w_prev < std::f64::EPSILON {
                    0.5 * (m[j - 1] + m[j])
                } else {
                    (w_next * m[j - 1] + w_prev * m[j]) / (w_next + w_prev)
                }
            })
            .collect();

        let mut a = Vec::with_capacity(n - 1);
        let mut b = Vec::with_capacity(n - 1);
        let mut c = Vec::with_capacity(n - 1);
        let mut d = Vec::with_capacity(n - 1);
        for i in 0..n - 1 {
            let slope = m[i + 2];
            a.push(values[i]);
            b.push(t[i]);
            c.push((3.0 * slope - 2.0 * t[i] - t[i + 1]) / h[i]);
            d.push((t[i] + t[i + 1] - 2.0 * slope) / h[i].powi(2));
        }

        Ok(Self {
            bases: bases.to_vec(),
            a,
            b,
            c,
            d,
        })
    }

    /// Value of the spline at `s`. Values outside the knots extrapolate the end segments.
    pub fn compute(&self, s: f64) -> f64 {
        let i = segment_index(&self.bases, s);
        let dx = s - self.bases[i];
        self.a[i] + self.b[i] * dx + self.c[i] * dx.powi(2) + self.d[i] * dx.powi(3)
    }

    /// First derivative of the spline at `s`.
    pub fn compute_first_derivative(&self, s: f64) -> f64 {
        let i = segment_index(&self.bases, s);
        let dx = s - self.bases[i];
        self.b[i] + 2.0 * self.c[i] * dx + 3.0 * self.d[i] * dx.powi(2)
    }
}

impl InterpolatedTrajectory {
    /// Fit the planar position of the points against their arc length.
    pub fn build(points: &[TrajectoryPoint]) -> Result<Self, SplineError> {
        let bases = geom::arc_lengths(points);

        let xs: Vec<f64> = points.iter().map(|p| p.pose.position_m.x).collect();
        let ys: Vec<f64> = points.iter().map(|p| p.pose.position_m.y).collect();

        Ok(Self {
            x: AkimaSpline::new(&bases, &xs)?,
            y: AkimaSpline::new(&bases, &ys)?,
            bases,
            points: points.to_vec(),
        })
    }

    /// Total arc length of the source points.
    pub fn length(&self) -> f64 {
        self.bases.last().copied().unwrap_or(0.0)
    }

    /// Sample the trajectory at arc length `s`.
    ///
    /// The orientation of the sample follows the direction of travel along the curve.
    pub fn compute(&self, s: f64) -> TrajectoryPoint {
        let i = segment_index(&self.bases, s);
        let ratio = (s - self.bases[i]) / (self.bases[i + 1] - self.bases[i]);
        let start = &self.points[i];
        let end = &self.points[i + 1];

        let mut point = *start;
        point.pose.position_m.x = self.x.compute(s);
        point.pose.position_m.y = self.y.compute(s);
        point.pose.position_m.z = util::maths::lerp(
            start.pose.position_m.z,
            end.pose.position_m.z,
            ratio,
        );
        point.time_from_start_s =
            util::maths::lerp(start.time_from_start_s, end.time_from_start_s, ratio);

        let dx = self.x.compute_first_derivative(s);
        let dy = self.y.compute_first_derivative(s);
        let dz = (end.pose.position_m.z - start.pose.position_m.z)
            / (self.bases[i + 1] - self.bases[i]);
        let yaw_rad = dy.atan2(dx);
        let pitch_rad = -dz.atan2((dx.powi(2) + dy.powi(2)).sqrt());
        point.pose.set_pitch_yaw(pitch_rad, yaw_rad);

        point
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Replace the trajectory with samples of a spline through its points, taken every
/// `resolution_m` of arc length.
///
/// If the spline cannot be built, or fewer than two valid samples are produced, an error is
/// returned and the trajectory is left unmodified. Samples with a non-finite pose are dropped. The
/// last input point is appended to the samples when it is valid and further than
/// [`END_POINT_TOLERANCE_M`] from the last sample.
pub fn apply_spline(
    points: &mut Vec<TrajectoryPoint>,
    resolution_m: f64,
) -> Result<(), InterpError> {
    if !(resolution_m > 0.0) {
        return Err(InterpError::SplineFailed(SplineError::InvalidResolution(
            resolution_m,
        )));
    }

    let interp = InterpolatedTrajectory::build(points).map_err(InterpError::SplineFailed)?;

    let length_m = interp.length();
    let num_steps = (length_m / resolution_m).floor() as usize;

    let mut output = Vec::with_capacity(num_steps + 2);
    for step in 0..=num_steps {
        let sample = interp.compute(step as f64 * resolution_m);
        if is_valid_pose(&sample.pose) {
            output.push(sample);
        } else {
            trace!("Dropping spline sample {} with invalid pose", step);
        }
    }

    if output.len() < MIN_TRAJ_POINTS {
        return Err(InterpError::insufficient(Stage::Spline, output.len()));
    }

    // The source is non-empty since the spline was built
    if let (Some(last_input), Some(last_sample)) = (points.last(), output.last()) {
        if is_valid_pose(&last_input.pose)
            && geom::distance2d(last_sample, last_input) > END_POINT_TOLERANCE_M
        {
            output.push(*last_input);
        }
    }

    *points = output;

    Ok(())
}

/// Index of the segment of `bases` containing `s`, clamped to the first and last segments.
fn segment_index(bases: &[f64], s: f64) -> usize {
    // Number of interior bases at or before s
    bases[1..bases.len() - 1].partition_point(|&b| b <= s)
}
