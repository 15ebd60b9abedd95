//! # Elastic band path smoother
//!
//! Reference [`PathSmoother`] which relaxes the trajectory like an elastic band. Each iteration
//! pulls every free point towards the midpoint of its neighbours while a weaker spring pulls it
//! back towards its original position. Points are never moved further than a maximum deviation
//! from the original path.
//!
//! The points up to and including the one nearest the vehicle, and the last point, are fixed so
//! that the smoothed path still starts at the vehicle and ends at the goal.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::msg::{Pose, TrajectoryPoint};
use nalgebra::Vector2;
use serde::Deserialize;

use super::params::{in_range, not_negative, positive};
use super::{geom, sanitise, ParamsError, PathSmoother};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ElasticBandParams {
    /// Number of relaxation iterations per call
    pub num_iterations: usize,

    /// Weight of the pull towards the midpoint of the neighbours, at most 0.5
    pub smoothing_weight: f64,

    /// Weight of the pull back towards the original position, below 1
    pub anchoring_weight: f64,

    /// Maximum distance a point may be moved from its original position
    pub max_deviation_m: f64,
}

/// Elastic band smoother, warm started from its previous solution until reset.
#[derive(Debug, Clone, Default)]
pub struct ElasticBand {
    params: ElasticBandParams,

    /// Positions from the last call
    previous_band_m: Option<Vec<Vector2<f64>>>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for ElasticBandParams {
    fn default() -> Self {
        Self {
            num_iterations: 50,
            smoothing_weight: 0.3,
            anchoring_weight: 0.1,
            max_deviation_m: 0.5,
        }
    }
}

impl ElasticBandParams {
    pub fn validate(&self) -> Result<(), ParamsError> {
        positive("elastic_band.smoothing_weight", self.smoothing_weight)?;
        in_range("elastic_band.smoothing_weight", self.smoothing_weight, 0.0, 0.5)?;
        in_range("elastic_band.anchoring_weight", self.anchoring_weight, 0.0, 1.0)?;
        not_negative("elastic_band.max_deviation_m", self.max_deviation_m)
    }
}

impl ElasticBand {
    pub fn new(params: ElasticBandParams) -> Self {
        Self {
            params,
            previous_band_m: None,
        }
    }
}

impl PathSmoother for ElasticBand {
    fn smooth_trajectory(
        &mut self,
        points: &[TrajectoryPoint],
        ego_pose: &Pose,
    ) -> Vec<TrajectoryPoint> {
        let num_points = points.len();
        if num_points < 3 {
            return points.to_vec();
        }

        let original_m: Vec<Vector2<f64>> = points
            .iter()
            .map(|p| Vector2::new(p.pose.position_m.x, p.pose.position_m.y))
            .collect();

        let mut band_m = match self.previous_band_m.take() {
            Some(prev) if prev.len() == num_points => prev,
            _ => original_m.clone(),
        };

        let first_free = geom::find_nearest_index(points, ego_pose).unwrap_or(0) + 1;

        for _ in 0..self.params.num_iterations {
            for i in first_free..num_points - 1 {
                let laplacian = band_m[i - 1] + band_m[i + 1] - 2.0 * band_m[i];
                let anchor = original_m[i] - band_m[i];
                band_m[i] += self.params.smoothing_weight * laplacian
                    + self.params.anchoring_weight * anchor;

                let deviation = band_m[i] - original_m[i];
                let deviation_norm = deviation.norm();
                if deviation_norm > self.params.max_deviation_m {
                    band_m[i] =
                        original_m[i] + deviation * (self.params.max_deviation_m / deviation_norm);
                }
            }
        }

        let mut output = points.to_vec();
        for (p, b) in output.iter_mut().zip(band_m.iter()) {
            p.pose.position_m.x = b.x;
            p.pose.position_m.y = b.y;
        }
        sanitise::insert_orientation(&mut output, true);

        self.previous_band_m = Some(band_m);

        output
    }

    fn reset_previous_data(&mut self) {
        self.previous_band_m = None;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn zigzag(num_points: usize) -> Vec<TrajectoryPoint> {
        (0..num_points)
            .map(|i| {
                let y = if i % 2 == 0 { 0.0 } else { 0.4 };
                TrajectoryPoint::new(i as f64, y, 0.0, 1.0, 0.0)
            })
            .collect()
    }

    fn roughness(points: &[TrajectoryPoint]) -> f64 {
        points
            .windows(3)
            .map(|w| {
                let y = |p: &TrajectoryPoint| p.pose.position_m.y;
                (y(&w[0]) + y(&w[2]) - 2.0 * y(&w[1])).powi(2)
            })
            .sum()
    }

    #[test]
    fn test_elastic_band_smooths() {
        let points = zigzag(11);
        let mut band = ElasticBand::default();

        let output = band.smooth_trajectory(&points, &Pose::default());

        assert_eq!(output.len(), points.len());
        assert!(roughness(&output) < roughness(&points));

        // Fixed ends
        assert_eq!(output[0].pose.position_m, points[0].pose.position_m);
        assert_eq!(output[10].pose.position_m, points[10].pose.position_m);

        for (o, p) in output.iter().zip(points.iter()) {
            assert!(geom::distance2d(o, p) <= 0.5 + 1e-9);
            assert_eq!(o.long_velocity_ms, p.long_velocity_ms);
        }
    }

    #[test]
    fn test_elastic_band_reset() {
        let points = zigzag(7);
        let mut band = ElasticBand::default();

        let first = band.smooth_trajectory(&points, &Pose::default());
        band.reset_previous_data();
        let second = band.smooth_trajectory(&points, &Pose::default());

        assert_eq!(first, second);
    }

    #[test]
    fn test_params_validate() {
        assert!(ElasticBandParams::default().validate().is_ok());

        let params = ElasticBandParams {
            smoothing_weight: 0.8,
            ..ElasticBandParams::default()
        };
        assert!(params.validate().is_err());
    }
}
