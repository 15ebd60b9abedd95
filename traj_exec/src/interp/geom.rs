//! # Geometry primitives
//!
//! Planar distance, heading and search helpers shared by all stages of the pipeline. Positions
//! are taken from anything exposing a [`Pose`] through [`GetPose`], so the same functions work on
//! raw poses and on trajectory points.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector3;
use ordered_float::OrderedFloat;

// Internal
use comms_if::msg::{Pose, TrajectoryPoint};
pub use util::maths::{normalize_degree, normalize_radian};

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Access to the pose of an item.
pub trait GetPose {
    fn get_pose(&self) -> &Pose;
}

impl GetPose for Pose {
    fn get_pose(&self) -> &Pose {
        self
    }
}

impl GetPose for TrajectoryPoint {
    fn get_pose(&self) -> &Pose {
        &self.pose
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Euclidean distance between two items on the XY plane.
pub fn distance2d<A: GetPose, B: GetPose>(a: &A, b: &B) -> f64 {
    squared_distance2d(a, b).sqrt()
}

/// Squared euclidean distance between two items on the XY plane.
pub fn squared_distance2d<A: GetPose, B: GetPose>(a: &A, b: &B) -> f64 {
    let pa = &a.get_pose().position_m;
    let pb = &b.get_pose().position_m;
    (pa[0] - pb[0]).powi(2) + (pa[1] - pb[1]).powi(2)
}

/// Euclidean distance between two items in 3D.
pub fn distance3d<A: GetPose, B: GetPose>(a: &A, b: &B) -> f64 {
    (a.get_pose().position_m - b.get_pose().position_m).norm()
}

/// Returns true if every position and orientation component of the pose is finite.
pub fn is_valid_pose(pose: &Pose) -> bool {
    pose.position_m.iter().all(|v| v.is_finite())
        && pose.orientation_q.coords.iter().all(|v| v.is_finite())
}

/// Heading of the vector pointing from `from` to `to` on the XY plane.
pub fn azimuth<A: GetPose, B: GetPose>(from: &A, to: &B) -> f64 {
    let d = to.get_pose().position_m - from.get_pose().position_m;
    d[1].atan2(d[0])
}

/// Pitch of the vector pointing from `from` to `to`, positive when pointing downwards.
pub fn pitch<A: GetPose, B: GetPose>(from: &A, to: &B) -> f64 {
    let d = to.get_pose().position_m - from.get_pose().position_m;
    let dxy = (d[0].powi(2) + d[1].powi(2)).sqrt();
    -d[2].atan2(dxy)
}

/// Returns true if `to` lies in front of `from` with respect to the heading of `from`.
pub fn is_driving_forward<A: GetPose, B: GetPose>(from: &A, to: &B) -> bool {
    let heading_diff = normalize_radian(azimuth(from, to) - from.get_pose().yaw());
    heading_diff.abs() < std::f64::consts::FRAC_PI_2
}

/// Linear interpolation of the position of two poses.
///
/// The orientation of `from` is kept as is.
pub fn lerp_position(from: &Pose, to: &Pose, ratio: f64) -> Pose {
    Pose {
        position_m: from.position_m + (to.position_m - from.position_m) * ratio,
        orientation_q: from.orientation_q,
    }
}

/// Index of the item nearest to `target` on the XY plane, or `None` if `items` is empty.
pub fn find_nearest_index<T: GetPose, P: GetPose>(items: &[T], target: &P) -> Option<usize> {
    items
        .iter()
        .enumerate()
        .min_by_key(|(_, item)| OrderedFloat(squared_distance2d(*item, target)))
        .map(|(i, _)| i)
}

/// Find the nearest item to `pose`, preferring items which satisfy the distance and yaw
/// thresholds.
///
/// The search is performed in three passes, each only if the previous found nothing:
///  1. Items within both `dist_threshold_m` and `yaw_threshold_rad`. Only the first contiguous run
///     of items satisfying the constraints is considered, so that loops in the path resolve to
///     the earliest pass.
///  1. Items within `dist_threshold_m`, again only the first contiguous run.
///  1. The nearest item overall.
pub fn find_first_nearest_index_with_soft_constraints<T: GetPose>(
    items: &[T],
    pose: &Pose,
    dist_threshold_m: f64,
    yaw_threshold_rad: f64,
) -> Option<usize> {
    let squared_dist_threshold = dist_threshold_m.powi(2);

    let with_yaw = first_nearest_in_run(items, pose, |item, sq_dist| {
        let yaw_diff = normalize_radian(item.get_pose().yaw() - pose.yaw());
        sq_dist <= squared_dist_threshold && yaw_diff.abs() <= yaw_threshold_rad
    });
    if with_yaw.is_some() {
        return with_yaw;
    }

    let dist_only =
        first_nearest_in_run(items, pose, |_, sq_dist| sq_dist <= squared_dist_threshold);
    if dist_only.is_some() {
        return dist_only;
    }

    find_nearest_index(items, pose)
}

/// Index of the start of the segment nearest to `target`.
///
/// Returns `None` if there are fewer than two items.
pub fn find_nearest_segment_index<T: GetPose, P: GetPose>(
    items: &[T],
    target: &P,
) -> Option<usize> {
    if items.len() < 2 {
        return None;
    }

    let nearest_idx = find_nearest_index(items, target)?;

    if nearest_idx == 0 {
        return Some(0);
    }
    if nearest_idx == items.len() - 1 {
        return Some(items.len() - 2);
    }

    // Decide whether the target is before or after the nearest point along the path
    if longitudinal_offset_to_segment(items, nearest_idx, target) <= 0.0 {
        Some(nearest_idx - 1)
    } else {
        Some(nearest_idx)
    }
}

/// Signed distance along the segment starting at `seg_idx` from its start to the projection of
/// `target`.
///
/// If the segment is degenerate (zero length) the offset is zero.
pub fn longitudinal_offset_to_segment<T: GetPose, P: GetPose>(
    items: &[T],
    seg_idx: usize,
    target: &P,
) -> f64 {
    let start = &items[seg_idx].get_pose().position_m;
    let end = &items[seg_idx + 1].get_pose().position_m;
    let point = &target.get_pose().position_m;

    let seg = Vector3::new(end[0] - start[0], end[1] - start[1], 0.0);
    let to_point = Vector3::new(point[0] - start[0], point[1] - start[1], 0.0);

    let seg_len = seg.norm();
    if seg_len < std::f64::EPSILON {
        return 0.0;
    }

    seg.dot(&to_point) / seg_len
}

/// Cumulative XY arc length at each item, starting at zero.
pub fn arc_lengths<T: GetPose>(items: &[T]) -> Vec<f64> {
    let mut lengths = Vec::with_capacity(items.len());
    let mut total = 0.0;

    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            total += distance2d(&items[i - 1], item);
        }
        lengths.push(total);
    }

    lengths
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Nearest item within the first contiguous run of items satisfying `is_valid`.
fn first_nearest_in_run<T, F>(items: &[T], pose: &Pose, is_valid: F) -> Option<usize>
where
    T: GetPose,
    F: Fn(&T, f64) -> bool,
{
    let mut min_sq_dist = std::f64::MAX;
    let mut min_idx = None;

    for (i, item) in items.iter().enumerate() {
        let sq_dist = squared_distance2d(item, pose);

        if !is_valid(item, sq_dist) {
            if min_idx.is_some() {
                break;
            }
            continue;
        }

        if sq_dist < min_sq_dist {
            min_sq_dist = sq_dist;
            min_idx = Some(i);
        }
    }

    min_idx
}
