//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Linearly interpolate between `a` and `b` by `ratio`.
///
/// `ratio` is not clamped, values outside of [0, 1] extrapolate.
pub fn lerp<T>(a: T, b: T, ratio: T) -> T
where
    T: Float,
{
    a + (b - a) * ratio
}

/// Wrap an angle in radians into the range [-pi, pi).
pub fn normalize_radian<T>(value: T) -> T
where
    T: Float,
{
    let pi_t: T = T::from(std::f64::consts::PI).unwrap();
    let tau_t: T = T::from(std::f64::consts::TAU).unwrap();

    let wrapped = rem_euclid(value + pi_t, tau_t) - pi_t;

    // Round-off in rem_euclid can land exactly on +pi
    if wrapped >= pi_t {
        wrapped - tau_t
    } else {
        wrapped
    }
}

/// Wrap an angle in degrees into the range [-180, 180).
pub fn normalize_degree<T>(value: T) -> T
where
    T: Float,
{
    let half_t: T = T::from(180.0).unwrap();
    let full_t: T = T::from(360.0).unwrap();

    let wrapped = rem_euclid(value + half_t, full_t) - half_t;

    if wrapped >= half_t {
        wrapped - full_t
    } else {
        wrapped
    }
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// This function is taken from the std library as num is missing it.
///
/// In particular, the return value `r` satisfies `0.0 <= r < rhs.abs()` in
/// most cases. However, due to a floating point round-off error it can
/// result in `r == rhs.abs()`, violating the mathematical definition, if
/// `self` is much smaller than `rhs.abs()` in magnitude and `self < 0.0`.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float,
{
    let r = lhs % rhs;
    if r < T::zero() {
        r + rhs.abs()
    } else {
        r
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_lerp() {
        assert_eq!(lerp(0f64, 10f64, 0.25), 2.5);
        assert_eq!(lerp(-1f64, 1f64, 0.5), 0.0);
        assert_eq!(lerp(2f64, 4f64, 1.5), 5.0);
    }

    #[test]
    fn test_normalize_radian() {
        assert!((normalize_radian(0f64)).abs() < 1e-12);
        assert!((normalize_radian(3.0 * PI) + PI).abs() < 1e-12);
        assert!((normalize_radian(-PI / 2.0) + PI / 2.0).abs() < 1e-12);
        assert!((normalize_radian(2.0 * PI + 0.5) - 0.5).abs() < 1e-12);
        assert!((normalize_radian(-2.0 * PI - 0.5) + 0.5).abs() < 1e-12);

        let wrapped = normalize_radian(PI);
        assert!(wrapped >= -PI && wrapped < PI);
    }

    #[test]
    fn test_normalize_degree() {
        assert_eq!(normalize_degree(0f64), 0.0);
        assert_eq!(normalize_degree(190f64), -170.0);
        assert_eq!(normalize_degree(-190f64), 170.0);
        assert_eq!(normalize_degree(720f64 + 45.0), 45.0);
        assert_eq!(normalize_degree(180f64), -180.0);
        assert!(normalize_degree(f64::NAN).is_nan());
    }
}
