//! # Geographic Utilities
//!
//! Distance, time and speed primitives shared by every stage of the segmenter.
//!
//! ## Overview
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`haversine_distance`] | Great-circle distance between two fixes |
//! | [`polyline_length`] | Total length of a run of fixes in meters |
//! | [`elapsed_seconds`] | Time between two fixes in seconds |
//! | [`checked_speed`] | Point-to-point speed, failing on zero-length intervals |
//! | [`average_speed`] | Mean of point-to-point speeds over a run of fixes |
//! | [`compute_bounds`] | Bounding box of a run of fixes |
//! | [`compute_center`] | Centroid of a run of fixes |
//!
//! ## Example
//!
//! ```rust
//! use footpath_segmenter::{Fix, geo_utils};
//!
//! let track = vec![
//!     Fix::new(51.5074, -0.1278, 0),
//!     Fix::new(51.5080, -0.1290, 60_000),
//!     Fix::new(51.5090, -0.1300, 120_000),
//! ];
//!
//! let length = geo_utils::polyline_length(&track);
//! let speed = geo_utils::average_speed(&track);
//! println!("{:.0}m at {:.2} m/s", length, speed);
//! ```
//!
//! ## Algorithm Notes
//!
//! ### Average speed
//!
//! The average speed of a run is the arithmetic mean of the instantaneous
//! speeds between consecutive fixes, not total distance over total time.
//! A slow stretch sampled often therefore weighs more than a fast stretch
//! sampled rarely, which is what lets short walking legs dominate the start
//! of an otherwise fast segment.
//!
//! Pairs that share a timestamp have no defined speed. They are skipped: they
//! contribute neither to the sum nor to the divisor.
//!
//! ### Coordinate System
//!
//! All functions expect WGS84 coordinates (latitude/longitude in degrees).

use geo::{Distance, Haversine, Point};

use crate::error::{Result, SegmentationError};
use crate::{Bounds, Fix};

// =============================================================================
// Distance Functions
// =============================================================================

/// Calculate the great-circle distance between two fixes using the Haversine formula.
///
/// Returns meters along a spherical Earth. Symmetric, and zero for identical
/// coordinates regardless of timestamps.
///
/// # Example
///
/// ```rust
/// use footpath_segmenter::{Fix, geo_utils};
///
/// let london = Fix::new(51.5074, -0.1278, 0);
/// let paris = Fix::new(48.8566, 2.3522, 0);
///
/// let distance = geo_utils::haversine_distance(&london, &paris);
/// assert!((distance - 343_560.0).abs() < 1000.0);
/// ```
#[inline]
pub fn haversine_distance(a: &Fix, b: &Fix) -> f64 {
    let point1 = Point::new(a.longitude, a.latitude);
    let point2 = Point::new(b.longitude, b.latitude);
    Haversine::distance(point1, point2)
}

/// Total length of a run of fixes in meters.
///
/// Empty or single-fix runs return 0.0.
pub fn polyline_length(fixes: &[Fix]) -> f64 {
    if fixes.len() < 2 {
        return 0.0;
    }

    fixes
        .windows(2)
        .map(|w| haversine_distance(&w[0], &w[1]))
        .sum()
}

// =============================================================================
// Time and Speed Functions
// =============================================================================

/// Seconds elapsed from `a` to `b`. Negative if `b` is earlier.
///
/// Computed in floating point so timestamps anywhere in the `i64` range cannot overflow.
#[inline]
pub fn elapsed_seconds(a: &Fix, b: &Fix) -> f64 {
    (b.timestamp as f64 - a.timestamp as f64) / 1000.0
}

/// Speed in m/s between two fixes.
///
/// # Errors
///
/// Returns [`SegmentationError::DegenerateInterval`] when both fixes share a
/// timestamp.
///
/// # Example
///
/// ```rust
/// use footpath_segmenter::{Fix, geo_utils};
///
/// let a = Fix::new(51.5074, -0.1278, 1_000);
/// let b = Fix::new(51.5075, -0.1278, 1_000);
/// assert!(geo_utils::checked_speed(&a, &b).is_err());
/// ```
pub fn checked_speed(a: &Fix, b: &Fix) -> Result<f64> {
    let seconds = elapsed_seconds(a, b);
    if seconds == 0.0 {
        return Err(SegmentationError::DegenerateInterval {
            timestamp: a.timestamp,
        });
    }
    Ok(haversine_distance(a, b) / seconds)
}

/// Mean of the point-to-point speeds over a run of fixes, in m/s.
///
/// Runs of fewer than two fixes, or whose every pair shares a timestamp,
/// return 0.0. Zero-interval pairs are left out of the mean.
pub fn average_speed(fixes: &[Fix]) -> f64 {
    let (sum, count) = fixes
        .windows(2)
        .filter_map(|w| checked_speed(&w[0], &w[1]).ok())
        .fold((0.0, 0usize), |(sum, count), speed| (sum + speed, count + 1));

    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Seconds between the first and last fix of a run. 0.0 when empty.
pub fn duration_seconds(fixes: &[Fix]) -> f64 {
    match (fixes.first(), fixes.last()) {
        (Some(first), Some(last)) => elapsed_seconds(first, last),
        _ => 0.0,
    }
}

// =============================================================================
// Bounding Box / Center Functions
// =============================================================================

/// Bounding box of a run of fixes, or `None` when empty.
///
/// # Example
///
/// ```rust
/// use footpath_segmenter::{Fix, geo_utils};
///
/// let track = vec![
///     Fix::new(51.5000, -0.1300, 0),
///     Fix::new(51.5100, -0.1200, 1_000),
/// ];
///
/// let bounds = geo_utils::compute_bounds(&track).unwrap();
/// assert_eq!(bounds.min_lat, 51.5000);
/// assert_eq!(bounds.max_lng, -0.1200);
/// ```
pub fn compute_bounds(fixes: &[Fix]) -> Option<Bounds> {
    if fixes.is_empty() {
        return None;
    }

    let mut min_lat = f64::MAX;
    let mut max_lat = f64::MIN;
    let mut min_lng = f64::MAX;
    let mut max_lng = f64::MIN;

    for f in fixes {
        min_lat = min_lat.min(f.latitude);
        max_lat = max_lat.max(f.latitude);
        min_lng = min_lng.min(f.longitude);
        max_lng = max_lng.max(f.longitude);
    }

    Some(Bounds { min_lat, max_lat, min_lng, max_lng })
}

/// Arithmetic mean of the coordinates as `(latitude, longitude)`.
///
/// Returns `(0.0, 0.0)` for empty input. Fine for the few hundred meters a
/// dwell or a daily segment spans; not meant for tracks crossing the antimeridian.
pub fn compute_center(fixes: &[Fix]) -> (f64, f64) {
    if fixes.is_empty() {
        return (0.0, 0.0);
    }

    let n = fixes.len() as f64;
    let sum_lat: f64 = fixes.iter().map(|f| f.latitude).sum();
    let sum_lng: f64 = fixes.iter().map(|f| f.longitude).sum();

    (sum_lat / n, sum_lng / n)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{north_of, BASE_LAT, BASE_LNG};

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    #[test]
    fn test_haversine_distance_same_point() {
        let a = Fix::new(51.5074, -0.1278, 0);
        let b = Fix::new(51.5074, -0.1278, 99_000);
        assert_eq!(haversine_distance(&a, &b), 0.0);
    }

    #[test]
    fn test_haversine_distance_symmetric() {
        let a = Fix::new(51.5074, -0.1278, 0);
        let b = Fix::new(48.8566, 2.3522, 0);
        assert!(approx_eq(haversine_distance(&a, &b), haversine_distance(&b, &a), 1e-6));
        assert!(approx_eq(haversine_distance(&a, &b), 343_560.0, 5000.0));
    }

    #[test]
    fn test_north_of_helper_distance() {
        let a = Fix::new(BASE_LAT, BASE_LNG, 0);
        let b = north_of(BASE_LAT, 30.0, 0);
        assert!(approx_eq(haversine_distance(&a, &b), 30.0, 1e-3));
    }

    #[test]
    fn test_polyline_length_empty_and_single() {
        assert_eq!(polyline_length(&[]), 0.0);
        assert_eq!(polyline_length(&[Fix::new(BASE_LAT, BASE_LNG, 0)]), 0.0);
    }

    #[test]
    fn test_polyline_length_sums_pairs() {
        let track: Vec<Fix> = (0..5).map(|i| north_of(BASE_LAT, i as f64 * 10.0, i * 1000)).collect();
        assert!(approx_eq(polyline_length(&track), 40.0, 1e-3));
    }

    #[test]
    fn test_elapsed_seconds() {
        let a = Fix::new(BASE_LAT, BASE_LNG, 1_000);
        let b = Fix::new(BASE_LAT, BASE_LNG, 3_500);
        assert_eq!(elapsed_seconds(&a, &b), 2.5);
        assert_eq!(elapsed_seconds(&b, &a), -2.5);
    }

    #[test]
    fn test_checked_speed_degenerate_interval() {
        let a = Fix::new(BASE_LAT, BASE_LNG, 5_000);
        let b = north_of(BASE_LAT, 10.0, 5_000);
        assert_eq!(
            checked_speed(&a, &b),
            Err(SegmentationError::DegenerateInterval { timestamp: 5_000 })
        );
    }

    #[test]
    fn test_average_speed_is_mean_of_pair_speeds() {
        // 10m in 10s (1 m/s), then 90m in 10s (9 m/s): mean 5 m/s.
        let track = vec![
            north_of(BASE_LAT, 0.0, 0),
            north_of(BASE_LAT, 10.0, 10_000),
            north_of(BASE_LAT, 100.0, 20_000),
        ];
        assert!(approx_eq(average_speed(&track), 5.0, 1e-3));
    }

    #[test]
    fn test_average_speed_short_runs_are_zero() {
        assert_eq!(average_speed(&[]), 0.0);
        assert_eq!(average_speed(&[Fix::new(BASE_LAT, BASE_LNG, 0)]), 0.0);
    }

    #[test]
    fn test_average_speed_skips_equal_timestamps() {
        // Only pair has zero duration: no valid pair, average is 0.
        let pair = vec![north_of(BASE_LAT, 0.0, 1_000), north_of(BASE_LAT, 50.0, 1_000)];
        assert_eq!(average_speed(&pair), 0.0);

        // The zero-duration pair is excluded from the divisor as well.
        let track = vec![
            north_of(BASE_LAT, 0.0, 0),
            north_of(BASE_LAT, 20.0, 10_000),
            north_of(BASE_LAT, 25.0, 10_000),
            north_of(BASE_LAT, 45.0, 20_000),
        ];
        assert!(approx_eq(average_speed(&track), 2.0, 1e-3));
    }

    #[test]
    fn test_elapsed_seconds_extreme_timestamps() {
        let a = Fix::new(51.5074, -0.1278, i64::MIN);
        let b = Fix::new(51.5075, -0.1278, i64::MAX);
        let seconds = elapsed_seconds(&a, &b);
        assert!(seconds.is_finite());
        assert!(seconds > 1.8e16);
        assert!(elapsed_seconds(&b, &a) < 0.0);
    }

    #[test]
    fn test_duration_seconds() {
        let track = vec![north_of(BASE_LAT, 0.0, 2_000), north_of(BASE_LAT, 5.0, 62_000)];
        assert_eq!(duration_seconds(&track), 60.0);
        assert_eq!(duration_seconds(&[]), 0.0);
    }

    #[test]
    fn test_compute_bounds() {
        let track = vec![
            Fix::new(51.50, -0.13, 0),
            Fix::new(51.51, -0.12, 1),
            Fix::new(51.505, -0.125, 2),
        ];
        let bounds = compute_bounds(&track).unwrap();
        assert_eq!(bounds.min_lat, 51.50);
        assert_eq!(bounds.max_lat, 51.51);
        assert_eq!(bounds.min_lng, -0.13);
        assert_eq!(bounds.max_lng, -0.12);
        assert!(compute_bounds(&[]).is_none());
    }

    #[test]
    fn test_compute_center() {
        let track = vec![Fix::new(51.50, -0.10, 0), Fix::new(51.52, -0.12, 1)];
        let (lat, lng) = compute_center(&track);
        assert!(approx_eq(lat, 51.51, 0.001));
        assert!(approx_eq(lng, -0.11, 0.001));
        assert_eq!(compute_center(&[]), (0.0, 0.0));
    }
}
