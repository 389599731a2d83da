//! # Stop / Anchor Detection
//!
//! Finds places where the subject lingered. A dwell starts at a search origin
//! `A` and is confirmed once some later fix `B` is still within
//! `stationary_radius` of `A` at least `record_delay_secs` later. The dwell ends
//! at the anchor `C`: the last fix within `max_stationary_radius` of `A` before
//! the trace first leaves that radius.
//!
//! Both scans stop at the first fix outside `max_stationary_radius`, so the
//! cost of one search is bounded by the number of fixes near the origin. A
//! trace that never moves is the worst case: every search walks to the end.

use crate::geo_utils::{elapsed_seconds, haversine_distance};
use crate::{Fix, SegmentationConfig};

/// A confirmed dwell, expressed as indices into the fix slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor {
    /// Search origin `A`: the fix where the dwell began.
    pub origin: usize,
    /// First fix `B` that satisfied both the dwell time and the stationary radius.
    pub confirmation: usize,
    /// Last fix `C` still inside the maximum stationary radius. The next
    /// segment starts here.
    pub anchor: usize,
}

/// Search for an anchor starting from `fixes[origin]`.
///
/// Returns `None` if the subject leaves `max_stationary_radius` before the
/// dwell time elapses, or if `origin` is the last index.
pub fn find_anchor(fixes: &[Fix], origin: usize, config: &SegmentationConfig) -> Option<Anchor> {
    let reference = fixes.get(origin)?;
    let confirmation = find_confirmation(fixes, origin, reference, config)?;
    let anchor = find_departure(fixes, origin, reference, config)?;

    Some(Anchor { origin, confirmation, anchor })
}

/// First pass: the earliest fix `B` that proves a dwell.
fn find_confirmation(
    fixes: &[Fix],
    origin: usize,
    reference: &Fix,
    config: &SegmentationConfig,
) -> Option<usize> {
    for (offset, candidate) in fixes[origin + 1..].iter().enumerate() {
        let distance = haversine_distance(reference, candidate);
        if distance > config.max_stationary_radius {
            return None;
        }
        if elapsed_seconds(reference, candidate) >= config.record_delay_secs
            && distance <= config.stationary_radius
        {
            return Some(origin + 1 + offset);
        }
    }
    None
}

/// Second pass: the last fix `C` before the trace leaves the maximum radius.
fn find_departure(
    fixes: &[Fix],
    origin: usize,
    reference: &Fix,
    config: &SegmentationConfig,
) -> Option<usize> {
    fixes[origin + 1..]
        .iter()
        .take_while(|candidate| {
            haversine_distance(reference, candidate) <= config.max_stationary_radius
        })
        .count()
        .checked_sub(1)
        .map(|last| origin + 1 + last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{north_of, BASE_LAT};

    /// `n` fixes every `interval_ms`, jittering within a few meters of the origin.
    fn dwell(n: usize, interval_ms: i64) -> Vec<Fix> {
        (0..n)
            .map(|i| north_of(BASE_LAT, (i % 3) as f64 * 2.0, i as i64 * interval_ms))
            .collect()
    }

    #[test]
    fn test_no_anchor_when_moving_away() {
        let fixes: Vec<Fix> = (0..10).map(|i| north_of(BASE_LAT, i as f64 * 30.0, i * 20_000)).collect();
        assert_eq!(find_anchor(&fixes, 0, &SegmentationConfig::default()), None);
    }

    #[test]
    fn test_no_anchor_when_dwell_too_short() {
        // 19 fixes at 10s = 180s < 200s record delay.
        let fixes = dwell(19, 10_000);
        assert_eq!(find_anchor(&fixes, 0, &SegmentationConfig::default()), None);
    }

    #[test]
    fn test_anchor_is_last_fix_before_leaving() {
        // 26 fixes over 250s near the origin, then the subject walks off.
        let mut fixes = dwell(26, 10_000);
        fixes.push(north_of(BASE_LAT, 40.0, 260_000));
        fixes.push(north_of(BASE_LAT, 80.0, 270_000));

        let anchor = find_anchor(&fixes, 0, &SegmentationConfig::default()).unwrap();
        assert_eq!(anchor.origin, 0);
        assert_eq!(anchor.confirmation, 20);
        assert_eq!(anchor.anchor, 25);
    }

    #[test]
    fn test_anchor_runs_to_end_of_trace() {
        let fixes = dwell(26, 10_000);
        let anchor = find_anchor(&fixes, 0, &SegmentationConfig::default()).unwrap();
        assert_eq!(anchor.anchor, 25);
    }

    #[test]
    fn test_confirmation_requires_stationary_radius() {
        // Everything sits 22m away: inside the max radius but outside the
        // stationary radius, so the dwell is never confirmed.
        let mut fixes = vec![north_of(BASE_LAT, 0.0, 0)];
        fixes.extend((1..30).map(|i| north_of(BASE_LAT, 22.0, i * 10_000)));
        assert_eq!(find_anchor(&fixes, 0, &SegmentationConfig::default()), None);

        let config = SegmentationConfig { stationary_radius: 23.0, ..Default::default() };
        let anchor = find_anchor(&fixes, 0, &config).unwrap();
        assert_eq!(anchor.confirmation, 20);
        assert_eq!(anchor.anchor, 29);
    }

    #[test]
    fn test_departure_stops_at_first_exit() {
        // Leaves the radius at index 22 and comes back: the return is ignored.
        let mut fixes = dwell(22, 10_000);
        fixes.push(north_of(BASE_LAT, 60.0, 220_000));
        fixes.push(north_of(BASE_LAT, 1.0, 230_000));

        let anchor = find_anchor(&fixes, 0, &SegmentationConfig::default()).unwrap();
        assert_eq!(anchor.anchor, 21);
    }

    #[test]
    fn test_origin_out_of_range() {
        let fixes = dwell(3, 10_000);
        assert_eq!(find_anchor(&fixes, 2, &SegmentationConfig::default()), None);
        assert_eq!(find_anchor(&fixes, 3, &SegmentationConfig::default()), None);
    }
}
