//! # Trajectory Segmentation
//!
//! Entry point of the engine: validates a fix history, cuts it at dwell
//! anchors into candidate segments, and classifies every candidate.
//!
//! ## Algorithm
//! 1. Walk the fixes with a cursor `i`, searching for an anchor from each one
//!    ([`find_anchor`]).
//! 2. When an anchor `C` is found, close the candidate from the current start
//!    up to and including `i`, record the dwell between `i` and `C` as a
//!    [`Stop`], and restart both the start and the cursor at `C`.
//! 3. Otherwise advance the cursor by one.
//! 4. Close one final candidate from the current start to the last fix.
//! 5. Classify each candidate ([`classify_segment`]).
//!
//! Candidates, stop interiors and the pieces the classifier produces are
//! disjoint index ranges, so every input fix ends up in exactly one of
//! `walking`, `faster`, `discarded`, or a stop.
//!
//! ## Complexity
//! Each anchor search scans forward while fixes stay near its origin, so the
//! candidate pass is linear for a moving trace and quadratic for a trace that
//! never leaves the stationary radius. Classification and refinement are
//! linear in the length of each candidate.

use std::time::Instant;

use log::{debug, info};

use crate::anchor::find_anchor;
use crate::classifier::{classify_segment, SegmentSink};
use crate::error::{Result, SegmentationError};
use crate::segment::{Segment, SegmentRecord, Stop};
use crate::{Fix, Label, SegmentationConfig};

/// Result of one segmentation call. Segments borrow the input slice.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Segmentation<'a> {
    /// Walking segments in time order
    pub walking: Vec<Segment<'a>>,
    /// Faster-than-walking segments in time order
    pub faster: Vec<Segment<'a>>,
    /// Too-short candidates and legs, in time order
    pub discarded: Vec<Segment<'a>>,
    /// Dwells that separated the candidates
    pub stops: Vec<Stop<'a>>,
}

impl<'a> Segmentation<'a> {
    fn from_sink(sink: SegmentSink<'a>, stops: Vec<Stop<'a>>) -> Self {
        Self {
            walking: sink.walking,
            faster: sink.faster,
            discarded: sink.discarded,
            stops,
        }
    }

    /// Walking and faster segments interleaved in time order.
    pub fn labeled(&self) -> Vec<(Label, Segment<'a>)> {
        let mut all: Vec<(Label, Segment<'a>)> = self
            .walking
            .iter()
            .map(|s| (Label::Walking, *s))
            .chain(self.faster.iter().map(|s| (Label::Faster, *s)))
            .collect();
        all.sort_by_key(|(_, s)| s.start_index());
        all
    }

    /// Owned copies of every classified segment, in time order.
    pub fn to_records(&self) -> Vec<SegmentRecord> {
        self.labeled()
            .into_iter()
            .map(|(label, segment)| segment.to_record(label))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.walking.is_empty() && self.faster.is_empty()
    }
}

/// Check that fixes are usable: finite, in range, and non-decreasing in time.
///
/// # Errors
///
/// [`SegmentationError::EmptyInput`], [`SegmentationError::InvalidFix`] or
/// [`SegmentationError::NonMonotonicTimestamp`] for the first offending fix.
pub fn validate_fixes(fixes: &[Fix]) -> Result<()> {
    if fixes.is_empty() {
        return Err(SegmentationError::EmptyInput);
    }

    for (index, fix) in fixes.iter().enumerate() {
        if !fix.is_valid() {
            return Err(SegmentationError::InvalidFix {
                index,
                latitude: fix.latitude,
                longitude: fix.longitude,
            });
        }
    }

    if let Some(index) = fixes.windows(2).position(|w| w[1].timestamp < w[0].timestamp) {
        return Err(SegmentationError::NonMonotonicTimestamp {
            index: index + 1,
            previous: fixes[index].timestamp,
            current: fixes[index + 1].timestamp,
        });
    }

    Ok(())
}

/// Cut the fixes at dwell anchors. Returns the candidates and the stops between them.
fn build_candidates<'a>(fixes: &'a [Fix], config: &SegmentationConfig) -> (Vec<Segment<'a>>, Vec<Stop<'a>>) {
    let mut candidates = Vec::new();
    let mut stops = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < fixes.len() {
        match find_anchor(fixes, i, config) {
            Some(anchor) => {
                debug!(
                    "[Segmenter] Dwell at {} confirmed by {}, departing at {}",
                    i, anchor.confirmation, anchor.anchor
                );
                candidates.extend(Segment::new(fixes, start..i + 1));
                stops.push(Stop::new(fixes, i, anchor.anchor));
                start = anchor.anchor;
                i = anchor.anchor;
            }
            None => i += 1,
        }
    }

    candidates.extend(Segment::new(fixes, start..fixes.len()));
    (candidates, stops)
}

/// Segment a fix history into walking and faster-than-walking segments.
///
/// Pure: the same fixes and configuration always give the same result, and
/// every call starts from empty output collections.
///
/// # Errors
///
/// Fails on invalid input (see [`validate_fixes`]), checked first, or an
/// invalid configuration.
///
/// # Example
///
/// ```rust
/// use footpath_segmenter::{Fix, SegmentationConfig, segment_trajectory};
///
/// // A 570m stroll: 30m every 20 seconds.
/// let fixes: Vec<Fix> = (0..20)
///     .map(|i| Fix::new(51.5 + i as f64 * 30.0 / 111_195.0, -0.12, i * 20_000))
///     .collect();
///
/// let result = segment_trajectory(&fixes, &SegmentationConfig::default()).unwrap();
/// assert_eq!(result.walking.len(), 1);
/// assert!(result.faster.is_empty());
/// ```
pub fn segment_trajectory<'a>(fixes: &'a [Fix], config: &SegmentationConfig) -> Result<Segmentation<'a>> {
    validate_fixes(fixes)?;
    config.validate()?;

    let start = Instant::now();
    let (candidates, stops) = build_candidates(fixes, config);

    let mut sink = SegmentSink::new();
    for candidate in &candidates {
        classify_segment(*candidate, config, &mut sink);
    }

    let result = Segmentation::from_sink(sink, stops);
    info!(
        "[Segmenter] {} fixes -> {} candidates, {} walking, {} faster, {} discarded, {} stops in {:?}",
        fixes.len(),
        candidates.len(),
        result.walking.len(),
        result.faster.len(),
        result.discarded.len(),
        result.stops.len(),
        start.elapsed()
    );
    Ok(result)
}

/// Same as [`segment_trajectory`], classifying candidates on the rayon pool.
///
/// Anchor detection is inherently sequential; only classification and
/// refinement fan out. The merged output is identical to the sequential one.
#[cfg(feature = "parallel")]
pub fn segment_trajectory_parallel<'a>(
    fixes: &'a [Fix],
    config: &SegmentationConfig,
) -> Result<Segmentation<'a>> {
    use rayon::prelude::*;

    validate_fixes(fixes)?;
    config.validate()?;

    let start = Instant::now();
    let (candidates, stops) = build_candidates(fixes, config);

    let sinks: Vec<SegmentSink<'a>> = candidates
        .par_iter()
        .map(|candidate| {
            let mut sink = SegmentSink::new();
            classify_segment(*candidate, config, &mut sink);
            sink
        })
        .collect();

    let mut merged = SegmentSink::new();
    for sink in sinks {
        merged.append(sink);
    }

    let result = Segmentation::from_sink(merged, stops);
    info!(
        "[Segmenter] PARALLEL {} fixes -> {} candidates, {} walking, {} faster in {:?}",
        fixes.len(),
        candidates.len(),
        result.walking.len(),
        result.faster.len(),
        start.elapsed()
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{north_of, straight_line, BASE_LAT};

    fn ranges(segments: &[Segment<'_>]) -> Vec<std::ops::Range<usize>> {
        segments.iter().map(|s| s.range()).collect()
    }

    /// Slow 3-fix legs (15m per 15s) around a 10 m/s middle (50m per 5s).
    fn drive_with_walking_legs(base: f64, t0: i64) -> Vec<Fix> {
        let mut fixes = vec![north_of(base, 0.0, t0)];
        let (mut position, mut time) = (0.0, t0);
        for pair in 0..19 {
            let (step, dt) = if pair < 2 || pair >= 17 { (15.0, 15_000) } else { (50.0, 5_000) };
            position += step;
            time += dt;
            fixes.push(north_of(base, position, time));
        }
        fixes
    }

    /// `n` fixes every 10s jittering within 4m of `position` meters north of BASE_LAT.
    fn dwell_at(position: f64, n: usize, t0: i64) -> Vec<Fix> {
        (0..n)
            .map(|i| north_of(BASE_LAT, position + (i % 3) as f64 * 2.0, t0 + i as i64 * 10_000))
            .collect()
    }

    /// Every fix belongs to exactly one output range or stop interior.
    fn assert_complete(result: &Segmentation<'_>, len: usize) {
        let mut owners = vec![0usize; len];
        for segment in result.walking.iter().chain(&result.faster).chain(&result.discarded) {
            for index in segment.range() {
                owners[index] += 1;
            }
        }
        for stop in &result.stops {
            for index in stop.interior() {
                owners[index] += 1;
            }
        }
        assert!(owners.iter().all(|&n| n == 1), "ownership counts: {:?}", owners);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(
            segment_trajectory(&[], &SegmentationConfig::default()),
            Err(SegmentationError::EmptyInput)
        );
    }

    #[test]
    fn test_invalid_fix_rejected() {
        let mut fixes = straight_line(5, 30.0, 20_000);
        fixes[3].longitude = f64::NAN;
        assert!(matches!(
            segment_trajectory(&fixes, &SegmentationConfig::default()),
            Err(SegmentationError::InvalidFix { index: 3, .. })
        ));
    }

    #[test]
    fn test_backwards_timestamp_rejected() {
        let mut fixes = straight_line(5, 30.0, 20_000);
        fixes[2].timestamp = 0;
        assert_eq!(
            validate_fixes(&fixes),
            Err(SegmentationError::NonMonotonicTimestamp { index: 2, previous: 20_000, current: 0 })
        );
    }

    #[test]
    fn test_invalid_config_rejected() {
        let fixes = straight_line(5, 30.0, 20_000);
        let config = SegmentationConfig { stationary_radius: 30.0, ..Default::default() };
        assert!(matches!(
            segment_trajectory(&fixes, &config),
            Err(SegmentationError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_empty_input_reported_before_bad_config() {
        let config = SegmentationConfig { min_leg_length: -1.0, ..Default::default() };
        assert_eq!(segment_trajectory(&[], &config), Err(SegmentationError::EmptyInput));
    }

    #[test]
    fn test_extreme_timestamps_do_not_panic() {
        let fixes = vec![
            north_of(BASE_LAT, 0.0, i64::MIN),
            north_of(BASE_LAT, 400.0, 0),
            north_of(BASE_LAT, 800.0, i64::MAX),
        ];
        assert!(validate_fixes(&fixes).is_ok());
        let result = segment_trajectory(&fixes, &SegmentationConfig::default()).unwrap();
        assert_eq!(ranges(&result.walking), vec![0..3]);
        assert!(result.faster.is_empty());
    }

    #[test]
    fn test_single_fix_is_discarded() {
        let fixes = vec![north_of(BASE_LAT, 0.0, 0)];
        let result = segment_trajectory(&fixes, &SegmentationConfig::default()).unwrap();
        assert!(result.is_empty());
        assert_eq!(ranges(&result.discarded), vec![0..1]);
    }

    #[test]
    fn test_stationary_trace_yields_nothing() {
        // 26 fixes over 250s within 4m: dwell confirmed at 200s.
        let fixes = dwell_at(0.0, 26, 0);
        let result = segment_trajectory(&fixes, &SegmentationConfig::default()).unwrap();

        assert!(result.walking.is_empty());
        assert!(result.faster.is_empty());
        assert_eq!(result.stops.len(), 1);
        assert_eq!((result.stops[0].arrival, result.stops[0].departure), (0, 25));
        assert_eq!(ranges(&result.discarded), vec![0..1, 25..26]);
        assert_complete(&result, fixes.len());
    }

    #[test]
    fn test_slow_straight_line_is_one_walk() {
        // 20 fixes, 30m every 20s: 1.5 m/s over 570m.
        let fixes = straight_line(20, 30.0, 20_000);
        let result = segment_trajectory(&fixes, &SegmentationConfig::default()).unwrap();

        assert_eq!(ranges(&result.walking), vec![0..20]);
        assert!(result.faster.is_empty());
        assert!(result.stops.is_empty());
    }

    #[test]
    fn test_drive_with_walking_legs() {
        let fixes = drive_with_walking_legs(BASE_LAT, 0);
        let result = segment_trajectory(&fixes, &SegmentationConfig::default()).unwrap();

        assert_eq!(ranges(&result.walking), vec![0..3, 17..20]);
        assert_eq!(ranges(&result.faster), vec![3..17]);
        assert_complete(&result, fixes.len());
    }

    #[test]
    fn test_equal_timestamps_do_not_fail() {
        let fixes = vec![north_of(BASE_LAT, 0.0, 1_000), north_of(BASE_LAT, 10.0, 1_000)];
        let result = segment_trajectory(&fixes, &SegmentationConfig::default()).unwrap();
        assert!(result.is_empty());
        assert_eq!(ranges(&result.discarded), vec![0..2]);
    }

    #[test]
    fn test_short_fast_hop_is_discarded() {
        // 200m at 20 m/s.
        let fixes = straight_line(11, 20.0, 1_000);
        let result = segment_trajectory(&fixes, &SegmentationConfig::default()).unwrap();
        assert!(result.is_empty());
        assert_eq!(ranges(&result.discarded), vec![0..11]);
    }

    #[test]
    fn test_day_with_stops() {
        // Walk 570m, dwell ~5 minutes, then walk on.
        let mut fixes = straight_line(20, 30.0, 20_000);
        let (walk_end, walk_end_time) = (19.0 * 30.0, 19 * 20_000);
        fixes.extend(dwell_at(walk_end, 30, walk_end_time + 10_000));
        let resume_time = walk_end_time + 310_000;
        fixes.extend((1..=20).map(|i| north_of(BASE_LAT, walk_end + i as f64 * 30.0, resume_time + i * 20_000)));

        let result = segment_trajectory(&fixes, &SegmentationConfig::default()).unwrap();

        assert_eq!(result.stops.len(), 1);
        assert_eq!(result.walking.len(), 2);
        assert!(result.faster.is_empty());
        let stop = result.stops[0];
        assert!(result.walking[0].end_index() <= stop.arrival + 1);
        assert_eq!(result.walking[1].start_index(), stop.departure);
        assert!(result.walking[0].end_time() <= result.walking[1].start_time());
        assert_complete(&result, fixes.len());
    }

    #[test]
    fn test_idempotent() {
        let mut fixes = drive_with_walking_legs(BASE_LAT, 0);
        let last = *fixes.last().unwrap();
        let offset = (last.latitude - BASE_LAT) * crate::test_support::METERS_PER_DEGREE;
        fixes.extend(dwell_at(offset, 25, last.timestamp + 10_000));

        let config = SegmentationConfig::default();
        let first = segment_trajectory(&fixes, &config).unwrap();
        let second = segment_trajectory(&fixes, &config).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.to_records(), second.to_records());
    }

    #[test]
    fn test_labeled_is_time_ordered() {
        let fixes = drive_with_walking_legs(BASE_LAT, 0);
        let result = segment_trajectory(&fixes, &SegmentationConfig::default()).unwrap();

        let labels: Vec<Label> = result.labeled().into_iter().map(|(label, _)| label).collect();
        assert_eq!(labels, vec![Label::Walking, Label::Faster, Label::Walking]);

        let records = result.to_records();
        assert!(records.windows(2).all(|w| w[0].end_index <= w[1].start_index));
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_matches_sequential() {
        let mut fixes = drive_with_walking_legs(BASE_LAT, 0);
        let last = *fixes.last().unwrap();
        let offset = (last.latitude - BASE_LAT) * crate::test_support::METERS_PER_DEGREE;
        fixes.extend(dwell_at(offset, 25, last.timestamp + 10_000));

        let config = SegmentationConfig::default();
        let sequential = segment_trajectory(&fixes, &config).unwrap();
        let parallel = segment_trajectory_parallel(&fixes, &config).unwrap();
        assert_eq!(sequential, parallel);
    }
}
