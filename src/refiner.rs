//! # Sub-leg Refinement
//!
//! A faster-than-walking segment often starts and ends on foot: walking to a
//! parked car, from a bus stop to the door. The refiner peels those legs off.
//!
//! ## Algorithm
//! 1. Grow a prefix from 2 fixes while its average speed stays at or below the
//!    walking threshold. The longest such prefix is the leading leg.
//! 2. Grow a suffix from 2 fixes the same way. The longest one is the trailing leg.
//! 3. The fixes strictly between the legs form the faster middle.
//! 4. If neither leg reaches `min_leg_length`, the split is abandoned and the
//!    whole segment is faster. Otherwise the middle (if any) is faster, legs
//!    long enough are walking, and shorter legs are discarded.
//!
//! ## Overlapping legs
//!
//! The legs overlap only when the whole segment already averages walking speed
//! (a mean of pair speeds cannot exceed the threshold when both a prefix and
//! the rest of the segment stay under it). The classifier never refines such a
//! segment, but [`refine_segment`] is public, so overlap is still resolved:
//! the longer leg wins (ties go to the leading leg), the other is dropped, and
//! the fixes outside the winning leg become the middle.

use std::ops::Range;

use log::debug;

use crate::classifier::SegmentSink;
use crate::geo_utils::{checked_speed, polyline_length};
use crate::segment::Segment;
use crate::{Fix, Label, SegmentationConfig};

/// Running mean of point-to-point speeds. Zero-interval pairs are skipped.
#[derive(Debug, Default, Clone, Copy)]
struct RunningMean {
    sum: f64,
    count: usize,
}

impl RunningMean {
    fn push_pair(&mut self, a: &Fix, b: &Fix) {
        if let Ok(speed) = checked_speed(a, b) {
            self.sum += speed;
            self.count += 1;
        }
    }

    fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

/// Exclusive end of the longest walking-speed prefix (at least 2 fixes).
fn leading_leg_end(fixes: &[Fix], threshold: f64) -> Option<usize> {
    let mut mean = RunningMean::default();
    let mut end = None;
    for k in 1..fixes.len() {
        mean.push_pair(&fixes[k - 1], &fixes[k]);
        if mean.mean() > threshold {
            break;
        }
        end = Some(k + 1);
    }
    end
}

/// Start of the longest walking-speed suffix (at least 2 fixes).
fn trailing_leg_start(fixes: &[Fix], threshold: f64) -> Option<usize> {
    let mut mean = RunningMean::default();
    let mut start = None;
    for k in (0..fixes.len().saturating_sub(1)).rev() {
        mean.push_pair(&fixes[k], &fixes[k + 1]);
        if mean.mean() > threshold {
            break;
        }
        start = Some(k);
    }
    start
}

/// Drop the shorter of two overlapping legs. Ties keep the leading leg.
fn resolve_overlap(
    fixes: &[Fix],
    leading: Option<usize>,
    trailing: Option<usize>,
) -> (Option<usize>, Option<usize>) {
    match (leading, trailing) {
        (Some(end), Some(start)) if end > start => {
            let leading_length = polyline_length(&fixes[..end]);
            let trailing_length = polyline_length(&fixes[start..]);
            debug!(
                "[Refiner] Legs overlap (..{} vs {}..), keeping the {} one",
                end,
                start,
                if leading_length >= trailing_length { "leading" } else { "trailing" }
            );
            if leading_length >= trailing_length {
                (Some(end), None)
            } else {
                (None, Some(start))
            }
        }
        other => other,
    }
}

/// Split walking legs off a faster segment, writing the pieces into `sink`.
pub fn refine_segment<'a>(segment: Segment<'a>, config: &SegmentationConfig, sink: &mut SegmentSink<'a>) {
    let fixes = segment.fixes();
    let n = fixes.len();
    let threshold = config.walking_speed_threshold;

    let (leading, trailing) = resolve_overlap(
        fixes,
        leading_leg_end(fixes, threshold),
        trailing_leg_start(fixes, threshold),
    );

    let leading_leg: Option<Range<usize>> = leading.map(|end| 0..end);
    let trailing_leg: Option<Range<usize>> = trailing.map(|start| start..n);
    let is_long_enough = |leg: &Option<Range<usize>>| {
        leg.as_ref()
            .is_some_and(|range| polyline_length(&fixes[range.clone()]) >= config.min_leg_length)
    };

    if !is_long_enough(&leading_leg) && !is_long_enough(&trailing_leg) {
        debug!("[Refiner] No usable walking legs in {:?}, keeping it whole", segment.range());
        sink.push(Label::Faster, segment);
        return;
    }

    let middle = leading.unwrap_or(0)..trailing.unwrap_or(n);
    if let Some(middle) = segment.slice(middle) {
        sink.push(Label::Faster, middle);
    }

    for leg in [leading_leg, trailing_leg].into_iter().flatten() {
        let long_enough = polyline_length(&fixes[leg.clone()]) >= config.min_leg_length;
        if let Some(leg) = segment.slice(leg) {
            debug!(
                "[Refiner] {} leg {:?}: {:.0}m",
                if long_enough { "Walking" } else { "Discarded" },
                leg.range(),
                leg.length()
            );
            if long_enough {
                sink.push(Label::Walking, leg);
            } else {
                sink.discard(leg);
            }
        }
    }
}
