//! Per-segment speed classification.
//!
//! Each candidate produced by the segment builder is either discarded for
//! being too short, kept whole as walking, or handed to the
//! [refiner](crate::refiner) to split walking legs off a faster segment.
//! Results are written to a [`SegmentSink`] owned by the caller, so nothing is
//! shared between invocations.

use log::debug;

use crate::refiner::refine_segment;
use crate::segment::Segment;
use crate::{Label, SegmentationConfig};

/// Output accumulator threaded through classification.
///
/// One sink is created per segmentation call (or per candidate when
/// classifying in parallel) and merged in candidate order afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentSink<'a> {
    pub walking: Vec<Segment<'a>>,
    pub faster: Vec<Segment<'a>>,
    /// Candidates shorter than `min_segment_length` and walking legs shorter
    /// than `min_leg_length`.
    pub discarded: Vec<Segment<'a>>,
}

impl<'a> SegmentSink<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, label: Label, segment: Segment<'a>) {
        match label {
            Label::Walking => self.walking.push(segment),
            Label::Faster => self.faster.push(segment),
        }
    }

    pub fn discard(&mut self, segment: Segment<'a>) {
        self.discarded.push(segment);
    }

    /// Append everything from `other`, keeping its order after ours.
    pub fn append(&mut self, other: SegmentSink<'a>) {
        self.walking.extend(other.walking);
        self.faster.extend(other.faster);
        self.discarded.extend(other.discarded);
    }
}

/// Classify one candidate segment into `sink`.
///
/// - shorter than `min_segment_length`: discarded
/// - average speed at or below `walking_speed_threshold`: walking
/// - otherwise: refined into walking legs and a faster middle
pub fn classify_segment<'a>(segment: Segment<'a>, config: &SegmentationConfig, sink: &mut SegmentSink<'a>) {
    let length = segment.length();
    if length < config.min_segment_length {
        debug!(
            "[Classifier] Discarding {:?}: {:.0}m < {:.0}m",
            segment.range(),
            length,
            config.min_segment_length
        );
        sink.discard(segment);
        return;
    }

    let speed = segment.average_speed();
    if speed <= config.walking_speed_threshold {
        debug!("[Classifier] Walking {:?}: {:.0}m at {:.2} m/s", segment.range(), length, speed);
        sink.push(Label::Walking, segment);
    } else {
        debug!("[Classifier] Refining {:?}: {:.0}m at {:.2} m/s", segment.range(), length, speed);
        refine_segment(segment, config, sink);
    }
}
