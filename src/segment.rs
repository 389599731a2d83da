//! Segment and stop views over an immutable fix slice.
//!
//! A [`Segment`] never owns its fixes. It is an index range into the slice the
//! caller handed to the segmenter, so producing, splitting and classifying
//! segments never copies or reorders input data. [`SegmentRecord`] is the owned
//! snapshot used when a segment has to outlive that slice (storage, FFI, HTTP).

use std::fmt;
use std::ops::Range;

use crate::geo_utils::{average_speed, compute_bounds, compute_center, duration_seconds, polyline_length};
use crate::{Bounds, Fix, Label};

/// A contiguous, non-empty run of fixes identified by its index range.
#[derive(Clone, Copy, PartialEq)]
pub struct Segment<'a> {
    source: &'a [Fix],
    start: usize,
    end: usize,
}

impl<'a> Segment<'a> {
    /// View `source[range]` as a segment.
    ///
    /// Returns `None` for empty or out-of-bounds ranges.
    pub fn new(source: &'a [Fix], range: Range<usize>) -> Option<Self> {
        if range.start >= range.end || range.end > source.len() {
            return None;
        }
        Some(Self { source, start: range.start, end: range.end })
    }

    /// Sub-segment with indices relative to this segment.
    ///
    /// Returns `None` for empty ranges or ranges reaching past this segment.
    pub fn slice(&self, range: Range<usize>) -> Option<Self> {
        if range.end > self.len() {
            return None;
        }
        Self::new(self.source, self.start + range.start..self.start + range.end)
    }

    /// The fixes of this segment, in input order.
    pub fn fixes(&self) -> &'a [Fix] {
        &self.source[self.start..self.end]
    }

    /// Index range into the original fix slice.
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn start_index(&self) -> usize {
        self.start
    }

    /// Exclusive end index into the original fix slice.
    pub fn end_index(&self) -> usize {
        self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Always false: empty segments cannot be constructed.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn first(&self) -> &'a Fix {
        &self.source[self.start]
    }

    pub fn last(&self) -> &'a Fix {
        &self.source[self.end - 1]
    }

    pub fn start_time(&self) -> i64 {
        self.first().timestamp
    }

    pub fn end_time(&self) -> i64 {
        self.last().timestamp
    }

    /// Start and end fix, the coordinates a directions lookup is asked to route between.
    pub fn endpoints(&self) -> (&'a Fix, &'a Fix) {
        (self.first(), self.last())
    }

    /// Sum of consecutive great-circle distances in meters.
    pub fn length(&self) -> f64 {
        polyline_length(self.fixes())
    }

    pub fn duration_seconds(&self) -> f64 {
        duration_seconds(self.fixes())
    }

    /// Mean of point-to-point speeds in m/s.
    pub fn average_speed(&self) -> f64 {
        average_speed(self.fixes())
    }

    pub fn bounds(&self) -> Bounds {
        // Non-empty by construction.
        compute_bounds(self.fixes()).unwrap_or_else(|| Bounds::around(self.first()))
    }

    /// Owned snapshot carrying `label`.
    pub fn to_record(&self, label: Label) -> SegmentRecord {
        let (center_lat, center_lng) = compute_center(self.fixes());
        SegmentRecord {
            label,
            start_index: self.start as u32,
            end_index: self.end as u32,
            fixes: self.fixes().to_vec(),
            length_meters: self.length(),
            duration_seconds: self.duration_seconds(),
            average_speed: self.average_speed(),
            bounds: self.bounds(),
            center_lat,
            center_lng,
        }
    }
}

impl fmt::Debug for Segment<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Segment")
            .field("range", &self.range())
            .field("start_time", &self.start_time())
            .field("end_time", &self.end_time())
            .finish()
    }
}

/// A dwell between two segments.
///
/// `arrival` is the fix that closed the preceding segment and `departure` the
/// anchor that opens the next one. The fixes strictly between them belong to
/// neither segment.
#[derive(Clone, Copy, PartialEq)]
pub struct Stop<'a> {
    source: &'a [Fix],
    pub arrival: usize,
    pub departure: usize,
}

impl<'a> Stop<'a> {
    pub(crate) fn new(source: &'a [Fix], arrival: usize, departure: usize) -> Self {
        Self { source, arrival, departure }
    }

    /// Fixes from arrival to departure, both included.
    pub fn fixes(&self) -> &'a [Fix] {
        &self.source[self.arrival..=self.departure]
    }

    /// Indices owned by the stop alone.
    pub fn interior(&self) -> Range<usize> {
        self.arrival + 1..self.departure
    }

    pub fn duration_seconds(&self) -> f64 {
        duration_seconds(self.fixes())
    }

    /// Mean position of the dwell as `(latitude, longitude)`.
    pub fn center(&self) -> (f64, f64) {
        compute_center(self.fixes())
    }
}

impl fmt::Debug for Stop<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stop")
            .field("arrival", &self.arrival)
            .field("departure", &self.departure)
            .field("duration_seconds", &self.duration_seconds())
            .finish()
    }
}

/// Owned, serialisable copy of a classified segment.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SegmentRecord {
    pub label: Label,
    /// First index into the input fixes
    pub start_index: u32,
    /// Exclusive end index into the input fixes
    pub end_index: u32,
    pub fixes: Vec<Fix>,
    pub length_meters: f64,
    pub duration_seconds: f64,
    /// Mean of point-to-point speeds (m/s)
    pub average_speed: f64,
    /// Pre-computed bounding box for map rendering
    pub bounds: Bounds,
    pub center_lat: f64,
    pub center_lng: f64,
}
