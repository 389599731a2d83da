//! # Footpath Segmenter
//!
//! Splits a day's GPS fix history into walking and faster-than-walking
//! (cycling, driving, transit) segments.
//!
//! This library provides:
//! - Dwell (stop) detection that cuts the history into candidate segments
//! - Speed classification of each candidate against a walking threshold
//! - Refinement that splits walking legs off the ends of faster segments
//! - An optional client that routes walking segments through a directions service
//!
//! ## Features
//!
//! - **`parallel`** - Classify candidate segments in parallel with rayon
//! - **`serde`** - Serialize/deserialize fixes, configuration and segment records
//! - **`http`** - Enable the walking-directions HTTP client
//! - **`ffi`** - Enable FFI bindings for mobile platforms (iOS/Android)
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use footpath_segmenter::{Fix, SegmentationConfig, segment_trajectory};
//!
//! let fixes = vec![
//!     Fix::new(51.5074, -0.1278, 1_700_000_000_000),
//!     Fix::new(51.5080, -0.1290, 1_700_000_060_000),
//!     Fix::new(51.5090, -0.1300, 1_700_000_120_000),
//! ];
//!
//! let result = segment_trajectory(&fixes, &SegmentationConfig::default()).unwrap();
//! for (label, segment) in result.labeled() {
//!     println!("{}: {:.0}m in {:.0}s", label, segment.length(), segment.duration_seconds());
//! }
//! ```

use std::fmt;

pub mod error;
pub use error::{Result, SegmentationError};

pub mod geo_utils;

// Dwell detection
pub mod anchor;
pub use anchor::{find_anchor, Anchor};

pub mod segment;
pub use segment::{Segment, SegmentRecord, Stop};

// Per-candidate classification and walking-leg refinement
pub mod classifier;
pub use classifier::{classify_segment, SegmentSink};

pub mod refiner;
pub use refiner::refine_segment;

pub mod segmenter;
pub use segmenter::{segment_trajectory, validate_fixes, Segmentation};

#[cfg(feature = "parallel")]
pub use segmenter::segment_trajectory_parallel;

// HTTP module for walking route lookups
#[cfg(feature = "http")]
pub mod directions;

#[cfg(feature = "http")]
pub use directions::{DirectionsClient, DirectionsError, RouteRequest, WalkingRouteResult};

#[cfg(feature = "ffi")]
uniffi::setup_scaffolding!();

/// Initialize logging for Android (only used in FFI)
#[cfg(all(feature = "ffi", target_os = "android"))]
fn init_logging() {
    use android_logger::Config;
    use log::LevelFilter;

    android_logger::init_once(
        Config::default()
            .with_max_level(LevelFilter::Debug)
            .with_tag("FootpathSegmenterRust")
    );
}

#[cfg(all(feature = "ffi", not(target_os = "android")))]
fn init_logging() {
    // No-op on non-Android platforms
}

// ============================================================================
// Core Types
// ============================================================================

/// A single timestamped position observation.
///
/// # Example
/// ```
/// use footpath_segmenter::Fix;
/// let fix = Fix::new(51.5074, -0.1278, 1_700_000_000_000); // London
/// assert!(fix.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Fix {
    pub latitude: f64,
    pub longitude: f64,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
}

impl Fix {
    /// Create a new fix.
    pub fn new(latitude: f64, longitude: f64, timestamp: i64) -> Self {
        Self { latitude, longitude, timestamp }
    }

    /// Check if the fix has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// Bounding box of a segment.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Degenerate bounds containing a single fix.
    pub fn around(fix: &Fix) -> Self {
        Self {
            min_lat: fix.latitude,
            max_lat: fix.latitude,
            min_lng: fix.longitude,
            max_lng: fix.longitude,
        }
    }

    /// Center point of the bounds as `(latitude, longitude)`.
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }
}

/// Travel mode assigned to a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Label {
    Walking,
    Faster,
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Walking => write!(f, "walking"),
            Label::Faster => write!(f, "faster"),
        }
    }
}

/// Configuration for dwell detection and speed classification.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SegmentationConfig {
    /// Minimum time spent within `stationary_radius` to count as a dwell.
    /// Default: 200 seconds
    pub record_delay_secs: f64,

    /// Radius the dwell-confirming fix must fall within.
    /// Default: 20.0 meters
    pub stationary_radius: f64,

    /// Radius that ends a dwell once the subject leaves it. Must be at least
    /// `stationary_radius`.
    /// Default: 25.0 meters
    pub max_stationary_radius: f64,

    /// Segments shorter than this are discarded.
    /// Default: 300.0 meters
    pub min_segment_length: f64,

    /// Average speeds at or below this are walking.
    /// Default: 7 km/h (~1.944 m/s)
    pub walking_speed_threshold: f64,

    /// Walking legs split off a faster segment must be at least this long.
    /// Default: 25.0 meters
    pub min_leg_length: f64,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            record_delay_secs: 200.0,
            stationary_radius: 20.0,
            max_stationary_radius: 25.0,
            min_segment_length: 300.0,
            walking_speed_threshold: 7.0 / 3.6,
            min_leg_length: 25.0,
        }
    }
}

impl SegmentationConfig {
    /// Reject thresholds the engine cannot work with.
    ///
    /// # Errors
    ///
    /// [`SegmentationError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("record_delay_secs", self.record_delay_secs),
            ("stationary_radius", self.stationary_radius),
            ("max_stationary_radius", self.max_stationary_radius),
            ("min_segment_length", self.min_segment_length),
            ("walking_speed_threshold", self.walking_speed_threshold),
            ("min_leg_length", self.min_leg_length),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(SegmentationError::invalid_config(format!(
                    "{} must be finite and non-negative, got {}",
                    name, value
                )));
            }
        }
        if self.stationary_radius > self.max_stationary_radius {
            return Err(SegmentationError::invalid_config(format!(
                "stationary_radius ({}) exceeds max_stationary_radius ({})",
                self.stationary_radius, self.max_stationary_radius
            )));
        }
        Ok(())
    }
}

// ============================================================================
// FFI Exports (only when feature enabled)
// ============================================================================

#[cfg(feature = "ffi")]
mod ffi {
    use super::*;
    use log::{info, warn};

    /// Segmentation output with owned segments, for hosts that cannot borrow.
    #[derive(Debug, Clone, uniffi::Record)]
    pub struct SegmentationRecords {
        pub walking: Vec<SegmentRecord>,
        pub faster: Vec<SegmentRecord>,
        pub discarded_count: u32,
        pub stop_count: u32,
    }

    fn to_records(result: &Segmentation<'_>) -> SegmentationRecords {
        SegmentationRecords {
            walking: result.walking.iter().map(|s| s.to_record(Label::Walking)).collect(),
            faster: result.faster.iter().map(|s| s.to_record(Label::Faster)).collect(),
            discarded_count: result.discarded.len() as u32,
            stop_count: result.stops.len() as u32,
        }
    }

    /// Segment fixes into walking and faster segments.
    #[uniffi::export]
    pub fn segment_fixes(
        fixes: Vec<Fix>,
        config: SegmentationConfig,
    ) -> std::result::Result<SegmentationRecords, SegmentationError> {
        init_logging();
        info!("[FootpathSegmenterRust] segment_fixes called with {} fixes", fixes.len());

        let start = std::time::Instant::now();
        let result = segment_trajectory_parallel(&fixes, &config).map_err(|e| {
            warn!("[FootpathSegmenterRust] segmentation failed: {}", e);
            e
        })?;
        let records = to_records(&result);

        info!(
            "[FootpathSegmenterRust] {} walking / {} faster segments in {:?}",
            records.walking.len(),
            records.faster.len(),
            start.elapsed()
        );
        Ok(records)
    }

    /// Segment fixes supplied as flat buffers (optimized for TypedArray input).
    /// `coords` holds [lat1, lng1, lat2, lng2, ...]; `timestamps` holds one
    /// millisecond timestamp per coordinate pair.
    #[uniffi::export]
    pub fn segment_flat(
        coords: Vec<f64>,
        timestamps: Vec<i64>,
        config: SegmentationConfig,
    ) -> std::result::Result<SegmentationRecords, SegmentationError> {
        init_logging();
        if coords.len() != timestamps.len() * 2 {
            return Err(SegmentationError::MismatchedBuffers {
                coordinates: coords.len(),
                timestamps: timestamps.len(),
            });
        }

        let fixes: Vec<Fix> = coords
            .chunks_exact(2)
            .zip(&timestamps)
            .map(|(chunk, &timestamp)| Fix::new(chunk[0], chunk[1], timestamp))
            .collect();
        segment_fixes(fixes, config)
    }

    /// Get default configuration.
    #[uniffi::export]
    pub fn default_config() -> SegmentationConfig {
        init_logging();
        info!("[FootpathSegmenterRust] default_config called");
        SegmentationConfig::default()
    }

    // ========================================================================
    // Walking Directions (requires "http" feature)
    // ========================================================================

    /// Callback interface for receiving progress updates during route lookups.
    /// Implement this in Kotlin/Swift to receive real-time updates.
    #[cfg(feature = "http")]
    #[uniffi::export(callback_interface)]
    pub trait RouteProgressCallback: Send + Sync {
        /// Called when a single lookup completes.
        fn on_progress(&self, completed: u32, total: u32);
    }

    /// Routed walking path for one segment.
    #[cfg(feature = "http")]
    #[derive(Debug, Clone, uniffi::Record)]
    pub struct FfiWalkingRoute {
        /// Index of the segment in the input list
        pub index: u32,
        /// Routed path as flat array [lat1, lng1, lat2, lng2, ...]
        pub latlngs: Vec<f64>,
        pub distance_meters: f64,
        pub duration_seconds: f64,
        pub success: bool,
        pub error: Option<String>,
    }

    #[cfg(feature = "http")]
    fn route_requests(segments: &[SegmentRecord]) -> Vec<crate::directions::RouteRequest> {
        segments
            .iter()
            .filter_map(|s| {
                let (first, last) = (s.fixes.first()?, s.fixes.last()?);
                Some(crate::directions::RouteRequest::new(first, last))
            })
            .collect()
    }

    #[cfg(feature = "http")]
    fn to_ffi_routes(results: Vec<crate::directions::WalkingRouteResult>) -> Vec<FfiWalkingRoute> {
        results
            .into_iter()
            .map(|r| FfiWalkingRoute {
                index: r.index,
                latlngs: r.coordinates.map_or(vec![], |coords| {
                    coords.into_iter().flat_map(|p| [p[0], p[1]]).collect()
                }),
                distance_meters: r.distance_meters.unwrap_or(0.0),
                duration_seconds: r.duration_seconds.unwrap_or(0.0),
                success: r.success,
                error: r.error,
            })
            .collect()
    }

    /// Look up a walking route between the endpoints of each walking segment.
    ///
    /// Lookups are spaced to respect the free-tier quota and retried with
    /// exponential backoff on 429. Results come back in segment order.
    #[cfg(feature = "http")]
    #[uniffi::export]
    pub fn fetch_walking_routes(api_key: String, segments: Vec<SegmentRecord>) -> Vec<FfiWalkingRoute> {
        init_logging();
        info!("[FootpathSegmenterRust] fetch_walking_routes called for {} segments", segments.len());

        let results = crate::directions::fetch_walking_routes_sync(api_key, route_requests(&segments), None);
        to_ffi_routes(results)
    }

    /// Same as fetch_walking_routes, reporting progress after each lookup.
    #[cfg(feature = "http")]
    #[uniffi::export]
    pub fn fetch_walking_routes_with_progress(
        api_key: String,
        segments: Vec<SegmentRecord>,
        callback: Box<dyn RouteProgressCallback>,
    ) -> Vec<FfiWalkingRoute> {
        use std::sync::Arc;

        init_logging();
        info!(
            "[FootpathSegmenterRust] fetch_walking_routes_with_progress called for {} segments",
            segments.len()
        );

        let callback = Arc::new(callback);
        let progress_callback: crate::directions::ProgressCallback = Arc::new(move |completed, total| {
            callback.on_progress(completed, total);
        });

        let results = crate::directions::fetch_walking_routes_sync(
            api_key,
            route_requests(&segments),
            Some(progress_callback),
        );
        to_ffi_routes(results)
    }
}

// ============================================================================
// Test Helpers
// ============================================================================


// ============================================================================
// Tests
// ============================================================================
