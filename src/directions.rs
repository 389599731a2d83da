//! HTTP client for walking directions (OpenRouteService `foot-walking`).
//!
//! Walking segments are decorated with a routed path between their endpoints
//! for display. This module provides:
//! - Connection pooling shared across lookups
//! - Dispatch rate limiting (spaces out request starts)
//! - Concurrent lookups with results returned in request order
//! - Automatic retry with exponential backoff on 429
//!
//! A failed lookup never fails the batch: each request gets its own
//! [`WalkingRouteResult`] carrying either a geometry or an error message.

use log::{debug, info, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::segment::Segment;
use crate::Fix;

pub const DEFAULT_BASE_URL: &str = "https://api.openrouteservice.org";

// Free-tier directions quota is 40 requests/minute: one dispatch every 1.5s.
const DEFAULT_DISPATCH_INTERVAL_MS: u64 = 1_500;
const MAX_CONCURRENCY: usize = 8;
const MAX_RETRIES: u32 = 3;

/// Errors creating a [`DirectionsClient`].
#[derive(Debug, Error)]
pub enum DirectionsError {
    #[error("failed to create HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("missing API key")]
    MissingApiKey,
}

/// Endpoints of one lookup, as `[lat, lng]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteRequest {
    pub start: [f64; 2],
    pub end: [f64; 2],
}

impl RouteRequest {
    pub fn new(start: &Fix, end: &Fix) -> Self {
        Self {
            start: [start.latitude, start.longitude],
            end: [end.latitude, end.longitude],
        }
    }

    /// Route between the first and last fix of a segment.
    pub fn from_segment(segment: &Segment<'_>) -> Self {
        let (start, end) = segment.endpoints();
        Self::new(start, end)
    }

    /// The service takes `lng,lat`.
    fn start_param(&self) -> String {
        format!("{},{}", self.start[1], self.start[0])
    }

    fn end_param(&self) -> String {
        format!("{},{}", self.end[1], self.end[0])
    }
}

/// Result of one walking route lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkingRouteResult {
    /// Position of the request in the input batch
    pub index: u32,
    pub request: RouteRequest,
    /// Routed path as `[lat, lng]` pairs
    pub coordinates: Option<Vec<[f64; 2]>>,
    pub distance_meters: Option<f64>,
    pub duration_seconds: Option<f64>,
    pub success: bool,
    pub error: Option<String>,
}

impl WalkingRouteResult {
    fn failure(index: u32, request: RouteRequest, error: String) -> Self {
        Self {
            index,
            request,
            coordinates: None,
            distance_meters: None,
            duration_seconds: None,
            success: false,
            error: Some(error),
        }
    }
}

/// GeoJSON response of the directions endpoint
#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    geometry: Geometry,
    #[serde(default)]
    properties: Option<Properties>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    /// `[lng, lat]` pairs
    coordinates: Vec<[f64; 2]>,
}

#[derive(Debug, Deserialize)]
struct Properties {
    #[serde(default)]
    summary: Option<Summary>,
}

#[derive(Debug, Default, Deserialize)]
struct Summary {
    #[serde(default)]
    distance: f64,
    #[serde(default)]
    duration: f64,
}

/// Progress callback type
pub type ProgressCallback = Arc<dyn Fn(u32, u32) + Send + Sync>;

/// Dispatch rate limiter - spaces out when requests START.
struct DispatchRateLimiter {
    interval: Duration,
    next_dispatch: Mutex<Instant>,
    dispatched_count: AtomicU32,
    consecutive_429s: AtomicU32,
}

impl DispatchRateLimiter {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_dispatch: Mutex::new(Instant::now()),
            dispatched_count: AtomicU32::new(0),
            consecutive_429s: AtomicU32::new(0),
        }
    }

    /// Wait for our dispatch slot. Each caller gets a unique slot
    /// spaced `interval` apart.
    async fn wait_for_dispatch_slot(&self) -> u32 {
        let (wait_duration, dispatch_num) = {
            let mut next = self.next_dispatch.lock().await;
            let now = Instant::now();

            let dispatch_at = if *next > now { *next } else { now };
            *next = dispatch_at + self.interval;

            let num = self.dispatched_count.fetch_add(1, Ordering::Relaxed) + 1;
            (dispatch_at.saturating_duration_since(now), num)
        };

        // Wait outside the lock
        if wait_duration > Duration::from_millis(5) {
            debug!("[Dispatch #{}] Waiting {:?} for slot", dispatch_num, wait_duration);
            tokio::time::sleep(wait_duration).await;
        }

        dispatch_num
    }

    fn record_success(&self) {
        self.consecutive_429s.store(0, Ordering::Relaxed);
    }

    fn record_429(&self) -> Duration {
        let count = self.consecutive_429s.fetch_add(1, Ordering::Relaxed) + 1;
        // Exponential backoff: 1s, 2s, 4s, 8s max
        let backoff = Duration::from_millis(500 * (1 << count.min(4)));
        warn!("[DispatchRateLimiter] Got 429! Consecutive: {}, backing off {:?}", count, backoff);
        backoff
    }
}

/// Client for walking route lookups
pub struct DirectionsClient {
    client: Client,
    api_key: String,
    base_url: String,
    rate_limiter: Arc<DispatchRateLimiter>,
}

impl DirectionsClient {
    /// Create a client for the public OpenRouteService endpoint.
    pub fn new(api_key: &str) -> Result<Self, DirectionsError> {
        Self::with_options(
            api_key,
            DEFAULT_BASE_URL,
            Duration::from_millis(DEFAULT_DISPATCH_INTERVAL_MS),
        )
    }

    /// Create a client for a self-hosted instance or a different quota.
    pub fn with_options(
        api_key: &str,
        base_url: &str,
        dispatch_interval: Duration,
    ) -> Result<Self, DirectionsError> {
        if api_key.trim().is_empty() {
            return Err(DirectionsError::MissingApiKey);
        }

        let client = Client::builder()
            .pool_max_idle_per_host(MAX_CONCURRENCY * 2)
            .pool_idle_timeout(Duration::from_secs(60))
            .tcp_keepalive(Duration::from_secs(30))
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            rate_limiter: Arc::new(DispatchRateLimiter::new(dispatch_interval)),
        })
    }

    /// Look up walking routes for the endpoints of every segment.
    pub async fn fetch_for_segments(
        &self,
        segments: &[Segment<'_>],
        on_progress: Option<ProgressCallback>,
    ) -> Vec<WalkingRouteResult> {
        let requests = segments.iter().map(RouteRequest::from_segment).collect();
        self.fetch_walking_routes(requests, on_progress).await
    }

    /// Look up walking routes concurrently. Results come back in request order.
    pub async fn fetch_walking_routes(
        &self,
        requests: Vec<RouteRequest>,
        on_progress: Option<ProgressCallback>,
    ) -> Vec<WalkingRouteResult> {
        use futures::stream::{self, StreamExt};

        let total = requests.len() as u32;
        let completed = Arc::new(AtomicU32::new(0));

        info!(
            "[Directions] Starting {} lookups (dispatch interval: {:?}, max concurrent: {})",
            total, self.rate_limiter.interval, MAX_CONCURRENCY
        );

        let start = Instant::now();

        let mut results: Vec<WalkingRouteResult> = stream::iter(requests.into_iter().enumerate())
            .map(|(index, request)| {
                let completed = Arc::clone(&completed);
                let callback = on_progress.clone();

                async move {
                    let dispatch_num = self.rate_limiter.wait_for_dispatch_slot().await;
                    let result = self.fetch_single_route(index as u32, request).await;

                    let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                    debug!(
                        "[Progress] {}/{} | dispatch #{} | done@{:.2}s | success={}",
                        done,
                        total,
                        dispatch_num,
                        start.elapsed().as_secs_f64(),
                        result.success
                    );

                    if let Some(ref cb) = callback {
                        cb(done, total);
                    }

                    result
                }
            })
            .buffer_unordered(MAX_CONCURRENCY)
            .collect()
            .await;

        results.sort_by_key(|r| r.index);

        let success_count = results.iter().filter(|r| r.success).count();
        info!(
            "[Directions] DONE: {}/{} success ({} errors) in {:.2}s",
            success_count,
            total,
            results.len() - success_count,
            start.elapsed().as_secs_f64()
        );

        results
    }

    async fn fetch_single_route(&self, index: u32, request: RouteRequest) -> WalkingRouteResult {
        let url = format!("{}/v2/directions/foot-walking", self.base_url);
        let start_param = request.start_param();
        let end_param = request.end_param();
        let query = [
            ("api_key", self.api_key.as_str()),
            ("start", start_param.as_str()),
            ("end", end_param.as_str()),
        ];

        let mut retries = 0;
        let req_start = Instant::now();

        loop {
            let response = self.client.get(&url).query(&query).send().await;

            match response {
                Ok(resp) => {
                    let status = resp.status();

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        retries += 1;
                        if retries > MAX_RETRIES {
                            return WalkingRouteResult::failure(
                                index,
                                request,
                                "Max retries exceeded (429)".to_string(),
                            );
                        }

                        let wait = self.rate_limiter.record_429();
                        warn!(
                            "[Route {}] 429 Too Many Requests after {:?}, retry {} with {:?} backoff",
                            index,
                            req_start.elapsed(),
                            retries,
                            wait
                        );
                        tokio::time::sleep(wait).await;
                        continue;
                    }

                    self.rate_limiter.record_success();

                    if !status.is_success() {
                        return WalkingRouteResult::failure(index, request, format!("HTTP {}", status));
                    }

                    let bytes = match resp.bytes().await {
                        Ok(b) => b,
                        Err(e) => {
                            return WalkingRouteResult::failure(
                                index,
                                request,
                                format!("Body download error: {}", e),
                            );
                        }
                    };

                    let result = match parse_directions(&bytes) {
                        Ok(route) => WalkingRouteResult {
                            index,
                            request,
                            coordinates: Some(route.coordinates),
                            distance_meters: Some(route.distance_meters),
                            duration_seconds: Some(route.duration_seconds),
                            success: true,
                            error: None,
                        },
                        Err(e) => WalkingRouteResult::failure(index, request, e),
                    };

                    debug!(
                        "[Route {}] {:?} total, {:.1}KB, success={}",
                        index,
                        req_start.elapsed(),
                        bytes.len() as f64 / 1024.0,
                        result.success
                    );
                    return result;
                }
                Err(e) => {
                    retries += 1;
                    if retries > MAX_RETRIES {
                        return WalkingRouteResult::failure(index, request, format!("Request error: {}", e));
                    }

                    let wait = Duration::from_millis(200 * (1 << retries));
                    warn!("[Route {}] Error: {}, retry {} after {:?}", index, e, retries, wait);
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }
}

/// A parsed route geometry with its summary.
#[derive(Debug, Clone, PartialEq)]
struct ParsedRoute {
    /// `[lat, lng]` pairs
    coordinates: Vec<[f64; 2]>,
    distance_meters: f64,
    duration_seconds: f64,
}

/// Take the first feature of a directions response, flipping `[lng, lat]` to `[lat, lng]`.
fn parse_directions(body: &[u8]) -> Result<ParsedRoute, String> {
    let data: DirectionsResponse =
        serde_json::from_slice(body).map_err(|e| format!("JSON parse error: {}", e))?;

    let feature = data
        .features
        .into_iter()
        .next()
        .ok_or_else(|| "No route in response".to_string())?;

    let summary = feature
        .properties
        .and_then(|p| p.summary)
        .unwrap_or_default();

    Ok(ParsedRoute {
        coordinates: feature
            .geometry
            .coordinates
            .into_iter()
            .map(|[lng, lat]| [lat, lng])
            .collect(),
        distance_meters: summary.distance,
        duration_seconds: summary.duration,
    })
}

/// Synchronous wrapper for FFI - runs the async code on a tokio runtime
#[cfg(feature = "ffi")]
pub fn fetch_walking_routes_sync(
    api_key: String,
    requests: Vec<RouteRequest>,
    on_progress: Option<ProgressCallback>,
) -> Vec<WalkingRouteResult> {
    use tokio::runtime::Builder;

    info!("[FFI] fetch_walking_routes_sync called for {} routes", requests.len());

    let fail_all = |requests: Vec<RouteRequest>, error: String| -> Vec<WalkingRouteResult> {
        requests
            .into_iter()
            .enumerate()
            .map(|(index, request)| WalkingRouteResult::failure(index as u32, request, error.clone()))
            .collect()
    };

    let rt = match Builder::new_multi_thread().worker_threads(2).enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            warn!("Failed to create tokio runtime: {}", e);
            return fail_all(requests, format!("Runtime error: {}", e));
        }
    };

    let client = match DirectionsClient::new(&api_key) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to create directions client: {}", e);
            return fail_all(requests, e.to_string());
        }
    };

    rt.block_on(client.fetch_walking_routes(requests, on_progress))
}
