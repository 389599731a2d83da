//! Look up walking directions for the walking segments of a synthetic trace.
//!
//! Run with: ORS_API_KEY=... cargo run --example walking_routes --features http

use footpath_segmenter::directions::ProgressCallback;
use footpath_segmenter::{segment_trajectory, DirectionsClient, Fix, SegmentationConfig};
use std::sync::Arc;

const METERS_PER_DEGREE: f64 = 111_195.0;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let api_key = std::env::var("ORS_API_KEY")?;

    let mut fixes = vec![Fix::new(51.5074, -0.1278, 1_700_000_000_000)];
    for (count, step, interval_ms) in [(30, 0.0, 10_000), (40, 13.0, 10_000), (100, 60.0, 5_000), (30, 13.0, 10_000)] {
        for _ in 0..count {
            let last = fixes[fixes.len() - 1];
            fixes.push(Fix::new(
                last.latitude + step / METERS_PER_DEGREE,
                last.longitude,
                last.timestamp + interval_ms,
            ));
        }
    }

    let result = segment_trajectory(&fixes, &SegmentationConfig::default())?;
    println!("{} walking segments to route\n", result.walking.len());

    let client = DirectionsClient::new(&api_key)?;
    let progress: ProgressCallback = Arc::new(|done: u32, total: u32| println!("  {}/{} lookups done", done, total));
    let routes = client.fetch_for_segments(&result.walking, Some(progress)).await;

    for (segment, route) in result.walking.iter().zip(&routes) {
        match (&route.coordinates, &route.error) {
            (Some(coords), _) => println!(
                "Segment {:?}: tracked {:.0}m, routed {:.0}m over {} points",
                segment.range(),
                segment.length(),
                route.distance_meters.unwrap_or(0.0),
                coords.len()
            ),
            (None, error) => println!("Segment {:?}: lookup failed: {:?}", segment.range(), error),
        }
    }

    Ok(())
}
