//! Basic example of segmenting a synthetic day of GPS fixes.
//!
//! Run with: cargo run --example basic_segmentation

use footpath_segmenter::{segment_trajectory, Fix, SegmentationConfig};

/// Roughly 111km per degree of latitude.
const METERS_PER_DEGREE: f64 = 111_195.0;

/// Append `count` fixes moving north by `step` meters every `interval_ms`.
fn travel(fixes: &mut Vec<Fix>, count: usize, step: f64, interval_ms: i64) {
    for _ in 0..count {
        let last = *fixes.last().expect("trace starts with a fix");
        fixes.push(Fix::new(
            last.latitude + step / METERS_PER_DEGREE,
            last.longitude,
            last.timestamp + interval_ms,
        ));
    }
}

fn main() {
    // Start at home in London
    let mut fixes = vec![Fix::new(51.5074, -0.1278, 1_700_000_000_000)];

    travel(&mut fixes, 30, 0.0, 10_000); // 5 minutes at home
    travel(&mut fixes, 40, 13.0, 10_000); // walk to the car park, 1.3 m/s
    travel(&mut fixes, 100, 60.0, 5_000); // drive, 12 m/s
    travel(&mut fixes, 30, 13.0, 10_000); // walk to the office
    travel(&mut fixes, 30, 0.0, 10_000); // at the desk

    let config = SegmentationConfig::default();

    println!("Footpath Segmentation Example\n");
    println!(
        "Config: record_delay={}s, stationary_radius={}m, min_segment={}m, walking_threshold={:.2} m/s\n",
        config.record_delay_secs,
        config.stationary_radius,
        config.min_segment_length,
        config.walking_speed_threshold
    );

    let result = match segment_trajectory(&fixes, &config) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Segmentation failed: {}", e);
            return;
        }
    };

    println!("{} fixes -> {} segments, {} stops\n", fixes.len(), result.labeled().len(), result.stops.len());

    for (label, segment) in result.labeled() {
        println!(
            "  {:<8} fixes {:>3}..{:<3} {:>6.0}m in {:>5.0}s ({:.2} m/s)",
            label.to_string(),
            segment.start_index(),
            segment.end_index(),
            segment.length(),
            segment.duration_seconds(),
            segment.average_speed()
        );
    }

    for stop in &result.stops {
        let (lat, lng) = stop.center();
        println!(
            "  stop     fixes {:>3}..={:<3} {:>5.0}s at ({:.5}, {:.5})",
            stop.arrival,
            stop.departure,
            stop.duration_seconds(),
            lat,
            lng
        );
    }

    println!("\n{} fixes discarded in short segments", result.discarded.iter().map(|s| s.len()).sum::<usize>());
}
