//! Example of segmenting a long trace with parallel classification.
//!
//! Run with: cargo run --example parallel_segmentation --features parallel

use footpath_segmenter::{segment_trajectory, segment_trajectory_parallel, Fix, SegmentationConfig};
use std::time::Instant;

const METERS_PER_DEGREE: f64 = 111_195.0;

fn main() {
    println!("Parallel Segmentation Example\n");

    // A week of commutes: dwell, walk, ride, walk, repeated
    let mut fixes = vec![Fix::new(48.8566, 2.3522, 1_700_000_000_000)];
    let mut push = |count: usize, step: f64, interval_ms: i64| {
        for _ in 0..count {
            let last = *fixes.last().expect("trace starts with a fix");
            fixes.push(Fix::new(
                last.latitude + step / METERS_PER_DEGREE,
                last.longitude,
                last.timestamp + interval_ms,
            ));
        }
    };
    for _ in 0..200 {
        push(40, 0.0, 10_000);
        push(50, 12.0, 10_000);
        push(120, 45.0, 5_000);
        push(50, 12.0, 10_000);
    }

    let config = SegmentationConfig::default();
    println!("Segmenting {} fixes\n", fixes.len());

    let start = Instant::now();
    let sequential = match segment_trajectory(&fixes, &config) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Segmentation failed: {}", e);
            return;
        }
    };
    let sequential_time = start.elapsed();

    let start = Instant::now();
    let parallel = match segment_trajectory_parallel(&fixes, &config) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Segmentation failed: {}", e);
            return;
        }
    };
    let parallel_time = start.elapsed();

    println!("Sequential: {:?}", sequential_time);
    println!("Parallel:   {:?}", parallel_time);
    println!("Identical:  {}\n", sequential == parallel);

    println!(
        "{} walking, {} faster, {} discarded, {} stops",
        parallel.walking.len(),
        parallel.faster.len(),
        parallel.discarded.len(),
        parallel.stops.len()
    );

    let walked: f64 = parallel.walking.iter().map(|s| s.length()).sum();
    let rode: f64 = parallel.faster.iter().map(|s| s.length()).sum();
    println!("Walked {:.1}km, rode {:.1}km", walked / 1000.0, rode / 1000.0);
}
