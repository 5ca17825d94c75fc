//! Benchmark for replay throughput on the LARGE demo city.
//!
//! Run with: cargo run --release --bin bench

use road_network::demo_data;
use road_network::events::{replay, EventResult};
use std::time::Instant;

const EVENT_COUNT: usize = 5_000;

fn main() {
    let doc = demo_data::generate(demo_data::DemoData::Large);
    let queries = demo_data::generate_queries(&doc, EVENT_COUNT, 99);

    println!("Benchmark: Event Replay");
    println!("  Nodes: {}", doc.nodes.len());
    println!("  Edges: {}", doc.edges.len());
    println!("  Events: {}", queries.events.len());
    println!();

    let build_start = Instant::now();
    let mut graph = doc.into_graph();
    println!("Graph built: {} arcs ({:?})", graph.arc_count(), build_start.elapsed());
    println!();

    let result = replay(&queries.events, &mut graph, true);
    let elapsed = result.summary.elapsed;
    let events_per_sec = result.summary.events as f64 / elapsed.as_secs_f64();

    let slowest = result
        .results
        .iter()
        .filter(|r| matches!(r.result, EventResult::ShortestPath(_)))
        .filter_map(|r| r.processing_time)
        .fold(0.0_f64, f64::max);

    println!("Results:");
    println!("  Time: {:.2?}", elapsed);
    println!("  Events/sec: {:.0}", events_per_sec);
    println!("  Routes found: {}", result.summary.routes_found);
    println!("  Routes impossible: {}", result.summary.routes_impossible);
    println!("  KNN queries: {}", result.summary.knn_queries);
    println!("  Slowest route: {:.3}ms", slowest);

    assert_eq!(result.results.len(), EVENT_COUNT, "Missing results!");
}
