//! Demo data generators for the road network.
//!
//! Builds synthetic grid cities around Philadelphia:
//! - SMALL (10 x 10 intersections)
//! - MEDIUM (40 x 40 intersections)
//! - LARGE (100 x 100 intersections)
//!
//! Every eighth street is a primary road, every fourth a secondary, every
//! second a tertiary and the rest are residential. Some residential streets
//! are one-way and roughly one node in ten carries a POI tag.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::document::{EdgeRecord, GraphDocument, GraphMeta, NodeRecord, QueriesDocument, QueriesMeta};
use crate::domain::{Coord, EdgePatch, SPEED_PROFILE_SLOTS};
use crate::events::QueryEvent;
use crate::routing::Constraints;

/// South-west corner of every generated grid.
const BASE_LAT: f64 = 39.95;
const BASE_LON: f64 = -75.17;

/// Grid spacing in degrees (roughly 170 m to 220 m).
const SPACING: f64 = 0.002;

/// POI tags handed out to intersections.
const POI_TYPES: [&str; 6] = ["cafe", "fuel", "hospital", "pharmacy", "restaurant", "school"];

/// Chance that a node carries a given POI tag.
const POI_PROBABILITY: f64 = 0.018;

/// Chance that a residential street is one-way.
const ONEWAY_PROBABILITY: f64 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemoData {
    Small,
    Medium,
    Large,
}

impl std::str::FromStr for DemoData {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "SMALL" => Ok(DemoData::Small),
            "MEDIUM" => Ok(DemoData::Medium),
            "LARGE" => Ok(DemoData::Large),
            _ => Err(()),
        }
    }
}

impl DemoData {
    pub fn as_str(&self) -> &'static str {
        match self {
            DemoData::Small => "SMALL",
            DemoData::Medium => "MEDIUM",
            DemoData::Large => "LARGE",
        }
    }

    fn config(&self) -> GridConfig {
        match self {
            DemoData::Small => GridConfig {
                seed: 42,
                rows: 10,
                cols: 10,
            },
            DemoData::Medium => GridConfig {
                seed: 7,
                rows: 40,
                cols: 40,
            },
            DemoData::Large => GridConfig {
                seed: 2024,
                rows: 100,
                cols: 100,
            },
        }
    }
}

struct GridConfig {
    seed: u64,
    rows: usize,
    cols: usize,
}

/// Returns all available demo dataset names.
pub fn available_datasets() -> &'static [&'static str] {
    &["SMALL", "MEDIUM", "LARGE"]
}

/// Generates a demo graph document.
///
/// # Examples
///
/// ```
/// use road_network::demo_data::{generate, DemoData};
///
/// let doc = generate(DemoData::Small);
/// assert_eq!(doc.meta.id, "SMALL");
/// assert_eq!(doc.nodes.len(), 100);
/// assert!(doc.validate().is_ok());
/// ```
pub fn generate(demo: DemoData) -> GraphDocument {
    let config = demo.config();
    let mut rng = StdRng::seed_from_u64(config.seed);

    let node_id = |row: usize, col: usize| (row * config.cols + col + 1) as i64;

    let mut nodes = Vec::with_capacity(config.rows * config.cols);
    for row in 0..config.rows {
        for col in 0..config.cols {
            let lat = BASE_LAT + row as f64 * SPACING + rng.gen_range(-0.0003..0.0003);
            let lon = BASE_LON + col as f64 * SPACING + rng.gen_range(-0.0003..0.0003);
            let pois = POI_TYPES
                .iter()
                .filter(|_| rng.gen_bool(POI_PROBABILITY))
                .map(|poi| poi.to_string())
                .collect();
            nodes.push(NodeRecord {
                id: node_id(row, col),
                lat,
                lon,
                pois,
            });
        }
    }

    let mut edges = Vec::new();
    let mut next_edge_id = 1;
    for row in 0..config.rows {
        for col in 0..config.cols {
            let here = node_id(row, col);
            // East along the row, then north along the column.
            let neighbours = [
                (col + 1 < config.cols).then(|| (node_id(row, col + 1), row)),
                (row + 1 < config.rows).then(|| (node_id(row + 1, col), col)),
            ];
            for (there, street) in neighbours.into_iter().flatten() {
                let record = street_segment(&mut rng, next_edge_id, &nodes, here, there, street);
                edges.push(record);
                next_edge_id += 1;
            }
        }
    }

    GraphDocument {
        meta: GraphMeta {
            id: demo.as_str().to_string(),
            nodes: nodes.len(),
            description: format!(
                "{} x {} synthetic street grid around Philadelphia",
                config.rows, config.cols
            ),
        },
        nodes,
        edges,
    }
}

/// Generates demo data by name.
///
/// ```
/// use road_network::demo_data::generate_by_name;
///
/// assert!(generate_by_name("medium").is_some());
/// assert!(generate_by_name("HUGE").is_none());
/// ```
pub fn generate_by_name(name: &str) -> Option<GraphDocument> {
    name.parse::<DemoData>().ok().map(generate)
}

fn street_segment(
    rng: &mut StdRng,
    id: i64,
    nodes: &[NodeRecord],
    from: i64,
    to: i64,
    street: usize,
) -> EdgeRecord {
    let road_type = road_type_for_street(street);
    let coord = |id: i64| {
        let node = &nodes[(id - 1) as usize];
        Coord::new(node.lat, node.lon)
    };

    let length = coord(from).haversine_m(&coord(to)) * rng.gen_range(1.0..1.3);
    let average_time = length / speed_for_road_type(road_type) * rng.gen_range(0.9..1.2);
    let oneway = road_type == "residential" && rng.gen_bool(ONEWAY_PROBABILITY);
    let (u, v) = if oneway && rng.gen_bool(0.5) {
        (to, from)
    } else {
        (from, to)
    };
    let speed_profile = rng
        .gen_bool(0.5)
        .then(|| daily_speed_profile(length / average_time));

    EdgeRecord {
        id,
        u,
        v,
        length,
        average_time,
        oneway,
        road_type: road_type.to_string(),
        speed_profile,
    }
}

fn road_type_for_street(street: usize) -> &'static str {
    if street % 8 == 0 {
        "primary"
    } else if street % 4 == 0 {
        "secondary"
    } else if street % 2 == 0 {
        "tertiary"
    } else {
        "residential"
    }
}

/// Returns speed in m/s for a road type.
fn speed_for_road_type(road_type: &str) -> f64 {
    let kmh = match road_type {
        "motorway" => 100.0,
        "trunk" => 80.0,
        "primary" => 60.0,
        "secondary" => 50.0,
        "tertiary" => 40.0,
        "residential" => 30.0,
        "service" => 20.0,
        "living_street" => 10.0,
        _ => 30.0,
    };
    kmh * 1000.0 / 3600.0
}

/// Free-flowing at night, slowed during the morning and evening peaks.
fn daily_speed_profile(base: f64) -> Vec<f64> {
    (0..SPEED_PROFILE_SLOTS)
        .map(|slot| {
            let hour = slot / 4;
            let factor = match hour {
                0..=5 => 1.2,
                7..=8 | 16..=18 => 0.6,
                _ => 1.0,
            };
            base * factor
        })
        .collect()
}

/// Generates a seeded stream of mixed events over `graph`.
///
/// Roughly one event in five mutates the network; the rest are shortest
/// path and KNN queries, some with constraints or the network metric.
///
/// ```
/// use road_network::demo_data::{generate, generate_queries, DemoData};
///
/// let graph = generate(DemoData::Small);
/// let queries = generate_queries(&graph, 50, 1);
/// assert_eq!(queries.events.len(), 50);
/// assert!(queries.validate().is_ok());
/// ```
pub fn generate_queries(graph: &GraphDocument, count: usize, seed: u64) -> QueriesDocument {
    let mut rng = StdRng::seed_from_u64(seed);
    let meta = QueriesMeta {
        id: format!("{}-queries-{}", graph.meta.id, seed),
    };
    if graph.nodes.is_empty() {
        return QueriesDocument {
            meta,
            events: Vec::new(),
        };
    }

    let mut events = Vec::with_capacity(count);
    let mut next_query_id = 1;
    while events.len() < count {
        let roll: u32 = rng.gen_range(1..=100);
        let edge = graph.edges.choose(&mut rng);

        let event = match (roll, edge) {
            (1..=10, Some(edge)) => QueryEvent::RemoveEdge { edge_id: edge.id },
            (11..=20, Some(edge)) => QueryEvent::ModifyEdge {
                edge_id: edge.id,
                patch: random_patch(&mut rng, edge),
            },
            (21..=65, _) | (1..=20, None) => {
                let id = next_query_id;
                next_query_id += 1;
                random_shortest_path(&mut rng, graph, id)
            }
            _ => {
                let id = next_query_id;
                next_query_id += 1;
                random_knn(&mut rng, graph, id)
            }
        };
        events.push(event);
    }

    QueriesDocument { meta, events }
}

fn random_patch(rng: &mut StdRng, edge: &EdgeRecord) -> EdgePatch {
    match rng.gen_range(0..3) {
        // Congestion
        0 => EdgePatch {
            average_time: Some(edge.average_time * rng.gen_range(1.5..4.0)),
            ..Default::default()
        },
        1 => EdgePatch {
            oneway: Some(!edge.oneway),
            ..Default::default()
        },
        _ => EdgePatch {
            road_type: Some("service".to_string()),
            average_time: Some(edge.length / speed_for_road_type("service")),
            ..Default::default()
        },
    }
}

fn random_shortest_path(rng: &mut StdRng, graph: &GraphDocument, id: i64) -> QueryEvent {
    let source = random_node(rng, graph);
    let target = random_node(rng, graph);
    let mode = if rng.gen_bool(0.5) { "distance" } else { "time" };

    let constraints = match rng.gen_range(0..10) {
        0 => Some(Constraints::none().forbid_node(random_node(rng, graph))),
        1 => Some(Constraints::none().forbid_road_type("primary")),
        _ => None,
    };

    QueryEvent::ShortestPath {
        id,
        source,
        target,
        mode: mode.to_string(),
        constraints,
    }
}

fn random_node(rng: &mut StdRng, graph: &GraphDocument) -> i64 {
    graph.nodes[rng.gen_range(0..graph.nodes.len())].id
}

fn random_knn(rng: &mut StdRng, graph: &GraphDocument, id: i64) -> QueryEvent {
    let near = &graph.nodes[rng.gen_range(0..graph.nodes.len())];
    let query_point = Coord::new(
        near.lat + rng.gen_range(-SPACING..SPACING),
        near.lon + rng.gen_range(-SPACING..SPACING),
    );
    let metric = if rng.gen_bool(0.5) { "euclidean" } else { "shortest_path" };

    QueryEvent::Knn {
        id,
        poi_type: POI_TYPES[rng.gen_range(0..POI_TYPES.len())].to_string(),
        query_point,
        k: rng.gen_range(1..=5),
        metric: metric.to_string(),
        source: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::replay;

    #[test]
    fn test_generate_small() {
        let doc = generate(DemoData::Small);
        assert_eq!(doc.nodes.len(), 100);
        // 10 rows x 9 east segments + 9 x 10 north segments
        assert_eq!(doc.edges.len(), 180);
        assert!(doc.validate().is_ok());
    }

    #[test]
    fn test_generation_is_deterministic() {
        assert_eq!(generate(DemoData::Small), generate(DemoData::Small));
    }

    #[test]
    fn test_grid_has_road_mix() {
        let doc = generate(DemoData::Medium);
        for road_type in ["primary", "secondary", "tertiary", "residential"] {
            assert!(
                doc.edges.iter().any(|e| e.road_type == road_type),
                "no {} roads",
                road_type
            );
        }
        assert!(doc.edges.iter().any(|e| e.oneway));
        assert!(doc.edges.iter().any(|e| e.speed_profile.is_none()));
        assert!(doc.nodes.iter().any(|n| !n.pois.is_empty()));
    }

    #[test]
    fn test_demo_data_from_str() {
        assert_eq!("SMALL".parse::<DemoData>(), Ok(DemoData::Small));
        assert_eq!("medium".parse::<DemoData>(), Ok(DemoData::Medium));
        assert_eq!("LARGE".parse::<DemoData>(), Ok(DemoData::Large));
        assert!("invalid".parse::<DemoData>().is_err());
    }

    #[test]
    fn test_generated_queries_replay() {
        let doc = generate(DemoData::Small);
        let queries = generate_queries(&doc, 200, 3);
        assert!(queries.events.iter().any(QueryEvent::is_mutation));
        assert!(queries.events.iter().any(|e| e.kind() == "knn"));
        assert!(queries.events.iter().any(|e| e.kind() == "shortest_path"));

        let mut graph = doc.into_graph();
        let result = replay(&queries.events, &mut graph, false);
        assert_eq!(result.results.len(), 200);
        assert_eq!(result.summary.unknown, 0);
        assert!(result.summary.routes_found > 0);
    }

    #[test]
    fn test_rush_hour_is_slower() {
        let profile = daily_speed_profile(10.0);
        assert_eq!(profile.len(), SPEED_PROFILE_SLOTS);
        assert!(profile[8 * 4] < profile[12 * 4]);
        assert!(profile[2 * 4] > profile[12 * 4]);
    }
}
