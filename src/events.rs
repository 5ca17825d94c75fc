//! Query event dispatch and ordered replay.
//!
//! Every event yields exactly one [`EventResult`]. Reference and domain
//! errors (unknown ids, bad mode or metric, `k <= 0`) become failure records;
//! nothing here aborts a replay.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

use crate::domain::{Coord, EdgeId, EdgePatch, NodeId};
use crate::graph::Graph;
use crate::proximity::{nearest, KnnMetric};
use crate::routing::{shortest_path, Constraints, RouteMode};

/// Error message of an event whose `type` is not recognized.
pub const UNKNOWN_QUERY_TYPE: &str = "unknown query type";

/// A decoded entry of the event stream, tagged by `"type"`.
///
/// ```
/// use road_network::events::QueryEvent;
///
/// let event: QueryEvent = serde_json::from_str(r#"{"type": "remove_edge", "edge_id": 4}"#).unwrap();
/// assert_eq!(event, QueryEvent::RemoveEdge { edge_id: 4 });
///
/// let other: QueryEvent = serde_json::from_str(r#"{"type": "teleport"}"#).unwrap();
/// assert_eq!(other, QueryEvent::Unknown);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueryEvent {
    RemoveEdge {
        edge_id: EdgeId,
    },
    ModifyEdge {
        edge_id: EdgeId,
        patch: EdgePatch,
    },
    ShortestPath {
        id: i64,
        source: NodeId,
        target: NodeId,
        /// `distance` or `time`. Kept as text so a bad mode is answered with
        /// `possible: false` instead of rejecting the whole document.
        mode: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        constraints: Option<Constraints>,
    },
    Knn {
        id: i64,
        poi_type: String,
        query_point: Coord,
        k: i64,
        /// `euclidean` or `shortest_path`.
        metric: String,
        /// Anchor node. Defaults to the node nearest to `query_point`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source: Option<NodeId>,
    },
    #[serde(other)]
    Unknown,
}

impl QueryEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            QueryEvent::RemoveEdge { .. } => "remove_edge",
            QueryEvent::ModifyEdge { .. } => "modify_edge",
            QueryEvent::ShortestPath { .. } => "shortest_path",
            QueryEvent::Knn { .. } => "knn",
            QueryEvent::Unknown => "unknown",
        }
    }

    pub fn is_mutation(&self) -> bool {
        matches!(self, QueryEvent::RemoveEdge { .. } | QueryEvent::ModifyEdge { .. })
    }
}

/// Answer to a shortest-path event. Exactly one cost field is set when the
/// route is possible.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathResponse {
    pub id: i64,
    pub possible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<NodeId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_distance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_time: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KnnResponse {
    pub id: i64,
    pub neighbors: Vec<NodeId>,
}

/// One output record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EventResult {
    Done { done: bool },
    ShortestPath(PathResponse),
    Knn(KnnResponse),
    Error { error: String },
}

impl EventResult {
    fn done() -> Self {
        EventResult::Done { done: true }
    }
}

/// Output record with its processing time in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimedResult {
    #[serde(flatten)]
    pub result: EventResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time: Option<f64>,
}

/// Counters collected during a replay.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ReplaySummary {
    pub events: usize,
    pub mutations: usize,
    pub routes_found: usize,
    pub routes_impossible: usize,
    pub knn_queries: usize,
    pub unknown: usize,
    pub elapsed: Duration,
}

impl ReplaySummary {
    fn record(&mut self, event: &QueryEvent, result: &EventResult) {
        self.events += 1;
        match result {
            EventResult::Done { .. } => self.mutations += 1,
            EventResult::ShortestPath(r) if r.possible => self.routes_found += 1,
            EventResult::ShortestPath(_) => self.routes_impossible += 1,
            EventResult::Knn(_) => self.knn_queries += 1,
            EventResult::Error { .. } => {
                debug!("event of kind {} produced an error record", event.kind());
                self.unknown += 1;
            }
        }
    }
}

/// Results of a replay, in event order.
#[derive(Debug, Clone, Default)]
pub struct Replay {
    pub results: Vec<TimedResult>,
    pub summary: ReplaySummary,
}

/// Applies one event to the graph and shapes its result record.
///
/// ```
/// use road_network::domain::{Edge, Node};
/// use road_network::events::{process, EventResult, QueryEvent};
/// use road_network::graph::Graph;
///
/// let mut graph = Graph::build(
///     vec![Node::new(1, 0.0, 0.0), Node::new(2, 0.0, 0.0)],
///     vec![Edge::new(9, 1, 2, 3.0, 1.0)],
/// );
/// let result = process(&QueryEvent::RemoveEdge { edge_id: 9 }, &mut graph);
/// assert_eq!(result, EventResult::Done { done: true });
/// assert_eq!(graph.arc_count(), 0);
/// ```
pub fn process(event: &QueryEvent, graph: &mut Graph) -> EventResult {
    match event {
        QueryEvent::RemoveEdge { edge_id } => {
            graph.remove_edge(*edge_id);
            EventResult::done()
        }
        QueryEvent::ModifyEdge { edge_id, patch } => {
            graph.modify_edge(*edge_id, patch);
            EventResult::done()
        }
        QueryEvent::ShortestPath {
            id,
            source,
            target,
            mode,
            constraints,
        } => {
            let unconstrained = Constraints::none();
            let constraints = constraints.as_ref().unwrap_or(&unconstrained);
            EventResult::ShortestPath(answer_path(graph, *id, *source, *target, mode, constraints))
        }
        QueryEvent::Knn {
            id,
            poi_type,
            query_point,
            k,
            metric,
            source,
        } => {
            let k = usize::try_from(*k).unwrap_or(0);
            let neighbors: Vec<NodeId> = metric
                .parse::<KnnMetric>()
                .and_then(|metric| nearest(graph, metric, poi_type, *query_point, *source, k))
                .map(|found| found.into_iter().map(|n| n.node).collect())
                .unwrap_or_else(|e| {
                    debug!("knn {} answered empty: {}", id, e);
                    Vec::new()
                });
            EventResult::Knn(KnnResponse { id: *id, neighbors })
        }
        QueryEvent::Unknown => EventResult::Error {
            error: UNKNOWN_QUERY_TYPE.to_string(),
        },
    }
}

fn answer_path(
    graph: &Graph,
    id: i64,
    source: NodeId,
    target: NodeId,
    mode: &str,
    constraints: &Constraints,
) -> PathResponse {
    let impossible = PathResponse {
        id,
        possible: false,
        path: None,
        minimum_distance: None,
        minimum_time: None,
    };

    let mode = match mode.parse::<RouteMode>() {
        Ok(mode) => mode,
        Err(e) => {
            debug!("shortest_path {}: {}", id, e);
            return impossible;
        }
    };

    match shortest_path(graph, source, target, mode, constraints) {
        Ok(route) => {
            let (minimum_distance, minimum_time) = match mode {
                RouteMode::Distance => (Some(route.cost), None),
                RouteMode::Time => (None, Some(route.cost)),
            };
            PathResponse {
                id,
                possible: true,
                path: Some(route.path),
                minimum_distance,
                minimum_time,
            }
        }
        Err(e) => {
            debug!("shortest_path {} {} -> {}: {}", id, source, target, e);
            impossible
        }
    }
}

/// Folds the ordered event list over the graph.
///
/// Each mutation is visible to every later event and to no earlier one.
/// When `record_timing` is set each record carries its wall-clock
/// processing time.
pub fn replay(events: &[QueryEvent], graph: &mut Graph, record_timing: bool) -> Replay {
    let started = Instant::now();
    let mut replay = Replay {
        results: Vec::with_capacity(events.len()),
        summary: ReplaySummary::default(),
    };

    for event in events {
        let event_start = Instant::now();
        let result = process(event, graph);
        let processing_time = record_timing.then(|| event_start.elapsed().as_secs_f64() * 1000.0);

        replay.summary.record(event, &result);
        replay.results.push(TimedResult {
            result,
            processing_time,
        });
    }

    replay.summary.elapsed = started.elapsed();
    replay
}
