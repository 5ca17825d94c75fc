//! Constrained shortest-path search.
//!
//! A* over the [`Graph`] with a haversine heuristic toward the target.
//! Cost is edge `length` in distance mode and edge `average_time` in time
//! mode. Forbidden nodes and road types are excluded from the search.
//!
//! The heuristic is measured in meters. In time mode it is an optimistic
//! proxy only: when the implied speed of an edge is below 1 m per time unit
//! the estimate can exceed the true remaining time and the returned route
//! may be longer than the optimum.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::domain::{Edge, NodeId};
use crate::error::QueryError;
use crate::graph::Graph;

/// Minimum improvement for a relaxation to replace a known cost.
pub const COST_EPSILON: f64 = 1e-9;

/// Cost metric of a shortest-path query.
///
/// ```
/// use road_network::routing::RouteMode;
///
/// assert_eq!("distance".parse::<RouteMode>(), Ok(RouteMode::Distance));
/// assert_eq!("time".parse::<RouteMode>(), Ok(RouteMode::Time));
/// assert!("fastest".parse::<RouteMode>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteMode {
    Distance,
    Time,
}

impl RouteMode {
    pub fn as_str(self) -> &'static str {
        match self {
            RouteMode::Distance => "distance",
            RouteMode::Time => "time",
        }
    }

    /// Traversal cost of one arc under this metric.
    pub fn cost(self, edge: &Edge) -> f64 {
        match self {
            RouteMode::Distance => edge.length,
            RouteMode::Time => edge.average_time,
        }
    }
}

impl FromStr for RouteMode {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "distance" => Ok(RouteMode::Distance),
            "time" => Ok(RouteMode::Time),
            other => Err(QueryError::UnknownMode(other.to_string())),
        }
    }
}

impl fmt::Display for RouteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hard exclusions for a path search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Constraints {
    #[serde(default)]
    pub forbidden_nodes: HashSet<NodeId>,
    #[serde(default)]
    pub forbidden_road_types: HashSet<String>,
}

impl Constraints {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn forbid_node(mut self, node: NodeId) -> Self {
        self.forbidden_nodes.insert(node);
        self
    }

    pub fn forbid_road_type(mut self, road_type: impl Into<String>) -> Self {
        self.forbidden_road_types.insert(road_type.into());
        self
    }

    pub fn allows_node(&self, node: NodeId) -> bool {
        !self.forbidden_nodes.contains(&node)
    }

    pub fn allows_arc(&self, edge: &Edge) -> bool {
        !self.forbidden_road_types.contains(&edge.road_type)
    }
}

/// A minimum-cost path, source first.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub path: Vec<NodeId>,
    pub cost: f64,
}

/// Priority queue entry ordered by lowest `priority`, then by insertion
/// order.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FrontierEntry {
    pub priority: f64,
    pub cost: f64,
    pub node: NodeId,
    seq: u64,
}

impl PartialEq for FrontierEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FrontierEntry {}

impl PartialOrd for FrontierEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FrontierEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap: reverse both keys.
        other
            .priority
            .total_cmp(&self.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Min-priority queue with lazy deletion; callers skip settled nodes on pop.
#[derive(Debug, Default)]
pub(crate) struct Frontier {
    heap: BinaryHeap<FrontierEntry>,
    next_seq: u64,
}

impl Frontier {
    pub fn push(&mut self, node: NodeId, cost: f64, priority: f64) {
        self.heap.push(FrontierEntry {
            priority,
            cost,
            node,
            seq: self.next_seq,
        });
        self.next_seq += 1;
    }

    pub fn pop(&mut self) -> Option<FrontierEntry> {
        self.heap.pop()
    }
}

/// Finds the minimum-cost path from `source` to `target`.
///
/// # Errors
///
/// - [`QueryError::UnknownNode`] if either endpoint is missing
/// - [`QueryError::NoRoute`] if the target is unreachable under `constraints`
///   (including a forbidden source or target)
///
/// # Examples
///
/// ```
/// use road_network::domain::{Edge, Node};
/// use road_network::graph::Graph;
/// use road_network::routing::{shortest_path, Constraints, RouteMode};
///
/// let nodes = (1..=3).map(|id| Node::new(id, 0.0, 0.0));
/// let edges = vec![
///     Edge::new(1, 1, 2, 4.0, 1.0),
///     Edge::new(2, 2, 3, 4.0, 1.0),
///     Edge::new(3, 1, 3, 10.0, 1.5),
/// ];
/// let graph = Graph::build(nodes, edges);
///
/// let by_distance = shortest_path(&graph, 1, 3, RouteMode::Distance, &Constraints::none()).unwrap();
/// assert_eq!(by_distance.path, vec![1, 2, 3]);
/// assert_eq!(by_distance.cost, 8.0);
///
/// let by_time = shortest_path(&graph, 1, 3, RouteMode::Time, &Constraints::none()).unwrap();
/// assert_eq!(by_time.path, vec![1, 3]);
/// assert_eq!(by_time.cost, 1.5);
/// ```
pub fn shortest_path(
    graph: &Graph,
    source: NodeId,
    target: NodeId,
    mode: RouteMode,
    constraints: &Constraints,
) -> Result<Route, QueryError> {
    graph.node(source).ok_or(QueryError::UnknownNode(source))?;
    let goal = graph.node(target).ok_or(QueryError::UnknownNode(target))?.coord;

    if !constraints.allows_node(source) || !constraints.allows_node(target) {
        return Err(QueryError::NoRoute);
    }
    if source == target {
        return Ok(Route {
            path: vec![source],
            cost: 0.0,
        });
    }

    let mut frontier = Frontier::default();
    let mut best: HashMap<NodeId, f64> = HashMap::new();
    let mut parent: HashMap<NodeId, NodeId> = HashMap::new();
    let mut closed: HashSet<NodeId> = HashSet::new();

    best.insert(source, 0.0);
    frontier.push(source, 0.0, 0.0);

    while let Some(entry) = frontier.pop() {
        let current = entry.node;
        if !closed.insert(current) {
            continue;
        }
        let g = best.get(&current).copied().unwrap_or(entry.cost);

        if current == target {
            debug!(
                "{} route {} -> {} settled after {} nodes",
                mode,
                source,
                target,
                closed.len()
            );
            return Ok(Route {
                path: reconstruct(&parent, source, target),
                cost: g,
            });
        }

        for arc in graph.outgoing(current) {
            let next = arc.v;
            if !constraints.allows_arc(arc) || !constraints.allows_node(next) || closed.contains(&next) {
                continue;
            }
            let Some(node) = graph.node(next) else {
                continue;
            };

            let tentative = g + mode.cost(arc);
            let improves = best
                .get(&next)
                .map_or(true, |&known| tentative + COST_EPSILON < known);
            if improves {
                best.insert(next, tentative);
                parent.insert(next, current);
                frontier.push(next, tentative, tentative + node.coord.haversine_m(&goal));
            }
        }
    }

    Err(QueryError::NoRoute)
}

fn reconstruct(parent: &HashMap<NodeId, NodeId>, source: NodeId, target: NodeId) -> Vec<NodeId> {
    let mut path = vec![target];
    let mut current = target;
    while current != source {
        match parent.get(&current) {
            Some(&prev) => {
                path.push(prev);
                current = prev;
            }
            None => break,
        }
    }
    path.reverse();
    path
}
