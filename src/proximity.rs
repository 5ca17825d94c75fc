//! Nearest point-of-interest search.
//!
//! Two independent strategies, both restricted to nodes carrying the
//! requested POI tag and both keeping the `k` best candidates in a bounded
//! max-heap:
//!
//! - [`knn_planar`]: straight-line distance in degree space to a query point
//! - [`knn_network`]: network distance (sum of edge `length`) from an anchor
//!   node, with early termination once `k` matches are secured

use ordered_float::OrderedFloat;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::str::FromStr;
use tracing::debug;

use crate::domain::{Coord, NodeId};
use crate::error::QueryError;
use crate::graph::Graph;
use crate::routing::{Frontier, COST_EPSILON};

/// Distance measure of a KNN query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnnMetric {
    /// Latitude/longitude treated as Cartesian coordinates.
    Euclidean,
    /// Shortest network distance over edge lengths.
    Network,
}

impl FromStr for KnnMetric {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "euclidean" => Ok(KnnMetric::Euclidean),
            "shortest_path" | "network" => Ok(KnnMetric::Network),
            other => Err(QueryError::UnknownMetric(other.to_string())),
        }
    }
}

/// A matching node and its distance under the query metric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub node: NodeId,
    pub distance: f64,
}

/// Heap candidate ordered by distance, then node id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Candidate {
    distance: OrderedFloat<f64>,
    node: NodeId,
}

/// Keeps the `k` smallest candidates; the worst one sits on top.
struct BoundedHeap {
    heap: BinaryHeap<Candidate>,
    k: usize,
}

impl BoundedHeap {
    fn new(k: usize) -> Self {
        Self {
            heap: BinaryHeap::new(),
            k,
        }
    }

    fn offer(&mut self, node: NodeId, distance: f64) {
        self.heap.push(Candidate {
            distance: OrderedFloat(distance),
            node,
        });
        if self.heap.len() > self.k {
            self.heap.pop();
        }
    }

    fn is_full(&self) -> bool {
        self.heap.len() >= self.k
    }

    fn worst(&self) -> Option<f64> {
        self.heap.peek().map(|c| c.distance.0)
    }

    fn into_ascending(self) -> Vec<Neighbor> {
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|c| Neighbor {
                node: c.node,
                distance: c.distance.0,
            })
            .collect()
    }
}

/// Finds the `k` tagged nodes closest to `query_point` in degree space.
///
/// `anchor` must exist in the graph but does not enter the distance.
///
/// # Examples
///
/// ```
/// use road_network::domain::{Coord, Node};
/// use road_network::graph::Graph;
/// use road_network::proximity::knn_planar;
///
/// let graph = Graph::build(
///     vec![
///         Node::new(1, 0.0, 3.0).with_poi("cafe"),
///         Node::new(2, 0.0, 1.0).with_poi("cafe"),
///         Node::new(3, 0.0, 2.0).with_poi("cafe"),
///         Node::new(4, 0.0, 0.5),
///     ],
///     vec![],
/// );
///
/// let found = knn_planar(&graph, 4, "cafe", Coord::new(0.0, 0.0), 2).unwrap();
/// let ids: Vec<_> = found.iter().map(|n| n.node).collect();
/// assert_eq!(ids, vec![2, 3]);
/// ```
pub fn knn_planar(
    graph: &Graph,
    anchor: NodeId,
    poi: &str,
    query_point: Coord,
    k: usize,
) -> Result<Vec<Neighbor>, QueryError> {
    if !graph.contains_node(anchor) {
        return Err(QueryError::UnknownNode(anchor));
    }
    if k == 0 {
        return Ok(Vec::new());
    }

    let mut best = BoundedHeap::new(k);
    for node in graph.nodes_with_poi(poi) {
        best.offer(node.id, query_point.planar(&node.coord));
    }
    Ok(best.into_ascending())
}

/// Finds the `k` tagged nodes nearest to `anchor` by network distance.
///
/// Dijkstra over edge `length`; stops once `k` matches are held and the
/// frontier minimum exceeds the k-th best distance.
///
/// # Examples
///
/// ```
/// use road_network::domain::{Edge, Node};
/// use road_network::graph::Graph;
/// use road_network::proximity::knn_network;
///
/// let graph = Graph::build(
///     vec![
///         Node::new(1, 0.0, 0.0),
///         Node::new(2, 0.0, 0.0).with_poi("fuel"),
///         Node::new(3, 0.0, 0.0).with_poi("fuel"),
///     ],
///     vec![Edge::new(1, 1, 2, 5.0, 1.0), Edge::new(2, 1, 3, 2.0, 1.0)],
/// );
///
/// let found = knn_network(&graph, 1, "fuel", 1).unwrap();
/// assert_eq!(found[0].node, 3);
/// assert_eq!(found[0].distance, 2.0);
/// ```
pub fn knn_network(graph: &Graph, anchor: NodeId, poi: &str, k: usize) -> Result<Vec<Neighbor>, QueryError> {
    if !graph.contains_node(anchor) {
        return Err(QueryError::UnknownNode(anchor));
    }
    if k == 0 {
        return Ok(Vec::new());
    }

    let mut found = BoundedHeap::new(k);
    let mut frontier = Frontier::default();
    let mut best: HashMap<NodeId, f64> = HashMap::new();
    let mut settled: HashSet<NodeId> = HashSet::new();

    best.insert(anchor, 0.0);
    frontier.push(anchor, 0.0, 0.0);

    while let Some(entry) = frontier.pop() {
        if found.is_full() && found.worst().is_some_and(|worst| entry.cost > worst) {
            break;
        }
        let current = entry.node;
        if !settled.insert(current) {
            continue;
        }
        let Some(node) = graph.node(current) else {
            continue;
        };
        if node.has_poi(poi) {
            found.offer(current, entry.cost);
        }

        for arc in graph.outgoing(current) {
            if settled.contains(&arc.v) || !graph.contains_node(arc.v) {
                continue;
            }
            let tentative = entry.cost + arc.length;
            let improves = best
                .get(&arc.v)
                .map_or(true, |&known| tentative + COST_EPSILON < known);
            if improves {
                best.insert(arc.v, tentative);
                frontier.push(arc.v, tentative, tentative);
            }
        }
    }

    debug!(
        "network knn from {} settled {} nodes for '{}'",
        anchor,
        settled.len(),
        poi
    );
    Ok(found.into_ascending())
}

/// Runs the KNN strategy selected by `metric`, anchored at `source` when
/// given and otherwise at the node nearest to `query_point`.
pub fn nearest(
    graph: &Graph,
    metric: KnnMetric,
    poi: &str,
    query_point: Coord,
    source: Option<NodeId>,
    k: usize,
) -> Result<Vec<Neighbor>, QueryError> {
    let anchor = match source {
        Some(id) => id,
        None => graph.snap_to_node(query_point).ok_or(QueryError::NoAnchor)?,
    };

    match metric {
        KnnMetric::Euclidean => knn_planar(graph, anchor, poi, query_point, k),
        KnnMetric::Network => knn_network(graph, anchor, poi, k),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Edge, Node};

    /// Path 1 - 2 - 3 - 4 - 5 with unit lengths; POIs on 2, 4 and 5, plus an
    /// isolated tagged node 6.
    fn corridor() -> Graph {
        let nodes = vec![
            Node::new(1, 0.0, 0.0),
            Node::new(2, 0.0, 0.1).with_poi("cafe"),
            Node::new(3, 0.0, 0.2).with_poi("fuel"),
            Node::new(4, 0.0, 0.3).with_poi("cafe"),
            Node::new(5, 0.0, 0.4).with_poi("cafe"),
            Node::new(6, 0.0, 0.05).with_poi("cafe"),
        ];
        let edges = (1..=4).map(|i| Edge::new(i, i, i + 1, 1.0, 1.0)).collect::<Vec<_>>();
        Graph::build(nodes, edges)
    }

    fn ids(found: &[Neighbor]) -> Vec<NodeId> {
        found.iter().map(|n| n.node).collect()
    }

    #[test]
    fn test_planar_returns_k_closest_ascending() {
        let graph = Graph::build(
            vec![
                Node::new(1, 3.0, 0.0).with_poi("school"),
                Node::new(2, 1.0, 0.0).with_poi("school"),
                Node::new(3, 2.0, 0.0).with_poi("school"),
            ],
            vec![],
        );
        let found = knn_planar(&graph, 1, "school", Coord::new(0.0, 0.0), 2).unwrap();
        assert_eq!(ids(&found), vec![2, 3]);
        assert_eq!(found[0].distance, 1.0);
        assert_eq!(found[1].distance, 2.0);
    }

    #[test]
    fn test_planar_only_tagged_nodes() {
        let graph = corridor();
        let found = knn_planar(&graph, 1, "cafe", Coord::new(0.0, 0.0), 10).unwrap();
        assert_eq!(ids(&found), vec![6, 2, 4, 5]);
        assert!(found.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[test]
    fn test_network_uses_graph_distance() {
        let graph = corridor();
        // Node 6 is planar-closest but unreachable
        let found = knn_network(&graph, 1, "cafe", 2).unwrap();
        assert_eq!(ids(&found), vec![2, 4]);
        assert_eq!(found[1].distance, 3.0);

        let all = knn_network(&graph, 1, "cafe", 10).unwrap();
        assert_eq!(ids(&all), vec![2, 4, 5]);
    }

    #[test]
    fn test_network_includes_tagged_anchor() {
        let graph = corridor();
        let found = knn_network(&graph, 3, "fuel", 3).unwrap();
        assert_eq!(ids(&found), vec![3]);
        assert_eq!(found[0].distance, 0.0);
    }

    #[test]
    fn test_network_after_edge_removal() {
        let mut graph = corridor();
        graph.remove_edge(3);
        let found = knn_network(&graph, 1, "cafe", 3).unwrap();
        assert_eq!(ids(&found), vec![2]);
    }

    #[test]
    fn test_network_skips_arc_to_missing_node() {
        let mut graph = corridor();
        graph.add_edge(Edge::new(30, 1, 42, 0.1, 0.1).with_oneway(true));
        let found = knn_network(&graph, 1, "cafe", 2).unwrap();
        assert_eq!(ids(&found), vec![2, 4]);
        assert_eq!(found[1].distance, 3.0);
    }

    #[test]
    fn test_k_larger_than_candidates() {
        let graph = corridor();
        let planar = knn_planar(&graph, 1, "cafe", Coord::new(0.0, 0.0), usize::MAX).unwrap();
        assert_eq!(ids(&planar), vec![6, 2, 4, 5]);
        let network = knn_network(&graph, 1, "cafe", usize::MAX).unwrap();
        assert_eq!(ids(&network), vec![2, 4, 5]);
    }

    #[test]
    fn test_zero_k_and_unknown_anchor() {
        let graph = corridor();
        assert!(knn_planar(&graph, 1, "cafe", Coord::new(0.0, 0.0), 0).unwrap().is_empty());
        assert!(knn_network(&graph, 1, "cafe", 0).unwrap().is_empty());
        assert_eq!(
            knn_network(&graph, 42, "cafe", 1),
            Err(QueryError::UnknownNode(42))
        );
        assert_eq!(
            knn_planar(&graph, 42, "cafe", Coord::new(0.0, 0.0), 1),
            Err(QueryError::UnknownNode(42))
        );
    }

    #[test]
    fn test_nearest_snaps_query_point() {
        let graph = corridor();
        // Query point next to node 4; its network neighbours are 4 then 5
        let found = nearest(&graph, KnnMetric::Network, "cafe", Coord::new(0.0, 0.31), None, 2).unwrap();
        assert_eq!(ids(&found), vec![4, 5]);

        let planar = nearest(&graph, KnnMetric::Euclidean, "cafe", Coord::new(0.0, 0.31), None, 1).unwrap();
        assert_eq!(ids(&planar), vec![4]);
    }

    #[test]
    fn test_nearest_on_empty_graph() {
        let graph = Graph::new();
        assert_eq!(
            nearest(&graph, KnnMetric::Euclidean, "cafe", Coord::new(0.0, 0.0), None, 3),
            Err(QueryError::NoAnchor)
        );
    }

    #[test]
    fn test_metric_parsing() {
        assert_eq!("euclidean".parse::<KnnMetric>(), Ok(KnnMetric::Euclidean));
        assert_eq!("shortest_path".parse::<KnnMetric>(), Ok(KnnMetric::Network));
        assert_eq!("network".parse::<KnnMetric>(), Ok(KnnMetric::Network));
        assert!("manhattan".parse::<KnnMetric>().is_err());
    }
}
