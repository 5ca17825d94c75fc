//! Mutable road network store.
//!
//! Owns every node and every directed arc, plus an adjacency index from a
//! tail node to the keys of its outgoing arcs. A two-way road is stored as
//! two independent arcs (see [`Edge::reverse`]) that are always inserted,
//! patched and removed together.

use ordered_float::OrderedFloat;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use crate::domain::{ArcKey, Coord, Edge, EdgeId, EdgePatch, Node, NodeId};

/// Road network graph with forward/reverse arc pairing.
///
/// # Examples
///
/// ```
/// use road_network::domain::{Edge, Node};
/// use road_network::graph::Graph;
///
/// let nodes = vec![Node::new(1, 0.0, 0.0), Node::new(2, 0.0, 0.001)];
/// let mut graph = Graph::build(nodes, vec![Edge::new(5, 1, 2, 100.0, 9.0)]);
///
/// // A two-way road contributes two arcs
/// assert_eq!(graph.arc_count(), 2);
/// assert_eq!(graph.outgoing(2).next().map(|e| e.id), Some(-5));
///
/// // Removing it drops both directions
/// assert!(graph.remove_edge(5));
/// assert_eq!(graph.arc_count(), 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: HashMap<NodeId, Node>,
    edges: HashMap<ArcKey, Edge>,
    /// Tail node to outgoing arc keys. Ordered so traversal is deterministic.
    adjacency: HashMap<NodeId, BTreeSet<ArcKey>>,
}

/// Size summary of a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GraphStats {
    pub node_count: usize,
    pub arc_count: usize,
    pub poi_node_count: usize,
}

impl Graph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the graph from complete node and edge lists, synthesizing the
    /// reverse arc of every two-way edge.
    pub fn build(nodes: impl IntoIterator<Item = Node>, edges: impl IntoIterator<Item = Edge>) -> Self {
        let mut graph = Self::new();
        for node in nodes {
            graph.add_node(node);
        }
        for edge in edges {
            graph.add_edge(edge);
        }

        info!(
            "Built graph with {} nodes and {} arcs",
            graph.node_count(),
            graph.arc_count()
        );
        graph
    }

    pub fn add_node(&mut self, node: Node) {
        self.nodes.insert(node.id, node);
    }

    /// Inserts an edge, and its reverse arc when the edge is two-way.
    /// Arcs with the same key are replaced.
    pub fn add_edge(&mut self, edge: Edge) {
        if !edge.oneway {
            self.attach(edge.reverse());
        }
        self.attach(edge);
    }

    /// Removes the arc with this id and, for a two-way road, its paired arc.
    ///
    /// Returns `false` when no such arc exists. The call is idempotent: a
    /// second removal of the same id leaves the graph untouched.
    pub fn remove_edge(&mut self, edge_id: EdgeId) -> bool {
        let Some(key) = self.find_key(edge_id) else {
            debug!("remove_edge({}): no such arc", edge_id);
            return false;
        };
        let Some(edge) = self.detach(key) else {
            return false;
        };
        if !edge.oneway {
            self.detach(key.paired());
        }
        debug!("Removed edge {} ({} -> {})", edge_id, edge.u, edge.v);
        true
    }

    /// Applies `patch` to the arc with this id and mirrors it onto the paired
    /// arc.
    ///
    /// A `oneway` change keeps the pairing invariant: a road made one-way
    /// loses its paired arc, a road made two-way gains one. Returns `false`
    /// (and changes nothing) when the id is unknown.
    pub fn modify_edge(&mut self, edge_id: EdgeId, patch: &EdgePatch) -> bool {
        let Some(key) = self.find_key(edge_id) else {
            warn!("modify_edge({}): no such arc, patch ignored", edge_id);
            return false;
        };
        let pair = key.paired();
        let Some(edge) = self.edges.get_mut(&key) else {
            return false;
        };

        let was_two_way = !edge.oneway;
        edge.apply(patch);
        let updated = edge.clone();

        if updated.oneway {
            if was_two_way {
                self.detach(pair);
            }
        } else {
            match self.edges.get_mut(&pair) {
                Some(paired) => paired.apply(patch),
                None => self.attach(updated.reverse()),
            }
        }
        true
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Looks up an arc by signed id, preferring an original arc over a
    /// synthesized reverse one.
    pub fn edge(&self, edge_id: EdgeId) -> Option<&Edge> {
        self.find_key(edge_id).and_then(|key| self.edges.get(&key))
    }

    /// Outgoing arcs of `node`, ordered by arc key.
    pub fn outgoing(&self, node: NodeId) -> impl Iterator<Item = &Edge> {
        self.adjacency
            .get(&node)
            .into_iter()
            .flatten()
            .filter_map(|key| self.edges.get(key))
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn arcs(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    /// Nodes carrying the given point-of-interest tag.
    pub fn nodes_with_poi<'a>(&'a self, poi: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.nodes.values().filter(move |node| node.has_poi(poi))
    }

    /// Finds the node nearest to `coord` by great-circle distance.
    /// Equal distances resolve to the lowest node id.
    pub fn snap_to_node(&self, coord: Coord) -> Option<NodeId> {
        self.nodes
            .values()
            .min_by_key(|node| (OrderedFloat(coord.haversine_m(&node.coord)), node.id))
            .map(|node| node.id)
    }

    /// Returns the number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of stored directed arcs.
    pub fn arc_count(&self) -> usize {
        self.edges.len()
    }

    pub fn stats(&self) -> GraphStats {
        GraphStats {
            node_count: self.node_count(),
            arc_count: self.arc_count(),
            poi_node_count: self.nodes.values().filter(|n| !n.pois.is_empty()).count(),
        }
    }

    fn find_key(&self, edge_id: EdgeId) -> Option<ArcKey> {
        [false, true]
            .into_iter()
            .map(|reversed| ArcKey { id: edge_id, reversed })
            .find(|key| self.edges.contains_key(key))
    }

    fn attach(&mut self, edge: Edge) {
        let key = edge.key();
        let tail = edge.u;
        if let Some(old) = self.edges.insert(key, edge) {
            if old.u != tail {
                self.unlink(old.u, key);
            }
        }
        self.adjacency.entry(tail).or_default().insert(key);
    }

    fn detach(&mut self, key: ArcKey) -> Option<Edge> {
        let edge = self.edges.remove(&key)?;
        self.unlink(edge.u, key);
        Some(edge)
    }

    fn unlink(&mut self, tail: NodeId, key: ArcKey) {
        if let Some(out) = self.adjacency.get_mut(&tail) {
            out.remove(&key);
            if out.is_empty() {
                self.adjacency.remove(&tail);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_graph() -> Graph {
        let nodes = (1..=3).map(|id| Node::new(id, 0.0, id as f64 * 0.001));
        let edges = vec![
            Edge::new(10, 1, 2, 1.0, 1.0).with_road_type("primary"),
            Edge::new(20, 2, 3, 1.0, 1.0).with_oneway(true),
        ];
        Graph::build(nodes, edges)
    }

    fn heads(graph: &Graph, node: NodeId) -> Vec<NodeId> {
        graph.outgoing(node).map(|e| e.v).collect()
    }

    #[test]
    fn test_build_pairs_two_way_edges() {
        let graph = line_graph();
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.arc_count(), 3);
        assert_eq!(heads(&graph, 1), vec![2]);
        assert_eq!(heads(&graph, 2), vec![1, 3]);
        assert!(heads(&graph, 3).is_empty());

        let reverse = graph.edge(-10).unwrap();
        assert!(reverse.reversed);
        assert_eq!((reverse.u, reverse.v), (2, 1));
    }

    #[test]
    fn test_remove_edge_is_idempotent() {
        let mut graph = line_graph();
        assert!(graph.remove_edge(10));
        let after_first = graph.arc_count();
        assert!(!graph.remove_edge(10));
        assert_eq!(graph.arc_count(), after_first);
        assert!(graph.edge(10).is_none());
        assert!(graph.edge(-10).is_none());
    }

    #[test]
    fn test_remove_two_way_edge_drops_both_directions() {
        let mut graph = line_graph();
        graph.remove_edge(10);
        assert!(graph.outgoing(1).all(|e| e.id.abs() != 10));
        assert!(graph.outgoing(2).all(|e| e.id.abs() != 10));
        assert_eq!(heads(&graph, 2), vec![3]);
    }

    #[test]
    fn test_remove_via_reverse_id_drops_pair() {
        let mut graph = line_graph();
        assert!(graph.remove_edge(-10));
        assert!(graph.edge(10).is_none());
        assert_eq!(graph.arc_count(), 1);
    }

    #[test]
    fn test_remove_oneway_edge() {
        let mut graph = line_graph();
        assert!(graph.remove_edge(20));
        assert_eq!(heads(&graph, 2), vec![1]);
        assert_eq!(graph.arc_count(), 2);
    }

    #[test]
    fn test_modify_edge_mirrors_onto_pair() {
        let mut graph = line_graph();
        let patch = EdgePatch {
            length: Some(7.5),
            road_type: Some("service".into()),
            ..Default::default()
        };
        assert!(graph.modify_edge(10, &patch));

        for id in [10, -10] {
            let edge = graph.edge(id).unwrap();
            assert_eq!(edge.length, 7.5);
            assert_eq!(edge.road_type, "service");
            assert_eq!(edge.average_time, 1.0);
        }
    }

    #[test]
    fn test_modify_unknown_edge_is_noop() {
        let mut graph = line_graph();
        let before = graph.stats();
        assert!(!graph.modify_edge(99, &EdgePatch { length: Some(2.0), ..Default::default() }));
        assert_eq!(graph.stats(), before);
    }

    #[test]
    fn test_modify_oneway_toggle_keeps_pairing() {
        let mut graph = line_graph();

        graph.modify_edge(10, &EdgePatch { oneway: Some(true), ..Default::default() });
        assert!(graph.edge(-10).is_none());
        assert_eq!(heads(&graph, 2), vec![3]);

        graph.modify_edge(20, &EdgePatch { oneway: Some(false), ..Default::default() });
        let back = graph.edge(-20).unwrap();
        assert!(back.reversed && !back.oneway);
        assert_eq!(heads(&graph, 3), vec![2]);

        // Removing the now two-way road drops both arcs
        assert!(graph.remove_edge(20));
        assert!(graph.edge(-20).is_none());
    }

    #[test]
    fn test_zero_id_road_keeps_both_arcs() {
        let nodes = vec![Node::new(1, 0.0, 0.0), Node::new(2, 0.0, 0.0)];
        let mut graph = Graph::build(nodes, vec![Edge::new(0, 1, 2, 1.0, 1.0)]);
        assert_eq!(graph.arc_count(), 2);
        assert!(graph.remove_edge(0));
        assert_eq!(graph.arc_count(), 0);
    }

    #[test]
    fn test_snap_to_node() {
        let graph = line_graph();
        assert_eq!(graph.snap_to_node(Coord::new(0.0, 0.0021)), Some(2));
        assert!(Graph::new().snap_to_node(Coord::new(0.0, 0.0)).is_none());
    }

    #[test]
    fn test_arc_to_missing_node_is_stored() {
        let mut graph = line_graph();
        graph.add_edge(Edge::new(30, 3, 42, 1.0, 1.0).with_oneway(true));
        assert_eq!(heads(&graph, 3), vec![42]);
        assert!(!graph.contains_node(42));
    }
}
