//! Input and output documents.
//!
//! `graph.json` and `queries.json` are decoded with serde and checked for
//! structural problems before any event runs. A structural error rejects the
//! whole document; the core never sees a partially valid graph.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::{uniform_speed_profile, Edge, EdgeId, EdgePatch, Node, NodeId, SPEED_PROFILE_SLOTS};
use crate::events::{QueryEvent, TimedResult};
use crate::graph::Graph;

/// Error raised while loading or validating a document.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid {context}: {reason}")]
    Invalid { context: String, reason: String },
}

impl DocumentError {
    fn invalid(context: impl Into<String>, reason: impl Into<String>) -> Self {
        DocumentError::Invalid {
            context: context.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GraphMeta {
    pub id: String,
    /// Declared node count; must match `nodes.len()`.
    pub nodes: usize,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeRecord {
    pub id: NodeId,
    pub lat: f64,
    pub lon: f64,
    pub pois: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EdgeRecord {
    pub id: EdgeId,
    pub u: NodeId,
    pub v: NodeId,
    pub length: f64,
    pub average_time: f64,
    pub oneway: bool,
    pub road_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed_profile: Option<Vec<f64>>,
}

impl From<NodeRecord> for Node {
    fn from(record: NodeRecord) -> Self {
        Node {
            id: record.id,
            coord: crate::domain::Coord::new(record.lat, record.lon),
            pois: record.pois.into_iter().collect(),
        }
    }
}

impl From<EdgeRecord> for Edge {
    fn from(record: EdgeRecord) -> Self {
        let speed_profile = record
            .speed_profile
            .unwrap_or_else(|| uniform_speed_profile(record.length, record.average_time));
        Edge::new(record.id, record.u, record.v, record.length, record.average_time)
            .with_oneway(record.oneway)
            .with_road_type(record.road_type)
            .with_speed_profile(speed_profile)
    }
}

/// Contents of `graph.json`.
///
/// # Examples
///
/// ```
/// use road_network::document::GraphDocument;
///
/// let doc = GraphDocument::from_json_str(r#"{
///     "meta": {"id": "tiny", "nodes": 2, "description": "two nodes"},
///     "nodes": [
///         {"id": 1, "lat": 0.0, "lon": 0.0, "pois": []},
///         {"id": 2, "lat": 0.0, "lon": 0.001, "pois": ["cafe"]}
///     ],
///     "edges": [
///         {"id": 1, "u": 1, "v": 2, "length": 111.0, "average_time": 10.0,
///          "oneway": false, "road_type": "residential"}
///     ]
/// }"#).unwrap();
///
/// let graph = doc.into_graph();
/// assert_eq!(graph.arc_count(), 2);
/// assert_eq!(graph.edge(1).unwrap().speed_profile[0], 11.1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GraphDocument {
    pub meta: GraphMeta,
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<EdgeRecord>,
}

impl GraphDocument {
    /// Parses and validates a graph document.
    pub fn from_json_str(json: &str) -> Result<Self, DocumentError> {
        let doc: GraphDocument = serde_json::from_str(json)?;
        doc.validate()?;
        Ok(doc)
    }

    /// Reads, parses and validates a graph document from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let path = path.as_ref();
        let doc = Self::from_json_str(&read_to_string(path)?)?;
        info!(
            "Loaded graph '{}' from {:?}: {} nodes, {} edges",
            doc.meta.id,
            path,
            doc.nodes.len(),
            doc.edges.len()
        );
        Ok(doc)
    }

    /// Structural checks the serde schema cannot express.
    pub fn validate(&self) -> Result<(), DocumentError> {
        if self.meta.nodes != self.nodes.len() {
            return Err(DocumentError::invalid(
                "meta",
                format!(
                    "declares {} nodes but {} are listed",
                    self.meta.nodes,
                    self.nodes.len()
                ),
            ));
        }

        let mut node_ids = HashSet::with_capacity(self.nodes.len());
        for node in &self.nodes {
            let context = format!("node {}", node.id);
            if !node_ids.insert(node.id) {
                return Err(DocumentError::invalid(context, "duplicate id"));
            }
            if !node.lat.is_finite() || !node.lon.is_finite() {
                return Err(DocumentError::invalid(context, "coordinates must be finite"));
            }
        }

        let mut edge_ids = HashSet::with_capacity(self.edges.len());
        for edge in &self.edges {
            let context = format!("edge {}", edge.id);
            if !edge_ids.insert(edge.id) {
                return Err(DocumentError::invalid(context, "duplicate id"));
            }
            check_positive(&context, "length", edge.length)?;
            check_positive(&context, "average_time", edge.average_time)?;
            if let Some(ref profile) = edge.speed_profile {
                check_speed_profile(&context, profile)?;
            }
            if !node_ids.contains(&edge.u) || !node_ids.contains(&edge.v) {
                warn!("{} references a missing node and will not be traversable", context);
            }
        }
        Ok(())
    }

    /// Builds the in-memory graph. Missing speed profiles become uniform.
    pub fn into_graph(self) -> Graph {
        Graph::build(
            self.nodes.into_iter().map(Node::from),
            self.edges.into_iter().map(Edge::from),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueriesMeta {
    pub id: String,
}

/// Contents of `queries.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueriesDocument {
    pub meta: QueriesMeta,
    pub events: Vec<QueryEvent>,
}

impl QueriesDocument {
    pub fn from_json_str(json: &str) -> Result<Self, DocumentError> {
        let doc: QueriesDocument = serde_json::from_str(json)?;
        doc.validate()?;
        Ok(doc)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let path = path.as_ref();
        let doc = Self::from_json_str(&read_to_string(path)?)?;
        info!(
            "Loaded {} events '{}' from {:?}",
            doc.events.len(),
            doc.meta.id,
            path
        );
        Ok(doc)
    }

    /// Rejects patches with out-of-range values. Unknown ids, modes and
    /// metrics are answered per event and are not structural errors.
    pub fn validate(&self) -> Result<(), DocumentError> {
        for (index, event) in self.events.iter().enumerate() {
            if let QueryEvent::ModifyEdge { edge_id, patch } = event {
                check_patch(&format!("event {} (modify_edge {})", index, edge_id), patch)?;
            }
        }
        Ok(())
    }
}

/// Document written after a replay.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputDocument {
    pub meta: QueriesMeta,
    pub results: Vec<TimedResult>,
}

impl OutputDocument {
    pub fn to_json(&self, pretty: bool) -> Result<String, DocumentError> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }

    pub fn write(&self, path: impl AsRef<Path>, pretty: bool) -> Result<(), DocumentError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json(pretty)?).map_err(|source| DocumentError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn read_to_string(path: &Path) -> Result<String, DocumentError> {
    std::fs::read_to_string(path).map_err(|source| DocumentError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn check_positive(context: &str, field: &str, value: f64) -> Result<(), DocumentError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(DocumentError::invalid(
            context,
            format!("{} must be a positive number, got {}", field, value),
        ))
    }
}

fn check_speed_profile(context: &str, profile: &[f64]) -> Result<(), DocumentError> {
    if profile.len() != SPEED_PROFILE_SLOTS {
        return Err(DocumentError::invalid(
            context,
            format!(
                "speed_profile must have {} values, got {}",
                SPEED_PROFILE_SLOTS,
                profile.len()
            ),
        ));
    }
    profile
        .iter()
        .try_for_each(|&speed| check_positive(context, "speed_profile value", speed))
}

fn check_patch(context: &str, patch: &EdgePatch) -> Result<(), DocumentError> {
    if let Some(length) = patch.length {
        check_positive(context, "length", length)?;
    }
    if let Some(average_time) = patch.average_time {
        check_positive(context, "average_time", average_time)?;
    }
    if let Some(ref profile) = patch.speed_profile {
        check_speed_profile(context, profile)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn graph_json() -> serde_json::Value {
        json!({
            "meta": {"id": "square", "nodes": 4, "description": "unit square"},
            "nodes": [
                {"id": 1, "lat": 0.0, "lon": 0.0, "pois": ["cafe"]},
                {"id": 2, "lat": 0.0, "lon": 0.0, "pois": []},
                {"id": 3, "lat": 0.0, "lon": 0.0, "pois": ["cafe", "cafe"]},
                {"id": 4, "lat": 0.0, "lon": 0.0, "pois": []}
            ],
            "edges": [
                {"id": 1, "u": 1, "v": 2, "length": 1.0, "average_time": 2.0, "oneway": false, "road_type": "primary"},
                {"id": 2, "u": 2, "v": 3, "length": 1.0, "average_time": 2.0, "oneway": true, "road_type": "primary",
                 "speed_profile": vec![0.5; 96]},
                {"id": 3, "u": 3, "v": 4, "length": 1.0, "average_time": 2.0, "oneway": false, "road_type": "residential"},
                {"id": 4, "u": 4, "v": 1, "length": 1.0, "average_time": 2.0, "oneway": false, "road_type": "residential"}
            ]
        })
    }

    fn parse_graph(value: serde_json::Value) -> Result<GraphDocument, DocumentError> {
        GraphDocument::from_json_str(&value.to_string())
    }

    #[test]
    fn test_valid_graph_document() {
        let graph = parse_graph(graph_json()).unwrap().into_graph();
        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.arc_count(), 7);
        assert_eq!(graph.node(3).unwrap().pois.len(), 1);
        assert_eq!(graph.edge(2).unwrap().speed_profile, vec![0.5; 96]);
        assert_eq!(graph.edge(1).unwrap().speed_profile, vec![0.5; 96]);
    }

    #[test]
    fn test_rejects_unknown_fields() {
        let mut value = graph_json();
        value["nodes"][0]["elevation"] = json!(12.0);
        assert!(matches!(parse_graph(value), Err(DocumentError::Json(_))));
    }

    #[test]
    fn test_rejects_meta_mismatch() {
        let mut value = graph_json();
        value["meta"]["nodes"] = json!(5);
        assert!(matches!(parse_graph(value), Err(DocumentError::Invalid { .. })));
    }

    #[test]
    fn test_rejects_non_positive_length() {
        let mut value = graph_json();
        value["edges"][0]["length"] = json!(0.0);
        let err = parse_graph(value).unwrap_err();
        assert!(err.to_string().contains("edge 1"));
    }

    #[test]
    fn test_rejects_short_speed_profile() {
        let mut value = graph_json();
        value["edges"][1]["speed_profile"] = json!([1.0, 2.0]);
        assert!(matches!(parse_graph(value), Err(DocumentError::Invalid { .. })));
    }

    #[test]
    fn test_rejects_duplicate_node() {
        let mut value = graph_json();
        value["nodes"][1]["id"] = json!(1);
        assert!(matches!(parse_graph(value), Err(DocumentError::Invalid { .. })));
    }

    #[test]
    fn test_queries_document() {
        let doc = QueriesDocument::from_json_str(
            &json!({
                "meta": {"id": "q1"},
                "events": [
                    {"type": "remove_edge", "edge_id": 3},
                    {"type": "modify_edge", "edge_id": 1, "patch": {"oneway": true}},
                    {"type": "shortest_path", "id": 1, "source": 1, "target": 3, "mode": "time",
                     "constraints": {"forbidden_nodes": [2]}},
                    {"type": "knn", "id": 2, "poi_type": "cafe", "query_point": {"lat": 0.0, "lon": 0.0},
                     "k": 2, "metric": "euclidean"},
                    {"type": "wormhole"}
                ]
            })
            .to_string(),
        )
        .unwrap();
        assert_eq!(doc.events.len(), 5);
        assert!(doc.events[0].is_mutation());
        assert_eq!(doc.events[4], QueryEvent::Unknown);
    }

    #[test]
    fn test_rejects_bad_patch() {
        let result = QueriesDocument::from_json_str(
            &json!({
                "meta": {"id": "q"},
                "events": [{"type": "modify_edge", "edge_id": 1, "patch": {"average_time": -4.0}}]
            })
            .to_string(),
        );
        assert!(matches!(result, Err(DocumentError::Invalid { .. })));
    }

    #[test]
    fn test_load_missing_file() {
        let err = GraphDocument::load("/nonexistent/graph.json").unwrap_err();
        assert!(matches!(err, DocumentError::Io { .. }));
    }
}
