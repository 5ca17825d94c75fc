//! Errors raised while answering a single query.
//!
//! None of these abort a replay: the dispatcher turns each one into a
//! `possible: false` or empty-neighbour record.

use thiserror::Error;

use crate::domain::NodeId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// A query referenced a node id missing from the graph.
    #[error("unknown node {0}")]
    UnknownNode(NodeId),
    /// Shortest-path mode other than `distance` or `time`.
    #[error("unknown route mode '{0}'")]
    UnknownMode(String),
    /// KNN metric other than `euclidean` or `shortest_path`.
    #[error("unknown knn metric '{0}'")]
    UnknownMetric(String),
    /// KNN query point could not be snapped because the graph has no nodes.
    #[error("no node to anchor the query")]
    NoAnchor,
    /// Search exhausted the reachable graph without settling the target.
    #[error("no route found")]
    NoRoute,
}
