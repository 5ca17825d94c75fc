//! Road Network
//!
//! A mutable road network that answers shortest-path and nearest-POI
//! queries interleaved with edge removals and modifications.
//!
//! # Domain Model
//!
//! - [`Node`](domain::Node): intersection with coordinates and POI tags
//! - [`Edge`](domain::Edge): directed arc; two-way roads are paired arcs
//! - [`Graph`](graph::Graph): node and arc store with an adjacency index
//!
//! # Queries
//!
//! - **Shortest path**: A* by distance or time, with forbidden nodes and road types
//! - **KNN**: nearest POI nodes by planar distance or network distance
//! - **Replay**: ordered event stream where each mutation is seen by later events only

pub mod api;
pub mod config;
pub mod console;
pub mod demo_data;
pub mod document;
pub mod domain;
pub mod error;
pub mod events;
pub mod graph;
pub mod proximity;
pub mod routing;
