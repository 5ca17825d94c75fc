//! Domain model for the road network.
//!
//! # Overview
//!
//! - [`Coord`]: a latitude/longitude point with haversine and planar distance
//! - [`Node`]: an intersection carrying point-of-interest tags
//! - [`Edge`]: a directed arc; a two-way road is stored as two paired arcs
//! - [`EdgePatch`]: a partial update applied by `modify_edge`
//!
//! Edge identity is the signed edge id. A synthesized reverse arc carries the
//! negated id and `reversed = true`, so arcs are keyed by [`ArcKey`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Node identifier, assigned externally.
pub type NodeId = i64;

/// Signed edge identifier. Reverse arcs use the negation of the road's id.
pub type EdgeId = i64;

/// Number of 15-minute slots in a per-edge speed profile.
pub const SPEED_PROFILE_SLOTS: usize = 96;

/// Earth radius in meters for haversine calculation.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A geographic point in degrees.
///
/// # Examples
///
/// ```
/// use road_network::domain::Coord;
///
/// let a = Coord::new(0.0, 0.0);
/// let b = Coord::new(0.0, 1.0);
///
/// // 1 degree of longitude at the equator is about 111 km
/// let dist = a.haversine_m(&b);
/// assert!(dist > 110_000.0 && dist < 112_000.0);
///
/// // Planar distance treats degrees as Cartesian units
/// assert_eq!(a.planar(&b), 1.0);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Coord {
    /// Latitude in degrees (-90 to 90).
    pub lat: f64,
    /// Longitude in degrees (-180 to 180).
    pub lon: f64,
}

impl Coord {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Great-circle distance in meters using the haversine formula.
    pub fn haversine_m(&self, other: &Coord) -> f64 {
        if self.lat == other.lat && self.lon == other.lon {
            return 0.0;
        }

        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let dlat = lat2 - lat1;
        let dlon = (other.lon - self.lon).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().asin();

        EARTH_RADIUS_M * c
    }

    /// Straight-line distance with latitude and longitude treated as
    /// Cartesian coordinates.
    pub fn planar(&self, other: &Coord) -> f64 {
        (self.lat - other.lat).hypot(self.lon - other.lon)
    }
}

/// A road network intersection.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub coord: Coord,
    /// Point-of-interest tags. Only membership matters.
    pub pois: BTreeSet<String>,
}

impl Node {
    pub fn new(id: NodeId, lat: f64, lon: f64) -> Self {
        Self {
            id,
            coord: Coord::new(lat, lon),
            pois: BTreeSet::new(),
        }
    }

    /// Adds a point-of-interest tag.
    pub fn with_poi(mut self, poi: impl Into<String>) -> Self {
        self.pois.insert(poi.into());
        self
    }

    pub fn has_poi(&self, poi: &str) -> bool {
        self.pois.contains(poi)
    }
}

/// Storage key of a directed arc.
///
/// The forward arc of road `7` is `(7, false)`, its synthesized reverse is
/// `(-7, true)`. Road `0` therefore still maps to two distinct arcs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArcKey {
    pub id: EdgeId,
    pub reversed: bool,
}

impl ArcKey {
    /// Key of the arc travelling the same road in the opposite direction.
    pub fn paired(self) -> Self {
        Self {
            id: -self.id,
            reversed: !self.reversed,
        }
    }
}

/// A directed arc of the road network.
///
/// # Examples
///
/// ```
/// use road_network::domain::Edge;
///
/// let road = Edge::new(7, 1, 2, 120.0, 10.0).with_road_type("primary");
/// let back = road.reverse();
///
/// assert_eq!(back.id, -7);
/// assert_eq!((back.u, back.v), (2, 1));
/// assert!(back.reversed);
/// assert_eq!(back.road_type, "primary");
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Edge {
    pub id: EdgeId,
    /// Tail node.
    pub u: NodeId,
    /// Head node.
    pub v: NodeId,
    pub length: f64,
    pub average_time: f64,
    pub oneway: bool,
    pub road_type: String,
    /// Per-slot speed samples. Stored for later time-dependent routing.
    pub speed_profile: Vec<f64>,
    /// True for arcs synthesized as the reverse of a two-way road.
    pub reversed: bool,
}

impl Edge {
    /// Creates a two-way edge with a uniform speed profile.
    pub fn new(id: EdgeId, u: NodeId, v: NodeId, length: f64, average_time: f64) -> Self {
        Self {
            id,
            u,
            v,
            length,
            average_time,
            oneway: false,
            road_type: String::new(),
            speed_profile: uniform_speed_profile(length, average_time),
            reversed: false,
        }
    }

    pub fn with_oneway(mut self, oneway: bool) -> Self {
        self.oneway = oneway;
        self
    }

    pub fn with_road_type(mut self, road_type: impl Into<String>) -> Self {
        self.road_type = road_type.into();
        self
    }

    pub fn with_speed_profile(mut self, speed_profile: Vec<f64>) -> Self {
        self.speed_profile = speed_profile;
        self
    }

    pub fn key(&self) -> ArcKey {
        ArcKey {
            id: self.id,
            reversed: self.reversed,
        }
    }

    /// Builds the opposite-direction arc: negated id, swapped endpoints,
    /// toggled `reversed` flag.
    pub fn reverse(&self) -> Edge {
        Edge {
            id: -self.id,
            u: self.v,
            v: self.u,
            reversed: !self.reversed,
            ..self.clone()
        }
    }

    /// Applies the fields present in `patch`.
    pub fn apply(&mut self, patch: &EdgePatch) {
        if let Some(length) = patch.length {
            self.length = length;
        }
        if let Some(average_time) = patch.average_time {
            self.average_time = average_time;
        }
        if let Some(oneway) = patch.oneway {
            self.oneway = oneway;
        }
        if let Some(ref road_type) = patch.road_type {
            self.road_type = road_type.clone();
        }
        if let Some(ref speed_profile) = patch.speed_profile {
            self.speed_profile = speed_profile.clone();
        }
    }
}

/// Partial edge update. Absent fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EdgePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oneway: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub road_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed_profile: Option<Vec<f64>>,
}

impl EdgePatch {
    pub fn is_empty(&self) -> bool {
        *self == EdgePatch::default()
    }
}

/// Speed profile used when an edge arrives without one: every slot holds
/// `length / average_time`.
///
/// ```
/// use road_network::domain::{uniform_speed_profile, SPEED_PROFILE_SLOTS};
///
/// let profile = uniform_speed_profile(100.0, 20.0);
/// assert_eq!(profile.len(), SPEED_PROFILE_SLOTS);
/// assert!(profile.iter().all(|&s| s == 5.0));
/// ```
pub fn uniform_speed_profile(length: f64, average_time: f64) -> Vec<f64> {
    vec![length / average_time; SPEED_PROFILE_SLOTS]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reverse_twice_restores_arc() {
        let edge = Edge::new(3, 10, 20, 5.0, 2.0).with_road_type("residential");
        assert_eq!(edge.reverse().reverse(), edge);
    }

    #[test]
    fn test_zero_id_keys_are_distinct() {
        let edge = Edge::new(0, 1, 2, 1.0, 1.0);
        assert_ne!(edge.key(), edge.reverse().key());
        assert_eq!(edge.key().paired(), edge.reverse().key());
    }

    #[test]
    fn test_apply_patch_only_touches_present_fields() {
        let mut edge = Edge::new(1, 1, 2, 10.0, 4.0).with_road_type("primary");
        edge.apply(&EdgePatch {
            average_time: Some(8.0),
            ..Default::default()
        });
        assert_eq!(edge.length, 10.0);
        assert_eq!(edge.average_time, 8.0);
        assert_eq!(edge.road_type, "primary");
        assert!(!edge.oneway);
    }

    #[test]
    fn test_haversine_distance() {
        // Philadelphia City Hall to Liberty Bell
        let dist = Coord::new(39.9526, -75.1635).haversine_m(&Coord::new(39.9496, -75.1503));
        assert!((dist - 1200.0).abs() < 100.0);
    }

    #[test]
    fn test_node_poi_membership() {
        let node = Node::new(1, 0.0, 0.0).with_poi("cafe").with_poi("cafe");
        assert!(node.has_poi("cafe"));
        assert!(!node.has_poi("fuel"));
        assert_eq!(node.pois.len(), 1);
    }
}
