//! Zone and coordinate value types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Attribute key reserved for a zone's free-text description.
pub const DESCRIPTION_KEY: &str = "description";

/// Rings with fewer vertices than this never report containment.
pub const MIN_RING_VERTICES: usize = 4;

/// Geographic point in degrees (lat/lng)
///
/// No normalization or range validation is applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.lat, self.lng)
    }
}

impl From<Coordinate> for geo::Coord<f64> {
    fn from(c: Coordinate) -> Self {
        geo::Coord { x: c.lng, y: c.lat }
    }
}

impl From<geo::Coord<f64>> for Coordinate {
    fn from(c: geo::Coord<f64>) -> Self {
        Coordinate::new(c.y, c.x)
    }
}

/// A named polygonal zone parsed from a boundary document.
///
/// Zones are immutable once built; reloading a document produces a new set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Zone {
    name: String,
    attributes: BTreeMap<String, String>,
    boundary: Vec<Coordinate>,
}

impl Zone {
    pub fn new(
        name: impl Into<String>,
        attributes: BTreeMap<String, String>,
        boundary: Vec<Coordinate>,
    ) -> Self {
        Self {
            name: name.into(),
            attributes,
            boundary,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    /// Ordered boundary ring. Closure (first == last) is not guaranteed.
    pub fn boundary(&self) -> &[Coordinate] {
        &self.boundary
    }

    pub fn description(&self) -> Option<&str> {
        self.attributes.get(DESCRIPTION_KEY).map(String::as_str)
    }

    /// True when the ring is too short to ever contain a point
    pub fn is_degenerate(&self) -> bool {
        self.boundary.len() < MIN_RING_VERTICES
    }

    /// Project to the caller-visible result (no boundary data)
    pub fn to_query_result(&self) -> QueryResult {
        QueryResult {
            zone_name: self.name.clone(),
            attributes: self.attributes.clone(),
        }
    }
}

/// A matching zone as returned to callers of a point query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResult {
    pub zone_name: String,
    pub attributes: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geo_coord_swaps_axes() {
        let c = Coordinate::new(37.77, -122.42);
        let g: geo::Coord<f64> = c.into();
        assert_eq!(g.x, -122.42);
        assert_eq!(g.y, 37.77);
        assert_eq!(Coordinate::from(g), c);
    }

    #[test]
    fn test_description_lookup() {
        let mut attrs = BTreeMap::new();
        attrs.insert(DESCRIPTION_KEY.to_string(), "Downtown".to_string());
        let zone = Zone::new("A", attrs, vec![]);
        assert_eq!(zone.description(), Some("Downtown"));
        assert!(zone.is_degenerate());
    }

    #[test]
    fn test_query_result_drops_boundary() {
        let mut attrs = BTreeMap::new();
        attrs.insert("k".to_string(), "v".to_string());
        let zone = Zone::new("A", attrs.clone(), vec![Coordinate::new(0.0, 0.0); 4]);
        let result = zone.to_query_result();
        assert_eq!(result.zone_name, "A");
        assert_eq!(result.attributes, attrs);
    }
}
