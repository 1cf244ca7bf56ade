//! Axis-aligned bounding boxes for zone rings.

use geo::{BoundingRect, LineString};
use serde::{Deserialize, Serialize};

use super::Coordinate;

/// Tight lat/lng envelope of a ring.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub min_lng: f64,
    pub max_lat: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    /// Box of an empty ring; contains nothing
    pub const EMPTY: BoundingBox = BoundingBox {
        min_lat: f64::INFINITY,
        min_lng: f64::INFINITY,
        max_lat: f64::NEG_INFINITY,
        max_lng: f64::NEG_INFINITY,
    };

    /// Compute the envelope of a ring's vertices
    pub fn from_ring(ring: &[Coordinate]) -> Self {
        let line: LineString<f64> = ring.iter().map(|c| geo::Coord::from(*c)).collect();
        match line.bounding_rect() {
            Some(rect) => Self {
                min_lat: rect.min().y,
                min_lng: rect.min().x,
                max_lat: rect.max().y,
                max_lng: rect.max().x,
            },
            None => Self::EMPTY,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.min_lat <= self.max_lat && self.min_lng <= self.max_lng)
    }

    /// Inclusive containment. NaN coordinates never match.
    pub fn contains(&self, point: Coordinate) -> bool {
        point.lat >= self.min_lat
            && point.lat <= self.max_lat
            && point.lng >= self.min_lng
            && point.lng <= self.max_lng
    }

    /// Corners in (lat, lng) order as used by the R-tree envelope
    pub fn corners(&self) -> ([f64; 2], [f64; 2]) {
        ([self.min_lat, self.min_lng], [self.max_lat, self.max_lng])
    }
}
