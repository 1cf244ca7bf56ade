//! Core geometry types for zone lookups.

pub mod bbox;
pub mod zone;

pub use bbox::BoundingBox;
pub use zone::{Coordinate, QueryResult, Zone, DESCRIPTION_KEY, MIN_RING_VERTICES};
