//! Point-in-Polygon (PIP) zone lookup.
//!
//! An R-tree over zone bounding boxes narrows the candidates, then an
//! even-odd ring test decides containment.

mod index;
mod ring;
mod service;

pub use index::{IndexedZone, ZoneSpatialIndex};
pub use ring::contains;
pub use service::{PipService, PointCheck};
