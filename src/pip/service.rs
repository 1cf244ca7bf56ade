//! PIP service for looking up the zones containing a point.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::debug;

use super::{contains, ZoneSpatialIndex};
use crate::models::{Coordinate, QueryResult, Zone};

/// Outcome of a single point check
#[derive(Debug, Clone, Serialize)]
pub struct PointCheck {
    /// Matching zones in candidate order
    pub results: Vec<QueryResult>,
    /// Zones that passed the bounding-box pre-filter
    pub candidates: usize,
    /// Wall-clock cost of filter + containment
    pub elapsed: Duration,
}

/// Point-in-Polygon lookup service over one loaded zone set
pub struct PipService {
    index: ZoneSpatialIndex,
}

impl PipService {
    /// Create a new PIP service from a spatial index
    pub fn new(index: ZoneSpatialIndex) -> Self {
        Self { index }
    }

    pub fn from_zones(zones: Vec<Zone>) -> Self {
        Self::new(ZoneSpatialIndex::build(zones.into_iter().map(Arc::new)))
    }

    /// Narrow with the index, then run the exact ring test on each candidate
    pub fn check_point(&self, point: Coordinate) -> PointCheck {
        let start = Instant::now();

        let candidates = self.index.query(point);
        let results: Vec<QueryResult> = candidates
            .iter()
            .filter(|iz| contains(point, iz.zone.boundary()))
            .map(|iz| iz.zone.to_query_result())
            .collect();

        let elapsed = start.elapsed();
        debug!(
            "PIP lookup at {}: {} candidates, {} matches in {:?}",
            point,
            candidates.len(),
            results.len(),
            elapsed
        );

        PointCheck {
            results,
            candidates: candidates.len(),
            elapsed,
        }
    }

    pub fn zone_count(&self) -> usize {
        self.index.count()
    }

    /// Get the spatial index (for stats/debugging)
    pub fn index(&self) -> &ZoneSpatialIndex {
        &self.index
    }
}
