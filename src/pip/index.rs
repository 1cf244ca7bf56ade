//! Spatial index for fast zone candidate lookups.

use rstar::{RTree, RTreeObject, AABB};
use std::sync::Arc;
use tracing::info;

use crate::models::{BoundingBox, Coordinate, Zone};

/// A zone with its precomputed bounding box
#[derive(Debug, Clone)]
pub struct IndexedZone {
    pub zone: Arc<Zone>,
    pub bbox: BoundingBox,
}

impl IndexedZone {
    pub fn new(zone: Arc<Zone>) -> Self {
        let bbox = BoundingBox::from_ring(zone.boundary());
        Self { zone, bbox }
    }
}

/// R-tree entry pointing back at the insertion-ordered zone list
#[derive(Debug, Clone)]
struct ZoneEnvelope {
    seq: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for ZoneEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

impl ZoneEnvelope {
    /// Empty boxes are never stored in the tree
    fn new(seq: usize, bbox: &BoundingBox) -> Option<Self> {
        if bbox.is_empty() {
            return None;
        }
        let (min, max) = bbox.corners();
        Some(Self {
            seq,
            envelope: AABB::from_corners(min, max),
        })
    }
}

/// Bounding-box pre-filter over zones.
///
/// `query` is conservative: every zone whose ring contains the point is
/// returned, plus any other zone whose box does.
#[derive(Default)]
pub struct ZoneSpatialIndex {
    zones: Vec<IndexedZone>,
    tree: RTree<ZoneEnvelope>,
}

impl ZoneSpatialIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build spatial index from zones
    pub fn build(zones: impl IntoIterator<Item = Arc<Zone>>) -> Self {
        let zones: Vec<IndexedZone> = zones.into_iter().map(IndexedZone::new).collect();
        info!("Building spatial index for {} zones...", zones.len());

        let envelopes: Vec<ZoneEnvelope> = zones
            .iter()
            .enumerate()
            .filter_map(|(seq, iz)| ZoneEnvelope::new(seq, &iz.bbox))
            .collect();
        let tree = RTree::bulk_load(envelopes);

        info!(
            "Spatial index built with {} entries ({} with empty boundaries)",
            zones.len(),
            zones.len() - tree.size()
        );

        Self { zones, tree }
    }

    pub fn insert(&mut self, zone: Arc<Zone>) {
        let indexed = IndexedZone::new(zone);
        if let Some(envelope) = ZoneEnvelope::new(self.zones.len(), &indexed.bbox) {
            self.tree.insert(envelope);
        }
        self.zones.push(indexed);
    }

    /// Zones whose bounding box contains the point, in insertion order
    pub fn query(&self, point: Coordinate) -> Vec<&IndexedZone> {
        if !point.is_finite() {
            return Vec::new();
        }

        let query_envelope = AABB::from_point([point.lat, point.lng]);
        let mut hits: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&query_envelope)
            .map(|entry| entry.seq)
            .collect();
        hits.sort_unstable();

        hits.into_iter().map(|seq| &self.zones[seq]).collect()
    }

    /// Get total number of indexed zones
    pub fn count(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// Iterate over all indexed zones in insertion order
    pub fn zones(&self) -> impl Iterator<Item = &IndexedZone> {
        self.zones.iter()
    }
}
