//! Spatial index for subsection lookups.

use std::sync::Arc;

use geo::{BoundingRect, Contains, Point};
use rstar::{RTree, RTreeObject, AABB};
use tracing::info;

use super::Subsection;
use crate::error::EngineError;

/// Wrapper for R-tree indexing of subsections.
///
/// `slot` records the position in the input ordering; when overlapping
/// subsections both contain a query point, the lowest slot wins.
#[derive(Clone)]
struct IndexedSubsection {
    subsection: Arc<Subsection>,
    envelope: AABB<[f64; 2]>,
    slot: usize,
}

impl RTreeObject for IndexedSubsection {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Immutable R-tree index over a subsection artifact.
///
/// Built once per artifact load; a data refresh requires a fresh build.
pub struct SubsectionIndex {
    tree: RTree<IndexedSubsection>,
}

impl SubsectionIndex {
    /// Build the index from subsections in artifact order.
    pub fn build(subsections: Vec<Subsection>) -> Result<Self, EngineError> {
        info!("Building spatial index for {} subsections...", subsections.len());

        let mut indexed = Vec::with_capacity(subsections.len());
        for (slot, subsection) in subsections.into_iter().enumerate() {
            crate::geometry::validate("build_index", &subsection.geometry)?;
            let rect = subsection.geometry.bounding_rect().ok_or_else(|| {
                EngineError::invalid_geometry("build_index", "subsection has no extent")
            })?;
            indexed.push(IndexedSubsection {
                subsection: Arc::new(subsection),
                envelope: AABB::from_corners(
                    [rect.min().x, rect.min().y],
                    [rect.max().x, rect.max().y],
                ),
                slot,
            });
        }

        let tree = RTree::bulk_load(indexed);
        info!("Spatial index built with {} entries", tree.size());

        Ok(Self { tree })
    }

    /// Find the subsection containing a point, or `None`.
    ///
    /// Envelope intersection narrows the candidates, then an exact
    /// hole-aware containment test decides. With overlapping source data the
    /// feature earliest in the input ordering is returned.
    pub fn locate(&self, lon: f64, lat: f64) -> Option<Arc<Subsection>> {
        let point = Point::new(lon, lat);
        let query_envelope = AABB::from_point([lon, lat]);

        self.tree
            .locate_in_envelope_intersecting(&query_envelope)
            .filter(|entry| entry.subsection.geometry.contains(&point))
            .min_by_key(|entry| entry.slot)
            .map(|entry| Arc::clone(&entry.subsection))
    }

    /// Total number of indexed subsections.
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}
