//! Lookup service owning a lazily loaded subsection artifact.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use super::{Subsection, SubsectionIndex};
use crate::artifact;
use crate::error::EngineError;

/// Point-location service over a file-based subsection artifact.
///
/// The artifact is loaded on first use, not at construction, and stays in
/// memory for the lifetime of the service. [`LocateService::reload`] is the
/// only refresh trigger; there is no implicit global cache.
pub struct LocateService {
    path: PathBuf,
    index: Option<SubsectionIndex>,
}

impl LocateService {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            index: None,
        }
    }

    /// Load the artifact and build the index if not yet done.
    pub fn ensure_loaded(&mut self) -> Result<&SubsectionIndex> {
        if self.index.is_none() {
            info!("Loading subsection artifact from {}", self.path.display());
            let collection = artifact::read_feature_collection(&self.path)?;
            let subsections = collection
                .features
                .iter()
                .map(Subsection::from_geojson)
                .collect::<Result<Vec<_>, _>>()
                .context("Failed to parse subsection artifact")?;
            self.index = Some(SubsectionIndex::build(subsections)?);
        }
        // Just populated above when it was empty.
        Ok(self.index.as_ref().unwrap())
    }

    /// Drop the in-memory index and rebuild it from the artifact file.
    pub fn reload(&mut self) -> Result<&SubsectionIndex> {
        self.index = None;
        self.ensure_loaded()
    }

    /// Resolve a coordinate to its containing subsection, if any.
    pub fn locate(&mut self, lon: f64, lat: f64) -> Result<Option<Arc<Subsection>>> {
        let index = self.ensure_loaded()?;
        let hit = index.locate(lon, lat);
        debug!(
            "locate ({}, {}): {}",
            lon,
            lat,
            if hit.is_some() { "match" } else { "no match" }
        );
        Ok(hit)
    }

    /// Resolve a coordinate, treating a miss as [`EngineError::NotFound`].
    pub fn try_locate(&mut self, lon: f64, lat: f64) -> Result<Arc<Subsection>> {
        self.locate(lon, lat)?
            .ok_or_else(|| EngineError::NotFound.into())
    }
}
