//! Point-in-polygon (PIP) subsection lookup.
//!
//! Resolves a GPS coordinate to the administrative subsection polygon that
//! contains it, using an R-tree envelope pre-filter followed by an exact
//! containment test.

mod index;
mod service;

use geo::MultiPolygon;
use geojson::JsonObject;

use crate::error::EngineError;
use crate::models::feature::geometry_from_geojson;

pub use index::SubsectionIndex;
pub use service::LocateService;

/// A single subsection polygon with its original property bag.
#[derive(Debug, Clone)]
pub struct Subsection {
    /// Properties carried through verbatim from the source feature.
    pub properties: JsonObject,
    pub geometry: MultiPolygon<f64>,
}

impl Subsection {
    /// Parse one feature of a subsection artifact.
    pub fn from_geojson(feature: &geojson::Feature) -> Result<Self, EngineError> {
        let properties = feature.properties.clone().unwrap_or_default();
        let ident = properties
            .iter()
            .find_map(|(_, v)| v.as_str())
            .unwrap_or("<unnamed>");
        let geometry = geometry_from_geojson(feature, ident)?;
        Ok(Self {
            properties,
            geometry,
        })
    }

    /// Rebuild the GeoJSON feature for query responses.
    pub fn to_geojson(&self) -> geojson::Feature {
        geojson::Feature {
            bbox: None,
            geometry: Some(geojson::Geometry::new(geojson::Value::from(&self.geometry))),
            id: None,
            properties: Some(self.properties.clone()),
            foreign_members: None,
        }
    }
}
