//! Boundary feature model and GeoJSON conversion.

use geo::MultiPolygon;
use geojson::JsonObject;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::models::AdminLevel;
use crate::normalize::normalize;

/// Geographic point (lat/lon)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lat, lon }
    }

    /// GeoJSON position ordering.
    pub fn to_lonlat(self) -> [f64; 2] {
        [self.lon, self.lat]
    }
}

/// Axis-aligned bounding box in lon/lat.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bbox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl Bbox {
    /// GeoJSON bbox member ordering: [west, south, east, north].
    pub fn to_array(self) -> [f64; 4] {
        [self.min_lon, self.min_lat, self.max_lon, self.max_lat]
    }

    /// Midpoint of the box.
    pub fn center(self) -> GeoPoint {
        GeoPoint::new(
            (self.min_lon + self.max_lon) / 2.0,
            (self.min_lat + self.max_lat) / 2.0,
        )
    }
}

/// The five canonical reference points derived for every aggregated polygon.
///
/// Recomputed whenever the polygon is rebuilt; never persisted independently
/// of the polygon that produced them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferencePoints {
    /// Midpoint of the axis-aligned bounding box.
    pub center: GeoPoint,
    /// Area-weighted centroid of the polygon interior.
    pub centroid: GeoPoint,
    /// Per-part area-weighted centroid (differs from `centroid` only for
    /// multi-part geometries with disjoint islands).
    pub center_of_mass: GeoPoint,
    /// Arithmetic mean of all vertex coordinates.
    pub center_mean: GeoPoint,
    /// Coordinate-wise geometric median of the vertex set.
    pub center_median: GeoPoint,
}

/// One administrative unit's polygon plus the properties the engine cares
/// about. Produced once per load or aggregation run, immutable thereafter.
#[derive(Debug, Clone)]
pub struct BoundaryFeature {
    /// Raw display name as found in the source data.
    pub name: String,
    /// Normalized identity key; two features are the same unit iff equal.
    pub norm: String,
    /// Parent municipality name, present on parish-level features.
    pub municipality: Option<String>,
    /// Parent district name, present on parish and municipality features.
    pub district: Option<String>,
    /// Total area in hectares ("Area_T_ha" in the source data).
    pub area_ha: f64,
    /// Statistical-effective area in hectares ("Area_EA_ha"), when present.
    pub area_ea_ha: Option<f64>,
    pub geometry: MultiPolygon<f64>,
}

impl BoundaryFeature {
    /// Parse a GeoJSON feature at the given hierarchy level.
    ///
    /// The unit name is taken from the level's property key ("Freguesia",
    /// "Concelho" or "Distrito"), falling back to a plain "name" property.
    pub fn from_geojson(
        feature: &geojson::Feature,
        level: AdminLevel,
    ) -> Result<Self, EngineError> {
        let props = feature.properties.as_ref().ok_or_else(|| {
            EngineError::invalid_parameter("parse_feature", "feature has no properties")
        })?;

        let name = prop_str(props, level.name_key())
            .or_else(|| prop_str(props, "name"))
            .ok_or_else(|| {
                EngineError::invalid_parameter(
                    "parse_feature",
                    format!("missing '{}' property", level.name_key()),
                )
            })?;

        let geometry = geometry_from_geojson(feature, &name)?;
        crate::geometry::validate("parse_feature", &geometry)?;

        let area_ha = prop_f64(props, "Area_T_ha").ok_or_else(|| {
            EngineError::invalid_parameter(
                "parse_feature",
                format!("feature '{}' has no 'Area_T_ha' property", name),
            )
        })?;

        Ok(Self {
            norm: normalize(&name),
            name,
            municipality: prop_str(props, AdminLevel::Municipality.name_key()),
            district: prop_str(props, AdminLevel::District.name_key()),
            area_ha,
            area_ea_ha: prop_f64(props, "Area_EA_ha"),
            geometry,
        })
    }

    /// Serialize back to a GeoJSON feature for artifact output.
    pub fn to_geojson(&self, level: AdminLevel) -> geojson::Feature {
        let mut props = JsonObject::new();
        props.insert(level.name_key().to_string(), self.name.clone().into());
        if let Some(m) = &self.municipality {
            props.insert(
                AdminLevel::Municipality.name_key().to_string(),
                m.clone().into(),
            );
        }
        if let Some(d) = &self.district {
            props.insert(
                AdminLevel::District.name_key().to_string(),
                d.clone().into(),
            );
        }
        props.insert("Area_T_ha".to_string(), self.area_ha.into());
        if let Some(ea) = self.area_ea_ha {
            props.insert("Area_EA_ha".to_string(), ea.into());
        }

        geojson::Feature {
            bbox: None,
            geometry: Some(geojson::Geometry::new(geojson::Value::from(&self.geometry))),
            id: None,
            properties: Some(props),
            foreign_members: None,
        }
    }
}

/// Extract a Polygon or MultiPolygon geometry from a GeoJSON feature.
pub fn geometry_from_geojson(
    feature: &geojson::Feature,
    ident: &str,
) -> Result<MultiPolygon<f64>, EngineError> {
    let geom = feature.geometry.as_ref().ok_or_else(|| {
        EngineError::invalid_geometry(
            "parse_feature",
            format!("feature '{}' has no geometry", ident),
        )
    })?;

    let converted: geo_types::Geometry<f64> = geom.value.clone().try_into().map_err(|e| {
        EngineError::invalid_geometry(
            "parse_feature",
            format!("feature '{}': {:?}", ident, e),
        )
    })?;

    match converted {
        geo_types::Geometry::Polygon(p) => Ok(MultiPolygon::new(vec![p])),
        geo_types::Geometry::MultiPolygon(mp) => Ok(mp),
        other => Err(EngineError::invalid_geometry(
            "parse_feature",
            format!(
                "feature '{}': expected Polygon or MultiPolygon, got {}",
                ident,
                geometry_kind(&other)
            ),
        )),
    }
}

fn geometry_kind(geom: &geo_types::Geometry<f64>) -> &'static str {
    match geom {
        geo_types::Geometry::Point(_) => "Point",
        geo_types::Geometry::Line(_) => "Line",
        geo_types::Geometry::LineString(_) => "LineString",
        geo_types::Geometry::Polygon(_) => "Polygon",
        geo_types::Geometry::MultiPoint(_) => "MultiPoint",
        geo_types::Geometry::MultiLineString(_) => "MultiLineString",
        geo_types::Geometry::MultiPolygon(_) => "MultiPolygon",
        geo_types::Geometry::GeometryCollection(_) => "GeometryCollection",
        geo_types::Geometry::Rect(_) => "Rect",
        geo_types::Geometry::Triangle(_) => "Triangle",
    }
}

fn prop_str(props: &JsonObject, key: &str) -> Option<String> {
    props.get(key).and_then(|v| v.as_str()).map(str::to_string)
}

fn prop_f64(props: &JsonObject, key: &str) -> Option<f64> {
    let value = props.get(key)?;
    // Source CSV joins occasionally leave numerics as strings.
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parish_json(name: &str) -> geojson::Feature {
        let value: serde_json::Value = json!({
            "type": "Feature",
            "properties": {
                "Freguesia": name,
                "Concelho": "Lagos",
                "Distrito": "Faro",
                "Area_T_ha": 1029.78,
                "Area_EA_ha": "1029.78"
            },
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]]]
            }
        });
        geojson::Feature::try_from(value).unwrap()
    }

    #[test]
    fn test_parse_parish_feature() {
        let feature = parish_json("Odiáxere");
        let parsed = BoundaryFeature::from_geojson(&feature, AdminLevel::Parish).unwrap();
        assert_eq!(parsed.name, "Odiáxere");
        assert_eq!(parsed.norm, "odiaxere");
        assert_eq!(parsed.municipality.as_deref(), Some("Lagos"));
        assert_eq!(parsed.district.as_deref(), Some("Faro"));
        assert!((parsed.area_ha - 1029.78).abs() < 1e-9);
        // String-typed numeric is still parsed
        assert_eq!(parsed.area_ea_ha, Some(1029.78));
        assert_eq!(parsed.geometry.0.len(), 1);
    }

    #[test]
    fn test_missing_name_rejected() {
        let value: serde_json::Value = json!({
            "type": "Feature",
            "properties": { "Area_T_ha": 1.0 },
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]
            }
        });
        let feature = geojson::Feature::try_from(value).unwrap();
        let err = BoundaryFeature::from_geojson(&feature, AdminLevel::Parish).unwrap_err();
        assert!(matches!(err, EngineError::InvalidParameter { .. }));
    }

    #[test]
    fn test_non_polygon_geometry_rejected() {
        let value: serde_json::Value = json!({
            "type": "Feature",
            "properties": { "Freguesia": "X", "Area_T_ha": 1.0 },
            "geometry": { "type": "Point", "coordinates": [1.0, 2.0] }
        });
        let feature = geojson::Feature::try_from(value).unwrap();
        let err = BoundaryFeature::from_geojson(&feature, AdminLevel::Parish).unwrap_err();
        assert!(matches!(err, EngineError::InvalidGeometry { .. }));
    }

    #[test]
    fn test_geojson_round_trip() {
        let feature = parish_json("Odiáxere");
        let parsed = BoundaryFeature::from_geojson(&feature, AdminLevel::Parish).unwrap();
        let out = parsed.to_geojson(AdminLevel::Parish);
        let reparsed = BoundaryFeature::from_geojson(&out, AdminLevel::Parish).unwrap();
        assert_eq!(reparsed.name, parsed.name);
        assert_eq!(reparsed.geometry, parsed.geometry);
    }
}
