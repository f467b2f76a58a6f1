//! Hierarchical polygon aggregation.
//!
//! Merges the polygons of sibling administrative units (parishes of one
//! municipality, municipalities of one district) into a single possibly
//! multi-part polygon, and derives the canonical reference points and
//! bounding box on the final merged geometry.

use std::collections::BTreeMap;

use geo::MultiPolygon;
use tracing::warn;

use crate::error::EngineError;
use crate::geometry::{self, GeoOps, GeometryOps};
use crate::models::{Bbox, BoundaryFeature, ReferencePoints};
use crate::normalize::normalize;

/// Result of one aggregation run: the merged geometry plus everything
/// derived from it. The property bag of the parent unit is built from these
/// fields only; no per-child metadata survives the merge.
#[derive(Debug, Clone)]
pub struct AggregatedBoundary {
    pub geometry: MultiPolygon<f64>,
    /// Sum of the children's total areas (hectares).
    pub area_ha: f64,
    /// Sum of the children's statistical-effective areas, kept in its own
    /// accumulator. Present when at least one child carried the field.
    pub area_ea_ha: Option<f64>,
    pub bbox: Bbox,
    pub reference: ReferencePoints,
}

/// Aggregate sibling units with the default `geo`-backed operations.
pub fn aggregate(children: &[BoundaryFeature]) -> Result<AggregatedBoundary, EngineError> {
    aggregate_with(&GeoOps, children)
}

/// Aggregate sibling units into one parent boundary.
///
/// Folds the children with a binary polygon union, then computes the
/// reference points once on the final geometry. The two source area fields
/// are summed into two distinct accumulators; they are never merged into a
/// single figure. Pure: no side effects beyond the returned value.
pub fn aggregate_with<B: GeometryOps>(
    ops: &B,
    children: &[BoundaryFeature],
) -> Result<AggregatedBoundary, EngineError> {
    let mut iter = children.iter();
    let first = iter
        .next()
        .ok_or_else(|| EngineError::invalid_geometry("aggregate", "empty input sequence"))?;

    geometry::validate("aggregate", &first.geometry)?;

    let mut merged = first.geometry.clone();
    let mut area_ha = first.area_ha;
    let mut area_ea_ha = first.area_ea_ha.unwrap_or(0.0);
    let mut ea_present = first.area_ea_ha.is_some();

    for child in iter {
        geometry::validate("aggregate", &child.geometry)?;
        merged = ops.union(&merged, &child.geometry);
        area_ha += child.area_ha;
        if let Some(ea) = child.area_ea_ha {
            area_ea_ha += ea;
            ea_present = true;
        }
    }

    let bbox = ops.bounding_box(&merged)?;
    let reference = ReferencePoints {
        center: bbox.center(),
        centroid: ops.centroid(&merged)?,
        center_of_mass: ops.center_of_mass(&merged)?,
        center_mean: ops.mean_center(&merged)?,
        center_median: ops.median_center(&merged)?,
    };

    Ok(AggregatedBoundary {
        geometry: merged,
        area_ha,
        area_ea_ha: ea_present.then_some(area_ea_ha),
        bbox,
        reference,
    })
}

impl AggregatedBoundary {
    /// Build the parent unit's GeoJSON feature. The property bag carries the
    /// computed outputs only.
    pub fn to_geojson(
        &self,
        name_key: &str,
        name: &str,
        district: Option<&str>,
    ) -> geojson::Feature {
        let mut props = geojson::JsonObject::new();
        props.insert(name_key.to_string(), name.into());
        if let Some(d) = district {
            props.insert("Distrito".to_string(), d.into());
        }
        props.insert("Area_T_ha".to_string(), self.area_ha.into());
        if let Some(ea) = self.area_ea_ha {
            props.insert("Area_EA_ha".to_string(), ea.into());
        }
        if let Ok(centros) = serde_json::to_value(self.reference) {
            props.insert("centros".to_string(), centros);
        }

        geojson::Feature {
            bbox: Some(self.bbox.to_array().to_vec()),
            geometry: Some(geojson::Geometry::new(geojson::Value::from(&self.geometry))),
            id: None,
            properties: Some(props),
            foreign_members: None,
        }
    }
}

/// One group of sibling units sharing a normalized parent name.
#[derive(Debug, Clone)]
pub struct ChildGroup {
    /// Raw parent name, first spelling seen in input order.
    pub name: String,
    /// District the group belongs to (municipality groups only).
    pub district: Option<String>,
    pub members: Vec<BoundaryFeature>,
}

/// Group features by normalized parent name, in deterministic key order.
///
/// Distinct raw spellings landing on the same key are the same unit by the
/// engine's identity rule; they are merged under the first spelling seen,
/// with a warning so data drift stays visible.
pub fn group_children<F>(
    features: Vec<BoundaryFeature>,
    parent_name: F,
) -> Result<BTreeMap<String, ChildGroup>, EngineError>
where
    F: Fn(&BoundaryFeature) -> Option<&str>,
{
    let mut groups: BTreeMap<String, ChildGroup> = BTreeMap::new();

    for feature in features {
        let parent = parent_name(&feature)
            .ok_or_else(|| {
                EngineError::invalid_parameter(
                    "group_children",
                    format!("feature '{}' has no parent unit name", feature.name),
                )
            })?
            .to_string();

        let key = normalize(&parent);
        match groups.get_mut(&key) {
            Some(group) => {
                if group.name != parent {
                    warn!(
                        "parent spellings '{}' and '{}' normalize to the same key '{}'",
                        group.name, parent, key
                    );
                }
                group.members.push(feature);
            }
            None => {
                let district = feature.district.clone();
                groups.insert(
                    key,
                    ChildGroup {
                        name: parent,
                        district,
                        members: vec![feature],
                    },
                );
            }
        }
    }

    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Area};

    fn feature(name: &str, municipality: &str, geometry: MultiPolygon<f64>) -> BoundaryFeature {
        let area_ha = geometry.unsigned_area();
        BoundaryFeature {
            name: name.to_string(),
            norm: normalize(name),
            municipality: Some(municipality.to_string()),
            district: Some("Faro".to_string()),
            area_ha,
            area_ea_ha: Some(area_ha),
            geometry,
        }
    }

    fn square(x0: f64, y0: f64, side: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![polygon![
            (x: x0, y: y0),
            (x: x0 + side, y: y0),
            (x: x0 + side, y: y0 + side),
            (x: x0, y: y0 + side),
        ]])
    }

    #[test]
    fn test_disjoint_areas_are_additive() {
        let a = feature("A", "M", square(0.0, 0.0, 1.0));
        let b = feature("B", "M", square(5.0, 0.0, 2.0));
        let merged = aggregate(&[a, b]).unwrap();

        // Property accumulator matches the sum of the children's fields.
        assert!((merged.area_ha - 5.0).abs() / 5.0 < 1e-6);
        assert_eq!(merged.area_ea_ha, Some(merged.area_ha));
        // And the unioned geometry's planar area agrees with it.
        assert!((merged.geometry.unsigned_area() - 5.0).abs() / 5.0 < 1e-6);
        assert_eq!(merged.geometry.0.len(), 2);
    }

    #[test]
    fn test_single_element_is_idempotent() {
        let input = feature("A", "M", square(2.0, 3.0, 4.0));
        let merged = aggregate(std::slice::from_ref(&input)).unwrap();

        assert_eq!(merged.geometry, input.geometry);
        assert!((merged.area_ha - input.area_ha).abs() < 1e-9);

        // Reference points match direct single-polygon computation.
        let direct_centroid = GeoOps.centroid(&input.geometry).unwrap();
        assert!((merged.reference.centroid.lon - direct_centroid.lon).abs() < 1e-12);
        assert!((merged.reference.centroid.lat - direct_centroid.lat).abs() < 1e-12);
        let direct_median = GeoOps.median_center(&input.geometry).unwrap();
        assert!((merged.reference.center_median.lon - direct_median.lon).abs() < 1e-9);

        let bbox_mid = merged.bbox.center();
        assert_eq!(merged.reference.center.to_lonlat(), bbox_mid.to_lonlat());
    }

    #[test]
    fn test_empty_input_rejected() {
        let err = aggregate(&[]).unwrap_err();
        assert!(matches!(err, EngineError::InvalidGeometry { .. }));
    }

    #[test]
    fn test_malformed_child_rejected() {
        let mut bad = feature("A", "M", square(0.0, 0.0, 1.0));
        bad.geometry = MultiPolygon::new(vec![]);
        let good = feature("B", "M", square(5.0, 0.0, 1.0));
        let err = aggregate(&[good, bad]).unwrap_err();
        assert!(matches!(err, EngineError::InvalidGeometry { .. }));
    }

    #[test]
    fn test_missing_ea_area_leaves_accumulator_unset() {
        let mut a = feature("A", "M", square(0.0, 0.0, 1.0));
        let mut b = feature("B", "M", square(5.0, 0.0, 1.0));
        a.area_ea_ha = None;
        b.area_ea_ha = None;
        let merged = aggregate(&[a, b]).unwrap();
        assert_eq!(merged.area_ea_ha, None);
        assert!((merged.area_ha - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_overlapping_children_union_dedupes_interior() {
        // Two identical squares: union keeps one part; the property
        // accumulator still reports the sum of the declared fields.
        let a = feature("A", "M", square(0.0, 0.0, 1.0));
        let b = feature("B", "M", square(0.0, 0.0, 1.0));
        let merged = aggregate(&[a, b]).unwrap();
        assert!((merged.geometry.unsigned_area() - 1.0).abs() < 1e-9);
        assert!((merged.area_ha - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_group_children_by_municipality() {
        let features = vec![
            feature("P1", "Lagos", square(0.0, 0.0, 1.0)),
            feature("P2", "Loulé", square(5.0, 0.0, 1.0)),
            feature("P3", "LAGOS", square(2.0, 0.0, 1.0)),
        ];
        let groups = group_children(features, |f| f.municipality.as_deref()).unwrap();
        assert_eq!(groups.len(), 2);
        let lagos = &groups["lagos"];
        assert_eq!(lagos.name, "Lagos");
        assert_eq!(lagos.members.len(), 2);
        assert_eq!(groups["loule"].members.len(), 1);
    }

    #[test]
    fn test_group_children_requires_parent_name() {
        let mut orphan = feature("P1", "Lagos", square(0.0, 0.0, 1.0));
        orphan.municipality = None;
        let err = group_children(vec![orphan], |f| f.municipality.as_deref()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidParameter { .. }));
    }
}
