//! Geometry operations behind a small swappable interface.
//!
//! The aggregator only talks to [`GeometryOps`], so the concrete geometry
//! library can be replaced without touching aggregation logic. [`GeoOps`] is
//! the production implementation backed by the `geo` crate.

use geo::{Area, BooleanOps, BoundingRect, Centroid, Coord, MultiPolygon};

use crate::error::EngineError;
use crate::models::{Bbox, GeoPoint};

/// Iteration cap for the geometric-median refinement.
const MEDIAN_MAX_ITERATIONS: usize = 100;
/// Convergence tolerance (in coordinate units) for the geometric median.
const MEDIAN_TOLERANCE: f64 = 1e-9;

/// The geometry primitives the aggregation engine needs.
pub trait GeometryOps {
    /// Boolean union of two geometries; the result may be multi-part.
    fn union(&self, a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> MultiPolygon<f64>;

    /// Min/max longitude and latitude across the geometry.
    fn bounding_box(&self, geometry: &MultiPolygon<f64>) -> Result<Bbox, EngineError>;

    /// Area-weighted centroid of the polygon interior.
    fn centroid(&self, geometry: &MultiPolygon<f64>) -> Result<GeoPoint, EngineError>;

    /// Area-weighted mean of per-part centroids. Identical to
    /// [`GeometryOps::centroid`] for simple polygons; differs only in how
    /// degenerate parts are handled.
    fn center_of_mass(&self, geometry: &MultiPolygon<f64>) -> Result<GeoPoint, EngineError>;

    /// Arithmetic mean of all vertex coordinates.
    fn mean_center(&self, geometry: &MultiPolygon<f64>) -> Result<GeoPoint, EngineError>;

    /// Coordinate-wise geometric median of the vertex set (Weiszfeld).
    fn median_center(&self, geometry: &MultiPolygon<f64>) -> Result<GeoPoint, EngineError>;
}

/// Production [`GeometryOps`] implementation over the `geo` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct GeoOps;

impl GeometryOps for GeoOps {
    fn union(&self, a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> MultiPolygon<f64> {
        a.union(b)
    }

    fn bounding_box(&self, geometry: &MultiPolygon<f64>) -> Result<Bbox, EngineError> {
        let rect = geometry.bounding_rect().ok_or_else(|| {
            EngineError::invalid_geometry("bounding_box", "geometry has no extent")
        })?;
        Ok(Bbox {
            min_lon: rect.min().x,
            min_lat: rect.min().y,
            max_lon: rect.max().x,
            max_lat: rect.max().y,
        })
    }

    fn centroid(&self, geometry: &MultiPolygon<f64>) -> Result<GeoPoint, EngineError> {
        geometry
            .centroid()
            .map(|p| GeoPoint::new(p.x(), p.y()))
            .ok_or_else(|| EngineError::invalid_geometry("centroid", "geometry has no centroid"))
    }

    fn center_of_mass(&self, geometry: &MultiPolygon<f64>) -> Result<GeoPoint, EngineError> {
        let mut weighted_x = 0.0;
        let mut weighted_y = 0.0;
        let mut total_area = 0.0;

        for part in &geometry.0 {
            let area = part.unsigned_area();
            if area == 0.0 {
                continue;
            }
            let centroid = part.centroid().ok_or_else(|| {
                EngineError::invalid_geometry("center_of_mass", "degenerate polygon part")
            })?;
            weighted_x += centroid.x() * area;
            weighted_y += centroid.y() * area;
            total_area += area;
        }

        if total_area == 0.0 {
            return Err(EngineError::invalid_geometry(
                "center_of_mass",
                "geometry has zero total area",
            ));
        }

        Ok(GeoPoint::new(
            weighted_x / total_area,
            weighted_y / total_area,
        ))
    }

    fn mean_center(&self, geometry: &MultiPolygon<f64>) -> Result<GeoPoint, EngineError> {
        let vertices = ring_vertices(geometry);
        if vertices.is_empty() {
            return Err(EngineError::invalid_geometry(
                "mean_center",
                "geometry has no vertices",
            ));
        }
        let n = vertices.len() as f64;
        let sum = vertices
            .iter()
            .fold((0.0, 0.0), |(x, y), c| (x + c.x, y + c.y));
        Ok(GeoPoint::new(sum.0 / n, sum.1 / n))
    }

    fn median_center(&self, geometry: &MultiPolygon<f64>) -> Result<GeoPoint, EngineError> {
        let vertices = ring_vertices(geometry);
        if vertices.is_empty() {
            return Err(EngineError::invalid_geometry(
                "median_center",
                "geometry has no vertices",
            ));
        }

        // Weiszfeld iteration, seeded at the mean center.
        let mut current = {
            let mean = self.mean_center(geometry)?;
            Coord {
                x: mean.lon,
                y: mean.lat,
            }
        };

        for _ in 0..MEDIAN_MAX_ITERATIONS {
            let mut num_x = 0.0;
            let mut num_y = 0.0;
            let mut denom = 0.0;

            for v in &vertices {
                // Clamp to keep the update defined when the estimate lands
                // exactly on a vertex.
                let dist = ((v.x - current.x).powi(2) + (v.y - current.y).powi(2))
                    .sqrt()
                    .max(1e-12);
                num_x += v.x / dist;
                num_y += v.y / dist;
                denom += 1.0 / dist;
            }

            let next = Coord {
                x: num_x / denom,
                y: num_y / denom,
            };
            let moved = ((next.x - current.x).powi(2) + (next.y - current.y).powi(2)).sqrt();
            current = next;
            if moved < MEDIAN_TOLERANCE {
                break;
            }
        }

        Ok(GeoPoint::new(current.x, current.y))
    }
}

/// Structural validation shared by every operation that accepts geometry.
///
/// Rejects empty geometries, rings with fewer than four coordinates and any
/// non-finite coordinate. Self-intersecting rings pass through: the union
/// backend tolerates them.
pub fn validate(op: &'static str, geometry: &MultiPolygon<f64>) -> Result<(), EngineError> {
    if geometry.0.is_empty() {
        return Err(EngineError::invalid_geometry(op, "empty geometry"));
    }

    for (part_idx, part) in geometry.0.iter().enumerate() {
        let rings = std::iter::once(part.exterior()).chain(part.interiors().iter());
        for ring in rings {
            if ring.0.len() < 4 {
                return Err(EngineError::invalid_geometry(
                    op,
                    format!(
                        "part {} has a ring with {} coordinates (minimum 4)",
                        part_idx,
                        ring.0.len()
                    ),
                ));
            }
            for coord in &ring.0 {
                if !coord.x.is_finite() || !coord.y.is_finite() {
                    return Err(EngineError::invalid_geometry(
                        op,
                        format!("part {} contains a non-finite coordinate", part_idx),
                    ));
                }
            }
        }
    }

    Ok(())
}

/// All ring vertices of the geometry, skipping each ring's closing duplicate
/// so vertex-set statistics do not double-count it.
fn ring_vertices(geometry: &MultiPolygon<f64>) -> Vec<Coord<f64>> {
    let mut vertices = Vec::new();
    for part in &geometry.0 {
        for ring in std::iter::once(part.exterior()).chain(part.interiors().iter()) {
            let coords = &ring.0;
            let take = if coords.len() > 1 && coords.first() == coords.last() {
                coords.len() - 1
            } else {
                coords.len()
            };
            vertices.extend_from_slice(&coords[..take]);
        }
    }
    vertices
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, MultiPolygon};

    fn unit_square() -> MultiPolygon<f64> {
        MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 1.0),
        ]])
    }

    fn square(x0: f64, y0: f64, side: f64) -> geo::Polygon<f64> {
        polygon![
            (x: x0, y: y0),
            (x: x0 + side, y: y0),
            (x: x0 + side, y: y0 + side),
            (x: x0, y: y0 + side),
        ]
    }

    #[test]
    fn test_bounding_box() {
        let mp = MultiPolygon::new(vec![square(0.0, 0.0, 1.0), square(10.0, 5.0, 2.0)]);
        let bbox = GeoOps.bounding_box(&mp).unwrap();
        assert_eq!(bbox.to_array(), [0.0, 0.0, 12.0, 7.0]);
    }

    #[test]
    fn test_centroid_of_square() {
        let c = GeoOps.centroid(&unit_square()).unwrap();
        assert!((c.lon - 0.5).abs() < 1e-12);
        assert!((c.lat - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_mean_center_skips_closing_vertex() {
        // Four distinct corners; a naive iteration over the closed ring would
        // weight (0,0) twice and pull the mean off-center.
        let c = GeoOps.mean_center(&unit_square()).unwrap();
        assert!((c.lon - 0.5).abs() < 1e-12);
        assert!((c.lat - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_median_center_of_symmetric_square() {
        let c = GeoOps.median_center(&unit_square()).unwrap();
        assert!((c.lon - 0.5).abs() < 1e-6);
        assert!((c.lat - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_center_of_mass_weights_parts_by_area() {
        let mp = MultiPolygon::new(vec![square(0.0, 0.0, 1.0), square(10.0, 0.0, 2.0)]);
        let com = GeoOps.center_of_mass(&mp).unwrap();
        // Areas 1 and 4; centroids (0.5, 0.5) and (11, 1).
        assert!((com.lon - (0.5 + 11.0 * 4.0) / 5.0).abs() < 1e-9);
        assert!((com.lat - (0.5 + 1.0 * 4.0) / 5.0).abs() < 1e-9);

        // Must agree with the area-weighted whole-geometry centroid here.
        let centroid = GeoOps.centroid(&mp).unwrap();
        assert!((com.lon - centroid.lon).abs() < 1e-9);
        assert!((com.lat - centroid.lat).abs() < 1e-9);
    }

    #[test]
    fn test_union_of_disjoint_squares_keeps_both_parts() {
        let a = MultiPolygon::new(vec![square(0.0, 0.0, 1.0)]);
        let b = MultiPolygon::new(vec![square(5.0, 5.0, 1.0)]);
        let merged = GeoOps.union(&a, &b);
        assert_eq!(merged.0.len(), 2);
        assert!((merged.unsigned_area() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_validate_rejects_empty() {
        let empty = MultiPolygon::<f64>::new(vec![]);
        assert!(matches!(
            validate("test", &empty),
            Err(EngineError::InvalidGeometry { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_non_finite() {
        let mp = MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: f64::NAN, y: 0.0),
            (x: 1.0, y: 1.0),
        ]]);
        assert!(matches!(
            validate("test", &mp),
            Err(EngineError::InvalidGeometry { .. })
        ));
    }
}
