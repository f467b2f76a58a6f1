//! Density-based outlier filtering for raw point datasets.
//!
//! DBSCAN-style clustering: dense neighbourhoods form clusters, everything
//! else is an outlier. Neighbour queries go through an R-tree, so a full run
//! is O(n log n) rather than a pairwise scan. A point's neighbour count
//! includes the point itself.

use rstar::primitives::GeomWithData;
use rstar::RTree;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::EngineError;

/// Clustering parameters. All three must be in range before a run starts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ClusterParams {
    /// Neighbourhood radius, in the same units as the input coordinates.
    pub radius: f64,
    /// Minimum neighbours (self included) for a point to be a core point.
    pub min_neighbours: usize,
    /// Minimum total size for a cluster to be accepted.
    pub min_cluster_size: usize,
}

impl ClusterParams {
    fn validate(&self) -> Result<(), EngineError> {
        if !(self.radius > 0.0) || !self.radius.is_finite() {
            return Err(EngineError::invalid_parameter(
                "filter",
                format!("radius must be a positive finite number, got {}", self.radius),
            ));
        }
        if self.min_neighbours < 1 {
            return Err(EngineError::invalid_parameter(
                "filter",
                "min_neighbours must be at least 1",
            ));
        }
        if self.min_cluster_size < 1 {
            return Err(EngineError::invalid_parameter(
                "filter",
                "min_cluster_size must be at least 1",
            ));
        }
        Ok(())
    }
}

/// The accepted/outlier partition of one filter run. Both vectors preserve
/// the input ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterSplit {
    pub accepted: Vec<[f64; 2]>,
    pub outliers: Vec<[f64; 2]>,
}

/// Boundary contract: raw point dataset input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterRequest {
    pub points: Vec<[f64; 2]>,
}

/// Boundary contract: filtered dataset output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterResponse {
    pub filtered_points: Vec<[f64; 2]>,
    pub outliers: Vec<[f64; 2]>,
}

impl From<ClusterSplit> for FilterResponse {
    fn from(split: ClusterSplit) -> Self {
        Self {
            filtered_points: split.accepted,
            outliers: split.outliers,
        }
    }
}

/// Split a point set into dense-cluster members and outliers.
///
/// Core points (at least `min_neighbours` neighbours within `radius`,
/// counting themselves) seed clusters and expand through chains of mutually
/// reachable core points; non-core points within `radius` of a cluster's core attach
/// as border points. Clusters smaller than `min_cluster_size` are folded
/// into the outliers, as is every unclustered point. Duplicate coordinates
/// are independent points. The partition is deterministic for a given input
/// order; cluster labels themselves carry no meaning.
pub fn filter(points: &[[f64; 2]], params: &ClusterParams) -> Result<ClusterSplit, EngineError> {
    params.validate()?;

    if points.is_empty() {
        return Ok(ClusterSplit {
            accepted: Vec::new(),
            outliers: Vec::new(),
        });
    }

    let tree = RTree::bulk_load(
        points
            .iter()
            .enumerate()
            .map(|(idx, p)| GeomWithData::new(*p, idx))
            .collect(),
    );
    let radius_sq = params.radius * params.radius;

    let neighbours = |idx: usize| -> Vec<usize> {
        tree.locate_within_distance(points[idx], radius_sq)
            .map(|entry| entry.data)
            .collect()
    };

    // Pass 1: core-point classification.
    let core: Vec<bool> = (0..points.len())
        .map(|idx| neighbours(idx).len() >= params.min_neighbours)
        .collect();

    // Pass 2: expand clusters from core points, in input order. Border
    // points keep the label of the first cluster that reaches them.
    let mut labels: Vec<Option<usize>> = vec![None; points.len()];
    let mut cluster_sizes: Vec<usize> = Vec::new();

    for seed in 0..points.len() {
        if !core[seed] || labels[seed].is_some() {
            continue;
        }

        let cluster_id = cluster_sizes.len();
        cluster_sizes.push(0);

        let mut queue = vec![seed];
        labels[seed] = Some(cluster_id);
        cluster_sizes[cluster_id] += 1;

        while let Some(current) = queue.pop() {
            for neighbour in neighbours(current) {
                if labels[neighbour].is_some() {
                    continue;
                }
                labels[neighbour] = Some(cluster_id);
                cluster_sizes[cluster_id] += 1;
                if core[neighbour] {
                    queue.push(neighbour);
                }
            }
        }
    }

    let mut accepted = Vec::new();
    let mut outliers = Vec::new();
    for (idx, point) in points.iter().enumerate() {
        match labels[idx] {
            Some(cluster_id) if cluster_sizes[cluster_id] >= params.min_cluster_size => {
                accepted.push(*point);
            }
            _ => outliers.push(*point),
        }
    }

    debug!(
        "clustered {} points into {} clusters: {} accepted, {} outliers",
        points.len(),
        cluster_sizes.len(),
        accepted.len(),
        outliers.len()
    );

    Ok(ClusterSplit { accepted, outliers })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(radius: f64, min_neighbours: usize, min_cluster_size: usize) -> ClusterParams {
        ClusterParams {
            radius,
            min_neighbours,
            min_cluster_size,
        }
    }

    #[test]
    fn test_dense_cluster_plus_isolated_point() {
        // 20 points on a tight grid (all within radius 1 of one another)
        // plus one point 100+ away from everything.
        let mut points: Vec<[f64; 2]> = (0..20)
            .map(|i| [(i % 5) as f64 * 0.1, (i / 5) as f64 * 0.1])
            .collect();
        points.push([100.0, 100.0]);

        let split = filter(&points, &params(1.0, 3, 10)).unwrap();
        assert_eq!(split.accepted.len(), 20);
        assert_eq!(split.outliers, vec![[100.0, 100.0]]);
    }

    #[test]
    fn test_small_cluster_below_threshold_is_outliers() {
        // A dense triple, but min_cluster_size demands five.
        let points = vec![[0.0, 0.0], [0.1, 0.0], [0.0, 0.1]];
        let split = filter(&points, &params(1.0, 2, 5)).unwrap();
        assert!(split.accepted.is_empty());
        assert_eq!(split.outliers.len(), 3);
    }

    #[test]
    fn test_duplicates_are_independent_points() {
        // Four copies of the same coordinate satisfy min_neighbours=4 alone.
        let points = vec![[1.0, 1.0]; 4];
        let split = filter(&points, &params(0.5, 4, 4)).unwrap();
        assert_eq!(split.accepted.len(), 4);
        assert!(split.outliers.is_empty());
    }

    #[test]
    fn test_border_point_attaches_to_cluster() {
        // Dense column at x=0; one extra point within radius of the column
        // edge but with too few neighbours to be core itself.
        let mut points: Vec<[f64; 2]> = (0..6).map(|i| [0.0, i as f64 * 0.15]).collect();
        points.push([0.9, 0.0]);
        let split = filter(&points, &params(1.0, 5, 7)).unwrap();
        assert_eq!(split.accepted.len(), 7);
        assert!(split.outliers.is_empty());
    }

    #[test]
    fn test_invalid_parameters_rejected() {
        let points = vec![[0.0, 0.0]];
        assert!(matches!(
            filter(&points, &params(0.0, 3, 10)),
            Err(EngineError::InvalidParameter { .. })
        ));
        assert!(matches!(
            filter(&points, &params(1.0, 0, 10)),
            Err(EngineError::InvalidParameter { .. })
        ));
        assert!(matches!(
            filter(&points, &params(1.0, 3, 0)),
            Err(EngineError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_empty_input() {
        let split = filter(&[], &params(1.0, 3, 10)).unwrap();
        assert!(split.accepted.is_empty());
        assert!(split.outliers.is_empty());
    }

    #[test]
    fn test_boundary_contract_field_names() {
        let response = FilterResponse::from(ClusterSplit {
            accepted: vec![[1.0, 2.0]],
            outliers: vec![],
        });
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("filteredPoints").is_some());
        assert!(json.get("outliers").is_some());
    }
}
