//! GeoPT - hierarchical aggregation and point-location engine for
//! Portuguese administrative boundaries.
//!
//! This library provides shared types and modules for the prepare and locate
//! binaries: polygon aggregation across the parish/municipality/district
//! hierarchy, density-based outlier filtering of raw point datasets, and
//! point-in-polygon subsection lookup over file-based GeoJSON artifacts.

pub mod aggregate;
pub mod artifact;
pub mod cluster;
pub mod error;
pub mod geometry;
pub mod models;
pub mod normalize;
pub mod pip;
pub mod worker;

pub use error::EngineError;
pub use models::{AdminLevel, Bbox, BoundaryFeature, GeoPoint, ReferencePoints};
