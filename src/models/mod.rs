//! Core data models for the boundary engine.

pub mod feature;
pub mod unit;

pub use feature::{Bbox, BoundaryFeature, GeoPoint, ReferencePoints};
pub use unit::AdminLevel;
