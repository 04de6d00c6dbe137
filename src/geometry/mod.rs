pub mod aabb;
pub mod grid_spec;

pub use aabb::BoundingBox;
pub use grid_spec::{GridSpec, LEGACY_BASE_DIMENSIONS};
