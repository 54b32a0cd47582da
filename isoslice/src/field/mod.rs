//! Scalar field containers: 2D sampled distance maps and the sparse 3D level-set grid the layer
//! driver stacks slices into.
mod distance_map;
mod sdf_grid;

pub use distance_map::*;
pub use sdf_grid::*;

use crate::core::traits::Real;

/// Axis aligned bounding box in world millimeters, `[x, y, z]` component order.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoundingBox<T = f64> {
    pub min: [T; 3],
    pub max: [T; 3],
}

impl<T> BoundingBox<T>
where
    T: Real,
{
    pub fn new(min: [T; 3], max: [T; 3]) -> Self {
        BoundingBox { min, max }
    }

    pub fn size(&self) -> [T; 3] {
        [
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        ]
    }
}
