//! Implicit-geometry slicing engine for additive manufacturing: traces iso-lines out of
//! signed-distance fields sampled on 2D grids, post-processes the resulting polylines into
//! oriented inner/outer contours, and stacks slices into a layer based level-set grid.

pub use static_aabb2d_index;

#[macro_use]
mod macros;
pub mod contour;
pub mod core;
pub mod field;
pub mod layer;
pub mod polyline;
