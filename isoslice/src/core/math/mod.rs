//! Core/common math functions for working with 2D space, segments, and intersections.
mod base_math;
mod seg_intersect;
mod vector2;

pub use base_math::*;
pub use seg_intersect::{line_line_intr, seg_seg_intr, seg_seg_intr_eps, INTERSECT_END_EXCLUSION};
pub use vector2::{vec2, Vector2};
