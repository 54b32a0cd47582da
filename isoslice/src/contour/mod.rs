//! Contour extraction: the marching squares iso-line tracer, the orchestrating extractor with
//! its post-processing passes, offset contour generation, and the quadtree point store used to
//! reconstruct polylines from point clouds.
mod extractor;
mod marching_squares;
mod offset;
mod points_to_contour;
mod quadtree;
mod scheduler;

pub use extractor::*;
pub use marching_squares::*;
pub use offset::*;
pub use points_to_contour::*;
pub use quadtree::*;
pub use scheduler::*;
