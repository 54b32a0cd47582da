//! This module has all the types and functions associated with polylines: the contour polyline
//! type itself, gap closing and merging of open traces, Douglas-Peucker simplification, and
//! self intersection validation.
mod merge;
mod pline;
mod pline_types;
mod simplify;
mod validate;

pub use merge::*;
pub use pline::*;
pub use pline_types::*;
pub use simplify::*;
pub use validate::*;
