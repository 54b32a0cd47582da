//! Layer driver: iterates slice heights and stacks 2D distance maps into the 3D level-set grid.
mod driver;

pub use driver::*;
