//! Slice file writers for the [isoslice] engine: SVG previews, Common Layer Interface (CLI)
//! geometry files, and the 8-bit greyscale image stacks consumed by layered 3MF volume
//! packaging.

pub mod cli_writer;
pub mod image_stack;
pub mod svg_writer;

pub use cli_writer::CliWriter;
pub use image_stack::{ImageStackWriter, StackTransform};
pub use svg_writer::SvgWriter;
