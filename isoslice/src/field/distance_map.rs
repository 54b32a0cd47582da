use crate::contour::{CellStateGrid, ClippingArea};
use crate::core::{math::Vector2, traits::Real};

/// 2D array of signed distances (mm) sampled at a fixed z height.
///
/// `origin` is the world position of pixel `(0, 0)`; pixels are square with `pixel_size` mm
/// spacing. Negative distances are inside the surface.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DistanceMap<T = f64> {
    width: usize,
    height: usize,
    origin: Vector2<T>,
    pixel_size: T,
    values: Vec<T>,
}

impl<T> DistanceMap<T>
where
    T: Real,
{
    /// Create a map of the given dimensions filled with zero distances.
    pub fn new(width: usize, height: usize, origin: Vector2<T>, pixel_size: T) -> Self {
        DistanceMap {
            width,
            height,
            origin,
            pixel_size,
            values: vec![T::zero(); width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn origin(&self) -> Vector2<T> {
        self.origin
    }

    pub fn pixel_size(&self) -> T {
        self.pixel_size
    }

    pub fn get(&self, x: usize, y: usize) -> T {
        self.values[y * self.width + x]
    }

    pub fn set(&mut self, x: usize, y: usize, value: T) {
        self.values[y * self.width + x] = value;
    }

    /// World rectangle covered by the map.
    pub fn clipping_area(&self) -> ClippingArea<T> {
        ClippingArea::new(
            self.origin.x,
            self.origin.y,
            self.origin.x + self.pixel_size * T::from(self.width).unwrap(),
            self.origin.y + self.pixel_size * T::from(self.height).unwrap(),
        )
    }

    /// Threshold the map at iso-value 0 into a marching squares cell state grid.
    ///
    /// The pixels form the corner lattice, so the resulting grid is one cell smaller in each
    /// dimension. Pixels with negative distance are inside.
    pub fn to_cell_states(&self) -> CellStateGrid {
        CellStateGrid::from_corner_predicate(
            self.width.saturating_sub(1),
            self.height.saturating_sub(1),
            |x, y| self.get(x, y) < T::zero(),
        )
    }
}

/// Distance field sampler consumed by the layer driver (the engine never computes distances
/// itself).
pub trait DistanceSampler<T>: Send + Sync
where
    T: Real,
{
    /// Sample a 2D distance map at height `z` with the requested pixel size.
    fn sample(&self, z: T, pixel_size: T) -> DistanceMap<T>;
}
