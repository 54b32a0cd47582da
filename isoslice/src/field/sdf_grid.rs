use crate::core::traits::Real;
use std::collections::HashMap;

/// Sparse voxel level-set grid.
///
/// Values are signed distances clamped to the narrow band `[-bandwidth, +bandwidth]`; voxels
/// that hold the positive background value are not stored. Produced by the layer driver and
/// handed to a downstream volume-to-mesh converter.
#[derive(Debug, Clone)]
pub struct SdfGrid<T = f64> {
    voxel_size: T,
    bandwidth: T,
    voxels: HashMap<(i64, i64, i64), T>,
}

impl<T> SdfGrid<T>
where
    T: Real,
{
    pub fn new(voxel_size: T, bandwidth: T) -> Self {
        SdfGrid {
            voxel_size,
            bandwidth,
            voxels: HashMap::new(),
        }
    }

    pub fn voxel_size(&self) -> T {
        self.voxel_size
    }

    /// Half width of the narrow band; also the background value of unset voxels.
    pub fn bandwidth(&self) -> T {
        self.bandwidth
    }

    /// Store a clamped distance value at the voxel coordinate.
    pub fn set_value(&mut self, coord: (i64, i64, i64), value: T) {
        let clamped = num_traits::real::Real::min(
            num_traits::real::Real::max(value, -self.bandwidth),
            self.bandwidth,
        );
        self.voxels.insert(coord, clamped);
    }

    /// Distance at the voxel coordinate, or the background value when unset.
    pub fn value(&self, coord: (i64, i64, i64)) -> T {
        self.voxels.get(&coord).copied().unwrap_or(self.bandwidth)
    }

    /// Number of voxels stored explicitly.
    pub fn len(&self) -> usize {
        self.voxels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voxels.is_empty()
    }

    /// Drops voxels indistinguishable from the background so empty regions cost nothing.
    pub fn prune(&mut self) {
        let background = self.bandwidth;
        self.voxels
            .retain(|_, value| !value.fuzzy_eq_eps(background, T::fuzzy_epsilon()));
    }

    /// Iterate over the stored voxels.
    pub fn iter(&self) -> impl Iterator<Item = (&(i64, i64, i64), &T)> {
        self.voxels.iter()
    }

    /// Voxel index extents as `(min, max)` inclusive, or `None` for an empty grid.
    pub fn extents(&self) -> Option<((i64, i64, i64), (i64, i64, i64))> {
        let mut iter = self.voxels.keys();
        let first = *iter.next()?;
        let mut min = first;
        let mut max = first;
        for &(x, y, z) in iter {
            min = (min.0.min(x), min.1.min(y), min.2.min(z));
            max = (max.0.max(x), max.1.max(y), max.2.max(z));
        }

        Some((min, max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::FuzzyEq;

    #[test]
    fn values_are_clamped_to_the_band() {
        let mut grid = SdfGrid::new(0.1, 0.2);
        grid.set_value((0, 0, 0), 5.0);
        grid.set_value((1, 0, 0), -5.0);
        assert_fuzzy_eq!(grid.value((0, 0, 0)), 0.2);
        assert_fuzzy_eq!(grid.value((1, 0, 0)), -0.2);
    }

    #[test]
    fn prune_reclaims_background_voxels() {
        let mut grid = SdfGrid::new(0.1, 0.2);
        grid.set_value((0, 0, 0), 0.2);
        grid.set_value((1, 0, 0), -0.05);
        assert_eq!(grid.len(), 2);

        grid.prune();
        assert_eq!(grid.len(), 1);
        assert_fuzzy_eq!(grid.value((0, 0, 0)), 0.2);
        assert_fuzzy_eq!(grid.value((1, 0, 0)), -0.05);
    }

    #[test]
    fn extents_cover_stored_voxels() {
        let mut grid = SdfGrid::new(0.1, 0.2);
        assert!(grid.extents().is_none());
        grid.set_value((-1, 2, 0), -0.1);
        grid.set_value((3, -4, 5), -0.1);
        let (min, max) = grid.extents().unwrap();
        assert_eq!(min, (-1, -4, 0));
        assert_eq!(max, (3, 2, 5));
    }
}
