use crate::core::traits::Real;
use crate::field::{BoundingBox, DistanceSampler, SdfGrid};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Snaps `value` down onto the layer grid spanned by `increment`.
#[inline]
pub fn align_to_layer<T>(value: T, increment: T) -> T
where
    T: Real,
{
    (value / increment).floor() * increment
}

/// Iterates slice heights across a bounding box and writes each clamped distance map into the
/// z-slab of a sparse [SdfGrid].
///
/// The voxel size equals the distance map pixel size, the narrow band is two layer increments
/// wide and the height range is padded by one increment on both ends. A cancel flag is polled
/// between slices; there is no per-step cancellation inside the tracer or the slab write.
#[derive(Debug)]
pub struct LayerDriver<T = f64> {
    layer_increment: T,
    bandwidth: T,
    start_height: T,
    end_height: T,
    current_height: T,
    progress: T,
    grid: Option<SdfGrid<T>>,
    cancel: Arc<AtomicBool>,
}

impl<T> LayerDriver<T>
where
    T: Real,
{
    pub fn new() -> Self {
        LayerDriver {
            layer_increment: T::from(0.1).unwrap(),
            bandwidth: T::from(0.2).unwrap(),
            start_height: T::zero(),
            end_height: T::zero(),
            current_height: T::zero(),
            progress: T::zero(),
            grid: None,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shared flag other threads may set to stop the export between slices.
    pub fn cancel_token(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Prepare for an export over `bb` with the voxel size derived from the distance map pixel
    /// extent.
    pub fn begin(&mut self, bb: &BoundingBox<T>, voxel_size: T) {
        self.layer_increment = voxel_size;
        self.bandwidth = voxel_size * T::two();
        self.start_height = align_to_layer(bb.min[2] - self.layer_increment, self.layer_increment);
        self.end_height = bb.max[2] + self.layer_increment;
        self.current_height = self.start_height;
        self.progress = T::zero();
        self.grid = Some(SdfGrid::new(voxel_size, self.bandwidth));
        self.cancel.store(false, Ordering::Relaxed);
    }

    /// Process one layer: sample the distance map at the current height, write the clamped
    /// values into the grid slab and advance. Returns true while more layers remain.
    pub fn advance(&mut self, sampler: &dyn DistanceSampler<T>) -> bool {
        if self.cancel.load(Ordering::Relaxed) {
            return false;
        }

        let Some(grid) = self.grid.as_mut() else {
            return false;
        };

        let map = sampler.sample(self.current_height, self.layer_increment);

        let z = (self.current_height / self.layer_increment)
            .floor()
            .to_i64()
            .unwrap_or(0);

        for y in 0..map.height() {
            for x in 0..map.width() {
                grid.set_value((x as i64, y as i64, z), map.get(x, y));
            }
        }
        grid.prune();

        self.current_height = align_to_layer(
            self.current_height + self.layer_increment,
            self.layer_increment,
        );

        let span = self.end_height - self.start_height;
        if span > T::zero() {
            let progress = (self.current_height - self.start_height) / span;
            self.progress = num_traits::real::Real::max(
                num_traits::real::Real::min(progress, T::one()),
                T::zero(),
            );
        }

        self.current_height < self.end_height
    }

    /// Export progress in `[0, 1]`.
    pub fn progress(&self) -> T {
        self.progress
    }

    pub fn current_height(&self) -> T {
        self.current_height
    }

    pub fn layer_increment(&self) -> T {
        self.layer_increment
    }

    /// Borrow the accumulated grid.
    pub fn grid(&self) -> Option<&SdfGrid<T>> {
        self.grid.as_ref()
    }

    /// Hand the finished grid to the volume-to-mesh converter.
    pub fn take_grid(&mut self) -> Option<SdfGrid<T>> {
        self.grid.take()
    }
}

impl<T> Default for LayerDriver<T>
where
    T: Real,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::math::vec2;
    use crate::core::traits::FuzzyEq;
    use crate::field::DistanceMap;

    /// Unit sphere of radius 2 centered at the origin.
    struct SphereSampler;

    impl DistanceSampler<f64> for SphereSampler {
        fn sample(&self, z: f64, pixel_size: f64) -> DistanceMap<f64> {
            let mut map = DistanceMap::new(16, 16, vec2(-4.0, -4.0), pixel_size);
            for y in 0..16 {
                for x in 0..16 {
                    let wx = -4.0 + pixel_size * x as f64;
                    let wy = -4.0 + pixel_size * y as f64;
                    let dist = (wx * wx + wy * wy + z * z).sqrt() - 2.0;
                    map.set(x, y, dist);
                }
            }
            map
        }
    }

    #[test]
    fn drives_across_the_full_height_range() {
        let bb = BoundingBox::new([-4.0, -4.0, -2.0], [4.0, 4.0, 2.0]);
        let mut driver = LayerDriver::new();
        driver.begin(&bb, 0.5);

        let sampler = SphereSampler;
        let mut layers = 0;
        while driver.advance(&sampler) {
            layers += 1;
            assert!(layers < 1000, "driver failed to terminate");
        }

        // (2 * 2 mm + 2 * padding) / 0.5 mm per layer
        assert!(layers >= 9);
        assert_fuzzy_eq!(driver.progress(), 1.0);

        let grid = driver.take_grid().unwrap();
        // the sphere interior made it into the grid
        assert!(grid.value((8, 8, 0)) < 0.0);
        // distances are clamped to the narrow band
        assert!(grid.value((0, 0, 0)) <= grid.bandwidth());
    }

    #[test]
    fn cancel_stops_between_slices() {
        let bb = BoundingBox::new([-4.0, -4.0, -2.0], [4.0, 4.0, 2.0]);
        let mut driver = LayerDriver::new();
        driver.begin(&bb, 0.5);

        driver.cancel_token().store(true, Ordering::Relaxed);
        assert!(!driver.advance(&SphereSampler));
        assert!(driver.progress() < 1.0);
    }
}
