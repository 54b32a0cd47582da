use image::{GrayImage, Luma};
use isoslice::core::traits::Real;
use isoslice::field::{BoundingBox, DistanceMap};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Scale factor from signed distance (mm) to grey levels around the 128 midpoint.
pub const DISTANCE_TO_GREY: f64 = 1000.0;

#[derive(Debug, Error)]
pub enum ImageStackError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error("bounding box has zero size")]
    DegenerateBoundingBox,
}

/// Row major 4x3 affine transform mapping the build volume to the unit cube, with Y inverted so
/// image rows grow downward. Attached to an exported stack so downstream software can re-sample
/// it as a volumetric function.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StackTransform {
    pub fields: [[f64; 3]; 4],
}

impl StackTransform {
    /// Builds the bounding-box-to-unit-cube transform.
    pub fn from_bounding_box<T>(bb: &BoundingBox<T>) -> Result<Self, ImageStackError>
    where
        T: Real,
    {
        let size = bb.size();
        let size = [
            size[0].to_f64().unwrap_or(0.0),
            size[1].to_f64().unwrap_or(0.0),
            size[2].to_f64().unwrap_or(0.0),
        ];
        let offset = [
            bb.min[0].to_f64().unwrap_or(0.0),
            bb.min[1].to_f64().unwrap_or(0.0),
            bb.min[2].to_f64().unwrap_or(0.0),
        ];

        if size.iter().any(|&s| s == 0.0) {
            return Err(ImageStackError::DegenerateBoundingBox);
        }

        Ok(StackTransform {
            fields: [
                [1.0 / size[0], 0.0, 0.0],
                [0.0, -1.0 / size[1], 0.0],
                [0.0, 0.0, 1.0 / size[2]],
                [
                    -offset[0] / size[0],
                    1.0 + offset[1] / size[1],
                    -offset[2] / size[2],
                ],
            ],
        })
    }
}

/// Writes one 8-bit greyscale PNG per layer into `volume/{stack_id}/layer_{n:03}.png`.
///
/// Grey levels encode the signed distance as `clamp(128 + distance * 1000, 0, 255)`, so the
/// iso-surface sits at mid grey and the 8-bit range covers roughly a +-0.128 mm band. The 3MF
/// container packaging around the stack is left to the consumer.
#[derive(Debug, Clone)]
pub struct ImageStackWriter {
    base_dir: PathBuf,
    stack_id: u32,
    current_layer: usize,
}

impl ImageStackWriter {
    pub fn new(base_dir: impl Into<PathBuf>, stack_id: u32) -> Self {
        ImageStackWriter {
            base_dir: base_dir.into(),
            stack_id,
            current_layer: 0,
        }
    }

    /// Number of layers written so far.
    pub fn layer_count(&self) -> usize {
        self.current_layer
    }

    /// Relative path of the layer with the given index.
    pub fn layer_path(&self, layer: usize) -> PathBuf {
        PathBuf::from(format!(
            "volume/{}/layer_{:03}.png",
            self.stack_id, layer
        ))
    }

    /// Converts a distance map into the greyscale layer image.
    pub fn layer_image<T>(map: &DistanceMap<T>) -> GrayImage
    where
        T: Real,
    {
        GrayImage::from_fn(map.width() as u32, map.height() as u32, |x, y| {
            let distance = map.get(x as usize, y as usize).to_f64().unwrap_or(0.0);
            let grey = (128.0 + distance * DISTANCE_TO_GREY).clamp(0.0, 255.0);
            Luma([grey as u8])
        })
    }

    /// Encodes the map as the next layer PNG and returns the written path.
    pub fn write_layer<T>(&mut self, map: &DistanceMap<T>) -> Result<PathBuf, ImageStackError>
    where
        T: Real,
    {
        let relative = self.layer_path(self.current_layer);
        let target = self.base_dir.join(&relative);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }

        Self::layer_image(map).save(&target)?;
        log::debug!("wrote layer {} to {}", self.current_layer, target.display());
        self.current_layer += 1;

        Ok(target)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use isoslice::core::math::vec2;

    #[test]
    fn grey_levels_encode_signed_distance() {
        let mut map = DistanceMap::<f64>::new(3, 1, vec2(0.0, 0.0), 1.0);
        map.set(0, 0, 0.0);
        map.set(1, 0, -1.0);
        map.set(2, 0, 0.05);

        let image = ImageStackWriter::layer_image(&map);
        // iso-surface at mid grey, inside saturates black-ward, positive offsets brighter
        assert_eq!(image.get_pixel(0, 0).0[0], 128);
        assert_eq!(image.get_pixel(1, 0).0[0], 0);
        assert_eq!(image.get_pixel(2, 0).0[0], 178);
    }

    #[test]
    fn layer_paths_are_zero_padded() {
        let writer = ImageStackWriter::new("out", 7);
        assert_eq!(
            writer.layer_path(3),
            PathBuf::from("volume/7/layer_003.png")
        );
    }

    #[test]
    fn transform_maps_bounding_box_to_unit_cube() {
        let bb = BoundingBox::new([0.0, 0.0, 0.0], [10.0, 20.0, 40.0]);
        let transform = StackTransform::from_bounding_box(&bb).unwrap();
        assert!((transform.fields[0][0] - 0.1).abs() < 1e-12);
        assert!((transform.fields[1][1] + 0.05).abs() < 1e-12);
        assert!((transform.fields[3][1] - 1.0).abs() < 1e-12);

        let degenerate = BoundingBox::new([0.0, 0.0, 0.0], [10.0, 0.0, 40.0]);
        assert!(StackTransform::from_bounding_box(&degenerate).is_err());
    }
}
