use isoslice::core::traits::Real;
use isoslice::polyline::{ContourMode, PolyLine};
use std::io::Write;

/// Default slice thickness in mm for CLI output.
pub const DEFAULT_LAYER_THICKNESS: f64 = 0.05;

/// Snaps a height onto the layer thickness grid (nearest multiple).
pub fn round_to(value: f64, layer_thickness: f64) -> f64 {
    let aligned = value + layer_thickness * 0.5;
    aligned - aligned.rem_euclid(layer_thickness)
}

/// Writer for the Common Layer Interface (CLI) format: an ASCII slice exchange format listing
/// polylines per layer.
///
/// Polyline records carry a direction flag (0 = clockwise/internal, 1 = counter
/// clockwise/external, 2 = open) derived from the contour mode. Excluded polylines are not
/// written.
#[derive(Debug, Clone, Copy)]
pub struct CliWriter {
    layer_thickness: f64,
}

impl Default for CliWriter {
    fn default() -> Self {
        Self::new(DEFAULT_LAYER_THICKNESS)
    }
}

impl CliWriter {
    pub fn new(layer_thickness: f64) -> Self {
        CliWriter { layer_thickness }
    }

    pub fn layer_thickness(&self) -> f64 {
        self.layer_thickness
    }

    /// Writes the file header.
    pub fn begin(&self, out: &mut impl Write, layer_count: usize) -> std::io::Result<()> {
        writeln!(out, "$$HEADERSTART")?;
        writeln!(out, "$$ASCII")?;
        writeln!(out, "$$UNITS/1.000000")?;
        writeln!(out, "$$LAYERS/{layer_count}")?;
        writeln!(out, "$$HEADEREND")?;
        writeln!(out, "$$GEOMETRYSTART")
    }

    /// Writes one layer record at height `z` (snapped onto the layer thickness grid).
    pub fn write_layer<T>(
        &self,
        out: &mut impl Write,
        z: T,
        contours: &[PolyLine<T>],
    ) -> std::io::Result<()>
    where
        T: Real,
    {
        let height = round_to(z.to_f64().unwrap_or(0.0), self.layer_thickness);
        writeln!(out, "$$LAYER/{height:.6}")?;

        for (id, poly) in contours.iter().enumerate() {
            if poly.contour_mode == ContourMode::ExcludeFromSlice || poly.is_empty() {
                continue;
            }

            let direction = match poly.contour_mode {
                ContourMode::Inner => 0,
                ContourMode::Outer => 1,
                _ => 2,
            };

            write!(out, "$$POLYLINE/{},{},{}", id, direction, poly.len())?;
            for v in poly.iter() {
                write!(
                    out,
                    ",{:.6},{:.6}",
                    v.x.to_f64().unwrap_or(0.0),
                    v.y.to_f64().unwrap_or(0.0)
                )?;
            }
            writeln!(out)?;
        }

        Ok(())
    }

    /// Writes the file trailer.
    pub fn finish(&self, out: &mut impl Write) -> std::io::Result<()> {
        writeln!(out, "$$GEOMETRYEND")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use isoslice::polyline_closed;

    fn render(contours: &[PolyLine<f64>], z: f64) -> String {
        let writer = CliWriter::default();
        let mut out = Vec::new();
        writer.begin(&mut out, 1).unwrap();
        writer.write_layer(&mut out, z, contours).unwrap();
        writer.finish(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn layer_record_carries_snapped_height() {
        let mut square = polyline_closed![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)];
        square.contour_mode = ContourMode::Outer;

        let rendered = render(&[square], 0.1234);
        assert!(rendered.contains("$$LAYER/0.100000"));
        assert!(rendered.contains("$$POLYLINE/0,1,5"));
        assert!(rendered.ends_with("$$GEOMETRYEND\n"));
    }

    #[test]
    fn direction_flag_follows_contour_mode() {
        let mut hole = polyline_closed![(0.0, 0.0), (0.0, 5.0), (5.0, 5.0), (5.0, 0.0)];
        hole.contour_mode = ContourMode::Inner;

        let rendered = render(&[hole], 0.0);
        assert!(rendered.contains("$$POLYLINE/0,0,5"));
    }

    #[test]
    fn round_to_snaps_to_thickness_grid() {
        assert!((round_to(0.1234, 0.05) - 0.1).abs() < 1e-9);
        assert!((round_to(0.126, 0.05) - 0.15).abs() < 1e-9);
    }
}
