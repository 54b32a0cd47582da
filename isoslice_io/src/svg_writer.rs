use isoslice::core::traits::Real;
use isoslice::polyline::{ContourMode, PolyLine};
use std::path::Path;
use svg::node::element::path::Data;
use svg::node::element::Path as SvgPath;
use svg::Document;

/// World Y coordinates are mapped upward by subtracting from this page constant (mm).
pub const PAGE_Y_OFFSET: f64 = 400.0;

/// Renders the closed contour set of a slice as an SVG document.
///
/// All polylines of a layer share one `<path>` with `fill-rule="evenodd"`, so holes cut into
/// their outer contours without any explicit nesting. Polylines marked
/// [ContourMode::ExcludeFromSlice] are skipped.
#[derive(Debug, Default, Clone, Copy)]
pub struct SvgWriter;

impl SvgWriter {
    pub fn new() -> Self {
        SvgWriter
    }

    /// Path data (`M .. L .. z` commands) for one layer.
    pub fn layer_path_data<T>(&self, contours: &[PolyLine<T>]) -> Data
    where
        T: Real,
    {
        let mut data = Data::new();
        for poly in contours {
            if poly.contour_mode == ContourMode::ExcludeFromSlice || poly.is_empty() {
                continue;
            }

            let mut vertexes = poly.iter();
            if let Some(first) = vertexes.next() {
                data = data.move_to((
                    first.x.to_f64().unwrap_or(0.0),
                    PAGE_Y_OFFSET - first.y.to_f64().unwrap_or(0.0),
                ));
            }
            for v in vertexes {
                data = data.line_to((
                    v.x.to_f64().unwrap_or(0.0),
                    PAGE_Y_OFFSET - v.y.to_f64().unwrap_or(0.0),
                ));
            }
            data = data.close();
        }

        data
    }

    /// Builds the SVG document for one layer.
    pub fn layer_document<T>(&self, contours: &[PolyLine<T>]) -> Document
    where
        T: Real,
    {
        let path = SvgPath::new()
            .set("fill-rule", "evenodd")
            .set("d", self.layer_path_data(contours));

        Document::new()
            .set("width", "800mm")
            .set("height", "600mm")
            .set("viewBox", "-400 -300 800 600")
            .add(path)
    }

    /// Writes the layer document to `file_name`.
    pub fn save_layer<T>(
        &self,
        file_name: impl AsRef<Path>,
        contours: &[PolyLine<T>],
    ) -> std::io::Result<()>
    where
        T: Real,
    {
        svg::save(file_name, &self.layer_document(contours))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use isoslice::polyline_closed;

    #[test]
    fn excluded_contours_are_skipped() {
        let mut square = polyline_closed![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)];
        square.contour_mode = ContourMode::Outer;
        let mut excluded = polyline_closed![(0.0, 0.0), (0.1, 0.0), (0.1, 0.1)];
        excluded.contour_mode = ContourMode::ExcludeFromSlice;

        let writer = SvgWriter::new();
        let rendered = writer.layer_document(&[square, excluded]).to_string();

        // one move-to for the square, none for the excluded polyline
        assert_eq!(rendered.matches('M').count(), 1);
        assert!(rendered.contains("evenodd"));
    }

    #[test]
    fn world_y_is_mapped_upward() {
        let mut square = polyline_closed![(0.0, 10.0), (10.0, 10.0), (10.0, 20.0), (0.0, 20.0)];
        square.contour_mode = ContourMode::Outer;

        let writer = SvgWriter::new();
        let rendered = writer.layer_document(&[square]).to_string();
        // y = 10 maps to 400 - 10
        assert!(rendered.contains("390"));
    }
}
