use super::{
    marching_squares::{trace, CellStateGrid, ClippingArea, GridMappingError},
    offset::{OffsetBackend, RoundJoinOffset},
};
use crate::core::traits::Real;
use crate::polyline::{
    close_remaining, include_open_contours, merge_nearest_neighbor, simplify, validate,
    ContourMode, PolyLine, DEFAULT_NEIGHBORHOOD,
};
use static_aabb2d_index::StaticAABB2DIndexBuilder;

/// Default Douglas-Peucker tolerance in mm applied during post-processing.
pub const DEFAULT_SIMPLIFICATION_TOLERANCE: f64 = 1e-2;

/// Closed contours with an absolute area below this threshold (mm^2) are excluded from the
/// slice.
pub const MIN_CONTOUR_AREA: f64 = 5e-2;

/// Aggregate quality counters for one slice, updated monotonically during post-processing.
///
/// Callers inspect this record to accept or reject a slice; none of the conditions counted here
/// abort the extraction.
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SliceQuality<T = f64> {
    /// Polylines that came out of tracing without closure.
    pub initially_open_polygons: usize,
    /// Total self intersections found across all polylines.
    pub self_intersections: usize,
    /// Vertices the grid source promised but no polyline consumed.
    pub unused_vertices: usize,
    /// Polylines excluded for being smaller than [MIN_CONTOUR_AREA].
    pub excluded_polylines: usize,
    /// Polylines in the closed set after post-processing.
    pub closed_polylines: usize,
    /// Vertex count announced by the grid source, see
    /// [ContourExtractor::set_expected_vertices].
    pub expected_vertices: usize,
    /// Vertices actually present across the closed set.
    pub considered_vertices: usize,
    /// Open polylines that no merge or salvage pass managed to close.
    pub unclosable_polylines: usize,
    /// Sum of the absolute enclosed areas (mm^2).
    pub enclosed_area: T,
}

/// Orchestrates the slice contour pipeline: iso-line tracing, gap merging, simplification,
/// orientation and quality measurement.
///
/// The extractor owns its open and closed polyline sets exclusively for the duration of a
/// slice; readers take snapshots (see [ContourExtractor::contour]) once a slice is complete.
#[derive(Debug, Clone)]
pub struct ContourExtractor<T = f64> {
    closed_contours: Vec<PolyLine<T>>,
    open_contours: Vec<PolyLine<T>>,
    simplification_tolerance: T,
    quality: SliceQuality<T>,
}

impl<T> Default for ContourExtractor<T>
where
    T: Real,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ContourExtractor<T>
where
    T: Real,
{
    pub fn new() -> Self {
        ContourExtractor {
            closed_contours: Vec::new(),
            open_contours: Vec::new(),
            simplification_tolerance: T::from(DEFAULT_SIMPLIFICATION_TOLERANCE).unwrap(),
            quality: SliceQuality::default(),
        }
    }

    /// Drop all contours and reset the quality record for the next slice.
    pub fn clear(&mut self) {
        self.closed_contours.clear();
        self.open_contours.clear();
        self.quality = SliceQuality::default();
    }

    pub fn set_simplification_tolerance(&mut self, tolerance: T) {
        self.simplification_tolerance = tolerance;
    }

    pub fn simplification_tolerance(&self) -> T {
        self.simplification_tolerance
    }

    /// The closed contour set.
    pub fn contour(&self) -> &[PolyLine<T>] {
        &self.closed_contours
    }

    /// Mutable access to the closed contour set, e.g. for feeding externally built polylines
    /// through post-processing.
    pub fn contour_mut(&mut self) -> &mut Vec<PolyLine<T>> {
        &mut self.closed_contours
    }

    /// Polylines that could not be closed (so far).
    pub fn open_contours(&self) -> &[PolyLine<T>] {
        &self.open_contours
    }

    pub fn open_contours_mut(&mut self) -> &mut Vec<PolyLine<T>> {
        &mut self.open_contours
    }

    pub fn slice_quality(&self) -> &SliceQuality<T> {
        &self.quality
    }

    /// Moves the closed contour set out of the extractor, leaving it empty.
    pub fn take_contours(&mut self) -> Vec<PolyLine<T>> {
        std::mem::take(&mut self.closed_contours)
    }

    /// Announce how many vertexes the grid source expects the slice to consume; used for the
    /// unused-vertex quality counter.
    pub fn set_expected_vertices(&mut self, count: usize) {
        self.quality.expected_vertices = count;
    }

    /// Traces the iso-lines of the cell state grid, merges the open traces with their nearest
    /// neighbors and refreshes the contour areas.
    ///
    /// The grid is consumed as scratch space (visited cells are cleared). Mapping failures are
    /// fatal to the current slice and leave the extractor untouched for the next one.
    pub fn add_iso_line_from_marching_squares(
        &mut self,
        grid: &mut CellStateGrid,
        clip: &ClippingArea<T>,
    ) -> Result<(), GridMappingError> {
        let traced = trace(grid, clip)?;
        self.closed_contours.extend(traced.closed);
        self.open_contours.extend(traced.open);

        let report = merge_nearest_neighbor(&mut self.open_contours, &mut self.closed_contours);
        self.quality.self_intersections += report.self_intersections;

        self.calc_areas();
        Ok(())
    }

    /// Post-processing pipeline. The order is significant: simplification runs before the
    /// containment pass so orientation decisions see the final vertex set, and quality is
    /// measured last.
    pub fn run_post_processing(&mut self) {
        self.simplify();
        self.calc_sign();
        self.update_contour_mode();
        self.measure_quality();
    }

    /// Refresh the cached signed area of every closed contour.
    pub fn calc_areas(&mut self) {
        for poly in &mut self.closed_contours {
            poly.update_area();
        }
    }

    /// Containment pass: classifies every closed contour as hole or outer and corrects its
    /// winding.
    ///
    /// A contour whose first vertex is enclosed by an odd number of other closed contours is a
    /// hole (`area <= 0`, clockwise); an even count makes it an outer (`area >= 0`, counter
    /// clockwise). A bounding box index over the contour extents prunes the candidates tested
    /// with the even-odd ray cast.
    pub fn calc_sign(&mut self) {
        let n = self.closed_contours.len();
        if n == 0 {
            return;
        }

        // map from index entries to contour indices (empty contours carry no box)
        let mut boxed: Vec<usize> = Vec::with_capacity(n);
        let mut extents = Vec::with_capacity(n);
        for (i, poly) in self.closed_contours.iter().enumerate() {
            if let Some(aabb) = poly.extents() {
                boxed.push(i);
                extents.push(aabb);
            }
        }

        if boxed.is_empty() {
            return;
        }

        let mut builder = StaticAABB2DIndexBuilder::new(boxed.len());
        for aabb in &extents {
            builder.add(aabb.min_x, aabb.min_y, aabb.max_x, aabb.max_y);
        }
        let index = match builder.build() {
            Ok(index) => index,
            // index build failed, leave orientation untouched
            Err(_) => return,
        };

        let mut containment_counts = vec![0usize; n];
        for (i, poly) in self.closed_contours.iter().enumerate() {
            let sample = match poly.first() {
                Some(v) => v,
                None => continue,
            };

            let mut count = 0usize;
            for entry in index.query(sample.x, sample.y, sample.x, sample.y) {
                let candidate = boxed[entry];
                if candidate == i {
                    continue;
                }
                if self.closed_contours[candidate].contains_point(sample) {
                    count += 1;
                }
            }
            containment_counts[i] = count;
        }

        for (poly, count) in self.closed_contours.iter_mut().zip(containment_counts) {
            if poly.is_empty() || poly.contour_mode == ContourMode::ExcludeFromSlice {
                continue;
            }

            let signed = poly.signed_area();
            let counter_clockwise = signed > T::zero();
            if count % 2 == 1 {
                // odd number of enclosing contours: this is a hole
                poly.area = -signed.abs();
                if counter_clockwise {
                    poly.invert_direction();
                }
            } else {
                poly.area = signed.abs();
                if !counter_clockwise {
                    poly.invert_direction();
                }
            }
        }
    }

    /// Derive [ContourMode] for every closed contour from closedness and area sign.
    pub fn update_contour_mode(&mut self) {
        for poly in &mut self.closed_contours {
            poly.update_contour_mode();
        }
    }

    /// Douglas-Peucker simplification over the open and closed sets with the current tolerance.
    pub fn simplify(&mut self) {
        if self.simplification_tolerance == T::zero() {
            return;
        }

        for poly in &mut self.closed_contours {
            simplify(poly, self.simplification_tolerance);
        }

        for poly in &mut self.open_contours {
            simplify(poly, self.simplification_tolerance);
        }
    }

    /// Revalidates every polyline and accumulates the [SliceQuality] counters. Closed contours
    /// below [MIN_CONTOUR_AREA] are marked [ContourMode::ExcludeFromSlice].
    pub fn measure_quality(&mut self) {
        self.quality.initially_open_polygons = self.open_contours.len();
        self.quality.unused_vertices = 0;
        self.quality.considered_vertices = 0;

        for poly in &mut self.open_contours {
            let result = validate(poly, DEFAULT_NEIGHBORHOOD);
            poly.has_intersections = !result.intersection_free;
            self.quality.self_intersections += poly.self_intersections.len();
            self.quality.unclosable_polylines += 1;
        }

        let min_area = T::from(MIN_CONTOUR_AREA).unwrap();
        let mut excluded = 0usize;
        for poly in &mut self.closed_contours {
            let result = validate(poly, DEFAULT_NEIGHBORHOOD);
            poly.has_intersections = !result.intersection_free;
            self.quality.self_intersections += poly.self_intersections.len();
            self.quality.enclosed_area = self.quality.enclosed_area + poly.signed_area().abs();
            self.quality.considered_vertices += poly.len();

            if !poly.is_closed() && poly.contour_mode == ContourMode::OpenLine {
                self.quality.unclosable_polylines += 1;
            }

            if poly.contour_mode != ContourMode::ExcludeFromSlice
                && poly.signed_area().abs() < min_area
            {
                poly.contour_mode = ContourMode::ExcludeFromSlice;
                excluded += 1;
            }
        }
        self.quality.excluded_polylines = excluded;

        if excluded > 0 {
            log::warn!(
                "{} polylines are smaller than {} mm^2 and are thereby excluded from the slice",
                excluded,
                MIN_CONTOUR_AREA
            );
        }

        // considered may exceed expected when vertices get connected multiple times
        self.quality.unused_vertices = self.quality.expected_vertices
            - self
                .quality
                .considered_vertices
                .min(self.quality.expected_vertices);

        self.quality.closed_polylines = self.closed_contours.len();

        log::debug!(
            "{} of {} vertices unused; {} self intersections; initially {} open polylines; \
             {} unclosable polylines; {} excluded polylines; area: {:?}",
            self.quality.unused_vertices,
            self.quality.expected_vertices,
            self.quality.self_intersections,
            self.quality.initially_open_polygons,
            self.quality.unclosable_polylines,
            self.quality.excluded_polylines,
            self.quality.enclosed_area,
        );
    }

    /// Salvage pass closing nearly-closed leftovers with the layer-merge tolerance.
    pub fn close_remaining(&mut self) {
        close_remaining(&mut self.open_contours, &mut self.closed_contours);
    }

    /// Moves the remaining open polylines into the closed collection as
    /// [ContourMode::OpenLine] entries.
    pub fn include_open_contours(&mut self) {
        include_open_contours(&mut self.open_contours, &mut self.closed_contours);
    }

    /// Inflates `contours` by `offset` mm (round joins, polygon semantics) and simplifies the
    /// result with the current tolerance.
    pub fn generate_offset_contours(&self, offset: T, contours: &[PolyLine<T>]) -> Vec<PolyLine<T>> {
        self.generate_offset_contours_with(&RoundJoinOffset, offset, contours)
    }

    /// Same as [ContourExtractor::generate_offset_contours] with a caller supplied backend.
    pub fn generate_offset_contours_with(
        &self,
        backend: &impl OffsetBackend<T>,
        offset: T,
        contours: &[PolyLine<T>],
    ) -> Vec<PolyLine<T>> {
        let mut result = backend.inflate(contours, offset);
        for poly in &mut result {
            simplify(poly, self.simplification_tolerance);
        }

        result
    }
}
