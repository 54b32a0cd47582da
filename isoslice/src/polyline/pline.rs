use super::ContourMode;
use crate::core::{math::Vector2, traits::Real};
use static_aabb2d_index::AABB;
use std::{
    ops::{Index, IndexMut},
    slice::Iter,
};

/// Squared distance below which the front and back vertex of a polyline count as the same point
/// (epsilon of 1e-3 mm).
pub const CLOSED_SQ_EPS: f64 = 1e-6;

/// Planar contour polyline: an ordered sequence of [Vector2] vertexes with slice metadata.
///
/// A closed polyline has at least 3 distinct vertexes and its last vertex is an exact copy of the
/// first. The signed `area` follows the mathematical Y-up convention: positive for counter
/// clockwise rings. After the orientation pass the sign encodes the contour role (outer >= 0,
/// inner <= 0).
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PolyLine<T = f64> {
    vertex_data: Vec<Vector2<T>>,
    is_closed: bool,
    /// Role of this polyline within the slice.
    pub contour_mode: ContourMode,
    /// Set by the validator when the polyline crosses itself.
    pub has_intersections: bool,
    /// Signed shoelace area, see [PolyLine::signed_area].
    pub area: T,
    /// Points where the polyline crosses itself, populated by the validator.
    pub self_intersections: Vec<Vector2<T>>,
}

impl<T> PolyLine<T>
where
    T: Real,
{
    /// Create a new empty [PolyLine] with `is_closed` set to false.
    pub fn new() -> Self {
        PolyLine {
            vertex_data: Vec::new(),
            is_closed: false,
            contour_mode: ContourMode::OpenLine,
            has_intersections: false,
            area: T::zero(),
            self_intersections: Vec::new(),
        }
    }

    /// Construct a new empty [PolyLine] with some reserved capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        PolyLine {
            vertex_data: Vec::with_capacity(capacity),
            ..Self::new()
        }
    }

    /// Returns the number of vertexes currently in the polyline.
    pub fn len(&self) -> usize {
        self.vertex_data.len()
    }

    /// Returns true if `self.len() == 0`.
    pub fn is_empty(&self) -> bool {
        self.vertex_data.is_empty()
    }

    /// Add a vertex to the polyline by giving the `x` and `y` values of the vertex.
    pub fn add(&mut self, x: T, y: T) {
        self.vertex_data.push(Vector2::new(x, y));
    }

    /// Add a vertex to the polyline.
    pub fn add_vertex(&mut self, vertex: Vector2<T>) {
        self.vertex_data.push(vertex);
    }

    /// Get the vertex at given `index` position. Returns `None` if `index` out of bounds.
    pub fn get(&self, index: usize) -> Option<Vector2<T>> {
        self.vertex_data.get(index).copied()
    }

    /// First vertex of the polyline or `None` if the polyline is empty.
    pub fn first(&self) -> Option<Vector2<T>> {
        self.vertex_data.first().copied()
    }

    /// Last vertex of the polyline or `None` if the polyline is empty.
    pub fn last(&self) -> Option<Vector2<T>> {
        self.vertex_data.last().copied()
    }

    /// All vertexes as a slice.
    pub fn vertexes(&self) -> &[Vector2<T>] {
        &self.vertex_data
    }

    /// Iterate over all vertexes.
    pub fn iter(&self) -> Iter<'_, Vector2<T>> {
        self.vertex_data.iter()
    }

    /// Remove the first vertex. Used when the closing segment crosses the start of the trace.
    pub fn remove_first(&mut self) -> Vector2<T> {
        self.vertex_data.remove(0)
    }

    /// Copy all vertexes from `other` to the end of this polyline.
    pub fn extend_vertexes(&mut self, other: &PolyLine<T>) {
        self.vertex_data.extend(other.vertex_data.iter());
    }

    /// Replace the vertex sequence, keeping all other state.
    pub fn set_vertexes(&mut self, vertexes: Vec<Vector2<T>>) {
        self.vertex_data = vertexes;
    }

    /// Clear all vertexes and reset the metadata.
    pub fn clear(&mut self) {
        self.vertex_data.clear();
        self.is_closed = false;
        self.contour_mode = ContourMode::OpenLine;
        self.has_intersections = false;
        self.area = T::zero();
        self.self_intersections.clear();
    }

    /// Returns true if the polyline is closed (last vertex is a copy of the first).
    pub fn is_closed(&self) -> bool {
        self.is_closed
    }

    /// Allows modifying whether the polyline is closed or not.
    pub fn set_is_closed(&mut self, is_closed: bool) {
        self.is_closed = is_closed;
    }

    /// Force closure: append a copy of the first vertex unless the back already sits on the
    /// front, then mark the polyline closed.
    pub fn close(&mut self) {
        if self.vertex_data.is_empty() {
            return;
        }

        if !self.ends_coincide() {
            let front = self.vertex_data[0];
            self.vertex_data.push(front);
        }
        self.is_closed = true;
    }

    /// Returns true if the front and back vertex coincide within [CLOSED_SQ_EPS].
    pub fn ends_coincide(&self) -> bool {
        match (self.first(), self.last()) {
            (Some(front), Some(back)) => {
                (front - back).length_squared() <= T::from(CLOSED_SQ_EPS).unwrap()
            }
            _ => false,
        }
    }

    /// Invert/reverse the direction of the polyline in place.
    ///
    /// For a closed polyline the winding changes from clockwise to counter clockwise or vice
    /// versa.
    pub fn invert_direction(&mut self) {
        self.vertex_data.reverse();
    }

    /// Compute the signed area using the shoelace formula.
    ///
    /// Positive for counter clockwise windings, negative for clockwise. Returns zero for
    /// polylines with fewer than 2 vertexes. The wrap segment back to the first vertex is always
    /// included (it contributes nothing when the polyline carries the closing duplicate vertex).
    ///
    /// # Examples
    ///
    /// ```
    /// # use isoslice::polyline::*;
    /// # use isoslice::polyline_closed;
    /// let square: PolyLine<f64> = polyline_closed![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)];
    /// assert!((square.signed_area() - 100.0).abs() < 1e-9);
    /// ```
    pub fn signed_area(&self) -> T {
        if self.len() < 2 {
            return T::zero();
        }

        let mut sum = T::zero();
        for w in self.vertex_data.windows(2) {
            sum = sum + w[0].x * w[1].y - w[1].x * w[0].y;
        }

        let front = self.vertex_data[0];
        let back = self.vertex_data[self.len() - 1];
        sum = sum + back.x * front.y - front.x * back.y;

        sum * T::half()
    }

    /// Refresh the cached `area` field from the current vertex data.
    pub fn update_area(&mut self) {
        self.area = self.signed_area();
    }

    /// Derive the contour mode from closedness and signed area.
    ///
    /// Counter clockwise (non-negative area) closed polylines are outer contours, clockwise ones
    /// are inner. Open polylines become [ContourMode::OpenLine], closed polylines with fewer
    /// than 3 distinct vertexes are excluded. Polylines already marked
    /// [ContourMode::ExcludeFromSlice] are left untouched.
    pub fn update_contour_mode(&mut self) {
        if self.contour_mode == ContourMode::ExcludeFromSlice {
            return;
        }

        if !self.is_closed {
            self.contour_mode = ContourMode::OpenLine;
            return;
        }

        if self.len() < 3 {
            self.contour_mode = ContourMode::ExcludeFromSlice;
            return;
        }

        self.contour_mode = if self.signed_area() < T::zero() {
            ContourMode::Inner
        } else {
            ContourMode::Outer
        };
    }

    /// Even-odd (ray cast) point in polygon test.
    ///
    /// A horizontal ray is cast in +x direction and edge crossings counted; an epsilon guard on
    /// the edge denominator keeps horizontal edges from producing infinities.
    pub fn contains_point(&self, point: Vector2<T>) -> bool {
        let n = self.len();
        if n < 3 {
            return false;
        }

        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let vi = self.vertex_data[i];
            let vj = self.vertex_data[j];
            let crosses = (vi.y > point.y) != (vj.y > point.y)
                && point.x
                    < (vj.x - vi.x) * (point.y - vi.y) / (vj.y - vi.y + T::epsilon()) + vi.x;
            if crosses {
                inside = !inside;
            }
            j = i;
        }

        inside
    }

    /// Compute the XY extents of the polyline.
    ///
    /// Returns `None` if the polyline is empty.
    pub fn extents(&self) -> Option<AABB<T>> {
        let first = self.first()?;
        let mut result = AABB::new(first.x, first.y, first.x, first.y);

        for v in self.iter() {
            if v.x < result.min_x {
                result.min_x = v.x;
            }
            if v.y < result.min_y {
                result.min_y = v.y;
            }
            if v.x > result.max_x {
                result.max_x = v.x;
            }
            if v.y > result.max_y {
                result.max_y = v.y;
            }
        }

        Some(result)
    }

    /// Fuzzy equal comparison of the vertex sequences using `fuzzy_epsilon` given.
    pub fn fuzzy_eq_eps(&self, other: &Self, fuzzy_epsilon: T) -> bool {
        self.len() == other.len()
            && self
                .vertex_data
                .iter()
                .zip(&other.vertex_data)
                .all(|(v1, v2)| v1.fuzzy_eq_eps(*v2, fuzzy_epsilon))
    }

    /// Fuzzy equal comparison of the vertex sequences using `T::fuzzy_epsilon()`.
    pub fn fuzzy_eq(&self, other: &Self) -> bool {
        self.fuzzy_eq_eps(other, T::fuzzy_epsilon())
    }
}

impl<T> Index<usize> for PolyLine<T> {
    type Output = Vector2<T>;

    fn index(&self, index: usize) -> &Vector2<T> {
        &self.vertex_data[index]
    }
}

impl<T> IndexMut<usize> for PolyLine<T> {
    fn index_mut(&mut self, index: usize) -> &mut Vector2<T> {
        &mut self.vertex_data[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::math::vec2;
    use crate::core::traits::FuzzyEq;

    #[test]
    fn signed_area_follows_winding() {
        let ccw = polyline_closed![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)];
        assert_fuzzy_eq!(ccw.signed_area(), 100.0);

        let mut cw = ccw.clone();
        cw.invert_direction();
        assert_fuzzy_eq!(cw.signed_area(), -100.0);
    }

    #[test]
    fn signed_area_without_closing_duplicate() {
        let triangle = polyline_open![(0.0, 0.0), (4.0, 0.0), (0.0, 3.0)];
        assert_fuzzy_eq!(triangle.signed_area(), 6.0);
    }

    #[test]
    fn contains_point_even_odd() {
        let square = polyline_closed![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)];
        assert!(square.contains_point(vec2(5.0, 5.0)));
        assert!(!square.contains_point(vec2(15.0, 5.0)));
        assert!(!square.contains_point(vec2(5.0, -1.0)));
    }

    #[test]
    fn close_appends_duplicate_once() {
        let mut pl = polyline_open![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)];
        pl.close();
        assert_eq!(pl.len(), 4);
        assert!(pl.is_closed());

        // closing again must not grow the polyline
        pl.close();
        assert_eq!(pl.len(), 4);
    }

    #[test]
    fn extents_cover_all_vertexes() {
        let pl = polyline_open![(-1.0, 2.0), (3.0, -4.0), (0.5, 7.0)];
        let aabb = pl.extents().unwrap();
        assert_fuzzy_eq!(aabb.min_x, -1.0);
        assert_fuzzy_eq!(aabb.min_y, -4.0);
        assert_fuzzy_eq!(aabb.max_x, 3.0);
        assert_fuzzy_eq!(aabb.max_y, 7.0);
    }
}
