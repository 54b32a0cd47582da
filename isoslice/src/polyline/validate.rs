use super::PolyLine;
use crate::core::{math::seg_seg_intr, math::Vector2, traits::Real};

/// Default half-size of the segment window scanned around each vertex when looking for self
/// intersections.
pub const DEFAULT_NEIGHBORHOOD: usize = 50;

/// Result of running [validate] over a polyline.
#[derive(Debug, Clone, Copy)]
pub struct ValidationResult {
    pub intersection_free: bool,
}

/// Searches the segments starting in `[begin, end)` for a proper intersection with the segment
/// ending at vertex `i`. The three segments adjacent to vertex `i` are excluded.
fn intersection_in_range<T>(
    vertexes: &[Vector2<T>],
    i: usize,
    begin: usize,
    end: usize,
) -> Option<Vector2<T>>
where
    T: Real,
{
    if i == 0 {
        return None;
    }

    let prev = vertexes[i - 1];
    let curr = vertexes[i];

    for j in begin..end.saturating_sub(1) {
        // j == i - 1, i and i + 1 share a vertex with the tested segment
        if j + 1 == i || j == i || j == i + 1 {
            continue;
        }
        if let Some(point) = seg_seg_intr(vertexes[j], vertexes[j + 1], prev, curr) {
            return Some(point);
        }
    }

    None
}

/// Tests whether the final segment of the polyline crosses any earlier segment.
///
/// The intersection point is recorded on the polyline. Used by the gap closer to decide whether
/// the leading vertex must be trimmed before appending the closing duplicate.
pub fn end_crosses_start<T>(poly: &mut PolyLine<T>) -> bool
where
    T: Real,
{
    let n = poly.len();
    if n < 3 {
        return false;
    }

    if let Some(point) = intersection_in_range(poly.vertexes(), n - 1, 0, n) {
        poly.self_intersections.push(point);
        return true;
    }

    false
}

/// Scans the polyline for self intersections within a window of `neighborhood` segments on both
/// sides of every vertex.
///
/// All intersection points found are collected into `poly.self_intersections`. Polylines with
/// fewer than 3 vertexes are trivially intersection free.
pub fn validate<T>(poly: &mut PolyLine<T>, neighborhood: usize) -> ValidationResult
where
    T: Real,
{
    let mut result = ValidationResult {
        intersection_free: true,
    };

    let n = poly.len();
    if n < 3 {
        return result;
    }

    poly.self_intersections.clear();

    let mut found = Vec::new();
    {
        let vertexes = poly.vertexes();
        for i in 1..n {
            let begin = i - i.min(neighborhood);
            let end = i + (n - i).min(neighborhood);
            if let Some(point) = intersection_in_range(vertexes, i, begin, end) {
                result.intersection_free = false;
                found.push(point);
            }
        }
    }
    poly.self_intersections.extend(found);

    if end_crosses_start(poly) {
        result.intersection_free = false;
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_contour_is_intersection_free() {
        let mut quad = polyline_closed![(0.0, 0.0), (5.0, 0.0), (5.0, 5.0), (0.0, 5.0)];
        let result = validate(&mut quad, DEFAULT_NEIGHBORHOOD);
        assert!(result.intersection_free);
        assert!(quad.self_intersections.is_empty());
    }

    #[test]
    fn self_intersecting_contour_is_flagged() {
        let mut shape = polyline_closed![
            (0.0, 0.0),
            (5.0, 0.0),
            (5.0, 5.0),
            (6.0, 4.0),
            (0.0, 5.0),
        ];
        let result = validate(&mut shape, DEFAULT_NEIGHBORHOOD);
        assert!(!result.intersection_free);
        assert!(!shape.self_intersections.is_empty());
    }

    #[test]
    fn degenerate_polyline_is_trivially_free() {
        let mut tiny = polyline_open![(0.0, 0.0), (1.0, 1.0)];
        assert!(validate(&mut tiny, DEFAULT_NEIGHBORHOOD).intersection_free);
    }
}
