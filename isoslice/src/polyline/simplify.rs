use super::PolyLine;
use crate::core::{
    math::{dist_to_segment, Vector2},
    traits::Real,
};

/// Hard cap on the vertex count of a simplified polyline, imposed by downstream slice file
/// formats that store the count in an unsigned 32 bit field.
pub const VERTEX_LIMIT: usize = (u32::MAX - 4) as usize;

/// Douglas-Peucker simplification of the polyline in place.
///
/// Replaces the vertex sequence with a subset such that every removed vertex lies within
/// perpendicular distance `tolerance` of the retained polyline. The first and last vertex are
/// always retained, so closed polylines keep their closing duplicate. A `tolerance` of zero or
/// less leaves the polyline untouched.
///
/// Should the tolerance-driven result still exceed [VERTEX_LIMIT] the vertex budget variant
/// [simplify_to_count] takes over.
pub fn simplify<T>(poly: &mut PolyLine<T>, tolerance: T)
where
    T: Real,
{
    if tolerance <= T::zero() || poly.len() < 3 {
        return;
    }

    let keep = douglas_peucker_mask(poly.vertexes(), tolerance);
    let kept_count = keep.iter().filter(|&&k| k).count();

    if kept_count > VERTEX_LIMIT {
        let reduced = simplify_to_count(poly.vertexes(), VERTEX_LIMIT);
        poly.set_vertexes(reduced);
        return;
    }

    let reduced = poly
        .iter()
        .zip(keep.iter())
        .filter_map(|(v, &k)| if k { Some(*v) } else { None })
        .collect();
    poly.set_vertexes(reduced);
}

/// Marks the vertexes retained by Douglas-Peucker at the given tolerance.
fn douglas_peucker_mask<T>(vertexes: &[Vector2<T>], tolerance: T) -> Vec<bool>
where
    T: Real,
{
    let n = vertexes.len();
    let mut keep = vec![false; n];
    keep[0] = true;
    keep[n - 1] = true;

    let mut stack = vec![(0usize, n - 1)];
    while let Some((start, end)) = stack.pop() {
        if end <= start + 1 {
            continue;
        }

        let (farthest, max_dist) = farthest_from_chord(vertexes, start, end);
        if max_dist > tolerance {
            keep[farthest] = true;
            stack.push((start, farthest));
            stack.push((farthest, end));
        }
    }

    keep
}

/// Returns the index and distance of the vertex in `(start, end)` farthest from the chord
/// `vertexes[start] -> vertexes[end]`.
fn farthest_from_chord<T>(vertexes: &[Vector2<T>], start: usize, end: usize) -> (usize, T)
where
    T: Real,
{
    let mut max_dist = T::zero();
    let mut farthest = start;
    for i in (start + 1)..end {
        let dist = dist_to_segment(vertexes[start], vertexes[end], vertexes[i]);
        if dist > max_dist {
            max_dist = dist;
            farthest = i;
        }
    }

    (farthest, max_dist)
}

/// Douglas-Peucker variant that keeps at most `max_count` vertexes.
///
/// Splits always happen at the globally farthest remaining vertex, so the kept subset is the
/// most shape-significant one of the requested size. Endpoints are always kept.
pub fn simplify_to_count<T>(vertexes: &[Vector2<T>], max_count: usize) -> Vec<Vector2<T>>
where
    T: Real,
{
    let n = vertexes.len();
    if max_count >= n {
        return vertexes.to_vec();
    }
    if max_count < 2 || n < 2 {
        return vertexes.to_vec();
    }

    let mut keep = vec![false; n];
    keep[0] = true;
    keep[n - 1] = true;
    let mut kept = 2usize;

    // candidate ranges with their farthest interior vertex
    let mut ranges: Vec<(usize, usize, usize, T)> = Vec::new();
    let seed = farthest_from_chord(vertexes, 0, n - 1);
    ranges.push((0, n - 1, seed.0, seed.1));

    while kept < max_count {
        // linear max scan, only reached when the tolerance result overflows the vertex cap
        let Some(best) = ranges
            .iter()
            .enumerate()
            .filter(|(_, r)| r.3 > T::zero())
            .max_by(|(_, a), (_, b)| a.3.partial_cmp(&b.3).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(i, _)| i)
        else {
            break;
        };

        let (start, end, split, _) = ranges.swap_remove(best);
        keep[split] = true;
        kept += 1;

        if split > start + 1 {
            let left = farthest_from_chord(vertexes, start, split);
            ranges.push((start, split, left.0, left.1));
        }
        if end > split + 1 {
            let right = farthest_from_chord(vertexes, split, end);
            ranges.push((split, end, right.0, right.1));
        }
    }

    vertexes
        .iter()
        .zip(keep.iter())
        .filter_map(|(v, &k)| if k { Some(*v) } else { None })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::math::vec2;

    #[test]
    fn collinear_vertexes_are_removed() {
        let mut poly = polyline_open![
            (0.0, 0.0),
            (1.0, 0.0),
            (2.0, 0.0),
            (3.0, 0.0),
            (10.0, 0.0),
            (10.0, 10.0),
        ];
        simplify(&mut poly, 1e-2);
        assert_eq!(poly.len(), 3);
        assert!(poly[0].fuzzy_eq(vec2(0.0, 0.0)));
        assert!(poly[1].fuzzy_eq(vec2(10.0, 0.0)));
        assert!(poly[2].fuzzy_eq(vec2(10.0, 10.0)));
    }

    #[test]
    fn deviating_vertexes_are_kept() {
        let mut poly = polyline_open![(0.0, 0.0), (5.0, 1.0), (10.0, 0.0)];
        simplify(&mut poly, 0.5);
        assert_eq!(poly.len(), 3);
    }

    #[test]
    fn simplify_is_idempotent() {
        let mut poly = polyline_open![
            (0.0, 0.0),
            (1.0, 0.003),
            (2.0, 0.0),
            (5.0, 2.0),
            (8.0, 0.0),
            (9.0, 0.004),
            (10.0, 0.0),
        ];
        simplify(&mut poly, 0.01);
        let once = poly.clone();
        simplify(&mut poly, 0.01);
        assert!(poly.fuzzy_eq(&once));
    }

    #[test]
    fn endpoints_always_survive() {
        let mut poly = polyline_open![(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)];
        simplify(&mut poly, 100.0);
        assert_eq!(poly.len(), 2);
        assert!(poly[0].fuzzy_eq(vec2(0.0, 0.0)));
        assert!(poly[1].fuzzy_eq(vec2(2.0, 0.0)));
    }

    #[test]
    fn count_variant_keeps_most_significant_vertexes() {
        let vertexes = vec![
            vec2(0.0, 0.0),
            vec2(2.0, 0.1),
            vec2(5.0, 4.0),
            vec2(8.0, 0.1),
            vec2(10.0, 0.0),
        ];
        let reduced = simplify_to_count(&vertexes, 3);
        assert_eq!(reduced.len(), 3);
        assert!(reduced[1].fuzzy_eq(vec2(5.0, 4.0)));
    }
}
