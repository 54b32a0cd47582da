use super::{end_crosses_start, validate, ContourMode, PolyLine, DEFAULT_NEIGHBORHOOD};
use crate::core::{math::Vector2, traits::Real};

/// Gap tolerance in mm used when merging open traces with their nearest neighbor.
pub const MERGE_GAP_TOLERANCE: f64 = 1.0;

/// Self-closure tolerance in mm for the salvage pass over polylines that survived merging open.
pub const REMAINING_CLOSE_TOLERANCE: f64 = 0.5;

/// Counters produced by [merge_nearest_neighbor].
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeReport {
    /// Self intersections found while validating polylines that got closed by the merge.
    pub self_intersections: usize,
}

/// Returns true if the gap between `start` and `end` is within `allowed_gap`.
#[inline]
pub fn is_mergeable<T>(start: Vector2<T>, end: Vector2<T>, allowed_gap: T) -> bool
where
    T: Real,
{
    (start - end).length() <= allowed_gap
}

/// Closes the polyline when its endpoints are within `allowed_gap` of each other.
///
/// When the closing segment would cross the start of the trace the leading vertex is trimmed
/// first. Exact closure is enforced by appending a copy of the first vertex.
pub fn close_if_possible<T>(poly: &mut PolyLine<T>, allowed_gap: T)
where
    T: Real,
{
    let (front, back) = match (poly.first(), poly.last()) {
        (Some(front), Some(back)) => (front, back),
        _ => return,
    };

    if !is_mergeable(front, back, allowed_gap) {
        return;
    }

    if end_crosses_start(poly) {
        poly.remove_first();
    }

    poly.close();
}

/// Appends the vertexes of `source` onto `target` when the gap between them is within
/// `allowed_gap`; `source` is emptied on success.
pub fn merge_polylines_if_possible<T>(
    target: &mut PolyLine<T>,
    source: &mut PolyLine<T>,
    allowed_gap: T,
) where
    T: Real,
{
    if target.is_empty() || source.is_empty() {
        return;
    }

    let gap = match (target.last(), source.first()) {
        (Some(back), Some(front)) => (back - front).length(),
        _ => return,
    };
    if gap > allowed_gap {
        return;
    }

    target.extend_vertexes(source);
    source.clear();
}

/// Iteratively merges open polylines with their nearest neighbor until nothing is left to merge.
///
/// Per pass, each open polyline is paired with the candidate whose front vertex is nearest to its
/// back vertex. If the nearest candidate is the polyline itself a self closure is attempted,
/// otherwise the candidate is spliced onto the tail when within [MERGE_GAP_TOLERANCE]. Polylines
/// closed this way are validated and moved to `closed`. The pass count is bounded by
/// `open.len() + 1` so an SDF producing endless tiny fragments cannot loop forever.
pub fn merge_nearest_neighbor<T>(
    open: &mut Vec<PolyLine<T>>,
    closed: &mut Vec<PolyLine<T>>,
) -> MergeReport
where
    T: Real,
{
    let mut report = MergeReport::default();
    if open.is_empty() {
        return report;
    }

    let gap = T::from(MERGE_GAP_TOLERANCE).unwrap();
    let iteration_limit = open.len() + 1;
    let mut pass = 0usize;

    while !open.is_empty() && pass < iteration_limit {
        pass += 1;

        for i in 0..open.len() {
            if open[i].is_empty() || open[i].is_closed() {
                continue;
            }

            let back = match open[i].last() {
                Some(v) => v,
                None => continue,
            };

            let mut min_dist = <T as Real>::max_value();
            let mut nearest = None;
            for (j, candidate) in open.iter().enumerate() {
                let front = match candidate.first() {
                    Some(v) => v,
                    None => continue,
                };
                let dist = (front - back).length();
                if dist < min_dist {
                    min_dist = dist;
                    nearest = Some(j);
                }
            }

            let j = match nearest {
                Some(j) => j,
                None => continue,
            };

            if i == j {
                close_if_possible(&mut open[i], gap);
            } else if min_dist <= gap {
                let mut source = std::mem::take(&mut open[j]);
                open[i].extend_vertexes(&source);
                source.clear();
                open[j] = source;
            }

            if open[i].is_closed() {
                let mut poly = std::mem::take(&mut open[i]);
                let result = validate(&mut poly, DEFAULT_NEIGHBORHOOD);
                poly.has_intersections = !result.intersection_free;
                report.self_intersections += poly.self_intersections.len();
                closed.push(poly);
            }
        }

        open.retain(|poly| !poly.is_empty() && !poly.is_closed());
    }

    report
}

/// Salvage pass over polylines the merge could not close: any open polyline with more than two
/// vertexes whose endpoints are within [REMAINING_CLOSE_TOLERANCE] is force closed and moved to
/// `closed`.
pub fn close_remaining<T>(open: &mut Vec<PolyLine<T>>, closed: &mut Vec<PolyLine<T>>)
where
    T: Real,
{
    let tolerance = T::from(REMAINING_CLOSE_TOLERANCE).unwrap();

    let mut remaining = Vec::new();
    for mut poly in open.drain(..) {
        let can_close = poly.len() > 2
            && match (poly.first(), poly.last()) {
                (Some(front), Some(back)) => is_mergeable(front, back, tolerance),
                _ => false,
            };

        if can_close {
            poly.close();
            poly.update_contour_mode();
            closed.push(poly);
        } else {
            remaining.push(poly);
        }
    }

    *open = remaining;
}

/// Demotes every remaining open polyline to [ContourMode::OpenLine](super::ContourMode) and
/// appends it to the closed collection so writers that want every trace can see them.
pub fn include_open_contours<T>(open: &mut Vec<PolyLine<T>>, closed: &mut Vec<PolyLine<T>>)
where
    T: Real,
{
    for mut poly in open.drain(..) {
        poly.contour_mode = ContourMode::OpenLine;
        closed.push(poly);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_if_possible_within_gap() {
        let mut poly = polyline_open![
            (0.0, 0.0),
            (10.0, 0.0),
            (10.0, 10.0),
            (0.0, 10.0),
            (0.1, 0.2),
        ];
        close_if_possible(&mut poly, 1.0);
        assert!(poly.is_closed());
        assert!(poly.ends_coincide());
    }

    #[test]
    fn close_if_possible_gap_too_wide() {
        let mut poly = polyline_open![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (5.0, 5.0)];
        close_if_possible(&mut poly, 1.0);
        assert!(!poly.is_closed());
    }

    #[test]
    fn merge_joins_two_fragments_into_one_loop() {
        let first = polyline_open![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)];
        let second = polyline_open![(10.0, 10.2), (0.0, 10.0), (0.0, 0.3)];

        let mut open = vec![first, second];
        let mut closed = Vec::new();
        merge_nearest_neighbor(&mut open, &mut closed);

        assert!(open.is_empty());
        assert_eq!(closed.len(), 1);
        assert!(closed[0].is_closed());
        assert!(closed[0].len() >= 6);
    }

    #[test]
    fn merge_terminates_with_unmergeable_fragments() {
        let stranded_a = polyline_open![(0.0, 0.0), (3.0, 0.0)];
        let stranded_b = polyline_open![(50.0, 50.0), (53.0, 50.0)];

        let mut open = vec![stranded_a, stranded_b];
        let mut closed = Vec::new();
        merge_nearest_neighbor(&mut open, &mut closed);

        // nothing can merge across a 50 mm gap, fragments stay open
        assert_eq!(open.len(), 2);
        assert!(closed.is_empty());
    }

    #[test]
    fn close_remaining_uses_tighter_tolerance() {
        let nearly_closed = polyline_open![(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 0.3)];
        let wide_open = polyline_open![(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 2.0)];

        let mut open = vec![nearly_closed, wide_open];
        let mut closed = Vec::new();
        close_remaining(&mut open, &mut closed);

        assert_eq!(closed.len(), 1);
        assert_eq!(open.len(), 1);
        assert!(closed[0].is_closed());
    }
}
