use crate::core::traits::Real;
use crate::polyline::{ContourMode, PolyLine};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use geo_buf::buffer_multi_polygon_rounded;

/// Polygon inflation backend consumed by the contour extractor.
///
/// Implementations take the closed contour set of a slice and grow (positive `offset`) or
/// shrink (negative `offset`) it, resolving self intersections and hole topology. Joins are
/// round and paths are treated as closed polygons.
pub trait OffsetBackend<T>
where
    T: Real,
{
    fn inflate(&self, contours: &[PolyLine<T>], offset: T) -> Vec<PolyLine<T>>;
}

/// Default [OffsetBackend]: converts contours into `geo` multi polygons (holes attached to the
/// outer contour containing their sample point) and buffers them with round joins.
#[derive(Debug, Default, Clone, Copy)]
pub struct RoundJoinOffset;

impl<T> OffsetBackend<T> for RoundJoinOffset
where
    T: Real,
{
    fn inflate(&self, contours: &[PolyLine<T>], offset: T) -> Vec<PolyLine<T>> {
        let multi = to_multi_polygon(contours);
        if multi.0.is_empty() {
            return Vec::new();
        }

        let distance = offset.to_f64().unwrap_or(0.0);
        let buffered = buffer_multi_polygon_rounded(&multi, distance);

        from_multi_polygon::<T>(&buffered)
    }
}

fn ring_from_polyline<T>(poly: &PolyLine<T>) -> LineString<f64>
where
    T: Real,
{
    LineString::from(
        poly.iter()
            .map(|v| Coord {
                x: v.x.to_f64().unwrap_or(0.0),
                y: v.y.to_f64().unwrap_or(0.0),
            })
            .collect::<Vec<_>>(),
    )
}

/// Groups the closed, non-excluded contours into a multi polygon: outers (non-negative area)
/// become exteriors, inners become the interior ring of the smallest outer containing their
/// first vertex. Orphan holes are dropped.
fn to_multi_polygon<T>(contours: &[PolyLine<T>]) -> MultiPolygon<f64>
where
    T: Real,
{
    let usable: Vec<&PolyLine<T>> = contours
        .iter()
        .filter(|p| p.is_closed() && p.len() >= 3 && p.contour_mode != ContourMode::ExcludeFromSlice)
        .collect();

    let outers: Vec<&PolyLine<T>> = usable
        .iter()
        .copied()
        .filter(|p| p.signed_area() >= T::zero())
        .collect();
    let holes: Vec<&PolyLine<T>> = usable
        .iter()
        .copied()
        .filter(|p| p.signed_area() < T::zero())
        .collect();

    let mut interiors: Vec<Vec<LineString<f64>>> = vec![Vec::new(); outers.len()];
    for hole in holes {
        let sample = match hole.first() {
            Some(v) => v,
            None => continue,
        };

        let owner = outers
            .iter()
            .enumerate()
            .filter(|(_, outer)| outer.contains_point(sample))
            .min_by(|(_, a), (_, b)| {
                let aa = a.signed_area().abs();
                let ab = b.signed_area().abs();
                aa.partial_cmp(&ab).unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(i, _)| i);

        match owner {
            Some(i) => interiors[i].push(ring_from_polyline(hole)),
            None => log::debug!("dropping hole contour without an enclosing outer"),
        }
    }

    MultiPolygon::new(
        outers
            .iter()
            .copied()
            .zip(interiors)
            .map(|(outer, holes)| Polygon::new(ring_from_polyline(outer), holes))
            .collect(),
    )
}

fn polyline_from_ring<T>(ring: &LineString<f64>, mode: ContourMode) -> PolyLine<T>
where
    T: Real,
{
    let mut poly = PolyLine::with_capacity(ring.0.len());
    for coord in &ring.0 {
        poly.add(
            T::from(coord.x).unwrap_or_else(T::zero),
            T::from(coord.y).unwrap_or_else(T::zero),
        );
    }
    poly.close();

    // enforce the winding matching the role
    let area = poly.signed_area();
    match mode {
        ContourMode::Outer if area < T::zero() => poly.invert_direction(),
        ContourMode::Inner if area > T::zero() => poly.invert_direction(),
        _ => {}
    }
    poly.contour_mode = mode;
    poly.update_area();

    poly
}

fn from_multi_polygon<T>(multi: &MultiPolygon<f64>) -> Vec<PolyLine<T>>
where
    T: Real,
{
    let mut result = Vec::new();
    for polygon in &multi.0 {
        result.push(polyline_from_ring(polygon.exterior(), ContourMode::Outer));
        for interior in polygon.interiors() {
            result.push(polyline_from_ring(interior, ContourMode::Inner));
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hole_assignment_round_trip() {
        let mut outer = polyline_closed![(0.0, 0.0), (20.0, 0.0), (20.0, 20.0), (0.0, 20.0)];
        let mut hole = polyline_closed![(5.0, 5.0), (5.0, 15.0), (15.0, 15.0), (15.0, 5.0)];
        outer.contour_mode = ContourMode::Outer;
        hole.contour_mode = ContourMode::Inner;

        let multi = to_multi_polygon(&[outer, hole]);
        assert_eq!(multi.0.len(), 1);
        assert_eq!(multi.0[0].interiors().len(), 1);

        let back: Vec<PolyLine<f64>> = from_multi_polygon(&multi);
        assert_eq!(back.len(), 2);
        assert!(back[0].area >= 0.0);
        assert!(back[1].area <= 0.0);
    }

    #[test]
    fn excluded_contours_are_ignored() {
        let mut tiny = polyline_closed![(0.0, 0.0), (0.1, 0.0), (0.1, 0.1)];
        tiny.contour_mode = ContourMode::ExcludeFromSlice;

        let multi = to_multi_polygon(&[tiny]);
        assert!(multi.0.is_empty());
    }
}
