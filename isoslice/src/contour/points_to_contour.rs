use super::{PointWithNormal, QuadTree};
use crate::core::{
    math::{dist_squared, line_line_intr},
    traits::Real,
};
use crate::polyline::{close_if_possible, PolyLine};

/// Cost of connecting `start` to `end` while chaining a point cloud into a polyline.
///
/// The tangent lines through both points (normal rotated -90 degrees) are intersected; when they
/// meet, the cost is the sum of squared distances from the intersection to both points, which
/// penalizes connections that bend away from the local surface direction. Parallel tangents fall
/// back to the squared point distance.
pub fn connection_cost<T>(start: &PointWithNormal<T>, end: &PointWithNormal<T>) -> T
where
    T: Real,
{
    let start_tangent = start.normal.tangent();
    let end_tangent = end.normal.tangent();

    let tangent_intersection = line_line_intr(
        start.position,
        start.position + start_tangent,
        end.position,
        end.position + end_tangent,
    );

    match tangent_intersection {
        Some(point) => dist_squared(point, start.position) + dist_squared(point, end.position),
        None => dist_squared(end.position, start.position),
    }
}

/// Chains the points of a cloud into polylines by repeatedly walking to the cheapest neighbor
/// within `max_vertex_distance`.
///
/// Consumes the tree: every point ends up in exactly one polyline. Chains whose endpoints meet
/// within `max_vertex_distance` are closed.
pub fn convert_to_polylines<T>(
    point_cloud: &mut QuadTree<T>,
    max_vertex_distance: T,
) -> Vec<PolyLine<T>>
where
    T: Real,
{
    let mut polylines = Vec::new();

    while let Some(start) = point_cloud.any_point() {
        let mut poly = PolyLine::new();
        poly.add_vertex(start.position);

        let mut current = start;
        point_cloud.remove(current.position);

        loop {
            let neighbors = point_cloud.find_neighbors(current.position, max_vertex_distance);
            let best = neighbors.into_iter().min_by(|a, b| {
                let ca = connection_cost(&current, a);
                let cb = connection_cost(&current, b);
                ca.partial_cmp(&cb).unwrap_or(std::cmp::Ordering::Equal)
            });

            let Some(best) = best else {
                break;
            };

            poly.add_vertex(best.position);
            point_cloud.remove(best.position);
            current = best;
        }

        close_if_possible(&mut poly, max_vertex_distance);
        polylines.push(poly);
    }

    polylines
}
