use crate::core::{
    math::{dist_squared, vec2, Vector2},
    traits::Real,
};
use thiserror::Error;

/// Raised when a point outside the root rectangle is inserted into the quadtree.
#[derive(Debug, Error, PartialEq)]
#[error("point ({x}, {y}) lies outside of the quadtree domain")]
pub struct OutOfDomain {
    pub x: f64,
    pub y: f64,
}

/// Surface sample point carrying its outward normal.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PointWithNormal<T = f64> {
    pub position: Vector2<T>,
    pub normal: Vector2<T>,
}

impl<T> PointWithNormal<T>
where
    T: Real,
{
    pub fn new(position: Vector2<T>, normal: Vector2<T>) -> Self {
        PointWithNormal { position, normal }
    }
}

/// Axis aligned rectangle spanned by `start` (min corner) and `end` (max corner).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect<T = f64> {
    pub start: Vector2<T>,
    pub end: Vector2<T>,
}

impl<T> Rect<T>
where
    T: Real,
{
    pub fn new(start: Vector2<T>, end: Vector2<T>) -> Self {
        Rect { start, end }
    }

    pub fn center(&self) -> Vector2<T> {
        (self.start + self.end).scale(T::half())
    }

    /// Half-open containment `[start, end)` so that after subdivision every point belongs to
    /// exactly one child.
    pub fn contains_half_open(&self, point: Vector2<T>) -> bool {
        point.x >= self.start.x
            && point.x < self.end.x
            && point.y >= self.start.y
            && point.y < self.end.y
    }

    /// Closed containment, used for membership in search rectangles.
    pub fn contains(&self, point: Vector2<T>) -> bool {
        point.x >= self.start.x
            && point.x <= self.end.x
            && point.y >= self.start.y
            && point.y <= self.end.y
    }

    /// True if the two rectangles overlap.
    pub fn intersects(&self, other: &Rect<T>) -> bool {
        self.start.x < other.end.x
            && other.start.x < self.end.x
            && self.start.y < other.end.y
            && other.start.y < self.end.y
    }

    /// Length of the diagonal.
    pub fn diameter(&self) -> T {
        (self.end - self.start).length()
    }
}

/// Index of a node in the quadtree arena.
pub type NodeId = usize;

#[derive(Debug, Clone)]
struct QuadNode<T> {
    rect: Rect<T>,
    parent: Option<NodeId>,
    children: Option<[NodeId; 4]>,
    point: Option<PointWithNormal<T>>,
}

impl<T> QuadNode<T> {
    fn is_leaf(&self) -> bool {
        self.children.is_none()
    }
}

/// Recursively subdivided spatial index over 2D points with normals.
///
/// Each leaf stores at most one point; inserting a second point into a leaf subdivides its
/// rectangle into four quadrants. Nodes live in an arena (`Vec`) and refer to each other by
/// index, so pruning on removal is an index walk up the parent chain rather than a back-pointer
/// chase. Pruned nodes stay allocated until the tree is dropped; the tree only lives for the
/// duration of one point cloud ingest.
///
/// Callers must not insert two points with identical coordinates.
#[derive(Debug, Clone)]
pub struct QuadTree<T = f64> {
    nodes: Vec<QuadNode<T>>,
    len: usize,
}

impl<T> QuadTree<T>
where
    T: Real,
{
    /// Create an empty tree covering `rect`.
    pub fn new(rect: Rect<T>) -> Self {
        QuadTree {
            nodes: vec![QuadNode {
                rect,
                parent: None,
                children: None,
                point: None,
            }],
            len: 0,
        }
    }

    /// Number of points currently stored.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Insert a point, subdividing leaves as needed.
    pub fn insert(&mut self, point: PointWithNormal<T>) -> Result<(), OutOfDomain> {
        if !self.nodes[0].rect.contains_half_open(point.position) {
            return Err(OutOfDomain {
                x: point.position.x.to_f64().unwrap_or(f64::NAN),
                y: point.position.y.to_f64().unwrap_or(f64::NAN),
            });
        }

        let mut node = 0;
        loop {
            if self.nodes[node].is_leaf() {
                if self.nodes[node].point.is_none() {
                    self.nodes[node].point = Some(point);
                    self.len += 1;
                    return Ok(());
                }

                // occupied leaf: subdivide and relocate the incumbent before descending
                self.split(node);
                if let Some(incumbent) = self.nodes[node].point.take() {
                    let child = self.child_containing(node, incumbent.position);
                    self.nodes[child].point = Some(incumbent);
                }
            }

            node = self.child_containing(node, point.position);
        }
    }

    /// Locates the deepest leaf whose rectangle contains `position`; `None` if outside the root.
    pub fn find(&self, position: Vector2<T>) -> Option<NodeId> {
        if !self.nodes[0].rect.contains_half_open(position) {
            return None;
        }

        let mut node = 0;
        while !self.nodes[node].is_leaf() {
            node = self.child_containing(node, position);
        }

        Some(node)
    }

    /// Point stored at the given node, if any.
    pub fn point_at(&self, node: NodeId) -> Option<PointWithNormal<T>> {
        self.nodes.get(node).and_then(|n| n.point)
    }

    /// Collects every stored point within the axis aligned square of half-extent `max_distance`
    /// centered on `position`.
    pub fn find_neighbors(&self, position: Vector2<T>, max_distance: T) -> Vec<PointWithNormal<T>> {
        let search = Rect::new(
            position - vec2(max_distance, max_distance),
            position + vec2(max_distance, max_distance),
        );

        let mut neighbors = Vec::new();
        let mut stack = vec![0];
        while let Some(node) = stack.pop() {
            let n = &self.nodes[node];
            if !search.intersects(&n.rect) {
                continue;
            }

            if let Some(children) = n.children {
                stack.extend(children);
                continue;
            }

            if let Some(point) = n.point {
                if search.contains(point.position) {
                    neighbors.push(point);
                }
            }
        }

        neighbors
    }

    /// Nearest stored point to `position`, or `None` for an empty tree or a position outside
    /// the root rectangle.
    ///
    /// The leaf containing the position bounds the search radius; an empty leaf falls back to
    /// the tree diameter.
    pub fn find_nearest(&self, position: Vector2<T>) -> Option<PointWithNormal<T>> {
        let leaf = self.find(position)?;
        let radius = match self.nodes[leaf].point {
            Some(point) => (point.position - position).length(),
            None => self.nodes[0].rect.diameter(),
        };

        self.find_neighbors(position, radius)
            .into_iter()
            .min_by(|a, b| {
                let da = dist_squared(a.position, position);
                let db = dist_squared(b.position, position);
                da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
            })
            .or(self.nodes[leaf].point)
    }

    /// Removes the point at `position` (if stored), pruning subtrees left with four empty
    /// child leaves.
    pub fn remove(&mut self, position: Vector2<T>) {
        let Some(leaf) = self.find(position) else {
            return;
        };

        let matches = self.nodes[leaf]
            .point
            .map(|p| p.position.fuzzy_eq(position))
            .unwrap_or(false);
        if !matches {
            return;
        }

        self.nodes[leaf].point = None;
        self.len -= 1;

        let mut parent = self.nodes[leaf].parent;
        while let Some(node) = parent {
            let all_empty_leaves = match self.nodes[node].children {
                Some(children) => children
                    .iter()
                    .all(|&c| self.nodes[c].is_leaf() && self.nodes[c].point.is_none()),
                None => false,
            };

            if !all_empty_leaves {
                break;
            }

            self.nodes[node].children = None;
            parent = self.nodes[node].parent;
        }
    }

    /// Returns any stored point; used as a seed for polyline tracing.
    pub fn any_point(&self) -> Option<PointWithNormal<T>> {
        let mut stack = vec![0];
        while let Some(node) = stack.pop() {
            let n = &self.nodes[node];
            if let Some(children) = n.children {
                stack.extend(children);
                continue;
            }
            if n.point.is_some() {
                return n.point;
            }
        }

        None
    }

    fn split(&mut self, node: NodeId) {
        let rect = self.nodes[node].rect;
        let center = rect.center();

        let quadrants = [
            Rect::new(rect.start, center),
            Rect::new(vec2(center.x, rect.start.y), vec2(rect.end.x, center.y)),
            Rect::new(vec2(rect.start.x, center.y), vec2(center.x, rect.end.y)),
            Rect::new(center, rect.end),
        ];

        let first_child = self.nodes.len();
        for quadrant in quadrants {
            self.nodes.push(QuadNode {
                rect: quadrant,
                parent: Some(node),
                children: None,
                point: None,
            });
        }

        self.nodes[node].children = Some([
            first_child,
            first_child + 1,
            first_child + 2,
            first_child + 3,
        ]);
    }

    /// Child quadrant index lookup by comparing against the rect center.
    fn child_containing(&self, node: NodeId, position: Vector2<T>) -> NodeId {
        let children = self.nodes[node]
            .children
            .expect("child_containing called on leaf");
        let center = self.nodes[node].rect.center();

        let mut index = 0;
        if position.x >= center.x {
            index += 1;
        }
        if position.y >= center.y {
            index += 2;
        }

        children[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_normal<T: Real>() -> Vector2<T> {
        vec2(T::zero(), T::one())
    }

    fn tree_with_points(points: &[(f64, f64)]) -> QuadTree<f64> {
        let mut tree = QuadTree::new(Rect::new(vec2(0.0, 0.0), vec2(100.0, 100.0)));
        for &(x, y) in points {
            tree.insert(PointWithNormal::new(vec2(x, y), unit_normal()))
                .unwrap();
        }
        tree
    }

    #[test]
    fn insert_outside_domain_fails() {
        let mut tree = tree_with_points(&[]);
        let result = tree.insert(PointWithNormal::new(vec2(150.0, 1.0), unit_normal()));
        assert!(result.is_err());
    }

    #[test]
    fn inserted_point_is_findable_for_any_radius() {
        let tree = tree_with_points(&[(10.0, 10.0), (20.0, 30.0), (70.0, 80.0)]);

        for eps in [1e-6, 0.5, 5.0] {
            let neighbors = tree.find_neighbors(vec2(20.0, 30.0), eps);
            assert!(neighbors.iter().any(|p| p.position.fuzzy_eq(vec2(20.0, 30.0))));
        }
    }

    #[test]
    fn find_neighbors_respects_search_square() {
        let tree = tree_with_points(&[(10.0, 10.0), (12.0, 10.0), (40.0, 40.0)]);

        let neighbors = tree.find_neighbors(vec2(11.0, 10.0), 3.0);
        assert_eq!(neighbors.len(), 2);
    }

    #[test]
    fn find_nearest_returns_closest() {
        let tree = tree_with_points(&[(10.0, 10.0), (50.0, 50.0), (51.0, 52.0)]);

        let nearest = tree.find_nearest(vec2(49.0, 50.0)).unwrap();
        assert!(nearest.position.fuzzy_eq(vec2(50.0, 50.0)));
    }

    #[test]
    fn remove_prunes_empty_subtrees() {
        let mut tree = tree_with_points(&[(10.0, 10.0), (11.0, 11.0)]);
        assert_eq!(tree.len(), 2);

        tree.remove(vec2(10.0, 10.0));
        tree.remove(vec2(11.0, 11.0));

        assert!(tree.is_empty());
        assert!(tree.any_point().is_none());
        // pruning collapsed everything back into a single root leaf
        assert!(tree.nodes[0].is_leaf());
    }

    #[test]
    fn any_point_seeds_tracing() {
        let tree = tree_with_points(&[(5.0, 5.0)]);
        let seed = tree.any_point().unwrap();
        assert!(seed.position.fuzzy_eq(vec2(5.0, 5.0)));
    }

    #[test]
    fn boundary_points_belong_to_one_child() {
        // point exactly on the subdivision center line
        let tree = tree_with_points(&[(50.0, 50.0), (25.0, 25.0)]);
        assert_eq!(tree.len(), 2);
        assert!(tree
            .find_neighbors(vec2(50.0, 50.0), 0.1)
            .iter()
            .any(|p| p.position.fuzzy_eq(vec2(50.0, 50.0))));
    }
}
