use super::Vector2;
use crate::core::traits::Real;

/// Default fraction of the parametric range excluded at both segment ends when testing for a
/// proper intersection. Keeps endpoint grazes between consecutive contour segments from being
/// reported as self intersections.
pub const INTERSECT_END_EXCLUSION: f64 = 5e-2;

/// Finds the proper intersection between the line segments `p1->p2` and `p3->p4`.
///
/// Works in determinant form: both parametric coordinates must lie strictly inside
/// `(tolerance, 1 - tolerance)` for a point to be reported, so touching endpoints and
/// near-parallel segments yield `None`.
pub fn seg_seg_intr_eps<T>(
    p1: Vector2<T>,
    p2: Vector2<T>,
    p3: Vector2<T>,
    p4: Vector2<T>,
    tolerance: T,
) -> Option<Vector2<T>>
where
    T: Real,
{
    // https://de.wikipedia.org/w/index.php?title=Schnittpunkt&oldid=169771750
    let determinant = p1.x * (p4.y - p3.y)
        + p2.x * (p3.y - p4.y)
        + p4.x * (p2.y - p1.y)
        + p3.x * (p1.y - p2.y);

    if determinant.fuzzy_eq_zero_eps(T::epsilon()) {
        return None;
    }

    let s =
        (p1.x * (p4.y - p3.y) + p3.x * (p1.y - p4.y) + p4.x * (p3.y - p1.y)) / determinant;
    let t =
        -(p1.x * (p3.y - p2.y) + p2.x * (p1.y - p3.y) + p3.x * (p2.y - p1.y)) / determinant;

    let upper = T::one() - tolerance;
    if tolerance < s && s < upper && tolerance < t && t < upper {
        return Some(p1 + (p2 - p1).scale(s));
    }

    None
}

/// Same as [seg_seg_intr_eps] using the default [INTERSECT_END_EXCLUSION] tolerance.
///
/// # Examples
///
/// ```
/// # use isoslice::core::math::*;
/// let intr = seg_seg_intr(
///     Vector2::new(3.0, 0.0),
///     Vector2::new(3.0, 10.0),
///     Vector2::new(0.0, 2.0),
///     Vector2::new(5.0, 2.0),
/// )
/// .unwrap();
/// assert!(intr.fuzzy_eq(Vector2::new(3.0, 2.0)));
///
/// // parallel segments have no intersection
/// assert!(seg_seg_intr(
///     Vector2::new(0.0, 0.0),
///     Vector2::new(0.0, 10.0),
///     Vector2::new(5.0, 0.0),
///     Vector2::new(5.0, 20.0),
/// )
/// .is_none());
/// ```
#[inline]
pub fn seg_seg_intr<T>(
    p1: Vector2<T>,
    p2: Vector2<T>,
    p3: Vector2<T>,
    p4: Vector2<T>,
) -> Option<Vector2<T>>
where
    T: Real,
{
    seg_seg_intr_eps(p1, p2, p3, p4, T::from(INTERSECT_END_EXCLUSION).unwrap())
}

/// Finds the intersection between the infinite lines through `p1->p2` and `p3->p4`.
///
/// Returns `None` when the lines are parallel or nearly parallel (epsilon guard on the
/// denominator).
pub fn line_line_intr<T>(
    p1: Vector2<T>,
    p2: Vector2<T>,
    p3: Vector2<T>,
    p4: Vector2<T>,
) -> Option<Vector2<T>>
where
    T: Real,
{
    let determinant = (p4.y - p3.y) * (p2.x - p1.x) - (p2.y - p1.y) * (p4.x - p3.x);

    if determinant.fuzzy_eq_zero_eps(T::epsilon()) {
        return None;
    }

    let x = ((p4.x - p3.x) * (p2.x * p1.y - p1.x * p2.y)
        - (p2.x - p1.x) * (p4.x * p3.y - p3.x * p4.y))
        / determinant;
    let y = ((p1.y - p2.y) * (p4.x * p3.y - p3.x * p4.y)
        - (p3.y - p4.y) * (p2.x * p1.y - p1.x * p2.y))
        / determinant;

    Some(Vector2::new(x, y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::math::vec2;
    use crate::core::traits::FuzzyEq;

    #[test]
    fn proper_intersection() {
        let intr = seg_seg_intr(vec2(3.0, 0.0), vec2(3.0, 10.0), vec2(0.0, 2.0), vec2(5.0, 2.0))
            .expect("segments cross");
        assert_fuzzy_eq!(intr.x, 3.0);
        assert_fuzzy_eq!(intr.y, 2.0);
    }

    #[test]
    fn parallel_segments() {
        assert!(
            seg_seg_intr(vec2(0.0, 0.0), vec2(0.0, 10.0), vec2(5.0, 0.0), vec2(5.0, 20.0))
                .is_none()
        );
    }

    #[test]
    fn endpoint_graze_excluded() {
        // segments share an endpoint, parametric coordinates sit at the range bounds
        assert!(
            seg_seg_intr(vec2(0.0, 0.0), vec2(5.0, 0.0), vec2(5.0, 0.0), vec2(5.0, 5.0))
                .is_none()
        );
    }

    #[test]
    fn infinite_lines_intersect_beyond_segments() {
        let intr = line_line_intr(vec2(0.0, 0.0), vec2(1.0, 0.0), vec2(4.0, 1.0), vec2(4.0, 2.0))
            .expect("lines cross");
        assert_fuzzy_eq!(intr.x, 4.0);
        assert_fuzzy_eq!(intr.y, 0.0);
    }

    #[test]
    fn parallel_lines_have_no_intersection() {
        assert!(
            line_line_intr(vec2(0.0, 0.0), vec2(1.0, 1.0), vec2(0.0, 1.0), vec2(1.0, 2.0))
                .is_none()
        );
    }
}
