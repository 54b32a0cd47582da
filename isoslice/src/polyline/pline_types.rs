//! Supporting public types used in [PolyLine](crate::polyline::PolyLine) methods.

/// Role of a polyline within a slice.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ContourMode {
    /// Closed contour bounding a hole, clockwise winding, negative area.
    Inner,
    /// Closed contour bounding solid material, counter clockwise winding, positive area.
    Outer,
    /// Polyline that could not be closed.
    OpenLine,
    /// Polyline excluded from the slice. Terminal: later passes never rewrite an excluded
    /// polyline.
    ExcludeFromSlice,
}

impl Default for ContourMode {
    fn default() -> Self {
        ContourMode::OpenLine
    }
}
