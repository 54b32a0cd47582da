mod test_extractor_post_processing {
    use isoslice::contour::ContourExtractor;
    use isoslice::polyline::{validate, ContourMode, PolyLine, DEFAULT_NEIGHBORHOOD};
    use isoslice::polyline_closed;

    #[test]
    fn single_outer_square() {
        let square = polyline_closed![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)];

        let mut extractor = ContourExtractor::<f64>::new();
        extractor.contour_mut().push(square);
        extractor.run_post_processing();

        let contour = extractor.contour();
        assert_eq!(contour.len(), 1);
        assert!(contour[0].is_closed());
        assert_eq!(contour[0].contour_mode, ContourMode::Outer);
        assert!((contour[0].area - 100.0).abs() < 1e-6);
        // counter clockwise winding preserved
        assert!(contour[0].signed_area() > 0.0);
    }

    #[test]
    fn square_with_centered_hole() {
        let outer = polyline_closed![(0.0, 0.0), (20.0, 0.0), (20.0, 20.0), (0.0, 20.0)];
        // the hole arrives counter clockwise as well; the containment pass must flip it
        let inner = polyline_closed![(5.0, 5.0), (15.0, 5.0), (15.0, 15.0), (5.0, 15.0)];

        let mut extractor = ContourExtractor::<f64>::new();
        extractor.contour_mut().push(outer);
        extractor.contour_mut().push(inner);
        extractor.run_post_processing();

        let contour = extractor.contour();
        assert_eq!(contour.len(), 2);

        assert_eq!(contour[0].contour_mode, ContourMode::Outer);
        assert!((contour[0].area - 400.0).abs() < 1e-6);
        assert!(contour[0].signed_area() > 0.0);

        assert_eq!(contour[1].contour_mode, ContourMode::Inner);
        assert!((contour[1].area + 100.0).abs() < 1e-6);
        // vertex order was reversed to clockwise
        assert!(contour[1].signed_area() < 0.0);
    }

    #[test]
    fn nested_holes() {
        let outer = polyline_closed![(0.0, 0.0), (20.0, 0.0), (20.0, 20.0), (0.0, 20.0)];
        let hole1 = polyline_closed![(2.0, 2.0), (8.0, 2.0), (8.0, 8.0), (2.0, 8.0)];
        let hole2 = polyline_closed![(12.0, 12.0), (18.0, 12.0), (18.0, 18.0), (12.0, 18.0)];

        let mut extractor = ContourExtractor::<f64>::new();
        extractor.contour_mut().push(outer);
        extractor.contour_mut().push(hole1);
        extractor.contour_mut().push(hole2);
        extractor.run_post_processing();

        let contour = extractor.contour();
        assert_eq!(contour.len(), 3);
        assert!((contour[0].area - 400.0).abs() < 1e-6);
        assert!((contour[1].area + 36.0).abs() < 1e-6);
        assert!((contour[2].area + 36.0).abs() < 1e-6);
        assert_eq!(contour[0].contour_mode, ContourMode::Outer);
        assert_eq!(contour[1].contour_mode, ContourMode::Inner);
        assert_eq!(contour[2].contour_mode, ContourMode::Inner);
    }

    #[test]
    fn degenerate_collinear_polyline_is_excluded() {
        let degenerate = polyline_closed![(0.0, 0.0), (5.0, 5.0), (10.0, 10.0)];

        let mut extractor = ContourExtractor::<f64>::new();
        extractor.contour_mut().push(degenerate);
        extractor.run_post_processing();

        let contour = extractor.contour();
        assert_eq!(contour.len(), 1);
        assert!(contour[0].area.abs() < 1e-6);
        assert_eq!(contour[0].contour_mode, ContourMode::ExcludeFromSlice);
        assert_eq!(extractor.slice_quality().excluded_polylines, 1);
    }

    #[test]
    fn self_intersecting_polyline_is_counted() {
        let mut bowtie: PolyLine<f64> =
            polyline_closed![(0.0, 0.0), (5.0, 0.0), (5.0, 5.0), (6.0, 4.0), (0.0, 5.0)];

        let result = validate(&mut bowtie, DEFAULT_NEIGHBORHOOD);
        assert!(!result.intersection_free);
        assert!(!bowtie.self_intersections.is_empty());

        let mut extractor = ContourExtractor::<f64>::new();
        extractor.contour_mut().push(bowtie);
        extractor.run_post_processing();

        assert!(extractor.slice_quality().self_intersections >= 1);
        assert!(extractor.contour()[0].has_intersections);
    }

    #[test]
    fn quality_counts_enclosed_area_and_closed_polylines() {
        let square = polyline_closed![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)];

        let mut extractor = ContourExtractor::<f64>::new();
        extractor.contour_mut().push(square);
        extractor.set_expected_vertices(10);
        extractor.run_post_processing();

        let quality = extractor.slice_quality();
        assert_eq!(quality.closed_polylines, 1);
        assert!((quality.enclosed_area - 100.0).abs() < 1e-6);
        assert_eq!(quality.considered_vertices, 5);
        assert_eq!(quality.unused_vertices, 5);
    }
}
