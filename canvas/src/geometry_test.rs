#![allow(clippy::clone_on_copy, clippy::float_cmp)]

use super::*;

const EPSILON: f64 = 1e-9;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

fn pt(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

// =============================================================
// Rect
// =============================================================

#[test]
fn rect_from_corners_normalises() {
    let r = Rect::from_corners(pt(50.0, 40.0), pt(10.0, 10.0));
    assert_eq!(r, Rect { min_x: 10.0, min_y: 10.0, max_x: 50.0, max_y: 40.0 });
    assert_eq!(r.width(), 40.0);
    assert_eq!(r.height(), 30.0);
    assert_eq!(r.center(), pt(30.0, 25.0));
}

#[test]
fn rect_from_origin_size() {
    let r = Rect::from_origin_size(5.0, 6.0, 10.0, 20.0);
    assert_eq!(r, Rect { min_x: 5.0, min_y: 6.0, max_x: 15.0, max_y: 26.0 });
}

#[test]
fn rect_bounding_empty_is_none() {
    let points: Vec<Point> = Vec::new();
    assert!(Rect::bounding(&points).is_none());
}

#[test]
fn rect_bounding_covers_all_points() {
    let points = vec![pt(3.0, 9.0), pt(-2.0, 4.0), pt(7.0, -1.0)];
    let r = Rect::bounding(&points).unwrap();
    assert_eq!(r, Rect { min_x: -2.0, min_y: -1.0, max_x: 7.0, max_y: 9.0 });
}

#[test]
fn rect_contains_is_inclusive() {
    let r = Rect::from_corners(pt(0.0, 0.0), pt(10.0, 10.0));
    assert!(r.contains(pt(0.0, 10.0)));
    assert!(r.contains(pt(5.0, 5.0)));
    assert!(!r.contains(pt(10.1, 5.0)));
}

#[test]
fn rect_union_and_padding() {
    let a = Rect::from_corners(pt(0.0, 0.0), pt(1.0, 1.0));
    let b = Rect::from_corners(pt(5.0, -3.0), pt(6.0, 2.0));
    assert_eq!(a.union(b), Rect { min_x: 0.0, min_y: -3.0, max_x: 6.0, max_y: 2.0 });
    assert_eq!(a.padded(2.0), Rect { min_x: -2.0, min_y: -2.0, max_x: 3.0, max_y: 3.0 });
}

// =============================================================
// Containment
// =============================================================

#[test]
fn is_closed_requires_three_points_and_matching_ends() {
    assert!(!is_closed(&[pt(0.0, 0.0), pt(0.0, 0.0)]));
    assert!(is_closed(&[pt(0.0, 0.0), pt(1.0, 0.0), pt(0.0, 0.0)]));
    assert!(!is_closed(&[pt(0.0, 0.0), pt(1.0, 0.0), pt(2.0, 0.0)]));
}

#[test]
fn polygon_contains_interior_point() {
    let square = [pt(0.0, 0.0), pt(10.0, 0.0), pt(10.0, 10.0), pt(0.0, 10.0)];
    assert!(point_in_polygon(pt(5.0, 5.0), &square));
    assert!(!point_in_polygon(pt(15.0, 5.0), &square));
    assert!(!point_in_polygon(pt(5.0, -1.0), &square));
}

#[test]
fn polygon_with_too_few_vertices_contains_nothing() {
    assert!(!point_in_polygon(pt(0.0, 0.0), &[pt(-1.0, -1.0), pt(1.0, 1.0)]));
}

#[test]
fn polygon_triangle_excludes_corner_region() {
    let tri = [pt(50.0, 0.0), pt(100.0, 100.0), pt(0.0, 100.0)];
    assert!(point_in_polygon(pt(50.0, 60.0), &tri));
    assert!(!point_in_polygon(pt(5.0, 5.0), &tri));
}

#[test]
fn ellipse_contains_centre_not_corner() {
    let bounds = Rect::from_corners(pt(0.0, 0.0), pt(100.0, 50.0));
    assert!(point_in_ellipse(pt(50.0, 25.0), &bounds));
    assert!(point_in_ellipse(pt(100.0, 25.0), &bounds));
    assert!(!point_in_ellipse(pt(2.0, 2.0), &bounds));
}

#[test]
fn zero_area_ellipse_contains_nothing() {
    let flat = Rect::from_corners(pt(0.0, 10.0), pt(100.0, 10.0));
    assert!(!point_in_ellipse(pt(50.0, 10.0), &flat));
}

#[test]
fn near_any_point_is_strict() {
    let points = [pt(0.0, 0.0), pt(100.0, 0.0)];
    assert!(near_any_point(pt(3.0, 4.0), &points, 5.1));
    assert!(!near_any_point(pt(3.0, 4.0), &points, 5.0));
    assert!(!near_any_point(pt(50.0, 0.0), &points, 10.0));
}

// =============================================================
// Shape generation
// =============================================================

#[test]
fn rectangle_from_drag_has_five_corner_points() {
    let points = generate_shape_points(ShapeKind::Rectangle, pt(10.0, 10.0), pt(50.0, 40.0));
    assert_eq!(points, vec![pt(10.0, 10.0), pt(50.0, 10.0), pt(50.0, 40.0), pt(10.0, 40.0), pt(10.0, 10.0)]);
}

#[test]
fn circle_has_sixty_five_points_on_ellipse() {
    let points = generate_shape_points(ShapeKind::Circle, pt(0.0, 0.0), pt(100.0, 50.0));
    assert_eq!(points.len(), ELLIPSE_SEGMENTS + 1);
    assert_eq!(points.first(), points.last());
    assert!(approx_eq(points[0].x, 100.0));
    assert!(approx_eq(points[0].y, 25.0));
    for p in &points {
        let nx = (p.x - 50.0) / 50.0;
        let ny = (p.y - 25.0) / 25.0;
        assert!((nx * nx + ny * ny - 1.0).abs() < 1e-9);
    }
}

#[test]
fn triangle_apex_at_top_centre() {
    let points = generate_shape_points(ShapeKind::Triangle, pt(100.0, 80.0), pt(0.0, 0.0));
    assert_eq!(points, vec![pt(50.0, 0.0), pt(100.0, 80.0), pt(0.0, 80.0), pt(50.0, 0.0)]);
}

#[test]
fn line_is_two_endpoints() {
    let points = generate_shape_points(ShapeKind::Line, pt(1.0, 2.0), pt(3.0, 4.0));
    assert_eq!(points, vec![pt(1.0, 2.0), pt(3.0, 4.0)]);
}

#[test]
fn arrow_head_wings_at_thirty_degrees() {
    let points = generate_shape_points(ShapeKind::Arrow, pt(0.0, 0.0), pt(100.0, 0.0));
    assert_eq!(points.len(), 5);
    assert_eq!(points[1], pt(100.0, 0.0));
    assert_eq!(points[3], pt(100.0, 0.0));
    // Head length caps at 20 for a 100 px shaft.
    let upper = points[2];
    let lower = points[4];
    assert!(approx_eq(upper.distance(points[1]), 20.0));
    assert!(approx_eq(lower.distance(points[1]), 20.0));
    assert!(approx_eq(upper.x, 100.0 - 20.0 * (PI_OVER_6).cos()));
    assert!(approx_eq(upper.y, 20.0 * (PI_OVER_6).sin()));
    assert!(approx_eq(lower.y, -20.0 * (PI_OVER_6).sin()));
}

const PI_OVER_6: f64 = std::f64::consts::PI / 6.0;

#[test]
fn short_arrow_head_scales_with_shaft() {
    let points = generate_shape_points(ShapeKind::Arrow, pt(0.0, 0.0), pt(10.0, 0.0));
    assert!(approx_eq(points[2].distance(points[1]), 3.0));
}

#[test]
fn zero_length_arrow_degenerates_to_line() {
    let points = generate_shape_points(ShapeKind::Arrow, pt(5.0, 5.0), pt(5.0, 5.0));
    assert_eq!(points, vec![pt(5.0, 5.0), pt(5.0, 5.0)]);
}

// =============================================================
// Legacy shape inference
// =============================================================

#[test]
fn infers_each_generated_shape() {
    let (s, e) = (pt(10.0, 10.0), pt(90.0, 60.0));
    for kind in [ShapeKind::Rectangle, ShapeKind::Circle, ShapeKind::Triangle, ShapeKind::Line, ShapeKind::Arrow] {
        let points = generate_shape_points(kind, s, e);
        assert_eq!(infer_shape_kind(&points), Some(kind), "{kind:?}");
    }
}

#[test]
fn open_scribble_is_not_inferred() {
    let points = [pt(0.0, 0.0), pt(3.0, 1.0), pt(6.0, 4.0), pt(9.0, 2.0)];
    assert_eq!(infer_shape_kind(&points), None);
}

#[test]
fn closed_four_point_scribble_reads_as_triangle() {
    // Ambiguous by nature: vertex count is all the heuristic has.
    let points = [pt(0.0, 0.0), pt(3.0, 9.0), pt(7.0, 1.0), pt(0.0, 0.0)];
    assert_eq!(infer_shape_kind(&points), Some(ShapeKind::Triangle));
}
