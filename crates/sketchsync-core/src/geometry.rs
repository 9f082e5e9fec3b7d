//! Geometry helpers shared by hit-testing, anchors and resizing.

use std::f64::consts::PI;

use kurbo::{BezPath, Point, Rect, Vec2};

/// Hit tolerance for thin shapes, in screen pixels.
pub const HIT_TOLERANCE_PX: f64 = 8.0;

/// Distance from a point to a line segment (a to b).
pub fn point_to_segment_dist(point: Point, a: Point, b: Point) -> f64 {
    let seg = b - a;
    let pv = point - a;
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON {
        return pv.hypot();
    }
    let t = (pv.dot(seg) / len_sq).clamp(0.0, 1.0);
    point.distance(a + seg * t)
}

/// Minimum distance from a point to a polyline (sequence of connected segments).
pub fn point_to_polyline_dist(point: Point, points: &[Point]) -> f64 {
    points
        .windows(2)
        .map(|w| point_to_segment_dist(point, w[0], w[1]))
        .fold(f64::INFINITY, f64::min)
}

/// Even-odd containment test against a closed polygon.
pub fn polygon_contains(vertices: &[Point], point: Point) -> bool {
    if vertices.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = vertices.len() - 1;
    for i in 0..vertices.len() {
        let (a, b) = (vertices[i], vertices[j]);
        if (a.y > point.y) != (b.y > point.y) {
            let cross_x = a.x + (point.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if point.x < cross_x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Normalized ellipse containment for the ellipse inscribed in `rect`.
///
/// Degenerate ellipses (zero radius on either axis) contain nothing.
pub fn ellipse_contains(rect: Rect, point: Point) -> bool {
    let rx = rect.width().abs() / 2.0;
    let ry = rect.height().abs() / 2.0;
    if rx <= 0.0 || ry <= 0.0 {
        return false;
    }
    let c = rect.center();
    let dx = (point.x - c.x) / rx;
    let dy = (point.y - c.y) / ry;
    dx * dx + dy * dy <= 1.0
}

/// Triangle with its apex at the top center.
pub fn triangle_vertices(rect: Rect) -> Vec<Point> {
    vec![
        Point::new(rect.center().x, rect.y0),
        Point::new(rect.x1, rect.y1),
        Point::new(rect.x0, rect.y1),
    ]
}

/// Diamond through the box edge midpoints.
pub fn diamond_vertices(rect: Rect) -> Vec<Point> {
    let c = rect.center();
    vec![
        Point::new(c.x, rect.y0),
        Point::new(rect.x1, c.y),
        Point::new(c.x, rect.y1),
        Point::new(rect.x0, c.y),
    ]
}

/// Six points on the inscribed ellipse at 60 degree steps.
pub fn hexagon_vertices(rect: Rect) -> Vec<Point> {
    let c = rect.center();
    let (rx, ry) = (rect.width() / 2.0, rect.height() / 2.0);
    (0..6)
        .map(|i| {
            let angle = i as f64 * PI / 3.0;
            Point::new(c.x + rx * angle.cos(), c.y + ry * angle.sin())
        })
        .collect()
}

/// Inner radius of a star as a fraction of the outer radius.
pub const STAR_INNER_RATIO: f64 = 0.4;

/// Spike counts outside this range are clamped.
pub const STAR_MIN_SPIKES: u32 = 3;
pub const STAR_MAX_SPIKES: u32 = 64;

/// `2n` alternating outer/inner vertices, first spike pointing up.
pub fn star_vertices(rect: Rect, spikes: u32) -> Vec<Point> {
    let n = spikes.clamp(STAR_MIN_SPIKES, STAR_MAX_SPIKES) as usize;
    let c = rect.center();
    let (rx, ry) = (rect.width() / 2.0, rect.height() / 2.0);
    (0..n * 2)
        .map(|i| {
            let angle = -PI / 2.0 + i as f64 * PI / n as f64;
            let scale = if i % 2 == 0 { 1.0 } else { STAR_INNER_RATIO };
            Point::new(c.x + rx * scale * angle.cos(), c.y + ry * scale * angle.sin())
        })
        .collect()
}

/// Closed path through the given vertices.
pub fn polygon_path(vertices: &[Point]) -> BezPath {
    let mut path = BezPath::new();
    if let Some((first, rest)) = vertices.split_first() {
        path.move_to(*first);
        for p in rest {
            path.line_to(*p);
        }
        path.close_path();
    }
    path
}

/// Open path through the given points.
pub fn polyline_path(points: &[Point]) -> BezPath {
    let mut path = BezPath::new();
    if let Some((first, rest)) = points.split_first() {
        path.move_to(*first);
        for p in rest {
            path.line_to(*p);
        }
    }
    path
}

/// Filled arrowhead at `tip`, pointing away from `from`.
pub fn arrowhead_path(from: Point, tip: Point, head_len: f64) -> BezPath {
    let dir = tip - from;
    let angle = dir.y.atan2(dir.x);
    let wing = |offset: f64| {
        tip - Vec2::new(head_len * (angle + offset).cos(), head_len * (angle + offset).sin())
    };
    polygon_path(&[tip, wing(-PI / 6.0), wing(PI / 6.0)])
}

/// Rectangle spanned by two corners, normalized so `x0 <= x1` and `y0 <= y1`.
pub fn normalized_rect(a: Point, b: Point) -> Rect {
    Rect::from_points(a, b)
}

/// Whether two rectangles overlap with positive area.
pub fn rects_overlap(a: Rect, b: Rect) -> bool {
    a.x0 < b.x1 && a.x1 > b.x0 && a.y0 < b.y1 && a.y1 > b.y0
}

/// Containment that includes the boundary.
pub fn rect_contains_inclusive(rect: Rect, point: Point) -> bool {
    point.x >= rect.x0 && point.x <= rect.x1 && point.y >= rect.y0 && point.y <= rect.y1
}
