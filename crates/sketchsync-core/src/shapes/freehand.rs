//! Freehand strokes.

use kurbo::{Point, Rect};

use super::{Element, ElementBehavior, HitContext};
use crate::geometry::{point_to_polyline_dist, polyline_path};
use crate::render::{DrawContext, INK, color_or};

#[derive(Debug, Clone, Copy, Default)]
pub struct DrawingBehavior;

impl ElementBehavior for DrawingBehavior {
    fn apply_defaults(&self, element: &mut Element) {
        element.color.get_or_insert_with(|| "#333333".into());
        element.stroke_width.get_or_insert(2.0);
    }

    fn bounds(&self, element: &Element) -> Option<Rect> {
        element.points_bounds()
    }

    fn hit_test(&self, element: &Element, point: Point, ctx: &HitContext<'_>) -> bool {
        point_to_polyline_dist(point, &element.points) <= ctx.tolerance
    }

    fn draw(&self, element: &Element, ctx: &mut DrawContext<'_>) {
        if element.points.len() < 2 {
            return;
        }
        let color = color_or(element.color.as_deref(), INK);
        ctx.stroke(&polyline_path(&element.points), color, element.stroke_width.unwrap_or(2.0));
    }

    fn has_anchors(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::ElementKind;

    #[test]
    fn test_drawing_hits_any_segment() {
        let el = Element::new(ElementKind::Drawing, 0.0, 0.0).with_points(vec![
            Point::new(0.0, 0.0),
            Point::new(50.0, 0.0),
            Point::new(50.0, 50.0),
        ]);
        let ctx = HitContext::new(8.0, &[]);
        assert!(DrawingBehavior.hit_test(&el, Point::new(25.0, 4.0), &ctx));
        assert!(DrawingBehavior.hit_test(&el, Point::new(54.0, 25.0), &ctx));
        assert!(!DrawingBehavior.hit_test(&el, Point::new(25.0, 25.0), &ctx));
    }

    #[test]
    fn test_single_point_drawing_never_hits() {
        let el = Element::new(ElementKind::Drawing, 0.0, 0.0).with_points(vec![Point::new(1.0, 1.0)]);
        assert!(!DrawingBehavior.hit_test(&el, Point::new(1.0, 1.0), &HitContext::new(8.0, &[])));
    }
}
