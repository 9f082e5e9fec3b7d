//! Circle (ellipse inscribed in the element box).

use kurbo::{Ellipse, Point, Rect, Shape as _};

use super::{Element, ElementBehavior, HitContext};
use crate::geometry::ellipse_contains;
use crate::render::{DrawContext, INK, color_or, parse_color};

#[derive(Debug, Clone, Copy, Default)]
pub struct CircleBehavior;

impl ElementBehavior for CircleBehavior {
    fn apply_defaults(&self, element: &mut Element) {
        element.color.get_or_insert_with(|| "#333333".into());
        element.fill.get_or_insert_with(|| "transparent".into());
        element.stroke_width.get_or_insert(2.0);
    }

    fn bounds(&self, element: &Element) -> Option<Rect> {
        Some(element.box_rect())
    }

    fn hit_test(&self, element: &Element, point: Point, _ctx: &HitContext<'_>) -> bool {
        ellipse_contains(element.box_rect(), point)
    }

    fn draw(&self, element: &Element, ctx: &mut DrawContext<'_>) {
        let path = Ellipse::from_rect(element.box_rect()).to_path(0.1);
        if let Some(fill) = element.fill.as_deref().and_then(parse_color) {
            ctx.fill(&path, fill);
        }
        ctx.stroke(&path, color_or(element.color.as_deref(), INK), element.stroke_width.unwrap_or(2.0));
    }

    fn resizable(&self) -> bool {
        true
    }
}
