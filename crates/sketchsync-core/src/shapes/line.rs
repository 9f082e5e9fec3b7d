//! Straight lines and arrows.

use kurbo::{Point, Rect};

use super::{Element, ElementBehavior, HitContext};
use crate::geometry::{arrowhead_path, point_to_segment_dist, polyline_path};
use crate::render::{DrawContext, INK, color_or};

/// Arrowhead length in world units.
pub const ARROWHEAD_LEN: f64 = 12.0;

#[derive(Debug, Clone, Copy)]
pub struct LineBehavior {
    arrowhead: bool,
}

impl LineBehavior {
    pub fn line() -> Self {
        Self { arrowhead: false }
    }

    pub fn arrow() -> Self {
        Self { arrowhead: true }
    }
}

impl ElementBehavior for LineBehavior {
    fn apply_defaults(&self, element: &mut Element) {
        element.color.get_or_insert_with(|| "#333333".into());
        element.stroke_width.get_or_insert(2.0);
        if element.x2.is_none() || element.y2.is_none() {
            element.x2 = Some(element.x);
            element.y2 = Some(element.y);
        }
    }

    fn bounds(&self, element: &Element) -> Option<Rect> {
        Some(Rect::from_points(element.start(), element.end()))
    }

    fn hit_test(&self, element: &Element, point: Point, ctx: &HitContext<'_>) -> bool {
        point_to_segment_dist(point, element.start(), element.end()) <= ctx.tolerance
    }

    fn draw(&self, element: &Element, ctx: &mut DrawContext<'_>) {
        draw_segment(element.start(), element.end(), element, self.arrowhead, ctx);
    }

    fn has_anchors(&self) -> bool {
        false
    }
}

/// Stroke a segment with the element's style, optionally with an arrowhead at `end`.
pub(crate) fn draw_segment(start: Point, end: Point, element: &Element, arrowhead: bool, ctx: &mut DrawContext<'_>) {
    let color = color_or(element.color.as_deref(), INK);
    ctx.stroke(&polyline_path(&[start, end]), color, element.stroke_width.unwrap_or(2.0));
    if arrowhead && start != end {
        ctx.fill(&arrowhead_path(start, end, ARROWHEAD_LEN), color);
    }
}
