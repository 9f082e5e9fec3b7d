//! Polygon shapes generated from the element box.

use kurbo::{Point, Rect};

use super::{Element, ElementBehavior, HitContext};
use crate::geometry::{
    diamond_vertices, hexagon_vertices, polygon_contains, polygon_path, star_vertices, triangle_vertices,
};
use crate::render::{DrawContext, INK, color_or, parse_color};

/// Default number of star spikes.
pub const DEFAULT_STAR_POINTS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolygonKind {
    Triangle,
    Diamond,
    Star,
    Hexagon,
}

#[derive(Debug, Clone, Copy)]
pub struct PolygonBehavior {
    kind: PolygonKind,
}

impl PolygonBehavior {
    pub fn new(kind: PolygonKind) -> Self {
        Self { kind }
    }

    /// Vertices for `element` in world coordinates.
    pub fn vertices(&self, element: &Element) -> Vec<Point> {
        let rect = element.box_rect();
        match self.kind {
            PolygonKind::Triangle => triangle_vertices(rect),
            PolygonKind::Diamond => diamond_vertices(rect),
            PolygonKind::Hexagon => hexagon_vertices(rect),
            PolygonKind::Star => star_vertices(rect, element.star_points.unwrap_or(DEFAULT_STAR_POINTS)),
        }
    }
}

impl ElementBehavior for PolygonBehavior {
    fn apply_defaults(&self, element: &mut Element) {
        element.color.get_or_insert_with(|| "#333333".into());
        element.fill.get_or_insert_with(|| "transparent".into());
        element.stroke_width.get_or_insert(2.0);
        if self.kind == PolygonKind::Star {
            element.star_points.get_or_insert(DEFAULT_STAR_POINTS);
        }
    }

    fn bounds(&self, element: &Element) -> Option<Rect> {
        Some(element.box_rect())
    }

    fn hit_test(&self, element: &Element, point: Point, _ctx: &HitContext<'_>) -> bool {
        polygon_contains(&self.vertices(element), point)
    }

    fn draw(&self, element: &Element, ctx: &mut DrawContext<'_>) {
        let path = polygon_path(&self.vertices(element));
        if let Some(fill) = element.fill.as_deref().and_then(parse_color) {
            ctx.fill(&path, fill);
        }
        ctx.stroke(&path, color_or(element.color.as_deref(), INK), element.stroke_width.unwrap_or(2.0));
    }

    fn resizable(&self) -> bool {
        true
    }
}
