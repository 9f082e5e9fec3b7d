//! Box-like elements: sticky notes, rectangles, text boxes and images.

use kurbo::{Point, Rect, RoundedRect, Shape as _};
use peniko::Color;

use super::{Element, ElementBehavior, HitContext, LINE_HEIGHT};
use crate::geometry::rect_contains_inclusive;
use crate::render::{DrawContext, INK, color_or};

/// Default sticky note side length.
pub const STICKY_SIZE: f64 = 200.0;
/// Inner padding for sticky and text box content.
const CONTENT_PADDING: f64 = 12.0;

/// Which box-like variant a [`BoxBehavior`] handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxKind {
    Sticky,
    Rect,
    Textbox,
    Image,
}

/// Axis-aligned box containment for every box-like kind.
#[derive(Debug, Clone, Copy)]
pub struct BoxBehavior {
    kind: BoxKind,
}

impl BoxBehavior {
    pub fn new(kind: BoxKind) -> Self {
        Self { kind }
    }

    fn draw_content(element: &Element, rect: Rect, default_size: f64, ctx: &mut DrawContext<'_>) {
        let Some(content) = element.content.as_deref().filter(|c| !c.is_empty()) else {
            return;
        };
        let font_size = element.font_size.unwrap_or(default_size);
        let max_width = (rect.width() - CONTENT_PADDING * 2.0).max(0.0);
        let lines = wrap_text(content, max_width, |s| ctx.painter.measure_text(s, font_size));
        let text_color = match element.kind {
            super::ElementKind::Sticky => INK,
            _ => color_or(element.color.as_deref(), INK),
        };
        for (i, line) in lines.iter().enumerate() {
            let origin = Point::new(
                rect.x0 + CONTENT_PADDING,
                rect.y0 + CONTENT_PADDING + i as f64 * font_size * LINE_HEIGHT,
            );
            ctx.text(origin, line, font_size, text_color);
        }
    }
}

impl ElementBehavior for BoxBehavior {
    fn apply_defaults(&self, element: &mut Element) {
        match self.kind {
            BoxKind::Sticky => {
                element.width.get_or_insert(STICKY_SIZE);
                element.height.get_or_insert(STICKY_SIZE);
                element.color.get_or_insert_with(|| "#FFF176".into());
                element.font_size.get_or_insert(14.0);
                element.content.get_or_insert_with(String::new);
            }
            BoxKind::Rect => {
                element.color.get_or_insert_with(|| "#333333".into());
                element.fill.get_or_insert_with(|| "transparent".into());
                element.stroke_width.get_or_insert(2.0);
            }
            BoxKind::Textbox => {
                element.color.get_or_insert_with(|| "#333333".into());
                element.font_size.get_or_insert(16.0);
                element.stroke_width.get_or_insert(1.0);
                element.content.get_or_insert_with(String::new);
            }
            BoxKind::Image => {
                element.width.get_or_insert(200.0);
                element.height.get_or_insert(150.0);
            }
        }
    }

    fn bounds(&self, element: &Element) -> Option<Rect> {
        Some(element.box_rect())
    }

    fn hit_test(&self, element: &Element, point: Point, _ctx: &HitContext<'_>) -> bool {
        rect_contains_inclusive(element.box_rect(), point)
    }

    fn draw(&self, element: &Element, ctx: &mut DrawContext<'_>) {
        let rect = element.box_rect();
        match self.kind {
            BoxKind::Sticky => {
                let path = RoundedRect::from_rect(rect, 4.0).to_path(0.1);
                let shadow = RoundedRect::from_rect(rect + kurbo::Vec2::new(0.0, 2.0), 4.0).to_path(0.1);
                ctx.fill(&shadow, Color::from_rgba8(0, 0, 0, 38));
                ctx.fill(&path, color_or(element.color.as_deref(), Color::from_rgba8(0xff, 0xf1, 0x76, 255)));
                Self::draw_content(element, rect, 14.0, ctx);
            }
            BoxKind::Rect => {
                let path = rect.to_path(0.1);
                if let Some(fill) = element.fill.as_deref().and_then(crate::render::parse_color) {
                    ctx.fill(&path, fill);
                }
                ctx.stroke(&path, color_or(element.color.as_deref(), INK), element.stroke_width.unwrap_or(2.0));
            }
            BoxKind::Textbox => {
                let path = rect.to_path(0.1);
                if let Some(fill) = element.fill.as_deref().and_then(crate::render::parse_color) {
                    ctx.fill(&path, fill);
                }
                let width = element.stroke_width.unwrap_or(1.0);
                if width > 0.0 {
                    ctx.stroke(&path, Color::from_rgba8(0xcc, 0xcc, 0xcc, 255), width);
                }
                Self::draw_content(element, rect, 16.0, ctx);
            }
            BoxKind::Image => {
                let transform = ctx.transform();
                let url = element.url.as_deref().unwrap_or_default();
                ctx.painter.image(transform, url, rect);
            }
        }
    }

    fn resizable(&self) -> bool {
        true
    }
}

/// Greedy word wrap, breaking on spaces and honoring explicit newlines.
pub fn wrap_text(text: &str, max_width: f64, mut measure: impl FnMut(&str) -> f64) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut line = String::new();
        for word in paragraph.split(' ') {
            let candidate = if line.is_empty() {
                word.to_string()
            } else {
                format!("{line} {word}")
            };
            if !line.is_empty() && measure(&candidate) > max_width {
                lines.push(std::mem::replace(&mut line, word.to_string()));
            } else {
                line = candidate;
            }
        }
        lines.push(line);
    }
    lines
}
