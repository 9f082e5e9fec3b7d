//! Free-standing text labels.
//!
//! Text has no stored size when created; `width`/`height` are measured by the
//! painter every frame and written back so hit-testing sees the laid-out box.

use kurbo::{Point, Rect};

use super::{Element, ElementBehavior, HitContext};
use crate::geometry::rect_contains_inclusive;
use crate::render::{DrawContext, INK, Painter, color_or};

/// Line height as a multiple of font size.
pub const LINE_HEIGHT: f64 = 1.3;
pub const DEFAULT_FONT_SIZE: f64 = 16.0;

#[derive(Debug, Clone, Copy, Default)]
pub struct TextBehavior;

impl TextBehavior {
    /// Laid-out box, or an estimate from character count if never measured.
    pub(crate) fn text_rect(element: &Element) -> Rect {
        let font_size = element.font_size.unwrap_or(DEFAULT_FONT_SIZE);
        let chars = element.content.as_deref().map(|c| c.chars().count()).unwrap_or(0);
        let width = element.width.unwrap_or(chars as f64 * font_size * 0.6);
        let height = element.height.unwrap_or(font_size * 1.4);
        Rect::new(element.x, element.y, element.x + width, element.y + height)
    }
}

impl ElementBehavior for TextBehavior {
    fn apply_defaults(&self, element: &mut Element) {
        element.color.get_or_insert_with(|| "#333333".into());
        element.font_size.get_or_insert(DEFAULT_FONT_SIZE);
        element.content.get_or_insert_with(String::new);
    }

    fn bounds(&self, element: &Element) -> Option<Rect> {
        Some(Self::text_rect(element))
    }

    fn hit_test(&self, element: &Element, point: Point, _ctx: &HitContext<'_>) -> bool {
        rect_contains_inclusive(Self::text_rect(element), point)
    }

    fn draw(&self, element: &Element, ctx: &mut DrawContext<'_>) {
        let font_size = element.font_size.unwrap_or(DEFAULT_FONT_SIZE);
        let color = color_or(element.color.as_deref(), INK);
        let content = element.content.as_deref().unwrap_or_default();
        for (i, line) in content.split('\n').enumerate() {
            let origin = Point::new(element.x, element.y + i as f64 * font_size * LINE_HEIGHT);
            ctx.text(origin, line, font_size, color);
        }
    }

    fn refresh_metrics(&self, element: &mut Element, painter: &mut dyn Painter) {
        let font_size = element.font_size.unwrap_or(DEFAULT_FONT_SIZE);
        let content = element.content.as_deref().unwrap_or_default();
        let mut lines = 0usize;
        let mut max_width: f64 = 0.0;
        for line in content.split('\n') {
            lines += 1;
            max_width = max_width.max(painter.measure_text(line, font_size));
        }
        element.width = Some(max_width);
        element.height = Some(lines as f64 * font_size * LINE_HEIGHT);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::ElementKind;
    use kurbo::{Affine, BezPath};
    use peniko::Color;

    /// Monospace stub: every char is half the font size wide.
    struct Mono;

    impl Painter for Mono {
        fn fill(&mut self, _: Affine, _: &BezPath, _: Color) {}
        fn stroke(&mut self, _: Affine, _: &BezPath, _: Color, _: f64) {}
        fn stroke_dashed(&mut self, _: Affine, _: &BezPath, _: Color, _: f64, _: &[f64]) {}
        fn text(&mut self, _: Affine, _: Point, _: &str, _: f64, _: Color) {}
        fn measure_text(&mut self, text: &str, font_size: f64) -> f64 {
            text.chars().count() as f64 * font_size * 0.5
        }
    }

    #[test]
    fn test_unmeasured_text_uses_estimate() {
        let el = Element::new(ElementKind::Text, 0.0, 0.0).with_content("hello");
        let rect = TextBehavior.bounds(&el).unwrap();
        assert!((rect.width() - 5.0 * 16.0 * 0.6).abs() < 1e-9);
        assert!((rect.height() - 16.0 * 1.4).abs() < 1e-9);
    }

    #[test]
    fn test_refresh_metrics_measures_lines() {
        let mut el = Element::new(ElementKind::Text, 10.0, 10.0).with_content("ab\nabcd");
        TextBehavior.apply_defaults(&mut el);
        TextBehavior.refresh_metrics(&mut el, &mut Mono);
        assert_eq!(el.width, Some(32.0));
        assert!((el.height.unwrap() - 2.0 * 16.0 * LINE_HEIGHT).abs() < 1e-9);

        let ctx = HitContext::new(8.0, &[]);
        assert!(TextBehavior.hit_test(&el, Point::new(40.0, 40.0), &ctx));
        assert!(!TextBehavior.hit_test(&el, Point::new(45.0, 40.0), &ctx));
    }
}
