//! Vello-based painter implementation.

use std::sync::Arc;

use kurbo::{Affine, BezPath, Point, Stroke};
use parley::layout::PositionedLayoutItem;
use parley::{FontContext, Layout, LayoutContext, StyleProperty};
use peniko::{Brush, Color, Fill};
use sketchsync_core::render::Painter;
use vello::Scene;

/// Ratio used to estimate text width when no font resolves.
const FALLBACK_CHAR_WIDTH: f64 = 0.6;

/// Paints into a [`vello::Scene`], with Parley for text layout.
///
/// No fonts are bundled. The host registers them with
/// [`VelloPainter::register_font`] before the first frame.
pub struct VelloPainter {
    /// The Vello scene being built.
    scene: Scene,
    /// Font context for text rendering.
    font_cx: FontContext,
    /// Layout context for text rendering.
    layout_cx: LayoutContext<Brush>,
    /// Named family used for all text; system default when unset.
    family: Option<String>,
}

impl Default for VelloPainter {
    fn default() -> Self {
        Self::new()
    }
}

impl VelloPainter {
    pub fn new() -> Self {
        Self {
            scene: Scene::new(),
            font_cx: FontContext::new(),
            layout_cx: LayoutContext::new(),
            family: None,
        }
    }

    /// Register font data with the layout engine.
    pub fn register_font(&mut self, data: Vec<u8>) {
        self.font_cx
            .collection
            .register_fonts(vello::peniko::Blob::new(Arc::new(data)), None);
    }

    /// Use `family` for all text.
    pub fn set_family(&mut self, family: impl Into<String>) {
        self.family = Some(family.into());
    }

    /// Get the built scene for rendering.
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Take ownership of the scene (resets internal scene).
    pub fn take_scene(&mut self) -> Scene {
        std::mem::take(&mut self.scene)
    }

    /// Clear the scene before drawing a new frame.
    pub fn reset(&mut self) {
        self.scene.reset();
    }

    fn layout(&mut self, text: &str, font_size: f64, brush: Brush) -> Layout<Brush> {
        let mut builder = self.layout_cx.ranged_builder(&mut self.font_cx, text, 1.0, false);
        builder.push_default(StyleProperty::FontSize(font_size as f32));
        builder.push_default(StyleProperty::Brush(brush));
        if let Some(family) = &self.family {
            builder.push_default(StyleProperty::FontStack(parley::FontStack::Single(
                parley::FontFamily::Named(family.as_str().into()),
            )));
        }
        let mut layout = builder.build(text);
        layout.break_all_lines(None);
        layout.align(None, parley::Alignment::Start, parley::AlignmentOptions::default());
        layout
    }
}

impl Painter for VelloPainter {
    fn fill(&mut self, transform: Affine, path: &BezPath, color: Color) {
        self.scene.fill(Fill::NonZero, transform, color, None, path);
    }

    fn stroke(&mut self, transform: Affine, path: &BezPath, color: Color, width: f64) {
        self.scene.stroke(&Stroke::new(width), transform, color, None, path);
    }

    fn stroke_dashed(&mut self, transform: Affine, path: &BezPath, color: Color, width: f64, dashes: &[f64]) {
        let stroke = Stroke::new(width).with_dashes(0.0, dashes.iter().copied());
        self.scene.stroke(&stroke, transform, color, None, path);
    }

    fn text(&mut self, transform: Affine, origin: Point, text: &str, font_size: f64, color: Color) {
        if text.is_empty() {
            return;
        }
        let brush = Brush::Solid(color);
        let layout = self.layout(text, font_size, brush.clone());
        // Parley puts y=0 at the top of the first line.
        let text_transform = transform * Affine::translate((origin.x, origin.y));

        // Adapted from Parley's vello example
        for line in layout.lines() {
            for item in line.items() {
                let PositionedLayoutItem::GlyphRun(glyph_run) = item else {
                    continue;
                };
                let mut x = glyph_run.offset();
                let y = glyph_run.baseline();
                let run = glyph_run.run();
                let font = run.font();
                let synthesis = run.synthesis();
                let glyph_xform = synthesis
                    .skew()
                    .map(|angle| Affine::skew(angle.to_radians().tan() as f64, 0.0));
                let glyphs: Vec<vello::Glyph> = glyph_run
                    .glyphs()
                    .map(|glyph| {
                        let gx = x + glyph.x;
                        let gy = y - glyph.y;
                        x += glyph.advance;
                        vello::Glyph { id: glyph.id, x: gx, y: gy }
                    })
                    .collect();
                if glyphs.is_empty() {
                    continue;
                }
                self.scene
                    .draw_glyphs(font)
                    .brush(&brush)
                    .hint(true)
                    .transform(text_transform)
                    .glyph_transform(glyph_xform)
                    .font_size(run.font_size())
                    .normalized_coords(run.normalized_coords())
                    .draw(Fill::NonZero, glyphs.into_iter());
            }
        }
    }

    fn measure_text(&mut self, text: &str, font_size: f64) -> f64 {
        if text.is_empty() {
            return 0.0;
        }
        let width = self.layout(text, font_size, Brush::Solid(Color::BLACK)).width() as f64;
        if width > 0.0 {
            width
        } else {
            text.chars().count() as f64 * font_size * FALLBACK_CHAR_WIDTH
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::{Rect, Shape as _};

    #[test]
    fn test_painter_creation() {
        let painter = VelloPainter::new();
        assert!(painter.scene().encoding().is_empty());
    }

    #[test]
    fn test_fill_encodes_and_reset_clears() {
        let mut painter = VelloPainter::new();
        let path = Rect::new(0.0, 0.0, 10.0, 10.0).to_path(0.1);
        painter.fill(Affine::IDENTITY, &path, Color::BLACK);
        painter.stroke_dashed(Affine::IDENTITY, &path, Color::BLACK, 1.0, &[4.0, 4.0]);
        assert!(!painter.scene().encoding().is_empty());
        painter.reset();
        assert!(painter.scene().encoding().is_empty());
    }

    #[test]
    fn test_measure_text_is_positive() {
        let mut painter = VelloPainter::new();
        assert!(painter.measure_text("hello", 16.0) > 0.0);
        assert_eq!(painter.measure_text("", 16.0), 0.0);
    }
}
