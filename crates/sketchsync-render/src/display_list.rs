//! Recording painter for headless rendering and tests.

use kurbo::{Affine, BezPath, Point, Rect};
use peniko::Color;
use sketchsync_core::render::Painter;

/// Average glyph advance as a fraction of the font size.
const CHAR_WIDTH_RATIO: f64 = 0.6;

/// One recorded painter call.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Fill {
        transform: Affine,
        path: BezPath,
        color: Color,
    },
    Stroke {
        transform: Affine,
        path: BezPath,
        color: Color,
        width: f64,
    },
    StrokeDashed {
        transform: Affine,
        path: BezPath,
        color: Color,
        width: f64,
        dashes: Vec<f64>,
    },
    Text {
        transform: Affine,
        origin: Point,
        text: String,
        font_size: f64,
        color: Color,
    },
    Image {
        transform: Affine,
        url: String,
        rect: Rect,
    },
}

/// Painter that records every call in order.
///
/// Text is measured with a fixed per-character advance so layouts are
/// deterministic without fonts.
#[derive(Debug, Clone, Default)]
pub struct DisplayList {
    commands: Vec<DrawCommand>,
}

impl DisplayList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// Recorded text runs, in draw order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn dashed_strokes(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::StrokeDashed { .. }))
            .count()
    }
}

impl Painter for DisplayList {
    fn fill(&mut self, transform: Affine, path: &BezPath, color: Color) {
        self.commands.push(DrawCommand::Fill {
            transform,
            path: path.clone(),
            color,
        });
    }

    fn stroke(&mut self, transform: Affine, path: &BezPath, color: Color, width: f64) {
        self.commands.push(DrawCommand::Stroke {
            transform,
            path: path.clone(),
            color,
            width,
        });
    }

    fn stroke_dashed(&mut self, transform: Affine, path: &BezPath, color: Color, width: f64, dashes: &[f64]) {
        self.commands.push(DrawCommand::StrokeDashed {
            transform,
            path: path.clone(),
            color,
            width,
            dashes: dashes.to_vec(),
        });
    }

    fn text(&mut self, transform: Affine, origin: Point, text: &str, font_size: f64, color: Color) {
        self.commands.push(DrawCommand::Text {
            transform,
            origin,
            text: text.to_string(),
            font_size,
            color,
        });
    }

    fn measure_text(&mut self, text: &str, font_size: f64) -> f64 {
        text.chars().count() as f64 * font_size * CHAR_WIDTH_RATIO
    }

    fn image(&mut self, transform: Affine, url: &str, rect: Rect) {
        self.commands.push(DrawCommand::Image {
            transform,
            url: url.to_string(),
            rect,
        });
    }
}
