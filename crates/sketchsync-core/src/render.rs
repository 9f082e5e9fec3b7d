//! Drawing seam between element behaviors and rendering backends.
//!
//! Behaviors describe geometry in world coordinates and hand it to a
//! [`Painter`] together with the camera transform. Backends decide how pixels
//! get produced.

use kurbo::{Affine, BezPath, Point, Rect, Shape as _};
use peniko::Color;

use crate::camera::Camera;
use crate::shapes::Element;

/// Default stroke and text color.
pub const INK: Color = Color::from_rgba8(0x33, 0x33, 0x33, 255);

/// Backend-neutral drawing surface.
///
/// Every call carries the transform from path coordinates to screen pixels.
pub trait Painter {
    fn fill(&mut self, transform: Affine, path: &BezPath, color: Color);

    fn stroke(&mut self, transform: Affine, path: &BezPath, color: Color, width: f64);

    fn stroke_dashed(&mut self, transform: Affine, path: &BezPath, color: Color, width: f64, dashes: &[f64]);

    /// Draw a single line of text with its top-left corner at `origin`.
    fn text(&mut self, transform: Affine, origin: Point, text: &str, font_size: f64, color: Color);

    /// Advance width of `text` at `font_size`, in the same units as `font_size`.
    fn measure_text(&mut self, text: &str, font_size: f64) -> f64;

    /// Draw an image referenced by URL into `rect`.
    ///
    /// Backends without image decoding draw a placeholder frame.
    fn image(&mut self, transform: Affine, _url: &str, rect: Rect) {
        let path = rect.to_path(0.1);
        self.fill(transform, &path, Color::from_rgba8(0xee, 0xee, 0xee, 255));
        self.stroke(transform, &path, Color::from_rgba8(0x99, 0x99, 0x99, 255), 1.0);
    }
}

/// Everything a behavior needs to draw one element.
pub struct DrawContext<'a> {
    pub painter: &'a mut dyn Painter,
    pub camera: &'a Camera,
    /// The full element list, for kinds whose geometry depends on others.
    pub elements: &'a [Element],
}

impl<'a> DrawContext<'a> {
    pub fn new(painter: &'a mut dyn Painter, camera: &'a Camera, elements: &'a [Element]) -> Self {
        Self { painter, camera, elements }
    }

    /// World to screen transform.
    pub fn transform(&self) -> Affine {
        self.camera.transform()
    }

    pub fn fill(&mut self, path: &BezPath, color: Color) {
        let transform = self.transform();
        self.painter.fill(transform, path, color);
    }

    pub fn stroke(&mut self, path: &BezPath, color: Color, width: f64) {
        let transform = self.transform();
        self.painter.stroke(transform, path, color, width);
    }

    pub fn text(&mut self, origin: Point, text: &str, font_size: f64, color: Color) {
        let transform = self.transform();
        self.painter.text(transform, origin, text, font_size, color);
    }
}

/// Parse a CSS hex color (`#rgb`, `#rrggbb`, `#rrggbbaa`).
///
/// `transparent` and anything unparseable yield `None`.
pub fn parse_color(color: &str) -> Option<Color> {
    let hex = color.trim().strip_prefix('#')?;
    let byte = |range: std::ops::Range<usize>| hex.get(range).and_then(|h| u8::from_str_radix(h, 16).ok());
    match hex.len() {
        3 => {
            let r = byte(0..1)? * 17;
            let g = byte(1..2)? * 17;
            let b = byte(2..3)? * 17;
            Some(Color::from_rgba8(r, g, b, 255))
        }
        6 => Some(Color::from_rgba8(byte(0..2)?, byte(2..4)?, byte(4..6)?, 255)),
        8 => Some(Color::from_rgba8(byte(0..2)?, byte(2..4)?, byte(4..6)?, byte(6..8)?)),
        _ => None,
    }
}

/// Resolve an optional element color, falling back to `default`.
pub fn color_or(color: Option<&str>, default: Color) -> Color {
    color.and_then(parse_color).unwrap_or(default)
}
