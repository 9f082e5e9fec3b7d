//! Camera module for pan/zoom transforms.

use kurbo::{Affine, Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Smallest allowed zoom level.
pub const MIN_ZOOM: f64 = 0.1;
/// Largest allowed zoom level.
pub const MAX_ZOOM: f64 = 5.0;

/// Zoom factor applied per wheel tick when zooming out.
const ZOOM_OUT_STEP: f64 = 0.9;
/// Zoom factor applied per wheel tick when zooming in.
const ZOOM_IN_STEP: f64 = 1.1;

/// Camera manages the view transform for the board.
///
/// `origin` is the world coordinate that sits at the screen's top-left corner,
/// so `world_to_screen(p) = (p - origin) * zoom`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Camera {
    /// World offset of the screen origin.
    pub origin: Vec2,
    /// Current zoom level, always within [`MIN_ZOOM`, `MAX_ZOOM`].
    pub zoom: f64,
    /// Size of the drawing surface in screen pixels.
    #[serde(skip)]
    pub viewport: Size,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            origin: Vec2::ZERO,
            zoom: 1.0,
            viewport: Size::new(1280.0, 720.0),
        }
    }
}

impl Camera {
    /// Create a new camera with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Affine transform from world to screen coordinates.
    pub fn transform(&self) -> Affine {
        Affine::scale(self.zoom) * Affine::translate(-self.origin)
    }

    /// Affine transform from screen to world coordinates.
    pub fn inverse_transform(&self) -> Affine {
        Affine::translate(self.origin) * Affine::scale(1.0 / self.zoom)
    }

    /// Convert a screen point to world coordinates.
    pub fn screen_to_world(&self, screen_point: Point) -> Point {
        Point::new(
            screen_point.x / self.zoom + self.origin.x,
            screen_point.y / self.zoom + self.origin.y,
        )
    }

    /// Convert a world point to screen coordinates.
    pub fn world_to_screen(&self, world_point: Point) -> Point {
        Point::new(
            (world_point.x - self.origin.x) * self.zoom,
            (world_point.y - self.origin.y) * self.zoom,
        )
    }

    /// Pan by a delta in screen pixels. Pan speed is the same at every zoom.
    pub fn pan(&mut self, delta: Vec2) {
        self.origin -= delta / self.zoom;
    }

    /// Zoom one wheel tick around a screen point.
    ///
    /// A positive `delta` zooms out, anything else zooms in. The world point
    /// under `screen_point` stays under it afterwards.
    pub fn zoom_at(&mut self, screen_point: Point, delta: f64) {
        let factor = if delta > 0.0 { ZOOM_OUT_STEP } else { ZOOM_IN_STEP };
        self.zoom_by(screen_point, factor);
    }

    /// Multiply zoom by `factor` around a screen point, clamping to the limits.
    pub fn zoom_by(&mut self, screen_point: Point, factor: f64) {
        let before = self.screen_to_world(screen_point);
        self.zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        let after = self.screen_to_world(screen_point);
        self.origin += before - after;
    }

    /// World-space rectangle currently covered by the viewport.
    pub fn visible_world_rect(&self) -> Rect {
        let top_left = self.screen_to_world(Point::ZERO);
        let bottom_right =
            self.screen_to_world(Point::new(self.viewport.width, self.viewport.height));
        Rect::from_points(top_left, bottom_right)
    }

    /// Reset camera to the default position and zoom.
    pub fn reset(&mut self) {
        self.origin = Vec2::ZERO;
        self.zoom = 1.0;
    }
}
