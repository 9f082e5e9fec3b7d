//! Frame composition on top of the core `Painter` seam.

use kurbo::{Affine, BezPath, Circle, Point, Rect, RoundedRect, Shape as _};
use peniko::Color;
use sketchsync_core::camera::Camera;
use sketchsync_core::geometry::rects_overlap;
use sketchsync_core::render::{DrawContext, Painter, parse_color};
use sketchsync_core::scene::Scene;
use sketchsync_core::selection::element_handles;
use sketchsync_core::shapes::{ElementKind, ElementRegistry};
use sketchsync_core::sync::RemoteCursor;
use sketchsync_core::tools::ToolPreview;
use thiserror::Error;

/// World distance between grid dots.
pub const GRID_SPACING: f64 = 30.0;
/// Below this zoom the grid is too dense to be useful.
pub const GRID_MIN_ZOOM: f64 = 0.3;
/// Screen margin kept around the viewport when culling.
pub const CULL_MARGIN_PX: f64 = 50.0;

const SELECTION_PADDING_PX: f64 = 4.0;
const HANDLE_SIZE_PX: f64 = 8.0;
const ENDPOINT_RADIUS_PX: f64 = 5.0;
const GRID_DOT_PX: f64 = 1.0;
const CURSOR_LABEL_FONT_SIZE: f64 = 12.0;

const GRID_COLOR: Color = Color::from_rgba8(160, 160, 160, 110);
const MARQUEE_FILL: Color = Color::from_rgba8(59, 130, 246, 25);
const DEFAULT_CURSOR_COLOR: Color = Color::from_rgba8(0x21, 0x96, 0xF3, 255);

/// Renderer errors.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RenderError {
    #[error("Invalid viewport: {width}x{height}")]
    InvalidViewport { width: f64, height: f64 },
    #[error("Render failed: {0}")]
    RenderFailed(String),
    #[error("Frame panicked: {0}")]
    Panicked(String),
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Counts from one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub drawn: usize,
    pub culled: usize,
}

/// Context for a single render frame.
pub struct RenderContext<'a> {
    pub scene: &'a Scene,
    pub camera: &'a Camera,
    pub registry: &'a ElementRegistry,
    /// Gesture in progress, drawn above the elements.
    pub preview: Option<ToolPreview>,
    pub cursors: &'a [RemoteCursor],
    pub background_color: Color,
    pub selection_color: Color,
    pub show_grid: bool,
}

impl<'a> RenderContext<'a> {
    /// Create a new render context.
    pub fn new(scene: &'a Scene, camera: &'a Camera, registry: &'a ElementRegistry) -> Self {
        Self {
            scene,
            camera,
            registry,
            preview: None,
            cursors: &[],
            background_color: Color::from_rgba8(0xf5, 0xf5, 0xf5, 255),
            selection_color: Color::from_rgba8(59, 130, 246, 255),
            show_grid: true,
        }
    }

    pub fn with_preview(mut self, preview: Option<ToolPreview>) -> Self {
        self.preview = preview;
        self
    }

    pub fn with_cursors(mut self, cursors: &'a [RemoteCursor]) -> Self {
        self.cursors = cursors;
        self
    }

    /// Set the background color.
    pub fn with_background(mut self, color: Color) -> Self {
        self.background_color = color;
        self
    }

    pub fn with_selection_color(mut self, color: Color) -> Self {
        self.selection_color = color;
        self
    }

    pub fn with_grid(mut self, show: bool) -> Self {
        self.show_grid = show;
        self
    }
}

/// Draw one frame: background, grid, elements, selection, preview, cursors.
pub fn build_frame(ctx: &RenderContext<'_>, painter: &mut dyn Painter) -> RenderResult<FrameStats> {
    let viewport = ctx.camera.viewport;
    let valid = viewport.width.is_finite() && viewport.height.is_finite() && viewport.width > 0.0 && viewport.height > 0.0;
    if !valid {
        return Err(RenderError::InvalidViewport {
            width: viewport.width,
            height: viewport.height,
        });
    }

    let screen = Rect::from_origin_size(Point::ZERO, viewport);
    painter.fill(Affine::IDENTITY, &screen.to_path(0.1), ctx.background_color);
    if ctx.show_grid {
        render_grid_dots(ctx, painter);
    }
    let stats = render_elements(ctx, painter);
    render_selection(ctx, painter);
    render_preview(ctx, painter);
    render_cursors(ctx, painter);
    Ok(stats)
}

fn render_grid_dots(ctx: &RenderContext<'_>, painter: &mut dyn Painter) {
    let zoom = ctx.camera.zoom;
    if zoom < GRID_MIN_ZOOM {
        return;
    }
    let visible = ctx.camera.visible_world_rect();
    let half = GRID_DOT_PX / zoom;
    let start_x = (visible.x0 / GRID_SPACING).floor() * GRID_SPACING;
    let start_y = (visible.y0 / GRID_SPACING).floor() * GRID_SPACING;

    // One path for every dot.
    let mut path = BezPath::new();
    let mut x = start_x;
    while x <= visible.x1 {
        let mut y = start_y;
        while y <= visible.y1 {
            path.extend(Rect::new(x - half, y - half, x + half, y + half).path_elements(0.1));
            y += GRID_SPACING;
        }
        x += GRID_SPACING;
    }
    if !path.elements().is_empty() {
        painter.fill(ctx.camera.transform(), &path, GRID_COLOR);
    }
}

fn render_elements(ctx: &RenderContext<'_>, painter: &mut dyn Painter) -> FrameStats {
    let margin = CULL_MARGIN_PX / ctx.camera.zoom;
    let cull = ctx.camera.visible_world_rect().inflate(margin, margin);
    let elements = ctx.scene.elements();
    let mut stats = FrameStats::default();
    for element in elements {
        if let Some(bounds) = ctx.registry.bounds(element) {
            // Inflate by a hair so zero-width lines still intersect.
            if !rects_overlap(bounds.inflate(0.5, 0.5), cull) {
                stats.culled += 1;
                continue;
            }
        }
        let mut draw = DrawContext::new(&mut *painter, ctx.camera, elements);
        ctx.registry.draw(element, &mut draw);
        stats.drawn += 1;
    }
    stats
}

fn render_selection(ctx: &RenderContext<'_>, painter: &mut dyn Painter) {
    let transform = ctx.camera.transform();
    let zoom = ctx.camera.zoom;
    let color = ctx.selection_color;
    for element in ctx.scene.selected_elements() {
        if matches!(element.kind, ElementKind::Line | ElementKind::Arrow) {
            for point in [element.start(), element.end()] {
                let dot = Circle::new(point, ENDPOINT_RADIUS_PX / zoom).to_path(0.1);
                painter.fill(transform, &dot, Color::WHITE);
                painter.stroke(transform, &dot, color, 1.5 / zoom);
            }
            continue;
        }
        let Some(bounds) = ctx.registry.bounds(element) else {
            continue;
        };
        let pad = SELECTION_PADDING_PX / zoom;
        let dash = 4.0 / zoom;
        let outline = bounds.inflate(pad, pad).to_path(0.1);
        painter.stroke_dashed(transform, &outline, color, 1.0 / zoom, &[dash, dash]);

        let size = HANDLE_SIZE_PX / zoom;
        for handle in element_handles(element, ctx.registry) {
            let square = Rect::from_center_size(handle.position, (size, size)).to_path(0.1);
            painter.fill(transform, &square, Color::WHITE);
            painter.stroke(transform, &square, color, 1.5 / zoom);
        }
    }
}

fn render_preview(ctx: &RenderContext<'_>, painter: &mut dyn Painter) {
    match &ctx.preview {
        Some(ToolPreview::Element(element)) => {
            let mut draw = DrawContext::new(painter, ctx.camera, ctx.scene.elements());
            ctx.registry.draw(element, &mut draw);
        }
        Some(ToolPreview::Marquee(rect)) => {
            let transform = ctx.camera.transform();
            let dash = 4.0 / ctx.camera.zoom;
            let path = rect.to_path(0.1);
            painter.fill(transform, &path, MARQUEE_FILL);
            painter.stroke_dashed(transform, &path, ctx.selection_color, 1.0 / ctx.camera.zoom, &[dash, dash]);
        }
        None => {}
    }
}

/// Remote pointers in screen space: an arrow glyph plus a name tag.
fn render_cursors(ctx: &RenderContext<'_>, painter: &mut dyn Painter) {
    for cursor in ctx.cursors {
        let color = parse_color(&cursor.color).unwrap_or(DEFAULT_CURSOR_COLOR);
        let tip = ctx.camera.world_to_screen(cursor.position);

        let mut arrow = BezPath::new();
        arrow.move_to(tip);
        arrow.line_to(Point::new(tip.x, tip.y + 18.0));
        arrow.line_to(Point::new(tip.x + 14.0, tip.y + 14.0));
        arrow.close_path();
        painter.fill(Affine::IDENTITY, &arrow, color);
        // White edge keeps the glyph visible on any background.
        painter.stroke(Affine::IDENTITY, &arrow, Color::WHITE, 1.5);

        if cursor.username.is_empty() {
            continue;
        }
        let width = painter.measure_text(&cursor.username, CURSOR_LABEL_FONT_SIZE) + 8.0;
        let label = Rect::new(
            tip.x + 14.0,
            tip.y + 18.0,
            tip.x + 14.0 + width,
            tip.y + 18.0 + CURSOR_LABEL_FONT_SIZE + 6.0,
        );
        painter.fill(Affine::IDENTITY, &RoundedRect::from_rect(label, 3.0).to_path(0.1), color);
        painter.text(
            Affine::IDENTITY,
            Point::new(label.x0 + 4.0, label.y0 + 3.0),
            &cursor.username,
            CURSOR_LABEL_FONT_SIZE,
            Color::WHITE,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display_list::{DisplayList, DrawCommand};
    use kurbo::Size;
    use sketchsync_core::shapes::Element;

    fn rect(id: &str, x: f64, y: f64) -> Element {
        Element::with_id(id, ElementKind::Rect, x, y).sized(100.0, 50.0)
    }

    fn render(scene: &Scene, camera: &Camera) -> (DisplayList, FrameStats) {
        let registry = ElementRegistry::with_builtin();
        let mut list = DisplayList::new();
        let stats = build_frame(&RenderContext::new(scene, camera, &registry), &mut list).unwrap();
        (list, stats)
    }

    #[test]
    fn test_background_then_grid() {
        let (list, stats) = render(&Scene::new(), &Camera::new());
        assert_eq!(stats, FrameStats::default());
        assert_eq!(list.len(), 2);
        match &list.commands()[0] {
            DrawCommand::Fill { transform, color, .. } => {
                assert_eq!(*transform, Affine::IDENTITY);
                assert_eq!(color.to_rgba8().r, 0xf5);
            }
            other => panic!("expected background fill, got {other:?}"),
        }
    }

    #[test]
    fn test_grid_hidden_when_zoomed_out() {
        let mut camera = Camera::new();
        camera.zoom = 0.2;
        let (list, _) = render(&Scene::new(), &camera);
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_offscreen_elements_are_culled() {
        let scene = Scene::from_elements(vec![
            rect("near", 10.0, 10.0),
            rect("far", 10_000.0, 10_000.0),
            // Just outside the viewport but inside the margin.
            rect("edge", -130.0, 10.0),
        ]);
        let (_, stats) = render(&scene, &Camera::new());
        assert_eq!(stats, FrameStats { drawn: 2, culled: 1 });
    }

    #[test]
    fn test_selected_box_gets_dashed_outline_and_handles() {
        let mut scene = Scene::from_elements(vec![rect("a", 10.0, 10.0)]);
        scene.select("a".into());
        let (list, _) = render(&scene, &Camera::new());
        assert_eq!(list.dashed_strokes(), 1);
        let white_fills = list
            .commands()
            .iter()
            .filter(|c| matches!(c, DrawCommand::Fill { color, .. } if *color == Color::WHITE))
            .count();
        assert_eq!(white_fills, 4);
    }

    #[test]
    fn test_selected_line_gets_endpoint_dots() {
        let line = Element::with_id("l", ElementKind::Line, 0.0, 0.0).ending_at(100.0, 100.0);
        let mut scene = Scene::from_elements(vec![line]);
        scene.select("l".into());
        let (list, _) = render(&scene, &Camera::new());
        assert_eq!(list.dashed_strokes(), 0);
        let white_fills = list
            .commands()
            .iter()
            .filter(|c| matches!(c, DrawCommand::Fill { color, .. } if *color == Color::WHITE))
            .count();
        assert_eq!(white_fills, 2);
    }

    #[test]
    fn test_marquee_preview() {
        let scene = Scene::new();
        let camera = Camera::new();
        let registry = ElementRegistry::with_builtin();
        let ctx = RenderContext::new(&scene, &camera, &registry)
            .with_grid(false)
            .with_preview(Some(ToolPreview::Marquee(Rect::new(0.0, 0.0, 40.0, 40.0))));
        let mut list = DisplayList::new();
        build_frame(&ctx, &mut list).unwrap();
        assert_eq!(list.len(), 3);
        assert_eq!(list.dashed_strokes(), 1);
    }

    #[test]
    fn test_remote_cursor_label() {
        let scene = Scene::new();
        let mut camera = Camera::new();
        camera.zoom = 2.0;
        let registry = ElementRegistry::with_builtin();
        let cursors = vec![RemoteCursor {
            user_id: "u1".into(),
            position: Point::new(50.0, 50.0),
            username: "ana".into(),
            color: "#F44336".into(),
        }];
        let ctx = RenderContext::new(&scene, &camera, &registry)
            .with_grid(false)
            .with_cursors(&cursors);
        let mut list = DisplayList::new();
        build_frame(&ctx, &mut list).unwrap();
        assert_eq!(list.texts().collect::<Vec<_>>(), vec!["ana"]);
        match &list.commands()[1] {
            DrawCommand::Fill { path, .. } => {
                let tip = path.elements()[0].end_point();
                assert_eq!(tip, Some(Point::new(100.0, 100.0)));
            }
            other => panic!("expected cursor glyph, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_viewport_is_an_error() {
        let mut camera = Camera::new();
        camera.viewport = Size::new(0.0, 600.0);
        let registry = ElementRegistry::with_builtin();
        let scene = Scene::new();
        let err = build_frame(&RenderContext::new(&scene, &camera, &registry), &mut DisplayList::new()).unwrap_err();
        assert!(matches!(err, RenderError::InvalidViewport { .. }));
    }
}
