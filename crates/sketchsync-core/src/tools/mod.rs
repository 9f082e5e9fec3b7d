//! Tool system for the board.
//!
//! Each tool turns `on_down`/`on_move`/`on_up` in world coordinates into
//! scene mutations through a [`ToolContext`].

mod connector;
mod select;

pub use connector::{CONNECTOR_SNAP_PX, nearest_anchor};

use std::collections::HashMap;

use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

use crate::geometry::normalized_rect;
use crate::input::Modifiers;
use crate::scene::Scene;
use crate::selection::Corner;
use crate::shapes::{Anchor, Element, ElementId, ElementKind, ElementRegistry};

/// Drags smaller than this on both axes create nothing.
pub const MIN_SHAPE_SIZE: f64 = 5.0;
/// Lines shorter than this create nothing.
pub const MIN_LINE_LENGTH: f64 = 5.0;
/// Smallest text box; smaller drags grow to this.
pub const MIN_TEXTBOX_SIZE: f64 = 20.0;

/// Drag-to-create shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Rect,
    Circle,
    Triangle,
    Diamond,
    Star,
    Hexagon,
}

impl ShapeKind {
    pub fn element_kind(self) -> ElementKind {
        match self {
            ShapeKind::Rect => ElementKind::Rect,
            ShapeKind::Circle => ElementKind::Circle,
            ShapeKind::Triangle => ElementKind::Triangle,
            ShapeKind::Diamond => ElementKind::Diamond,
            ShapeKind::Star => ElementKind::Star,
            ShapeKind::Hexagon => ElementKind::Hexagon,
        }
    }
}

/// Available tools.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ToolKind {
    #[default]
    Select,
    Pan,
    Sticky,
    Shape(ShapeKind),
    Line,
    Arrow,
    Connector,
    Draw,
    Text,
    Textbox,
    /// A tool registered by a collaborator under this name.
    External(String),
}

/// Ask the host to open a text editor.
///
/// The host later calls `Canvas::commit_text` with the result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextRequest {
    /// World position of the text's top-left corner.
    pub at: Point,
    /// Box to wrap into, for text boxes.
    pub bounds: Option<Rect>,
}

/// What the active gesture wants drawn on top of the scene.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolPreview {
    Element(Element),
    Marquee(Rect),
}

/// Access a tool has to the document while handling an event.
pub trait ToolContext {
    fn scene(&self) -> &Scene;

    fn registry(&self) -> &ElementRegistry;

    fn zoom(&self) -> f64;

    fn modifiers(&self) -> Modifiers;

    /// Add an element and broadcast it.
    fn add_element(&mut self, element: Element);

    /// Replace an element and broadcast it.
    fn update_element(&mut self, element: Element);

    fn select_only(&mut self, id: ElementId);

    fn toggle_selected(&mut self, id: ElementId);

    fn extend_selection(&mut self, ids: Vec<ElementId>);

    fn clear_selection(&mut self);

    /// Record a history snapshot of the current scene.
    fn commit(&mut self);

    fn request_text(&mut self, request: TextRequest);

    /// Pan the camera by a screen-space delta.
    fn pan(&mut self, screen_delta: Vec2);
}

/// A tool provided from outside the core.
pub trait ExternalTool {
    fn on_down(&mut self, point: Point, ctx: &mut dyn ToolContext);

    fn on_move(&mut self, point: Point, ctx: &mut dyn ToolContext);

    fn on_up(&mut self, point: Point, ctx: &mut dyn ToolContext);

    fn preview(&self) -> Option<ToolPreview> {
        None
    }

    fn cancel(&mut self) {}
}

/// State of a tool interaction.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ToolState {
    /// Tool is idle, waiting for interaction.
    #[default]
    Idle,
    /// Dragging the selection.
    Moving { last: Point, moved: bool },
    /// Dragging a corner handle.
    Resizing {
        id: ElementId,
        corner: Corner,
        last: Point,
        resized: bool,
    },
    /// Rubber-band selection.
    Marquee { start: Point, current: Point },
    /// Grabbed a world point with the pan tool.
    Panning { grab: Point },
    /// Drag-to-create for shapes, lines, arrows and text boxes.
    Creating { start: Point, current: Point },
    /// Freehand capture.
    Drawing { points: Vec<Point> },
    /// Dragging out a connector from a snapped anchor.
    Connecting {
        source: ElementId,
        anchor: Anchor,
        start: Point,
        current: Point,
    },
    /// An external tool owns the gesture.
    External,
}

/// Manages the current tool and its state.
#[derive(Default)]
pub struct ToolManager {
    /// Currently selected tool.
    current_tool: ToolKind,
    /// Current state of the tool.
    pub state: ToolState,
    external: HashMap<String, Box<dyn ExternalTool>>,
}

impl ToolManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_tool(&self) -> &ToolKind {
        &self.current_tool
    }

    /// Set the current tool. Any gesture in progress is dropped.
    pub fn set_tool(&mut self, tool: ToolKind) {
        if let Some(ext) = self.active_external() {
            ext.cancel();
        }
        self.current_tool = tool;
        self.state = ToolState::Idle;
    }

    /// Register an external tool under `name`.
    pub fn register_external(&mut self, name: impl Into<String>, tool: Box<dyn ExternalTool>) {
        self.external.insert(name.into(), tool);
    }

    /// Check if a tool interaction is active.
    pub fn is_active(&self) -> bool {
        self.state != ToolState::Idle
    }

    pub fn on_down(&mut self, point: Point, ctx: &mut dyn ToolContext) {
        self.state = ToolState::Idle;
        match self.current_tool.clone() {
            ToolKind::Select => self.state = select::begin(point, ctx),
            ToolKind::Pan => self.state = ToolState::Panning { grab: point },
            ToolKind::Sticky => self.place_sticky(point, ctx),
            ToolKind::Shape(_) | ToolKind::Line | ToolKind::Arrow | ToolKind::Textbox => {
                self.state = ToolState::Creating { start: point, current: point };
            }
            ToolKind::Connector => self.state = connector::begin(point, ctx),
            ToolKind::Draw => self.state = ToolState::Drawing { points: vec![point] },
            ToolKind::Text => ctx.request_text(TextRequest { at: point, bounds: None }),
            ToolKind::External(name) => match self.external.get_mut(&name) {
                Some(ext) => {
                    ext.on_down(point, ctx);
                    self.state = ToolState::External;
                }
                None => log::warn!("No external tool registered as '{}'", name),
            },
        }
    }

    pub fn on_move(&mut self, point: Point, ctx: &mut dyn ToolContext) {
        if self.state == ToolState::External {
            if let Some(ext) = self.active_external() {
                ext.on_move(point, ctx);
            }
            return;
        }
        if select::owns(&self.state) {
            select::drag(&mut self.state, point, ctx);
            return;
        }
        match &mut self.state {
            ToolState::Panning { grab } => {
                let delta = (point - *grab) * ctx.zoom();
                if delta != Vec2::ZERO {
                    ctx.pan(delta);
                }
            }
            ToolState::Creating { current, .. } | ToolState::Connecting { current, .. } => *current = point,
            ToolState::Drawing { points } => points.push(point),
            _ => {}
        }
    }

    pub fn on_up(&mut self, point: Point, ctx: &mut dyn ToolContext) {
        let state = std::mem::take(&mut self.state);
        match state {
            ToolState::Idle | ToolState::Panning { .. } => {}
            ToolState::Moving { .. } | ToolState::Resizing { .. } | ToolState::Marquee { .. } => {
                select::finish(state, point, ctx);
            }
            ToolState::Creating { start, .. } => self.finish_create(start, point, ctx),
            ToolState::Drawing { mut points } => {
                if points.last() != Some(&point) {
                    points.push(point);
                }
                finish_drawing(points, ctx);
            }
            ToolState::Connecting { source, anchor, .. } => connector::finish(source, anchor, point, ctx),
            ToolState::External => {
                if let Some(ext) = self.active_external() {
                    ext.on_up(point, ctx);
                }
            }
        }
    }

    /// Abandon the active gesture. Edits already applied by a drag are committed.
    pub fn cancel(&mut self, ctx: &mut dyn ToolContext) {
        match std::mem::take(&mut self.state) {
            ToolState::Moving { moved: true, .. } | ToolState::Resizing { resized: true, .. } => ctx.commit(),
            ToolState::External => {
                if let Some(ext) = self.active_external() {
                    ext.cancel();
                }
            }
            _ => {}
        }
    }

    /// What to draw for the gesture in progress.
    pub fn preview(&self, registry: &ElementRegistry) -> Option<ToolPreview> {
        match &self.state {
            ToolState::Marquee { start, current } => Some(ToolPreview::Marquee(normalized_rect(*start, *current))),
            ToolState::Creating { start, current } => self
                .created_element(*start, *current, registry)
                .map(ToolPreview::Element),
            ToolState::Drawing { points } if points.len() >= 2 => {
                let mut el = registry.create(ElementKind::Drawing, points[0].x, points[0].y);
                el.points = points.clone();
                Some(ToolPreview::Element(el))
            }
            ToolState::Connecting { start, current, .. } => {
                let el = registry.create(ElementKind::Arrow, start.x, start.y).ending_at(current.x, current.y);
                Some(ToolPreview::Element(el))
            }
            ToolState::External => match &self.current_tool {
                ToolKind::External(name) => self.external.get(name).and_then(|ext| ext.preview()),
                _ => None,
            },
            _ => None,
        }
    }

    fn active_external(&mut self) -> Option<&mut Box<dyn ExternalTool>> {
        match &self.current_tool {
            ToolKind::External(name) => self.external.get_mut(name),
            _ => None,
        }
    }

    fn place_sticky(&mut self, point: Point, ctx: &mut dyn ToolContext) {
        let mut sticky = ctx.registry().create(ElementKind::Sticky, point.x, point.y);
        let rect = sticky.box_rect();
        sticky.x -= rect.width() / 2.0;
        sticky.y -= rect.height() / 2.0;
        let id = sticky.id.clone();
        ctx.add_element(sticky);
        ctx.select_only(id);
        ctx.commit();
        self.set_tool(ToolKind::Select);
    }

    /// Element a create gesture from `start` to `end` would produce, if big enough.
    fn created_element(&self, start: Point, end: Point, registry: &ElementRegistry) -> Option<Element> {
        match &self.current_tool {
            ToolKind::Shape(shape) => {
                let rect = normalized_rect(start, end);
                if rect.width() < MIN_SHAPE_SIZE && rect.height() < MIN_SHAPE_SIZE {
                    return None;
                }
                Some(
                    registry
                        .create(shape.element_kind(), rect.x0, rect.y0)
                        .sized(rect.width(), rect.height()),
                )
            }
            ToolKind::Line | ToolKind::Arrow => {
                if start.distance(end) < MIN_LINE_LENGTH {
                    return None;
                }
                let kind = if self.current_tool == ToolKind::Line {
                    ElementKind::Line
                } else {
                    ElementKind::Arrow
                };
                Some(registry.create(kind, start.x, start.y).ending_at(end.x, end.y))
            }
            ToolKind::Textbox => {
                let rect = textbox_rect(start, end);
                Some(
                    registry
                        .create(ElementKind::Textbox, rect.x0, rect.y0)
                        .sized(rect.width(), rect.height()),
                )
            }
            _ => None,
        }
    }

    fn finish_create(&mut self, start: Point, end: Point, ctx: &mut dyn ToolContext) {
        if self.current_tool == ToolKind::Textbox {
            let rect = textbox_rect(start, end);
            ctx.request_text(TextRequest {
                at: rect.origin(),
                bounds: Some(rect),
            });
            return;
        }
        if let Some(element) = self.created_element(start, end, ctx.registry()) {
            ctx.add_element(element);
            ctx.commit();
        }
    }
}

impl std::fmt::Debug for ToolManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut external: Vec<_> = self.external.keys().collect();
        external.sort();
        f.debug_struct("ToolManager")
            .field("current_tool", &self.current_tool)
            .field("state", &self.state)
            .field("external", &external)
            .finish()
    }
}

/// Drag box for a text box, grown to the minimum size from its top-left corner.
fn textbox_rect(start: Point, end: Point) -> Rect {
    let rect = normalized_rect(start, end);
    Rect::from_origin_size(
        rect.origin(),
        (rect.width().max(MIN_TEXTBOX_SIZE), rect.height().max(MIN_TEXTBOX_SIZE)),
    )
}

fn finish_drawing(points: Vec<Point>, ctx: &mut dyn ToolContext) {
    if points.len() < 2 {
        return;
    }
    let mut drawing = ctx.registry().create(ElementKind::Drawing, points[0].x, points[0].y);
    drawing.points = points;
    ctx.add_element(drawing);
    ctx.commit();
}
