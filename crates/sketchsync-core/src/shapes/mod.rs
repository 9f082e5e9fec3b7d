//! Element definitions for the board.
//!
//! Every element on the wire and in history snapshots is a single [`Element`]
//! record tagged by [`ElementKind`]. Per-kind behavior (defaults, drawing,
//! hit-testing) lives behind [`ElementBehavior`] in the [`ElementRegistry`].

mod connector;
mod ellipse;
mod freehand;
mod line;
mod polygon;
mod rectangle;
mod registry;
mod text;

pub use connector::{
    ConnectorBehavior, ResolvedEndpoints, anchor_bounds, connector_between, resolve_connector_endpoints,
};
pub use ellipse::CircleBehavior;
pub use freehand::DrawingBehavior;
pub use line::LineBehavior;
pub use polygon::{PolygonBehavior, PolygonKind};
pub use rectangle::{BoxBehavior, BoxKind, STICKY_SIZE, wrap_text};
pub use registry::{ElementBehavior, ElementRegistry, HitContext};
pub use text::{TextBehavior, LINE_HEIGHT};

use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Globally unique element identifier, `el_{unix_ms}_{counter}_{client}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(String);

impl ElementId {
    /// Generate a fresh id.
    ///
    /// The counter is process-wide and monotonic, the suffix is random per
    /// process, so two clients creating elements in the same millisecond
    /// still produce distinct ids.
    pub fn generate() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        static CLIENT_TAG: OnceLock<String> = OnceLock::new();

        let tag = CLIENT_TAG.get_or_init(|| uuid::Uuid::new_v4().simple().to_string()[..8].to_string());
        let counter = COUNTER.fetch_add(1, Ordering::Relaxed);
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        Self(format!("el_{millis}_{counter}_{tag}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ElementId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ElementId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Element type tag. Unknown tags survive as [`ElementKind::Custom`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ElementKind {
    Sticky,
    Rect,
    Circle,
    Triangle,
    Diamond,
    Star,
    Hexagon,
    Line,
    Arrow,
    Drawing,
    Text,
    Textbox,
    Image,
    Connector,
    Custom(String),
}

impl ElementKind {
    /// All kinds handled by the built-in registry.
    pub const BUILTIN: [ElementKind; 14] = [
        ElementKind::Sticky,
        ElementKind::Rect,
        ElementKind::Circle,
        ElementKind::Triangle,
        ElementKind::Diamond,
        ElementKind::Star,
        ElementKind::Hexagon,
        ElementKind::Line,
        ElementKind::Arrow,
        ElementKind::Drawing,
        ElementKind::Text,
        ElementKind::Textbox,
        ElementKind::Image,
        ElementKind::Connector,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            ElementKind::Sticky => "sticky",
            ElementKind::Rect => "rect",
            ElementKind::Circle => "circle",
            ElementKind::Triangle => "triangle",
            ElementKind::Diamond => "diamond",
            ElementKind::Star => "star",
            ElementKind::Hexagon => "hexagon",
            ElementKind::Line => "line",
            ElementKind::Arrow => "arrow",
            ElementKind::Drawing => "drawing",
            ElementKind::Text => "text",
            ElementKind::Textbox => "textbox",
            ElementKind::Image => "image",
            ElementKind::Connector => "connector",
            ElementKind::Custom(tag) => tag,
        }
    }

    /// Two-point kinds whose geometry is `x,y` to `x2,y2`.
    pub fn is_line_like(&self) -> bool {
        matches!(self, ElementKind::Line | ElementKind::Arrow | ElementKind::Connector)
    }
}

impl From<String> for ElementKind {
    fn from(tag: String) -> Self {
        ElementKind::BUILTIN
            .iter()
            .find(|k| k.as_str() == tag)
            .cloned()
            .unwrap_or(ElementKind::Custom(tag))
    }
}

impl From<&str> for ElementKind {
    fn from(tag: &str) -> Self {
        ElementKind::from(tag.to_string())
    }
}

impl From<ElementKind> for String {
    fn from(kind: ElementKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named attachment point on an element's edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Anchor {
    #[default]
    Auto,
    Top,
    Right,
    Bottom,
    Left,
}

impl Anchor {
    /// Concrete anchors in tie-break order.
    pub const SIDES: [Anchor; 4] = [Anchor::Top, Anchor::Right, Anchor::Bottom, Anchor::Left];

    /// Position of this anchor on `rect`. `Auto` maps to the center.
    pub fn position(self, rect: Rect) -> Point {
        let c = rect.center();
        match self {
            Anchor::Top => Point::new(c.x, rect.y0),
            Anchor::Right => Point::new(rect.x1, c.y),
            Anchor::Bottom => Point::new(c.x, rect.y1),
            Anchor::Left => Point::new(rect.x0, c.y),
            Anchor::Auto => c,
        }
    }
}

/// Arrowhead style at a connector's end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Marker {
    None,
    #[default]
    Arrow,
}

/// A board element as it appears on the wire and in snapshots.
///
/// Type-specific geometry is optional: box-like kinds use `width`/`height`,
/// line-like kinds use `x2`/`y2`, drawings use `points`, connectors use the
/// source/target references. Fields this struct does not model are kept in
/// `extra` so that records round-trip unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    pub id: ElementId,
    #[serde(rename = "type")]
    pub kind: ElementKind,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x2: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y2: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub points: Vec<Point>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<ElementId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<ElementId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_anchor: Option<Anchor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_anchor: Option<Anchor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub star_points: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_marker: Option<Marker>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Element {
    /// Create a bare element with a fresh id and no defaults applied.
    ///
    /// Use [`ElementRegistry::create`] to get registered defaults.
    pub fn new(kind: impl Into<ElementKind>, x: f64, y: f64) -> Self {
        Self::with_id(ElementId::generate(), kind, x, y)
    }

    /// Create a bare element with an explicit id.
    pub fn with_id(id: impl Into<ElementId>, kind: impl Into<ElementKind>, x: f64, y: f64) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            x,
            y,
            width: None,
            height: None,
            x2: None,
            y2: None,
            points: Vec::new(),
            source_id: None,
            target_id: None,
            source_anchor: None,
            target_anchor: None,
            color: None,
            fill: None,
            stroke_width: None,
            font_size: None,
            rotation: None,
            content: None,
            url: None,
            star_points: None,
            end_marker: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn sized(mut self, width: f64, height: f64) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn ending_at(mut self, x2: f64, y2: f64) -> Self {
        self.x2 = Some(x2);
        self.y2 = Some(y2);
        self
    }

    pub fn with_points(mut self, points: Vec<Point>) -> Self {
        self.points = points;
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Start point.
    pub fn start(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// End point of a line-like element; the start point if unset.
    pub fn end(&self) -> Point {
        Point::new(self.x2.unwrap_or(self.x), self.y2.unwrap_or(self.y))
    }

    /// Axis-aligned box from `x,y,width,height`, missing sizes treated as zero.
    pub fn box_rect(&self) -> Rect {
        self.box_rect_or(0.0, 0.0)
    }

    /// Axis-aligned box using fallbacks for missing sizes.
    pub fn box_rect_or(&self, width: f64, height: f64) -> Rect {
        Rect::new(
            self.x,
            self.y,
            self.x + self.width.unwrap_or(width),
            self.y + self.height.unwrap_or(height),
        )
    }

    /// Bounding box of the point list, if any.
    pub fn points_bounds(&self) -> Option<Rect> {
        let first = self.points.first()?;
        let init = Rect::from_points(*first, *first);
        Some(self.points.iter().fold(init, |r, p| r.union_pt(*p)))
    }

    /// Move every geometric field by `delta`.
    pub fn translate(&mut self, delta: Vec2) {
        self.x += delta.x;
        self.y += delta.y;
        if let Some(x2) = self.x2.as_mut() {
            *x2 += delta.x;
        }
        if let Some(y2) = self.y2.as_mut() {
            *y2 += delta.y;
        }
        for p in &mut self.points {
            *p += delta;
        }
    }

    /// Whether this element references `id` as a connector endpoint.
    pub fn references(&self, id: &ElementId) -> bool {
        self.source_id.as_ref() == Some(id) || self.target_id.as_ref() == Some(id)
    }
}
