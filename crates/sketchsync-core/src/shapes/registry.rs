//! Open mapping from element kind to behavior.

use std::collections::HashMap;

use kurbo::{Point, Rect};

use super::{
    BoxBehavior, BoxKind, CircleBehavior, ConnectorBehavior, DrawingBehavior, Element, ElementKind,
    LineBehavior, PolygonBehavior, PolygonKind, TextBehavior,
};
use crate::render::{DrawContext, Painter};

/// Inputs to a hit test beyond the element and the point.
#[derive(Clone, Copy)]
pub struct HitContext<'a> {
    /// Distance in world units that still counts as a hit for thin shapes.
    pub tolerance: f64,
    /// The full element list, for kinds whose geometry depends on others.
    pub elements: &'a [Element],
}

impl<'a> HitContext<'a> {
    pub fn new(tolerance: f64, elements: &'a [Element]) -> Self {
        Self { tolerance, elements }
    }
}

/// Per-kind behavior. One implementation per element variant.
pub trait ElementBehavior: Send + Sync {
    /// Fill in default properties for a freshly created element.
    fn apply_defaults(&self, element: &mut Element);

    /// World-space bounding box, if the element has any extent.
    fn bounds(&self, element: &Element) -> Option<Rect>;

    /// Check whether a world point hits this element.
    fn hit_test(&self, element: &Element, point: Point, ctx: &HitContext<'_>) -> bool;

    /// Draw the element through the painter.
    fn draw(&self, element: &Element, ctx: &mut DrawContext<'_>);

    /// Whether corner resize handles apply.
    fn resizable(&self) -> bool {
        false
    }

    /// Whether the element exposes connector anchors.
    fn has_anchors(&self) -> bool {
        true
    }

    /// Refresh measured fields before drawing. Called once per frame.
    fn refresh_metrics(&self, _element: &mut Element, _painter: &mut dyn Painter) {}
}

/// Registry of element behaviors keyed by kind tag.
///
/// Kinds without a registered behavior are kept in the scene but never drawn
/// or hit.
pub struct ElementRegistry {
    behaviors: HashMap<ElementKind, Box<dyn ElementBehavior>>,
}

impl ElementRegistry {
    /// An empty registry.
    pub fn empty() -> Self {
        Self {
            behaviors: HashMap::new(),
        }
    }

    /// A registry with every built-in kind.
    pub fn with_builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(ElementKind::Sticky, BoxBehavior::new(BoxKind::Sticky));
        registry.register(ElementKind::Rect, BoxBehavior::new(BoxKind::Rect));
        registry.register(ElementKind::Textbox, BoxBehavior::new(BoxKind::Textbox));
        registry.register(ElementKind::Image, BoxBehavior::new(BoxKind::Image));
        registry.register(ElementKind::Circle, CircleBehavior);
        registry.register(ElementKind::Triangle, PolygonBehavior::new(PolygonKind::Triangle));
        registry.register(ElementKind::Diamond, PolygonBehavior::new(PolygonKind::Diamond));
        registry.register(ElementKind::Star, PolygonBehavior::new(PolygonKind::Star));
        registry.register(ElementKind::Hexagon, PolygonBehavior::new(PolygonKind::Hexagon));
        registry.register(ElementKind::Line, LineBehavior::line());
        registry.register(ElementKind::Arrow, LineBehavior::arrow());
        registry.register(ElementKind::Drawing, DrawingBehavior);
        registry.register(ElementKind::Text, TextBehavior);
        registry.register(ElementKind::Connector, ConnectorBehavior);
        registry
    }

    /// Register or replace the behavior for a kind.
    pub fn register(&mut self, kind: ElementKind, behavior: impl ElementBehavior + 'static) {
        if self.behaviors.insert(kind.clone(), Box::new(behavior)).is_some() {
            log::debug!("Replaced behavior for element kind '{}'", kind);
        }
    }

    pub fn get(&self, kind: &ElementKind) -> Option<&dyn ElementBehavior> {
        self.behaviors.get(kind).map(|b| b.as_ref())
    }

    pub fn contains(&self, kind: &ElementKind) -> bool {
        self.behaviors.contains_key(kind)
    }

    /// Create an element of `kind` at `(x, y)` with a fresh id and defaults.
    pub fn create(&self, kind: ElementKind, x: f64, y: f64) -> Element {
        let mut element = Element::new(kind, x, y);
        if let Some(behavior) = self.get(&element.kind) {
            behavior.apply_defaults(&mut element);
        }
        element
    }

    pub fn bounds(&self, element: &Element) -> Option<Rect> {
        self.get(&element.kind).and_then(|b| b.bounds(element))
    }

    pub fn hit_test(&self, element: &Element, point: Point, ctx: &HitContext<'_>) -> bool {
        self.get(&element.kind)
            .is_some_and(|b| b.hit_test(element, point, ctx))
    }

    pub fn draw(&self, element: &Element, ctx: &mut DrawContext<'_>) {
        if let Some(behavior) = self.get(&element.kind) {
            behavior.draw(element, ctx);
        }
    }

    pub fn resizable(&self, kind: &ElementKind) -> bool {
        self.get(kind).is_some_and(|b| b.resizable())
    }

    pub fn has_anchors(&self, kind: &ElementKind) -> bool {
        self.get(kind).is_some_and(|b| b.has_anchors())
    }

    pub fn refresh_metrics(&self, element: &mut Element, painter: &mut dyn Painter) {
        if let Some(behavior) = self.behaviors.get(&element.kind) {
            behavior.refresh_metrics(element, painter);
        }
    }
}

impl Default for ElementRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

impl std::fmt::Debug for ElementRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<_> = self.behaviors.keys().map(|k| k.as_str()).collect();
        kinds.sort_unstable();
        f.debug_struct("ElementRegistry").field("kinds", &kinds).finish()
    }
}
