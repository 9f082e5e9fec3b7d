//! Connectors attach two elements by anchor and follow them as they move.
//!
//! A connector's own `x,y,x2,y2` are only a fallback; the drawn endpoints are
//! recomputed from the referenced elements every time.

use kurbo::{Point, Rect};

use super::{Anchor, Element, ElementBehavior, ElementKind, HitContext, Marker, TextBehavior};
use crate::geometry::point_to_segment_dist;
use crate::render::DrawContext;

/// Endpoints of a connector after resolving its references.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedEndpoints {
    pub start: Point,
    pub end: Point,
    /// Concrete anchors used, `None` when falling back to static endpoints.
    pub anchors: Option<(Anchor, Anchor)>,
}

/// Rectangle whose edge midpoints are the element's anchors.
pub fn anchor_bounds(element: &Element) -> Rect {
    match element.kind {
        ElementKind::Text => TextBehavior::text_rect(element),
        _ => element.box_rect(),
    }
}

/// The concrete side of `rect` closest to `toward`. Ties keep the earlier side.
fn nearest_side(rect: Rect, toward: Point) -> Anchor {
    let mut best = Anchor::Top;
    let mut best_dist = f64::INFINITY;
    for side in Anchor::SIDES {
        let d = side.position(rect).distance(toward);
        if d < best_dist {
            best = side;
            best_dist = d;
        }
    }
    best
}

/// Resolve a connector's endpoints against the current element list.
///
/// Named anchors are used as-is; `auto` picks the side nearest the other
/// element's center. If either reference is missing the static endpoints are
/// returned unchanged.
pub fn resolve_connector_endpoints(connector: &Element, elements: &[Element]) -> ResolvedEndpoints {
    let fallback = ResolvedEndpoints {
        start: connector.start(),
        end: connector.end(),
        anchors: None,
    };
    let find = |id: &Option<super::ElementId>| {
        id.as_ref()
            .and_then(|id| elements.iter().find(|e| &e.id == id))
    };
    let (Some(source), Some(target)) = (find(&connector.source_id), find(&connector.target_id)) else {
        return fallback;
    };

    let source_rect = anchor_bounds(source);
    let target_rect = anchor_bounds(target);
    let pick = |requested: Option<Anchor>, own: Rect, other: Rect| match requested.unwrap_or_default() {
        Anchor::Auto => nearest_side(own, other.center()),
        side => side,
    };
    let source_anchor = pick(connector.source_anchor, source_rect, target_rect);
    let target_anchor = pick(connector.target_anchor, target_rect, source_rect);

    ResolvedEndpoints {
        start: source_anchor.position(source_rect),
        end: target_anchor.position(target_rect),
        anchors: Some((source_anchor, target_anchor)),
    }
}

/// Build a connector from `source` to `target` with the given anchors.
pub fn connector_between(source: &Element, target: &Element, source_anchor: Anchor, target_anchor: Anchor) -> Element {
    let mut connector = Element::new(ElementKind::Connector, 0.0, 0.0);
    connector.source_id = Some(source.id.clone());
    connector.target_id = Some(target.id.clone());
    connector.source_anchor = Some(source_anchor);
    connector.target_anchor = Some(target_anchor);
    ConnectorBehavior.apply_defaults(&mut connector);

    let pair = [source.clone(), target.clone()];
    let resolved = resolve_connector_endpoints(&connector, &pair);
    connector.x = resolved.start.x;
    connector.y = resolved.start.y;
    connector.x2 = Some(resolved.end.x);
    connector.y2 = Some(resolved.end.y);
    connector
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectorBehavior;

impl ElementBehavior for ConnectorBehavior {
    fn apply_defaults(&self, element: &mut Element) {
        element.color.get_or_insert_with(|| "#333333".into());
        element.stroke_width.get_or_insert(2.0);
        element.source_anchor.get_or_insert(Anchor::Auto);
        element.target_anchor.get_or_insert(Anchor::Auto);
        element.end_marker.get_or_insert(Marker::Arrow);
    }

    fn bounds(&self, element: &Element) -> Option<Rect> {
        Some(Rect::from_points(element.start(), element.end()))
    }

    fn hit_test(&self, element: &Element, point: Point, ctx: &HitContext<'_>) -> bool {
        let ends = resolve_connector_endpoints(element, ctx.elements);
        point_to_segment_dist(point, ends.start, ends.end) <= ctx.tolerance
    }

    fn draw(&self, element: &Element, ctx: &mut DrawContext<'_>) {
        let ends = resolve_connector_endpoints(element, ctx.elements);
        let arrowhead = element.end_marker.unwrap_or_default() == Marker::Arrow;
        super::line::draw_segment(ends.start, ends.end, element, arrowhead, ctx);
    }

    fn has_anchors(&self) -> bool {
        false
    }
}
