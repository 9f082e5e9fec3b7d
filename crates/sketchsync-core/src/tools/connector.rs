//! Connector tool: drag from one element's anchor to another's.

use kurbo::Point;

use super::{ToolContext, ToolState};
use crate::shapes::{Anchor, Element, ElementId, ElementRegistry, anchor_bounds, connector_between};

/// Snap radius for anchors, in screen pixels.
pub const CONNECTOR_SNAP_PX: f64 = 15.0;

/// The anchor nearest `point` within `radius`, across all anchor-capable elements.
///
/// `exclude` skips one element, used so a connector cannot end where it started.
pub fn nearest_anchor<'a>(
    elements: &'a [Element],
    registry: &ElementRegistry,
    point: Point,
    radius: f64,
    exclude: Option<&ElementId>,
) -> Option<(&'a Element, Anchor, Point)> {
    let mut best: Option<(&Element, Anchor, Point, f64)> = None;
    for el in elements {
        if Some(&el.id) == exclude || !registry.has_anchors(&el.kind) {
            continue;
        }
        let rect = anchor_bounds(el);
        for side in Anchor::SIDES {
            let pos = side.position(rect);
            let dist = pos.distance(point);
            if dist <= radius && best.as_ref().is_none_or(|(.., d)| dist < *d) {
                best = Some((el, side, pos, dist));
            }
        }
    }
    best.map(|(el, side, pos, _)| (el, side, pos))
}

pub(super) fn begin(point: Point, ctx: &mut dyn ToolContext) -> ToolState {
    let radius = CONNECTOR_SNAP_PX / ctx.zoom();
    match nearest_anchor(ctx.scene().elements(), ctx.registry(), point, radius, None) {
        Some((el, anchor, pos)) => ToolState::Connecting {
            source: el.id.clone(),
            anchor,
            start: pos,
            current: point,
        },
        None => ToolState::Idle,
    }
}

pub(super) fn finish(source: ElementId, source_anchor: Anchor, point: Point, ctx: &mut dyn ToolContext) {
    let radius = CONNECTOR_SNAP_PX / ctx.zoom();
    let scene = ctx.scene();
    let Some(source_el) = scene.get(&source) else {
        return;
    };
    let Some((target, target_anchor, _)) =
        nearest_anchor(scene.elements(), ctx.registry(), point, radius, Some(&source))
    else {
        return;
    };
    let connector = connector_between(source_el, target, source_anchor, target_anchor);
    let id = connector.id.clone();
    ctx.add_element(connector);
    ctx.commit();
    ctx.select_only(id);
}

#[cfg(test)]
mod tests {
    use super::super::tests::TestContext;
    use super::super::{ToolKind, ToolManager};
    use super::*;
    use crate::shapes::ElementKind;

    fn boxes() -> Vec<Element> {
        vec![
            Element::with_id("a", ElementKind::Rect, 0.0, 0.0).sized(100.0, 100.0),
            Element::with_id("b", ElementKind::Rect, 300.0, 0.0).sized(100.0, 100.0),
            Element::with_id("l", ElementKind::Line, 0.0, 200.0).ending_at(100.0, 200.0),
        ]
    }

    #[test]
    fn test_nearest_anchor_is_global() {
        let registry = ElementRegistry::with_builtin();
        let elements = boxes();
        let (el, side, pos) = nearest_anchor(&elements, &registry, Point::new(305.0, 48.0), 15.0, None).unwrap();
        assert_eq!(el.id.as_str(), "b");
        assert_eq!(side, Anchor::Left);
        assert_eq!(pos, Point::new(300.0, 50.0));
        assert!(nearest_anchor(&elements, &registry, Point::new(200.0, 50.0), 15.0, None).is_none());
    }

    #[test]
    fn test_lines_have_no_anchors() {
        let registry = ElementRegistry::with_builtin();
        let elements = boxes();
        assert!(nearest_anchor(&elements, &registry, Point::new(50.0, 200.0), 15.0, None).is_none());
    }

    #[test]
    fn test_connector_drag_creates_with_named_anchors() {
        let mut tm = ToolManager::new();
        let mut ctx = TestContext::with(boxes());
        tm.set_tool(ToolKind::Connector);
        tm.on_down(Point::new(98.0, 52.0), &mut ctx);
        tm.on_move(Point::new(200.0, 50.0), &mut ctx);
        tm.on_up(Point::new(350.0, 4.0), &mut ctx);

        let conn = ctx.scene.elements().last().unwrap();
        assert_eq!(conn.kind, ElementKind::Connector);
        assert_eq!(conn.source_id.as_ref().map(|id| id.as_str()), Some("a"));
        assert_eq!(conn.target_id.as_ref().map(|id| id.as_str()), Some("b"));
        assert_eq!(conn.source_anchor, Some(Anchor::Right));
        assert_eq!(conn.target_anchor, Some(Anchor::Top));
        assert!(ctx.scene.is_selected(&conn.id));
        assert_eq!(ctx.commits, 1);
    }

    #[test]
    fn test_connector_without_snap_is_discarded() {
        let mut tm = ToolManager::new();
        let mut ctx = TestContext::with(boxes());
        tm.set_tool(ToolKind::Connector);

        // Start away from any anchor.
        tm.on_down(Point::new(50.0, 50.0), &mut ctx);
        assert!(!tm.is_active());
        tm.on_up(Point::new(300.0, 50.0), &mut ctx);

        // End on the same element.
        tm.on_down(Point::new(100.0, 50.0), &mut ctx);
        tm.on_up(Point::new(50.0, 100.0), &mut ctx);

        assert_eq!(ctx.scene.len(), 3);
        assert_eq!(ctx.commits, 0);
    }

    #[test]
    fn test_snap_radius_scales_with_zoom() {
        let mut tm = ToolManager::new();
        let mut ctx = TestContext::with(boxes());
        ctx.zoom = 4.0;
        tm.set_tool(ToolKind::Connector);
        // 10 world units away is 40 screen pixels at 4x.
        tm.on_down(Point::new(110.0, 50.0), &mut ctx);
        assert!(!tm.is_active());
    }
}
