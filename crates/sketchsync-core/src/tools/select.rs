//! Select tool: click, shift-click, marquee, drag-move and corner resize.

use kurbo::Point;

use super::{ToolContext, ToolState};
use crate::geometry::{HIT_TOLERANCE_PX, normalized_rect};
use crate::selection::{apply_resize, hit_test_handles};
use crate::shapes::{Element, ElementKind};

/// Whether `state` is one of the select tool's gestures.
pub(super) fn owns(state: &ToolState) -> bool {
    matches!(
        state,
        ToolState::Moving { .. } | ToolState::Resizing { .. } | ToolState::Marquee { .. }
    )
}

pub(super) fn begin(point: Point, ctx: &mut dyn ToolContext) -> ToolState {
    let tolerance = HIT_TOLERANCE_PX / ctx.zoom();

    let handle = ctx.scene().selected_elements().find_map(|el| {
        hit_test_handles(el, ctx.registry(), point, tolerance).map(|corner| (el.id.clone(), corner))
    });
    if let Some((id, corner)) = handle {
        return ToolState::Resizing {
            id,
            corner,
            last: point,
            resized: false,
        };
    }

    let shift = ctx.modifiers().shift;
    let hit = ctx
        .scene()
        .hit_test_elements(point, ctx.registry(), tolerance)
        .map(|el| el.id.clone());
    match hit {
        Some(id) => {
            if shift {
                ctx.toggle_selected(id);
            } else if !ctx.scene().is_selected(&id) {
                ctx.select_only(id);
            }
            ToolState::Moving {
                last: point,
                moved: false,
            }
        }
        None => {
            if !shift {
                ctx.clear_selection();
            }
            ToolState::Marquee {
                start: point,
                current: point,
            }
        }
    }
}

pub(super) fn drag(state: &mut ToolState, point: Point, ctx: &mut dyn ToolContext) {
    match state {
        ToolState::Moving { last, moved } => {
            let delta = point - *last;
            if delta.x == 0.0 && delta.y == 0.0 {
                return;
            }
            // Connector geometry follows its endpoints.
            let moving: Vec<Element> = ctx
                .scene()
                .selected_elements()
                .filter(|el| el.kind != ElementKind::Connector)
                .cloned()
                .collect();
            for mut el in moving {
                el.translate(delta);
                ctx.update_element(el);
            }
            *last = point;
            *moved = true;
        }
        ToolState::Resizing {
            id,
            corner,
            last,
            resized,
        } => {
            let Some(mut el) = ctx.scene().get(id).cloned() else {
                return;
            };
            let delta = point - *last;
            match apply_resize(&mut el, *corner, delta.x, delta.y) {
                Ok(()) => {
                    ctx.update_element(el);
                    *last = point;
                    *resized = true;
                }
                Err(rejected) => {
                    log::trace!("Resize of {} rejected at {}x{}", id, rejected.width, rejected.height);
                }
            }
        }
        ToolState::Marquee { current, .. } => *current = point,
        _ => {}
    }
}

pub(super) fn finish(state: ToolState, point: Point, ctx: &mut dyn ToolContext) {
    match state {
        ToolState::Moving { moved: true, .. } | ToolState::Resizing { resized: true, .. } => ctx.commit(),
        ToolState::Marquee { start, .. } => {
            let ids = ctx.scene().elements_in_rect(normalized_rect(start, point));
            if !ids.is_empty() {
                ctx.extend_selection(ids);
            }
        }
        _ => {}
    }
}
