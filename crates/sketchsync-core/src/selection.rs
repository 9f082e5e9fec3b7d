//! Resize handles and asymmetric corner resizing.

use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

use crate::shapes::{Element, ElementRegistry};

/// Smallest width or height a resize may produce, in world units.
pub const MIN_RESIZE_SIZE: f64 = 10.0;

/// Corner positions, named by compass direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Corner {
    Nw,
    Ne,
    Sw,
    Se,
}

impl Corner {
    pub const ALL: [Corner; 4] = [Corner::Nw, Corner::Ne, Corner::Sw, Corner::Se];

    pub fn position(self, rect: Rect) -> Point {
        match self {
            Corner::Nw => Point::new(rect.x0, rect.y0),
            Corner::Ne => Point::new(rect.x1, rect.y0),
            Corner::Sw => Point::new(rect.x0, rect.y1),
            Corner::Se => Point::new(rect.x1, rect.y1),
        }
    }

    fn moves_west_edge(self) -> bool {
        matches!(self, Corner::Nw | Corner::Sw)
    }

    fn moves_north_edge(self) -> bool {
        matches!(self, Corner::Nw | Corner::Ne)
    }
}

/// A resize handle with its position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Handle {
    /// Position in world coordinates.
    pub position: Point,
    pub corner: Corner,
}

impl Handle {
    /// Check if a point (in world coordinates) hits this handle.
    /// `tolerance` should be adjusted for camera zoom.
    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        let dx = point.x - self.position.x;
        let dy = point.y - self.position.y;
        dx * dx + dy * dy <= tolerance * tolerance
    }
}

/// Corner handles for a box.
pub fn corner_handles(bounds: Rect) -> [Handle; 4] {
    Corner::ALL.map(|corner| Handle {
        position: corner.position(bounds),
        corner,
    })
}

/// Handles for an element, empty for kinds that cannot be resized.
pub fn element_handles(element: &Element, registry: &ElementRegistry) -> Vec<Handle> {
    if !registry.resizable(&element.kind) {
        return Vec::new();
    }
    corner_handles(element.box_rect()).to_vec()
}

/// Find the first handle of `element` within `tolerance` of `point`.
pub fn hit_test_handles(element: &Element, registry: &ElementRegistry, point: Point, tolerance: f64) -> Option<Corner> {
    element_handles(element, registry)
        .into_iter()
        .find(|h| h.hit_test(point, tolerance))
        .map(|h| h.corner)
}

/// Outcome of a rejected resize.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeRejected {
    pub width: f64,
    pub height: f64,
}

/// Drag `corner` of `element` by `(dx, dy)`.
///
/// West and north handles move the origin and shrink the size by the same
/// amount; east and south handles only grow the size. The update is rejected
/// as a whole if either dimension would drop below [`MIN_RESIZE_SIZE`].
pub fn apply_resize(element: &mut Element, corner: Corner, dx: f64, dy: f64) -> Result<(), ResizeRejected> {
    let (mut x, mut y) = (element.x, element.y);
    let mut width = element.width.unwrap_or(0.0);
    let mut height = element.height.unwrap_or(0.0);

    if corner.moves_west_edge() {
        x += dx;
        width -= dx;
    } else {
        width += dx;
    }
    if corner.moves_north_edge() {
        y += dy;
        height -= dy;
    } else {
        height += dy;
    }

    if width < MIN_RESIZE_SIZE || height < MIN_RESIZE_SIZE {
        return Err(ResizeRejected { width, height });
    }
    element.x = x;
    element.y = y;
    element.width = Some(width);
    element.height = Some(height);
    Ok(())
}
