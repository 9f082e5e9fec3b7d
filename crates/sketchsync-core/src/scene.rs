//! The ordered element collection and the local selection.

use std::collections::HashSet;

use kurbo::{Point, Rect};

use crate::geometry::{rect_contains_inclusive, rects_overlap};
use crate::render::Painter;
use crate::shapes::{Element, ElementId, ElementKind, ElementRegistry, HitContext, resolve_connector_endpoints};

/// Size assumed for elements without one when testing marquee overlap.
const MARQUEE_DEFAULT_SIZE: (f64, f64) = (100.0, 30.0);

/// What a bulk reconciliation changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneDiff {
    pub added: Vec<ElementId>,
    pub updated: Vec<ElementId>,
    pub removed: Vec<ElementId>,
}

impl SceneDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }
}

/// Elements in draw order (later entries draw on top and are hit first),
/// plus the set of selected ids.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    elements: Vec<Element>,
    selection: HashSet<ElementId>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_elements(elements: Vec<Element>) -> Self {
        Self {
            elements,
            selection: HashSet::new(),
        }
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn index_of(&self, id: &ElementId) -> Option<usize> {
        self.elements.iter().position(|e| &e.id == id)
    }

    pub fn contains(&self, id: &ElementId) -> bool {
        self.index_of(id).is_some()
    }

    pub fn get(&self, id: &ElementId) -> Option<&Element> {
        self.elements.iter().find(|e| &e.id == id)
    }

    pub(crate) fn get_mut(&mut self, id: &ElementId) -> Option<&mut Element> {
        self.elements.iter_mut().find(|e| &e.id == id)
    }

    // --- Mutation API ---

    /// Append an element. Returns false if the id already exists.
    pub fn add(&mut self, element: Element) -> bool {
        if self.contains(&element.id) {
            return false;
        }
        self.elements.push(element);
        true
    }

    /// Replace an existing element in place. Returns false if the id is unknown.
    pub fn update(&mut self, element: Element) -> bool {
        match self.get_mut(&element.id) {
            Some(slot) => {
                *slot = element;
                true
            }
            None => false,
        }
    }

    /// Remove an element and drop it from the selection.
    pub fn remove(&mut self, id: &ElementId) -> Option<Element> {
        self.selection.remove(id);
        let index = self.index_of(id)?;
        Some(self.elements.remove(index))
    }

    /// Replace the whole element list. Selected ids that no longer exist are dropped.
    pub fn replace_all(&mut self, elements: Vec<Element>) {
        self.elements = elements;
        self.purge_selection();
    }

    /// Make this scene equal `remote` by set difference.
    ///
    /// Known ids are replaced, unknown ids are added, and local ids absent from
    /// `remote` are removed. The result takes the remote order.
    pub fn reconcile(&mut self, remote: Vec<Element>) -> SceneDiff {
        let mut diff = SceneDiff::default();
        let remote_ids: HashSet<&ElementId> = remote.iter().map(|e| &e.id).collect();
        for local in &self.elements {
            if !remote_ids.contains(&local.id) {
                diff.removed.push(local.id.clone());
            }
        }
        for el in &remote {
            match self.get(&el.id) {
                Some(local) if local == el => {}
                Some(_) => diff.updated.push(el.id.clone()),
                None => diff.added.push(el.id.clone()),
            }
        }
        self.replace_all(remote);
        diff
    }

    /// Merge a server snapshot: remote wins on id collision, local-only ids are kept.
    ///
    /// Remote elements come first in remote order, followed by local-only
    /// elements in their existing order.
    pub fn merge_remote(&mut self, remote: Vec<Element>) -> SceneDiff {
        let mut diff = SceneDiff::default();
        let remote_ids: HashSet<ElementId> = remote.iter().map(|e| e.id.clone()).collect();
        for el in &remote {
            match self.get(&el.id) {
                Some(local) if local == el => {}
                Some(_) => diff.updated.push(el.id.clone()),
                None => diff.added.push(el.id.clone()),
            }
        }
        let local_only = std::mem::take(&mut self.elements)
            .into_iter()
            .filter(|e| !remote_ids.contains(&e.id));
        let mut merged = remote;
        merged.extend(local_only);
        self.replace_all(merged);
        diff
    }

    // --- Selection ---

    pub fn selection(&self) -> &HashSet<ElementId> {
        &self.selection
    }

    pub fn is_selected(&self, id: &ElementId) -> bool {
        self.selection.contains(id)
    }

    /// Selected elements in draw order.
    pub fn selected_elements(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter().filter(|e| self.selection.contains(&e.id))
    }

    pub fn select(&mut self, id: ElementId) {
        if self.contains(&id) {
            self.selection.insert(id);
        }
    }

    pub fn select_only(&mut self, id: ElementId) {
        self.selection.clear();
        self.select(id);
    }

    /// Toggle membership; returns whether the id is selected afterwards.
    pub fn toggle_selected(&mut self, id: ElementId) -> bool {
        if self.selection.remove(&id) {
            false
        } else {
            self.select(id.clone());
            self.selection.contains(&id)
        }
    }

    pub fn select_all(&mut self) {
        self.selection = self.elements.iter().map(|e| e.id.clone()).collect();
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    fn purge_selection(&mut self) {
        let live: HashSet<&ElementId> = self.elements.iter().map(|e| &e.id).collect();
        self.selection.retain(|id| live.contains(id));
    }

    // --- Queries ---

    /// Topmost element under a world point.
    pub fn hit_test_elements(&self, point: Point, registry: &ElementRegistry, tolerance: f64) -> Option<&Element> {
        let ctx = HitContext::new(tolerance, &self.elements);
        self.elements
            .iter()
            .rev()
            .find(|e| registry.hit_test(e, point, &ctx))
    }

    /// Elements whose geometry falls within a marquee rectangle.
    ///
    /// Lines match when either endpoint is inside, drawings when any point is,
    /// connectors when both resolved endpoints are, everything else on
    /// bounding-box overlap.
    pub fn elements_in_rect(&self, rect: Rect) -> Vec<ElementId> {
        let rect = rect.abs();
        self.elements
            .iter()
            .filter(|el| match el.kind {
                ElementKind::Line | ElementKind::Arrow => {
                    rect_contains_inclusive(rect, el.start()) || rect_contains_inclusive(rect, el.end())
                }
                ElementKind::Drawing => el.points.iter().any(|p| rect_contains_inclusive(rect, *p)),
                ElementKind::Connector => {
                    let ends = resolve_connector_endpoints(el, &self.elements);
                    rect_contains_inclusive(rect, ends.start) && rect_contains_inclusive(rect, ends.end)
                }
                _ => rects_overlap(el.box_rect_or(MARQUEE_DEFAULT_SIZE.0, MARQUEE_DEFAULT_SIZE.1), rect),
            })
            .map(|el| el.id.clone())
            .collect()
    }

    /// Connectors whose source or target is one of `ids`.
    pub fn connectors_referencing(&self, ids: &HashSet<ElementId>) -> Vec<ElementId> {
        self.elements
            .iter()
            .filter(|e| e.kind == ElementKind::Connector && ids.iter().any(|id| e.references(id)))
            .map(|e| e.id.clone())
            .collect()
    }

    // --- Per-frame derived state ---

    /// Store each connector's resolved endpoints as its static fallback.
    pub fn refresh_connector_endpoints(&mut self) {
        let resolved: Vec<(usize, Point, Point)> = self
            .elements
            .iter()
            .enumerate()
            .filter(|(_, e)| e.kind == ElementKind::Connector)
            .filter_map(|(i, e)| {
                let ends = resolve_connector_endpoints(e, &self.elements);
                ends.anchors.map(|_| (i, ends.start, ends.end))
            })
            .collect();
        for (i, start, end) in resolved {
            let el = &mut self.elements[i];
            el.x = start.x;
            el.y = start.y;
            el.x2 = Some(end.x);
            el.y2 = Some(end.y);
        }
    }

    /// Let each behavior refresh measured fields (text sizes).
    pub fn refresh_metrics(&mut self, registry: &ElementRegistry, painter: &mut dyn Painter) {
        for el in &mut self.elements {
            registry.refresh_metrics(el, painter);
        }
    }
}
