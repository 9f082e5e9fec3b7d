//! Snapshot-based undo/redo.

use crate::shapes::Element;

/// Default number of snapshots kept.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Linear history of full scene snapshots.
///
/// `cursor` indexes the snapshot matching the live scene. Taking a snapshot
/// drops everything after the cursor; there is no redo branch.
#[derive(Debug, Clone)]
pub struct History {
    snapshots: Vec<Vec<Element>>,
    cursor: usize,
    limit: usize,
}

impl History {
    /// Start a history whose first entry is `initial`.
    pub fn new(initial: &[Element], limit: usize) -> Self {
        Self {
            snapshots: vec![initial.to_vec()],
            cursor: 0,
            limit: limit.max(1),
        }
    }

    /// Record the current elements.
    pub fn snapshot(&mut self, elements: &[Element]) {
        self.snapshots.truncate(self.cursor + 1);
        self.snapshots.push(elements.to_vec());
        if self.snapshots.len() > self.limit {
            let overflow = self.snapshots.len() - self.limit;
            self.snapshots.drain(..overflow);
        }
        self.cursor = self.snapshots.len() - 1;
    }

    /// Discard all entries and start over from `elements`.
    pub fn reset(&mut self, elements: &[Element]) {
        self.snapshots = vec![elements.to_vec()];
        self.cursor = 0;
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.snapshots.len()
    }

    /// Step back, returning a copy of the snapshot to restore.
    pub fn undo(&mut self) -> Option<Vec<Element>> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        Some(self.snapshots[self.cursor].clone())
    }

    /// Step forward, returning a copy of the snapshot to restore.
    pub fn redo(&mut self) -> Option<Vec<Element>> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        Some(self.snapshots[self.cursor].clone())
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(&[], DEFAULT_HISTORY_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::ElementKind;

    fn state(n: usize) -> Vec<Element> {
        (0..n)
            .map(|i| Element::with_id(format!("el_{i}"), ElementKind::Rect, i as f64, 0.0))
            .collect()
    }

    #[test]
    fn test_fresh_history_cannot_undo() {
        let mut history = History::default();
        assert!(!history.can_undo());
        assert!(!history.can_redo());
        assert!(history.undo().is_none());
        assert!(history.redo().is_none());
    }

    #[test]
    fn test_undo_then_redo_restores_snapshot() {
        let mut history = History::new(&state(0), 100);
        history.snapshot(&state(1));
        history.snapshot(&state(2));

        assert_eq!(history.undo(), Some(state(1)));
        assert_eq!(history.redo(), Some(state(2)));
        assert!(!history.can_redo());
    }

    #[test]
    fn test_snapshot_truncates_future() {
        let mut history = History::new(&state(0), 100);
        history.snapshot(&state(1));
        history.snapshot(&state(2));
        history.undo();
        history.undo();
        history.snapshot(&state(3));
        assert_eq!(history.len(), 2);
        assert!(!history.can_redo());
        assert_eq!(history.undo(), Some(state(0)));
    }

    #[test]
    fn test_limit_evicts_oldest() {
        let mut history = History::new(&state(0), 3);
        for n in 1..=5 {
            history.snapshot(&state(n));
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.cursor(), 2);
        assert_eq!(history.undo(), Some(state(4)));
        assert_eq!(history.undo(), Some(state(3)));
        assert!(history.undo().is_none());
    }

    #[test]
    fn test_snapshots_are_deep_copies() {
        let mut live = state(1);
        let mut history = History::new(&[], 100);
        history.snapshot(&live);
        live[0].x = 999.0;
        history.snapshot(&live);
        let restored = history.undo().unwrap();
        assert_eq!(restored[0].x, 0.0);
    }

    #[test]
    fn test_reset_rebaselines() {
        let mut history = History::new(&[], 100);
        history.snapshot(&state(1));
        history.reset(&state(4));
        assert_eq!(history.len(), 1);
        assert!(!history.can_undo());
    }
}
