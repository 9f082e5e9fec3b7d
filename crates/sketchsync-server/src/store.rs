//! Board persistence hook.

use dashmap::DashMap;
use sketchsync_core::Element;

/// Where boards live between rooms.
///
/// A room loads its board when the first user joins and saves it on
/// `save_request` and when the last user leaves.
pub trait BoardStore: Send + Sync {
    fn load(&self, board_id: &str) -> Vec<Element>;
    fn save(&self, board_id: &str, elements: &[Element]);
}

/// Process-local store. Boards survive empty rooms but not restarts.
#[derive(Debug, Default)]
pub struct MemoryStore {
    boards: DashMap<String, Vec<Element>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn saved(&self, board_id: &str) -> Option<Vec<Element>> {
        self.boards.get(board_id).map(|board| board.clone())
    }
}

impl BoardStore for MemoryStore {
    fn load(&self, board_id: &str) -> Vec<Element> {
        self.saved(board_id).unwrap_or_default()
    }

    fn save(&self, board_id: &str, elements: &[Element]) {
        tracing::debug!("Saved board {} ({} elements)", board_id, elements.len());
        self.boards.insert(board_id.to_string(), elements.to_vec());
    }
}
