//! Keyboard shortcuts.

use crate::input::Modifiers;
use crate::tools::{ShapeKind, ToolKind};

/// What a key press asks the canvas to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShortcutAction {
    SetTool(ToolKind),
    DeleteSelection,
    Undo,
    Redo,
    SelectAll,
    /// Abandon the active gesture.
    Cancel,
}

/// Map a key press to an action.
///
/// `key` uses the host's logical key names: single characters for letters,
/// `Delete`, `Backspace` and `Escape` for the rest. Returns `None` while a
/// text editor has focus so typing is never interpreted as a command.
pub fn action_for(key: &str, modifiers: Modifiers, text_focused: bool) -> Option<ShortcutAction> {
    if text_focused {
        return None;
    }
    match key {
        "Delete" | "Backspace" => return Some(ShortcutAction::DeleteSelection),
        "Escape" => return Some(ShortcutAction::Cancel),
        _ => {}
    }

    let key = key.to_lowercase();
    if modifiers.command() {
        return match key.as_str() {
            "z" if modifiers.shift => Some(ShortcutAction::Redo),
            "z" => Some(ShortcutAction::Undo),
            "y" => Some(ShortcutAction::Redo),
            "a" => Some(ShortcutAction::SelectAll),
            _ => None,
        };
    }
    if modifiers.alt {
        return None;
    }

    let tool = match key.as_str() {
        "v" => ToolKind::Select,
        "h" => ToolKind::Pan,
        "s" => ToolKind::Sticky,
        "r" => ToolKind::Shape(ShapeKind::Rect),
        "c" => ToolKind::Shape(ShapeKind::Circle),
        "l" => ToolKind::Line,
        "a" => ToolKind::Arrow,
        "d" => ToolKind::Draw,
        "t" => ToolKind::Text,
        "x" => ToolKind::Textbox,
        "k" => ToolKind::Connector,
        _ => return None,
    };
    Some(ShortcutAction::SetTool(tool))
}
