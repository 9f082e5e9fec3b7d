//! Canvas document and state management.
//!
//! [`Canvas`] is the entry point a host drives: it routes pointer and key
//! events to the tools, records history, forwards local changes to the
//! [`SyncManager`] and applies what comes back.

use std::collections::HashSet;
use std::time::Instant;

use kurbo::{Point, Size, Vec2};

use crate::camera::Camera;
use crate::collaboration::{SyncEvent, SyncManager};
use crate::config::SyncConfig;
use crate::error::{CoreResult, ErrorKind, ErrorReport, LogTelemetry, Severity, SyncError, Telemetry};
use crate::events::{EventBus, Origin, SceneObserver};
use crate::history::History;
use crate::input::{InputState, Modifiers, MouseButton, PointerEvent};
use crate::render::Painter;
use crate::scene::{Scene, SceneDiff};
use crate::services::{BoardId, BoardMetadata, Credentials, ImageStore, InlineImageStore};
use crate::shapes::{Element, ElementId, ElementKind, ElementRegistry};
use crate::shortcuts::{ShortcutAction, action_for};
use crate::sync::{ClientMessage, NativeTransport, RemoteCursor, Transport, endpoint_url};
use crate::tools::{ExternalTool, TextRequest, ToolContext, ToolKind, ToolManager, ToolPreview};

/// The scene with its history, change notifications and pending outgoing operations.
#[derive(Debug)]
pub struct CanvasDocument {
    pub scene: Scene,
    pub history: History,
    bus: EventBus,
    /// Operations produced while handling the current event.
    outgoing: Vec<ClientMessage>,
}

impl CanvasDocument {
    pub fn new(history_limit: usize, bus: EventBus) -> Self {
        let scene = Scene::new();
        let history = History::new(scene.elements(), history_limit);
        Self {
            scene,
            history,
            bus,
            outgoing: Vec::new(),
        }
    }

    fn add(&mut self, element: Element) {
        if self.scene.add(element.clone()) {
            self.bus.created(&element, Origin::Local);
            self.outgoing.push(ClientMessage::ElementAdd { element });
        }
    }

    fn update(&mut self, element: Element) {
        if self.scene.update(element.clone()) {
            self.bus.updated(&element, Origin::Local);
            self.outgoing.push(ClientMessage::ElementUpdate { element });
        }
    }

    fn remove(&mut self, id: &ElementId) {
        if self.scene.remove(id).is_some() {
            self.bus.deleted(id, Origin::Local);
            self.outgoing.push(ClientMessage::ElementRemove { element_id: id.clone() });
        }
    }

    fn commit(&mut self) {
        self.history.snapshot(self.scene.elements());
    }

    /// Notify observers about a bulk change already applied to the scene.
    fn publish_diff(&mut self, diff: &SceneDiff, origin: Origin) {
        for id in &diff.added {
            if let Some(el) = self.scene.get(id) {
                self.bus.created(el, origin);
            }
        }
        for id in &diff.updated {
            if let Some(el) = self.scene.get(id) {
                self.bus.updated(el, origin);
            }
        }
        for id in &diff.removed {
            self.bus.deleted(id, origin);
        }
    }

    /// Replace the elements with a history snapshot and broadcast the full state.
    fn restore(&mut self, elements: Vec<Element>) {
        self.scene.clear_selection();
        let diff = self.scene.reconcile(elements);
        self.publish_diff(&diff, Origin::Local);
        self.outgoing.push(ClientMessage::SyncState {
            elements: self.scene.elements().to_vec(),
        });
    }
}

/// What tools see while an event is handled.
struct DocumentContext<'a> {
    doc: &'a mut CanvasDocument,
    camera: &'a mut Camera,
    registry: &'a ElementRegistry,
    modifiers: Modifiers,
    text_requests: &'a mut Vec<TextRequest>,
}

impl ToolContext for DocumentContext<'_> {
    fn scene(&self) -> &Scene {
        &self.doc.scene
    }

    fn registry(&self) -> &ElementRegistry {
        self.registry
    }

    fn zoom(&self) -> f64 {
        self.camera.zoom
    }

    fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    fn add_element(&mut self, element: Element) {
        self.doc.add(element);
    }

    fn update_element(&mut self, element: Element) {
        self.doc.update(element);
    }

    fn select_only(&mut self, id: ElementId) {
        self.doc.scene.select_only(id);
    }

    fn toggle_selected(&mut self, id: ElementId) {
        self.doc.scene.toggle_selected(id);
    }

    fn extend_selection(&mut self, ids: Vec<ElementId>) {
        for id in ids {
            self.doc.scene.select(id);
        }
    }

    fn clear_selection(&mut self) {
        self.doc.scene.clear_selection();
    }

    fn commit(&mut self) {
        self.doc.commit();
    }

    fn request_text(&mut self, request: TextRequest) {
        self.text_requests.push(request);
    }

    fn pan(&mut self, screen_delta: Vec2) {
        self.camera.pan(screen_delta);
    }
}

/// The board a user is looking at and editing.
pub struct Canvas<T: Transport = NativeTransport> {
    pub document: CanvasDocument,
    pub camera: Camera,
    pub tools: ToolManager,
    registry: ElementRegistry,
    sync: SyncManager<T>,
    input: InputState,
    telemetry: Box<dyn Telemetry>,
    images: Box<dyn ImageStore>,
    metadata: Option<Box<dyn BoardMetadata>>,
    text_requests: Vec<TextRequest>,
    board: Option<BoardId>,
    /// Whether history has been rebased onto the board since `connect`.
    baselined: bool,
    needs_redraw: bool,
}

impl<T: Transport> Canvas<T> {
    /// Create an empty canvas. `observers` receive every scene change.
    pub fn new(transport: T, config: SyncConfig, observers: Vec<Box<dyn SceneObserver>>) -> Self {
        let document = CanvasDocument::new(config.history_limit, EventBus::with_observers(observers));
        Self {
            document,
            camera: Camera::new(),
            tools: ToolManager::new(),
            registry: ElementRegistry::with_builtin(),
            sync: SyncManager::new(transport, config),
            input: InputState::new(),
            telemetry: Box::new(LogTelemetry),
            images: Box::new(InlineImageStore),
            metadata: None,
            text_requests: Vec::new(),
            board: None,
            baselined: false,
            needs_redraw: true,
        }
    }

    pub fn with_registry(mut self, registry: ElementRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_telemetry(mut self, telemetry: Box<dyn Telemetry>) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn with_image_store(mut self, images: Box<dyn ImageStore>) -> Self {
        self.images = images;
        self
    }

    pub fn with_metadata(mut self, metadata: Box<dyn BoardMetadata>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn scene(&self) -> &Scene {
        &self.document.scene
    }

    pub fn history(&self) -> &History {
        &self.document.history
    }

    pub fn registry(&self) -> &ElementRegistry {
        &self.registry
    }

    /// Register custom element kinds here before they arrive from the wire.
    pub fn registry_mut(&mut self) -> &mut ElementRegistry {
        &mut self.registry
    }

    pub fn sync(&self) -> &SyncManager<T> {
        &self.sync
    }

    pub fn board(&self) -> Option<&BoardId> {
        self.board.as_ref()
    }

    /// Display name of the current board, falling back to its id.
    pub fn board_name(&self) -> Option<String> {
        let board = self.board.as_ref()?;
        let name = self.metadata.as_ref().and_then(|m| m.board_name(board));
        Some(name.unwrap_or_else(|| board.to_string()))
    }

    /// Creation time of the current board, if the host knows it.
    pub fn board_created_at(&self) -> Option<String> {
        let board = self.board.as_ref()?;
        self.metadata.as_ref()?.created_at(board)
    }

    pub fn remote_cursors(&self) -> Vec<RemoteCursor> {
        self.sync.remote_cursors().cloned().collect()
    }

    pub fn tool_preview(&self) -> Option<ToolPreview> {
        self.tools.preview(&self.registry)
    }

    pub fn set_viewport_size(&mut self, width: f64, height: f64) {
        self.camera.viewport = Size::new(width, height);
        self.needs_redraw = true;
    }

    /// Returns true once after anything visible changed.
    pub fn take_redraw(&mut self) -> bool {
        std::mem::take(&mut self.needs_redraw)
    }

    /// Text editors the host should open, oldest first.
    pub fn take_text_requests(&mut self) -> Vec<TextRequest> {
        std::mem::take(&mut self.text_requests)
    }

    // --- Connection ---

    /// Connect to `board` on the configured server.
    pub fn connect(&mut self, board: BoardId, credentials: &dyn Credentials, now: Instant) -> CoreResult<()> {
        let url = endpoint_url(&self.sync.config().server_url, &board, &credentials.credential())
            .and_then(|url| self.sync.connect(url, now));
        if let Err(e) = url {
            self.report_sync_error(&e, Severity::Error);
            return Err(e.into());
        }
        log::info!("Joining board {}", board);
        self.board = Some(board);
        self.baselined = false;
        Ok(())
    }

    pub fn disconnect(&mut self) {
        self.sync.disconnect();
        self.needs_redraw = true;
    }

    /// Drive the connection and apply inbound changes.
    pub fn poll(&mut self, now: Instant) -> Vec<SyncEvent> {
        let events = self.sync.poll(now, &mut self.document.scene);
        for event in &events {
            match event {
                SyncEvent::RemoteAdded(id) => {
                    if let Some(el) = self.document.scene.get(id) {
                        self.document.bus.created(el, Origin::Remote);
                    }
                }
                SyncEvent::RemoteUpdated(id) => {
                    if let Some(el) = self.document.scene.get(id) {
                        self.document.bus.updated(el, Origin::Remote);
                    }
                }
                SyncEvent::RemoteRemoved(id) => self.document.bus.deleted(id, Origin::Remote),
                SyncEvent::RemoteState(diff) => self.document.publish_diff(diff, Origin::Remote),
                SyncEvent::Reconciled(diff) => {
                    self.document.publish_diff(diff, Origin::Remote);
                    // The first sync of a board opens the document; reconnects
                    // merge like any other remote change and keep the undo stack.
                    if !self.baselined {
                        self.document.history.reset(self.document.scene.elements());
                        self.baselined = true;
                    }
                }
                SyncEvent::GaveUp(e) => self.report_sync_error(e, Severity::Error),
                SyncEvent::AuthRejected(e) => self.report_sync_error(e, Severity::Critical),
                SyncEvent::Connected
                | SyncEvent::Disconnected
                | SyncEvent::Reconnecting { .. }
                | SyncEvent::CursorsChanged
                | SyncEvent::PresenceChanged => {}
            }
        }
        if !events.is_empty() {
            self.needs_redraw = true;
        }
        events
    }

    fn report_sync_error(&self, error: &SyncError, severity: Severity) {
        let mut report = ErrorReport::new(error.kind(), severity, error.to_string());
        if let Some(board) = &self.board {
            report = report.with_context(format!("board {board}"));
        }
        self.telemetry.report(&report);
    }

    // --- Input ---

    /// Handle a pointer event in screen coordinates.
    pub fn handle_pointer(&mut self, event: PointerEvent, modifiers: Modifiers) {
        self.input.set_modifiers(modifiers);
        self.input.handle_pointer_event(&event);
        let world = self.camera.screen_to_world(event.position());

        match event {
            PointerEvent::Scroll { position, delta } => {
                // Horizontal-only wheel events do not zoom.
                if delta.y != 0.0 {
                    self.camera.zoom_at(position, delta.y);
                }
            }
            PointerEvent::Down {
                button: MouseButton::Left,
                ..
            } => self.with_tools(|tools, ctx| tools.on_down(world, ctx)),
            PointerEvent::Up {
                button: MouseButton::Left,
                ..
            } => self.with_tools(|tools, ctx| tools.on_up(world, ctx)),
            PointerEvent::Move { .. } => {
                if self.input.is_button_pressed(MouseButton::Middle) {
                    self.camera.pan(self.input.pointer_delta());
                } else if self.tools.is_active() {
                    self.with_tools(|tools, ctx| tools.on_move(world, ctx));
                }
                self.sync.send(ClientMessage::Cursor { x: world.x, y: world.y });
            }
            PointerEvent::Down { .. } | PointerEvent::Up { .. } => {}
        }
        self.needs_redraw = true;
    }

    /// Handle a key press. Returns true if it mapped to an action.
    pub fn handle_key(&mut self, key: &str, modifiers: Modifiers, text_focused: bool) -> bool {
        let Some(action) = action_for(key, modifiers, text_focused) else {
            return false;
        };
        self.input.set_modifiers(modifiers);
        match action {
            ShortcutAction::SetTool(tool) => self.set_tool(tool),
            ShortcutAction::DeleteSelection => self.delete_selection(),
            ShortcutAction::Undo => {
                self.undo();
            }
            ShortcutAction::Redo => {
                self.redo();
            }
            ShortcutAction::SelectAll => self.document.scene.select_all(),
            ShortcutAction::Cancel => self.with_tools(|tools, ctx| tools.cancel(ctx)),
        }
        self.needs_redraw = true;
        true
    }

    /// Run a tool callback against the document, then hand off what it produced.
    fn with_tools(&mut self, f: impl FnOnce(&mut ToolManager, &mut dyn ToolContext)) {
        let mut ctx = DocumentContext {
            doc: &mut self.document,
            camera: &mut self.camera,
            registry: &self.registry,
            modifiers: self.input.modifiers,
            text_requests: &mut self.text_requests,
        };
        f(&mut self.tools, &mut ctx);
        self.flush_outgoing();
    }

    fn flush_outgoing(&mut self) {
        for msg in self.document.outgoing.drain(..) {
            self.sync.send(msg);
        }
    }

    // --- Editing ---

    pub fn set_tool(&mut self, tool: ToolKind) {
        self.tools.set_tool(tool);
    }

    pub fn register_tool(&mut self, name: impl Into<String>, tool: Box<dyn ExternalTool>) {
        self.tools.register_external(name, tool);
    }

    /// Delete the selection and every connector attached to it.
    pub fn delete_selection(&mut self) {
        let selected: HashSet<ElementId> = self.document.scene.selection().clone();
        if selected.is_empty() {
            return;
        }
        let connectors = self.document.scene.connectors_referencing(&selected);
        let doomed: Vec<ElementId> = self
            .document
            .scene
            .elements()
            .iter()
            .map(|e| e.id.clone())
            .filter(|id| selected.contains(id) || connectors.contains(id))
            .collect();
        for id in &doomed {
            self.document.remove(id);
        }
        log::debug!("Deleted {} elements", doomed.len());
        self.document.commit();
        self.flush_outgoing();
        self.needs_redraw = true;
    }

    /// Returns false if there was nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(elements) = self.document.history.undo() else {
            return false;
        };
        self.document.restore(elements);
        self.flush_outgoing();
        self.needs_redraw = true;
        true
    }

    /// Returns false if there was nothing to redo.
    pub fn redo(&mut self) -> bool {
        let Some(elements) = self.document.history.redo() else {
            return false;
        };
        self.document.restore(elements);
        self.flush_outgoing();
        self.needs_redraw = true;
        true
    }

    /// Finish a [`TextRequest`]. Empty text creates nothing.
    pub fn commit_text(&mut self, request: TextRequest, text: &str) -> Option<ElementId> {
        if text.trim().is_empty() {
            return None;
        }
        let element = match request.bounds {
            Some(bounds) => self
                .registry
                .create(ElementKind::Textbox, bounds.x0, bounds.y0)
                .sized(bounds.width(), bounds.height()),
            None => self.registry.create(ElementKind::Text, request.at.x, request.at.y),
        }
        .with_content(text);
        Some(self.insert(element))
    }

    /// Upload an image and place it centered on `at` (world coordinates).
    pub fn insert_image(&mut self, bytes: &[u8], mime: &str, at: Point) -> CoreResult<ElementId> {
        let url = match self.images.upload(bytes, mime) {
            Ok(url) => url,
            Err(e) => {
                let report = ErrorReport::new(ErrorKind::Application, Severity::Warning, e.to_string())
                    .with_context("insert_image");
                self.telemetry.report(&report);
                return Err(e);
            }
        };
        let mut element = self.registry.create(ElementKind::Image, at.x, at.y);
        element.x -= element.width.unwrap_or_default() / 2.0;
        element.y -= element.height.unwrap_or_default() / 2.0;
        element.url = Some(url);
        Ok(self.insert(element))
    }

    fn insert(&mut self, element: Element) -> ElementId {
        let id = element.id.clone();
        self.document.add(element);
        self.document.scene.select_only(id.clone());
        self.document.commit();
        self.flush_outgoing();
        self.needs_redraw = true;
        id
    }

    /// Refresh measured text sizes and connector endpoints before drawing.
    pub fn prepare_frame(&mut self, painter: &mut dyn Painter) {
        self.document.scene.refresh_metrics(&self.registry, painter);
        self.document.scene.refresh_connector_endpoints();
    }
}

impl<T: Transport> std::fmt::Debug for Canvas<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Canvas")
            .field("elements", &self.document.scene.len())
            .field("tool", self.tools.current_tool())
            .field("board", &self.board)
            .field("sync", &self.sync)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaboration::ConnectionState;
    use crate::collaboration::tests::MockTransport;
    use crate::events::tests::Recorder;
    use crate::services::{Credential, StaticCredentials};
    use crate::sync::{ServerMessage, TransportEvent};
    use crate::tools::ShapeKind;
    use kurbo::Rect;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    fn canvas() -> (Canvas<MockTransport>, MockTransport, Rc<RefCell<Vec<String>>>) {
        let mock = MockTransport::default();
        let log = Rc::new(RefCell::new(Vec::new()));
        let canvas = Canvas::new(mock.clone(), SyncConfig::default(), vec![Box::new(Recorder(log.clone()))]);
        (canvas, mock, log)
    }

    fn connected() -> (Canvas<MockTransport>, MockTransport, Rc<RefCell<Vec<String>>>, Instant) {
        let (mut canvas, mock, log) = canvas();
        let now = Instant::now();
        let creds = StaticCredentials(Credential::Bearer("tok".into()));
        canvas.connect(BoardId::from("b1"), &creds, now).unwrap();
        mock.push(TransportEvent::Opened);
        mock.push_server(&ServerMessage::SyncState { elements: vec![] });
        canvas.poll(now);
        (canvas, mock, log, now)
    }

    fn left(position: Point, down: bool) -> PointerEvent {
        if down {
            PointerEvent::Down {
                position,
                button: MouseButton::Left,
            }
        } else {
            PointerEvent::Up {
                position,
                button: MouseButton::Left,
            }
        }
    }

    fn drag(canvas: &mut Canvas<MockTransport>, from: Point, to: Point) {
        canvas.handle_pointer(left(from, true), Modifiers::NONE);
        canvas.handle_pointer(PointerEvent::Move { position: to }, Modifiers::NONE);
        canvas.handle_pointer(left(to, false), Modifiers::NONE);
    }

    fn draw_rect(canvas: &mut Canvas<MockTransport>, from: Point, to: Point) -> ElementId {
        canvas.set_tool(ToolKind::Shape(ShapeKind::Rect));
        drag(canvas, from, to);
        canvas.set_tool(ToolKind::Select);
        canvas.scene().elements().last().unwrap().id.clone()
    }

    #[test]
    fn test_connect_builds_endpoint() {
        let (canvas, mock, _, _) = connected();
        assert_eq!(mock.0.borrow().connects, vec!["ws://localhost:3000/ws/b1?token=tok"]);
        assert_eq!(canvas.board(), Some(&BoardId::from("b1")));
    }

    #[test]
    fn test_drawing_sends_add_and_records_history() {
        let (mut canvas, mock, log, _) = connected();
        let id = draw_rect(&mut canvas, Point::new(10.0, 10.0), Point::new(110.0, 60.0));
        assert_eq!(canvas.scene().len(), 1);
        assert!(canvas.history().can_undo());
        let sent = mock.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0]["type"], "element_add");
        assert_eq!(sent[0]["element"]["id"], id.as_str());
        assert_eq!(*log.borrow(), vec![format!("created:{id}:Local")]);
    }

    #[test]
    fn test_undo_redo_restores_and_broadcasts_state() {
        let (mut canvas, mock, _, _) = connected();
        let id = draw_rect(&mut canvas, Point::new(10.0, 10.0), Point::new(110.0, 60.0));
        let drawn = canvas.scene().elements().to_vec();
        canvas.document.scene.select_only(id);
        mock.clear_sent();

        assert!(canvas.handle_key("z", Modifiers::CTRL, false));
        assert!(canvas.scene().is_empty());
        assert!(canvas.scene().selection().is_empty());
        assert_eq!(mock.sent(), vec![serde_json::json!({"type": "sync_state", "elements": []})]);

        assert!(canvas.redo());
        assert_eq!(canvas.scene().elements(), drawn.as_slice());
        assert_eq!(mock.sent().len(), 2);
        assert_eq!(mock.sent()[1]["elements"].as_array().unwrap().len(), 1);
        assert!(!canvas.redo());
    }

    #[test]
    fn test_delete_cascades_to_connectors() {
        let (mut canvas, mock, _, _) = connected();
        let a = draw_rect(&mut canvas, Point::new(0.0, 0.0), Point::new(100.0, 100.0));
        let b = draw_rect(&mut canvas, Point::new(300.0, 0.0), Point::new(400.0, 100.0));
        let other = draw_rect(&mut canvas, Point::new(0.0, 300.0), Point::new(100.0, 400.0));
        canvas.set_tool(ToolKind::Connector);
        drag(&mut canvas, Point::new(100.0, 50.0), Point::new(300.0, 50.0));
        assert_eq!(canvas.scene().len(), 4);
        mock.clear_sent();

        canvas.document.scene.select_only(a.clone());
        assert!(canvas.handle_key("Delete", Modifiers::NONE, false));
        let ids: Vec<_> = canvas.scene().elements().iter().map(|e| e.id.clone()).collect();
        assert_eq!(ids, vec![b, other]);
        let types: Vec<_> = mock.sent().iter().map(|m| m["type"].as_str().unwrap().to_string()).collect();
        assert_eq!(types, vec!["element_remove", "element_remove"]);

        assert!(canvas.undo());
        assert_eq!(canvas.scene().len(), 4);
    }

    #[test]
    fn test_remote_changes_bypass_history() {
        let (mut canvas, mock, log, now) = connected();
        let el = Element::with_id("r1", ElementKind::Rect, 0.0, 0.0).sized(10.0, 10.0);
        mock.push_server(&ServerMessage::ElementAdd { element: el });
        let events = canvas.poll(now);
        assert_eq!(events, vec![SyncEvent::RemoteAdded("r1".into())]);
        assert_eq!(canvas.scene().len(), 1);
        assert!(!canvas.history().can_undo());
        assert_eq!(*log.borrow(), vec!["created:r1:Remote"]);
        assert!(canvas.take_redraw());
    }

    #[test]
    fn test_initial_sync_rebaselines_history() {
        let (mut canvas, mock, _) = canvas();
        draw_rect(&mut canvas, Point::new(0.0, 0.0), Point::new(50.0, 50.0));
        assert!(canvas.history().can_undo());
        assert_eq!(canvas.sync().queued(), 1);

        let now = Instant::now();
        let creds = StaticCredentials(Credential::ShareToken("s".into()));
        canvas.connect(BoardId::from("b1"), &creds, now).unwrap();
        mock.push(TransportEvent::Opened);
        mock.push_server(&ServerMessage::SyncState {
            elements: vec![Element::with_id("remote", ElementKind::Rect, 0.0, 0.0)],
        });
        canvas.poll(now);
        assert_eq!(canvas.scene().len(), 2);
        assert!(!canvas.history().can_undo());
        assert_eq!(mock.sent().len(), 1);
    }

    #[test]
    fn test_reconnect_keeps_history() {
        let (mut canvas, mock, _, now) = connected();
        draw_rect(&mut canvas, Point::new(0.0, 0.0), Point::new(50.0, 50.0));
        assert!(canvas.history().can_undo());

        mock.push(TransportEvent::Closed);
        canvas.poll(now);
        let later = now + Duration::from_millis(500);
        canvas.poll(later);
        mock.push(TransportEvent::Opened);
        mock.push_server(&ServerMessage::SyncState {
            elements: canvas.scene().elements().to_vec(),
        });
        canvas.poll(later);
        assert_eq!(canvas.sync().state(), ConnectionState::Connected);
        assert!(canvas.history().can_undo());

        assert!(canvas.undo());
        assert!(canvas.scene().is_empty());
    }

    struct Directory;

    impl BoardMetadata for Directory {
        fn board_name(&self, board: &BoardId) -> Option<String> {
            (board.to_string() == "b1").then(|| "Roadmap".to_string())
        }

        fn created_at(&self, _board: &BoardId) -> Option<String> {
            Some("2026-01-05T09:00:00Z".into())
        }
    }

    #[test]
    fn test_board_metadata() {
        let (canvas, _, _, _) = connected();
        assert_eq!(canvas.board_name().as_deref(), Some("b1"));
        assert_eq!(canvas.board_created_at(), None);

        let mut canvas = canvas.with_metadata(Box::new(Directory));
        assert_eq!(canvas.board_name().as_deref(), Some("Roadmap"));
        assert_eq!(canvas.board_created_at().as_deref(), Some("2026-01-05T09:00:00Z"));

        let creds = StaticCredentials(Credential::Bearer("tok".into()));
        canvas.connect(BoardId::from("b2"), &creds, Instant::now()).unwrap();
        assert_eq!(canvas.board_name().as_deref(), Some("b2"));
    }

    #[test]
    fn test_commit_text() {
        let (mut canvas, _, _) = canvas();
        canvas.set_tool(ToolKind::Text);
        canvas.handle_pointer(left(Point::new(40.0, 40.0), true), Modifiers::NONE);
        canvas.handle_pointer(left(Point::new(40.0, 40.0), false), Modifiers::NONE);
        let requests = canvas.take_text_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(canvas.commit_text(requests[0], "   "), None);
        assert!(canvas.scene().is_empty());

        let id = canvas.commit_text(requests[0], "hello").unwrap();
        let el = canvas.scene().get(&id).unwrap();
        assert_eq!(el.kind, ElementKind::Text);
        assert_eq!(el.content.as_deref(), Some("hello"));

        let boxed = TextRequest {
            at: Point::new(0.0, 0.0),
            bounds: Some(Rect::new(0.0, 0.0, 120.0, 80.0)),
        };
        let id = canvas.commit_text(boxed, "wrapped").unwrap();
        let el = canvas.scene().get(&id).unwrap();
        assert_eq!(el.kind, ElementKind::Textbox);
        assert_eq!(el.width, Some(120.0));
    }

    #[test]
    fn test_insert_image() {
        let (mut canvas, _, _) = canvas();
        let id = canvas.insert_image(b"abc", "image/png", Point::new(100.0, 100.0)).unwrap();
        let el = canvas.scene().get(&id).unwrap();
        assert_eq!(el.url.as_deref(), Some("data:image/png;base64,YWJj"));
        assert_eq!(el.box_rect().center(), Point::new(100.0, 100.0));
        assert!(canvas.insert_image(b"abc", "text/plain", Point::ZERO).is_err());
        assert_eq!(canvas.scene().len(), 1);
    }

    #[test]
    fn test_horizontal_scroll_does_not_zoom() {
        let (mut canvas, _, _) = canvas();
        canvas.handle_pointer(
            PointerEvent::Scroll {
                position: Point::new(200.0, 100.0),
                delta: Vec2::new(3.0, 0.0),
            },
            Modifiers::NONE,
        );
        assert!((canvas.camera.zoom - 1.0).abs() < f64::EPSILON);
        assert_eq!(canvas.camera.origin, Vec2::ZERO);
    }

    #[test]
    fn test_scroll_zooms_and_middle_drag_pans() {
        let (mut canvas, _, _) = canvas();
        let anchor = Point::new(200.0, 100.0);
        let world_before = canvas.camera.screen_to_world(anchor);
        canvas.handle_pointer(
            PointerEvent::Scroll {
                position: anchor,
                delta: Vec2::new(0.0, -1.0),
            },
            Modifiers::NONE,
        );
        assert!(canvas.camera.zoom > 1.0);
        let world_after = canvas.camera.screen_to_world(anchor);
        assert!((world_before - world_after).hypot() < 1e-9);

        let origin = canvas.camera.origin;
        canvas.handle_pointer(
            PointerEvent::Down {
                position: Point::new(0.0, 0.0),
                button: MouseButton::Middle,
            },
            Modifiers::NONE,
        );
        canvas.handle_pointer(
            PointerEvent::Move {
                position: Point::new(30.0, 0.0),
            },
            Modifiers::NONE,
        );
        assert!(canvas.camera.origin.x < origin.x);
        assert!(canvas.scene().is_empty());
    }

    #[test]
    fn test_shortcuts_ignored_while_typing() {
        let (mut canvas, _, _) = canvas();
        assert!(!canvas.handle_key("r", Modifiers::NONE, true));
        assert_eq!(canvas.tools.current_tool(), &ToolKind::Select);
        assert!(canvas.handle_key("r", Modifiers::NONE, false));
        assert_eq!(canvas.tools.current_tool(), &ToolKind::Shape(ShapeKind::Rect));
    }

    #[test]
    fn test_auth_rejection_reaches_telemetry() {
        struct Collect(Rc<RefCell<Vec<ErrorReport>>>);
        impl Telemetry for Collect {
            fn report(&self, report: &ErrorReport) {
                self.0.borrow_mut().push(report.clone());
            }
        }
        let reports = Rc::new(RefCell::new(Vec::new()));
        let (canvas, mock, _) = canvas();
        let mut canvas = canvas.with_telemetry(Box::new(Collect(reports.clone())));
        let now = Instant::now();
        let creds = StaticCredentials(Credential::Bearer("bad".into()));
        canvas.connect(BoardId::from("b1"), &creds, now).unwrap();
        mock.push(TransportEvent::Rejected("HTTP 401".into()));
        canvas.poll(now);

        let reports = reports.borrow();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].error_type, ErrorKind::Authorization);
        assert_eq!(reports[0].severity, Severity::Critical);
        assert_eq!(reports[0].context, "board b1");
    }
}
