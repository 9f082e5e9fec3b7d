//! Synchronization manager for real-time multi-user editing.
//!
//! Bridges the local [`Scene`] and a [`Transport`]: queues outgoing
//! operations while offline, reconciles with the server's state on every
//! (re)connect, applies inbound operations, and schedules reconnects with
//! exponential backoff. All work happens inside [`SyncManager::poll`] on the
//! caller's thread.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use kurbo::Point;

use crate::autosave::AutoSaveTimer;
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::scene::{Scene, SceneDiff};
use crate::shapes::{Element, ElementId};
use crate::sync::{ClientMessage, NativeTransport, Participant, RemoteCursor, ServerMessage, Transport, TransportEvent};

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Retries exhausted or credential rejected. Only an explicit
    /// [`SyncManager::connect`] leaves this state.
    Failed,
}

/// What changed during a poll.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// Transport opened; waiting for the server's state.
    Connected,
    /// Initial reconciliation finished and the queue was flushed.
    Reconciled(SceneDiff),
    Disconnected,
    Reconnecting { attempt: u32, delay: Duration },
    GaveUp(SyncError),
    AuthRejected(SyncError),
    RemoteAdded(ElementId),
    RemoteUpdated(ElementId),
    RemoteRemoved(ElementId),
    /// A full-state message replaced the scene.
    RemoteState(SceneDiff),
    CursorsChanged,
    PresenceChanged,
}

/// Parse one inbound frame.
fn decode(text: &str) -> Result<ServerMessage, SyncError> {
    serde_json::from_str(text).map_err(|e| SyncError::Protocol(format!("{e}: {text}")))
}

/// Reconnect delay for a 1-based attempt number.
pub fn backoff_delay(attempt: u32, base: Duration, max: Duration) -> Duration {
    let exponent = attempt.saturating_sub(1).min(31);
    base.saturating_mul(1u32 << exponent).min(max)
}

/// Apply an outgoing operation to a scene the way the server will.
///
/// The relay upserts on add and update and replaces its set on `sync_state`.
fn apply_outgoing(scene: &mut Scene, msg: &ClientMessage) {
    let upsert = |scene: &mut Scene, element: &Element| {
        if !scene.update(element.clone()) {
            scene.add(element.clone());
        }
    };
    match msg {
        ClientMessage::ElementAdd { element } | ClientMessage::ElementUpdate { element } => upsert(scene, element),
        ClientMessage::ElementRemove { element_id } => {
            scene.remove(element_id);
        }
        ClientMessage::SyncState { elements } => {
            scene.reconcile(elements.clone());
        }
        ClientMessage::Cursor { .. } | ClientMessage::SaveRequest => {}
    }
}

/// Manages the connection for one board.
pub struct SyncManager<T: Transport = NativeTransport> {
    transport: T,
    config: SyncConfig,
    /// Endpoint to (re)connect to; cleared on explicit disconnect.
    url: Option<String>,
    state: ConnectionState,
    /// Reconnect attempts since the last successful open.
    attempts: u32,
    retry_at: Option<Instant>,
    /// Open but the server's first state has not been merged yet.
    awaiting_initial: bool,
    /// Operations not yet handed to the transport, oldest first.
    queue: VecDeque<ClientMessage>,
    pending_cursor: Option<Point>,
    last_cursor_sent: Option<Instant>,
    cursors: HashMap<String, RemoteCursor>,
    participants: Vec<Participant>,
    autosave: AutoSaveTimer,
}

impl<T: Transport> SyncManager<T> {
    pub fn new(transport: T, config: SyncConfig) -> Self {
        let autosave = AutoSaveTimer::new(config.autosave_interval());
        Self {
            transport,
            config,
            url: None,
            state: ConnectionState::Disconnected,
            attempts: 0,
            retry_at: None,
            awaiting_initial: false,
            queue: VecDeque::new(),
            pending_cursor: None,
            last_cursor_sent: None,
            cursors: HashMap::new(),
            participants: Vec::new(),
            autosave,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Connected and reconciled, so operations go straight to the wire.
    pub fn is_live(&self) -> bool {
        self.state == ConnectionState::Connected && !self.awaiting_initial
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn remote_cursors(&self) -> impl Iterator<Item = &RemoteCursor> {
        self.cursors.values()
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    /// Connect to `url`, resetting any failure state.
    pub fn connect(&mut self, url: impl Into<String>, now: Instant) -> Result<(), SyncError> {
        let url = url.into();
        self.transport.disconnect();
        self.attempts = 0;
        self.retry_at = None;
        self.awaiting_initial = false;
        self.autosave.start(now);
        self.state = ConnectionState::Connecting;
        match self.transport.connect(&url) {
            Ok(()) => {
                self.url = Some(url);
                Ok(())
            }
            Err(e) => {
                self.state = ConnectionState::Failed;
                Err(e)
            }
        }
    }

    /// Close the connection without reconnecting. Queued operations are kept.
    pub fn disconnect(&mut self) {
        self.transport.disconnect();
        self.url = None;
        self.retry_at = None;
        self.awaiting_initial = false;
        self.state = ConnectionState::Disconnected;
        self.cursors.clear();
        self.participants.clear();
    }

    /// Hand an operation to the connection.
    ///
    /// Cursor positions are coalesced and only sent while live. Everything
    /// else goes out immediately when live and is queued otherwise.
    pub fn send(&mut self, msg: ClientMessage) {
        if let ClientMessage::Cursor { x, y } = msg {
            if self.is_live() {
                self.pending_cursor = Some(Point::new(x, y));
            }
            return;
        }
        if !matches!(msg, ClientMessage::SaveRequest) {
            self.autosave.mark_dirty();
        }
        if self.is_live() && self.queue.is_empty() && self.transmit(&msg) {
            return;
        }
        self.queue.push_back(msg);
    }

    /// Drive the connection. Call once per frame or event-loop turn.
    pub fn poll(&mut self, now: Instant, scene: &mut Scene) -> Vec<SyncEvent> {
        let mut events = Vec::new();

        for event in self.transport.poll_events() {
            self.handle_transport_event(event, now, scene, &mut events);
        }

        let retry_due = self.retry_at.is_some_and(|at| now >= at);
        if self.state == ConnectionState::Disconnected && retry_due {
            self.retry(now, &mut events);
        }

        if self.is_live() {
            self.flush_cursor(now);
            if self.autosave.should_save(now) && self.transmit(&ClientMessage::SaveRequest) {
                self.autosave.mark_saved(now);
            }
        }

        events
    }

    fn handle_transport_event(&mut self, event: TransportEvent, now: Instant, scene: &mut Scene, events: &mut Vec<SyncEvent>) {
        match event {
            TransportEvent::Opened => {
                log::info!("Connected, waiting for board state");
                self.state = ConnectionState::Connected;
                self.attempts = 0;
                self.retry_at = None;
                self.awaiting_initial = true;
                events.push(SyncEvent::Connected);
            }
            TransportEvent::Message(text) => match decode(&text) {
                Ok(msg) => self.handle_server_message(msg, scene, events),
                Err(e) => log::debug!("Dropping inbound message: {}", e),
            },
            TransportEvent::Closed | TransportEvent::Failed(_) => {
                if self.url.is_none() || self.state == ConnectionState::Failed {
                    return;
                }
                if let TransportEvent::Failed(reason) = &event {
                    log::warn!("Connection failed: {}", reason);
                } else {
                    log::info!("Connection closed");
                }
                let was_open = self.state == ConnectionState::Connected;
                self.state = ConnectionState::Disconnected;
                self.awaiting_initial = false;
                self.cursors.clear();
                if was_open {
                    events.push(SyncEvent::Disconnected);
                }
                self.schedule_retry(now, events);
            }
            TransportEvent::Rejected(reason) => {
                log::error!("Credential rejected: {}", reason);
                self.transport.disconnect();
                self.state = ConnectionState::Failed;
                self.url = None;
                self.retry_at = None;
                self.awaiting_initial = false;
                events.push(SyncEvent::AuthRejected(SyncError::Unauthorized(reason)));
            }
        }
    }

    fn handle_server_message(&mut self, msg: ServerMessage, scene: &mut Scene, events: &mut Vec<SyncEvent>) {
        if self.awaiting_initial {
            match msg {
                ServerMessage::SyncState { elements } => {
                    self.complete_initial(elements, scene, events);
                    return;
                }
                other => {
                    log::debug!("First message was not sync_state; reconciling against an empty set");
                    self.complete_initial(Vec::new(), scene, events);
                    self.apply_server_message(other, scene, events);
                    return;
                }
            }
        }
        self.apply_server_message(msg, scene, events);
    }

    /// Merge the server's state, replay what we have queued, then flush.
    fn complete_initial(&mut self, remote: Vec<Element>, scene: &mut Scene, events: &mut Vec<SyncEvent>) {
        let diff = scene.merge_remote(remote);
        for msg in &self.queue {
            apply_outgoing(scene, msg);
        }
        self.awaiting_initial = false;
        log::info!(
            "Reconciled: {} added, {} updated, {} queued operations",
            diff.added.len(),
            diff.updated.len(),
            self.queue.len()
        );
        self.flush_queue();
        events.push(SyncEvent::Reconciled(diff));
    }

    fn apply_server_message(&mut self, msg: ServerMessage, scene: &mut Scene, events: &mut Vec<SyncEvent>) {
        match msg {
            ServerMessage::ElementAdd { element } => {
                let id = element.id.clone();
                if scene.add(element) {
                    events.push(SyncEvent::RemoteAdded(id));
                }
            }
            ServerMessage::ElementUpdate { element } => {
                let id = element.id.clone();
                if scene.update(element) {
                    events.push(SyncEvent::RemoteUpdated(id));
                }
            }
            ServerMessage::ElementRemove { element_id } => {
                if scene.remove(&element_id).is_some() {
                    events.push(SyncEvent::RemoteRemoved(element_id));
                }
            }
            ServerMessage::SyncState { elements } => {
                let diff = scene.reconcile(elements);
                if !diff.is_empty() {
                    events.push(SyncEvent::RemoteState(diff));
                }
            }
            ServerMessage::Cursor {
                user_id,
                x,
                y,
                username,
                color,
            } => {
                let cursor = RemoteCursor {
                    user_id: user_id.clone(),
                    position: Point::new(x, y),
                    username,
                    color,
                };
                self.cursors.insert(user_id, cursor);
                events.push(SyncEvent::CursorsChanged);
            }
            ServerMessage::Join { users, .. } => {
                self.participants = users;
                events.push(SyncEvent::PresenceChanged);
            }
            ServerMessage::Leave { user_id, users } => {
                self.cursors.remove(&user_id);
                self.participants = users;
                events.push(SyncEvent::PresenceChanged);
            }
            ServerMessage::SaveRequest => {}
        }
    }

    fn schedule_retry(&mut self, now: Instant, events: &mut Vec<SyncEvent>) {
        self.attempts += 1;
        if self.attempts > self.config.max_attempts {
            log::error!("Giving up after {} reconnect attempts", self.config.max_attempts);
            self.state = ConnectionState::Failed;
            self.retry_at = None;
            events.push(SyncEvent::GaveUp(SyncError::RetriesExhausted {
                attempts: self.config.max_attempts,
            }));
            return;
        }
        let delay = backoff_delay(self.attempts, self.config.base_delay(), self.config.max_delay());
        log::info!("Reconnecting in {:?} (attempt {})", delay, self.attempts);
        self.retry_at = Some(now + delay);
        events.push(SyncEvent::Reconnecting {
            attempt: self.attempts,
            delay,
        });
    }

    fn retry(&mut self, now: Instant, events: &mut Vec<SyncEvent>) {
        let Some(url) = self.url.clone() else {
            return;
        };
        self.retry_at = None;
        self.state = ConnectionState::Connecting;
        if let Err(e) = self.transport.connect(&url) {
            log::warn!("Reconnect failed: {}", e);
            self.state = ConnectionState::Disconnected;
            self.schedule_retry(now, events);
        }
    }

    fn flush_queue(&mut self) {
        while let Some(msg) = self.queue.pop_front() {
            if !self.transmit(&msg) {
                self.queue.push_front(msg);
                break;
            }
        }
    }

    fn flush_cursor(&mut self, now: Instant) {
        let Some(position) = self.pending_cursor else {
            return;
        };
        let due = self
            .last_cursor_sent
            .is_none_or(|last| now.saturating_duration_since(last) >= self.config.cursor_interval());
        if due
            && self.transmit(&ClientMessage::Cursor {
                x: position.x,
                y: position.y,
            })
        {
            self.pending_cursor = None;
            self.last_cursor_sent = Some(now);
        }
    }

    /// Serialize and send one message. Returns false if the transport refused it.
    fn transmit(&mut self, msg: &ClientMessage) -> bool {
        let text = match serde_json::to_string(msg) {
            Ok(text) => text,
            Err(e) => {
                log::error!("Failed to serialize outgoing message: {}", e);
                return true;
            }
        };
        match self.transport.send(&text) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Send failed, keeping message queued: {}", e);
                false
            }
        }
    }
}

impl<T: Transport> std::fmt::Debug for SyncManager<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncManager")
            .field("state", &self.state)
            .field("attempts", &self.attempts)
            .field("queued", &self.queue.len())
            .field("participants", &self.participants.len())
            .finish()
    }
}
