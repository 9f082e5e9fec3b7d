//! Wire protocol and the WebSocket transport.
//!
//! The protocol is JSON text frames with a `type` discriminant. Elements
//! travel whole; there are no field-level patches.

use kurbo::Point;
use serde::{Deserialize, Serialize};

use crate::error::SyncError;
use crate::services::{BoardId, Credential};
use crate::shapes::{Element, ElementId};

/// Close codes a server uses to reject a credential after the handshake.
pub const CLOSE_UNAUTHORIZED: u16 = 4401;
pub const CLOSE_FORBIDDEN: u16 = 4403;

/// Messages sent to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Full state; receivers reconcile by set difference.
    SyncState { elements: Vec<Element> },
    ElementAdd { element: Element },
    ElementUpdate { element: Element },
    ElementRemove {
        #[serde(rename = "elementId")]
        element_id: ElementId,
    },
    /// Local pointer in world coordinates.
    Cursor { x: f64, y: f64 },
    /// Ask the server to persist the board.
    SaveRequest,
}

/// A connected participant as reported by presence messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub user_id: String,
    pub username: String,
    pub color: String,
}

/// Messages received from the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    SyncState { elements: Vec<Element> },
    ElementAdd { element: Element },
    ElementUpdate { element: Element },
    ElementRemove {
        #[serde(rename = "elementId")]
        element_id: ElementId,
    },
    Cursor {
        #[serde(rename = "userId")]
        user_id: String,
        x: f64,
        y: f64,
        #[serde(default)]
        username: String,
        #[serde(default)]
        color: String,
    },
    Join {
        #[serde(rename = "userId", default, skip_serializing_if = "Option::is_none")]
        user_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        username: Option<String>,
        users: Vec<Participant>,
    },
    Leave {
        #[serde(rename = "userId")]
        user_id: String,
        users: Vec<Participant>,
    },
    SaveRequest,
}

/// Another participant's pointer.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteCursor {
    pub user_id: String,
    pub position: Point,
    pub username: String,
    pub color: String,
}

/// Build the board endpoint `{server}/ws/{board}` with the credential query.
pub fn endpoint_url(server_url: &str, board: &BoardId, credential: &Credential) -> Result<String, SyncError> {
    let mut url = url::Url::parse(server_url).map_err(|e| SyncError::InvalidUrl(format!("{server_url}: {e}")))?;
    if url.scheme() != "ws" && url.scheme() != "wss" {
        return Err(SyncError::InvalidUrl(format!(
            "Invalid WebSocket URL scheme: {}",
            url.scheme()
        )));
    }
    url.path_segments_mut()
        .map_err(|_| SyncError::InvalidUrl(format!("{server_url}: cannot be a base")))?
        .pop_if_empty()
        .push("ws")
        .push(board.as_str());
    let (key, token) = match credential {
        Credential::Bearer(token) => ("token", token),
        Credential::ShareToken(token) => ("share_token", token),
    };
    url.query_pairs_mut().append_pair(key, token);
    Ok(url.into())
}

/// Something that happened on the transport since the last poll.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Opened,
    Message(String),
    /// Connection ended after being open.
    Closed,
    /// Could not connect, or the connection broke.
    Failed(String),
    /// The server refused the credential. Retrying will not help.
    Rejected(String),
}

/// One duplex text-message channel.
pub trait Transport {
    /// Start connecting. Completion is reported through [`Transport::poll_events`].
    fn connect(&mut self, url: &str) -> Result<(), SyncError>;

    fn send(&mut self, text: &str) -> Result<(), SyncError>;

    fn disconnect(&mut self);

    /// Drain pending events without blocking.
    fn poll_events(&mut self) -> Vec<TransportEvent>;
}

mod native {
    use super::{CLOSE_FORBIDDEN, CLOSE_UNAUTHORIZED, Transport, TransportEvent};
    use crate::error::SyncError;
    use std::sync::mpsc::{Receiver, Sender, TryRecvError, channel};
    use std::thread::{self, JoinHandle};
    use std::time::Duration;
    use tungstenite::{Message, connect};

    /// Commands sent to the WebSocket thread.
    enum WsCommand {
        Send(String),
        Close,
    }

    /// WebSocket transport on a background thread.
    ///
    /// The thread owns the socket; frames cross to the caller over channels
    /// and are picked up by `poll_events`.
    pub struct NativeTransport {
        cmd_tx: Option<Sender<WsCommand>>,
        event_rx: Option<Receiver<TransportEvent>>,
        _thread: Option<JoinHandle<()>>,
    }

    impl NativeTransport {
        pub fn new() -> Self {
            Self {
                cmd_tx: None,
                event_rx: None,
                _thread: None,
            }
        }
    }

    /// First 100 characters of a frame, for debug logs.
    fn log_preview(text: &str) -> &str {
        match text.char_indices().nth(100) {
            Some((end, _)) => &text[..end],
            None => text,
        }
    }

    fn is_auth_status(status: u16) -> bool {
        status == 401 || status == 403
    }

    fn run(url: String, cmd_rx: Receiver<WsCommand>, event_tx: Sender<TransportEvent>) {
        log::info!("WebSocket thread: connecting to {}", url);

        let (mut socket, response) = match connect(&url) {
            Ok(pair) => pair,
            Err(tungstenite::Error::Http(response)) if is_auth_status(response.status().as_u16()) => {
                log::warn!("WebSocket handshake rejected: {}", response.status());
                let _ = event_tx.send(TransportEvent::Rejected(format!("HTTP {}", response.status())));
                return;
            }
            Err(e) => {
                log::error!("WebSocket connection failed: {}", e);
                let _ = event_tx.send(TransportEvent::Failed(format!("Connection failed: {e}")));
                return;
            }
        };
        log::info!("WebSocket connected, status: {}", response.status());
        let _ = event_tx.send(TransportEvent::Opened);

        // A short read timeout keeps the loop responsive to outgoing commands.
        #[allow(irrefutable_let_patterns)]
        if let tungstenite::stream::MaybeTlsStream::Plain(tcp) = socket.get_mut() {
            let _ = tcp.set_read_timeout(Some(Duration::from_millis(50)));
            let _ = tcp.set_write_timeout(Some(Duration::from_secs(5)));
        }

        let closing = loop {
            match cmd_rx.try_recv() {
                Ok(WsCommand::Send(msg)) => {
                    log::debug!("WebSocket sending: {}", log_preview(&msg));
                    if let Err(e) = socket.send(Message::Text(msg)) {
                        break TransportEvent::Failed(format!("Send failed: {e}"));
                    }
                }
                Ok(WsCommand::Close) => {
                    log::info!("WebSocket close requested");
                    let _ = socket.close(None);
                    break TransportEvent::Closed;
                }
                Err(TryRecvError::Disconnected) => {
                    log::info!("WebSocket command channel disconnected");
                    break TransportEvent::Closed;
                }
                Err(TryRecvError::Empty) => {}
            }

            match socket.read() {
                Ok(Message::Text(txt)) => {
                    log::debug!("WebSocket received: {}", log_preview(&txt));
                    let _ = event_tx.send(TransportEvent::Message(txt.to_string()));
                }
                Ok(Message::Ping(data)) => {
                    let _ = socket.send(Message::Pong(data));
                }
                Ok(Message::Close(frame)) => {
                    let code = frame.as_ref().map(|f| u16::from(f.code));
                    log::info!("WebSocket received close frame: {:?}", code);
                    break match code {
                        Some(CLOSE_UNAUTHORIZED) | Some(CLOSE_FORBIDDEN) => {
                            TransportEvent::Rejected(format!("Close code {}", code.unwrap_or_default()))
                        }
                        _ => TransportEvent::Closed,
                    };
                }
                Ok(_) => {}
                Err(tungstenite::Error::Io(ref e))
                    if e.kind() == std::io::ErrorKind::WouldBlock || e.kind() == std::io::ErrorKind::TimedOut =>
                {
                    continue;
                }
                Err(tungstenite::Error::ConnectionClosed) => break TransportEvent::Closed,
                Err(e) => {
                    log::error!("WebSocket read error: {}", e);
                    break TransportEvent::Failed(format!("Read failed: {e}"));
                }
            }
        };

        log::info!("WebSocket thread exiting");
        let _ = event_tx.send(closing);
    }

    impl Transport for NativeTransport {
        fn connect(&mut self, url: &str) -> Result<(), SyncError> {
            if self.cmd_tx.is_some() {
                return Err(SyncError::Transport("Already connected".to_string()));
            }
            let parsed = url::Url::parse(url).map_err(|e| SyncError::InvalidUrl(e.to_string()))?;
            if parsed.scheme() != "ws" && parsed.scheme() != "wss" {
                return Err(SyncError::InvalidUrl(format!(
                    "Invalid WebSocket URL scheme: {}",
                    parsed.scheme()
                )));
            }

            let (cmd_tx, cmd_rx) = channel::<WsCommand>();
            let (event_tx, event_rx) = channel::<TransportEvent>();
            let url = url.to_string();
            let handle = thread::Builder::new()
                .name("sketchsync-ws".into())
                .spawn(move || run(url, cmd_rx, event_tx))
                .map_err(|e| SyncError::Transport(format!("Failed to spawn socket thread: {e}")))?;

            self.cmd_tx = Some(cmd_tx);
            self.event_rx = Some(event_rx);
            self._thread = Some(handle);
            Ok(())
        }

        fn send(&mut self, text: &str) -> Result<(), SyncError> {
            match &self.cmd_tx {
                Some(tx) => tx
                    .send(WsCommand::Send(text.to_string()))
                    .map_err(|e| SyncError::Transport(format!("Send failed: {e}"))),
                None => Err(SyncError::Transport("Not connected".to_string())),
            }
        }

        fn disconnect(&mut self) {
            if let Some(tx) = self.cmd_tx.take() {
                let _ = tx.send(WsCommand::Close);
            }
            self.event_rx = None;
            self._thread = None;
        }

        fn poll_events(&mut self) -> Vec<TransportEvent> {
            let mut events = Vec::new();
            let mut finished = false;
            if let Some(rx) = &self.event_rx {
                loop {
                    match rx.try_recv() {
                        Ok(event) => {
                            finished |= matches!(
                                event,
                                TransportEvent::Closed | TransportEvent::Failed(_) | TransportEvent::Rejected(_)
                            );
                            events.push(event);
                        }
                        Err(TryRecvError::Empty) => break,
                        Err(TryRecvError::Disconnected) => {
                            finished = true;
                            break;
                        }
                    }
                }
            }
            if finished {
                // The thread is gone; allow a fresh connect.
                self.cmd_tx = None;
                self.event_rx = None;
                self._thread = None;
            }
            events
        }
    }

    impl Default for NativeTransport {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Drop for NativeTransport {
        fn drop(&mut self) {
            self.disconnect();
        }
    }
}

pub use native::NativeTransport;
