//! SketchSync relay server.
//!
//! Clients connect to `/ws/{board_id}?token=...` (or `share_token=...`) and
//! exchange JSON text frames tagged by `type`:
//!
//! - on connect the server sends `sync_state` with the board, then announces
//!   `join` with the full user list to everyone in the room
//! - `element_add`, `element_update`, `element_remove` and `sync_state` update
//!   the room's element store and are relayed to the other users
//! - `cursor` is relayed with the sender's id, name and color attached
//! - `save_request` persists the board and is not relayed
//! - on disconnect the others receive `leave` with the remaining users

pub mod auth;
pub mod config;
mod error;
mod relay;
pub mod room;
pub mod store;

use std::sync::Arc;

use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use auth::{Authenticator, Identity, TokenAuthenticator, WsQuery};
pub use config::{ConfigError, ServerConfig};
pub use error::ServerError;
pub use room::RoomManager;
pub use store::{BoardStore, MemoryStore};

/// Shared state
pub struct AppState {
    pub rooms: RoomManager,
    pub auth: Arc<dyn Authenticator>,
}

impl AppState {
    pub fn new(auth: Arc<dyn Authenticator>, store: Arc<dyn BoardStore>) -> Self {
        Self {
            rooms: RoomManager::new(store),
            auth,
        }
    }

    /// Token auth from `config` with an in-memory store.
    pub fn from_config(config: ServerConfig) -> Self {
        Self::new(Arc::new(TokenAuthenticator::new(config)), Arc::new(MemoryStore::new()))
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/ws/{board_id}", get(relay::ws_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve on an already-bound listener until the server stops.
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> Result<(), ServerError> {
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Index page
async fn index() -> &'static str {
    "SketchSync Relay Server - Connect via WebSocket at /ws/{board_id}"
}

/// Health check
async fn health() -> &'static str {
    "ok"
}
