//! Connection authentication.

use serde::Deserialize;
use uuid::Uuid;

use crate::config::ServerConfig;

pub const GUEST_USERNAME: &str = "Guest";

/// Credential query on the WebSocket upgrade.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct WsQuery {
    pub token: Option<String>,
    pub share_token: Option<String>,
}

/// A connection that passed authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Unique per connection.
    pub user_id: String,
    pub username: String,
}

impl Identity {
    fn new(username: impl Into<String>) -> Self {
        Self {
            user_id: Uuid::new_v4().to_string(),
            username: username.into(),
        }
    }
}

/// Decides who may join a board.
pub trait Authenticator: Send + Sync {
    /// `None` rejects the connection.
    fn authenticate(&self, board_id: &str, query: &WsQuery) -> Option<Identity>;
}

/// Static bearer and share tokens from [`ServerConfig`].
#[derive(Debug, Clone, Default)]
pub struct TokenAuthenticator {
    config: ServerConfig,
}

impl TokenAuthenticator {
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }
}

impl Authenticator for TokenAuthenticator {
    fn authenticate(&self, _board_id: &str, query: &WsQuery) -> Option<Identity> {
        // A bearer token takes precedence; an invalid one is not retried as a share token.
        if let Some(token) = &query.token {
            return self.config.tokens.get(token).map(Identity::new);
        }
        query
            .share_token
            .as_ref()
            .filter(|token| self.config.share_tokens.contains(*token))
            .map(|_| Identity::new(GUEST_USERNAME))
    }
}
