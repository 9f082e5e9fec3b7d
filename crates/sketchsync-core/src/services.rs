//! Collaborators the engine reaches through narrow traits.

use std::fmt;

use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Identifier of a board (one shared document).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoardId(String);

impl BoardId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BoardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BoardId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for BoardId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Read-only board information owned by the host application.
pub trait BoardMetadata {
    fn board_name(&self, board: &BoardId) -> Option<String>;

    /// Creation time as an RFC 3339 string.
    fn created_at(&self, board: &BoardId) -> Option<String>;
}

/// A credential accepted by the relay.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// Session token of a signed-in user.
    Bearer(String),
    /// Token from a share link.
    ShareToken(String),
}

// Tokens stay out of logs.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Bearer(_) => f.write_str("Bearer(..)"),
            Credential::ShareToken(_) => f.write_str("ShareToken(..)"),
        }
    }
}

/// Identity provider.
pub trait Credentials {
    fn credential(&self) -> Credential;
}

/// A fixed credential.
#[derive(Debug, Clone)]
pub struct StaticCredentials(pub Credential);

impl Credentials for StaticCredentials {
    fn credential(&self) -> Credential {
        self.0.clone()
    }
}

/// Upload storage for image bytes.
pub trait ImageStore {
    /// Store `bytes` and return a URL an image element can reference.
    fn upload(&self, bytes: &[u8], mime: &str) -> CoreResult<String>;
}

/// Keeps images inside the element as `data:` URLs.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineImageStore;

impl ImageStore for InlineImageStore {
    fn upload(&self, bytes: &[u8], mime: &str) -> CoreResult<String> {
        if !mime.starts_with("image/") {
            return Err(CoreError::Mutation(format!("Not an image type: {mime}")));
        }
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        Ok(format!("data:{mime};base64,{encoded}"))
    }
}
