//! Server configuration from the environment.

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;

use thiserror::Error;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid PORT: {0}")]
    InvalidPort(String),

    #[error("Invalid listen address: {0}")]
    InvalidAddress(String),

    #[error("Malformed token entry (expected token:username): {0}")]
    MalformedToken(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Bearer token to username.
    pub tokens: HashMap<String, String>,
    /// Tokens granting guest access to any board.
    pub share_tokens: HashSet<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            tokens: HashMap::new(),
            share_tokens: HashSet::new(),
        }
    }
}

impl ServerConfig {
    /// Read `HOST`, `PORT`, `SKETCHSYNC_TOKENS` and `SKETCHSYNC_SHARE_TOKENS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(host) = lookup("HOST") {
            config.host = host;
        }
        if let Some(port) = lookup("PORT") {
            config.port = port.trim().parse().map_err(|_| ConfigError::InvalidPort(port.clone()))?;
        }
        if let Some(tokens) = lookup("SKETCHSYNC_TOKENS") {
            config.tokens = parse_tokens(&tokens)?;
        }
        if let Some(shares) = lookup("SKETCHSYNC_SHARE_TOKENS") {
            config.share_tokens = split_list(&shares).map(str::to_string).collect();
        }
        Ok(config)
    }

    pub fn with_token(mut self, token: impl Into<String>, username: impl Into<String>) -> Self {
        self.tokens.insert(token.into(), username.into());
        self
    }

    pub fn with_share_token(mut self, token: impl Into<String>) -> Self {
        self.share_tokens.insert(token.into());
        self
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| ConfigError::InvalidAddress(format!("{}:{}", self.host, self.port)))
    }
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn parse_tokens(raw: &str) -> Result<HashMap<String, String>, ConfigError> {
    split_list(raw)
        .map(|entry| match entry.split_once(':') {
            Some((token, username)) if !token.is_empty() && !username.is_empty() => {
                Ok((token.to_string(), username.to_string()))
            }
            _ => Err(ConfigError::MalformedToken(entry.to_string())),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_lookup(vars(&[])).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert!(config.tokens.is_empty());
        assert_eq!(config.socket_addr().unwrap().port(), 3000);
    }

    #[test]
    fn test_tokens_and_shares() {
        let config = ServerConfig::from_lookup(vars(&[
            ("PORT", "8080"),
            ("SKETCHSYNC_TOKENS", "abc:alice, def:bob"),
            ("SKETCHSYNC_SHARE_TOKENS", "s1,,s2"),
        ]))
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.tokens.get("abc").map(String::as_str), Some("alice"));
        assert_eq!(config.tokens.get("def").map(String::as_str), Some("bob"));
        assert_eq!(config.share_tokens.len(), 2);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert_eq!(
            ServerConfig::from_lookup(vars(&[("PORT", "http")])),
            Err(ConfigError::InvalidPort("http".into()))
        );
        assert_eq!(
            ServerConfig::from_lookup(vars(&[("SKETCHSYNC_TOKENS", "abc")])),
            Err(ConfigError::MalformedToken("abc".into()))
        );
    }
}
