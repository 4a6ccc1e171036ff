use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::model::{Identity, Role};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("reading users file: {0}")]
    Io(#[from] std::io::Error),
    #[error("parsing users file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("duplicate token for user {0}")]
    DuplicateToken(String),
}

/// Resolves a bearer credential to the caller behind it.
#[async_trait]
pub trait IdentitySource: Send + Sync {
    async fn identify(&self, token: &str) -> Option<Identity>;
}

#[derive(Debug, Deserialize)]
struct UserEntry {
    token: String,
    id: String,
    role: Role,
    email: String,
}

/// Fixed token table, loaded once at startup.
#[derive(Debug, Default)]
pub struct StaticTokens {
    by_token: HashMap<String, Identity>,
}

impl StaticTokens {
    /// Parse `[{"token", "id", "role", "email"}, ...]`.
    pub fn from_json(json: &str) -> Result<Self, AuthError> {
        let entries: Vec<UserEntry> = serde_json::from_str(json)?;
        let mut by_token = HashMap::with_capacity(entries.len());
        for e in entries {
            let identity = Identity {
                id: e.id,
                role: e.role,
                email: e.email,
            };
            if by_token.insert(e.token, identity.clone()).is_some() {
                return Err(AuthError::DuplicateToken(identity.id));
            }
        }
        Ok(Self { by_token })
    }

    pub fn load(path: &Path) -> Result<Self, AuthError> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    pub fn len(&self) -> usize {
        self.by_token.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_token.is_empty()
    }
}

#[async_trait]
impl IdentitySource for StaticTokens {
    async fn identify(&self, token: &str) -> Option<Identity> {
        if token.is_empty() {
            return None;
        }
        self.by_token.get(token).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USERS: &str = r#"[
        {"token": "admin-secret", "id": "a1", "role": "ADMIN", "email": "admin@terminal.no"},
        {"token": "user-secret", "id": "u1", "role": "USER", "email": "ops@frakt.no"}
    ]"#;

    #[tokio::test]
    async fn identifies_known_tokens() {
        let tokens = StaticTokens::from_json(USERS).unwrap();
        assert_eq!(tokens.len(), 2);

        let admin = tokens.identify("admin-secret").await.unwrap();
        assert!(admin.is_admin());
        let user = tokens.identify("user-secret").await.unwrap();
        assert_eq!(user.id, "u1");
        assert!(!user.is_admin());
    }

    #[tokio::test]
    async fn unknown_or_empty_token_is_anonymous() {
        let tokens = StaticTokens::from_json(USERS).unwrap();
        assert!(tokens.identify("nope").await.is_none());
        assert!(tokens.identify("").await.is_none());
    }

    #[test]
    fn duplicate_tokens_rejected() {
        let json = r#"[
            {"token": "t", "id": "a", "role": "USER", "email": "a@x.no"},
            {"token": "t", "id": "b", "role": "USER", "email": "b@x.no"}
        ]"#;
        assert!(matches!(StaticTokens::from_json(json), Err(AuthError::DuplicateToken(_))));
    }

    #[test]
    fn bad_role_is_parse_error() {
        let json = r#"[{"token": "t", "id": "a", "role": "ROOT", "email": "a@x.no"}]"#;
        assert!(matches!(StaticTokens::from_json(json), Err(AuthError::Parse(_))));
    }
}
