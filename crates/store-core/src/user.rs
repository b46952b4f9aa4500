//! # Users and Sessions
//!
//! The authenticated caller and the session-provider seam. Session
//! mechanics live in an external service; this crate only resolves a
//! bearer token to a [`User`].

use crate::error::{StoreError, StoreResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Permission required by the checkout and refund endpoints
pub const READ_PERMISSION: &str = "read";

/// A storefront user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub permissions: HashSet<String>,
}

impl User {
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            permissions: HashSet::new(),
        }
    }

    /// Builder: grant a permission
    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions.insert(permission.into());
        self
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }

    /// Fail with `Forbidden` unless the user holds `permission`
    pub fn require(&self, permission: &str) -> StoreResult<()> {
        if self.has_permission(permission) {
            Ok(())
        } else {
            Err(StoreError::Forbidden {
                permission: permission.to_string(),
            })
        }
    }
}

/// Resolves session tokens to users
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Returns `Ok(None)` when the token is unknown or expired
    async fn user_for_token(&self, token: &str) -> StoreResult<Option<User>>;
}

/// Type alias for a shared session provider
pub type BoxedSessionProvider = Arc<dyn SessionProvider>;

/// Fixed token table, for development and tests
#[derive(Debug, Clone, Default)]
pub struct StaticSessionProvider {
    sessions: HashMap<String, User>,
}

impl StaticSessionProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: register a token for a user
    pub fn with_session(mut self, token: impl Into<String>, user: User) -> Self {
        self.sessions.insert(token.into(), user);
        self
    }
}

#[async_trait]
impl SessionProvider for StaticSessionProvider {
    async fn user_for_token(&self, token: &str) -> StoreResult<Option<User>> {
        Ok(self.sessions.get(token).cloned())
    }
}
