//! # Session Authentication
//!
//! Resolves the caller from an `Authorization: Bearer <token>` header.
//! Token validation is delegated to the user-session service.

use crate::handlers::{store_error_to_response, ApiError};
use crate::state::AppState;
use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts, StatusCode};
use reqwest::Client;
use store_core::{SessionProvider, StoreError, StoreResult, User, READ_PERMISSION};
use tracing::{debug, error};

/// The authenticated caller, holding the `read` permission
#[derive(Debug, Clone)]
pub struct SessionUser(pub User);

impl FromRequestParts<AppState> for SessionUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| {
                store_error_to_response(StoreError::Unauthorized(
                    "Missing or invalid Authorization header".to_string(),
                ))
            })?;

        let user = state
            .sessions
            .user_for_token(token)
            .await
            .map_err(|e| {
                error!("Session lookup failed: {}", e);
                store_error_to_response(e)
            })?
            .ok_or_else(|| {
                store_error_to_response(StoreError::Unauthorized(
                    "Invalid or expired session".to_string(),
                ))
            })?;

        user.require(READ_PERMISSION)
            .map_err(store_error_to_response)?;

        Ok(SessionUser(user))
    }
}

/// `SessionProvider` backed by the user-session service's `GET /users/me`
#[derive(Debug, Clone)]
pub struct HttpSessionProvider {
    base_url: String,
    client: Client,
}

impl HttpSessionProvider {
    pub fn new(base_url: impl Into<String>) -> StoreResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| {
                StoreError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl SessionProvider for HttpSessionProvider {
    async fn user_for_token(&self, token: &str) -> StoreResult<Option<User>> {
        let response = self
            .client
            .get(format!("{}/users/me", self.base_url))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| StoreError::NetworkError(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED
            || status == StatusCode::FORBIDDEN
            || status == StatusCode::NOT_FOUND
        {
            debug!("Session service rejected token: {}", status);
            return Ok(None);
        }

        if !status.is_success() {
            return Err(StoreError::NetworkError(format!(
                "Session service returned {}",
                status
            )));
        }

        let user = response
            .json::<User>()
            .await
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(Some(user))
    }
}
