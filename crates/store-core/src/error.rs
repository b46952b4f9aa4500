//! # Store Error Types
//!
//! Typed error handling for the storefront router.
//! Every collaborator call (processor, persistence, session) returns
//! `Result<T, StoreError>`.

use thiserror::Error;

/// Core error type for all collaborator operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// Configuration errors (missing keys, invalid config)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Order missing, or not visible to the caller
    #[error("Order not found: {order_id}")]
    OrderNotFound { order_id: String },

    /// No active price exists for a product
    #[error("No active price found for this product")]
    NoActivePrice { product_id: String },

    /// Payment processor API error
    #[error("Provider error [{provider}]: {message}")]
    ProviderError { provider: String, message: String },

    /// Network/HTTP error communicating with a remote collaborator
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Webhook signature verification failed
    #[error("Webhook verification failed: {0}")]
    WebhookVerificationFailed(String),

    /// Webhook payload parsing error
    #[error("Webhook parse error: {0}")]
    WebhookParseError(String),

    /// No session, or the session provider rejected the token
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated user lacks a required permission
    #[error("Forbidden: missing permission {permission}")]
    Forbidden { permission: String },

    /// Persistence layer failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Returns the HTTP status code appropriate for this error.
    ///
    /// Handlers may override this: the checkout endpoints report every
    /// processor failure as 400 and the refund endpoint reports them as 500.
    pub fn status_code(&self) -> u16 {
        match self {
            StoreError::Configuration(_) => 500,
            StoreError::InvalidRequest(_) => 400,
            StoreError::OrderNotFound { .. } => 404,
            StoreError::NoActivePrice { .. } => 400,
            StoreError::ProviderError { .. } => 502,
            StoreError::NetworkError(_) => 503,
            StoreError::WebhookVerificationFailed(_) => 400,
            StoreError::WebhookParseError(_) => 400,
            StoreError::Unauthorized(_) => 401,
            StoreError::Forbidden { .. } => 403,
            StoreError::Storage(_) => 500,
            StoreError::Serialization(_) => 500,
            StoreError::Internal(_) => 500,
        }
    }

    /// Shorthand for a Stripe API error
    pub fn stripe(message: impl Into<String>) -> Self {
        StoreError::ProviderError {
            provider: "stripe".to_string(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;
