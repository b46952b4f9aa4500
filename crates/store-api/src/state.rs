//! # Application State
//!
//! Shared state for the Axum application: the payment processor, the
//! data-access object, the session provider and configuration.

use crate::auth::HttpSessionProvider;
use std::net::{AddrParseError, SocketAddr};
use std::sync::Arc;
use store_core::{
    BoxedCrud, BoxedPaymentProcessor, BoxedSessionProvider, CheckoutSettings, InMemoryStore,
};
use store_stripe::StripeClient;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Storefront homepage; checkout redirect URLs hang off it
    pub homepage: String,
    /// Base URL of the user-session service
    pub auth_service_url: String,
    /// Environment (development, staging, production)
    pub environment: String,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            homepage: std::env::var("SITE_HOMEPAGE")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            auth_service_url: std::env::var("AUTH_SERVICE_URL")
                .unwrap_or_else(|_| "http://localhost:8081".to_string()),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
        }
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Payment processor
    pub processor: BoxedPaymentProcessor,
    /// Order and user persistence
    pub crud: BoxedCrud,
    /// Session-token resolution
    pub sessions: BoxedSessionProvider,
    /// Options applied to every hosted checkout
    pub checkout: Arc<CheckoutSettings>,
    /// Application config
    pub config: AppConfig,
}

impl AppState {
    /// Create state wired to Stripe, the in-memory store and the HTTP session service
    pub fn from_env() -> anyhow::Result<Self> {
        let config = AppConfig::from_env();

        let stripe = StripeClient::from_env()
            .map_err(|e| anyhow::anyhow!("Failed to initialize Stripe: {}", e))?;

        let sessions = HttpSessionProvider::new(&config.auth_service_url)
            .map_err(|e| anyhow::anyhow!("Failed to initialize session provider: {}", e))?;

        let checkout = CheckoutSettings::load_or_default()?;

        Ok(Self::new(
            config,
            Arc::new(stripe),
            Arc::new(InMemoryStore::new()),
            Arc::new(sessions),
            checkout,
        ))
    }

    /// Create state from explicit collaborators
    pub fn new(
        config: AppConfig,
        processor: BoxedPaymentProcessor,
        crud: BoxedCrud,
        sessions: BoxedSessionProvider,
        checkout: CheckoutSettings,
    ) -> Self {
        Self {
            processor,
            crud,
            sessions,
            checkout: Arc::new(checkout),
            config,
        }
    }
}
