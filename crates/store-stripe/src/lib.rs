//! # store-stripe
//!
//! Stripe payment processor for the storefront router.
//!
//! - **StripeClient** - `PaymentProcessor` over the Stripe REST API
//!   (payment intents, refunds, prices, checkout sessions, products)
//! - **webhook** - `Stripe-Signature` verification, event parsing and dispatch
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use store_stripe::StripeClient;
//! use store_core::PaymentProcessor;
//!
//! let stripe = StripeClient::from_env()?;
//! let prices = stripe.list_active_prices("prod_123", 1).await?;
//! ```
//!
//! ## Webhook Handling
//!
//! ```rust,ignore
//! use store_stripe::{dispatch_webhook_event, CheckoutCompletedData, WebhookHandler};
//!
//! struct Fulfillment;
//!
//! #[async_trait]
//! impl WebhookHandler for Fulfillment {
//!     async fn on_checkout_completed(&self, data: CheckoutCompletedData) -> StoreResult<()> {
//!         println!("Session {} paid", data.session_id);
//!         Ok(())
//!     }
//! }
//!
//! let event = stripe.verify_webhook(payload, signature).await?;
//! dispatch_webhook_event(&Fulfillment, &event).await?;
//! ```

pub mod client;
pub mod config;
pub mod webhook;

// Re-exports
pub use client::StripeClient;
pub use config::StripeConfig;
pub use webhook::{
    construct_event, dispatch_webhook_event, generate_test_header, CheckoutCompletedData,
    WebhookHandler, REQUIRED_WEBHOOK_EVENTS,
};
