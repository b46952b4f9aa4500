//! # Payment Processor Trait
//!
//! The seam between the handlers and the third-party payment platform.
//! The Stripe implementation lives in `store-stripe`; tests substitute
//! their own.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 PaymentProcessor (trait)                    │
//! │  ├── create_payment_intent()                                │
//! │  ├── create_refund()                                        │
//! │  ├── list_active_prices()                                   │
//! │  ├── create_checkout_session() / list_line_items()          │
//! │  ├── retrieve_product()                                     │
//! │  └── verify_webhook()                                       │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!                    ┌───────┴───────┐
//!                    │ StripeClient  │
//!                    └───────────────┘
//! ```

use crate::checkout::CheckoutSessionParams;
use crate::error::StoreResult;
use crate::payment::{
    CheckoutLineItem, CheckoutSession, PaymentIntent, PaymentIntentParams, Price, Product,
    Refund, RefundParams, WebhookEvent,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Remote payment processor operations used by the router
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    async fn create_payment_intent(&self, params: &PaymentIntentParams)
        -> StoreResult<PaymentIntent>;

    async fn create_refund(&self, params: &RefundParams) -> StoreResult<Refund>;

    /// Active prices for `product_id`, at most `limit`
    async fn list_active_prices(&self, product_id: &str, limit: u32) -> StoreResult<Vec<Price>>;

    async fn create_checkout_session(
        &self,
        params: &CheckoutSessionParams,
    ) -> StoreResult<CheckoutSession>;

    async fn list_line_items(&self, session_id: &str) -> StoreResult<Vec<CheckoutLineItem>>;

    async fn retrieve_product(&self, product_id: &str) -> StoreResult<Product>;

    /// Verify a webhook signature and parse the event.
    ///
    /// # Arguments
    /// * `payload` - Raw webhook body bytes
    /// * `signature` - Signature header from the request
    async fn verify_webhook(&self, payload: &[u8], signature: &str)
        -> StoreResult<WebhookEvent>;

    /// Provider name (for logging)
    fn provider_name(&self) -> &'static str;
}

/// Type alias for a shared payment processor (dynamic dispatch)
pub type BoxedPaymentProcessor = Arc<dyn PaymentProcessor>;
