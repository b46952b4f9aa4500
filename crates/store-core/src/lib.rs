//! # store-core
//!
//! Core types and collaborator traits for the storefront payment router.
//!
//! This crate provides:
//! - `PaymentProcessor` trait for the third-party payment platform
//! - `Crud` trait for order and user persistence, with an in-memory implementation
//! - `SessionProvider` trait for resolving the authenticated caller
//! - `Order`, `NewOrder` and `OrderUpdate` field mappings
//! - `CheckoutSettings` for hosted checkout options
//! - `StoreError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use store_core::{Crud, InMemoryStore, OrderUpdate};
//!
//! let store = InMemoryStore::new();
//! let order = store.create_order(new_order).await?;
//! let refund = processor.create_refund(&params).await?;
//! store
//!     .update_order(&order.id, OrderUpdate::refund(refund.id, refund.status.as_deref()))
//!     .await?;
//! ```

pub mod checkout;
pub mod error;
pub mod order;
pub mod payment;
pub mod processor;
pub mod store;
pub mod user;

// Re-exports for convenience
pub use checkout::{CheckoutSessionParams, CheckoutSettings, ShippingRate};
pub use error::{StoreError, StoreResult};
pub use order::{NewOrder, Order, OrderStatus, OrderUpdate, ShippingDetails};
pub use payment::{
    CheckoutLineItem, CheckoutSession, PaymentIntent, PaymentIntentParams, Price, Product,
    Refund, RefundParams, RefundReason, WebhookEvent, WebhookEventType,
};
pub use processor::{BoxedPaymentProcessor, PaymentProcessor};
pub use store::{BoxedCrud, Crud, InMemoryStore};
pub use user::{BoxedSessionProvider, SessionProvider, StaticSessionProvider, User, READ_PERMISSION};
