//! # store-api
//!
//! HTTP routing layer for storefront checkout, refunds and webhooks.
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | POST | `/create-payment-intent` | Create payment intent |
//! | PUT | `/refunds/{order_id}` | Refund an order (session required) |
//! | POST | `/webhook` | Stripe webhook |
//! | POST | `/create-checkout-session` | Create hosted checkout (session required) |
//! | GET | `/get-product/{product_id}` | Product lookup |

pub mod auth;
pub mod handlers;
pub mod routes;
pub mod state;

pub use auth::{HttpSessionProvider, SessionUser};
pub use routes::create_router;
pub use state::{AppConfig, AppState};
