//! # Routes
//!
//! Axum router configuration for the storefront API.

use crate::handlers;
use crate::state::{AppConfig, AppState};
use axum::{
    http::HeaderValue,
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

/// Create the main application router
///
/// Routes:
/// - POST /create-payment-intent - Create payment intent, return client secret
/// - PUT  /refunds/{order_id} - Refund an order owned by the caller
/// - POST /webhook - Stripe webhook handler
/// - POST /create-checkout-session - Create hosted checkout for a product
/// - GET  /get-product/{product_id} - Product metadata passthrough
/// - GET  /health - Health check
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/create-payment-intent", post(handlers::create_payment_intent))
        .route("/refunds/{order_id}", put(handlers::refund_order))
        .route("/webhook", post(handlers::stripe_webhook))
        .route(
            "/create-checkout-session",
            post(handlers::create_checkout_session),
        )
        .route("/get-product/{product_id}", get(handlers::get_product))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Production only admits the storefront homepage; other environments allow any origin
fn cors_layer(config: &AppConfig) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if !config.is_production() {
        return cors.allow_origin(Any);
    }

    match HeaderValue::from_str(config.homepage.trim_end_matches('/')) {
        Ok(origin) => cors.allow_origin(origin),
        Err(_) => {
            warn!("Homepage {} is not a valid origin, allowing any", config.homepage);
            cors.allow_origin(Any)
        }
    }
}
