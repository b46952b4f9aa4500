//! # Request Handlers
//!
//! Axum request handlers for checkout, refunds, webhooks and product lookup.
//! Each handler validates the request, calls the payment processor, reads or
//! writes an order, and maps failures to an HTTP status.

use crate::auth::SessionUser;
use crate::state::AppState;
use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use store_core::{
    BoxedCrud, BoxedPaymentProcessor, Order, OrderUpdate, PaymentIntentParams, Product,
    RefundParams, RefundReason, StoreError, StoreResult,
};
use store_stripe::{dispatch_webhook_event, CheckoutCompletedData, WebhookHandler};
use tracing::{error, info, instrument, warn};

// =============================================================================
// Request/Response Types
// =============================================================================

/// Create payment intent request
#[derive(Debug, Deserialize)]
pub struct CreatePaymentIntentRequest {
    /// Amount in smallest currency unit
    #[serde(default)]
    pub amount: Option<i64>,
}

/// Create payment intent response
#[derive(Debug, Serialize, Deserialize)]
pub struct CreatePaymentIntentResponse {
    #[serde(rename = "clientSecret")]
    pub client_secret: String,
}

/// Payment intent failure body
#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentIntentError {
    pub error: String,
}

/// Customer-supplied reason for a refund
#[derive(Debug, Clone, Deserialize)]
pub struct CancelReason {
    pub reason: String,
    #[serde(default)]
    pub details: String,
}

impl CancelReason {
    /// Free-text details when the reason is "Other", else the reason itself
    pub fn customer_reason(&self) -> &str {
        if self.reason == "Other" && !self.details.is_empty() {
            &self.details
        } else {
            &self.reason
        }
    }
}

/// Refund request
#[derive(Debug, Deserialize)]
pub struct CreateRefundRequest {
    pub payment_intent_id: String,
    pub cancel_reason: CancelReason,
    /// Amount in smallest currency unit
    pub amount: i64,
}

/// Create checkout session request
#[derive(Debug, Deserialize)]
pub struct CreateCheckoutSessionRequest {
    pub product_id: String,
    /// Path on the storefront to return to if the customer cancels
    pub cancel_url: String,
}

/// Create checkout session response
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateCheckoutSessionResponse {
    pub session_id: String,
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
        }
    }
}

/// Handler rejection: status plus JSON error body
pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Map an error to its default status
pub(crate) fn store_error_to_response(err: StoreError) -> ApiError {
    let code = err.status_code();
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    with_status(status, err)
}

/// Map an error to a fixed status
fn with_status(status: StatusCode, err: StoreError) -> ApiError {
    (status, Json(ErrorResponse::new(err.to_string(), status.as_u16())))
}

/// Malformed or incomplete JSON body
fn invalid_body(rejection: JsonRejection) -> ApiError {
    warn!("Rejected request body: {}", rejection.body_text());
    with_status(
        StatusCode::BAD_REQUEST,
        StoreError::InvalidRequest(rejection.body_text()),
    )
}

fn order_not_found() -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse::new("Order not found", 404)),
    )
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "storefront",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Create a payment intent and hand back its client secret
#[instrument(skip(state, payload))]
pub async fn create_payment_intent(
    State(state): State<AppState>,
    payload: Result<Json<CreatePaymentIntentRequest>, JsonRejection>,
) -> Result<Json<CreatePaymentIntentResponse>, (StatusCode, Json<PaymentIntentError>)> {
    let fail = |message: String| {
        (
            StatusCode::BAD_REQUEST,
            Json(PaymentIntentError { error: message }),
        )
    };

    let Json(request) = payload.map_err(|e| fail(e.body_text()))?;
    let amount = request
        .amount
        .ok_or_else(|| fail("Missing required param: amount".to_string()))?;

    let params = PaymentIntentParams {
        amount,
        currency: "usd".to_string(),
        automatic_payment_methods: true,
    };

    let intent = state
        .processor
        .create_payment_intent(&params)
        .await
        .map_err(|e| {
            error!("Failed to create payment intent: {}", e);
            fail(e.to_string())
        })?;

    let client_secret = intent
        .client_secret
        .ok_or_else(|| fail(format!("Payment intent {} has no client secret", intent.id)))?;

    Ok(Json(CreatePaymentIntentResponse { client_secret }))
}

/// Refund an order owned by the caller
#[instrument(skip(state, user, payload), fields(user_id = %user.id))]
pub async fn refund_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    SessionUser(user): SessionUser,
    payload: Result<Json<CreateRefundRequest>, JsonRejection>,
) -> Result<Json<Order>, ApiError> {
    let Json(request) = payload.map_err(invalid_body)?;
    let internal = |e: StoreError| {
        error!("Error processing refund: {}", e);
        with_status(StatusCode::INTERNAL_SERVER_ERROR, e)
    };

    // Ownership is checked before any money moves
    let order = state
        .crud
        .get_order(&order_id)
        .await
        .map_err(internal)?
        .filter(|order| order.is_owned_by(&user.id))
        .ok_or_else(order_not_found)?;
    info!("Found order id: {}", order.id);

    let mut metadata = HashMap::new();
    metadata.insert(
        "customer_reason".to_string(),
        request.cancel_reason.customer_reason().to_string(),
    );

    let refund = state
        .processor
        .create_refund(&RefundParams {
            payment_intent: request.payment_intent_id,
            amount: request.amount,
            reason: RefundReason::RequestedByCustomer,
            metadata,
        })
        .await
        .map_err(internal)?;
    info!("Refund created: {}", refund.id);

    let updated = state
        .crud
        .update_order(
            &order_id,
            OrderUpdate::refund(refund.id, refund.status.as_deref()),
        )
        .await
        .map_err(internal)?;

    info!("Updated order with status: {}", updated.status);
    Ok(Json(updated))
}

/// Handle Stripe webhook
#[instrument(skip(state, headers, body))]
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, ApiError> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new("Missing Stripe-Signature header", 400)),
            )
        })?;

    info!("Received Stripe webhook");

    let event = state
        .processor
        .verify_webhook(&body, signature)
        .await
        .map_err(|e| {
            error!("Webhook verification failed: {}", e);
            with_status(StatusCode::BAD_REQUEST, e)
        })?;

    info!(
        "Webhook verified. Event type: {}, id: {}",
        event.event_type.as_str(),
        event.event_id
    );

    let handler = OrderWebhookHandler {
        processor: state.processor.clone(),
        crud: state.crud.clone(),
    };
    dispatch_webhook_event(&handler, &event).await.map_err(|e| {
        error!("Webhook handler error: {}", e);
        with_status(StatusCode::INTERNAL_SERVER_ERROR, e)
    })?;

    Ok(Json(serde_json::json!({ "status": "success" })))
}

/// Create a hosted checkout session for one product
#[instrument(skip(state, user, payload), fields(user_id = %user.id))]
pub async fn create_checkout_session(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
    payload: Result<Json<CreateCheckoutSessionRequest>, JsonRejection>,
) -> Result<Json<CreateCheckoutSessionResponse>, ApiError> {
    let Json(request) = payload.map_err(invalid_body)?;
    let bad_request = |e: StoreError| {
        error!("Error creating checkout session: {}", e);
        with_status(StatusCode::BAD_REQUEST, e)
    };

    info!(
        "Creating checkout session for product: {} and user: {}",
        request.product_id, user.id
    );

    let price = state
        .processor
        .list_active_prices(&request.product_id, 1)
        .await
        .map_err(bad_request)?
        .into_iter()
        .next()
        .ok_or_else(|| {
            bad_request(StoreError::NoActivePrice {
                product_id: request.product_id.clone(),
            })
        })?;

    let params = state.checkout.session_params(
        &state.config.homepage,
        &price.id,
        &request.product_id,
        &request.cancel_url,
        &user,
    );

    let session = state
        .processor
        .create_checkout_session(&params)
        .await
        .map_err(bad_request)?;

    info!("Checkout session created: {}", session.id);
    Ok(Json(CreateCheckoutSessionResponse {
        session_id: session.id,
    }))
}

/// Product metadata passthrough
#[instrument(skip(state))]
pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> Result<Json<Product>, ApiError> {
    let product = state
        .processor
        .retrieve_product(&product_id)
        .await
        .map_err(|e| with_status(StatusCode::BAD_REQUEST, e))?;

    Ok(Json(product))
}

// =============================================================================
// Webhook Fulfillment
// =============================================================================

/// Creates orders from completed checkout sessions
pub struct OrderWebhookHandler {
    pub processor: BoxedPaymentProcessor,
    pub crud: BoxedCrud,
}

#[async_trait]
impl WebhookHandler for OrderWebhookHandler {
    async fn on_checkout_completed(&self, data: CheckoutCompletedData) -> StoreResult<()> {
        let line_items = self.processor.list_line_items(&data.session_id).await?;
        let quantity = line_items
            .first()
            .and_then(|item| item.quantity)
            .unwrap_or(1);

        let mut new_order = data.into_new_order(quantity);

        match new_order.user_id.as_deref() {
            Some(user_id) if new_order.user_email.is_none() => {
                match self.crud.get_user(user_id).await? {
                    Some(user) => new_order.user_email = Some(user.email),
                    None => warn!("User not found for id: {}", user_id),
                }
            }
            Some(_) => {}
            None => warn!(
                "No user_id found for session: {:?}",
                new_order.stripe_checkout_session_id
            ),
        }

        let order = self.crud.create_order(new_order).await?;
        info!("New order created: {}", order.id);
        Ok(())
    }
}
