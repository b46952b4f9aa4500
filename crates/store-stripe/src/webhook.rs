//! # Stripe Webhook Handling
//!
//! Signature verification, event parsing and dispatch for Stripe webhooks.
//! Delivery is at-least-once upstream; nothing here deduplicates or retries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::collections::HashMap;
use store_core::{
    NewOrder, OrderStatus, ShippingDetails, StoreError, StoreResult, WebhookEvent,
    WebhookEventType,
};
use tracing::{debug, info, warn};

type HmacSha256 = Hmac<Sha256>;

// =============================================================================
// Signature Verification
// =============================================================================

struct SignatureHeader {
    timestamp: i64,
    signatures: Vec<String>,
}

fn parse_signature_header(header: &str) -> StoreResult<SignatureHeader> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => timestamp = value.parse().ok(),
            "v1" => signatures.push(value.to_string()),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| {
        StoreError::WebhookVerificationFailed("Missing timestamp in signature".to_string())
    })?;

    if signatures.is_empty() {
        return Err(StoreError::WebhookVerificationFailed(
            "No v1 signature found".to_string(),
        ));
    }

    Ok(SignatureHeader {
        timestamp,
        signatures,
    })
}

fn signed_payload_mac(secret: &str, timestamp: i64, payload: &[u8]) -> HmacSha256 {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    mac
}

/// Hex signature of `payload` at `timestamp`
pub fn compute_signature(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    hex::encode(signed_payload_mac(secret, timestamp, payload).finalize().into_bytes())
}

/// Build a `Stripe-Signature` header value, as the Stripe CLI does for test events
pub fn generate_test_header(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    format!(
        "t={},v1={}",
        timestamp,
        compute_signature(secret, timestamp, payload)
    )
}

/// Verify `signature_header` against `payload` and parse the event.
///
/// The timestamp must be within `tolerance_secs` of `now`; any `v1`
/// signature may match.
pub fn construct_event(
    payload: &[u8],
    signature_header: &str,
    secret: &str,
    tolerance_secs: i64,
    now: DateTime<Utc>,
) -> StoreResult<WebhookEvent> {
    let header = parse_signature_header(signature_header)?;

    if now.timestamp().abs_diff(header.timestamp) > tolerance_secs.unsigned_abs() {
        return Err(StoreError::WebhookVerificationFailed(
            "Timestamp outside tolerance".to_string(),
        ));
    }

    let valid = header.signatures.iter().any(|sig| {
        hex::decode(sig)
            .map(|bytes| {
                signed_payload_mac(secret, header.timestamp, payload)
                    .verify_slice(&bytes)
                    .is_ok()
            })
            .unwrap_or(false)
    });

    if !valid {
        return Err(StoreError::WebhookVerificationFailed(
            "Signature mismatch".to_string(),
        ));
    }

    parse_event(payload)
}

#[derive(Debug, Deserialize)]
struct StripeWebhookEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    created: i64,
    data: StripeEventData,
}

#[derive(Debug, Deserialize)]
struct StripeEventData {
    object: serde_json::Value,
}

fn parse_event(payload: &[u8]) -> StoreResult<WebhookEvent> {
    let event: StripeWebhookEvent = serde_json::from_slice(payload)
        .map_err(|e| StoreError::WebhookParseError(format!("Failed to parse webhook: {}", e)))?;

    debug!("Verified Stripe webhook: type={}", event.event_type);

    Ok(WebhookEvent {
        event_id: event.id,
        event_type: WebhookEventType::parse(&event.event_type),
        object: event.data.object,
        created_at: DateTime::from_timestamp(event.created, 0).unwrap_or_else(Utc::now),
    })
}

// =============================================================================
// Checkout Session Data
// =============================================================================

/// Parsed `checkout.session.completed` data object
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutCompletedData {
    pub session_id: String,
    /// The user who started the checkout
    pub client_reference_id: Option<String>,
    pub customer_email: Option<String>,
    pub payment_intent_id: Option<String>,
    pub amount_total: i64,
    pub currency: String,
    pub payment_status: String,
    pub metadata: HashMap<String, String>,
    pub shipping: ShippingDetails,
}

fn str_field(value: &serde_json::Value, key: &str) -> Option<String> {
    value.get(key).and_then(|v| v.as_str()).map(String::from)
}

impl CheckoutCompletedData {
    /// Parse from a webhook event
    pub fn from_event(event: &WebhookEvent) -> StoreResult<Self> {
        let obj = &event.object;
        if !obj.is_object() {
            return Err(StoreError::WebhookParseError(
                "Event data is not an object".to_string(),
            ));
        }

        let session_id = str_field(obj, "id")
            .ok_or_else(|| StoreError::WebhookParseError("Missing session id".to_string()))?;

        let amount_total = obj
            .get("amount_total")
            .and_then(|v| v.as_i64())
            .ok_or_else(|| StoreError::WebhookParseError("Missing amount_total".to_string()))?;

        let currency = str_field(obj, "currency")
            .map(|c| c.to_lowercase())
            .ok_or_else(|| StoreError::WebhookParseError("Missing currency".to_string()))?;

        let customer_email = obj
            .get("customer_details")
            .and_then(|cd| str_field(cd, "email"));

        let metadata = obj
            .get("metadata")
            .and_then(|m| m.as_object())
            .map(|m| {
                m.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect()
            })
            .unwrap_or_default();

        // Newer API versions nest shipping under collected_information
        let shipping_details = obj
            .get("shipping_details")
            .filter(|v| !v.is_null())
            .or_else(|| {
                obj.get("collected_information")
                    .and_then(|ci| ci.get("shipping_details"))
                    .filter(|v| !v.is_null())
            });

        let shipping = match shipping_details {
            Some(details) => {
                let address = details.get("address").cloned().unwrap_or_default();
                ShippingDetails {
                    shipping_name: str_field(details, "name"),
                    shipping_address_line1: str_field(&address, "line1"),
                    shipping_address_line2: str_field(&address, "line2"),
                    shipping_city: str_field(&address, "city"),
                    shipping_state: str_field(&address, "state"),
                    shipping_postal_code: str_field(&address, "postal_code"),
                    shipping_country: str_field(&address, "country"),
                }
            }
            None => ShippingDetails::default(),
        };

        Ok(Self {
            session_id,
            client_reference_id: str_field(obj, "client_reference_id"),
            customer_email,
            payment_intent_id: str_field(obj, "payment_intent"),
            amount_total,
            currency,
            payment_status: str_field(obj, "payment_status")
                .unwrap_or_else(|| "unknown".to_string()),
            metadata,
            shipping,
        })
    }

    /// The product the session was created for
    pub fn product_id(&self) -> Option<&str> {
        self.metadata.get("product_id").map(|s| s.as_str())
    }

    /// Field mapping for the order this session creates
    pub fn into_new_order(self, quantity: u32) -> NewOrder {
        let product_id = self.product_id().map(String::from);
        NewOrder {
            user_id: self.client_reference_id,
            user_email: self.customer_email,
            stripe_checkout_session_id: Some(self.session_id),
            stripe_payment_intent_id: self.payment_intent_id,
            amount: self.amount_total,
            currency: self.currency,
            status: OrderStatus::Processing,
            product_id,
            quantity,
            shipping: self.shipping,
        }
    }
}

// =============================================================================
// Dispatch
// =============================================================================

/// Webhook event handler trait
///
/// Only checkout completion has side effects; the other hooks log by default.
#[async_trait]
pub trait WebhookHandler: Send + Sync {
    /// Called when a checkout session is completed
    async fn on_checkout_completed(&self, data: CheckoutCompletedData) -> StoreResult<()>;

    /// Called when a payment succeeds
    async fn on_payment_succeeded(&self, event: &WebhookEvent) -> StoreResult<()> {
        info!("Payment intent succeeded: {:?}", event.object_id());
        Ok(())
    }

    /// Called when a payment or delayed checkout payment fails
    async fn on_payment_failed(&self, event: &WebhookEvent) -> StoreResult<()> {
        warn!(
            "Payment failed: type={}, object={:?}",
            event.event_type.as_str(),
            event.object_id()
        );
        Ok(())
    }

    /// Called for unknown/unhandled events
    async fn on_unknown_event(&self, event: &WebhookEvent) -> StoreResult<()> {
        info!("Unhandled event type: {}", event.event_type.as_str());
        Ok(())
    }
}

/// Dispatch a webhook event to the appropriate handler method
pub async fn dispatch_webhook_event(
    handler: &dyn WebhookHandler,
    event: &WebhookEvent,
) -> StoreResult<()> {
    match &event.event_type {
        WebhookEventType::CheckoutCompleted => {
            let data = CheckoutCompletedData::from_event(event)?;
            info!("Checkout session completed: {}", data.session_id);
            handler.on_checkout_completed(data).await
        }
        WebhookEventType::PaymentSucceeded => handler.on_payment_succeeded(event).await,
        WebhookEventType::PaymentFailed | WebhookEventType::CheckoutPaymentFailed => {
            handler.on_payment_failed(event).await
        }
        WebhookEventType::Unknown(_) => handler.on_unknown_event(event).await,
    }
}

/// Events that should be enabled on the Stripe webhook endpoint
pub const REQUIRED_WEBHOOK_EVENTS: &[&str] = &[
    "checkout.session.completed",
    "checkout.session.async_payment_failed",
    "payment_intent.succeeded",
    "payment_intent.payment_failed",
];
