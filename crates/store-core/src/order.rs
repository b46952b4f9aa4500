//! # Order Types
//!
//! The order record and the field mappings handed to the persistence layer.
//! Orders are created when a checkout session completes and mutated when a
//! refund is issued.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fulfillment status of an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Paid through checkout, awaiting fulfillment
    Processing,
    /// Refund succeeded
    Refunded,
    /// Refund accepted by the processor but not settled
    Pending,
    /// Refund needs customer action
    RequiresAction,
    /// Refund failed
    Failed,
    /// Refund canceled
    Canceled,
    /// The processor returned a refund without a status
    NoStatus,
    /// Unrecognized refund status
    #[serde(other)]
    Unknown,
}

impl OrderStatus {
    /// Map a processor refund status onto the order status
    pub fn from_refund_status(status: Option<&str>) -> Self {
        match status {
            Some("succeeded") => OrderStatus::Refunded,
            Some("pending") => OrderStatus::Pending,
            Some("requires_action") => OrderStatus::RequiresAction,
            Some("failed") => OrderStatus::Failed,
            Some("canceled") => OrderStatus::Canceled,
            Some(_) => OrderStatus::Unknown,
            None => OrderStatus::NoStatus,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Processing => "processing",
            OrderStatus::Refunded => "refunded",
            OrderStatus::Pending => "pending",
            OrderStatus::RequiresAction => "requires_action",
            OrderStatus::Failed => "failed",
            OrderStatus::Canceled => "canceled",
            OrderStatus::NoStatus => "no_status",
            OrderStatus::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shipping name and address collected by the hosted checkout
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingDetails {
    #[serde(default)]
    pub shipping_name: Option<String>,
    #[serde(default)]
    pub shipping_address_line1: Option<String>,
    #[serde(default)]
    pub shipping_address_line2: Option<String>,
    #[serde(default)]
    pub shipping_city: Option<String>,
    #[serde(default)]
    pub shipping_state: Option<String>,
    #[serde(default)]
    pub shipping_postal_code: Option<String>,
    #[serde(default)]
    pub shipping_country: Option<String>,
}

/// A persisted order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,

    /// Owning user (the checkout session's client reference)
    pub user_id: Option<String>,

    pub user_email: Option<String>,

    /// Amount in smallest currency unit
    pub amount: i64,

    /// ISO 4217 code, lowercase
    pub currency: String,

    pub status: OrderStatus,

    pub product_id: Option<String>,

    pub quantity: u32,

    pub stripe_checkout_session_id: Option<String>,

    pub stripe_payment_intent_id: Option<String>,

    pub stripe_refund_id: Option<String>,

    #[serde(flatten)]
    pub shipping: ShippingDetails,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Materialize a new order with a generated ID
    pub fn from_new(new: NewOrder) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: new.user_id,
            user_email: new.user_email,
            amount: new.amount,
            currency: new.currency,
            status: new.status,
            product_id: new.product_id,
            quantity: new.quantity,
            stripe_checkout_session_id: new.stripe_checkout_session_id,
            stripe_payment_intent_id: new.stripe_payment_intent_id,
            stripe_refund_id: None,
            shipping: new.shipping,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply the `Some` fields of an update
    pub fn apply(&mut self, update: OrderUpdate) {
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(refund_id) = update.stripe_refund_id {
            self.stripe_refund_id = Some(refund_id);
        }
        self.updated_at = Utc::now();
    }

    /// Whether `user_id` owns this order
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id.as_deref() == Some(user_id)
    }
}

/// Field mapping for creating an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrder {
    pub user_id: Option<String>,
    pub user_email: Option<String>,
    pub stripe_checkout_session_id: Option<String>,
    pub stripe_payment_intent_id: Option<String>,
    pub amount: i64,
    pub currency: String,
    pub status: OrderStatus,
    pub product_id: Option<String>,
    pub quantity: u32,
    #[serde(flatten)]
    pub shipping: ShippingDetails,
}

/// Field mapping for updating an order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stripe_refund_id: Option<String>,
}

impl OrderUpdate {
    /// Update recording a refund and its outcome
    pub fn refund(refund_id: impl Into<String>, refund_status: Option<&str>) -> Self {
        Self {
            status: Some(OrderStatus::from_refund_status(refund_status)),
            stripe_refund_id: Some(refund_id.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_order() -> NewOrder {
        NewOrder {
            user_id: Some("user_1".to_string()),
            user_email: Some("ada@example.com".to_string()),
            stripe_checkout_session_id: Some("cs_test_1".to_string()),
            stripe_payment_intent_id: Some("pi_test_1".to_string()),
            amount: 4999,
            currency: "usd".to_string(),
            status: OrderStatus::Processing,
            product_id: Some("prod_1".to_string()),
            quantity: 2,
            shipping: ShippingDetails::default(),
        }
    }

    #[test]
    fn test_refund_status_mapping() {
        assert_eq!(
            OrderStatus::from_refund_status(Some("succeeded")),
            OrderStatus::Refunded
        );
        assert_eq!(
            OrderStatus::from_refund_status(Some("pending")),
            OrderStatus::Pending
        );
        assert_eq!(OrderStatus::from_refund_status(None), OrderStatus::NoStatus);
        assert_eq!(
            OrderStatus::from_refund_status(Some("mystery")),
            OrderStatus::Unknown
        );
    }

    #[test]
    fn test_apply_refund_update() {
        let mut order = Order::from_new(new_order());
        assert_eq!(order.status, OrderStatus::Processing);

        order.apply(OrderUpdate::refund("re_123", Some("succeeded")));

        assert_eq!(order.status, OrderStatus::Refunded);
        assert_eq!(order.stripe_refund_id.as_deref(), Some("re_123"));
        assert!(order.updated_at >= order.created_at);
    }

    #[test]
    fn test_ownership() {
        let order = Order::from_new(new_order());
        assert!(order.is_owned_by("user_1"));
        assert!(!order.is_owned_by("user_2"));
    }

    #[test]
    fn test_order_serializes_flat_shipping() {
        let mut new = new_order();
        new.shipping.shipping_city = Some("Toronto".to_string());
        let json = serde_json::to_value(Order::from_new(new)).unwrap();

        assert_eq!(json["shipping_city"], "Toronto");
        assert_eq!(json["status"], "processing");
    }
}
