//! # Checkout Settings
//!
//! Fixed options applied to every hosted checkout session: payment
//! methods, quantity bounds, shipping rates and allowed countries.
//! Defaults can be overridden from `config/checkout.toml`.

use crate::error::{StoreError, StoreResult};
use crate::user::User;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Placeholder the processor substitutes with the session ID
pub const CHECKOUT_SESSION_ID_PLACEHOLDER: &str = "{CHECKOUT_SESSION_ID}";

/// A fixed-amount shipping option
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingRate {
    pub display_name: String,
    /// Amount in smallest currency unit
    pub amount: i64,
    pub currency: String,
    /// Delivery estimate, in business days
    pub min_business_days: u32,
    pub max_business_days: u32,
}

impl ShippingRate {
    pub fn new(
        display_name: impl Into<String>,
        amount: i64,
        min_business_days: u32,
        max_business_days: u32,
    ) -> Self {
        Self {
            display_name: display_name.into(),
            amount,
            currency: "usd".to_string(),
            min_business_days,
            max_business_days,
        }
    }
}

/// Options shared by all checkout sessions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckoutSettings {
    pub payment_method_types: Vec<String>,
    pub currency: String,
    pub min_quantity: u32,
    pub max_quantity: u32,
    pub automatic_tax: bool,
    pub allowed_countries: Vec<String>,
    pub shipping_rates: Vec<ShippingRate>,
}

impl Default for CheckoutSettings {
    fn default() -> Self {
        Self {
            payment_method_types: vec!["card".to_string(), "affirm".to_string()],
            currency: "usd".to_string(),
            min_quantity: 1,
            max_quantity: 10,
            automatic_tax: true,
            allowed_countries: vec!["US".to_string(), "CA".to_string()],
            shipping_rates: vec![
                ShippingRate::new("Free shipping", 0, 5, 7),
                ShippingRate::new("Ground - Express", 2500, 2, 5),
            ],
        }
    }
}

impl CheckoutSettings {
    /// Parse settings from a TOML file
    pub fn load(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            StoreError::Configuration(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content).map_err(|e| {
            StoreError::Configuration(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load the first `config/checkout.toml` found, or fall back to defaults
    pub fn load_or_default() -> StoreResult<Self> {
        let config_paths = [
            "config/checkout.toml",
            "../config/checkout.toml",
            "../../config/checkout.toml",
        ];

        for path in config_paths {
            if Path::new(path).exists() {
                let settings = Self::load(path)?;
                tracing::info!(
                    "Loaded checkout settings from {} ({} shipping rates)",
                    path,
                    settings.shipping_rates.len()
                );
                return Ok(settings);
            }
        }

        tracing::info!("No checkout settings file found, using defaults");
        Ok(Self::default())
    }

    /// Build session parameters for a single-product checkout by `user`.
    ///
    /// `cancel_path` is appended to `homepage` as given.
    pub fn session_params(
        &self,
        homepage: &str,
        price_id: &str,
        product_id: &str,
        cancel_path: &str,
        user: &User,
    ) -> CheckoutSessionParams {
        let homepage = homepage.trim_end_matches('/');

        let mut metadata = HashMap::new();
        metadata.insert("product_id".to_string(), product_id.to_string());
        metadata.insert("user_email".to_string(), user.email.clone());

        CheckoutSessionParams {
            mode: "payment".to_string(),
            payment_method_types: self.payment_method_types.clone(),
            price_id: price_id.to_string(),
            quantity: 1,
            adjustable_quantity: Some((self.min_quantity, self.max_quantity)),
            automatic_tax: self.automatic_tax,
            success_url: format!(
                "{}/success?session_id={}",
                homepage, CHECKOUT_SESSION_ID_PLACEHOLDER
            ),
            cancel_url: format!("{}{}", homepage, cancel_path),
            client_reference_id: Some(user.id.clone()),
            metadata,
            allowed_countries: self.allowed_countries.clone(),
            currency: self.currency.clone(),
            shipping_rates: self.shipping_rates.clone(),
        }
    }
}

/// Everything needed to create a hosted checkout session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSessionParams {
    pub mode: String,
    pub payment_method_types: Vec<String>,
    pub price_id: String,
    pub quantity: u32,
    /// Inclusive (minimum, maximum) the customer may pick
    pub adjustable_quantity: Option<(u32, u32)>,
    pub automatic_tax: bool,
    pub success_url: String,
    pub cancel_url: String,
    pub client_reference_id: Option<String>,
    pub metadata: HashMap<String, String>,
    pub allowed_countries: Vec<String>,
    pub currency: String,
    pub shipping_rates: Vec<ShippingRate>,
}
