//! # Stripe REST Client
//!
//! `PaymentProcessor` implementation over the Stripe REST API.
//! Requests are form-encoded; responses are JSON.

use crate::config::StripeConfig;
use crate::webhook;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use store_core::{
    CheckoutLineItem, CheckoutSession, CheckoutSessionParams, PaymentIntent,
    PaymentIntentParams, PaymentProcessor, Price, Product, Refund, RefundParams, StoreError,
    StoreResult, WebhookEvent,
};
use tracing::{debug, error, info, instrument};

type FormParams = Vec<(String, String)>;

/// Stripe payment processor
pub struct StripeClient {
    config: StripeConfig,
    client: Client,
}

impl StripeClient {
    /// Create a new Stripe client
    pub fn new(config: StripeConfig) -> StoreResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| {
                StoreError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { config, client })
    }

    /// Create from environment variables
    pub fn from_env() -> StoreResult<Self> {
        Self::new(StripeConfig::from_env()?)
    }

    pub fn config(&self) -> &StripeConfig {
        &self.config
    }

    /// API URL for `segments`, each percent-encoded as a single path segment
    fn url(&self, segments: &[&str]) -> StoreResult<Url> {
        if segments
            .iter()
            .any(|s| s.is_empty() || *s == "." || *s == "..")
        {
            return Err(StoreError::InvalidRequest(format!(
                "Invalid resource id in path: {:?}",
                segments
            )));
        }

        let mut url = Url::parse(&self.config.api_base_url).map_err(|e| {
            StoreError::Configuration(format!("Invalid Stripe API base URL: {}", e))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                StoreError::Configuration("Stripe API base URL cannot be a base".to_string())
            })?
            .pop_if_empty()
            .push("v1")
            .extend(segments);
        Ok(url)
    }

    async fn post_form<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        form: &FormParams,
    ) -> StoreResult<T> {
        let response = self
            .client
            .post(self.url(segments)?)
            .header("Authorization", self.config.auth_header())
            .header("Stripe-Version", &self.config.api_version)
            .form(form)
            .send()
            .await
            .map_err(|e| StoreError::NetworkError(e.to_string()))?;

        Self::parse_response(response).await
    }

    async fn get<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> StoreResult<T> {
        let response = self
            .client
            .get(self.url(segments)?)
            .header("Authorization", self.config.auth_header())
            .header("Stripe-Version", &self.config.api_version)
            .query(query)
            .send()
            .await
            .map_err(|e| StoreError::NetworkError(e.to_string()))?;

        Self::parse_response(response).await
    }

    async fn parse_response<T: DeserializeOwned>(response: Response) -> StoreResult<T> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StoreError::NetworkError(e.to_string()))?;

        if !status.is_success() {
            error!("Stripe API error: status={}, body={}", status, body);

            if let Ok(error_response) = serde_json::from_str::<StripeErrorResponse>(&body) {
                return Err(StoreError::stripe(error_response.error.message));
            }

            return Err(StoreError::stripe(format!("HTTP {}: {}", status, body)));
        }

        serde_json::from_str(&body).map_err(|e| {
            StoreError::Serialization(format!("Failed to parse Stripe response: {}", e))
        })
    }
}

#[async_trait]
impl PaymentProcessor for StripeClient {
    #[instrument(skip(self, params), fields(amount = params.amount))]
    async fn create_payment_intent(
        &self,
        params: &PaymentIntentParams,
    ) -> StoreResult<PaymentIntent> {
        let intent: PaymentIntent = self
            .post_form(&["payment_intents"], &payment_intent_form(params))
            .await?;
        info!("Created payment intent: {}", intent.id);
        Ok(intent)
    }

    #[instrument(skip(self, params), fields(payment_intent = %params.payment_intent))]
    async fn create_refund(&self, params: &RefundParams) -> StoreResult<Refund> {
        let refund: Refund = self.post_form(&["refunds"], &refund_form(params)).await?;
        info!("Refund created: {} (status={:?})", refund.id, refund.status);
        Ok(refund)
    }

    #[instrument(skip(self))]
    async fn list_active_prices(&self, product_id: &str, limit: u32) -> StoreResult<Vec<Price>> {
        let list: StripeList<Price> = self
            .get(
                &["prices"],
                &[
                    ("product", product_id.to_string()),
                    ("active", "true".to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;
        debug!("Found {} active prices for {}", list.data.len(), product_id);
        Ok(list.data)
    }

    #[instrument(skip(self, params), fields(price = %params.price_id))]
    async fn create_checkout_session(
        &self,
        params: &CheckoutSessionParams,
    ) -> StoreResult<CheckoutSession> {
        let form = checkout_session_form(params);
        debug!("Creating Stripe checkout session: {} params", form.len());

        let session: CheckoutSession = self.post_form(&["checkout", "sessions"], &form).await?;
        info!("Checkout session created: {}", session.id);
        Ok(session)
    }

    #[instrument(skip(self))]
    async fn list_line_items(&self, session_id: &str) -> StoreResult<Vec<CheckoutLineItem>> {
        let list: StripeList<CheckoutLineItem> = self
            .get(&["checkout", "sessions", session_id, "line_items"], &[])
            .await?;
        Ok(list.data)
    }

    #[instrument(skip(self))]
    async fn retrieve_product(&self, product_id: &str) -> StoreResult<Product> {
        self.get(&["products", product_id], &[]).await
    }

    #[instrument(skip(self, payload, signature))]
    async fn verify_webhook(&self, payload: &[u8], signature: &str) -> StoreResult<WebhookEvent> {
        webhook::construct_event(
            payload,
            signature,
            &self.config.webhook_secret,
            self.config.webhook_tolerance_secs,
            Utc::now(),
        )
    }

    fn provider_name(&self) -> &'static str {
        "stripe"
    }
}

// =============================================================================
// Form Encoding
// =============================================================================

fn payment_intent_form(params: &PaymentIntentParams) -> FormParams {
    vec![
        ("amount".to_string(), params.amount.to_string()),
        ("currency".to_string(), params.currency.clone()),
        (
            "automatic_payment_methods[enabled]".to_string(),
            params.automatic_payment_methods.to_string(),
        ),
    ]
}

fn refund_form(params: &RefundParams) -> FormParams {
    let mut form = vec![
        ("payment_intent".to_string(), params.payment_intent.clone()),
        ("amount".to_string(), params.amount.to_string()),
        ("reason".to_string(), params.reason.as_str().to_string()),
    ];
    for (key, value) in &params.metadata {
        form.push((format!("metadata[{}]", key), value.clone()));
    }
    form
}

fn checkout_session_form(params: &CheckoutSessionParams) -> FormParams {
    let mut form: FormParams = vec![
        ("mode".to_string(), params.mode.clone()),
        ("success_url".to_string(), params.success_url.clone()),
        ("cancel_url".to_string(), params.cancel_url.clone()),
        ("currency".to_string(), params.currency.clone()),
        (
            "automatic_tax[enabled]".to_string(),
            params.automatic_tax.to_string(),
        ),
        ("line_items[0][price]".to_string(), params.price_id.clone()),
        ("line_items[0][quantity]".to_string(), params.quantity.to_string()),
    ];

    for (i, method) in params.payment_method_types.iter().enumerate() {
        form.push((format!("payment_method_types[{}]", i), method.clone()));
    }

    if let Some((minimum, maximum)) = params.adjustable_quantity {
        form.push((
            "line_items[0][adjustable_quantity][enabled]".to_string(),
            "true".to_string(),
        ));
        form.push((
            "line_items[0][adjustable_quantity][minimum]".to_string(),
            minimum.to_string(),
        ));
        form.push((
            "line_items[0][adjustable_quantity][maximum]".to_string(),
            maximum.to_string(),
        ));
    }

    if let Some(ref reference) = params.client_reference_id {
        form.push(("client_reference_id".to_string(), reference.clone()));
    }

    for (key, value) in &params.metadata {
        form.push((format!("metadata[{}]", key), value.clone()));
    }

    for (i, country) in params.allowed_countries.iter().enumerate() {
        form.push((
            format!("shipping_address_collection[allowed_countries][{}]", i),
            country.clone(),
        ));
    }

    for (i, rate) in params.shipping_rates.iter().enumerate() {
        let prefix = format!("shipping_options[{}][shipping_rate_data]", i);
        form.push((format!("{}[type]", prefix), "fixed_amount".to_string()));
        form.push((
            format!("{}[fixed_amount][amount]", prefix),
            rate.amount.to_string(),
        ));
        form.push((
            format!("{}[fixed_amount][currency]", prefix),
            rate.currency.clone(),
        ));
        form.push((format!("{}[display_name]", prefix), rate.display_name.clone()));
        for (bound, days) in [
            ("minimum", rate.min_business_days),
            ("maximum", rate.max_business_days),
        ] {
            form.push((
                format!("{}[delivery_estimate][{}][unit]", prefix, bound),
                "business_day".to_string(),
            ));
            form.push((
                format!("{}[delivery_estimate][{}][value]", prefix, bound),
                days.to_string(),
            ));
        }
    }

    form
}

// =============================================================================
// Stripe API Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct StripeList<T> {
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeError,
}

#[derive(Debug, Deserialize)]
struct StripeError {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use store_core::{CheckoutSettings, RefundReason, User};
    use wiremock::matchers::{body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn form_value<'a>(form: &'a FormParams, key: &str) -> Option<&'a str> {
        form.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    async fn client_for(server: &MockServer) -> StripeClient {
        let config =
            StripeConfig::new("sk_test_abc123", "whsec_secret").with_api_base_url(server.uri());
        StripeClient::new(config).unwrap()
    }

    fn refund_params() -> RefundParams {
        let mut metadata = HashMap::new();
        metadata.insert("customer_reason".to_string(), "Arrived damaged".to_string());
        RefundParams {
            payment_intent: "pi_123".to_string(),
            amount: 1500,
            reason: RefundReason::RequestedByCustomer,
            metadata,
        }
    }

    #[test]
    fn test_checkout_session_form() {
        let user = User::new("user_1", "ada@example.com");
        let params = CheckoutSettings::default().session_params(
            "https://shop.example.com",
            "price_1",
            "prod_1",
            "/cancel",
            &user,
        );
        let form = checkout_session_form(&params);

        assert_eq!(form_value(&form, "mode"), Some("payment"));
        assert_eq!(form_value(&form, "payment_method_types[1]"), Some("affirm"));
        assert_eq!(form_value(&form, "line_items[0][price]"), Some("price_1"));
        assert_eq!(
            form_value(&form, "line_items[0][adjustable_quantity][maximum]"),
            Some("10")
        );
        assert_eq!(form_value(&form, "automatic_tax[enabled]"), Some("true"));
        assert_eq!(form_value(&form, "client_reference_id"), Some("user_1"));
        assert_eq!(form_value(&form, "metadata[product_id]"), Some("prod_1"));
        assert_eq!(
            form_value(&form, "shipping_address_collection[allowed_countries][1]"),
            Some("CA")
        );
        assert_eq!(
            form_value(
                &form,
                "shipping_options[1][shipping_rate_data][fixed_amount][amount]"
            ),
            Some("2500")
        );
        assert_eq!(
            form_value(
                &form,
                "shipping_options[0][shipping_rate_data][delivery_estimate][maximum][value]"
            ),
            Some("7")
        );
    }

    #[test]
    fn test_refund_form() {
        let form = refund_form(&refund_params());
        assert_eq!(form_value(&form, "reason"), Some("requested_by_customer"));
        assert_eq!(
            form_value(&form, "metadata[customer_reason]"),
            Some("Arrived damaged")
        );
    }

    #[tokio::test]
    async fn test_create_refund() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/refunds"))
            .and(header("Authorization", "Bearer sk_test_abc123"))
            .and(body_string_contains("payment_intent=pi_123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "re_123",
                "object": "refund",
                "amount": 1500,
                "payment_intent": "pi_123",
                "status": "succeeded"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let refund = client.create_refund(&refund_params()).await.unwrap();

        assert_eq!(refund.id, "re_123");
        assert_eq!(refund.status.as_deref(), Some("succeeded"));
    }

    #[tokio::test]
    async fn test_list_active_prices() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/prices"))
            .and(query_param("product", "prod_1"))
            .and(query_param("active", "true"))
            .and(query_param("limit", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "object": "list",
                "data": [{ "id": "price_1", "product": "prod_1", "active": true,
                           "unit_amount": 2999, "currency": "usd" }],
                "has_more": false
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let prices = client.list_active_prices("prod_1", 1).await.unwrap();

        assert_eq!(prices.len(), 1);
        assert_eq!(prices[0].unit_amount, Some(2999));
    }

    #[tokio::test]
    async fn test_retrieve_product() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/products/prod_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "prod_1",
                "object": "product",
                "name": "Robot Kit",
                "description": null,
                "images": ["https://img.example.com/kit.png"],
                "metadata": { "sku": "KIT-1" }
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let product = client.retrieve_product("prod_1").await.unwrap();

        assert_eq!(product.name, "Robot Kit");
        assert_eq!(product.description, None);
        assert_eq!(product.metadata["sku"], "KIT-1");
    }

    #[tokio::test]
    async fn test_resource_ids_stay_in_their_path_segment() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/customers/cus_secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "cus_secret",
                "name": "Someone Else"
            })))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        assert!(client
            .retrieve_product("../customers/cus_secret")
            .await
            .is_err());
        assert!(client
            .list_line_items("../../customers/cus_secret")
            .await
            .is_err());

        let err = client.retrieve_product("..").await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidRequest(_)));

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(
            requests[0].url.path(),
            "/v1/products/..%2Fcustomers%2Fcus_secret"
        );
        assert!(requests[1].url.path().starts_with("/v1/checkout/sessions/"));
    }

    #[test]
    fn test_url_keeps_base_path() {
        let config = StripeConfig::new("sk_test_abc123", "whsec_secret")
            .with_api_base_url("http://localhost:12111/");
        let client = StripeClient::new(config).unwrap();

        let url = client.url(&["checkout", "sessions", "cs 1"]).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:12111/v1/checkout/sessions/cs%201"
        );
    }

    #[tokio::test]
    async fn test_list_line_items() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/checkout/sessions/cs_1/line_items"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "object": "list",
                "data": [{ "id": "li_1", "quantity": 4, "amount_total": 11996 }]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let items = client.list_line_items("cs_1").await.unwrap();

        assert_eq!(items[0].quantity, Some(4));
    }

    #[tokio::test]
    async fn test_stripe_error_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/payment_intents"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {
                    "type": "invalid_request_error",
                    "message": "Amount must be at least $0.50 usd",
                    "param": "amount"
                }
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client
            .create_payment_intent(&PaymentIntentParams {
                amount: 10,
                currency: "usd".to_string(),
                automatic_payment_methods: true,
            })
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Provider error [stripe]: Amount must be at least $0.50 usd"
        );
    }

    #[tokio::test]
    async fn test_non_json_error_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/products/prod_x"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client.retrieve_product("prod_x").await.unwrap_err();

        assert!(matches!(err, StoreError::ProviderError { .. }));
        assert!(err.to_string().contains("bad gateway"));
    }
}
