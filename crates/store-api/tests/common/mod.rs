#![allow(dead_code)]

use async_trait::async_trait;
use axum::http::{header::AUTHORIZATION, HeaderName, HeaderValue};
use axum_test::{TestRequest, TestServer};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use store_api::{create_router, AppConfig, AppState};
use store_core::{
    BoxedCrud, CheckoutLineItem, CheckoutSession, CheckoutSessionParams, CheckoutSettings, Crud,
    InMemoryStore, NewOrder, Order, OrderStatus, OrderUpdate, PaymentIntent, PaymentIntentParams,
    PaymentProcessor, Price, Product, Refund, RefundParams, ShippingDetails,
    StaticSessionProvider, StoreError, StoreResult, User, WebhookEvent, READ_PERMISSION,
};

pub const WEBHOOK_SECRET: &str = "whsec_test_secret";
pub const HOMEPAGE: &str = "https://shop.example.com";

pub const ALICE_TOKEN: &str = "tok_alice";
pub const BOB_TOKEN: &str = "tok_bob";
pub const NO_PERMISSION_TOKEN: &str = "tok_carol";

pub fn alice() -> User {
    User::new("user_alice", "alice@example.com").with_permission(READ_PERMISSION)
}

pub fn bob() -> User {
    User::new("user_bob", "bob@example.com").with_permission(READ_PERMISSION)
}

/// Canned processor responses, with every request recorded
#[derive(Default)]
pub struct MockProcessor {
    pub prices: Mutex<Vec<Price>>,
    pub refund_status: Mutex<Option<String>>,
    pub fail_refunds: Mutex<bool>,
    pub fail_checkout: Mutex<bool>,
    pub line_item_quantity: Mutex<Option<u32>>,
    pub products: Mutex<HashMap<String, Product>>,
    pub payment_intents: Mutex<Vec<PaymentIntentParams>>,
    pub refunds: Mutex<Vec<RefundParams>>,
    pub checkout_sessions: Mutex<Vec<CheckoutSessionParams>>,
}

impl MockProcessor {
    pub fn new() -> Self {
        Self {
            refund_status: Mutex::new(Some("succeeded".to_string())),
            ..Self::default()
        }
    }

    pub fn with_active_price(self, product_id: &str, price_id: &str) -> Self {
        self.prices.lock().unwrap().push(Price {
            id: price_id.to_string(),
            product: Some(product_id.to_string()),
            active: true,
            unit_amount: Some(2999),
            currency: "usd".to_string(),
        });
        self
    }

    pub fn with_product(self, product: Product) -> Self {
        self.products
            .lock()
            .unwrap()
            .insert(product.id.clone(), product);
        self
    }
}

#[async_trait]
impl PaymentProcessor for MockProcessor {
    async fn create_payment_intent(
        &self,
        params: &PaymentIntentParams,
    ) -> StoreResult<PaymentIntent> {
        self.payment_intents.lock().unwrap().push(params.clone());
        if params.amount < 50 {
            return Err(StoreError::stripe("Amount must be at least $0.50 usd"));
        }
        Ok(PaymentIntent {
            id: "pi_mock".to_string(),
            client_secret: Some("pi_mock_secret_123".to_string()),
            amount: params.amount,
            currency: params.currency.clone(),
            status: Some("requires_payment_method".to_string()),
        })
    }

    async fn create_refund(&self, params: &RefundParams) -> StoreResult<Refund> {
        self.refunds.lock().unwrap().push(params.clone());
        if *self.fail_refunds.lock().unwrap() {
            return Err(StoreError::stripe("Charge has already been refunded"));
        }
        Ok(Refund {
            id: "re_mock".to_string(),
            status: self.refund_status.lock().unwrap().clone(),
            amount: params.amount,
            payment_intent: Some(params.payment_intent.clone()),
        })
    }

    async fn list_active_prices(&self, product_id: &str, limit: u32) -> StoreResult<Vec<Price>> {
        Ok(self
            .prices
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.active && p.product.as_deref() == Some(product_id))
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn create_checkout_session(
        &self,
        params: &CheckoutSessionParams,
    ) -> StoreResult<CheckoutSession> {
        self.checkout_sessions.lock().unwrap().push(params.clone());
        if *self.fail_checkout.lock().unwrap() {
            return Err(StoreError::stripe("Invalid shipping rate currency"));
        }
        Ok(CheckoutSession {
            id: "cs_mock".to_string(),
            url: Some("https://checkout.stripe.com/c/pay/cs_mock".to_string()),
            expires_at: None,
        })
    }

    async fn list_line_items(&self, session_id: &str) -> StoreResult<Vec<CheckoutLineItem>> {
        Ok(match *self.line_item_quantity.lock().unwrap() {
            Some(quantity) => vec![CheckoutLineItem {
                id: format!("li_{}", session_id),
                quantity: Some(quantity),
                amount_total: 0,
            }],
            None => Vec::new(),
        })
    }

    async fn retrieve_product(&self, product_id: &str) -> StoreResult<Product> {
        self.products
            .lock()
            .unwrap()
            .get(product_id)
            .cloned()
            .ok_or_else(|| StoreError::stripe(format!("No such product: '{}'", product_id)))
    }

    async fn verify_webhook(&self, payload: &[u8], signature: &str) -> StoreResult<WebhookEvent> {
        store_stripe::construct_event(payload, signature, WEBHOOK_SECRET, 300, Utc::now())
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// Reads from the wrapped store; every write fails
pub struct ReadOnlyStore(pub Arc<InMemoryStore>);

#[async_trait]
impl Crud for ReadOnlyStore {
    async fn get_order(&self, order_id: &str) -> StoreResult<Option<Order>> {
        self.0.get_order(order_id).await
    }

    async fn create_order(&self, _order: NewOrder) -> StoreResult<Order> {
        Err(StoreError::Storage("database is read-only".to_string()))
    }

    async fn update_order(&self, _order_id: &str, _update: OrderUpdate) -> StoreResult<Order> {
        Err(StoreError::Storage("database is read-only".to_string()))
    }

    async fn get_user(&self, user_id: &str) -> StoreResult<Option<User>> {
        self.0.get_user(user_id).await
    }
}

pub struct TestApp {
    pub server: TestServer,
    pub store: Arc<InMemoryStore>,
    pub processor: Arc<MockProcessor>,
}

impl TestApp {
    pub async fn spawn(processor: MockProcessor) -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self::spawn_with_crud(processor, store.clone(), store).await
    }

    /// Orders can be seeded and read, but updates and inserts fail
    pub async fn spawn_read_only(processor: MockProcessor) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let crud = Arc::new(ReadOnlyStore(store.clone()));
        Self::spawn_with_crud(processor, store, crud).await
    }

    async fn spawn_with_crud(
        processor: MockProcessor,
        store: Arc<InMemoryStore>,
        crud: BoxedCrud,
    ) -> Self {
        store.insert_user(alice()).await;
        store.insert_user(bob()).await;

        let sessions = StaticSessionProvider::new()
            .with_session(ALICE_TOKEN, alice())
            .with_session(BOB_TOKEN, bob())
            .with_session(
                NO_PERMISSION_TOKEN,
                User::new("user_carol", "carol@example.com"),
            );

        let config = AppConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            homepage: HOMEPAGE.to_string(),
            auth_service_url: "http://localhost:0".to_string(),
            environment: "test".to_string(),
        };

        let processor = Arc::new(processor);
        let state = AppState::new(
            config,
            processor.clone(),
            crud,
            Arc::new(sessions),
            CheckoutSettings::default(),
        );

        let server = TestServer::new(create_router(state)).expect("Failed to start test server");

        Self {
            server,
            store,
            processor,
        }
    }

    /// Seed an order owned by `user_id`
    pub async fn seed_order(&self, user_id: &str) -> Order {
        let order = Order::from_new(NewOrder {
            user_id: Some(user_id.to_string()),
            user_email: None,
            stripe_checkout_session_id: Some("cs_seed".to_string()),
            stripe_payment_intent_id: Some("pi_seed".to_string()),
            amount: 2999,
            currency: "usd".to_string(),
            status: OrderStatus::Processing,
            product_id: Some("prod_kit".to_string()),
            quantity: 1,
            shipping: ShippingDetails::default(),
        });
        self.store.insert_order(order.clone()).await;
        order
    }
}

pub fn bearer(request: TestRequest, token: &str) -> TestRequest {
    request.add_header(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    )
}

pub fn signed(request: TestRequest, payload: &str) -> TestRequest {
    let header = store_stripe::generate_test_header(
        WEBHOOK_SECRET,
        Utc::now().timestamp(),
        payload.as_bytes(),
    );
    request
        .add_header(
            HeaderName::from_static("stripe-signature"),
            HeaderValue::from_str(&header).unwrap(),
        )
        .text(payload)
}
