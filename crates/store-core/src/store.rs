//! # Persistence Seam
//!
//! The data-access contract consumed by the handlers. Validation,
//! uniqueness and state-transition rules belong to the implementation.

use crate::error::{StoreError, StoreResult};
use crate::order::{NewOrder, Order, OrderUpdate};
use crate::user::User;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Generic async data-access object
#[async_trait]
pub trait Crud: Send + Sync {
    async fn get_order(&self, order_id: &str) -> StoreResult<Option<Order>>;

    async fn create_order(&self, order: NewOrder) -> StoreResult<Order>;

    /// Fails with `OrderNotFound` if no order has this ID
    async fn update_order(&self, order_id: &str, update: OrderUpdate) -> StoreResult<Order>;

    async fn get_user(&self, user_id: &str) -> StoreResult<Option<User>>;
}

/// Type alias for a shared data-access object
pub type BoxedCrud = Arc<dyn Crud>;

/// In-process `Crud` backed by hash maps
#[derive(Debug, Default)]
pub struct InMemoryStore {
    orders: RwLock<HashMap<String, Order>>,
    users: RwLock<HashMap<String, User>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_user(&self, user: User) {
        self.users.write().await.insert(user.id.clone(), user);
    }

    /// Store an order as-is, keeping its ID
    pub async fn insert_order(&self, order: Order) {
        self.orders.write().await.insert(order.id.clone(), order);
    }

    /// Snapshot of every stored order
    pub async fn orders(&self) -> Vec<Order> {
        self.orders.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl Crud for InMemoryStore {
    async fn get_order(&self, order_id: &str) -> StoreResult<Option<Order>> {
        Ok(self.orders.read().await.get(order_id).cloned())
    }

    async fn create_order(&self, order: NewOrder) -> StoreResult<Order> {
        let order = Order::from_new(order);
        let mut orders = self.orders.write().await;
        if orders.contains_key(&order.id) {
            return Err(StoreError::Storage(format!(
                "Duplicate order id: {}",
                order.id
            )));
        }
        orders.insert(order.id.clone(), order.clone());
        Ok(order)
    }

    async fn update_order(&self, order_id: &str, update: OrderUpdate) -> StoreResult<Order> {
        let mut orders = self.orders.write().await;
        let order = orders
            .get_mut(order_id)
            .ok_or_else(|| StoreError::OrderNotFound {
                order_id: order_id.to_string(),
            })?;
        order.apply(update);
        Ok(order.clone())
    }

    async fn get_user(&self, user_id: &str) -> StoreResult<Option<User>> {
        Ok(self.users.read().await.get(user_id).cloned())
    }
}
