use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::product::Product;
use crate::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderLineItem {
    pub product_id: String,
    pub quantity: u32,
    pub price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: String,
    pub items: Vec<OrderLineItem>,
    pub total: f64,
    pub products: Vec<Product>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Build a new order with a fresh id and the total computed from catalog
    /// prices (coupon validity never changes the total).
    pub fn new(items: Vec<OrderLineItem>, products: Vec<Product>) -> Self {
        let total = items
            .iter()
            .zip(products.iter())
            .map(|(item, product)| product.price * f64::from(item.quantity))
            .sum();

        Self {
            id: Uuid::new_v4().to_string(),
            items,
            total,
            products,
            created_at: Utc::now(),
        }
    }
}

/// In-memory order store.
#[derive(Default)]
pub struct OrderStore {
    orders: RwLock<HashMap<String, Order>>,
}

impl OrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self, order: Order) -> Result<(), AppError> {
        let mut orders = self.orders.write().await;
        if orders.contains_key(&order.id) {
            return Err(AppError::Validation(format!(
                "order with id {} already exists",
                order.id
            )));
        }
        orders.insert(order.id.clone(), order);
        Ok(())
    }

    pub async fn get_by_id(&self, id: &str) -> Option<Order> {
        self.orders.read().await.get(id).cloned()
    }

    pub async fn get_all(&self) -> Vec<Order> {
        self.orders.read().await.values().cloned().collect()
    }
}
