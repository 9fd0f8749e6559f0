use std::sync::Arc;

use common::domain::{order::OrderStore, product::ProductCatalog};
use promo_engine::PromoEngine;

#[derive(Clone)]
pub struct ApiState {
    pub engine: Arc<PromoEngine>,
    pub catalog: Arc<ProductCatalog>,
    pub orders: Arc<OrderStore>,
}

impl ApiState {
    pub fn new(engine: Arc<PromoEngine>) -> Self {
        Self {
            engine,
            catalog: Arc::new(ProductCatalog::seeded()),
            orders: Arc::new(OrderStore::new()),
        }
    }
}
