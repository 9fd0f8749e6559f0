use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use common::domain::order::{Order, OrderLineItem};
use serde::Deserialize;
use tracing::info;

use crate::{api_state::ApiState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub coupon_code: Option<String>,
    pub items: Vec<OrderLineItem>,
}

/// `POST /orders`: validate the line items against the catalog, apply the
/// coupon as a boolean check (an invalid coupon never fails the order, it is
/// just ignored) and persist the order.
pub async fn create_order(
    State(state): State<ApiState>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    for item in &request.items {
        if item.product_id.is_empty() || item.quantity == 0 {
            return Err(ApiError::ValidationError(
                "All order items must have a product ID and a positive quantity.".to_string(),
            ));
        }
    }

    let mut products = Vec::with_capacity(request.items.len());
    for item in &request.items {
        let product = state
            .catalog
            .get_by_id(&item.product_id)
            .ok_or_else(|| ApiError::NotFound("product not found".to_string()))?;
        products.push(product);
    }

    let order = Order::new(request.items, products);

    if let Some(coupon) = request.coupon_code.as_deref().filter(|code| !code.is_empty()) {
        let verdict = state.engine.validate(coupon).await?;
        if verdict.valid {
            info!(order_id = %order.id, coupon, "Promo code applied to order");
        } else {
            info!(
                order_id = %order.id,
                coupon, "Invalid promo code ignored, proceeding without discount"
            );
        }
    }

    state.orders.create(order.clone()).await?;
    info!(order_id = %order.id, "Created new order");

    Ok((StatusCode::CREATED, Json(order)))
}

/// `GET /orders/{id}`
pub async fn get_order_by_id(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state
        .orders
        .get_by_id(&id)
        .await
        .ok_or_else(|| ApiError::NotFound("order not found".to_string()))?;

    Ok((StatusCode::OK, Json(order)))
}

/// `GET /orders`: all orders, for admin/debug use.
pub async fn get_all_orders(State(state): State<ApiState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.orders.get_all().await))
}
