use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::{api_state::ApiState, error::ApiError};

/// `GET /products`: the full catalog.
pub async fn get_products(State(state): State<ApiState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.catalog.get_all()))
}

/// `GET /products/{id}`
pub async fn get_product_by_id(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state
        .catalog
        .get_by_id(&id)
        .ok_or_else(|| ApiError::NotFound("product not found".to_string()))?;

    Ok((StatusCode::OK, Json(product)))
}
