use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

use crate::{api_state::ApiState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct ValidatePromoCodeRequest {
    pub promote_code: String,
}

#[derive(Debug, Serialize)]
pub struct ValidatePromoCodeResponse {
    pub promo_code: String,
    pub valid: bool,
    pub message: String,
}

/// `POST /promo_code/validate`: 200 for every well-formed request, with the
/// verdict in the body. Malformed JSON is rejected with 400 by the extractor.
pub async fn validate_promo_code(
    State(state): State<ApiState>,
    Json(request): Json<ValidatePromoCodeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let verdict = state.engine.validate(&request.promote_code).await?;

    Ok((
        StatusCode::OK,
        Json(ValidatePromoCodeResponse {
            promo_code: request.promote_code,
            valid: verdict.valid,
            message: verdict.message,
        }),
    ))
}
