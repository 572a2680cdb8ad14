use axum::{extract::State, response::Json};
use serde::Serialize;

use crate::{errors::ServiceError, services::checkout::CheckoutRequest, AppState};

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    #[serde(rename = "redirectUrl")]
    pub redirect_url: String,
}

// POST /create_preference
pub async fn create_preference(
    State(state): State<AppState>,
    Json(payload): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>, ServiceError> {
    let outcome = state.services.checkout.create_checkout(payload).await?;
    Ok(Json(CheckoutResponse {
        redirect_url: outcome.redirect_url,
    }))
}
