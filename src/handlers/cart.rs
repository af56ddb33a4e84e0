// src/handlers/cart.rs

use axum::{Json, extract::State, response::IntoResponse};
use validator::Validate;

use crate::{
    common::error::AppError, config::AppState, services::cart_service::CartValidateRequest,
};

// ---
// Handler: validate_cart (POST /api/cart/validate)
// ---
// Chequeo previo del carrito contra el catálogo vigente. Nunca muta
// estado; el cliente decide qué hacer con las divergencias.
pub async fn validate_cart(
    State(app_state): State<AppState>,
    Json(payload): Json<CartValidateRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let result = app_state.cart_service.validate_cart(&payload.items).await?;

    Ok(Json(result))
}
