// src/handlers/orders.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    models::order::{CreateOrderRequest, UpdateOrderStatusRequest},
};

// ---
// Handler: create_order (POST /api/orders)
// ---
// El origen y la tasa ya fueron verificados por los middleware; acá se
// valida el esquema y se delega el resto al servicio.
pub async fn create_order(
    State(app_state): State<AppState>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let created = app_state.order_service.create_order(payload).await?;

    Ok((StatusCode::CREATED, Json(created)))
}

// ---
// Handler: track_order (GET /api/orders/{order_number})
// ---
pub async fn track_order(
    State(app_state): State<AppState>,
    Path(order_number): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let tracked = app_state.order_service.track_order(&order_number).await?;
    Ok(Json(tracked))
}

// ---
// Handlers de back office (detrás del admin_guard)
// ---

pub async fn list_orders(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let orders = app_state.order_repo.list_recent().await?;
    Ok(Json(orders))
}

pub async fn update_order(
    State(app_state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.status.is_none() && payload.payment_status.is_none() {
        return Err(AppError::InvalidInput(
            "Hay que indicar status o paymentStatus.".to_string(),
        ));
    }

    let order = app_state
        .order_repo
        .update_status(id, payload.status, payload.payment_status)
        .await?;

    Ok(Json(order))
}
