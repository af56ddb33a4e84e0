// src/handlers/calendar.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::NaiveDate;
use serde::Deserialize;
use validator::Validate;

use crate::{common::error::AppError, config::AppState};

// ---
// Lecturas públicas (checkout)
// ---

pub async fn list_delivery_slots(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let slots = app_state.calendar_repo.list_active_slots().await?;
    Ok(Json(slots))
}

pub async fn list_blocked_dates(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let dates = app_state.calendar_repo.list_blocked_dates().await?;
    Ok(Json(dates))
}

// ---
// Administración del calendario
// ---

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBlockedDatePayload {
    pub date: NaiveDate,

    #[validate(length(max = 200, message = "El motivo supera los 200 caracteres."))]
    pub reason: Option<String>,
}

pub async fn create_blocked_date(
    State(app_state): State<AppState>,
    Json(payload): Json<CreateBlockedDatePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let blocked = app_state
        .calendar_repo
        .create_blocked_date(payload.date, payload.reason.as_deref())
        .await?;

    Ok((StatusCode::CREATED, Json(blocked)))
}

pub async fn delete_blocked_date(
    State(app_state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    app_state.calendar_repo.delete_blocked_date(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
