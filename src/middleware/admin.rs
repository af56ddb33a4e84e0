// src/middleware/admin.rs

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::{common::error::AppError, config::AppState};

/// Guardián del back office: un chequeo permitir/denegar por solicitud.
/// La identidad real vive en un proveedor externo; acá solo se contrasta
/// la credencial compartida que ese proveedor entrega al panel.
pub async fn admin_guard(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let authorized = request
        .headers()
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .is_some_and(|token| !state.admin_api_key.is_empty() && token == state.admin_api_key);

    if !authorized {
        return Err(AppError::AdminForbidden);
    }

    Ok(next.run(request).await)
}
