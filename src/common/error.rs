// src/common/error.rs

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

// Nuestro tipo de error, con `thiserror` para mejor ergonomía.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Error de validación")]
    ValidationError(#[from] validator::ValidationErrors),

    // Errores referenciales detectados antes de la transacción
    // (ids de producto/ingrediente que no existen, franja inválida, etc).
    #[error("Dato inválido: {0}")]
    InvalidInput(String),

    #[error("Pedido no encontrado")]
    OrderNotFound,

    #[error("Producto no encontrado")]
    ProductNotFound,

    #[error("Categoría no encontrada")]
    CategoryNotFound,

    #[error("Ingrediente no encontrado")]
    IngredientNotFound,

    #[error("Fecha bloqueada no encontrada")]
    BlockedDateNotFound,

    #[error("El slug '{0}' ya está en uso")]
    SlugAlreadyExists(String),

    #[error("La categoría tiene ingredientes o reglas asociadas")]
    CategoryInUse,

    // Colisión del número de pedido contra la restricción UNIQUE.
    // Probabilísticamente casi imposible, pero la base manda.
    #[error("Número de pedido duplicado")]
    OrderNumberConflict,

    #[error("Credenciales de administrador inválidas")]
    AdminForbidden,

    #[error("Origen de la solicitud no permitido")]
    OriginNotAllowed,

    #[error("Demasiadas solicitudes")]
    RateLimited { retry_after_secs: u64 },

    #[error("Error de base de datos")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para cualquier otro error inesperado.
    #[error("Error interno del servidor")]
    InternalServerError(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            // Devuelve todos los detalles de la validación, campo por campo.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "Uno o más campos son inválidos.",
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }

            // 429 con indicación de reintento.
            AppError::RateLimited { retry_after_secs } => {
                let body = Json(json!({
                    "error": "Demasiadas solicitudes. Intentá de nuevo en unos minutos.",
                    "retryAfterSecs": retry_after_secs,
                }));
                let mut response = (StatusCode::TOO_MANY_REQUESTS, body).into_response();
                response.headers_mut().insert(
                    RETRY_AFTER,
                    HeaderValue::from_str(&retry_after_secs.to_string())
                        .unwrap_or(HeaderValue::from_static("60")),
                );
                return response;
            }

            AppError::InvalidInput(msg) => {
                let body = Json(json!({ "error": msg }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }

            AppError::OrderNotFound => (StatusCode::NOT_FOUND, "Pedido no encontrado."),
            AppError::ProductNotFound => (StatusCode::NOT_FOUND, "Producto no encontrado."),
            AppError::CategoryNotFound => (StatusCode::NOT_FOUND, "Categoría no encontrada."),
            AppError::IngredientNotFound => (StatusCode::NOT_FOUND, "Ingrediente no encontrado."),
            AppError::BlockedDateNotFound => {
                (StatusCode::NOT_FOUND, "Fecha bloqueada no encontrada.")
            }

            AppError::SlugAlreadyExists(_) => (StatusCode::CONFLICT, "Ese slug ya está en uso."),
            AppError::CategoryInUse => (
                StatusCode::CONFLICT,
                "La categoría tiene ingredientes o reglas asociadas y no se puede eliminar.",
            ),
            AppError::OrderNumberConflict => (
                StatusCode::CONFLICT,
                "El número de pedido ya existe. Intentá de nuevo.",
            ),

            // La denegación administrativa es un 403, igual que el origen:
            // la solicitud se entendió y se rechaza de plano.
            AppError::AdminForbidden => (
                StatusCode::FORBIDDEN,
                "Credenciales de administrador inválidas.",
            ),
            AppError::OriginNotAllowed => (
                StatusCode::FORBIDDEN,
                "Origen de la solicitud no permitido.",
            ),

            // Todo lo demás (DatabaseError, InternalServerError) termina en 500.
            // El detalle queda en el log; al cliente nunca le llega texto interno.
            ref e => {
                tracing::error!("Error interno del servidor: {e:?}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Ocurrió un error inesperado.")
            }
        };

        // Respuesta estándar para errores simples de un solo mensaje.
        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_deny_maps_to_forbidden() {
        let response = AppError::AdminForbidden.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn rate_limited_maps_to_429_with_retry_after() {
        let response = AppError::RateLimited {
            retry_after_secs: 60,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get(RETRY_AFTER).unwrap(), "60");
    }

    #[test]
    fn unknown_order_maps_to_not_found() {
        let response = AppError::OrderNotFound.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
