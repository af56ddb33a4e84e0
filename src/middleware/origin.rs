// src/middleware/origin.rs

use axum::{
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::Response,
};

use crate::{common::error::AppError, config::AppState};

/// Valida el origen declarado en solicitudes que mutan estado. Sin
/// Origin ni Referer se asume mismo origen y se deja pasar; con un host
/// fuera de la lista permitida se rechaza de plano.
pub async fn origin_guard(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let is_mutating = matches!(
        *request.method(),
        Method::POST | Method::PATCH | Method::PUT | Method::DELETE
    );

    if is_mutating {
        let origin = header_value(&request, "origin");
        let referer = header_value(&request, "referer");

        if !origin_allowed(
            origin.as_deref(),
            referer.as_deref(),
            &state.allowed_origins,
        ) {
            return Err(AppError::OriginNotAllowed);
        }
    }

    Ok(next.run(request).await)
}

fn header_value(request: &Request, name: &str) -> Option<String> {
    request
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_owned())
}

fn origin_allowed(origin: Option<&str>, referer: Option<&str>, allowed: &[String]) -> bool {
    // Se valida el primer encabezado presente; la ausencia de ambos
    // equivale a mismo origen.
    let declared = origin.or(referer);
    match declared.and_then(host_of) {
        Some(host) => allowed.iter().any(|a| a == &host),
        None => declared.is_none(),
    }
}

/// Host de una URL sin cargar un parser completo: se descarta el esquema,
/// el puerto y la ruta.
fn host_of(url: &str) -> Option<String> {
    let rest = url.split_once("://").map(|(_, r)| r).unwrap_or(url);
    let host = rest
        .split(['/', '?', '#'])
        .next()?
        .split(':')
        .next()?
        .trim();
    if host.is_empty() {
        None
    } else {
        Some(host.to_ascii_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowed() -> Vec<String> {
        vec!["latabla.cr".to_string(), "www.latabla.cr".to_string()]
    }

    #[test]
    fn absent_headers_pass_as_same_origin() {
        assert!(origin_allowed(None, None, &allowed()));
    }

    #[test]
    fn known_origin_passes() {
        assert!(origin_allowed(
            Some("https://latabla.cr"),
            None,
            &allowed()
        ));
        assert!(origin_allowed(
            Some("https://www.latabla.cr/checkout"),
            None,
            &allowed()
        ));
    }

    #[test]
    fn unknown_origin_is_rejected() {
        assert!(!origin_allowed(
            Some("https://evil.example.com"),
            None,
            &allowed()
        ));
    }

    #[test]
    fn referer_is_checked_when_origin_is_absent() {
        assert!(origin_allowed(
            None,
            Some("https://latabla.cr/carrito"),
            &allowed()
        ));
        assert!(!origin_allowed(
            None,
            Some("https://evil.example.com/x"),
            &allowed()
        ));
    }

    #[test]
    fn host_parsing_ignores_port_and_path() {
        assert_eq!(
            host_of("http://localhost:3000/checkout"),
            Some("localhost".to_string())
        );
        assert_eq!(host_of("https://LaTabla.cr"), Some("latabla.cr".to_string()));
        assert_eq!(host_of(""), None);
    }
}
