// src/middleware/abuse.rs

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::{common::error::AppError, config::AppState};

// Límites por ruta. La creación de pedidos es la más estricta.
pub const ORDER_CREATE_LIMIT: u32 = 5;
pub const CART_VALIDATE_LIMIT: u32 = 20;
pub const TRACK_LIMIT: u32 = 30;
pub const WINDOW: Duration = Duration::from_secs(60);

/// Abstracción inyectada del limitador: el estado no vive cableado en el
/// camino de la request. Una instalación multi-instancia puede sustituir
/// la implementación en memoria por un almacén compartido.
#[async_trait::async_trait]
pub trait RateLimiter: Send + Sync {
    /// `true` si la solicitud pasa, `false` si superó el límite.
    async fn allow(&self, key: &str, limit: u32, window: Duration) -> bool;
}

struct WindowEntry {
    count: u32,
    window_start: Instant,
}

/// Ventana fija en memoria, por proceso. Con varias instancias el límite
/// efectivo es más laxo que el nominal: defensa pragmática, no precisa.
pub struct MemoryRateLimiter {
    inner: Mutex<HashMap<String, WindowEntry>>,
}

impl MemoryRateLimiter {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Purga entradas con ventana vencida hace más de 5 minutos.
    pub async fn cleanup(&self) {
        let mut map = self.inner.lock().await;
        let cutoff = Duration::from_secs(300);
        let now = Instant::now();
        map.retain(|_, entry| now.duration_since(entry.window_start) < cutoff);
    }
}

impl Default for MemoryRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl RateLimiter for MemoryRateLimiter {
    async fn allow(&self, key: &str, limit: u32, window: Duration) -> bool {
        let mut map = self.inner.lock().await;
        let now = Instant::now();

        let entry = map.entry(key.to_owned()).or_insert_with(|| WindowEntry {
            count: 0,
            window_start: now,
        });

        // Ventana vencida: arranca una nueva.
        if now.duration_since(entry.window_start) >= window {
            entry.count = 0;
            entry.window_start = now;
        }

        entry.count += 1;
        entry.count <= limit
    }
}

/// IP del cliente: primero X-Forwarded-For (proxy/CDN), después la
/// dirección del socket.
fn extract_ip(request: &Request) -> String {
    if let Some(forwarded) = request.headers().get("x-forwarded-for") {
        if let Ok(value) = forwarded.to_str() {
            if let Some(first) = value.split(',').next() {
                let ip = first.trim();
                if !ip.is_empty() {
                    return ip.to_owned();
                }
            }
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_owned())
}

// La clave se arma de forma síncrona, antes del await: el futuro del
// middleware no debe retener préstamos de la request (el cuerpo no es
// `Sync` y el futuro dejaría de ser `Send`).
fn rate_key(request: &Request, route: &str) -> String {
    let ip = extract_ip(request);
    format!("{ip}:{}:{route}", request.method())
}

async fn check_rate(state: &AppState, key: String, limit: u32) -> Result<(), AppError> {
    if state.rate_limiter.allow(&key, limit, WINDOW).await {
        Ok(())
    } else {
        Err(AppError::RateLimited {
            retry_after_secs: WINDOW.as_secs(),
        })
    }
}

pub async fn order_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let key = rate_key(&request, "orders");
    check_rate(&state, key, ORDER_CREATE_LIMIT).await?;
    Ok(next.run(request).await)
}

pub async fn cart_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let key = rate_key(&request, "cart");
    check_rate(&state, key, CART_VALIDATE_LIMIT).await?;
    Ok(next.run(request).await)
}

pub async fn track_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let key = rate_key(&request, "track");
    check_rate(&state, key, TRACK_LIMIT).await?;
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn request_over_the_limit_is_rejected() {
        let limiter = MemoryRateLimiter::new();
        let window = Duration::from_secs(60);

        for _ in 0..5 {
            assert!(limiter.allow("1.2.3.4:POST:orders", 5, window).await);
        }
        // La sexta dentro de la ventana cae.
        assert!(!limiter.allow("1.2.3.4:POST:orders", 5, window).await);
    }

    #[tokio::test]
    async fn window_reset_allows_again() {
        let limiter = MemoryRateLimiter::new();
        let window = Duration::from_millis(50);

        assert!(limiter.allow("k", 1, window).await);
        assert!(!limiter.allow("k", 1, window).await);

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(limiter.allow("k", 1, window).await);
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let limiter = MemoryRateLimiter::new();
        let window = Duration::from_secs(60);

        assert!(limiter.allow("a", 1, window).await);
        assert!(!limiter.allow("a", 1, window).await);
        assert!(limiter.allow("b", 1, window).await);
    }

    #[test]
    fn rate_key_uses_forwarded_ip_and_method() {
        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/api/orders")
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(rate_key(&request, "orders"), "203.0.113.7:POST:orders");
    }

    #[test]
    fn rate_key_without_ip_sources_marks_unknown() {
        let request = axum::http::Request::builder()
            .method("GET")
            .uri("/api/orders/LT-1")
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(rate_key(&request, "track"), "unknown:GET:track");
    }

    // Los middleware corren en el executor multihilo de tokio: sus
    // futuros tienen que ser `Send`.
    #[test]
    fn rate_limit_futures_are_send() {
        fn require_send<F, Fut>(_: F)
        where
            F: Fn(State<AppState>, Request, Next) -> Fut,
            Fut: Send,
        {
        }

        require_send(order_rate_limit);
        require_send(cart_rate_limit);
        require_send(track_rate_limit);
    }

    #[tokio::test]
    async fn cleanup_drops_stale_entries() {
        let limiter = MemoryRateLimiter::new();
        assert!(limiter.allow("viejo", 1, Duration::from_secs(60)).await);

        limiter.cleanup().await;
        // La entrada sigue fresca, no se purga.
        let map = limiter.inner.lock().await;
        assert!(map.contains_key("viejo"));
    }
}
