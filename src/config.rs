// src/config.rs

use std::{env, sync::Arc, time::Duration};

use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::{
    db::{CalendarRepository, CatalogRepository, OrderRepository},
    middleware::abuse::{MemoryRateLimiter, RateLimiter},
    services::{CartService, NotificationService, OrderService},
};

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub admin_api_key: String,
    pub allowed_origins: Vec<String>,
    // Limitador inyectado: la implementación en memoria sirve para una
    // instancia; un despliegue multi-instancia puede sustituirla.
    pub rate_limiter: Arc<dyn RateLimiter>,
    pub catalog_repo: CatalogRepository,
    pub calendar_repo: CalendarRepository,
    pub order_repo: OrderRepository,
    pub cart_service: CartService,
    pub order_service: OrderService,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL debe estar definida");
        let admin_api_key = env::var("ADMIN_API_KEY").expect("ADMIN_API_KEY debe estar definida");

        let allowed_origins: Vec<String> = env::var("ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(|h| h.trim().to_ascii_lowercase())
            .filter(|h| !h.is_empty())
            .collect();

        // Sin RESEND_API_KEY los correos se omiten (y se deja constancia
        // en el log); el resto del sistema funciona igual.
        let resend_api_key = env::var("RESEND_API_KEY").ok();
        let from_email =
            env::var("EMAIL_FROM").unwrap_or_else(|_| "pedidos@latabla.cr".to_string());
        let admin_email =
            env::var("EMAIL_ADMIN").unwrap_or_else(|_| "pedidos@latabla.cr".to_string());

        // Conexión a la base, con '?' para propagar errores.
        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&database_url)
            .await?;

        tracing::info!("Conexión con la base de datos establecida");

        // Limitador en memoria + tarea periódica de limpieza.
        let memory_limiter = Arc::new(MemoryRateLimiter::new());
        {
            let limiter = memory_limiter.clone();
            tokio::spawn(async move {
                loop {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    limiter.cleanup().await;
                }
            });
        }
        let rate_limiter: Arc<dyn RateLimiter> = memory_limiter;

        // --- Arma el grafo de dependencias ---
        let catalog_repo = CatalogRepository::new(db_pool.clone());
        let calendar_repo = CalendarRepository::new(db_pool.clone());
        let order_repo = OrderRepository::new(db_pool.clone());

        let notifier = NotificationService::new(resend_api_key, from_email, admin_email);
        let cart_service = CartService::new(catalog_repo.clone());
        let order_service = OrderService::new(
            db_pool.clone(),
            order_repo.clone(),
            catalog_repo.clone(),
            calendar_repo.clone(),
            notifier,
        );

        Ok(Self {
            db_pool,
            admin_api_key,
            allowed_origins,
            rate_limiter,
            catalog_repo,
            calendar_repo,
            order_repo,
            cart_service,
            order_service,
        })
    }
}
