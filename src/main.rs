// src/main.rs

use std::net::SocketAddr;

use axum::{
    Router,
    middleware as axum_middleware,
    routing::{delete, get, patch, post},
};
use tokio::net::TcpListener;

mod common;
mod config;
mod db;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::AppState;
use crate::middleware::{abuse, admin::admin_guard, origin::origin_guard};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_target(false).compact().init();

    // .expect() está bien acá: si la configuración falla, la aplicación
    // no debe arrancar.
    let app_state = AppState::new()
        .await
        .expect("Falló la inicialización del estado de la aplicación.");

    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .expect("Fallaron las migraciones de la base de datos.");

    tracing::info!("Migraciones de la base de datos ejecutadas");

    // El camino de escritura del pedido: origen primero, tasa después,
    // esquema adentro del handler. Cualquier rechazo corta antes de la
    // lógica de negocio.
    let order_create_routes = Router::new()
        .route("/", post(handlers::orders::create_order))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            abuse::order_rate_limit,
        ))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            origin_guard,
        ));

    let order_track_routes = Router::new()
        .route("/{order_number}", get(handlers::orders::track_order))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            abuse::track_rate_limit,
        ));

    let cart_routes = Router::new()
        .route("/validate", post(handlers::cart::validate_cart))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            abuse::cart_rate_limit,
        ))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            origin_guard,
        ));

    // Lecturas públicas de la vitrina.
    let storefront_routes = Router::new()
        .route("/products", get(handlers::catalog::list_products))
        .route("/products/{id}", get(handlers::catalog::get_product))
        .route("/categories", get(handlers::catalog::list_categories))
        .route("/ingredients", get(handlers::catalog::list_ingredients))
        .route("/delivery-slots", get(handlers::calendar::list_delivery_slots))
        .route("/blocked-dates", get(handlers::calendar::list_blocked_dates));

    // Back office completo detrás del guardián de administración.
    let admin_routes = Router::new()
        .route("/orders", get(handlers::orders::list_orders))
        .route("/orders/{id}", patch(handlers::orders::update_order))
        .route("/products", post(handlers::catalog::create_product))
        .route(
            "/products/{id}",
            patch(handlers::catalog::update_product).delete(handlers::catalog::delete_product),
        )
        .route("/categories", post(handlers::catalog::create_category))
        .route(
            "/categories/{id}",
            patch(handlers::catalog::update_category).delete(handlers::catalog::delete_category),
        )
        .route("/ingredients", post(handlers::catalog::create_ingredient))
        .route(
            "/ingredients/{id}",
            patch(handlers::catalog::update_ingredient)
                .delete(handlers::catalog::delete_ingredient),
        )
        .route(
            "/blocked-dates",
            post(handlers::calendar::create_blocked_date),
        )
        .route(
            "/blocked-dates/{id}",
            delete(handlers::calendar::delete_blocked_date),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            admin_guard,
        ))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            origin_guard,
        ));

    // Combina todo en el router principal.
    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/orders", order_create_routes.merge(order_track_routes))
        .nest("/api/cart", cart_routes)
        .nest("/api", storefront_routes)
        .nest("/api/admin", admin_routes)
        .with_state(app_state);

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&addr)
        .await
        .expect("Falló el arranque del listener TCP");
    tracing::info!("Servidor escuchando en {}", listener.local_addr().unwrap());

    // into_make_service_with_connect_info: el limitador necesita la IP
    // del socket cuando no hay X-Forwarded-For.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Error en el servidor Axum");
}
