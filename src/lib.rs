pub mod checkout;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod pricing;
pub mod store;
pub mod utils;

use std::sync::Arc;

use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Request},
    routing::{delete, get, patch, post, put},
    Router,
};
use log::warn;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use config::Config;
use store::Store;

/// Shared by every handler. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: impl Store + 'static, config: Config) -> Self {
        Self {
            store: Arc::new(store),
            config: Arc::new(config),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(handlers::health))

        // Customer accounts
        .route("/auth/signup", post(handlers::auth::signup))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/me", get(handlers::auth::me))

        // Storefront
        .route("/categories", get(handlers::categories::list_categories))
        .route("/products", get(handlers::products::list_products))
        .route("/products/:id", get(handlers::products::get_product))
        .route("/products/:id/resolve", post(handlers::products::resolve_selection))
        .route("/promo/validate", post(handlers::promos::validate_promo))
        .route("/orders", post(handlers::orders::place_order))
        .route("/orders/mine", get(handlers::orders::my_orders))

        // Admin console
        .route("/admin/login", post(handlers::auth::admin_login))
        .route("/admin/dashboard", get(handlers::dashboard::dashboard))
        .route("/admin/orders", get(handlers::orders::admin_list_orders))
        .route("/admin/orders/:id/status", patch(handlers::orders::update_order_status))
        .route(
            "/admin/categories",
            get(handlers::categories::admin_list_categories)
                .post(handlers::categories::create_category),
        )
        .route("/admin/categories/:id", delete(handlers::categories::delete_category))
        .route(
            "/admin/products",
            get(handlers::products::admin_list_products).post(handlers::products::create_product),
        )
        .route(
            "/admin/products/:id",
            put(handlers::products::update_product).delete(handlers::products::delete_product),
        )
        .route("/admin/variants/generate", post(handlers::products::generate_variants))
        .route(
            "/admin/promos",
            get(handlers::promos::list_promos).post(handlers::promos::create_promo),
        )
        .route(
            "/admin/promos/:id",
            patch(handlers::promos::toggle_promo).delete(handlers::promos::delete_promo),
        );

    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .nest("/api", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    tracing::info_span!("request", method = %request.method(), uri = %request.uri())
                }))
                .layer(cors)
                .layer(DefaultBodyLimit::max(1024 * 1024)),
        )
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}
