//! Route definitions for the storefront API
//!
//! This module configures all HTTP routes and maps them to their respective
//! handlers. Admin routes sit behind [`admin_auth`].

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method};
use axum::middleware;
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

use crate::database::AppState;
use crate::handler::{
    add_review, add_shipping_option, checkout, create_product, delete_product,
    delete_shipping_option, get_product, get_settings, health, list_products, quote_shipping,
    set_default_payment_method, set_default_shipping_option, set_store_location,
    update_payment_method, update_product, update_shipping_option, welcome,
};
use crate::media::MEDIA_ROUTE;
use crate::middleware::admin_auth;

/// Uploads may carry a video
const UPLOAD_LIMIT_BYTES: usize = 50 * 1024 * 1024;

/// Creates and configures the Axum application router with all routes
///
/// # Route Definitions
///
/// Public:
/// - `GET /` and `GET /api` - welcome and health check
/// - `GET /api/products` - list products
/// - `GET /api/products/{id}` - one product
/// - `POST /api/products/{id}/reviews` - append a review
/// - `GET /api/settings` - store settings
/// - `POST /api/shipping/quote` - shipping price for a distance
/// - `POST /api/checkout` - order summary and e-mail
/// - `GET /media/*` - uploaded files
///
/// Admin:
/// - `POST /api/products` - create (multipart)
/// - `PUT|DELETE /api/products/{id}` - edit or delete
/// - `POST /api/settings/shipping`, `PUT|DELETE /api/settings/shipping/{id}`,
///   `POST /api/settings/shipping/{id}/default`
/// - `PUT /api/settings/payment/{id}`, `POST /api/settings/payment/{id}/default`
/// - `PUT /api/settings/location`
pub fn create_app(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route(
            "/products",
            post(create_product).layer(DefaultBodyLimit::max(UPLOAD_LIMIT_BYTES)),
        )
        .route("/products/{id}", put(update_product).delete(delete_product))
        .route("/settings/shipping", post(add_shipping_option))
        .route(
            "/settings/shipping/{id}",
            put(update_shipping_option).delete(delete_shipping_option),
        )
        .route("/settings/shipping/{id}/default", post(set_default_shipping_option))
        .route("/settings/payment/{id}", put(update_payment_method))
        .route("/settings/payment/{id}/default", post(set_default_payment_method))
        .route("/settings/location", put(set_store_location))
        .route_layer(middleware::from_fn_with_state(state.clone(), admin_auth));

    let public_routes = Router::new()
        .route("/", get(health))
        .route("/products", get(list_products))
        .route("/products/{id}", get(get_product))
        .route("/products/{id}/reviews", post(add_review))
        .route("/settings", get(get_settings))
        .route("/shipping/quote", post(quote_shipping))
        .route("/checkout", post(checkout));

    let media_dir = state.media.dir().to_path_buf();
    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .route("/", get(welcome))
        // Admin and public routers share paths with different methods
        .nest("/api", public_routes.merge(admin_routes))
        .nest_service(MEDIA_ROUTE, ServeDir::new(media_dir))
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let methods = [Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS];
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    if allowed.is_empty() {
        CorsLayer::new().allow_origin(Any).allow_methods(methods).allow_headers(Any)
    } else {
        CorsLayer::new()
            .allow_origin(allowed)
            .allow_methods(methods)
            .allow_headers(Any)
    }
}
