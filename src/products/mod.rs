pub mod dto;
pub mod handlers;
pub mod model;
pub mod query;
pub mod repo;
pub mod upload;

use axum::{
    extract::DefaultBodyLimit,
    routing::get,
    Router,
};

use crate::state::AppState;

/// Admin-only catalog routes, mounted under /admin. Body limit covers the
/// worst case of 5 files at 5MB plus form fields.
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route(
            "/products",
            get(handlers::list_products).post(handlers::create_product),
        )
        .route(
            "/products/:id",
            get(handlers::get_product)
                .put(handlers::update_product)
                .delete(handlers::delete_product),
        )
        .route("/products/stats/overview", get(handlers::product_stats))
        .layer(DefaultBodyLimit::max(26 * 1024 * 1024))
}
