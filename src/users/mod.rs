pub mod dto;
pub mod handlers;
pub mod repo;

use axum::{
    routing::{get, put},
    Router,
};

use crate::state::AppState;

/// Admin-only user management routes, mounted under /admin.
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/users", get(handlers::list_users))
        .route(
            "/users/:id",
            put(handlers::update_user)
                .get(handlers::get_user)
                .delete(handlers::deactivate_user),
        )
        .route("/users/stats/overview", get(handlers::user_stats))
}
