pub mod claims;
pub mod dto;
pub mod extractors;
pub mod handlers;
pub mod password;
pub mod service;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(handlers::signup))
        .route("/signin", post(handlers::signin))
        .route("/logout", get(handlers::logout))
        .route(
            "/profile",
            get(handlers::profile).delete(handlers::delete_profile),
        )
}
