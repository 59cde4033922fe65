use axum::{extract::State, Json};
use serde::Serialize;
use tracing::instrument;

use crate::{
    auth::extractors::AdminUser, error::ApiError, products, response::ApiResponse,
    state::AppState, users,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserTotals {
    pub total: i64,
    pub active: i64,
    pub admins: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductTotals {
    pub total: i64,
    pub active: i64,
    pub out_of_stock: i64,
}

#[derive(Debug, Serialize)]
pub struct DashboardOverview {
    pub users: UserTotals,
    pub products: ProductTotals,
}

/// Combined headline numbers for the admin landing page.
#[instrument(skip(state, _admin))]
pub async fn overview(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<ApiResponse<DashboardOverview>>, ApiError> {
    let (user_counts, product_counts) = tokio::try_join!(
        users::repo::counts(&state.db),
        products::repo::counts(&state.db),
    )?;

    Ok(ApiResponse::ok(
        DashboardOverview {
            users: UserTotals {
                total: user_counts.total,
                active: user_counts.active,
                admins: user_counts.admins,
            },
            products: ProductTotals {
                total: product_counts.total,
                active: product_counts.active,
                out_of_stock: product_counts.out_of_stock,
            },
        },
        "Dashboard overview fetched successfully",
    ))
}
