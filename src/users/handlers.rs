use axum::{
    extract::{Path, State},
    Json,
};
use time::macros::format_description;
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{extractors::AdminUser, password::hash_password, service::is_valid_email},
    error::{on_unique_violation, ApiError},
    response::ApiResponse,
    state::AppState,
};

use super::{
    dto::{MonthlyCount, UpdateUserRequest, UserStats},
    repo::{self, User},
};

#[instrument(skip(state, _admin))]
pub async fn list_users(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<ApiResponse<Vec<User>>>, ApiError> {
    let users = User::list_all(&state.db).await?;
    Ok(ApiResponse::ok(users, "Users fetched successfully"))
}

#[instrument(skip(state, _admin))]
pub async fn get_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("User"))?;
    Ok(ApiResponse::ok(user, "User fetched successfully"))
}

#[instrument(skip(state, admin, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    let email = match payload.email {
        Some(raw) => {
            let email = raw.trim().to_lowercase();
            if !is_valid_email(&email) {
                return Err(ApiError::InvalidParameter("Invalid email".into()));
            }
            Some(email)
        }
        None => None,
    };

    let password_hash = match payload.password.as_deref() {
        Some(plain) if plain.len() < 8 => {
            return Err(ApiError::InvalidParameter("Password too short".into()));
        }
        Some(plain) => Some(hash_password(plain)?),
        None => None,
    };

    let user = User::update(
        &state.db,
        id,
        payload.name.as_deref(),
        email.as_deref(),
        password_hash.as_deref(),
        payload.role,
        payload.is_active,
    )
    .await
    .map_err(|e| on_unique_violation(e, ApiError::DuplicateIdentity))?
    .ok_or(ApiError::NotFound("User"))?;

    if payload.role.is_some() || payload.is_active.is_some() {
        warn!(
            target_user = %user.id,
            admin = %admin.0.id,
            role = ?user.role,
            is_active = user.is_active,
            "access change applied"
        );
    }

    Ok(ApiResponse::ok(user, "User updated successfully"))
}

/// Soft delete: the record stays retrievable with is_active = false. Issued
/// tokens keep passing plain authentication until expiry, but every admin
/// route re-checks the stored flag and locks them out immediately.
#[instrument(skip(state, _admin))]
pub async fn deactivate_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    let user = User::deactivate(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("User"))?;
    Ok(ApiResponse::ok(user, "User deactivated successfully"))
}

#[instrument(skip(state, _admin))]
pub async fn user_stats(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<ApiResponse<UserStats>>, ApiError> {
    let counts = repo::counts(&state.db).await?;
    let recent_users = repo::recent(&state.db, 5).await?;
    let by_month = repo::signups_by_month(&state.db).await?;

    let month_format = format_description!("[year]-[month]");
    let users_by_month = by_month
        .into_iter()
        .map(|row| MonthlyCount {
            month: row
                .month
                .format(&month_format)
                .unwrap_or_else(|_| row.month.to_string()),
            count: row.count,
        })
        .collect();

    Ok(ApiResponse::ok(
        UserStats {
            total_users: counts.total,
            active_users: counts.active,
            admin_users: counts.admins,
            inactive_users: counts.inactive,
            recent_users,
            users_by_month,
        },
        "User statistics fetched successfully",
    ))
}
