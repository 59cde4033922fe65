use axum::{
    extract::{FromRef, State},
    http::{header, HeaderMap, StatusCode},
    Json,
};
use tracing::{info, instrument};

use crate::{
    error::ApiError,
    response::ApiResponse,
    state::AppState,
    users::repo::User,
};

use super::{
    claims::JwtKeys,
    dto::{AuthResponse, ProfileResponse, SigninRequest, SignupRequest},
    extractors::AuthUser,
    service,
};

fn session_cookie(token: &str, max_age_secs: u64) -> String {
    format!("token={token}; HttpOnly; Path=/; SameSite=Lax; Max-Age={max_age_secs}")
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<ApiResponse<User>>), ApiError> {
    let user = service::signup(&state, &payload.name, &payload.email, &payload.password).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(user, "User created")))
}

#[instrument(skip(state, payload))]
pub async fn signin(
    State(state): State<AppState>,
    Json(payload): Json<SigninRequest>,
) -> Result<(HeaderMap, Json<ApiResponse<AuthResponse>>), ApiError> {
    let (token, user) = service::login(&state, &payload.email, &payload.password).await?;

    let keys = JwtKeys::from_ref(&state);
    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        session_cookie(&token, keys.ttl.as_secs())
            .parse()
            .map_err(|e| ApiError::Internal(anyhow::anyhow!("cookie header: {e}")))?,
    );

    Ok((
        headers,
        ApiResponse::ok(AuthResponse { token, user }, "Login successful"),
    ))
}

#[instrument]
pub async fn logout() -> (HeaderMap, Json<ApiResponse<()>>) {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        session_cookie("", 0).parse().expect("static cookie header"),
    );
    (headers, ApiResponse::message("Logged out successfully"))
}

/// Echoes the token's identity. Deliberately does not re-fetch the row;
/// admin routes are the ones that need live state.
#[instrument(skip(claims))]
pub async fn profile(AuthUser(claims): AuthUser) -> Json<ApiResponse<ProfileResponse>> {
    ApiResponse::ok(
        ProfileResponse {
            id: claims.sub,
            email: claims.email,
            role: claims.role,
        },
        "Profile fetched successfully",
    )
}

/// Self-service account removal: the only path that hard-deletes a user.
#[instrument(skip(state, claims))]
pub async fn delete_profile(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<(HeaderMap, Json<ApiResponse<()>>), ApiError> {
    let deleted = User::delete(&state.db, claims.sub).await?;
    if !deleted {
        return Err(ApiError::NotFound("User"));
    }
    info!(user_id = %claims.sub, "account deleted");

    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        session_cookie("", 0).parse().expect("static cookie header"),
    );
    Ok((headers, ApiResponse::message("Account deleted successfully")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_cookie_is_http_only_and_scoped() {
        let cookie = session_cookie("abc.def", 10800);
        assert!(cookie.starts_with("token=abc.def"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("Max-Age=10800"));
    }

    #[test]
    fn logout_cookie_expires_immediately() {
        let cookie = session_cookie("", 0);
        assert!(cookie.starts_with("token=;"));
        assert!(cookie.contains("Max-Age=0"));
    }
}
