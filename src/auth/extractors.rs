use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;

use crate::{error::ApiError, state::AppState, users::repo::{Role, User}};

use super::claims::{Claims, JwtKeys};

/// Pulls the session token from either transport the clients use: the
/// Authorization bearer header or the httpOnly `token` cookie.
fn token_from_parts(parts: &Parts) -> Option<String> {
    if let Some(header) = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    {
        if let Some(token) = header
            .strip_prefix("Bearer ")
            .or_else(|| header.strip_prefix("bearer "))
        {
            return Some(token.to_string());
        }
    }

    parts
        .headers
        .get(axum::http::header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(token_from_cookie_header)
}

fn token_from_cookie_header(raw: &str) -> Option<String> {
    raw.split(';')
        .filter_map(|pair| pair.trim().strip_prefix("token="))
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

/// Session tier: a verified token is enough. Yields the embedded claims
/// without touching the store.
pub struct AuthUser(pub Claims);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let token =
            token_from_parts(parts).ok_or(ApiError::Unauthenticated("Authentication required"))?;

        match keys.verify(&token) {
            Ok(claims) => Ok(AuthUser(claims)),
            Err(_) => {
                warn!("invalid or expired token");
                Err(ApiError::Unauthenticated("Invalid or expired token"))
            }
        }
    }
}

/// Admin tier: verifies the token, then re-fetches the user row. Claims can
/// outlive a demotion or deactivation within the token TTL, so role and
/// active status come from the store on every request.
pub struct AdminUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(claims) = AuthUser::from_request_parts(parts, state).await?;

        let user = User::find_by_id(&state.db, claims.sub)
            .await?
            .ok_or(ApiError::Unauthenticated("User not found"))?;

        if !user.is_active {
            warn!(user_id = %user.id, "disabled account on admin route");
            return Err(ApiError::AccountDisabled);
        }
        if user.role != Role::Admin {
            warn!(user_id = %user.id, "non-admin on admin route");
            return Err(ApiError::Forbidden);
        }

        Ok(AdminUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with(header: &'static str, value: &str) -> Parts {
        Request::builder()
            .header(header, value)
            .body(())
            .unwrap()
            .into_parts()
            .0
    }

    #[test]
    fn bearer_header_wins() {
        let parts = parts_with("authorization", "Bearer abc.def.ghi");
        assert_eq!(token_from_parts(&parts).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn cookie_fallback() {
        let parts = parts_with("cookie", "theme=dark; token=abc.def.ghi; lang=en");
        assert_eq!(token_from_parts(&parts).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn missing_token_yields_none() {
        let parts = Request::builder().body(()).unwrap().into_parts().0;
        assert!(token_from_parts(&parts).is_none());

        let parts = parts_with("cookie", "token=");
        assert!(token_from_parts(&parts).is_none());
    }

    #[test]
    fn non_bearer_scheme_is_ignored() {
        let parts = parts_with("authorization", "Basic dXNlcjpwYXNz");
        assert!(token_from_parts(&parts).is_none());
    }
}
