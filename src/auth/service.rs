use axum::extract::FromRef;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use crate::{
    error::{on_unique_violation, ApiError},
    state::AppState,
    users::repo::User,
};

use super::{
    claims::JwtKeys,
    password::{hash_password, verify_password},
};

pub fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Creates a GENERAL, active account. The pre-check keeps the common case
/// friendly; the unique constraint settles concurrent signups.
pub async fn signup(
    state: &AppState,
    name: &str,
    email: &str,
    password: &str,
) -> Result<User, ApiError> {
    let name = name.trim();
    let email = email.trim().to_lowercase();

    if name.is_empty() || email.is_empty() || password.is_empty() {
        return Err(ApiError::InvalidParameter("All fields are required".into()));
    }
    if !is_valid_email(&email) {
        return Err(ApiError::InvalidParameter("Invalid email".into()));
    }
    if password.len() < 8 {
        return Err(ApiError::InvalidParameter("Password too short".into()));
    }

    if User::find_by_email(&state.db, &email).await?.is_some() {
        warn!(email = %email, "signup with taken email");
        return Err(ApiError::DuplicateIdentity);
    }

    let hash = hash_password(password)?;
    let user = User::create(&state.db, name, &email, &hash)
        .await
        .map_err(|e| on_unique_violation(e, ApiError::DuplicateIdentity))?;

    info!(user_id = %user.id, "user registered");
    Ok(user)
}

/// Verifies credentials and issues a session token. Unknown email and wrong
/// password are indistinguishable to the caller so registered addresses
/// cannot be enumerated.
pub async fn login(
    state: &AppState,
    email: &str,
    password: &str,
) -> Result<(String, User), ApiError> {
    let email = email.trim().to_lowercase();

    let user = match User::find_by_email(&state.db, &email).await? {
        Some(user) => user,
        None => {
            warn!(email = %email, "login with unknown email");
            return Err(ApiError::InvalidCredentials);
        }
    };

    if !verify_password(password, &user.password_hash)? {
        warn!(user_id = %user.id, "login with wrong password");
        return Err(ApiError::InvalidCredentials);
    }

    if !user.is_active {
        warn!(user_id = %user.id, "login on disabled account");
        return Err(ApiError::AccountDisabled);
    }

    // Best effort: a failed timestamp write must not fail the login.
    if let Err(e) = User::touch_last_login(&state.db, user.id).await {
        warn!(error = %e, user_id = %user.id, "last_login update failed");
    }

    let keys = JwtKeys::from_ref(state);
    let token = keys.sign(&user)?;

    info!(user_id = %user.id, "user logged in");
    Ok((token, user))
}
