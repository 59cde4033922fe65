use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Access tier. GENERAL accounts only reach session routes; ADMIN unlocks
/// the back office.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    General,
    Admin,
}

/// User record. The password hash never leaves the crate: it is skipped on
/// serialization, so no DTO has to remember to strip it.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_login: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

const USER_COLUMNS: &str =
    "id, name, email, password_hash, role, is_active, last_login, created_at, updated_at";

impl User {
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Insert a new GENERAL, active user. Email uniqueness is enforced by
    /// the store; callers map the violation to a duplicate-identity error.
    pub async fn create(
        db: &PgPool,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (name, email, password_hash) \
             VALUES ($1, $2, $3) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .fetch_one(db)
        .await
    }

    pub async fn touch_last_login(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET last_login = now() WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }

    pub async fn list_all(db: &PgPool) -> anyhow::Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC"
        ))
        .fetch_all(db)
        .await?;
        Ok(users)
    }

    /// Partial update: absent fields keep their stored value.
    pub async fn update(
        db: &PgPool,
        id: Uuid,
        name: Option<&str>,
        email: Option<&str>,
        password_hash: Option<&str>,
        role: Option<Role>,
        is_active: Option<bool>,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET \
               name = COALESCE($2, name), \
               email = COALESCE($3, email), \
               password_hash = COALESCE($4, password_hash), \
               role = COALESCE($5, role), \
               is_active = COALESCE($6, is_active), \
               updated_at = now() \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(role)
        .bind(is_active)
        .fetch_optional(db)
        .await
    }

    /// Soft delete: the record stays retrievable with is_active = false.
    pub async fn deactivate(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET is_active = false, updated_at = now() \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Hard delete, reachable only from the self-service path.
    pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[derive(Debug, FromRow)]
pub struct UserCounts {
    pub total: i64,
    pub active: i64,
    pub admins: i64,
    pub inactive: i64,
}

#[derive(Debug, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, FromRow)]
pub struct MonthlySignups {
    pub month: OffsetDateTime,
    pub count: i64,
}

pub async fn counts(db: &PgPool) -> anyhow::Result<UserCounts> {
    let counts = sqlx::query_as::<_, UserCounts>(
        "SELECT COUNT(*) AS total, \
                COUNT(*) FILTER (WHERE is_active) AS active, \
                COUNT(*) FILTER (WHERE role = 'ADMIN') AS admins, \
                COUNT(*) FILTER (WHERE NOT is_active) AS inactive \
         FROM users",
    )
    .fetch_one(db)
    .await?;
    Ok(counts)
}

pub async fn recent(db: &PgPool, limit: i64) -> anyhow::Result<Vec<RecentUser>> {
    let users = sqlx::query_as::<_, RecentUser>(
        "SELECT id, name, email, role, is_active, created_at \
         FROM users ORDER BY created_at DESC LIMIT $1",
    )
    .bind(limit)
    .fetch_all(db)
    .await?;
    Ok(users)
}

/// Signups grouped by calendar month over the trailing six months.
pub async fn signups_by_month(db: &PgPool) -> anyhow::Result<Vec<MonthlySignups>> {
    let rows = sqlx::query_as::<_, MonthlySignups>(
        "SELECT date_trunc('month', created_at) AS month, COUNT(*) AS count \
         FROM users \
         WHERE created_at >= now() - interval '6 months' \
         GROUP BY 1 ORDER BY 1",
    )
    .fetch_all(db)
    .await?;
    Ok(rows)
}
