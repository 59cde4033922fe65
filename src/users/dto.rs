use serde::{Deserialize, Serialize};

use super::repo::{RecentUser, Role};

/// Admin-driven profile edit. Everything is optional; role and active-status
/// changes only exist on this path.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_users: i64,
    pub active_users: i64,
    pub admin_users: i64,
    pub inactive_users: i64,
    pub recent_users: Vec<RecentUser>,
    pub users_by_month: Vec<MonthlyCount>,
}

#[derive(Debug, Serialize)]
pub struct MonthlyCount {
    pub month: String,
    pub count: i64,
}
