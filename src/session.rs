use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{
    error::AppError,
    models::{AccountRow, ROLE_ADMIN, ROLE_MECHANIC},
    AppResult,
};

pub const USER_ID: &str = "user_id";
pub const ROLE: &str = "role";

#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: String,
    pub role: String,
}

pub async fn current_user(session: &Session) -> AppResult<Option<CurrentUser>> {
    let Some(id) = session.get::<String>(USER_ID).await? else {
        return Ok(None);
    };
    let Some(role) = session.get::<String>(ROLE).await? else {
        return Ok(None);
    };
    Ok(Some(CurrentUser { id, role }))
}

pub async fn require_user(session: &Session) -> AppResult<CurrentUser> {
    current_user(session)
        .await?
        .ok_or(AppError::Unauthorized("authentication required"))
}

pub async fn require_role(session: &Session, role: &str) -> AppResult<CurrentUser> {
    let user = require_user(session).await?;
    if user.role != role {
        return Err(AppError::Forbidden("wrong role for this operation"));
    }
    Ok(user)
}

pub async fn sign_in(session: &Session, user_id: &str, role: &str) -> AppResult<()> {
    session.insert(USER_ID, user_id.to_owned()).await?;
    session.insert(ROLE, role.to_owned()).await?;
    Ok(())
}

/// Dashboard home per role; role mismatches on gated pages redirect here.
pub fn role_home(role: &str) -> &'static str {
    match role {
        ROLE_MECHANIC => "/mechanic-dashboard",
        ROLE_ADMIN => "/admin-dashboard",
        _ => "/customer-dashboard",
    }
}

pub async fn fetch_account(db_pool: &SqlitePool, user_id: &str) -> AppResult<Option<AccountRow>> {
    let account = sqlx::query_as::<_, AccountRow>(
        "SELECT id, name, email, phone, role, password_hash, created_at FROM accounts WHERE id = ?",
    )
    .bind(user_id)
    .fetch_optional(db_pool)
    .await?;
    Ok(account)
}
