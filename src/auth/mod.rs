mod login;
mod logout;
mod signup;

pub mod password;

use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use sqlx::SqlitePool;
use tower_sessions::Session;

use serde::Serialize;

use crate::{
    error::AppError,
    mechanic,
    models::{AccountInfo, MechanicRow, ROLE_MECHANIC},
    session, AppResult, AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login::page).post(login::submit))
        .route("/signup", get(signup::page).post(signup::submit))
        .route("/logout", get(logout::logout))
}

#[derive(Serialize)]
pub struct MeResponse {
    #[serde(flatten)]
    pub account: AccountInfo,
    pub mechanic: Option<MechanicRow>,
}

/// `GET /api/me`, session introspection for the dashboard scripts.
pub async fn me(
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<Json<MeResponse>> {
    let user = session::require_user(&session).await?;
    let account = session::fetch_account(&db_pool, &user.id)
        .await?
        .ok_or(AppError::NotFound("account"))?;
    let mechanic = if account.role == ROLE_MECHANIC {
        mechanic::store::fetch_profile(&db_pool, &account.id).await?
    } else {
        None
    };
    Ok(Json(MeResponse {
        account: account.into(),
        mechanic,
    }))
}
