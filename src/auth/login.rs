use axum::{
    debug_handler,
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{
    auth::password::verify_password,
    error::AppError,
    include_res,
    models::AccountRow,
    session, AppResult,
};

#[derive(Debug, Deserialize)]
pub(crate) struct LoginForm {
    email: String,
    password: String,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn page(session: Session) -> AppResult<Response> {
    if let Some(user) = session::current_user(&session).await? {
        return Ok(Redirect::to(session::role_home(&user.role)).into_response());
    }
    Ok(Html(include_res!(str, "/pages/login.html")).into_response())
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn submit(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Form(LoginForm { email, password }): Form<LoginForm>,
) -> AppResult<Redirect> {
    let account = sqlx::query_as::<_, AccountRow>(
        "SELECT id, name, email, phone, role, password_hash, created_at \
         FROM accounts WHERE email = ?",
    )
    .bind(email.trim().to_lowercase())
    .fetch_optional(&db_pool)
    .await?;

    let Some(account) = account else {
        return Err(AppError::Unauthorized("invalid email or password"));
    };
    if !verify_password(&password, &account.password_hash) {
        return Err(AppError::Unauthorized("invalid email or password"));
    }

    session::sign_in(&session, &account.id, &account.role).await?;
    tracing::info!(user_id = %account.id, role = %account.role, "login");
    Ok(Redirect::to(session::role_home(&account.role)))
}
