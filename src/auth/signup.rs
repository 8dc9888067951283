use axum::{
    debug_handler,
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use sqlx::SqlitePool;
use tower_sessions::Session;
use uuid::Uuid;

use crate::{
    auth::password::hash_password,
    error::AppError,
    include_res,
    models::{now_utc, ROLE_CUSTOMER, ROLE_MECHANIC},
    session, AppResult,
};

#[derive(Debug, Deserialize)]
pub(crate) struct SignupForm {
    name: String,
    email: String,
    phone: Option<String>,
    password: String,
    role: String,
    specialization: Option<String>,
    experience_years: Option<i64>,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn page(session: Session) -> AppResult<Response> {
    if let Some(user) = session::current_user(&session).await? {
        return Ok(Redirect::to(session::role_home(&user.role)).into_response());
    }
    Ok(Html(include_res!(str, "/pages/signup.html")).into_response())
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn submit(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Form(form): Form<SignupForm>,
) -> AppResult<Redirect> {
    let name = form.name.trim();
    let email = form.email.trim().to_lowercase();
    if name.is_empty() {
        return Err(AppError::Validation("name is required".into()));
    }
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::Validation("a valid email is required".into()));
    }
    if form.password.len() < 8 {
        return Err(AppError::Validation(
            "password must be at least 8 characters".into(),
        ));
    }
    // Admin accounts are seeded, never self-served.
    if form.role != ROLE_CUSTOMER && form.role != ROLE_MECHANIC {
        return Err(AppError::Validation("role must be customer or mechanic".into()));
    }

    let user_id = Uuid::now_v7().to_string();
    let password_hash = hash_password(&form.password)?;

    let inserted = sqlx::query(
        "INSERT INTO accounts (id, name, email, phone, role, password_hash, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&user_id)
    .bind(name)
    .bind(&email)
    .bind(form.phone.as_deref().unwrap_or("").trim())
    .bind(&form.role)
    .bind(password_hash)
    .bind(now_utc())
    .execute(&db_pool)
    .await;

    if let Err(sqlx::Error::Database(db_err)) = &inserted {
        if db_err.is_unique_violation() {
            return Err(AppError::Conflict("an account with this email already exists"));
        }
    }
    inserted?;

    // Mechanics start unverified and stay invisible to matching until an
    // admin flips the gate.
    if form.role == ROLE_MECHANIC {
        sqlx::query(
            "INSERT INTO mechanic_profiles (user_id, specialization, experience_years) \
             VALUES (?, ?, ?)",
        )
        .bind(&user_id)
        .bind(form.specialization.as_deref().unwrap_or("").trim())
        .bind(form.experience_years.unwrap_or(0).max(0))
        .execute(&db_pool)
        .await?;
    }

    session::sign_in(&session, &user_id, &form.role).await?;
    tracing::info!(%user_id, role = %form.role, "signup");
    Ok(Redirect::to(session::role_home(&form.role)))
}
