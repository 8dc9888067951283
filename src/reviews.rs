use axum::{
    debug_handler,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use sqlx::SqlitePool;
use tokio::sync::broadcast;
use tower_sessions::Session;
use uuid::Uuid;

use crate::{
    error::AppError,
    events::ServerEvent,
    models::{now_utc, ReviewRow, ROLE_ADMIN, ROLE_CUSTOMER, ROLE_MECHANIC, STATUS_COMPLETED},
    notifications, requests, session, AppResult,
};

#[derive(Debug, Deserialize)]
pub(crate) struct NewReview {
    rating: i64,
    review_text: Option<String>,
}

/// `POST /api/requests/{id}/review`. One review per request, enforced by
/// the UNIQUE index rather than a client-side existence check.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn submit_review(
    State(db_pool): State<SqlitePool>,
    State(events): State<broadcast::Sender<ServerEvent>>,
    Path(id): Path<String>,
    session: Session,
    Json(input): Json<NewReview>,
) -> AppResult<(StatusCode, Json<ReviewRow>)> {
    let user = session::require_role(&session, ROLE_CUSTOMER).await?;
    if !(1..=5).contains(&input.rating) {
        return Err(AppError::Validation("rating must be between 1 and 5".into()));
    }

    let request = requests::store::fetch_request(&db_pool, &id)
        .await?
        .ok_or(AppError::NotFound("request"))?;
    if request.customer_id != user.id {
        return Err(AppError::NotFound("request"));
    }
    if request.status != STATUS_COMPLETED {
        return Err(AppError::Conflict("request is not completed yet"));
    }
    let Some(mechanic_id) = request.assigned_mechanic_id else {
        return Err(AppError::Conflict("request has no assigned mechanic"));
    };

    let review = insert_review(
        &db_pool,
        &request.id,
        &mechanic_id,
        &user.id,
        input.rating,
        input
            .review_text
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty()),
    )
    .await?;
    tracing::info!(request_id = %request.id, rating = review.rating, "review submitted");

    notifications::notify(
        &db_pool,
        &events,
        &mechanic_id,
        "New rating received",
        &format!("A customer rated your service {} out of 5.", review.rating),
        Some(&request.id),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(review)))
}

/// `GET /api/requests/{id}/review` lets the customer view flip from form
/// to read-only stars.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn get_review(
    State(db_pool): State<SqlitePool>,
    Path(id): Path<String>,
    session: Session,
) -> AppResult<Json<Option<ReviewRow>>> {
    let user = session::require_user(&session).await?;
    let request = requests::store::fetch_request(&db_pool, &id)
        .await?
        .ok_or(AppError::NotFound("request"))?;

    let allowed = match user.role.as_str() {
        ROLE_ADMIN => true,
        ROLE_CUSTOMER => request.customer_id == user.id,
        ROLE_MECHANIC => request.assigned_mechanic_id.as_deref() == Some(user.id.as_str()),
        _ => false,
    };
    if !allowed {
        return Err(AppError::NotFound("request"));
    }

    Ok(Json(review_for_request(&db_pool, &id).await?))
}

pub async fn insert_review(
    pool: &SqlitePool,
    request_id: &str,
    mechanic_id: &str,
    customer_id: &str,
    rating: i64,
    review_text: Option<&str>,
) -> AppResult<ReviewRow> {
    let id = Uuid::now_v7().to_string();
    let inserted = sqlx::query(
        "INSERT INTO reviews (id, request_id, mechanic_id, customer_id, rating, review_text, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(request_id)
    .bind(mechanic_id)
    .bind(customer_id)
    .bind(rating)
    .bind(review_text)
    .bind(now_utc())
    .execute(pool)
    .await;

    if let Err(sqlx::Error::Database(db_err)) = &inserted {
        if db_err.is_unique_violation() {
            return Err(AppError::Conflict("this request has already been reviewed"));
        }
    }
    inserted?;

    review_for_request(pool, request_id)
        .await?
        .ok_or(AppError::NotFound("review"))
}

pub async fn review_for_request(
    pool: &SqlitePool,
    request_id: &str,
) -> AppResult<Option<ReviewRow>> {
    let row = sqlx::query_as::<_, ReviewRow>(
        "SELECT id, request_id, mechanic_id, customer_id, rating, review_text, created_at \
         FROM reviews WHERE request_id = ?",
    )
    .bind(request_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}
