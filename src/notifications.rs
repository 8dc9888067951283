use axum::{
    debug_handler,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use sqlx::SqlitePool;
use tokio::sync::broadcast;
use tower_sessions::Session;
use uuid::Uuid;

use crate::{
    error::AppError,
    events::ServerEvent,
    models::{now_utc, NotificationRow},
    session, AppResult, AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/{id}/read", post(mark_read))
}

/// Persist a notification and announce it on the live channel. Lifecycle
/// transitions call this; clients only ever flip `is_read`.
pub async fn notify(
    pool: &SqlitePool,
    events: &broadcast::Sender<ServerEvent>,
    user_id: &str,
    title: &str,
    message: &str,
    request_id: Option<&str>,
) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO notifications (id, user_id, title, message, request_id, is_read, created_at) \
         VALUES (?, ?, ?, ?, ?, 0, ?)",
    )
    .bind(Uuid::now_v7().to_string())
    .bind(user_id)
    .bind(title)
    .bind(message)
    .bind(request_id)
    .bind(now_utc())
    .execute(pool)
    .await?;

    let _ = events.send(ServerEvent::Notification {
        user_id: user_id.to_owned(),
        request_id: request_id.map(str::to_owned),
    });
    Ok(())
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn list(
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<Json<Vec<NotificationRow>>> {
    let user = session::require_user(&session).await?;
    let rows = sqlx::query_as::<_, NotificationRow>(
        "SELECT id, user_id, title, message, request_id, is_read, created_at \
         FROM notifications WHERE user_id = ? ORDER BY created_at DESC LIMIT 50",
    )
    .bind(&user.id)
    .fetch_all(&db_pool)
    .await?;
    Ok(Json(rows))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn mark_read(
    State(db_pool): State<SqlitePool>,
    Path(id): Path<String>,
    session: Session,
) -> AppResult<StatusCode> {
    let user = session::require_user(&session).await?;
    let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE id = ? AND user_id = ?")
        .bind(&id)
        .bind(&user.id)
        .execute(&db_pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("notification"));
    }
    Ok(StatusCode::NO_CONTENT)
}
