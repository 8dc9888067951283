use axum::{
    debug_handler,
    extract::{Path, State},
    Json,
};
use sqlx::SqlitePool;
use tokio::sync::broadcast;
use tower_sessions::Session;

use crate::{
    error::AppError,
    events::ServerEvent,
    models::{RequestRow, ROLE_MECHANIC},
    notifications, session, AppResult,
};

use super::store;

/// `POST /api/requests/{id}/accept`. First verified mechanic wins; the
/// guard in the store turns a lost race into `AlreadyAssigned`.
#[debug_handler(state = crate::AppState)]
pub async fn accept(
    State(db_pool): State<SqlitePool>,
    State(events): State<broadcast::Sender<ServerEvent>>,
    Path(id): Path<String>,
    session: Session,
) -> AppResult<Json<RequestRow>> {
    let user = session::require_role(&session, ROLE_MECHANIC).await?;
    let profile = store::fetch_profile(&db_pool, &user.id)
        .await?
        .ok_or(AppError::NotFound("mechanic profile"))?;
    if !profile.is_verified {
        return Err(AppError::Forbidden("mechanic account is not verified yet"));
    }

    let row = store::accept_request(&db_pool, &id, &user.id).await?;
    tracing::info!(request_id = %row.id, mechanic_id = %user.id, "request accepted");

    notifications::notify(
        &db_pool,
        &events,
        &row.customer_id,
        "Mechanic on the way",
        &format!("{} accepted your request.", profile.name),
        Some(&row.id),
    )
    .await?;

    let _ = events.send(ServerEvent::RequestUpdated {
        request_id: row.id.clone(),
        status: row.status.clone(),
        customer_id: row.customer_id.clone(),
        mechanic_id: row.assigned_mechanic_id.clone(),
    });

    Ok(Json(row))
}

/// `POST /api/requests/{id}/complete`. Assignee only, active work only.
#[debug_handler(state = crate::AppState)]
pub async fn complete(
    State(db_pool): State<SqlitePool>,
    State(events): State<broadcast::Sender<ServerEvent>>,
    Path(id): Path<String>,
    session: Session,
) -> AppResult<Json<RequestRow>> {
    let user = session::require_role(&session, ROLE_MECHANIC).await?;
    let row = store::complete_request(&db_pool, &id, &user.id).await?;
    tracing::info!(request_id = %row.id, mechanic_id = %user.id, "request completed");

    notifications::notify(
        &db_pool,
        &events,
        &row.customer_id,
        "Service completed",
        "Your request was marked completed. You can now rate the mechanic.",
        Some(&row.id),
    )
    .await?;

    let _ = events.send(ServerEvent::RequestUpdated {
        request_id: row.id.clone(),
        status: row.status.clone(),
        customer_id: row.customer_id.clone(),
        mechanic_id: row.assigned_mechanic_id.clone(),
    });

    Ok(Json(row))
}
