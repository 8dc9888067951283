use axum::{
    debug_handler,
    extract::{Path, State},
    Json,
};
use sqlx::SqlitePool;
use tokio::sync::broadcast;
use tower_sessions::Session;

use crate::{
    events::ServerEvent,
    models::{RequestRow, ROLE_CUSTOMER},
    notifications, session, AppResult,
};

use super::store;

#[debug_handler(state = crate::AppState)]
pub(crate) async fn cancel(
    State(db_pool): State<SqlitePool>,
    State(events): State<broadcast::Sender<ServerEvent>>,
    Path(id): Path<String>,
    session: Session,
) -> AppResult<Json<RequestRow>> {
    let user = session::require_role(&session, ROLE_CUSTOMER).await?;
    let row = store::cancel_request(&db_pool, &id, &user.id).await?;
    tracing::info!(request_id = %row.id, "request cancelled");

    if let Some(mechanic_id) = row.assigned_mechanic_id.as_deref() {
        notifications::notify(
            &db_pool,
            &events,
            mechanic_id,
            "Request cancelled",
            "The customer cancelled the request you had accepted.",
            Some(&row.id),
        )
        .await?;
    }

    let _ = events.send(ServerEvent::RequestUpdated {
        request_id: row.id.clone(),
        status: row.status.clone(),
        customer_id: row.customer_id.clone(),
        mechanic_id: row.assigned_mechanic_id.clone(),
    });

    Ok(Json(row))
}
