use axum::{
    debug_handler,
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{
    error::AppError,
    mechanic,
    models::{RequestRow, ROLE_ADMIN, ROLE_CUSTOMER, ROLE_MECHANIC, STATUS_PENDING},
    session, AppResult,
};

use super::store;

#[derive(Debug, Deserialize)]
pub(crate) struct ListQuery {
    tab: Option<String>,
}

/// `GET /api/requests`, scoped by role. Customers get their own history,
/// mechanics get the queue tab they asked for, admins everything.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn list(
    State(db_pool): State<SqlitePool>,
    Query(ListQuery { tab }): Query<ListQuery>,
    session: Session,
) -> AppResult<Json<Vec<RequestRow>>> {
    let user = session::require_user(&session).await?;
    let rows = match user.role.as_str() {
        ROLE_CUSTOMER => store::list_for_customer(&db_pool, &user.id).await?,
        ROLE_MECHANIC => {
            mechanic::store::list_queue(&db_pool, &user.id, tab.as_deref().unwrap_or("pending"))
                .await?
        }
        ROLE_ADMIN => store::list_all(&db_pool).await?,
        _ => return Err(AppError::Forbidden("unknown role")),
    };
    Ok(Json(rows))
}

/// `GET /api/requests/{id}`, the targeted re-query behind every change
/// event. This is also where event authorization actually happens.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn get_one(
    State(db_pool): State<SqlitePool>,
    Path(id): Path<String>,
    session: Session,
) -> AppResult<Json<RequestRow>> {
    let user = session::require_user(&session).await?;
    let row = store::fetch_request(&db_pool, &id)
        .await?
        .ok_or(AppError::NotFound("request"))?;

    let allowed = match user.role.as_str() {
        ROLE_ADMIN => true,
        ROLE_CUSTOMER => row.customer_id == user.id,
        // Pending requests are only readable by verified mechanics, the
        // same gate that hides the pending queue tab.
        ROLE_MECHANIC => {
            row.assigned_mechanic_id.as_deref() == Some(user.id.as_str())
                || (row.status == STATUS_PENDING
                    && mechanic::store::fetch_profile(&db_pool, &user.id)
                        .await?
                        .map(|p| p.is_verified)
                        .unwrap_or(false))
        }
        _ => false,
    };
    if !allowed {
        return Err(AppError::NotFound("request"));
    }
    Ok(Json(row))
}
