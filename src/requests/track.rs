use axum::{
    debug_handler,
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{
    error::AppError,
    mechanic,
    models::{ROLE_ADMIN, ROLE_CUSTOMER, ROLE_MECHANIC},
    session, AppResult,
};

use super::store;

/// Last-known positions of both parties; no history is kept.
#[derive(Debug, Serialize)]
pub(crate) struct TrackView {
    request_id: String,
    status: String,
    customer_name: Option<String>,
    customer_latitude: Option<f64>,
    customer_longitude: Option<f64>,
    mechanic_name: Option<String>,
    mechanic_latitude: Option<f64>,
    mechanic_longitude: Option<f64>,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn track(
    State(db_pool): State<SqlitePool>,
    Path(id): Path<String>,
    session: Session,
) -> AppResult<Json<TrackView>> {
    let user = session::require_user(&session).await?;
    let row = store::fetch_request(&db_pool, &id)
        .await?
        .ok_or(AppError::NotFound("request"))?;

    let allowed = match user.role.as_str() {
        ROLE_ADMIN => true,
        ROLE_CUSTOMER => row.customer_id == user.id,
        ROLE_MECHANIC => row.assigned_mechanic_id.as_deref() == Some(user.id.as_str()),
        _ => false,
    };
    if !allowed {
        return Err(AppError::NotFound("request"));
    }

    let mechanic_profile = match row.assigned_mechanic_id.as_deref() {
        Some(mechanic_id) => mechanic::store::fetch_profile(&db_pool, mechanic_id).await?,
        None => None,
    };

    Ok(Json(TrackView {
        request_id: row.id,
        status: row.status,
        customer_name: row.customer_name,
        customer_latitude: row.latitude,
        customer_longitude: row.longitude,
        mechanic_name: row.mechanic_name,
        mechanic_latitude: mechanic_profile.as_ref().and_then(|p| p.last_latitude),
        mechanic_longitude: mechanic_profile.as_ref().and_then(|p| p.last_longitude),
    }))
}
