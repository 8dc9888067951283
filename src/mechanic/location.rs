use axum::{
    debug_handler,
    extract::State,
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use sqlx::SqlitePool;
use tokio::sync::broadcast;
use tower_sessions::Session;

use crate::{
    error::AppError,
    events::ServerEvent,
    models::ROLE_MECHANIC,
    session, AppResult,
};

use super::store;

#[derive(Debug, Deserialize)]
pub(crate) struct LocationUpdate {
    latitude: f64,
    longitude: f64,
}

/// `POST /api/mechanics/location`. Overwrites the last-known position and
/// fans one event per active assignment so paired tracking views redraw.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn update(
    State(db_pool): State<SqlitePool>,
    State(events): State<broadcast::Sender<ServerEvent>>,
    session: Session,
    Json(LocationUpdate { latitude, longitude }): Json<LocationUpdate>,
) -> AppResult<StatusCode> {
    let user = session::require_role(&session, ROLE_MECHANIC).await?;
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err(AppError::Validation("coordinates out of range".into()));
    }

    store::update_location(&db_pool, &user.id, latitude, longitude).await?;

    for (request_id, customer_id) in store::active_assignments(&db_pool, &user.id).await? {
        let _ = events.send(ServerEvent::LocationUpdated {
            request_id,
            customer_id,
            mechanic_id: user.id.clone(),
            latitude,
            longitude,
        });
    }

    Ok(StatusCode::NO_CONTENT)
}
