use axum::{
    debug_handler,
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tokio::sync::broadcast;
use tower_sessions::Session;

use crate::{
    error::AppError,
    events::ServerEvent,
    mechanic,
    models::{now_utc, MechanicRow, RequestRow, ROLE_ADMIN, STATUS_COMPLETED, STATUS_PENDING},
    notifications, requests, session, AppResult, AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/overview", get(overview))
        .route("/mechanics/{user_id}/verify", post(set_verification))
}

#[derive(Debug, Serialize)]
pub(crate) struct OverviewStats {
    total_requests: i64,
    pending_requests: i64,
    completed_requests: i64,
    total_mechanics: i64,
    verified_mechanics: i64,
    total_customers: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct Overview {
    stats: OverviewStats,
    requests: Vec<RequestRow>,
    mechanics: Vec<MechanicRow>,
}

/// `GET /api/admin/overview`, the read-only oversight listing, joined
/// server-side so names arrive denormalized.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn overview(
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<Json<Overview>> {
    session::require_role(&session, ROLE_ADMIN).await?;

    let requests = requests::store::list_all(&db_pool).await?;
    let mechanics = mechanic::store::list_profiles(&db_pool).await?;
    let total_customers: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM accounts WHERE role = 'customer'")
            .fetch_one(&db_pool)
            .await?;

    let stats = OverviewStats {
        total_requests: requests.len() as i64,
        pending_requests: requests.iter().filter(|r| r.status == STATUS_PENDING).count() as i64,
        completed_requests: requests
            .iter()
            .filter(|r| r.status == STATUS_COMPLETED)
            .count() as i64,
        total_mechanics: mechanics.len() as i64,
        verified_mechanics: mechanics.iter().filter(|m| m.is_verified).count() as i64,
        total_customers,
    };

    Ok(Json(Overview {
        stats,
        requests,
        mechanics,
    }))
}

#[derive(Debug, Deserialize)]
pub(crate) struct VerifyInput {
    verified: bool,
}

/// `POST /api/admin/mechanics/{user_id}/verify`, the boolean gate on
/// mechanic visibility. Verifying stamps who and when; revoking clears
/// both.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn set_verification(
    State(db_pool): State<SqlitePool>,
    State(events): State<broadcast::Sender<ServerEvent>>,
    Path(user_id): Path<String>,
    session: Session,
    Json(VerifyInput { verified }): Json<VerifyInput>,
) -> AppResult<Json<MechanicRow>> {
    let admin = session::require_role(&session, ROLE_ADMIN).await?;
    let profile = apply_verification(&db_pool, &user_id, &admin.id, verified).await?;
    tracing::info!(mechanic_id = %user_id, verified, "verification changed");

    let (title, message) = if verified {
        ("Account verified", "Your mechanic account was verified. You can now accept requests.")
    } else {
        ("Verification revoked", "Your mechanic account verification was revoked.")
    };
    notifications::notify(&db_pool, &events, &user_id, title, message, None).await?;

    Ok(Json(profile))
}

pub async fn apply_verification(
    pool: &SqlitePool,
    mechanic_user_id: &str,
    admin_id: &str,
    verified: bool,
) -> AppResult<MechanicRow> {
    let result = if verified {
        sqlx::query(
            "UPDATE mechanic_profiles SET is_verified = 1, verified_at = ?, verified_by = ? \
             WHERE user_id = ?",
        )
        .bind(now_utc())
        .bind(admin_id)
        .bind(mechanic_user_id)
        .execute(pool)
        .await?
    } else {
        sqlx::query(
            "UPDATE mechanic_profiles SET is_verified = 0, verified_at = NULL, verified_by = NULL \
             WHERE user_id = ?",
        )
        .bind(mechanic_user_id)
        .execute(pool)
        .await?
    };

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("mechanic"));
    }

    mechanic::store::fetch_profile(pool, mechanic_user_id)
        .await?
        .ok_or(AppError::NotFound("mechanic"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;

    #[tokio::test]
    async fn verify_then_revoke_clears_the_stamp() {
        let pool = testutil::pool().await;
        let admin = testutil::admin(&pool).await;
        let mech = testutil::mechanic(&pool, "m@x.io").await;

        let verified = apply_verification(&pool, &mech, &admin, true).await.unwrap();
        assert!(verified.is_verified);
        assert!(verified.verified_at.is_some());
        assert_eq!(verified.verified_by.as_deref(), Some(admin.as_str()));

        let revoked = apply_verification(&pool, &mech, &admin, false).await.unwrap();
        assert!(!revoked.is_verified);
        assert_eq!(revoked.verified_at, None);
        assert_eq!(revoked.verified_by, None);
    }

    #[tokio::test]
    async fn verifying_a_missing_mechanic_is_not_found() {
        let pool = testutil::pool().await;
        let admin = testutil::admin(&pool).await;
        let err = apply_verification(&pool, "nobody", &admin, true)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
