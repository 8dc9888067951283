use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::{
        now_utc, MechanicRow, RequestRow, STATUS_ACCEPTED, STATUS_COMPLETED, STATUS_IN_PROGRESS,
        STATUS_PENDING,
    },
    requests, AppResult,
};

const PROFILE_COLUMNS: &str =
    "p.user_id, a.name, a.email, a.phone, p.specialization, p.experience_years, \
     p.is_verified, p.verified_at, p.verified_by, p.last_latitude, p.last_longitude";

pub async fn fetch_profile(pool: &SqlitePool, user_id: &str) -> AppResult<Option<MechanicRow>> {
    let row = sqlx::query_as::<_, MechanicRow>(&format!(
        "SELECT {PROFILE_COLUMNS} FROM mechanic_profiles p \
         JOIN accounts a ON a.id = p.user_id WHERE p.user_id = ?"
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn list_profiles(pool: &SqlitePool) -> AppResult<Vec<MechanicRow>> {
    let rows = sqlx::query_as::<_, MechanicRow>(&format!(
        "SELECT {PROFILE_COLUMNS} FROM mechanic_profiles p \
         JOIN accounts a ON a.id = p.user_id ORDER BY a.created_at DESC"
    ))
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Queue tabs are mutually exclusive: the open pending pool, the caller's
/// active work, the caller's finished work. Unverified mechanics see an
/// empty pending pool.
pub async fn list_queue(
    pool: &SqlitePool,
    mechanic_id: &str,
    tab: &str,
) -> AppResult<Vec<RequestRow>> {
    let base = "SELECT r.id, r.customer_id, r.vehicle_type, r.issue_type, r.issue_description, \
                r.vehicle_number, r.location, r.latitude, r.longitude, r.status, \
                r.assigned_mechanic_id, r.created_at, r.updated_at, \
                c.name AS customer_name, c.phone AS customer_phone, m.name AS mechanic_name \
                FROM service_requests r \
                JOIN accounts c ON c.id = r.customer_id \
                LEFT JOIN accounts m ON m.id = r.assigned_mechanic_id";

    let rows = match tab {
        "pending" => {
            let verified = fetch_profile(pool, mechanic_id)
                .await?
                .map(|p| p.is_verified)
                .unwrap_or(false);
            if !verified {
                return Ok(Vec::new());
            }
            sqlx::query_as::<_, RequestRow>(&format!(
                "{base} WHERE r.status = ? ORDER BY r.created_at ASC"
            ))
            .bind(STATUS_PENDING)
            .fetch_all(pool)
            .await?
        }
        "accepted" => {
            sqlx::query_as::<_, RequestRow>(&format!(
                "{base} WHERE r.status IN (?, ?) AND r.assigned_mechanic_id = ? \
                 ORDER BY r.updated_at DESC"
            ))
            .bind(STATUS_ACCEPTED)
            .bind(STATUS_IN_PROGRESS)
            .bind(mechanic_id)
            .fetch_all(pool)
            .await?
        }
        "completed" => {
            sqlx::query_as::<_, RequestRow>(&format!(
                "{base} WHERE r.status = ? AND r.assigned_mechanic_id = ? \
                 ORDER BY r.updated_at DESC"
            ))
            .bind(STATUS_COMPLETED)
            .bind(mechanic_id)
            .fetch_all(pool)
            .await?
        }
        other => {
            return Err(AppError::Validation(format!(
                "unknown queue tab '{other}', expected pending, accepted or completed"
            )))
        }
    };
    Ok(rows)
}

/// Guarded accept: the UPDATE only fires while the request is still
/// pending and unassigned, so a concurrent accept has exactly one winner
/// and the loser gets an explicit error instead of a silent overwrite.
pub async fn accept_request(
    pool: &SqlitePool,
    request_id: &str,
    mechanic_id: &str,
) -> AppResult<RequestRow> {
    let result = sqlx::query(
        "UPDATE service_requests SET status = ?, assigned_mechanic_id = ?, updated_at = ? \
         WHERE id = ? AND status = ? AND assigned_mechanic_id IS NULL",
    )
    .bind(STATUS_ACCEPTED)
    .bind(mechanic_id)
    .bind(now_utc())
    .bind(request_id)
    .bind(STATUS_PENDING)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return match requests::store::fetch_request(pool, request_id).await? {
            None => Err(AppError::NotFound("request")),
            Some(row) if row.assigned_mechanic_id.is_some() => Err(AppError::AlreadyAssigned),
            Some(_) => Err(AppError::Conflict("request is not pending")),
        };
    }

    requests::store::fetch_request(pool, request_id)
        .await?
        .ok_or(AppError::NotFound("request"))
}

/// Completion is restricted to the assignee while the work is active.
pub async fn complete_request(
    pool: &SqlitePool,
    request_id: &str,
    mechanic_id: &str,
) -> AppResult<RequestRow> {
    let result = sqlx::query(
        "UPDATE service_requests SET status = ?, updated_at = ? \
         WHERE id = ? AND assigned_mechanic_id = ? AND status IN (?, ?)",
    )
    .bind(STATUS_COMPLETED)
    .bind(now_utc())
    .bind(request_id)
    .bind(mechanic_id)
    .bind(STATUS_ACCEPTED)
    .bind(STATUS_IN_PROGRESS)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return match requests::store::fetch_request(pool, request_id).await? {
            None => Err(AppError::NotFound("request")),
            Some(row) if row.assigned_mechanic_id.is_none() => {
                Err(AppError::Conflict("request has not been accepted yet"))
            }
            Some(row) if row.assigned_mechanic_id.as_deref() != Some(mechanic_id) => {
                Err(AppError::Forbidden("request is assigned to another mechanic"))
            }
            Some(_) => Err(AppError::Conflict(
                "request cannot be completed in its current status",
            )),
        };
    }

    requests::store::fetch_request(pool, request_id)
        .await?
        .ok_or(AppError::NotFound("request"))
}

pub async fn update_location(
    pool: &SqlitePool,
    mechanic_id: &str,
    latitude: f64,
    longitude: f64,
) -> AppResult<()> {
    let result = sqlx::query(
        "UPDATE mechanic_profiles SET last_latitude = ?, last_longitude = ? WHERE user_id = ?",
    )
    .bind(latitude)
    .bind(longitude)
    .bind(mechanic_id)
    .execute(pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("mechanic profile"));
    }
    Ok(())
}

/// The mechanic's active assignments; each pairs them with the customer
/// whose tracking view should redraw.
pub async fn active_assignments(
    pool: &SqlitePool,
    mechanic_id: &str,
) -> AppResult<Vec<(String, String)>> {
    let rows = sqlx::query_as::<_, (String, String)>(
        "SELECT id, customer_id FROM service_requests \
         WHERE assigned_mechanic_id = ? AND status IN (?, ?)",
    )
    .bind(mechanic_id)
    .bind(STATUS_ACCEPTED)
    .bind(STATUS_IN_PROGRESS)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requests::store::{create_request, NewRequest};
    use crate::testutil;

    fn tyre_request() -> NewRequest {
        NewRequest {
            vehicle_type: "truck".into(),
            issue_type: "tyre".into(),
            issue_description: None,
            vehicle_number: None,
            location: "roadside".into(),
            latitude: Some(22.8),
            longitude: Some(86.2),
        }
    }

    #[tokio::test]
    async fn accept_assigns_exactly_one_winner() {
        let pool = testutil::pool().await;
        let customer = testutil::customer(&pool, "c@x.io").await;
        let mech_a = testutil::verified_mechanic(&pool, "a@x.io").await;
        let mech_b = testutil::verified_mechanic(&pool, "b@x.io").await;
        let row = create_request(&pool, &customer, tyre_request()).await.unwrap();

        let won = accept_request(&pool, &row.id, &mech_a).await.unwrap();
        assert_eq!(won.status, STATUS_ACCEPTED);
        assert_eq!(won.assigned_mechanic_id.as_deref(), Some(mech_a.as_str()));

        // The second accept must fail loudly, not overwrite.
        let lost = accept_request(&pool, &row.id, &mech_b).await.unwrap_err();
        assert!(matches!(lost, AppError::AlreadyAssigned));

        let after = requests::store::fetch_request(&pool, &row.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(after.assigned_mechanic_id.as_deref(), Some(mech_a.as_str()));
    }

    #[tokio::test]
    async fn accept_errors_when_not_pending() {
        let pool = testutil::pool().await;
        let customer = testutil::customer(&pool, "c@x.io").await;
        let mech = testutil::verified_mechanic(&pool, "m@x.io").await;
        let row = create_request(&pool, &customer, tyre_request()).await.unwrap();
        testutil::force_status(&pool, &row.id, "cancelled").await;

        let err = accept_request(&pool, &row.id, &mech).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn accept_on_missing_request_is_not_found() {
        let pool = testutil::pool().await;
        let mech = testutil::verified_mechanic(&pool, "m@x.io").await;
        let err = accept_request(&pool, "no-such-id", &mech).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn complete_requires_the_assignee() {
        let pool = testutil::pool().await;
        let customer = testutil::customer(&pool, "c@x.io").await;
        let mech_a = testutil::verified_mechanic(&pool, "a@x.io").await;
        let mech_b = testutil::verified_mechanic(&pool, "b@x.io").await;
        let row = create_request(&pool, &customer, tyre_request()).await.unwrap();

        // Completing before anyone accepted is a state conflict, not an
        // ownership problem.
        let err = complete_request(&pool, &row.id, &mech_a).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        accept_request(&pool, &row.id, &mech_a).await.unwrap();

        let err = complete_request(&pool, &row.id, &mech_b).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let done = complete_request(&pool, &row.id, &mech_a).await.unwrap();
        assert_eq!(done.status, STATUS_COMPLETED);

        // Completing twice is also an error.
        let err = complete_request(&pool, &row.id, &mech_a).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn complete_allowed_from_in_progress() {
        let pool = testutil::pool().await;
        let customer = testutil::customer(&pool, "c@x.io").await;
        let mech = testutil::verified_mechanic(&pool, "m@x.io").await;
        let row = create_request(&pool, &customer, tyre_request()).await.unwrap();
        accept_request(&pool, &row.id, &mech).await.unwrap();
        testutil::force_status(&pool, &row.id, STATUS_IN_PROGRESS).await;

        let done = complete_request(&pool, &row.id, &mech).await.unwrap();
        assert_eq!(done.status, STATUS_COMPLETED);
    }

    #[tokio::test]
    async fn queue_tabs_partition_by_status_and_assignee() {
        let pool = testutil::pool().await;
        let customer = testutil::customer(&pool, "c@x.io").await;
        let mech_a = testutil::verified_mechanic(&pool, "a@x.io").await;
        let mech_b = testutil::verified_mechanic(&pool, "b@x.io").await;

        let open = create_request(&pool, &customer, tyre_request()).await.unwrap();
        let claimed = create_request(&pool, &customer, tyre_request()).await.unwrap();
        accept_request(&pool, &claimed.id, &mech_a).await.unwrap();
        let finished = create_request(&pool, &customer, tyre_request()).await.unwrap();
        accept_request(&pool, &finished.id, &mech_a).await.unwrap();
        complete_request(&pool, &finished.id, &mech_a).await.unwrap();

        let pending = list_queue(&pool, &mech_a, "pending").await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, open.id);

        let accepted = list_queue(&pool, &mech_a, "accepted").await.unwrap();
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].id, claimed.id);

        // Another mechanic's work never shows in my tabs.
        assert!(list_queue(&pool, &mech_b, "accepted").await.unwrap().is_empty());
        assert!(list_queue(&pool, &mech_b, "completed").await.unwrap().is_empty());

        let completed = list_queue(&pool, &mech_a, "completed").await.unwrap();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].id, finished.id);

        assert!(list_queue(&pool, &mech_a, "bogus").await.is_err());
    }

    #[tokio::test]
    async fn unverified_mechanics_get_an_empty_pending_pool() {
        let pool = testutil::pool().await;
        let customer = testutil::customer(&pool, "c@x.io").await;
        let rookie = testutil::mechanic(&pool, "rookie@x.io").await;
        create_request(&pool, &customer, tyre_request()).await.unwrap();

        assert!(list_queue(&pool, &rookie, "pending").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn location_updates_keep_only_last_known() {
        let pool = testutil::pool().await;
        let mech = testutil::verified_mechanic(&pool, "m@x.io").await;

        update_location(&pool, &mech, 22.8, 86.2).await.unwrap();
        update_location(&pool, &mech, 22.9, 86.3).await.unwrap();

        let profile = fetch_profile(&pool, &mech).await.unwrap().unwrap();
        assert_eq!(profile.last_latitude, Some(22.9));
        assert_eq!(profile.last_longitude, Some(86.3));
    }
}
