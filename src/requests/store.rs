use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{now_utc, RequestRow, STATUS_ACCEPTED, STATUS_CANCELLED, STATUS_PENDING},
    AppResult,
};

const REQUEST_COLUMNS: &str =
    "r.id, r.customer_id, r.vehicle_type, r.issue_type, r.issue_description, \
     r.vehicle_number, r.location, r.latitude, r.longitude, r.status, \
     r.assigned_mechanic_id, r.created_at, r.updated_at, \
     c.name AS customer_name, c.phone AS customer_phone, \
     m.name AS mechanic_name";

fn select_request(filter: &str) -> String {
    format!(
        "SELECT {REQUEST_COLUMNS} FROM service_requests r \
         JOIN accounts c ON c.id = r.customer_id \
         LEFT JOIN accounts m ON m.id = r.assigned_mechanic_id \
         {filter}"
    )
}

#[derive(Debug)]
pub struct NewRequest {
    pub vehicle_type: String,
    pub issue_type: String,
    pub issue_description: Option<String>,
    pub vehicle_number: Option<String>,
    pub location: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Inserts exactly one pending, unassigned request.
pub async fn create_request(
    pool: &SqlitePool,
    customer_id: &str,
    input: NewRequest,
) -> AppResult<RequestRow> {
    let id = Uuid::now_v7().to_string();
    let now = now_utc();
    sqlx::query(
        "INSERT INTO service_requests \
         (id, customer_id, vehicle_type, issue_type, issue_description, vehicle_number, \
          location, latitude, longitude, status, assigned_mechanic_id, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, NULL, ?, ?)",
    )
    .bind(&id)
    .bind(customer_id)
    .bind(&input.vehicle_type)
    .bind(&input.issue_type)
    .bind(input.issue_description.as_deref())
    .bind(input.vehicle_number.as_deref())
    .bind(&input.location)
    .bind(input.latitude)
    .bind(input.longitude)
    .bind(STATUS_PENDING)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    fetch_request(pool, &id)
        .await?
        .ok_or(AppError::NotFound("request"))
}

pub async fn fetch_request(pool: &SqlitePool, request_id: &str) -> AppResult<Option<RequestRow>> {
    let row = sqlx::query_as::<_, RequestRow>(&select_request("WHERE r.id = ?"))
        .bind(request_id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn list_for_customer(pool: &SqlitePool, customer_id: &str) -> AppResult<Vec<RequestRow>> {
    let rows = sqlx::query_as::<_, RequestRow>(&select_request(
        "WHERE r.customer_id = ? ORDER BY r.created_at DESC",
    ))
    .bind(customer_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn list_all(pool: &SqlitePool) -> AppResult<Vec<RequestRow>> {
    let rows = sqlx::query_as::<_, RequestRow>(&select_request("ORDER BY r.created_at DESC"))
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Customer-initiated cancellation, valid while the request is still
/// pending or accepted. The update is guarded so a concurrent transition
/// never gets silently overwritten.
pub async fn cancel_request(
    pool: &SqlitePool,
    request_id: &str,
    customer_id: &str,
) -> AppResult<RequestRow> {
    let result = sqlx::query(
        "UPDATE service_requests SET status = ?, updated_at = ? \
         WHERE id = ? AND customer_id = ? AND status IN (?, ?)",
    )
    .bind(STATUS_CANCELLED)
    .bind(now_utc())
    .bind(request_id)
    .bind(customer_id)
    .bind(STATUS_PENDING)
    .bind(STATUS_ACCEPTED)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return match fetch_request(pool, request_id).await? {
            Some(row) if row.customer_id == customer_id => {
                Err(AppError::Conflict("request can no longer be cancelled"))
            }
            _ => Err(AppError::NotFound("request")),
        };
    }

    fetch_request(pool, request_id)
        .await?
        .ok_or(AppError::NotFound("request"))
}
