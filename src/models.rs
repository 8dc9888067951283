use serde::Serialize;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

pub const ROLE_CUSTOMER: &str = "customer";
pub const ROLE_MECHANIC: &str = "mechanic";
pub const ROLE_ADMIN: &str = "admin";

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_ACCEPTED: &str = "accepted";
pub const STATUS_IN_PROGRESS: &str = "in_progress";
pub const STATUS_COMPLETED: &str = "completed";
pub const STATUS_CANCELLED: &str = "cancelled";

pub const VEHICLE_TYPES: &[&str] = &["car", "bus", "truck"];
pub const ISSUE_TYPES: &[&str] = &["engine", "tyre", "battery", "breakdown", "other"];

pub fn now_utc() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AccountRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub role: String,
    pub password_hash: String,
    pub created_at: String,
}

/// Public shape of an account; never carries the password hash.
#[derive(Debug, Clone, Serialize)]
pub struct AccountInfo {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub role: String,
}

impl From<AccountRow> for AccountInfo {
    fn from(row: AccountRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            role: row.role,
        }
    }
}

/// A service request denormalized with the customer's display fields and
/// the assigned mechanic's name, the way every listing renders it.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RequestRow {
    pub id: String,
    pub customer_id: String,
    pub vehicle_type: String,
    pub issue_type: String,
    pub issue_description: Option<String>,
    pub vehicle_number: Option<String>,
    pub location: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub status: String,
    pub assigned_mechanic_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub mechanic_name: Option<String>,
}

impl RequestRow {
    pub fn is_terminal(&self) -> bool {
        self.status == STATUS_COMPLETED || self.status == STATUS_CANCELLED
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MechanicRow {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub specialization: String,
    pub experience_years: i64,
    pub is_verified: bool,
    pub verified_at: Option<String>,
    pub verified_by: Option<String>,
    pub last_latitude: Option<f64>,
    pub last_longitude: Option<f64>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ReviewRow {
    pub id: String,
    pub request_id: String,
    pub mechanic_id: String,
    pub customer_id: String,
    pub rating: i64,
    pub review_text: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct NotificationRow {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub message: String,
    pub request_id: Option<String>,
    pub is_read: bool,
    pub created_at: String,
}
