use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    auth::password::hash_password,
    db,
    models::{now_utc, ROLE_ADMIN, ROLE_CUSTOMER, ROLE_MECHANIC},
};

pub(crate) async fn pool() -> SqlitePool {
    db::connect_memory().await.expect("in-memory pool")
}

async fn account(pool: &SqlitePool, email: &str, name: &str, role: &str) -> String {
    let id = Uuid::now_v7().to_string();
    let hash = hash_password("hunter2hunter2").expect("hash");
    sqlx::query(
        "INSERT INTO accounts (id, name, email, phone, role, password_hash, created_at) \
         VALUES (?, ?, ?, '', ?, ?, ?)",
    )
    .bind(&id)
    .bind(name)
    .bind(email)
    .bind(role)
    .bind(hash)
    .bind(now_utc())
    .execute(pool)
    .await
    .expect("insert account");
    id
}

pub(crate) async fn customer(pool: &SqlitePool, email: &str) -> String {
    account(pool, email, "Cass Customer", ROLE_CUSTOMER).await
}

pub(crate) async fn admin(pool: &SqlitePool) -> String {
    account(pool, "admin@x.io", "Ada Admin", ROLE_ADMIN).await
}

/// Mechanic account with an unverified profile.
pub(crate) async fn mechanic(pool: &SqlitePool, email: &str) -> String {
    let id = account(pool, email, "Mo Mechanic", ROLE_MECHANIC).await;
    sqlx::query(
        "INSERT INTO mechanic_profiles (user_id, specialization, experience_years) \
         VALUES (?, 'engines', 4)",
    )
    .bind(&id)
    .execute(pool)
    .await
    .expect("insert profile");
    id
}

pub(crate) async fn verified_mechanic(pool: &SqlitePool, email: &str) -> String {
    let id = mechanic(pool, email).await;
    sqlx::query(
        "UPDATE mechanic_profiles SET is_verified = 1, verified_at = ?, verified_by = 'seed' \
         WHERE user_id = ?",
    )
    .bind(now_utc())
    .bind(&id)
    .execute(pool)
    .await
    .expect("verify profile");
    id
}

/// Drive a request into an arbitrary status, bypassing the guards, for
/// tests that start mid-lifecycle.
pub(crate) async fn force_status(pool: &SqlitePool, request_id: &str, status: &str) {
    sqlx::query("UPDATE service_requests SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status)
        .bind(now_utc())
        .bind(request_id)
        .execute(pool)
        .await
        .expect("force status");
}
