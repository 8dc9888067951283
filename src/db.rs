use std::{fs, path::Path, str::FromStr};

use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use uuid::Uuid;

use crate::{
    auth::password::hash_password,
    models::{now_utc, ROLE_ADMIN},
};

pub async fn connect(db_url: &str) -> anyhow::Result<SqlitePool> {
    ensure_sqlite_dir(db_url)?;
    let options = SqliteConnectOptions::from_str(db_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(16)
        .connect_with(options)
        .await?;
    Ok(pool)
}

/// In-memory database with the schema applied. A single connection keeps
/// every query on the same `:memory:` instance; used by the test suites.
pub async fn connect_memory() -> anyhow::Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    run_migrations(&pool).await?;
    Ok(pool)
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

pub fn ensure_sqlite_dir(db_url: &str) -> std::io::Result<()> {
    let path = if let Some(path) = db_url.strip_prefix("sqlite://") {
        path
    } else if let Some(path) = db_url.strip_prefix("sqlite:") {
        path
    } else {
        return Ok(());
    };

    let path = path.split('?').next().unwrap_or(path);
    if path == ":memory:" || path.is_empty() {
        return Ok(());
    }

    let path = path.strip_prefix("file:").unwrap_or(path);
    if let Some(parent) = Path::new(path).parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Admin accounts are never self-served; exactly one is seeded from the
/// environment on first startup.
pub async fn seed_admin(pool: &SqlitePool) -> anyhow::Result<()> {
    let existing = sqlx::query_as::<_, (String,)>("SELECT id FROM accounts WHERE role = ? LIMIT 1")
        .bind(ROLE_ADMIN)
        .fetch_optional(pool)
        .await?;
    if existing.is_some() {
        return Ok(());
    }

    let email = dotenv::var("ADMIN_EMAIL").unwrap_or_else(|_| "admin@mechlink.local".to_string());
    let password = dotenv::var("ADMIN_PASSWORD").unwrap_or_else(|_| "admin".to_string());
    let name = dotenv::var("ADMIN_NAME").unwrap_or_else(|_| "MechLink Admin".to_string());

    if password == "admin" {
        tracing::warn!("ADMIN_PASSWORD not set; seeding with the default password");
    }

    let password_hash = hash_password(&password)?;
    sqlx::query(
        "INSERT INTO accounts (id, name, email, phone, role, password_hash, created_at) \
         VALUES (?, ?, ?, '', ?, ?, ?)",
    )
    .bind(Uuid::now_v7().to_string())
    .bind(&name)
    .bind(&email)
    .bind(ROLE_ADMIN)
    .bind(password_hash)
    .bind(now_utc())
    .execute(pool)
    .await?;

    tracing::info!(%email, "seeded admin account");
    Ok(())
}
