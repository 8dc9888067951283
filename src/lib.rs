pub mod admin;
pub mod auth;
pub mod db;
pub mod error;
pub mod events;
pub mod mechanic;
pub mod models;
pub mod notifications;
pub mod pages;
pub mod requests;
pub mod res;
pub mod reviews;
pub mod session;
pub mod ws;

#[cfg(test)]
pub(crate) mod testutil;

use std::ops::Deref;

use axum::{
    extract::FromRef,
    response::{Html, IntoResponse},
    routing::get,
    Router,
};
use sqlx::SqlitePool;
use tokio::sync::broadcast;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tower_sessions::{cookie::SameSite, Expiry, MemoryStore, SessionManagerLayer};

pub use error::{AppError, AppResult};
use events::ServerEvent;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub events: broadcast::Sender<ServerEvent>,
    pub config: AppConfig,
}

#[derive(Clone, Default)]
pub struct AppConfig {
    /// Publishable map-provider token handed to the tracking view.
    /// Absent means the page falls back to a manual credential form.
    pub map_token: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            map_token: dotenv::var("MAP_TOKEN").ok().filter(|t| !t.trim().is_empty()),
        }
    }
}

/// The full application router, session layer included, so integration
/// tests serve the exact same stack as `main`.
pub fn app(state: AppState) -> Router {
    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(false)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::hours(2)));

    let api = Router::new()
        .nest("/requests", requests::router())
        .nest("/mechanics", mechanic::router())
        .nest("/notifications", notifications::router())
        .nest("/admin", admin::router())
        .route("/me", get(auth::me))
        .route("/config/map", get(pages::map_config));

    Router::new()
        .merge(pages::router())
        .merge(auth::router())
        .nest("/api", api)
        .route("/ws", get(ws::events_ws))
        .with_state(state)
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

pub struct Markdown<T>(pub T);

impl<T> IntoResponse for Markdown<T>
where
    T: Deref<Target = str>,
{
    fn into_response(self) -> axum::response::Response {
        let mut html_output = String::new();
        pulldown_cmark::html::push_html(&mut html_output, pulldown_cmark::Parser::new(&self.0));
        Html(html_output).into_response()
    }
}
