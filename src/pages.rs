use axum::{
    debug_handler,
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tower_sessions::Session;

use crate::{
    include_res,
    models::{ROLE_ADMIN, ROLE_CUSTOMER, ROLE_MECHANIC},
    res, session, AppConfig, AppResult, AppState, Markdown,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/services", get(services))
        .route("/contact", get(contact))
        .route("/privacy", get(privacy))
        .route("/terms", get(terms))
        .route("/style.css", get(res::stylesheet))
        .route("/request-mechanic", get(request_mechanic))
        .route("/customer-dashboard", get(customer_dashboard))
        .route("/mechanic-dashboard", get(mechanic_dashboard))
        .route("/admin-dashboard", get(admin_dashboard))
}

async fn home() -> impl IntoResponse {
    Html(include_res!(str, "/pages/index.html"))
}

async fn services() -> impl IntoResponse {
    Html(include_res!(str, "/pages/services.html"))
}

async fn contact() -> impl IntoResponse {
    Html(include_res!(str, "/pages/contact.html"))
}

async fn privacy() -> impl IntoResponse {
    Markdown(include_res!(str, "/pages/legal/privacy.md"))
}

async fn terms() -> impl IntoResponse {
    Markdown(include_res!(str, "/pages/legal/terms.md"))
}

/// Anonymous navigation to a gated page goes to `/login`; a wrong role
/// goes to its own dashboard home instead.
async fn role_page(session: &Session, role: &str, page: &'static str) -> AppResult<Response> {
    let Some(user) = session::current_user(session).await? else {
        return Ok(Redirect::to("/login").into_response());
    };
    if user.role != role {
        return Ok(Redirect::to(session::role_home(&user.role)).into_response());
    }
    Ok(Html(page).into_response())
}

#[debug_handler(state = crate::AppState)]
async fn request_mechanic(session: Session) -> AppResult<Response> {
    role_page(&session, ROLE_CUSTOMER, include_res!(str, "/pages/request_mechanic.html")).await
}

#[debug_handler(state = crate::AppState)]
async fn customer_dashboard(session: Session) -> AppResult<Response> {
    role_page(&session, ROLE_CUSTOMER, include_res!(str, "/pages/customer_dashboard.html")).await
}

#[debug_handler(state = crate::AppState)]
async fn mechanic_dashboard(session: Session) -> AppResult<Response> {
    role_page(&session, ROLE_MECHANIC, include_res!(str, "/pages/mechanic_dashboard.html")).await
}

#[debug_handler(state = crate::AppState)]
async fn admin_dashboard(session: Session) -> AppResult<Response> {
    role_page(&session, ROLE_ADMIN, include_res!(str, "/pages/admin_dashboard.html")).await
}

/// Publishable map token; `null` tells the tracking view to fall back to
/// its manual credential form.
#[debug_handler(state = crate::AppState)]
pub async fn map_config(State(config): State<AppConfig>) -> Json<serde_json::Value> {
    Json(json!({ "token": config.map_token }))
}
