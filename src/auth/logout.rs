use axum::{debug_handler, response::Redirect};
use tower_sessions::Session;

use crate::AppResult;

#[debug_handler(state = crate::AppState)]
pub(crate) async fn logout(session: Session) -> AppResult<Redirect> {
    session.clear().await;
    Ok(Redirect::to("/"))
}
