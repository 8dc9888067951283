mod location;
mod transition;

pub mod store;

use axum::{routing::post, Router};

use crate::AppState;

pub use transition::{accept, complete};

pub fn router() -> Router<AppState> {
    Router::new().route("/location", post(location::update))
}
