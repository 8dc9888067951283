mod cancel;
mod list;
mod submit;
mod track;

pub mod store;

use axum::{
    routing::{get, post},
    Router,
};

use crate::{mechanic, reviews, AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(submit::create).get(list::list))
        .route("/{id}", get(list::get_one))
        .route("/{id}/cancel", post(cancel::cancel))
        .route("/{id}/accept", post(mechanic::accept))
        .route("/{id}/complete", post(mechanic::complete))
        .route("/{id}/track", get(track::track))
        .route("/{id}/review", get(reviews::get_review).post(reviews::submit_review))
}
