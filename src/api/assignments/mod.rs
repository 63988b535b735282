mod handlers;

use axum::{routing::get, routing::post, Router};

use crate::core::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_assignment))
        .route("/:assignment_id", get(handlers::get_assignment).put(handlers::update_assignment))
        .route("/:assignment_id/submissions", get(handlers::list_submissions))
}

#[cfg(test)]
mod tests;
