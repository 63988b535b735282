mod handlers;

use axum::{routing::get, routing::post, Router};

use crate::core::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/assignments", get(handlers::list_assignments))
        .route("/assignments/:assignment_id", get(handlers::get_assignment))
        .route("/assignments/:assignment_id/autosave", post(handlers::autosave))
        .route("/assignments/:assignment_id/submit", post(handlers::submit))
}
