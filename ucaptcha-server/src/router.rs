//! HTTP router and middleware stack.

use std::sync::Arc;

use axum::routing::{post, put};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Assemble the uCaptcha HTTP surface: `POST /challenge`,
/// `POST /challenge/:id/validation`, `PUT /difficulty`, instrumented with
/// `tower_http`'s request tracing layer.
pub fn create(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/challenge", post(handlers::new_challenge))
        .route(
            "/challenge/{id}/validation",
            post(handlers::validate_challenge),
        )
        .route("/difficulty", put(handlers::set_difficulty))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
