pub mod error;
pub mod handlers;
pub mod models;
pub mod state;

pub use state::ApiState;

use axum::{Router, middleware as axum_middleware, routing::get};

use crate::infra::http::RouterState;
use crate::infra::http::middleware::log_responses;

pub fn build_api_router(state: RouterState) -> Router<RouterState> {
    Router::new()
        .route("/api/v1/events", get(handlers::list_events))
        .route("/api/v1/events/{slug}", get(handlers::get_event))
        .route("/api/v1/terms", get(handlers::list_terms))
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
}
