mod events;
mod health;
mod settings;
mod shared;
mod state;
mod terms;

pub use state::AdminState;

use axum::{
    Router,
    middleware,
    response::Redirect,
    routing::{get, post},
};

use super::middleware::{log_responses, set_request_context};

pub fn build_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/", get(|| async { Redirect::to("/events") }))
        .route("/events", get(events::admin_events))
        .route("/events/new", get(events::admin_event_new))
        .route("/events/create", post(events::admin_event_create))
        .route(
            "/events/{id}/edit",
            get(events::admin_event_edit).post(events::admin_event_update),
        )
        .route("/events/{id}/delete", post(events::admin_event_delete))
        .route("/terms", get(terms::admin_terms))
        .route("/terms/create", post(terms::admin_term_create))
        .route("/terms/{id}/delete", post(terms::admin_term_delete))
        .route(
            "/settings/edit",
            get(settings::admin_settings_edit).post(settings::admin_settings_update),
        )
        .route("/settings", get(|| async { Redirect::to("/settings/edit") }))
        .route("/_health/db", get(health::admin_health))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}
