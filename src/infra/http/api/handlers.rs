//! Read-only event and taxonomy endpoints.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;
use time::OffsetDateTime;

use crate::application::pagination::{CursorPage, EventCursor, PageRequest};
use crate::application::repos::{EventListScope, EventQueryFilter, RepoError};
use crate::util::timezone;

use super::error::{ApiError, codes};
use super::models::{EventItem, event_to_item, term_to_item};
use super::state::ApiState;

const DEFAULT_PAGE_SIZE: u32 = 20;

#[derive(Debug, Deserialize)]
pub struct EventListQuery {
    pub limit: Option<u32>,
    pub cursor: Option<String>,
    /// `published` (default) orders by publication recency; `dtstart` selects
    /// the upcoming listing. Unrecognised values fall back to the default.
    pub orderby: Option<String>,
    #[serde(rename = "events-tax")]
    pub events_tax: Option<String>,
    pub featured: Option<bool>,
}

pub async fn list_events(
    State(state): State<ApiState>,
    Query(query): Query<EventListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let settings = state
        .settings
        .load_site_settings()
        .await
        .map_err(repo_to_api)?;

    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, 100);
    let cursor = match query.cursor.as_deref().map(EventCursor::decode).transpose() {
        Ok(cursor) => cursor,
        Err(err) => {
            return Err(ApiError::new(
                StatusCode::BAD_REQUEST,
                codes::INVALID_CURSOR,
                "Invalid cursor",
                Some(err.to_string()),
            ));
        }
    };

    let scope = match query.orderby.as_deref() {
        Some("dtstart") => EventListScope::Upcoming {
            now: timezone::localized_wall_time(OffsetDateTime::now_utc(), settings.timezone),
        },
        _ => EventListScope::Recent,
    };

    let filter = EventQueryFilter {
        include_descendants: query.events_tax.is_some(),
        term: query.events_tax,
        featured: query.featured,
        ..EventQueryFilter::default()
    };

    let page = state
        .events
        .list_events(scope, &filter, PageRequest::new(limit, cursor))
        .await
        .map_err(repo_to_api)?;

    let items: Vec<EventItem> = page
        .items
        .iter()
        .map(|record| event_to_item(record, settings.timezone))
        .collect();

    Ok(Json(CursorPage::new(items, page.next_cursor)))
}

pub async fn get_event(
    State(state): State<ApiState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let event = state
        .events
        .find_by_slug(&slug)
        .await
        .map_err(repo_to_api)?;

    // Drafts stay invisible here just as on the public pages.
    match event {
        Some(event) if event.is_published() => {
            let settings = state
                .settings
                .load_site_settings()
                .await
                .map_err(repo_to_api)?;
            Ok(Json(event_to_item(&event, settings.timezone)))
        }
        _ => Err(ApiError::not_found("event not found")),
    }
}

pub async fn list_terms(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let terms = state.terms.list_all().await.map_err(repo_to_api)?;
    let items: Vec<_> = terms.iter().map(term_to_item).collect();
    Ok(Json(items))
}

fn repo_to_api(err: RepoError) -> ApiError {
    match err {
        RepoError::Duplicate { constraint } => ApiError::new(
            StatusCode::CONFLICT,
            codes::DUPLICATE,
            "Duplicate record",
            Some(constraint),
        ),
        RepoError::Pagination(p) => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_CURSOR,
            "Invalid cursor",
            Some(p.to_string()),
        ),
        RepoError::NotFound => ApiError::not_found("resource not found"),
        RepoError::InvalidInput { message } => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_INPUT,
            "Invalid input",
            Some(message),
        ),
        RepoError::Integrity { message } => ApiError::new(
            StatusCode::CONFLICT,
            codes::INTEGRITY,
            "Integrity constraint violated",
            Some(message),
        ),
        RepoError::Timeout => ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            codes::DB_TIMEOUT,
            "Database timeout",
            None,
        ),
        RepoError::Persistence(msg) => ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::REPO,
            "Persistence error",
            Some(msg),
        ),
    }
}
