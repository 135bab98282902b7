use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::{Path, Query, State},
    http::{Request, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;

use crate::{
    application::{agenda::AgendaService, chrome::ChromeService, error::HttpError},
    infra::db::PostgresRepositories,
    presentation::views::{
        EventDetailContext, EventTemplate, IndexTemplate, LayoutChrome, LayoutContext,
        PageMetaView, render_not_found_response, render_template_response,
    },
};

use super::{
    RouterState, db_health_response,
    middleware::{log_responses, set_request_context},
};

#[derive(Clone)]
pub struct HttpState {
    pub agenda: Arc<AgendaService>,
    pub chrome: Arc<ChromeService>,
    pub db: Arc<PostgresRepositories>,
}

pub fn build_router(state: RouterState) -> Router<RouterState> {
    Router::new()
        .route("/", get(index))
        .route("/events/{slug}", get(event_detail))
        .route("/_health/db", get(public_health))
        .fallback(fallback_router)
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CursorQuery {
    cursor: Option<String>,
}

async fn index(State(state): State<HttpState>, Query(query): Query<CursorQuery>) -> Response {
    let chrome = match state.chrome.load().await {
        Ok(chrome) => chrome,
        Err(err) => return err.into_response(),
    };

    match state.agenda.front_page(query.cursor.as_deref()).await {
        Ok(content) => {
            let canonical = canonical_url(&chrome.meta.canonical, "/");
            let view = LayoutContext::new(chrome.clone().with_canonical(canonical), content);
            render_template_response(IndexTemplate { view }, StatusCode::OK)
        }
        Err(err) => HttpError::from(err).into_response(),
    }
}

async fn event_detail(State(state): State<HttpState>, Path(slug): Path<String>) -> Response {
    let chrome = match state.chrome.load().await {
        Ok(chrome) => chrome,
        Err(err) => return err.into_response(),
    };

    match state.agenda.event_detail(&slug).await {
        Ok(Some(content)) => {
            let canonical = canonical_url(&chrome.meta.canonical, &format!("/events/{slug}"));
            let meta = event_meta(&chrome, &content, canonical);
            let view = LayoutContext::new(chrome.clone().with_meta(meta), content);
            render_template_response(EventTemplate { view }, StatusCode::OK)
        }
        Ok(None) => render_not_found_response(chrome),
        Err(err) => HttpError::from(err).into_response(),
    }
}

async fn public_health(State(state): State<HttpState>) -> Response {
    db_health_response(state.db.health_check().await)
}

async fn fallback_router(State(state): State<HttpState>, _request: Request<Body>) -> Response {
    match state.chrome.load().await {
        Ok(chrome) => render_not_found_response(chrome),
        Err(err) => err.into_response(),
    }
}

pub(crate) fn event_meta(
    chrome: &LayoutChrome,
    content: &EventDetailContext,
    canonical: String,
) -> PageMetaView {
    let derived = summarize_html(&content.content_html, 180);
    let description = fallback_description(&derived, &chrome.meta.description);

    chrome
        .meta
        .clone()
        .with_canonical(canonical)
        .with_content(content.title.clone(), description)
}

fn fallback_description(candidate: &str, fallback: &str) -> String {
    let trimmed = candidate.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

fn summarize_html(html: &str, max_len: usize) -> String {
    let mut text = String::with_capacity(max_len);
    let mut in_tag = false;
    let mut last_was_space = false;

    for ch in html.chars() {
        match ch {
            '<' => {
                in_tag = true;
                continue;
            }
            '>' => {
                in_tag = false;
                last_was_space = false;
                continue;
            }
            _ if in_tag => continue,
            c if c.is_whitespace() => {
                if !last_was_space && !text.is_empty() {
                    text.push(' ');
                }
                last_was_space = true;
            }
            c => {
                text.push(c);
                last_was_space = false;
            }
        }

        if text.len() >= max_len {
            break;
        }
    }

    text.trim().to_string()
}

pub(crate) fn canonical_url(base: &str, path: &str) -> String {
    let root = normalize_public_site_url(base);
    let trimmed = path.trim_start_matches('/');
    if trimmed.is_empty() {
        root.clone()
    } else {
        format!("{root}{trimmed}")
    }
}

fn normalize_public_site_url(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    format!("{trimmed}/")
}
