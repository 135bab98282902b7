use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;

use crate::application::error::HttpError;
use crate::application::pagination::EventCursor;

/// Query parameters shared by the admin list pages. Write handlers
/// redirect back with a `notice` code naming the outcome.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct AdminListQuery {
    pub(super) cursor: Option<String>,
    pub(super) search: Option<String>,
    pub(super) notice: Option<String>,
}

pub(super) fn blank_to_none_opt(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

pub(super) fn redirect_with_notice(path: &str, code: &str) -> Response {
    Redirect::to(&format!("{path}?notice={code}")).into_response()
}

pub(super) fn decode_cursor(
    raw: Option<&str>,
    source: &'static str,
) -> Result<Option<EventCursor>, HttpError> {
    match raw {
        Some(value) if !value.is_empty() => {
            EventCursor::decode(value).map(Some).map_err(|err| {
                HttpError::new(
                    source,
                    StatusCode::BAD_REQUEST,
                    "Invalid cursor",
                    err.to_string(),
                )
            })
        }
        _ => Ok(None),
    }
}
