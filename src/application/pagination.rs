//! Shared cursor pagination helpers.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{OffsetDateTime, PrimitiveDateTime};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum CursorScope {
    Upcoming,
    Recent,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct EventCursorPayload {
    scope: CursorScope,
    start_wall: Option<PrimitiveDateTime>,
    stamp: Option<OffsetDateTime>,
    id: Uuid,
}

/// Cursor for paginating events across the public, API and admin listings.
///
/// Upcoming cursors carry the wall-clock start the page left off at; the
/// publication- and revision-ordered listings carry a timestamp instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventCursor {
    scope: CursorScope,
    start_wall: Option<PrimitiveDateTime>,
    stamp: Option<OffsetDateTime>,
    id: Uuid,
}

impl EventCursor {
    /// Construct a cursor for the upcoming listing (soonest start first).
    pub fn upcoming(start_wall: PrimitiveDateTime, id: Uuid) -> Self {
        Self {
            scope: CursorScope::Upcoming,
            start_wall: Some(start_wall),
            stamp: None,
            id,
        }
    }

    /// Construct a cursor for the publication-ordered listing.
    pub fn recent(published_at: OffsetDateTime, id: Uuid) -> Self {
        Self {
            scope: CursorScope::Recent,
            start_wall: None,
            stamp: Some(published_at),
            id,
        }
    }

    /// Construct a cursor for the admin listing (latest change first).
    pub fn admin(updated_at: OffsetDateTime, id: Uuid) -> Self {
        Self {
            scope: CursorScope::Admin,
            start_wall: None,
            stamp: Some(updated_at),
            id,
        }
    }

    pub fn start_wall(&self) -> Option<PrimitiveDateTime> {
        self.start_wall
    }

    pub fn stamp(&self) -> Option<OffsetDateTime> {
        self.stamp
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn encode(&self) -> String {
        let payload = EventCursorPayload {
            scope: self.scope,
            start_wall: self.start_wall,
            stamp: self.stamp,
            id: self.id,
        };
        let serialized =
            serde_json::to_vec(&payload).expect("serializing event cursor payload should succeed");
        URL_SAFE_NO_PAD.encode(serialized)
    }

    pub fn decode(cursor: &str) -> Result<Self, PaginationError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(cursor)
            .map_err(|err| PaginationError::InvalidCursor(err.to_string()))?;
        let payload: EventCursorPayload = serde_json::from_slice(&bytes)
            .map_err(|err| PaginationError::InvalidCursor(err.to_string()))?;
        Ok(Self {
            scope: payload.scope,
            start_wall: payload.start_wall,
            stamp: payload.stamp,
            id: payload.id,
        })
    }
}

/// Cursor-aware pagination request.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest<C> {
    pub limit: u32,
    pub cursor: Option<C>,
}

impl<C> PageRequest<C> {
    pub fn new(limit: u32, cursor: Option<C>) -> Self {
        Self { limit, cursor }
    }
}

/// Cursor-aware page result.
#[derive(Debug, Clone, Serialize)]
pub struct CursorPage<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

impl<T> CursorPage<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            next_cursor: None,
        }
    }

    pub fn new(items: Vec<T>, next_cursor: Option<String>) -> Self {
        Self { items, next_cursor }
    }
}

#[derive(Debug, Error)]
pub enum PaginationError {
    #[error("invalid cursor: {0}")]
    InvalidCursor(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn upcoming_cursor_round_trip() {
        let id = Uuid::new_v4();
        let start = datetime!(2024-05-01 09:00:00);
        let cursor = EventCursor::upcoming(start, id);
        let decoded = EventCursor::decode(&cursor.encode()).expect("decoded cursor");

        assert_eq!(decoded.start_wall(), Some(start));
        assert_eq!(decoded.stamp(), None);
        assert_eq!(decoded.id(), id);
    }

    #[test]
    fn recent_cursor_round_trip() {
        let id = Uuid::new_v4();
        let when = OffsetDateTime::now_utc();
        let cursor = EventCursor::recent(when, id);
        let decoded = EventCursor::decode(&cursor.encode()).expect("decoded cursor");

        assert_eq!(decoded.stamp(), Some(when));
        assert_eq!(decoded.start_wall(), None);
        assert_eq!(decoded.id(), id);
    }

    #[test]
    fn admin_cursor_round_trip() {
        let id = Uuid::new_v4();
        let when = OffsetDateTime::now_utc();
        let cursor = EventCursor::admin(when, id);
        let decoded = EventCursor::decode(&cursor.encode()).expect("decoded cursor");

        assert_eq!(decoded.stamp(), Some(when));
        assert_eq!(decoded.id(), id);
    }

    #[test]
    fn decoding_invalid_cursor_reports_error() {
        let err = EventCursor::decode("not-base64").expect_err("invalid cursor rejected");
        assert!(matches!(err, PaginationError::InvalidCursor(_)));
    }
}
