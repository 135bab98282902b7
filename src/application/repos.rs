//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};
use uuid::Uuid;

use crate::application::pagination::{CursorPage, EventCursor, PageRequest, PaginationError};
use crate::domain::entities::{EventRecord, GeoPoint, SiteSettingsRecord, TermRecord};
use crate::domain::types::{AttendanceMode, EventStatus};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
    #[error(transparent)]
    Pagination(#[from] PaginationError),
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Listing scope for events.
#[derive(Debug, Clone, Copy)]
pub enum EventListScope {
    /// Published events that have not finished, soonest start first.
    ///
    /// `now` is the caller's wall-clock reading in the site timezone so the
    /// comparison happens in the same frame the schedule is stored in.
    Upcoming { now: PrimitiveDateTime },
    /// Published events, newest publication first.
    Recent,
    /// Every event including drafts, latest change first.
    Admin,
}

#[derive(Debug, Clone, Default)]
pub struct EventQueryFilter {
    /// Taxonomy term slug to filter by.
    pub term: Option<String>,
    /// Widen the term filter to the whole subtree beneath it.
    pub include_descendants: bool,
    pub featured: Option<bool>,
    pub search: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateEventParams {
    pub slug: String,
    pub title: String,
    pub content_html: String,
    pub image_url: Option<String>,
    pub attendance_mode: AttendanceMode,
    pub status: EventStatus,
    pub start_date: Option<Date>,
    pub start_time: Option<Time>,
    pub end_date: Option<Date>,
    pub end_time: Option<Time>,
    pub full_day: bool,
    pub dtstart: Option<PrimitiveDateTime>,
    pub dtend: Option<PrimitiveDateTime>,
    pub location: String,
    pub location_url: String,
    pub virtual_location_name: String,
    pub geo: Option<GeoPoint>,
    pub featured: bool,
    pub published_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone)]
pub struct UpdateEventParams {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub content_html: String,
    pub image_url: Option<String>,
    pub attendance_mode: AttendanceMode,
    pub status: EventStatus,
    pub start_date: Option<Date>,
    pub start_time: Option<Time>,
    pub end_date: Option<Date>,
    pub end_time: Option<Time>,
    pub full_day: bool,
    pub dtstart: Option<PrimitiveDateTime>,
    pub dtend: Option<PrimitiveDateTime>,
    pub location: String,
    pub location_url: String,
    pub virtual_location_name: String,
    pub geo: Option<GeoPoint>,
    pub featured: bool,
    pub published_at: Option<OffsetDateTime>,
}

#[async_trait]
pub trait EventsRepo: Send + Sync {
    async fn list_events(
        &self,
        scope: EventListScope,
        filter: &EventQueryFilter,
        page: PageRequest<EventCursor>,
    ) -> Result<CursorPage<EventRecord>, RepoError>;

    async fn count_events(
        &self,
        scope: EventListScope,
        filter: &EventQueryFilter,
    ) -> Result<u64, RepoError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<EventRecord>, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<EventRecord>, RepoError>;
}

#[async_trait]
pub trait EventsWriteRepo: Send + Sync {
    async fn create_event(&self, params: CreateEventParams) -> Result<EventRecord, RepoError>;

    async fn update_event(&self, params: UpdateEventParams) -> Result<EventRecord, RepoError>;

    async fn delete_event(&self, id: Uuid) -> Result<(), RepoError>;

    async fn replace_event_terms(&self, event_id: Uuid, term_ids: &[Uuid])
    -> Result<(), RepoError>;
}

#[async_trait]
pub trait TermsRepo: Send + Sync {
    async fn list_all(&self) -> Result<Vec<TermRecord>, RepoError>;
    async fn list_for_event(&self, event_id: Uuid) -> Result<Vec<TermRecord>, RepoError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<TermRecord>, RepoError>;
    async fn find_by_slug(&self, slug: &str) -> Result<Option<TermRecord>, RepoError>;
    /// Number of events assigned to the term, descendants excluded.
    async fn count_usage(&self, id: Uuid) -> Result<u64, RepoError>;
}

#[derive(Debug, Clone)]
pub struct CreateTermParams {
    pub slug: String,
    pub name: String,
    pub parent_id: Option<Uuid>,
}

#[async_trait]
pub trait TermsWriteRepo: Send + Sync {
    async fn create_term(&self, params: CreateTermParams) -> Result<TermRecord, RepoError>;

    async fn delete_term(&self, id: Uuid) -> Result<(), RepoError>;
}

#[async_trait]
pub trait SettingsRepo: Send + Sync {
    async fn load_site_settings(&self) -> Result<SiteSettingsRecord, RepoError>;
    async fn upsert_site_settings(&self, settings: SiteSettingsRecord) -> Result<(), RepoError>;
}
