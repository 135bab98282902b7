use std::collections::BTreeSet;
use std::sync::Arc;

use thiserror::Error;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};
use uuid::Uuid;

use crate::application::pagination::{CursorPage, EventCursor, PageRequest};
use crate::application::repos::{
    CreateEventParams, EventListScope, EventQueryFilter, EventsRepo, EventsWriteRepo, RepoError,
    TermsRepo, UpdateEventParams,
};
use crate::domain::entities::{EventRecord, TermRecord};
use crate::domain::metadata::{
    RawEventMetadata, sanitize_content_html, sanitize_metadata, sanitize_url,
};
use crate::domain::schedule::{self, ScheduleFields};
use crate::domain::slug::{SlugAsyncError, SlugError, generate_unique_slug_async};

#[derive(Debug, Error)]
pub enum AdminEventError {
    #[error("{0}")]
    ConstraintViolation(&'static str),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// New event as submitted by the creation form.
#[derive(Debug, Clone)]
pub struct CreateEventCommand {
    pub title: String,
    pub content_html: String,
    pub image_url: String,
    pub published: bool,
    pub metadata: RawEventMetadata,
}

#[derive(Debug, Clone)]
pub struct UpdateEventCommand {
    pub id: Uuid,
    pub title: String,
    pub content_html: String,
    pub image_url: String,
    pub published: bool,
    pub metadata: RawEventMetadata,
}

#[derive(Clone)]
pub struct AdminEventService {
    reader: Arc<dyn EventsRepo>,
    writer: Arc<dyn EventsWriteRepo>,
    terms: Arc<dyn TermsRepo>,
}

impl AdminEventService {
    pub fn new(
        reader: Arc<dyn EventsRepo>,
        writer: Arc<dyn EventsWriteRepo>,
        terms: Arc<dyn TermsRepo>,
    ) -> Self {
        Self {
            reader,
            writer,
            terms,
        }
    }

    pub async fn list(
        &self,
        filter: &EventQueryFilter,
        page: PageRequest<EventCursor>,
    ) -> Result<CursorPage<EventRecord>, AdminEventError> {
        self.reader
            .list_events(EventListScope::Admin, filter, page)
            .await
            .map_err(AdminEventError::from)
    }

    pub async fn count(&self, filter: &EventQueryFilter) -> Result<u64, AdminEventError> {
        self.reader
            .count_events(EventListScope::Admin, filter)
            .await
            .map_err(AdminEventError::from)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<EventRecord>, AdminEventError> {
        self.reader
            .find_by_id(id)
            .await
            .map_err(AdminEventError::from)
    }

    pub async fn list_terms(&self) -> Result<Vec<TermRecord>, AdminEventError> {
        self.terms.list_all().await.map_err(AdminEventError::from)
    }

    pub async fn terms_for_event(
        &self,
        event_id: Uuid,
    ) -> Result<Vec<TermRecord>, AdminEventError> {
        self.terms
            .list_for_event(event_id)
            .await
            .map_err(AdminEventError::from)
    }

    pub async fn create_event(
        &self,
        command: CreateEventCommand,
    ) -> Result<EventRecord, AdminEventError> {
        ensure_non_empty(&command.title, "title")?;

        let CreateEventCommand {
            title,
            content_html,
            image_url,
            published,
            metadata,
        } = command;

        let title = title.trim().to_string();
        ensure_non_empty(&title, "title")?;

        let reader = self.reader.clone();
        let slug = match generate_unique_slug_async(&title, move |candidate| {
            let reader = reader.clone();
            let candidate = candidate.to_string();
            async move {
                reader
                    .find_by_slug(&candidate)
                    .await
                    .map(|existing| existing.is_none())
            }
        })
        .await
        {
            Ok(slug) => slug,
            Err(SlugAsyncError::Slug(err)) => match err {
                SlugError::EmptyInput | SlugError::Unrepresentable { .. } => {
                    return Err(AdminEventError::ConstraintViolation("title"));
                }
                SlugError::Exhausted { .. } => {
                    return Err(AdminEventError::ConstraintViolation("slug"));
                }
            },
            Err(SlugAsyncError::Predicate(err)) => return Err(AdminEventError::Repo(err)),
        };

        let metadata = sanitize_metadata(&metadata);
        let schedule = resolve_schedule(&metadata.schedule, (None, None));
        let published_at = published.then(OffsetDateTime::now_utc);

        let params = CreateEventParams {
            slug,
            title,
            content_html: sanitize_content_html(&content_html),
            image_url: optional_url(&image_url),
            attendance_mode: metadata.attendance_mode,
            status: metadata.status,
            start_date: schedule.start_date,
            start_time: schedule.start_time,
            end_date: schedule.end_date,
            end_time: schedule.end_time,
            full_day: schedule.full_day,
            dtstart: schedule.dtstart,
            dtend: schedule.dtend,
            location: metadata.location,
            location_url: metadata.location_url,
            virtual_location_name: metadata.virtual_location_name,
            geo: metadata.geo,
            featured: metadata.featured,
            published_at,
        };

        self.writer
            .create_event(params)
            .await
            .map_err(AdminEventError::from)
    }

    pub async fn update_event(
        &self,
        command: UpdateEventCommand,
    ) -> Result<EventRecord, AdminEventError> {
        ensure_non_empty(&command.title, "title")?;

        let UpdateEventCommand {
            id,
            title,
            content_html,
            image_url,
            published,
            metadata,
        } = command;

        let title = title.trim().to_string();
        ensure_non_empty(&title, "title")?;

        let existing = self.reader.find_by_id(id).await?.ok_or(RepoError::NotFound)?;

        let metadata = sanitize_metadata(&metadata);
        let schedule = resolve_schedule(&metadata.schedule, (existing.dtstart, existing.dtend));

        // First publication stamps the moment; republishing keeps it.
        let published_at = if published {
            existing.published_at.or_else(|| Some(OffsetDateTime::now_utc()))
        } else {
            None
        };

        let params = UpdateEventParams {
            id,
            slug: existing.slug.clone(),
            title,
            content_html: sanitize_content_html(&content_html),
            image_url: optional_url(&image_url),
            attendance_mode: metadata.attendance_mode,
            status: metadata.status,
            start_date: schedule.start_date,
            start_time: schedule.start_time,
            end_date: schedule.end_date,
            end_time: schedule.end_time,
            full_day: schedule.full_day,
            dtstart: schedule.dtstart,
            dtend: schedule.dtend,
            location: metadata.location,
            location_url: metadata.location_url,
            virtual_location_name: metadata.virtual_location_name,
            geo: metadata.geo,
            featured: metadata.featured,
            published_at,
        };

        self.writer
            .update_event(params)
            .await
            .map_err(AdminEventError::from)
    }

    pub async fn delete_event(&self, id: Uuid) -> Result<(), AdminEventError> {
        self.writer
            .delete_event(id)
            .await
            .map_err(AdminEventError::from)
    }

    pub async fn replace_terms(
        &self,
        event_id: Uuid,
        term_ids: &[Uuid],
    ) -> Result<(), AdminEventError> {
        let mut seen = BTreeSet::new();
        let mut normalized = Vec::new();
        for id in term_ids {
            if seen.insert(*id) {
                normalized.push(*id);
            }
        }

        self.writer
            .replace_event_terms(event_id, &normalized)
            .await
            .map_err(AdminEventError::from)
    }
}

/// Schedule columns as they will be persisted.
struct ScheduleColumns {
    start_date: Option<Date>,
    start_time: Option<Time>,
    end_date: Option<Date>,
    end_time: Option<Time>,
    full_day: bool,
    dtstart: Option<PrimitiveDateTime>,
    dtend: Option<PrimitiveDateTime>,
}

/// Raw fields are stored as sanitized, except that a backwards end date is
/// stored corrected. When the fields are too incomplete to normalize, the
/// previously stored canonical pair is carried over unchanged.
fn resolve_schedule(
    fields: &ScheduleFields,
    previous: (Option<PrimitiveDateTime>, Option<PrimitiveDateTime>),
) -> ScheduleColumns {
    let normalized = schedule::normalize(fields);

    let end_date = normalized
        .as_ref()
        .and_then(|schedule| schedule.corrected_end_date)
        .or(fields.end_date);

    let (dtstart, dtend) = match &normalized {
        Some(schedule) => (Some(schedule.dtstart), Some(schedule.dtend)),
        None => previous,
    };

    ScheduleColumns {
        start_date: fields.start_date,
        start_time: fields.start_time,
        end_date,
        end_time: fields.end_time,
        full_day: fields.full_day,
        dtstart,
        dtend,
    }
}

fn optional_url(raw: &str) -> Option<String> {
    let url = sanitize_url(raw);
    if url.is_empty() { None } else { Some(url) }
}

fn ensure_non_empty(value: &str, field: &'static str) -> Result<(), AdminEventError> {
    if value.trim().is_empty() {
        return Err(AdminEventError::ConstraintViolation(field));
    }
    Ok(())
}
