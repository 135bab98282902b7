use async_trait::async_trait;
use sqlx::QueryBuilder;
use sqlx::types::Json;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};
use uuid::Uuid;

use crate::application::pagination::{CursorPage, EventCursor, PageRequest, PaginationError};
use crate::application::repos::{
    CreateEventParams, EventListScope, EventQueryFilter, EventsRepo, EventsWriteRepo, RepoError,
    UpdateEventParams,
};
use crate::domain::entities::{EventRecord, GeoPoint};
use crate::domain::types::{AttendanceMode, EventStatus};

use super::{PostgresRepositories, map_sqlx_error};

const EVENT_COLUMNS: &str = "e.id, e.slug, e.title, e.content_html, e.image_url, \
    e.attendance_mode, e.status, e.start_date, e.start_time, e.end_date, e.end_time, \
    e.full_day, e.dtstart, e.dtend, e.location, e.location_url, e.virtual_location_name, \
    e.geo, e.featured, e.published_at, e.created_at, e.updated_at";

#[derive(sqlx::FromRow)]
struct EventRow {
    id: Uuid,
    slug: String,
    title: String,
    content_html: String,
    image_url: Option<String>,
    attendance_mode: AttendanceMode,
    status: EventStatus,
    start_date: Option<Date>,
    start_time: Option<Time>,
    end_date: Option<Date>,
    end_time: Option<Time>,
    full_day: bool,
    dtstart: Option<PrimitiveDateTime>,
    dtend: Option<PrimitiveDateTime>,
    location: String,
    location_url: String,
    virtual_location_name: String,
    geo: Option<Json<GeoPoint>>,
    featured: bool,
    published_at: Option<OffsetDateTime>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<EventRow> for EventRecord {
    fn from(row: EventRow) -> Self {
        Self {
            id: row.id,
            slug: row.slug,
            title: row.title,
            content_html: row.content_html,
            image_url: row.image_url,
            attendance_mode: row.attendance_mode,
            status: row.status,
            start_date: row.start_date,
            start_time: row.start_time,
            end_date: row.end_date,
            end_time: row.end_time,
            full_day: row.full_day,
            dtstart: row.dtstart,
            dtend: row.dtend,
            location: row.location,
            location_url: row.location_url,
            virtual_location_name: row.virtual_location_name,
            geo: row.geo.map(|json| json.0),
            featured: row.featured,
            published_at: row.published_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl EventsRepo for PostgresRepositories {
    async fn list_events(
        &self,
        scope: EventListScope,
        filter: &EventQueryFilter,
        page: PageRequest<EventCursor>,
    ) -> Result<CursorPage<EventRecord>, RepoError> {
        let limit = page.limit.clamp(1, 100) as i64;

        let mut qb = QueryBuilder::new(format!("SELECT {EVENT_COLUMNS} FROM events e WHERE 1=1 "));

        Self::apply_scope_conditions(&mut qb, scope);
        Self::apply_event_filter(&mut qb, filter);

        if let Some(cursor) = page.cursor {
            match scope {
                EventListScope::Upcoming { .. } => {
                    let start_wall = cursor.start_wall().ok_or_else(|| {
                        RepoError::Pagination(PaginationError::InvalidCursor(
                            "cursor missing start for upcoming scope".to_string(),
                        ))
                    })?;
                    qb.push(" AND (e.dtstart, e.id) > (");
                    qb.push_bind(start_wall);
                    qb.push(", ");
                    qb.push_bind(cursor.id());
                    qb.push(")");
                }
                EventListScope::Recent => {
                    let stamp = cursor.stamp().ok_or_else(|| {
                        RepoError::Pagination(PaginationError::InvalidCursor(
                            "cursor missing timestamp for published scope".to_string(),
                        ))
                    })?;
                    qb.push(" AND (e.published_at, e.id) < (");
                    qb.push_bind(stamp);
                    qb.push(", ");
                    qb.push_bind(cursor.id());
                    qb.push(")");
                }
                EventListScope::Admin => {
                    let stamp = cursor.stamp().ok_or_else(|| {
                        RepoError::Pagination(PaginationError::InvalidCursor(
                            "cursor missing timestamp for admin scope".to_string(),
                        ))
                    })?;
                    qb.push(" AND (e.updated_at, e.id) < (");
                    qb.push_bind(stamp);
                    qb.push(", ");
                    qb.push_bind(cursor.id());
                    qb.push(")");
                }
            }
        }

        match scope {
            EventListScope::Upcoming { .. } => {
                qb.push(" ORDER BY e.dtstart ASC, e.id ASC ");
            }
            EventListScope::Recent => {
                qb.push(" ORDER BY e.published_at DESC, e.id DESC ");
            }
            EventListScope::Admin => {
                qb.push(" ORDER BY e.updated_at DESC, e.id DESC ");
            }
        }

        qb.push(" LIMIT ");
        qb.push_bind(limit + 1);

        let mut rows = qb
            .build_query_as::<EventRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let has_more = (rows.len() as i64) > limit;
        if has_more {
            rows.pop();
        }

        let next_cursor = if has_more {
            let last_row = rows
                .last()
                .expect("page should contain at least one row when truncated");
            let cursor = match scope {
                EventListScope::Upcoming { .. } => {
                    let start_wall = last_row.dtstart.ok_or_else(|| {
                        RepoError::from_persistence("upcoming row missing canonical start")
                    })?;
                    EventCursor::upcoming(start_wall, last_row.id)
                }
                EventListScope::Recent => {
                    let published_at = last_row.published_at.ok_or_else(|| {
                        RepoError::from_persistence("published row missing publication time")
                    })?;
                    EventCursor::recent(published_at, last_row.id)
                }
                EventListScope::Admin => EventCursor::admin(last_row.updated_at, last_row.id),
            };
            Some(cursor.encode())
        } else {
            None
        };

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(EventRecord::from(row));
        }

        Ok(CursorPage::new(records, next_cursor))
    }

    async fn count_events(
        &self,
        scope: EventListScope,
        filter: &EventQueryFilter,
    ) -> Result<u64, RepoError> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM events e WHERE 1=1 ");
        Self::apply_scope_conditions(&mut qb, scope);
        Self::apply_event_filter(&mut qb, filter);

        let count: i64 = qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Self::convert_count(count)
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<EventRecord>, RepoError> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM events e WHERE e.slug = $1");
        let row = sqlx::query_as::<_, EventRow>(&sql)
            .bind(slug)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(EventRecord::from))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<EventRecord>, RepoError> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM events e WHERE e.id = $1");
        let row = sqlx::query_as::<_, EventRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(EventRecord::from))
    }
}

#[async_trait]
impl EventsWriteRepo for PostgresRepositories {
    async fn create_event(&self, params: CreateEventParams) -> Result<EventRecord, RepoError> {
        let CreateEventParams {
            slug,
            title,
            content_html,
            image_url,
            attendance_mode,
            status,
            start_date,
            start_time,
            end_date,
            end_time,
            full_day,
            dtstart,
            dtend,
            location,
            location_url,
            virtual_location_name,
            geo,
            featured,
            published_at,
        } = params;

        let id = Uuid::new_v4();
        let now = OffsetDateTime::now_utc();
        let sql = format!(
            "INSERT INTO events AS e ( \
                 id, slug, title, content_html, image_url, attendance_mode, status, \
                 start_date, start_time, end_date, end_time, full_day, dtstart, dtend, \
                 location, location_url, virtual_location_name, geo, featured, published_at, \
                 created_at, updated_at \
             ) VALUES ( \
                 $1, $2, $3, $4, $5, $6, $7, \
                 $8, $9, $10, $11, $12, $13, $14, \
                 $15, $16, $17, $18, $19, $20, \
                 $21, $21 \
             ) RETURNING {EVENT_COLUMNS}"
        );

        let row = sqlx::query_as::<_, EventRow>(&sql)
            .bind(id)
            .bind(slug)
            .bind(title)
            .bind(content_html)
            .bind(image_url)
            .bind(attendance_mode)
            .bind(status)
            .bind(start_date)
            .bind(start_time)
            .bind(end_date)
            .bind(end_time)
            .bind(full_day)
            .bind(dtstart)
            .bind(dtend)
            .bind(location)
            .bind(location_url)
            .bind(virtual_location_name)
            .bind(geo.map(Json))
            .bind(featured)
            .bind(published_at)
            .bind(now)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(EventRecord::from(row))
    }

    async fn update_event(&self, params: UpdateEventParams) -> Result<EventRecord, RepoError> {
        let UpdateEventParams {
            id,
            slug,
            title,
            content_html,
            image_url,
            attendance_mode,
            status,
            start_date,
            start_time,
            end_date,
            end_time,
            full_day,
            dtstart,
            dtend,
            location,
            location_url,
            virtual_location_name,
            geo,
            featured,
            published_at,
        } = params;

        let sql = format!(
            "UPDATE events AS e SET \
                 slug = $2, \
                 title = $3, \
                 content_html = $4, \
                 image_url = $5, \
                 attendance_mode = $6, \
                 status = $7, \
                 start_date = $8, \
                 start_time = $9, \
                 end_date = $10, \
                 end_time = $11, \
                 full_day = $12, \
                 dtstart = $13, \
                 dtend = $14, \
                 location = $15, \
                 location_url = $16, \
                 virtual_location_name = $17, \
                 geo = $18, \
                 featured = $19, \
                 published_at = $20, \
                 updated_at = now() \
             WHERE e.id = $1 \
             RETURNING {EVENT_COLUMNS}"
        );

        let row = sqlx::query_as::<_, EventRow>(&sql)
            .bind(id)
            .bind(slug)
            .bind(title)
            .bind(content_html)
            .bind(image_url)
            .bind(attendance_mode)
            .bind(status)
            .bind(start_date)
            .bind(start_time)
            .bind(end_date)
            .bind(end_time)
            .bind(full_day)
            .bind(dtstart)
            .bind(dtend)
            .bind(location)
            .bind(location_url)
            .bind(virtual_location_name)
            .bind(geo.map(Json))
            .bind(featured)
            .bind(published_at)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(EventRecord::from(row))
    }

    async fn delete_event(&self, id: Uuid) -> Result<(), RepoError> {
        sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn replace_event_terms(
        &self,
        event_id: Uuid,
        term_ids: &[Uuid],
    ) -> Result<(), RepoError> {
        let mut tx = self.pool().begin().await.map_err(map_sqlx_error)?;

        sqlx::query("DELETE FROM event_terms WHERE event_id = $1")
            .bind(event_id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        if !term_ids.is_empty() {
            sqlx::query(
                "INSERT INTO event_terms (event_id, term_id) \
                 SELECT $1, id FROM UNNEST($2::uuid[]) AS id",
            )
            .bind(event_id)
            .bind(term_ids)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        }

        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(())
    }
}
