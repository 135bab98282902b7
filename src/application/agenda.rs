use std::sync::Arc;

use thiserror::Error;
use time::OffsetDateTime;

use crate::application::calendar::calendar_link;
use crate::application::pagination::{EventCursor, PageRequest};
use crate::application::repos::{
    EventListScope, EventQueryFilter, EventsRepo, RepoError, SettingsRepo, TermsRepo,
};
use crate::application::schema_org::event_ld_json;
use crate::domain::entities::{EventRecord, SiteSettingsRecord};
use crate::domain::events;
use crate::domain::metadata::visibility_for;
use crate::domain::types::{AttendanceMode, EventStatus};
use crate::presentation::views::{
    EventCard, EventDetailContext, FrontPageContext, build_term_badges,
};
use crate::util::timezone;

const DEFAULT_PAGE_SIZE: u32 = 12;

#[derive(Clone)]
pub struct AgendaService {
    events: Arc<dyn EventsRepo>,
    terms: Arc<dyn TermsRepo>,
    settings: Arc<dyn SettingsRepo>,
}

#[derive(Debug, Error)]
pub enum AgendaError {
    #[error("invalid cursor: {0}")]
    InvalidCursor(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl AgendaService {
    pub fn new(
        events: Arc<dyn EventsRepo>,
        terms: Arc<dyn TermsRepo>,
        settings: Arc<dyn SettingsRepo>,
    ) -> Self {
        Self {
            events,
            terms,
            settings,
        }
    }

    fn decode_cursor(&self, cursor: Option<&str>) -> Result<Option<EventCursor>, AgendaError> {
        cursor
            .map(EventCursor::decode)
            .transpose()
            .map_err(|err| AgendaError::InvalidCursor(err.to_string()))
    }

    /// The upcoming listing: published events that have not finished,
    /// soonest start first.
    pub async fn front_page(&self, cursor: Option<&str>) -> Result<FrontPageContext, AgendaError> {
        let decoded_cursor = self.decode_cursor(cursor)?;
        let settings = self.load_site_settings().await?;
        let now = timezone::localized_wall_time(OffsetDateTime::now_utc(), settings.timezone);
        let scope = EventListScope::Upcoming { now };
        let filter = EventQueryFilter::default();

        let page = self
            .events
            .list_events(
                scope,
                &filter,
                PageRequest::new(DEFAULT_PAGE_SIZE, decoded_cursor),
            )
            .await?;

        let total = self.events.count_events(scope, &filter).await?;

        let cards: Vec<EventCard> = page
            .items
            .iter()
            .map(|record| event_to_card(record, settings.timezone))
            .collect();

        let event_count = cards.len();
        Ok(FrontPageContext {
            events: cards,
            event_count,
            total_count: usize::try_from(total).unwrap_or(usize::MAX),
            has_results: event_count > 0,
            next_cursor: page.next_cursor,
        })
    }

    pub async fn event_detail(
        &self,
        slug: &str,
    ) -> Result<Option<EventDetailContext>, AgendaError> {
        let Some(event) = self.events.find_by_slug(slug).await? else {
            return Ok(None);
        };

        if !event.is_published() {
            return Ok(None);
        }

        self.build_event_context(event).await.map(Some)
    }

    async fn build_event_context(
        &self,
        event: EventRecord,
    ) -> Result<EventDetailContext, AgendaError> {
        let terms = self.terms.list_for_event(event.id).await?;
        let settings = self.load_site_settings().await?;

        let permalink = event_permalink(&settings.public_site_url, &event.slug);
        let now = timezone::localized_wall_time(OffsetDateTime::now_utc(), settings.timezone);

        let schedule = schedule_strings(&event, settings.timezone);
        let visibility = visibility_for(event.attendance_mode);
        let show_location = visibility.location && !event.location.is_empty();
        let show_virtual = (visibility.location_url || visibility.virtual_location_name)
            && (!event.location_url.is_empty() || !event.virtual_location_name.is_empty());

        let calendar_link = calendar_link(&event, &permalink, settings.timezone);
        let ld_json = event_ld_json(&event, &permalink, settings.timezone);
        let noindex = events::should_noindex(event.dtstart, event.dtend, now);

        Ok(EventDetailContext {
            slug: event.slug,
            title: event.title,
            has_schedule: event.dtstart.is_some() && event.dtend.is_some(),
            month_name: schedule.month,
            day_of_month: schedule.day,
            date_range: schedule.date_range,
            time_range: schedule.time_range,
            iso_start: schedule.iso_start,
            attendance_label: event.attendance_mode.label().to_string(),
            status_label: event.status.label().to_string(),
            show_status: event.status != EventStatus::Scheduled,
            location: event.location,
            location_url: event.location_url,
            virtual_location_name: event.virtual_location_name,
            show_location,
            show_virtual,
            content_html: event.content_html,
            calendar_link,
            terms: build_term_badges(
                terms
                    .iter()
                    .map(|term| (term.slug.as_str(), term.name.as_str())),
            ),
            ld_json,
            noindex,
            image_url: event.image_url,
        })
    }

    async fn load_site_settings(&self) -> Result<SiteSettingsRecord, AgendaError> {
        self.settings
            .load_site_settings()
            .await
            .map_err(AgendaError::from)
    }
}

#[derive(Default)]
struct ScheduleStrings {
    month: String,
    day: String,
    date_range: String,
    time_range: String,
    iso_start: String,
}

fn schedule_strings(record: &EventRecord, timezone: chrono_tz::Tz) -> ScheduleStrings {
    let Some((dtstart, dtend)) = record.dtstart.zip(record.dtend) else {
        return ScheduleStrings::default();
    };

    ScheduleStrings {
        month: events::month_name(dtstart),
        day: events::day_of_month(dtstart),
        date_range: events::date_range(dtstart, dtend),
        time_range: events::time_range(dtstart, dtend, record.full_day),
        iso_start: timezone::iso8601(dtstart, timezone),
    }
}

fn event_to_card(record: &EventRecord, timezone: chrono_tz::Tz) -> EventCard {
    let schedule = schedule_strings(record, timezone);

    EventCard {
        slug: record.slug.clone(),
        title: record.title.clone(),
        href: format!("/events/{}", record.slug),
        month_badge: schedule.month,
        day_badge: schedule.day,
        date_range: schedule.date_range,
        time_range: schedule.time_range,
        iso_start: schedule.iso_start,
        location_label: location_label(record),
        featured: record.featured,
    }
}

/// What the card shows as the venue line; falls back to the attendance
/// mode label when the specific field was left blank.
fn location_label(record: &EventRecord) -> String {
    match record.attendance_mode {
        AttendanceMode::Online => {
            if record.virtual_location_name.is_empty() {
                record.attendance_mode.label().to_string()
            } else {
                record.virtual_location_name.clone()
            }
        }
        AttendanceMode::Offline | AttendanceMode::Mixed => {
            if record.location.is_empty() {
                record.attendance_mode.label().to_string()
            } else {
                record.location.clone()
            }
        }
    }
}

fn event_permalink(public_site_url: &str, slug: &str) -> String {
    format!("{}events/{}", normalize_public_site_url(public_site_url), slug)
}

fn normalize_public_site_url(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    format!("{trimmed}/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use time::macros::datetime;
    use uuid::Uuid;

    use crate::application::pagination::CursorPage;
    use crate::domain::entities::TermRecord;

    #[derive(Clone, Default)]
    struct StubEventsRepo {
        events: Vec<EventRecord>,
    }

    #[async_trait]
    impl EventsRepo for StubEventsRepo {
        async fn list_events(
            &self,
            _scope: EventListScope,
            _filter: &EventQueryFilter,
            _page: PageRequest<EventCursor>,
        ) -> Result<CursorPage<EventRecord>, RepoError> {
            Ok(CursorPage::new(self.events.clone(), None))
        }

        async fn count_events(
            &self,
            _scope: EventListScope,
            _filter: &EventQueryFilter,
        ) -> Result<u64, RepoError> {
            Ok(self.events.len() as u64)
        }

        async fn find_by_slug(&self, slug: &str) -> Result<Option<EventRecord>, RepoError> {
            Ok(self.events.iter().find(|event| event.slug == slug).cloned())
        }

        async fn find_by_id(&self, id: Uuid) -> Result<Option<EventRecord>, RepoError> {
            Ok(self.events.iter().find(|event| event.id == id).cloned())
        }
    }

    #[derive(Clone, Default)]
    struct StubTermsRepo {
        terms: Vec<TermRecord>,
    }

    #[async_trait]
    impl TermsRepo for StubTermsRepo {
        async fn list_all(&self) -> Result<Vec<TermRecord>, RepoError> {
            Ok(self.terms.clone())
        }

        async fn list_for_event(&self, _event_id: Uuid) -> Result<Vec<TermRecord>, RepoError> {
            Ok(self.terms.clone())
        }

        async fn find_by_id(&self, id: Uuid) -> Result<Option<TermRecord>, RepoError> {
            Ok(self.terms.iter().find(|term| term.id == id).cloned())
        }

        async fn find_by_slug(&self, slug: &str) -> Result<Option<TermRecord>, RepoError> {
            Ok(self.terms.iter().find(|term| term.slug == slug).cloned())
        }

        async fn count_usage(&self, _id: Uuid) -> Result<u64, RepoError> {
            Ok(0)
        }
    }

    #[derive(Clone)]
    struct StubSettingsRepo;

    #[async_trait]
    impl SettingsRepo for StubSettingsRepo {
        async fn load_site_settings(&self) -> Result<SiteSettingsRecord, RepoError> {
            Ok(SiteSettingsRecord {
                site_title: "Velada".to_string(),
                meta_description: "What's on around town".to_string(),
                public_site_url: "https://example.org".to_string(),
                timezone: chrono_tz::America::Santiago,
                updated_at: OffsetDateTime::now_utc(),
            })
        }

        async fn upsert_site_settings(
            &self,
            _settings: SiteSettingsRecord,
        ) -> Result<(), RepoError> {
            unreachable!("not used in these tests")
        }
    }

    fn service(events: Vec<EventRecord>, terms: Vec<TermRecord>) -> AgendaService {
        AgendaService::new(
            Arc::new(StubEventsRepo { events }),
            Arc::new(StubTermsRepo { terms }),
            Arc::new(StubSettingsRepo),
        )
    }

    fn sample_event(slug: &str) -> EventRecord {
        EventRecord {
            id: Uuid::new_v4(),
            slug: slug.to_string(),
            title: "Spring Gala".to_string(),
            content_html: "<p>Dance all night.</p>".to_string(),
            image_url: None,
            attendance_mode: AttendanceMode::Offline,
            status: EventStatus::Scheduled,
            start_date: None,
            start_time: None,
            end_date: None,
            end_time: None,
            full_day: false,
            dtstart: Some(datetime!(2099-05-01 09:00:00)),
            dtend: Some(datetime!(2099-05-01 11:00:00)),
            location: "Teatro Municipal".to_string(),
            location_url: String::new(),
            virtual_location_name: String::new(),
            geo: None,
            featured: false,
            published_at: Some(datetime!(2024-04-01 12:00:00 UTC)),
            created_at: datetime!(2024-04-01 12:00:00 UTC),
            updated_at: datetime!(2024-04-01 12:00:00 UTC),
        }
    }

    fn sample_term(slug: &str, name: &str) -> TermRecord {
        TermRecord {
            id: Uuid::new_v4(),
            slug: slug.to_string(),
            name: name.to_string(),
            parent_id: None,
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    #[tokio::test]
    async fn front_page_formats_upcoming_cards() {
        let service = service(vec![sample_event("spring-gala")], Vec::new());

        let context = service.front_page(None).await.expect("front page loads");

        assert!(context.has_results);
        assert_eq!(context.total_count, 1);
        let card = &context.events[0];
        assert_eq!(card.href, "/events/spring-gala");
        assert_eq!(card.month_badge, "May");
        assert_eq!(card.day_badge, "1");
        assert_eq!(card.date_range, "May 1, 2099");
        assert_eq!(card.time_range, "09:00 - 11:00");
        assert_eq!(card.location_label, "Teatro Municipal");
    }

    #[tokio::test]
    async fn invalid_cursor_is_rejected() {
        let service = service(Vec::new(), Vec::new());

        let result = service.front_page(Some("@@not-a-cursor@@")).await;
        match result {
            Err(AgendaError::InvalidCursor(_)) => {}
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_slug_yields_none() {
        let service = service(Vec::new(), Vec::new());

        let detail = service.event_detail("missing").await.expect("lookup runs");
        assert!(detail.is_none());
    }

    #[tokio::test]
    async fn drafts_are_hidden_from_the_public_page() {
        let mut event = sample_event("draft-gala");
        event.published_at = None;
        let service = service(vec![event], Vec::new());

        let detail = service.event_detail("draft-gala").await.expect("lookup runs");
        assert!(detail.is_none());
    }

    #[tokio::test]
    async fn event_detail_derives_permalink_dependent_fields() {
        let mut event = sample_event("spring-gala");
        event.attendance_mode = AttendanceMode::Online;
        event.virtual_location_name = "Live stream".to_string();
        let service = service(vec![event], vec![sample_term("music", "Music")]);

        let detail = service
            .event_detail("spring-gala")
            .await
            .expect("lookup runs")
            .expect("event is published");

        assert!(detail.has_schedule);
        assert!(!detail.noindex);
        assert!(detail.calendar_link.starts_with("https://calendar.google.com/"));
        let ld_json = detail.ld_json.expect("online event exports a location");
        assert!(ld_json.contains("https://example.org/events/spring-gala"));
        assert_eq!(detail.terms.len(), 1);
        assert_eq!(detail.terms[0].label, "Music");
        assert!(detail.show_virtual);
        assert!(!detail.show_location);
    }

    #[tokio::test]
    async fn finished_event_is_marked_noindex() {
        let mut event = sample_event("past-gala");
        event.dtstart = Some(datetime!(2020-05-01 09:00:00));
        event.dtend = Some(datetime!(2020-05-01 11:00:00));
        let service = service(vec![event], Vec::new());

        let detail = service
            .event_detail("past-gala")
            .await
            .expect("lookup runs")
            .expect("event is published");

        assert!(detail.noindex);
    }
}
