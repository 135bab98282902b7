use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use time::OffsetDateTime;
use time::macros::datetime;
use uuid::Uuid;

use velada::application::pagination::{CursorPage, EventCursor, PageRequest};
use velada::application::repos::{
    EventListScope, EventQueryFilter, EventsRepo, RepoError, SettingsRepo, TermsRepo,
};
use velada::domain::entities::{EventRecord, SiteSettingsRecord, TermRecord};
use velada::domain::types::{AttendanceMode, EventStatus};
use velada::infra::http::api::handlers::{self, EventListQuery};
use velada::infra::http::api::state::ApiState;

/// Arguments of the last `list_events` call, captured so tests can check
/// how the handler translated the query string.
#[derive(Clone)]
struct CapturedListCall {
    scope: EventListScope,
    filter: EventQueryFilter,
    limit: u32,
    cursor: Option<EventCursor>,
}

#[derive(Clone, Default)]
struct RecordingEventsRepo {
    events: Vec<EventRecord>,
    next_cursor: Option<String>,
    captured: Arc<Mutex<Option<CapturedListCall>>>,
}

#[async_trait]
impl EventsRepo for RecordingEventsRepo {
    async fn list_events(
        &self,
        scope: EventListScope,
        filter: &EventQueryFilter,
        page: PageRequest<EventCursor>,
    ) -> Result<CursorPage<EventRecord>, RepoError> {
        *self.captured.lock().unwrap() = Some(CapturedListCall {
            scope,
            filter: filter.clone(),
            limit: page.limit,
            cursor: page.cursor,
        });
        Ok(CursorPage::new(self.events.clone(), self.next_cursor.clone()))
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

/// Settings fixture pinned to Europe/Madrid so rendered offsets are
/// predictable (+02:00 in summer).
#[derive(Clone)]
struct MadridSettingsRepo;

#[async_trait]
impl SettingsRepo for MadridSettingsRepo {
    async fn load_site_settings(&self) -> Result<SiteSettingsRecord, RepoError> {
        Ok(SiteSettingsRecord {
            site_title: "Velada".to_string(),
            meta_description: "What's on around town".to_string(),
            public_site_url: "https://example.org".to_string(),
            timezone: chrono_tz::Europe::Madrid,
            updated_at: OffsetDateTime::now_utc(),
        })
    }

    async fn upsert_site_settings(&self, _settings: SiteSettingsRecord) -> Result<(), RepoError> {
        unreachable!("not used in these tests")
    }
}

#[derive(Clone)]
struct TimingOutSettingsRepo;

#[async_trait]
impl SettingsRepo for TimingOutSettingsRepo {
    async fn load_site_settings(&self) -> Result<SiteSettingsRecord, RepoError> {
        Err(RepoError::Timeout)
    }

    async fn upsert_site_settings(&self, _settings: SiteSettingsRecord) -> Result<(), RepoError> {
        Err(RepoError::Timeout)
    }
}

fn build_state(
    events: Vec<EventRecord>,
    terms: Vec<TermRecord>,
) -> (ApiState, Arc<Mutex<Option<CapturedListCall>>>) {
    let events_repo = RecordingEventsRepo {
        events,
        next_cursor: None,
        captured: Arc::default(),
    };
    let captured = events_repo.captured.clone();
    let state = ApiState {
        events: Arc::new(events_repo),
        terms: Arc::new(StubTermsRepo { terms }),
        settings: Arc::new(MadridSettingsRepo),
    };
    (state, captured)
}

fn sample_event(slug: &str) -> EventRecord {
    EventRecord {
        id: Uuid::new_v4(),
        slug: slug.to_string(),
        title: "Night Market".to_string(),
        content_html: "<p>Food stalls and live music.</p>".to_string(),
        image_url: None,
        attendance_mode: AttendanceMode::Offline,
        status: EventStatus::Scheduled,
        start_date: None,
        start_time: None,
        end_date: None,
        end_time: None,
        full_day: false,
        dtstart: Some(datetime!(2099-05-01 18:30:00)),
        dtend: Some(datetime!(2099-05-01 22:00:00)),
        location: "Plaza Mayor".to_string(),
        location_url: String::new(),
        virtual_location_name: String::new(),
        geo: None,
        featured: false,
        published_at: Some(datetime!(2024-04-01 12:00:00 UTC)),
        created_at: datetime!(2024-04-01 12:00:00 UTC),
        updated_at: datetime!(2024-04-01 12:00:00 UTC),
    }
}

fn sample_term(slug: &str, name: &str, parent_id: Option<Uuid>) -> TermRecord {
    TermRecord {
        id: Uuid::new_v4(),
        slug: slug.to_string(),
        name: name.to_string(),
        parent_id,
        created_at: OffsetDateTime::now_utc(),
        updated_at: OffsetDateTime::now_utc(),
    }
}

fn list_query() -> EventListQuery {
    EventListQuery {
        limit: None,
        cursor: None,
        orderby: None,
        events_tax: None,
        featured: None,
    }
}

fn into_response<T: IntoResponse>(
    result: Result<T, velada::infra::http::api::error::ApiError>,
) -> Response {
    match result {
        Ok(ok) => ok.into_response(),
        Err(err) => err.into_response(),
    }
}

async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body");
    serde_json::from_slice(&bytes).expect("JSON body")
}

// ============ Listing ============

#[tokio::test]
async fn listing_defaults_to_publication_order() {
    let (state, captured) = build_state(vec![sample_event("night-market")], Vec::new());

    let response = into_response(handlers::list_events(State(state), Query(list_query())).await);
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    let item = &body["items"][0];
    assert_eq!(item["slug"], "night-market");
    assert_eq!(item["attendance_mode"], "offline");
    assert_eq!(item["status"], "scheduled");
    assert_eq!(item["dtstart"], "2099-05-01T18:30:00+02:00");
    assert_eq!(item["dtend"], "2099-05-01T22:00:00+02:00");
    assert_eq!(item["published_at"], "2024-04-01T14:00:00+02:00");
    assert!(body["next_cursor"].is_null());

    let call = captured.lock().unwrap().clone().expect("repo was called");
    assert!(matches!(call.scope, EventListScope::Recent));
    assert_eq!(call.limit, 20);
    assert!(call.cursor.is_none());
}

#[tokio::test]
async fn orderby_dtstart_selects_the_upcoming_listing() {
    let (state, captured) = build_state(Vec::new(), Vec::new());

    let mut query = list_query();
    query.orderby = Some("dtstart".to_string());
    let response = into_response(handlers::list_events(State(state), Query(query)).await);
    assert_eq!(response.status(), StatusCode::OK);

    let call = captured.lock().unwrap().clone().expect("repo was called");
    assert!(matches!(call.scope, EventListScope::Upcoming { .. }));
}

#[tokio::test]
async fn unknown_orderby_falls_back_to_publication_order() {
    let (state, captured) = build_state(Vec::new(), Vec::new());

    let mut query = list_query();
    query.orderby = Some("alphabetical".to_string());
    let response = into_response(handlers::list_events(State(state), Query(query)).await);
    assert_eq!(response.status(), StatusCode::OK);

    let call = captured.lock().unwrap().clone().expect("repo was called");
    assert!(matches!(call.scope, EventListScope::Recent));
}

#[tokio::test]
async fn limit_is_clamped_to_the_allowed_range() {
    let (state, captured) = build_state(Vec::new(), Vec::new());

    let mut query = list_query();
    query.limit = Some(500);
    into_response(handlers::list_events(State(state.clone()), Query(query)).await);
    assert_eq!(captured.lock().unwrap().clone().unwrap().limit, 100);

    let mut query = list_query();
    query.limit = Some(0);
    into_response(handlers::list_events(State(state), Query(query)).await);
    assert_eq!(captured.lock().unwrap().clone().unwrap().limit, 1);
}

#[tokio::test]
async fn term_filter_widens_to_descendants() {
    let (state, captured) = build_state(Vec::new(), Vec::new());

    let mut query = list_query();
    query.events_tax = Some("music".to_string());
    into_response(handlers::list_events(State(state), Query(query)).await);

    let call = captured.lock().unwrap().clone().expect("repo was called");
    assert_eq!(call.filter.term.as_deref(), Some("music"));
    assert!(call.filter.include_descendants);
    assert_eq!(call.filter.featured, None);
}

#[tokio::test]
async fn featured_filter_is_passed_through() {
    let (state, captured) = build_state(Vec::new(), Vec::new());

    let mut query = list_query();
    query.featured = Some(true);
    into_response(handlers::list_events(State(state), Query(query)).await);

    let call = captured.lock().unwrap().clone().expect("repo was called");
    assert_eq!(call.filter.featured, Some(true));
    assert!(call.filter.term.is_none());
    assert!(!call.filter.include_descendants);
}

#[tokio::test]
async fn invalid_cursor_is_rejected() {
    let (state, _) = build_state(Vec::new(), Vec::new());

    let mut query = list_query();
    query.cursor = Some("@@not-a-cursor@@".to_string());
    let response = into_response(handlers::list_events(State(state), Query(query)).await);
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "invalid_cursor");
    assert!(body["error"]["hint"].is_string());
}

#[tokio::test]
async fn valid_cursor_reaches_the_repository() {
    let (state, captured) = build_state(Vec::new(), Vec::new());
    let id = Uuid::new_v4();
    let cursor = EventCursor::recent(datetime!(2024-04-01 12:00:00 UTC), id);

    let mut query = list_query();
    query.cursor = Some(cursor.encode());
    let response = into_response(handlers::list_events(State(state), Query(query)).await);
    assert_eq!(response.status(), StatusCode::OK);

    let call = captured.lock().unwrap().clone().expect("repo was called");
    assert_eq!(call.cursor.map(|cursor| cursor.id()), Some(id));
}

// ============ Detail ============

#[tokio::test]
async fn published_event_detail_is_rendered() {
    let (state, _) = build_state(vec![sample_event("night-market")], Vec::new());

    let response = into_response(
        handlers::get_event(State(state), Path("night-market".to_string())).await,
    );
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["title"], "Night Market");
    assert_eq!(body["location"], "Plaza Mayor");
    assert_eq!(body["full_day"], false);
    assert_eq!(body["featured"], false);
    assert_eq!(body["dtstart"], "2099-05-01T18:30:00+02:00");
}

#[tokio::test]
async fn draft_events_are_not_exposed() {
    let mut event = sample_event("secret-market");
    event.published_at = None;
    let (state, _) = build_state(vec![event], Vec::new());

    let response = into_response(
        handlers::get_event(State(state), Path("secret-market".to_string())).await,
    );
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn unknown_slug_is_a_json_not_found() {
    let (state, _) = build_state(Vec::new(), Vec::new());

    let response =
        into_response(handlers::get_event(State(state), Path("missing".to_string())).await);
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "not_found");
    assert_eq!(body["error"]["message"], "event not found");
}

// ============ Terms ============

#[tokio::test]
async fn terms_are_listed_flat() {
    let parent = sample_term("music", "Music", None);
    let child = sample_term("jazz", "Jazz", Some(parent.id));
    let parent_id = parent.id;
    let (state, _) = build_state(Vec::new(), vec![parent, child]);

    let response = into_response(handlers::list_terms(State(state)).await);
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    let items = body.as_array().expect("flat array");
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["slug"], "music");
    assert!(items[0]["parent_id"].is_null());
    assert_eq!(items[1]["parent_id"], parent_id.to_string());
}

// ============ Errors ============

#[tokio::test]
async fn repository_timeout_maps_to_service_unavailable() {
    let state = ApiState {
        events: Arc::new(RecordingEventsRepo::default()),
        terms: Arc::new(StubTermsRepo::default()),
        settings: Arc::new(TimingOutSettingsRepo),
    };

    let response = into_response(handlers::list_events(State(state), Query(list_query())).await);
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "db_timeout");
}
