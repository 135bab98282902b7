use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono_tz::Tz;
use url::form_urlencoded;
use uuid::Uuid;

use crate::application::admin::events::{AdminEventError, CreateEventCommand, UpdateEventCommand};
use crate::application::error::HttpError;
use crate::application::pagination::PageRequest;
use crate::application::repos::{EventQueryFilter, SettingsRepo};
use crate::domain::entities::{EventRecord, TermRecord};
use crate::domain::metadata::{RawEventMetadata, visibility_for};
use crate::domain::types::{AttendanceMode, EventStatus};
use crate::infra::http::repo_error_to_http;
use crate::presentation::{admin::views as admin_views, views::render_template_response};
use time::macros::format_description;

use super::{
    AdminState,
    shared::{AdminListQuery, blank_to_none_opt, decode_cursor, redirect_with_notice},
};

const SOURCE_BASE: &str = "infra::http::admin_events";
const ADMIN_PAGE_SIZE: u32 = 20;

/// Event editor submission. Multi-valued term checkboxes rule out the
/// urlencoded `Form` extractor, so the body is walked key by key and
/// undeclared fields are dropped.
#[derive(Debug, Clone, Default)]
pub(super) struct AdminEventForm {
    title: String,
    content_html: String,
    image_url: String,
    published: bool,
    term_ids: Vec<Uuid>,
    metadata: RawEventMetadata,
}

impl AdminEventForm {
    pub(super) fn parse(body: &str) -> Self {
        let mut form = Self::default();
        for (key, value) in form_urlencoded::parse(body.as_bytes()) {
            let value = value.into_owned();
            match key.as_ref() {
                "title" => form.title = value,
                "content_html" => form.content_html = value,
                "image_url" => form.image_url = value,
                "published" => form.published = true,
                "term_ids" => {
                    if let Ok(id) = value.parse() {
                        form.term_ids.push(id);
                    }
                }
                "featured" => form.metadata.featured = value,
                "full_day" => form.metadata.full_day = value,
                "start_date" => form.metadata.start_date = value,
                "start_time" => form.metadata.start_time = value,
                "end_date" => form.metadata.end_date = value,
                "end_time" => form.metadata.end_time = value,
                "status" => form.metadata.status = value,
                "attendance_mode" => form.metadata.attendance_mode = value,
                "location" => form.metadata.location = value,
                "location_url" => form.metadata.location_url = value,
                "virtual_location_name" => form.metadata.virtual_location_name = value,
                "geo_address" => form.metadata.geo_address = value,
                "geo_lat" => form.metadata.geo_lat = value,
                "geo_lng" => form.metadata.geo_lng = value,
                "geo_zoom" => form.metadata.geo_zoom = value,
                "geo_components" => form.metadata.geo_components = value,
                _ => {}
            }
        }
        form
    }

    fn to_create_command(&self) -> CreateEventCommand {
        CreateEventCommand {
            title: self.title.clone(),
            content_html: self.content_html.clone(),
            image_url: self.image_url.clone(),
            published: self.published,
            metadata: self.metadata.clone(),
        }
    }

    fn to_update_command(&self, id: Uuid) -> UpdateEventCommand {
        UpdateEventCommand {
            id,
            title: self.title.clone(),
            content_html: self.content_html.clone(),
            image_url: self.image_url.clone(),
            published: self.published,
            metadata: self.metadata.clone(),
        }
    }

    fn from_record(record: &EventRecord) -> Self {
        let date = format_description!("[year]-[month]-[day]");
        let clock = format_description!("[hour]:[minute]");
        let format_date =
            |value: Option<time::Date>| value.and_then(|d| d.format(date).ok()).unwrap_or_default();
        let format_time =
            |value: Option<time::Time>| value.and_then(|t| t.format(clock).ok()).unwrap_or_default();

        let mut metadata = RawEventMetadata {
            featured: flag(record.featured),
            full_day: flag(record.full_day),
            start_date: format_date(record.start_date),
            start_time: format_time(record.start_time),
            end_date: format_date(record.end_date),
            end_time: format_time(record.end_time),
            status: record.status.schema_member().to_string(),
            attendance_mode: record.attendance_mode.schema_member().to_string(),
            location: record.location.clone(),
            location_url: record.location_url.clone(),
            virtual_location_name: record.virtual_location_name.clone(),
            ..RawEventMetadata::default()
        };

        if let Some(geo) = &record.geo {
            metadata.geo_address = geo.address.clone();
            metadata.geo_lat = geo.lat.map(|v| v.to_string()).unwrap_or_default();
            metadata.geo_lng = geo.lng.map(|v| v.to_string()).unwrap_or_default();
            metadata.geo_zoom = geo.zoom.to_string();
            metadata.geo_components =
                serde_json::to_string(&geo.components).unwrap_or_default();
        }

        Self {
            title: record.title.clone(),
            content_html: record.content_html.clone(),
            image_url: record.image_url.clone().unwrap_or_default(),
            published: record.is_published(),
            term_ids: Vec::new(),
            metadata,
        }
    }

    fn to_view(
        &self,
        heading: String,
        form_action: String,
        delete_action: Option<String>,
        notice: Option<admin_views::AdminNotice>,
        terms: &[TermRecord],
    ) -> admin_views::AdminEventFormView {
        let mode = AttendanceMode::try_from(self.metadata.attendance_mode.as_str())
            .unwrap_or_default();
        let status = EventStatus::try_from(self.metadata.status.as_str()).unwrap_or_default();
        let visibility = visibility_for(mode);

        admin_views::AdminEventFormView {
            heading,
            form_action,
            delete_action,
            notice,
            title: self.title.clone(),
            content_html: self.content_html.clone(),
            image_url: self.image_url.clone(),
            published: self.published,
            featured: !self.metadata.featured.trim().is_empty(),
            full_day: !self.metadata.full_day.trim().is_empty(),
            start_date: self.metadata.start_date.clone(),
            start_time: self.metadata.start_time.clone(),
            end_date: self.metadata.end_date.clone(),
            end_time: self.metadata.end_time.clone(),
            status_options: status_options(status),
            attendance_options: attendance_options(mode),
            location: self.metadata.location.clone(),
            location_url: self.metadata.location_url.clone(),
            virtual_location_name: self.metadata.virtual_location_name.clone(),
            geo_address: self.metadata.geo_address.clone(),
            geo_lat: self.metadata.geo_lat.clone(),
            geo_lng: self.metadata.geo_lng.clone(),
            geo_zoom: self.metadata.geo_zoom.clone(),
            geo_components: self.metadata.geo_components.clone(),
            location_hidden: !visibility.location,
            location_url_hidden: !visibility.location_url,
            virtual_location_name_hidden: !visibility.virtual_location_name,
            geo_picker_hidden: !visibility.geo_picker,
            terms: term_options(terms, &self.term_ids),
        }
    }
}

fn flag(value: bool) -> String {
    if value { "on".to_string() } else { String::new() }
}

fn status_options(selected: EventStatus) -> Vec<admin_views::AdminSelectOption> {
    EventStatus::ALL
        .iter()
        .map(|status| admin_views::AdminSelectOption {
            value: status.schema_member().to_string(),
            label: status.label().to_string(),
            selected: *status == selected,
        })
        .collect()
}

fn attendance_options(selected: AttendanceMode) -> Vec<admin_views::AdminSelectOption> {
    AttendanceMode::ALL
        .iter()
        .map(|mode| admin_views::AdminSelectOption {
            value: mode.schema_member().to_string(),
            label: mode.label().to_string(),
            selected: *mode == selected,
        })
        .collect()
}

fn term_options(terms: &[TermRecord], checked: &[Uuid]) -> Vec<admin_views::AdminTermOption> {
    terms
        .iter()
        .map(|term| admin_views::AdminTermOption {
            id: term.id.to_string(),
            name: term.name.clone(),
            checked: checked.contains(&term.id),
        })
        .collect()
}

fn event_row(event: &EventRecord, tz: Tz, public_base: &str) -> admin_views::AdminEventRowView {
    let schedule_label = match (event.dtstart, event.dtend) {
        (Some(start), Some(end)) => {
            let date = crate::domain::events::date_range(start, end);
            let time = crate::domain::events::time_range(start, end, event.full_day);
            format!("{date}, {time}")
        }
        _ => "Unscheduled".to_string(),
    };

    admin_views::AdminEventRowView {
        id: event.id.to_string(),
        title: event.title.clone(),
        slug: event.slug.clone(),
        status_label: if event.is_published() {
            "Published".to_string()
        } else {
            "Draft".to_string()
        },
        schedule_label,
        updated_label: admin_views::format_timestamp(event.updated_at, tz),
        edit_href: format!("/events/{}/edit", event.id),
        preview_href: format!("{public_base}events/{}", event.slug),
        delete_action: format!("/events/{}/delete", event.id),
        is_draft: !event.is_published(),
        featured: event.featured,
    }
}

fn notice_from_code(code: Option<&str>) -> Option<admin_views::AdminNotice> {
    match code? {
        "created" => Some(admin_views::AdminNotice::success("Event created.")),
        "updated" => Some(admin_views::AdminNotice::success("Event updated.")),
        "deleted" => Some(admin_views::AdminNotice::success("Event deleted.")),
        "not-found" => Some(admin_views::AdminNotice::error("Event not found.")),
        _ => None,
    }
}

fn admin_event_error(source: &'static str, err: AdminEventError) -> HttpError {
    match err {
        AdminEventError::ConstraintViolation(field) => HttpError::new(
            source,
            StatusCode::UNPROCESSABLE_ENTITY,
            "Invalid input",
            format!("`{field}` failed validation"),
        ),
        AdminEventError::Repo(err) => repo_error_to_http(source, err),
    }
}

fn normalize_site_url(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    format!("{trimmed}/")
}

pub(super) async fn admin_events(
    State(state): State<AdminState>,
    Query(query): Query<AdminListQuery>,
) -> Response {
    const SOURCE: &str = "infra::http::admin_events::list";

    let chrome = match state.chrome.load("/events").await {
        Ok(chrome) => chrome,
        Err(err) => return err.into_response(),
    };

    let cursor = match decode_cursor(query.cursor.as_deref(), SOURCE) {
        Ok(cursor) => cursor,
        Err(err) => return err.into_response(),
    };

    let search = blank_to_none_opt(query.search.clone());
    let filter = EventQueryFilter {
        search: search.clone(),
        ..EventQueryFilter::default()
    };

    let page = match state
        .events
        .list(&filter, PageRequest::new(ADMIN_PAGE_SIZE, cursor))
        .await
    {
        Ok(page) => page,
        Err(err) => return admin_event_error(SOURCE, err).into_response(),
    };

    let total = match state.events.count(&filter).await {
        Ok(total) => total,
        Err(err) => return admin_event_error(SOURCE, err).into_response(),
    };

    let settings = match state.db.load_site_settings().await {
        Ok(settings) => settings,
        Err(err) => return repo_error_to_http(SOURCE, err).into_response(),
    };

    let public_base = normalize_site_url(&settings.public_site_url);
    let rows = page
        .items
        .iter()
        .map(|event| event_row(event, settings.timezone, &public_base))
        .collect();

    let next_page_href = page.next_cursor.as_ref().map(|cursor| {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        serializer.append_pair("cursor", cursor);
        if let Some(search) = &search {
            serializer.append_pair("search", search);
        }
        format!("/events?{}", serializer.finish())
    });

    let content = admin_views::AdminEventListView {
        heading: "Events".to_string(),
        notice: notice_from_code(query.notice.as_deref()),
        filter_action: "/events".to_string(),
        search,
        events: rows,
        total_count: total,
        next_page_href,
        new_event_href: "/events/new".to_string(),
    };

    let view = admin_views::AdminLayout::new(chrome, content);
    render_template_response(admin_views::AdminEventsTemplate { view }, StatusCode::OK)
}

pub(super) async fn admin_event_new(State(state): State<AdminState>) -> Response {
    const SOURCE: &str = "infra::http::admin_events::new";

    let chrome = match state.chrome.load("/events").await {
        Ok(chrome) => chrome,
        Err(err) => return err.into_response(),
    };

    let terms = match state.events.list_terms().await {
        Ok(terms) => terms,
        Err(err) => return admin_event_error(SOURCE, err).into_response(),
    };

    let form = AdminEventForm {
        metadata: RawEventMetadata {
            status: EventStatus::default().schema_member().to_string(),
            attendance_mode: AttendanceMode::default().schema_member().to_string(),
            ..RawEventMetadata::default()
        },
        ..AdminEventForm::default()
    };

    let content = form.to_view(
        "New event".to_string(),
        "/events/create".to_string(),
        None,
        None,
        &terms,
    );

    let view = admin_views::AdminLayout::new(chrome, content);
    render_template_response(admin_views::AdminEventEditTemplate { view }, StatusCode::OK)
}

pub(super) async fn admin_event_create(State(state): State<AdminState>, body: String) -> Response {
    const SOURCE: &str = "infra::http::admin_events::create";

    let form = AdminEventForm::parse(&body);

    match state.events.create_event(form.to_create_command()).await {
        Ok(event) => {
            if let Err(err) = state.events.replace_terms(event.id, &form.term_ids).await {
                return admin_event_error(SOURCE, err).into_response();
            }
            redirect_with_notice(&format!("/events/{}/edit", event.id), "created")
        }
        Err(AdminEventError::ConstraintViolation(_)) => {
            rerender_editor(
                &state,
                form,
                "New event".to_string(),
                "/events/create".to_string(),
                None,
                SOURCE,
            )
            .await
        }
        Err(err) => admin_event_error(SOURCE, err).into_response(),
    }
}

/// Re-render the editor with the submitted values after a validation
/// failure, so the operator keeps what they typed.
async fn rerender_editor(
    state: &AdminState,
    form: AdminEventForm,
    heading: String,
    form_action: String,
    delete_action: Option<String>,
    source: &'static str,
) -> Response {
    let chrome = match state.chrome.load("/events").await {
        Ok(chrome) => chrome,
        Err(err) => return err.into_response(),
    };

    let terms = match state.events.list_terms().await {
        Ok(terms) => terms,
        Err(err) => return admin_event_error(source, err).into_response(),
    };

    let content = form.to_view(
        heading,
        form_action,
        delete_action,
        Some(admin_views::AdminNotice::error("Title must not be empty.")),
        &terms,
    );

    let view = admin_views::AdminLayout::new(chrome, content);
    render_template_response(
        admin_views::AdminEventEditTemplate { view },
        StatusCode::UNPROCESSABLE_ENTITY,
    )
}

pub(super) async fn admin_event_edit(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
    Query(query): Query<AdminListQuery>,
) -> Response {
    const SOURCE: &str = "infra::http::admin_events::edit";

    let chrome = match state.chrome.load("/events").await {
        Ok(chrome) => chrome,
        Err(err) => return err.into_response(),
    };

    let event = match state.events.find_by_id(id).await {
        Ok(Some(event)) => event,
        Ok(None) => return redirect_with_notice("/events", "not-found"),
        Err(err) => return admin_event_error(SOURCE, err).into_response(),
    };

    let terms = match state.events.list_terms().await {
        Ok(terms) => terms,
        Err(err) => return admin_event_error(SOURCE, err).into_response(),
    };

    let assigned = match state.events.terms_for_event(id).await {
        Ok(assigned) => assigned,
        Err(err) => return admin_event_error(SOURCE, err).into_response(),
    };

    let mut form = AdminEventForm::from_record(&event);
    form.term_ids = assigned.iter().map(|term| term.id).collect();

    let content = form.to_view(
        format!("Edit: {}", event.title),
        format!("/events/{id}/edit"),
        Some(format!("/events/{id}/delete")),
        notice_from_code(query.notice.as_deref()),
        &terms,
    );

    let view = admin_views::AdminLayout::new(chrome, content);
    render_template_response(admin_views::AdminEventEditTemplate { view }, StatusCode::OK)
}

pub(super) async fn admin_event_update(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
    body: String,
) -> Response {
    const SOURCE: &str = "infra::http::admin_events::update";

    let form = AdminEventForm::parse(&body);

    match state.events.update_event(form.to_update_command(id)).await {
        Ok(event) => {
            if let Err(err) = state.events.replace_terms(event.id, &form.term_ids).await {
                return admin_event_error(SOURCE, err).into_response();
            }
            redirect_with_notice(&format!("/events/{id}/edit"), "updated")
        }
        Err(AdminEventError::ConstraintViolation(_)) => {
            rerender_editor(
                &state,
                form,
                "Edit event".to_string(),
                format!("/events/{id}/edit"),
                Some(format!("/events/{id}/delete")),
                SOURCE,
            )
            .await
        }
        Err(AdminEventError::Repo(crate::application::repos::RepoError::NotFound)) => {
            redirect_with_notice("/events", "not-found")
        }
        Err(err) => admin_event_error(SOURCE, err).into_response(),
    }
}

pub(super) async fn admin_event_delete(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
) -> Response {
    const SOURCE: &str = "infra::http::admin_events::delete";

    match state.events.find_by_id(id).await {
        Ok(Some(_)) => {}
        Ok(None) => return redirect_with_notice("/events", "not-found"),
        Err(err) => return admin_event_error(SOURCE, err).into_response(),
    }

    match state.events.delete_event(id).await {
        Ok(()) => redirect_with_notice("/events", "deleted"),
        Err(err) => admin_event_error(SOURCE, err).into_response(),
    }
}
