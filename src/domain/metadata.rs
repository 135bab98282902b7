//! Field-by-field sanitization of the admin event form.
//!
//! Every editable attribute has a total sanitizer: raw wire strings in,
//! typed values out. Malformed input collapses to the empty/default value
//! rather than failing the save, and running the sanitizers over already
//! sanitized values changes nothing.

use std::collections::HashSet;

use ammonia::Builder as AmmoniaBuilder;
use time::{Date, Time};
use url::Url;

use crate::domain::entities::{AddressComponent, GeoPoint};
use crate::domain::schedule::{self, ScheduleFields};
use crate::domain::types::{AttendanceMode, EventStatus};

/// Raw event attributes as submitted by the admin form.
///
/// The form layer copies only these declared fields out of a submission;
/// anything else posted is dropped.
#[derive(Debug, Clone, Default)]
pub struct RawEventMetadata {
    pub featured: String,
    pub full_day: String,
    pub start_date: String,
    pub start_time: String,
    pub end_date: String,
    pub end_time: String,
    pub status: String,
    pub attendance_mode: String,
    pub location: String,
    pub location_url: String,
    pub virtual_location_name: String,
    pub geo_address: String,
    pub geo_lat: String,
    pub geo_lng: String,
    pub geo_zoom: String,
    pub geo_components: String,
}

/// Typed, sanitized event attributes ready for normalization and persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct EventMetadata {
    pub featured: bool,
    pub schedule: ScheduleFields,
    pub status: EventStatus,
    pub attendance_mode: AttendanceMode,
    pub location: String,
    pub location_url: String,
    pub virtual_location_name: String,
    pub geo: Option<GeoPoint>,
}

/// Apply the per-field sanitizers to a raw submission.
pub fn sanitize_metadata(raw: &RawEventMetadata) -> EventMetadata {
    let geo_address = sanitize_text(&raw.geo_address);
    // The picker writes an address whenever it resolved a place; without
    // one the remaining geo fields are stale leftovers.
    let geo = (!geo_address.is_empty()).then(|| GeoPoint {
        address: geo_address,
        lat: sanitize_coordinate(&raw.geo_lat),
        lng: sanitize_coordinate(&raw.geo_lng),
        zoom: sanitize_zoom(&raw.geo_zoom),
        components: sanitize_components(&raw.geo_components),
    });

    EventMetadata {
        featured: sanitize_truthy(&raw.featured),
        schedule: ScheduleFields {
            start_date: sanitize_date_field(&raw.start_date),
            start_time: sanitize_time_field(&raw.start_time),
            end_date: sanitize_date_field(&raw.end_date),
            end_time: sanitize_time_field(&raw.end_time),
            full_day: sanitize_truthy(&raw.full_day),
        },
        status: sanitize_status(&raw.status),
        attendance_mode: sanitize_attendance_mode(&raw.attendance_mode),
        location: sanitize_text(&raw.location),
        location_url: sanitize_url(&raw.location_url),
        virtual_location_name: sanitize_text(&raw.virtual_location_name),
        geo,
    }
}

/// Checkbox-style truthy coercion.
pub fn sanitize_truthy(raw: &str) -> bool {
    !matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "" | "0" | "false" | "off" | "no"
    )
}

/// Strict `YYYY-MM-DD`, anything else becomes absent.
pub fn sanitize_date_field(raw: &str) -> Option<Date> {
    schedule::parse_date(raw)
}

/// Strict 24-hour `HH:MM`, anything else becomes absent.
pub fn sanitize_time_field(raw: &str) -> Option<Time> {
    schedule::parse_time(raw)
}

pub fn sanitize_status(raw: &str) -> EventStatus {
    EventStatus::try_from(raw.trim()).unwrap_or_default()
}

pub fn sanitize_attendance_mode(raw: &str) -> AttendanceMode {
    AttendanceMode::try_from(raw.trim()).unwrap_or_default()
}

/// Strip markup and collapse whitespace in a free-text field.
pub fn sanitize_text(raw: &str) -> String {
    let mut text = String::with_capacity(raw.len());
    let mut in_tag = false;
    let mut last_was_space = false;

    for ch in raw.chars() {
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
    }

    text.trim_end().to_string()
}

/// Keep syntactically valid `http`/`https` URLs; everything else is dropped.
pub fn sanitize_url(raw: &str) -> String {
    match Url::parse(raw.trim()) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => url.to_string(),
        _ => String::new(),
    }
}

/// Numeric coercion for geo coordinates; non-finite input becomes absent.
pub fn sanitize_coordinate(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Non-negative integer coercion for the map zoom level.
pub fn sanitize_zoom(raw: &str) -> u32 {
    let trimmed = raw.trim();
    trimmed
        .parse::<u32>()
        .ok()
        .or_else(|| trimmed.parse::<f64>().ok().map(|value| value.abs() as u32))
        .unwrap_or(0)
}

/// JSON-encoded address components, decode-or-empty.
pub fn sanitize_components(raw: &str) -> Vec<AddressComponent> {
    serde_json::from_str(raw).unwrap_or_default()
}

/// Sanitize the event body HTML with the allow-list below.
pub fn sanitize_content_html(raw: &str) -> String {
    body_sanitizer().clean(raw).to_string()
}

fn body_sanitizer() -> AmmoniaBuilder<'static> {
    let mut builder = AmmoniaBuilder::default();

    let tags: HashSet<&'static str> = HashSet::from([
        "a",
        "abbr",
        "blockquote",
        "br",
        "code",
        "em",
        "figcaption",
        "figure",
        "h2",
        "h3",
        "h4",
        "hr",
        "i",
        "img",
        "li",
        "ol",
        "p",
        "pre",
        "s",
        "strong",
        "u",
        "ul",
    ]);
    builder.tags(tags);

    let generic: HashSet<&'static str> = HashSet::from(["class", "id", "title", "lang", "dir"]);
    builder.generic_attributes(generic);

    builder.add_tag_attributes("a", &["target"]);
    builder.add_tag_attributes("img", &["alt", "width", "height", "loading", "title"]);

    builder.add_url_schemes(["http", "https", "mailto", "tel"].iter().copied());

    builder
}

/// Which location-related form fields apply to an attendance mode.
///
/// Presentation state only: the server accepts and sanitizes every field
/// regardless, so a hidden field never desyncs a save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldVisibility {
    pub location: bool,
    pub location_url: bool,
    pub virtual_location_name: bool,
    pub geo_picker: bool,
}

pub fn visibility_for(mode: AttendanceMode) -> FieldVisibility {
    match mode {
        AttendanceMode::Offline => FieldVisibility {
            location: true,
            location_url: false,
            virtual_location_name: false,
            geo_picker: true,
        },
        AttendanceMode::Online => FieldVisibility {
            location: false,
            location_url: true,
            virtual_location_name: true,
            geo_picker: false,
        },
        AttendanceMode::Mixed => FieldVisibility {
            location: true,
            location_url: true,
            virtual_location_name: true,
            geo_picker: true,
        },
    }
}
