//! Wire representations for the read-only JSON API.

use chrono_tz::Tz;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::entities::{EventRecord, TermRecord};
use crate::util::timezone;

/// An event as the API reports it. Schedule values are rendered as ISO-8601
/// strings carrying the site timezone offset; the raw editor fields and the
/// HTML body stay internal.
#[derive(Debug, Serialize)]
pub struct EventItem {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub attendance_mode: &'static str,
    pub status: &'static str,
    pub dtstart: Option<String>,
    pub dtend: Option<String>,
    pub full_day: bool,
    pub location: String,
    pub location_url: String,
    pub virtual_location_name: String,
    pub featured: bool,
    pub published_at: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TermItem {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub parent_id: Option<Uuid>,
}

pub fn event_to_item(record: &EventRecord, tz: Tz) -> EventItem {
    EventItem {
        id: record.id,
        slug: record.slug.clone(),
        title: record.title.clone(),
        attendance_mode: record.attendance_mode.as_str(),
        status: record.status.as_str(),
        dtstart: record.dtstart.map(|wall| timezone::iso8601(wall, tz)),
        dtend: record.dtend.map(|wall| timezone::iso8601(wall, tz)),
        full_day: record.full_day,
        location: record.location.clone(),
        location_url: record.location_url.clone(),
        virtual_location_name: record.virtual_location_name.clone(),
        featured: record.featured,
        published_at: record
            .published_at
            .map(|at| timezone::localized_datetime(at, tz).to_rfc3339()),
    }
}

pub fn term_to_item(record: &TermRecord) -> TermItem {
    TermItem {
        id: record.id,
        slug: record.slug.clone(),
        name: record.name.clone(),
        parent_id: record.parent_id,
    }
}
