//! Domain entities mirrored from persistent storage.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};
use uuid::Uuid;

use crate::domain::types::{AttendanceMode, EventStatus};

/// One component of a reverse-geocoded address, as posted by the
/// location picker (e.g. `{"long_name": "Valdivia", "types": ["locality"]}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressComponent {
    pub long_name: String,
    #[serde(default)]
    pub types: Vec<String>,
}

/// A resolved physical place. Present only when the location picker
/// resolved an address for the event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub address: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub zoom: u32,
    pub components: Vec<AddressComponent>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRecord {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub content_html: String,
    pub image_url: Option<String>,
    pub attendance_mode: AttendanceMode,
    pub status: EventStatus,
    /// Raw schedule fields as submitted, kept so the editor can redisplay
    /// them. `dtstart`/`dtend` are derived from these on every save.
    pub start_date: Option<Date>,
    pub start_time: Option<Time>,
    pub end_date: Option<Date>,
    pub end_time: Option<Time>,
    pub full_day: bool,
    /// Canonical schedule: wall-clock datetimes in the site timezone.
    pub dtstart: Option<PrimitiveDateTime>,
    pub dtend: Option<PrimitiveDateTime>,
    pub location: String,
    pub location_url: String,
    pub virtual_location_name: String,
    pub geo: Option<GeoPoint>,
    pub featured: bool,
    pub published_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl EventRecord {
    pub fn is_published(&self) -> bool {
        self.published_at.is_some()
    }
}

/// A node of the hierarchical events taxonomy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TermRecord {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub parent_id: Option<Uuid>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteSettingsRecord {
    pub site_title: String,
    pub meta_description: String,
    pub public_site_url: String,
    pub timezone: Tz,
    pub updated_at: OffsetDateTime,
}
