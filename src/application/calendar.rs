//! Google Calendar template links for event detail pages.

use chrono_tz::Tz;
use thiserror::Error;
use time::{PrimitiveDateTime, format_description::FormatItem, macros::format_description};
use tracing::debug;
use url::form_urlencoded::Serializer;

use crate::domain::entities::EventRecord;
use crate::domain::types::AttendanceMode;
use crate::util::timezone::utc_instant;

const GOOGLE_CALENDAR_BASE: &str = "https://calendar.google.com/calendar/render";

/// Timestamp layout Google expects inside the `dates` parameter, always UTC.
const GOOGLE_STAMP_FORMAT: &[FormatItem<'static>] = format_description!(
    "[year][month padding:zero][day padding:zero]T[hour padding:zero][minute padding:zero][second padding:zero]Z"
);

#[derive(Debug, Error)]
enum CalendarLinkError {
    #[error("event has no normalized schedule")]
    MissingSchedule,
    #[error("failed to format calendar timestamp: {0}")]
    Stamp(#[from] time::error::Format),
}

/// Build the shareable "add to Google Calendar" URL for an event.
///
/// A schedule that cannot be rendered degrades to an empty string so the
/// page still renders; the failure is logged at debug level.
pub fn calendar_link(event: &EventRecord, permalink: &str, timezone: Tz) -> String {
    match build_calendar_link(event, permalink, timezone) {
        Ok(url) => url,
        Err(err) => {
            debug!(
                target = "velada::calendar",
                event_id = %event.id,
                error = %err,
                "calendar link generation failed"
            );
            String::new()
        }
    }
}

fn build_calendar_link(
    event: &EventRecord,
    permalink: &str,
    timezone: Tz,
) -> Result<String, CalendarLinkError> {
    let dtstart = event.dtstart.ok_or(CalendarLinkError::MissingSchedule)?;
    let dtend = event.dtend.ok_or(CalendarLinkError::MissingSchedule)?;

    let start = stamp(dtstart, timezone)?;
    let end = stamp(dtend, timezone)?;

    let mut serializer = Serializer::new(String::new());
    serializer.append_pair("action", "TEMPLATE");
    serializer.append_pair("text", &event.title);
    serializer.append_pair("dates", &format!("{start}/{end}"));
    serializer.append_pair("details", &format!("More information at: {permalink}"));
    if let Some(address) = physical_address(event) {
        serializer.append_pair("location", address);
    }

    Ok(format!("{GOOGLE_CALENDAR_BASE}?{}", serializer.finish()))
}

fn stamp(wall: PrimitiveDateTime, timezone: Tz) -> Result<String, CalendarLinkError> {
    Ok(utc_instant(wall, timezone).format(GOOGLE_STAMP_FORMAT)?)
}

/// Online events never carry a venue; offline and mixed ones do when the
/// location picker resolved an address.
fn physical_address(event: &EventRecord) -> Option<&str> {
    if event.attendance_mode == AttendanceMode::Online {
        return None;
    }
    event
        .geo
        .as_ref()
        .map(|geo| geo.address.as_str())
        .filter(|address| !address.is_empty())
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;
    use uuid::Uuid;

    use super::*;
    use crate::domain::entities::GeoPoint;
    use crate::domain::types::EventStatus;

    fn sample_event() -> EventRecord {
        EventRecord {
            id: Uuid::new_v4(),
            slug: "spring-gala".to_string(),
            title: "Spring Gala".to_string(),
            content_html: "<p>Dance all night.</p>".to_string(),
            image_url: None,
            attendance_mode: AttendanceMode::Offline,
            status: EventStatus::default(),
            start_date: None,
            start_time: None,
            end_date: None,
            end_time: None,
            full_day: false,
            dtstart: Some(datetime!(2024-05-01 09:00:00)),
            dtend: Some(datetime!(2024-05-01 11:00:00)),
            location: String::new(),
            location_url: String::new(),
            virtual_location_name: String::new(),
            geo: None,
            featured: false,
            published_at: Some(datetime!(2024-04-01 12:00:00 UTC)),
            created_at: datetime!(2024-04-01 12:00:00 UTC),
            updated_at: datetime!(2024-04-01 12:00:00 UTC),
        }
    }

    #[test]
    fn link_converts_wall_times_to_utc_stamps() {
        let event = sample_event();
        let link = calendar_link(&event, "https://example.org/events/spring-gala", chrono_tz::America::New_York);

        assert!(link.starts_with("https://calendar.google.com/calendar/render?action=TEMPLATE"));
        assert!(link.contains("dates=20240501T130000Z%2F20240501T150000Z"));
        assert!(link.contains("text=Spring+Gala"));
    }

    #[test]
    fn details_carry_the_permalink_back_link() {
        let event = sample_event();
        let link = calendar_link(&event, "https://example.org/events/spring-gala", chrono_tz::UTC);

        assert!(link.contains(
            "details=More+information+at%3A+https%3A%2F%2Fexample.org%2Fevents%2Fspring-gala"
        ));
    }

    #[test]
    fn offline_event_with_address_includes_location() {
        let mut event = sample_event();
        event.geo = Some(GeoPoint {
            address: "Plaza de Armas, Santiago".to_string(),
            lat: Some(-33.437),
            lng: Some(-70.650),
            zoom: 15,
            components: Vec::new(),
        });

        let link = calendar_link(&event, "https://example.org/events/spring-gala", chrono_tz::UTC);

        assert!(link.contains("location=Plaza+de+Armas%2C+Santiago"));
    }

    #[test]
    fn online_event_never_includes_location() {
        let mut event = sample_event();
        event.attendance_mode = AttendanceMode::Online;
        event.geo = Some(GeoPoint {
            address: "Plaza de Armas, Santiago".to_string(),
            lat: None,
            lng: None,
            zoom: 0,
            components: Vec::new(),
        });

        let link = calendar_link(&event, "https://example.org/events/spring-gala", chrono_tz::UTC);

        assert!(!link.contains("location="));
    }

    #[test]
    fn event_without_schedule_degrades_to_empty_link() {
        let mut event = sample_event();
        event.dtstart = None;
        event.dtend = None;

        let link = calendar_link(&event, "https://example.org/events/spring-gala", chrono_tz::UTC);

        assert_eq!(link, "");
    }
}
