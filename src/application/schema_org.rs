//! schema.org `Event` JSON-LD for the single-event page.

use chrono_tz::Tz;
use serde_json::{Value, json};
use url::Url;

use crate::domain::entities::{AddressComponent, EventRecord};
use crate::domain::metadata::sanitize_text;
use crate::domain::types::AttendanceMode;
use crate::util::timezone::iso8601;

/// Serialize the structured-data object for an event, or `None` when no
/// usable location exists. Search engines reject a partial `Event`, so a
/// location-less schema is omitted entirely.
pub fn event_ld_json(event: &EventRecord, permalink: &str, timezone: Tz) -> Option<String> {
    let schema = event_schema(event, permalink, timezone)?;
    serde_json::to_string(&schema).ok()
}

fn event_schema(event: &EventRecord, permalink: &str, timezone: Tz) -> Option<Value> {
    let mut schema = json!({
        "@context": "http://schema.org",
        "@type": "Event",
        "name": event.title,
        "eventStatus": event.status.schema_uri(),
        "eventAttendanceMode": event.attendance_mode.schema_uri(),
    });

    if let (Some(dtstart), Some(dtend)) = (event.dtstart, event.dtend) {
        schema["startDate"] = json!(iso8601(dtstart, timezone));
        schema["endDate"] = json!(iso8601(dtend, timezone));
    }

    let mut locations = Vec::new();
    if let Some(place) = place_location(event) {
        locations.push(place);
    }
    if let Some(virtual_location) = virtual_location(event, permalink) {
        locations.push(virtual_location);
    }
    if locations.is_empty() {
        return None;
    }

    schema["location"] = Value::Array(locations);
    schema["description"] = json!(sanitize_text(&event.content_html));
    if let Some(image_url) = &event.image_url {
        schema["image"] = json!(image_url);
    }

    Some(schema)
}

fn place_location(event: &EventRecord) -> Option<Value> {
    if !matches!(
        event.attendance_mode,
        AttendanceMode::Offline | AttendanceMode::Mixed
    ) {
        return None;
    }
    let geo = event.geo.as_ref()?;

    Some(json!({
        "@type": "Place",
        "name": event.location,
        "geo": {
            "@type": "GeoCoordinates",
            "latitude": geo.lat.unwrap_or(0.0),
            "longitude": geo.lng.unwrap_or(0.0),
        },
        "address": {
            "@type": "PostalAddress",
            "streetAddress": geo.address,
            "addressLocality": component_by_type(&geo.components, "locality"),
            "addressRegion": component_by_type(&geo.components, "administrative_area_level_1"),
            "addressCountry": component_by_type(&geo.components, "country"),
        },
    }))
}

fn virtual_location(event: &EventRecord, permalink: &str) -> Option<Value> {
    if !matches!(
        event.attendance_mode,
        AttendanceMode::Online | AttendanceMode::Mixed
    ) {
        return None;
    }

    Some(json!({
        "@type": "VirtualLocation",
        "url": resolve_virtual_url(event, permalink),
        "name": event.virtual_location_name,
    }))
}

/// Preference order: the explicit location URL when it parses, then the
/// first link found in the body, then the event's own permalink.
fn resolve_virtual_url(event: &EventRecord, permalink: &str) -> String {
    if !event.location_url.is_empty() && Url::parse(&event.location_url).is_ok() {
        return event.location_url.clone();
    }
    if let Some(candidate) = first_url_in_content(&event.content_html) {
        if Url::parse(&candidate).is_ok() {
            return candidate;
        }
    }
    permalink.to_string()
}

/// The first quoted `href` value in the rendered body, unvalidated.
fn first_url_in_content(html: &str) -> Option<String> {
    let position = html.find("href=")?;
    let after = &html[position + "href=".len()..];
    let mut chars = after.chars();
    let quote = chars.next()?;
    if quote != '"' && quote != '\'' {
        return None;
    }
    let value = chars.as_str();
    let end = value.find(quote)?;
    Some(value[..end].to_string())
}

/// First component tagged with `component_type` wins; no match is an
/// empty string.
fn component_by_type(components: &[AddressComponent], component_type: &str) -> String {
    components
        .iter()
        .find(|component| component.types.iter().any(|tag| tag == component_type))
        .map(|component| component.long_name.clone())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;
    use uuid::Uuid;

    use super::*;
    use crate::domain::entities::GeoPoint;
    use crate::domain::types::EventStatus;

    const PERMALINK: &str = "https://example.org/events/spring-gala";

    fn sample_event(mode: AttendanceMode) -> EventRecord {
        EventRecord {
            id: Uuid::new_v4(),
            slug: "spring-gala".to_string(),
            title: "Spring Gala".to_string(),
            content_html: "<p>Dance all night.</p>".to_string(),
            image_url: None,
            attendance_mode: mode,
            status: EventStatus::default(),
            start_date: None,
            start_time: None,
            end_date: None,
            end_time: None,
            full_day: false,
            dtstart: Some(datetime!(2024-05-01 09:00:00)),
            dtend: Some(datetime!(2024-05-01 11:00:00)),
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

    fn sample_geo() -> GeoPoint {
        GeoPoint {
            address: "Plaza de Armas 100, Santiago".to_string(),
            lat: Some(-33.437),
            lng: Some(-70.650),
            zoom: 15,
            components: vec![
                AddressComponent {
                    long_name: "Santiago".to_string(),
                    types: vec!["locality".to_string(), "political".to_string()],
                },
                AddressComponent {
                    long_name: "Región Metropolitana".to_string(),
                    types: vec!["administrative_area_level_1".to_string()],
                },
                AddressComponent {
                    long_name: "Chile".to_string(),
                    types: vec!["country".to_string()],
                },
            ],
        }
    }

    #[test]
    fn offline_event_without_geo_emits_nothing() {
        let event = sample_event(AttendanceMode::Offline);

        assert_eq!(
            event_schema(&event, PERMALINK, chrono_tz::America::Santiago),
            None
        );
        assert_eq!(event_ld_json(&event, PERMALINK, chrono_tz::America::Santiago), None);
    }

    #[test]
    fn offline_event_with_geo_emits_a_place() {
        let mut event = sample_event(AttendanceMode::Offline);
        event.geo = Some(sample_geo());

        let schema = event_schema(&event, PERMALINK, chrono_tz::America::Santiago).unwrap();

        assert_eq!(schema["@type"], "Event");
        assert_eq!(schema["eventStatus"], "https://schema.org/EventScheduled");
        let locations = schema["location"].as_array().unwrap();
        assert_eq!(locations.len(), 1);
        assert_eq!(locations[0]["@type"], "Place");
        assert_eq!(locations[0]["name"], "Teatro Municipal");
        assert_eq!(locations[0]["geo"]["latitude"], -33.437);
        assert_eq!(locations[0]["address"]["addressLocality"], "Santiago");
        assert_eq!(locations[0]["address"]["addressCountry"], "Chile");
    }

    #[test]
    fn missing_component_types_become_empty_strings() {
        let mut geo = sample_geo();
        geo.components.retain(|component| {
            !component
                .types
                .iter()
                .any(|tag| tag == "administrative_area_level_1")
        });
        let mut event = sample_event(AttendanceMode::Offline);
        event.geo = Some(geo);

        let schema = event_schema(&event, PERMALINK, chrono_tz::America::Santiago).unwrap();

        assert_eq!(schema["location"][0]["address"]["addressRegion"], "");
    }

    #[test]
    fn absent_coordinates_default_to_zero() {
        let mut geo = sample_geo();
        geo.lat = None;
        geo.lng = None;
        let mut event = sample_event(AttendanceMode::Offline);
        event.geo = Some(geo);

        let schema = event_schema(&event, PERMALINK, chrono_tz::America::Santiago).unwrap();

        assert_eq!(schema["location"][0]["geo"]["latitude"], 0.0);
        assert_eq!(schema["location"][0]["geo"]["longitude"], 0.0);
    }

    #[test]
    fn online_event_without_urls_falls_back_to_permalink() {
        let event = sample_event(AttendanceMode::Online);

        let schema = event_schema(&event, PERMALINK, chrono_tz::UTC).unwrap();

        let locations = schema["location"].as_array().unwrap();
        assert_eq!(locations.len(), 1);
        assert_eq!(locations[0]["@type"], "VirtualLocation");
        assert_eq!(locations[0]["url"], PERMALINK);
    }

    #[test]
    fn explicit_location_url_wins_over_content_links() {
        let mut event = sample_event(AttendanceMode::Online);
        event.location_url = "https://meet.example.org/gala".to_string();
        event.content_html =
            r#"<p>Join <a href="https://stream.example.org/live">the stream</a>.</p>"#.to_string();

        let schema = event_schema(&event, PERMALINK, chrono_tz::UTC).unwrap();

        assert_eq!(schema["location"][0]["url"], "https://meet.example.org/gala");
    }

    #[test]
    fn first_content_link_is_used_when_no_explicit_url() {
        let mut event = sample_event(AttendanceMode::Online);
        event.content_html =
            r#"<p>Join <a href="https://stream.example.org/live">the stream</a>.</p>"#.to_string();

        let schema = event_schema(&event, PERMALINK, chrono_tz::UTC).unwrap();

        assert_eq!(schema["location"][0]["url"], "https://stream.example.org/live");
    }

    #[test]
    fn relative_content_link_falls_through_to_permalink() {
        let mut event = sample_event(AttendanceMode::Online);
        event.content_html = r#"<p><a href="/tickets">Tickets</a></p>"#.to_string();

        let schema = event_schema(&event, PERMALINK, chrono_tz::UTC).unwrap();

        assert_eq!(schema["location"][0]["url"], PERMALINK);
    }

    #[test]
    fn mixed_event_emits_both_locations() {
        let mut event = sample_event(AttendanceMode::Mixed);
        event.geo = Some(sample_geo());
        event.virtual_location_name = "Live stream".to_string();
        event.location_url = "https://stream.example.org/live".to_string();

        let schema = event_schema(&event, PERMALINK, chrono_tz::America::Santiago).unwrap();

        let locations = schema["location"].as_array().unwrap();
        assert_eq!(locations.len(), 2);
        assert_eq!(locations[0]["@type"], "Place");
        assert_eq!(locations[1]["@type"], "VirtualLocation");
        assert_eq!(locations[1]["name"], "Live stream");
    }

    #[test]
    fn schedule_renders_with_the_site_offset() {
        let mut event = sample_event(AttendanceMode::Online);
        event.virtual_location_name = "Call".to_string();

        let schema = event_schema(&event, PERMALINK, chrono_tz::America::New_York).unwrap();

        assert_eq!(schema["startDate"], "2024-05-01T09:00:00-04:00");
        assert_eq!(schema["endDate"], "2024-05-01T11:00:00-04:00");
    }

    #[test]
    fn description_is_stripped_to_text_and_image_kept() {
        let mut event = sample_event(AttendanceMode::Online);
        event.image_url = Some("https://example.org/media/gala.jpg".to_string());

        let schema = event_schema(&event, PERMALINK, chrono_tz::UTC).unwrap();

        assert_eq!(schema["description"], "Dance all night.");
        assert_eq!(schema["image"], "https://example.org/media/gala.jpg");
    }

    #[test]
    fn event_without_schedule_still_exports_locations() {
        let mut event = sample_event(AttendanceMode::Online);
        event.dtstart = None;
        event.dtend = None;

        let schema = event_schema(&event, PERMALINK, chrono_tz::UTC).unwrap();

        assert!(schema.get("startDate").is_none());
        assert_eq!(schema["location"][0]["url"], PERMALINK);
    }
}
