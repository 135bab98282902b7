//! Shared domain enumerations aligned with persisted database enums.

use serde::{Deserialize, Serialize};

/// How an event is attended, following the schema.org
/// `EventAttendanceModeEnumeration` members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "attendance_mode", rename_all = "snake_case")]
pub enum AttendanceMode {
    Offline,
    Online,
    Mixed,
}

impl AttendanceMode {
    pub const ALL: [AttendanceMode; 3] = [
        AttendanceMode::Offline,
        AttendanceMode::Online,
        AttendanceMode::Mixed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AttendanceMode::Offline => "offline",
            AttendanceMode::Online => "online",
            AttendanceMode::Mixed => "mixed",
        }
    }

    /// The schema.org member name; also the admin form wire value.
    pub fn schema_member(self) -> &'static str {
        match self {
            AttendanceMode::Offline => "OfflineEventAttendanceMode",
            AttendanceMode::Online => "OnlineEventAttendanceMode",
            AttendanceMode::Mixed => "MixedEventAttendanceMode",
        }
    }

    pub fn schema_uri(self) -> String {
        format!("https://schema.org/{}", self.schema_member())
    }

    pub fn label(self) -> &'static str {
        match self {
            AttendanceMode::Offline => "In person",
            AttendanceMode::Online => "Online",
            AttendanceMode::Mixed => "Mixed or hybrid",
        }
    }
}

impl Default for AttendanceMode {
    fn default() -> Self {
        AttendanceMode::Offline
    }
}

impl TryFrom<&str> for AttendanceMode {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "OfflineEventAttendanceMode" => Ok(AttendanceMode::Offline),
            "OnlineEventAttendanceMode" => Ok(AttendanceMode::Online),
            "MixedEventAttendanceMode" => Ok(AttendanceMode::Mixed),
            _ => Err(()),
        }
    }
}

/// Scheduling state of an event, following the schema.org
/// `EventStatusType` members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "event_status", rename_all = "snake_case")]
pub enum EventStatus {
    Scheduled,
    MovedOnline,
    Rescheduled,
    Cancelled,
    Postponed,
}

impl EventStatus {
    pub const ALL: [EventStatus; 5] = [
        EventStatus::Scheduled,
        EventStatus::MovedOnline,
        EventStatus::Rescheduled,
        EventStatus::Cancelled,
        EventStatus::Postponed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EventStatus::Scheduled => "scheduled",
            EventStatus::MovedOnline => "moved_online",
            EventStatus::Rescheduled => "rescheduled",
            EventStatus::Cancelled => "cancelled",
            EventStatus::Postponed => "postponed",
        }
    }

    /// The schema.org member name; also the admin form wire value.
    pub fn schema_member(self) -> &'static str {
        match self {
            EventStatus::Scheduled => "EventScheduled",
            EventStatus::MovedOnline => "EventMovedOnline",
            EventStatus::Rescheduled => "EventRescheduled",
            EventStatus::Cancelled => "EventCancelled",
            EventStatus::Postponed => "EventPostponed",
        }
    }

    pub fn schema_uri(self) -> String {
        format!("https://schema.org/{}", self.schema_member())
    }

    pub fn label(self) -> &'static str {
        match self {
            EventStatus::Scheduled => "Scheduled as planned",
            EventStatus::MovedOnline => "Moved from in-person to online",
            EventStatus::Rescheduled => "Rescheduled",
            EventStatus::Cancelled => "Cancelled",
            EventStatus::Postponed => "Postponed",
        }
    }
}

impl Default for EventStatus {
    fn default() -> Self {
        EventStatus::Scheduled
    }
}

impl TryFrom<&str> for EventStatus {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "EventScheduled" => Ok(EventStatus::Scheduled),
            "EventMovedOnline" => Ok(EventStatus::MovedOnline),
            "EventRescheduled" => Ok(EventStatus::Rescheduled),
            "EventCancelled" => Ok(EventStatus::Cancelled),
            "EventPostponed" => Ok(EventStatus::Postponed),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attendance_mode_round_trips_through_schema_member() {
        for mode in AttendanceMode::ALL {
            assert_eq!(AttendanceMode::try_from(mode.schema_member()), Ok(mode));
        }
    }

    #[test]
    fn unknown_attendance_mode_is_rejected() {
        assert!(AttendanceMode::try_from("HybridEventAttendanceMode").is_err());
        assert!(AttendanceMode::try_from("").is_err());
    }

    #[test]
    fn event_status_round_trips_through_schema_member() {
        for status in EventStatus::ALL {
            assert_eq!(EventStatus::try_from(status.schema_member()), Ok(status));
        }
    }

    #[test]
    fn schema_uris_point_at_schema_org() {
        assert_eq!(
            AttendanceMode::Offline.schema_uri(),
            "https://schema.org/OfflineEventAttendanceMode"
        );
        assert_eq!(
            EventStatus::Postponed.schema_uri(),
            "https://schema.org/EventPostponed"
        );
    }
}
