//! Canonical start/end derivation from the raw schedule fields.
//!
//! The editor submits separate date, time and full-day inputs. This module
//! folds them into the canonical `dtstart`/`dtend` pair stored alongside
//! the raw fields. Malformed input never fails the save: it degrades to
//! "leave the stored values unchanged" or "use the default".

use time::format_description::FormatItem;
use time::macros::{format_description, time};
use time::{Date, PrimitiveDateTime, Time};

pub const DATE_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month padding:zero]-[day padding:zero]");
pub const TIME_FORMAT: &[FormatItem<'static>] =
    format_description!("[hour padding:zero]:[minute padding:zero]");

const END_OF_DAY: Time = time!(23:59:59);

/// Strict `YYYY-MM-DD` parse; anything else is treated as absent.
pub fn parse_date(raw: &str) -> Option<Date> {
    Date::parse(raw.trim(), DATE_FORMAT).ok()
}

/// Strict 24-hour `HH:MM` parse; anything else is treated as absent.
pub fn parse_time(raw: &str) -> Option<Time> {
    Time::parse(raw.trim(), TIME_FORMAT).ok()
}

/// Sanitized schedule fields, in the shape the editor stores them.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScheduleFields {
    pub start_date: Option<Date>,
    pub start_time: Option<Time>,
    pub end_date: Option<Date>,
    pub end_time: Option<Time>,
    pub full_day: bool,
}

/// The canonical schedule produced by [`normalize`].
///
/// `dtend >= dtstart` holds by construction. `corrected_end_date` is set
/// only when the submitted end date preceded the start date and was reset;
/// callers overwrite the stored raw end date with it so the editor shows
/// the correction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedSchedule {
    pub dtstart: PrimitiveDateTime,
    pub dtend: PrimitiveDateTime,
    pub corrected_end_date: Option<Date>,
}

/// Derive the canonical schedule from the raw fields.
///
/// Returns `None` when there is no start date: the caller must keep any
/// previously stored canonical values untouched.
pub fn normalize(fields: &ScheduleFields) -> Option<NormalizedSchedule> {
    let start_date = fields.start_date?;
    let start_time = fields.start_time.unwrap_or(Time::MIDNIGHT);
    let dtstart = PrimitiveDateTime::new(start_date, start_time);

    // By default the event ends the instant it starts.
    let mut dtend = dtstart;
    let mut corrected_end_date = None;

    if let Some(end_date) = fields.end_date {
        if end_date >= start_date {
            dtend = PrimitiveDateTime::new(end_date, dtstart.time());
        } else {
            // The end date preceded the start date: reset and surface it.
            corrected_end_date = Some(start_date);
        }
    }

    if fields.full_day {
        dtend = dtend.replace_time(END_OF_DAY);
    } else if let Some(end_time) = fields.end_time {
        dtend = dtend.replace_time(end_time);
    }

    // A same-day end time earlier than the start collapses to the start.
    if dtend < dtstart {
        dtend = dtstart;
    }

    Some(NormalizedSchedule {
        dtstart,
        dtend,
        corrected_end_date,
    })
}
