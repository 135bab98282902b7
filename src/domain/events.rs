//! Derived display values over a normalized event schedule.

use time::format_description::FormatItem;
use time::macros::format_description;
use time::{Date, PrimitiveDateTime};

use crate::domain::schedule::TIME_FORMAT;

pub const HUMAN_DATE_FORMAT: &[FormatItem<'static>] =
    format_description!("[month repr:long] [day padding:none], [year]");
pub const MONTH_LABEL_FORMAT: &[FormatItem<'static>] = format_description!("[month repr:short]");

pub fn format_human_date(date: Date) -> String {
    date.format(HUMAN_DATE_FORMAT).expect("valid calendar date")
}

pub fn format_clock_time(moment: PrimitiveDateTime) -> String {
    moment.time().format(TIME_FORMAT).expect("valid clock time")
}

/// Single date when the event starts and ends on the same day, otherwise
/// `"{start} to {end}"`.
pub fn date_range(dtstart: PrimitiveDateTime, dtend: PrimitiveDateTime) -> String {
    if dtstart.date() == dtend.date() {
        format_human_date(dtstart.date())
    } else {
        format!(
            "{} to {}",
            format_human_date(dtstart.date()),
            format_human_date(dtend.date())
        )
    }
}

/// `"from {start}"` for full-day events, the bare time when start and end
/// coincide, otherwise `"{start} - {end}"`.
pub fn time_range(dtstart: PrimitiveDateTime, dtend: PrimitiveDateTime, full_day: bool) -> String {
    let start = format_clock_time(dtstart);
    if full_day {
        format!("from {start}")
    } else {
        let end = format_clock_time(dtend);
        if start == end {
            start
        } else {
            format!("{start} - {end}")
        }
    }
}

/// Short month label for the listing badge.
pub fn month_name(dtstart: PrimitiveDateTime) -> String {
    dtstart
        .date()
        .format(MONTH_LABEL_FORMAT)
        .expect("valid month label")
}

/// Unpadded day of month for the listing badge.
pub fn day_of_month(dtstart: PrimitiveDateTime) -> String {
    dtstart.day().to_string()
}

/// Whether a single-event page should carry a `noindex` robots directive.
///
/// Finished events are deindexed; an event with a start but no recorded end
/// counts as finished once the start has passed. Events with no schedule at
/// all stay indexable.
pub fn should_noindex(
    dtstart: Option<PrimitiveDateTime>,
    dtend: Option<PrimitiveDateTime>,
    now: PrimitiveDateTime,
) -> bool {
    match (dtstart, dtend) {
        (_, Some(end)) => now > end,
        (Some(start), None) => now > start,
        (None, None) => false,
    }
}
