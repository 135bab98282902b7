use chrono::{
    DateTime, Datelike, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone,
    Timelike, Utc,
};
use chrono_tz::Tz;
use time::format_description::well_known::Rfc3339;
use time::{Date, Month, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

pub fn localized_datetime(time: OffsetDateTime, tz: Tz) -> DateTime<Tz> {
    let utc = time.to_offset(UtcOffset::UTC);
    let seconds = utc.unix_timestamp();
    let nanos: u32 = utc.nanosecond();
    let datetime_utc = DateTime::<Utc>::from_timestamp(seconds, nanos).unwrap_or_else(|| {
        DateTime::<Utc>::from_timestamp(seconds, 0).expect("valid UTC timestamp")
    });
    tz.from_utc_datetime(&datetime_utc.naive_utc())
}

/// The wall-clock reading of an instant in the given zone.
pub fn localized_wall_time(time: OffsetDateTime, tz: Tz) -> PrimitiveDateTime {
    primitive_from_naive(localized_datetime(time, tz).naive_local())
}

/// Attach the zone's UTC offset to a stored wall-clock value.
///
/// Ambiguous readings (clocks rolled back) take the earlier offset; readings
/// inside a spring-forward gap fall back to interpreting the wall clock as
/// UTC so the instant stays deterministic.
pub fn resolve_local(wall: PrimitiveDateTime, tz: Tz) -> OffsetDateTime {
    let naive = naive_from_wall(wall);
    let localized = match tz.from_local_datetime(&naive) {
        LocalResult::Single(moment) => moment,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => tz.from_utc_datetime(&naive),
    };
    offset_datetime_from(localized)
}

/// The UTC instant a stored wall-clock value refers to.
pub fn utc_instant(wall: PrimitiveDateTime, tz: Tz) -> OffsetDateTime {
    resolve_local(wall, tz).to_offset(UtcOffset::UTC)
}

/// RFC 3339 rendering of a stored wall-clock value with its zone offset.
pub fn iso8601(wall: PrimitiveDateTime, tz: Tz) -> String {
    resolve_local(wall, tz)
        .format(&Rfc3339)
        .expect("valid RFC 3339 timestamp")
}

fn offset_datetime_from(localized: DateTime<Tz>) -> OffsetDateTime {
    let offset = UtcOffset::from_whole_seconds(localized.offset().fix().local_minus_utc())
        .expect("valid UTC offset from chrono to time conversion");
    OffsetDateTime::from_unix_timestamp(localized.timestamp())
        .expect("valid unix timestamp from chrono to time conversion")
        .to_offset(offset)
}

fn naive_from_wall(wall: PrimitiveDateTime) -> NaiveDateTime {
    let date = NaiveDate::from_ymd_opt(
        wall.year(),
        u32::from(u8::from(wall.month())),
        u32::from(wall.day()),
    )
    .expect("valid date value from time to chrono conversion");
    let time = NaiveTime::from_hms_opt(
        u32::from(wall.hour()),
        u32::from(wall.minute()),
        u32::from(wall.second()),
    )
    .expect("valid time value from time to chrono conversion");
    NaiveDateTime::new(date, time)
}

fn primitive_from_naive(naive: NaiveDateTime) -> PrimitiveDateTime {
    let month = Month::try_from(naive.month() as u8)
        .expect("valid month value from chrono to time conversion");
    let day = u8::try_from(naive.day()).expect("valid day value from chrono to time conversion");
    let date = Date::from_calendar_date(naive.year(), month, day).expect("valid calendar date");
    let time = Time::from_hms(
        naive.hour() as u8,
        naive.minute() as u8,
        naive.second() as u8,
    )
    .expect("valid clock time from chrono to time conversion");
    PrimitiveDateTime::new(date, time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::America::{New_York, Santiago};
    use time::macros::datetime;

    #[test]
    fn resolves_a_plain_winter_wall_time() {
        let resolved = resolve_local(datetime!(2024-01-15 12:00:00), New_York);
        assert_eq!(resolved, datetime!(2024-01-15 12:00:00 -5));
        assert_eq!(
            iso8601(datetime!(2024-01-15 12:00:00), New_York),
            "2024-01-15T12:00:00-05:00"
        );
    }

    #[test]
    fn ambiguous_fall_back_times_take_the_earlier_offset() {
        let resolved = resolve_local(datetime!(2024-11-03 01:30:00), New_York);
        assert_eq!(resolved.offset().whole_hours(), -4);
    }

    #[test]
    fn spring_forward_gap_degrades_to_utc() {
        let instant = utc_instant(datetime!(2024-03-10 02:30:00), New_York);
        assert_eq!(instant, datetime!(2024-03-10 02:30:00 UTC));
    }

    #[test]
    fn wall_clock_reading_crosses_the_date_line_backwards() {
        let wall = localized_wall_time(datetime!(2024-05-01 00:30:00 UTC), Santiago);
        assert_eq!(wall, datetime!(2024-04-30 20:30:00));
    }
}
