use time::{macros::format_description, Date, Duration, OffsetDateTime, Time, UtcOffset};

/// Campus-local offset; falls back to UTC on an out-of-range value.
pub fn campus_offset(hours: i8) -> UtcOffset {
    UtcOffset::from_hms(hours, 0, 0).unwrap_or(UtcOffset::UTC)
}

pub fn local_now(hours: i8) -> OffsetDateTime {
    OffsetDateTime::now_utc().to_offset(campus_offset(hours))
}

/// Local midnight through 23:59:59.999 of the day containing `now`.
pub fn day_bounds(now: OffsetDateTime) -> (OffsetDateTime, OffsetDateTime) {
    let start = now.replace_time(Time::MIDNIGHT);
    let end = start + Duration::days(1) - Duration::milliseconds(1);
    (start, end)
}

/// Parses a `YYYY-MM-DD` calendar date.
pub fn parse_date(raw: &str) -> Option<Date> {
    Date::parse(raw.trim(), format_description!("[year]-[month]-[day]")).ok()
}

pub fn format_date(date: Date) -> String {
    date.format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| date.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn bounds_cover_the_local_day() {
        let now = datetime!(2024-03-05 13:45:10 -5);
        let (start, end) = day_bounds(now);
        assert_eq!(start, datetime!(2024-03-05 00:00:00 -5));
        assert_eq!(end, datetime!(2024-03-05 23:59:59.999 -5));
        assert!(start <= now && now <= end);
    }

    #[test]
    fn dates_round_trip_through_iso_text() {
        let d = parse_date("2024-03-05").unwrap();
        assert_eq!(d, time::macros::date!(2024 - 03 - 05));
        assert_eq!(format_date(d), "2024-03-05");
        assert!(parse_date("03/05/2024").is_none());
    }

    #[test]
    fn offset_outside_range_is_utc() {
        assert_eq!(campus_offset(-5).whole_hours(), -5);
        assert_eq!(campus_offset(99), UtcOffset::UTC);
    }
}
