use chrono::{DateTime, Datelike, Duration, FixedOffset, Local, NaiveDate, TimeZone};

/// Format a timestamp as a 12-hour clock label, e.g. "3:45 PM"
pub fn clock_label<Tz: TimeZone>(time: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    time.format("%-I:%M %p").to_string()
}

/// Last day (Sunday) of the Monday-based week containing `today`
pub fn end_of_week(today: NaiveDate) -> NaiveDate {
    let days_left = 6 - today.weekday().num_days_from_monday();
    today
        .checked_add_signed(Duration::days(days_left as i64))
        .unwrap_or(today)
}

/// Parse an RFC 3339 timestamp keeping its own offset
pub fn parse_rfc3339(value: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(value.trim()).ok()
}

/// Parse a date-only value (YYYY-MM-DD) into local midnight
pub fn parse_local_date(value: &str) -> Option<DateTime<Local>> {
    let date = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()?;
    local_midnight(date)
}

/// Local midnight of `date`.
///
/// When the local zone skips midnight (DST transitions in some zones) the
/// first valid instant of the day is used instead.
pub fn local_midnight(date: NaiveDate) -> Option<DateTime<Local>> {
    for hour in 0..3 {
        let naive = date.and_hms_opt(hour, 0, 0)?;
        match Local.from_local_datetime(&naive) {
            chrono::LocalResult::Single(dt) => return Some(dt),
            chrono::LocalResult::Ambiguous(earliest, _) => return Some(earliest),
            chrono::LocalResult::None => continue,
        }
    }
    None
}
