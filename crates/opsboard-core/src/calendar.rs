//! Date helpers shared by intake, ordering, filtering and analytics.
//!
//! "Local" always means the offset of the caller-supplied current timestamp;
//! nothing in here reads the system clock.

use time::format_description::well_known::Rfc3339;
use time::macros::time;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

/// Local noon, used when a calendar drop has no time-of-day to preserve.
pub const NOON: Time = time!(12:00);

/// Parse an RFC 3339 timestamp, treating anything malformed as absent.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<OffsetDateTime> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    OffsetDateTime::parse(trimmed, &Rfc3339).ok()
}

/// Format a timestamp as RFC 3339.
///
/// # Errors
/// Fails only for years outside the RFC 3339 range.
pub fn format_timestamp(ts: OffsetDateTime) -> Result<String, time::error::Format> {
    ts.format(&Rfc3339)
}

/// Combine a calendar day and a wall-clock time at the given offset.
#[must_use]
pub const fn at_local(date: Date, time: Time, offset: UtcOffset) -> OffsetDateTime {
    PrimitiveDateTime::new(date, time).assume_offset(offset)
}

/// Calendar day of `ts` as seen from `offset`.
#[must_use]
pub const fn local_date(ts: OffsetDateTime, offset: UtcOffset) -> Date {
    ts.to_offset(offset).date()
}

/// Number of calendar days in `from..=to` (zero when inverted).
#[must_use]
pub fn inclusive_days(from: Date, to: Date) -> i64 {
    if to < from {
        return 0;
    }
    (to - from).whole_days() + 1
}

/// First day of the month containing `date`.
#[must_use]
pub fn month_start(date: Date) -> Date {
    date.replace_day(1).unwrap_or(date)
}

/// Iterate every day in `from..=to`.
pub fn days_between(from: Date, to: Date) -> impl Iterator<Item = Date> {
    std::iter::successors(Some(from), move |day| day.next_day().filter(|next| *next <= to))
        .take_while(move |day| *day <= to)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime, offset};

    #[test]
    fn malformed_timestamps_are_absent() {
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("tomorrow-ish").is_none());
        assert!(parse_timestamp("2025-13-01T00:00:00Z").is_none());
        assert_eq!(
            parse_timestamp(" 2025-03-01T10:15:00+02:00 "),
            Some(datetime!(2025-03-01 10:15 +2))
        );
    }

    #[test]
    fn local_date_respects_offset() {
        let ts = datetime!(2025-03-01 23:30 UTC);
        assert_eq!(local_date(ts, offset!(+2)), date!(2025-03-02));
        assert_eq!(local_date(ts, offset!(UTC)), date!(2025-03-01));
    }

    #[test]
    fn day_ranges_are_inclusive() {
        assert_eq!(inclusive_days(date!(2025-02-27), date!(2025-03-02)), 4);
        assert_eq!(inclusive_days(date!(2025-03-02), date!(2025-03-02)), 1);
        assert_eq!(inclusive_days(date!(2025-03-03), date!(2025-03-02)), 0);
        let days: Vec<Date> = days_between(date!(2024-02-28), date!(2024-03-01)).collect();
        assert_eq!(days, vec![date!(2024-02-28), date!(2024-02-29), date!(2024-03-01)]);
        assert_eq!(days_between(date!(2024-03-02), date!(2024-03-01)).count(), 0);
    }

    #[test]
    fn month_start_resets_day() {
        assert_eq!(month_start(date!(2025-07-19)), date!(2025-07-01));
    }
}
