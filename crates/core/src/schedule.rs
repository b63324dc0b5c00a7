//! First-run computation for the recurring broadcast.

use chrono::{DateTime, Duration, FixedOffset, NaiveTime, Utc};

/// Reference offset of the broadcast schedule (UTC+3).
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = 3;

/// Hour of day (in the reference offset) the broadcast fires at.
pub const DEFAULT_BROADCAST_HOUR: u32 = 8;

/// Computes the instant of the first scheduled firing: the calendar day
/// after `now` in the given fixed offset, at `hour:00:00` wall-clock time.
///
/// The result is independent of how far into the current day `now` falls; a
/// call one minute after midnight and one a minute before the next midnight
/// land on the same instant.
pub fn next_morning_run(now: DateTime<Utc>, offset: FixedOffset, hour: u32) -> DateTime<Utc> {
    let local_today = now.with_timezone(&offset).date_naive();
    let wall_time = NaiveTime::from_hms_opt(hour.min(23), 0, 0).unwrap_or(NaiveTime::MIN);
    let wall = (local_today + Duration::days(1)).and_time(wall_time);
    // A fixed offset has no gaps or overlaps, so converting the wall-clock
    // value back to UTC is plain arithmetic.
    let naive_utc = wall - Duration::seconds(i64::from(offset.local_minus_utc()));
    DateTime::from_naive_utc_and_offset(naive_utc, Utc)
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, FixedOffset, Timelike, Utc};

    use super::{next_morning_run, DEFAULT_BROADCAST_HOUR, DEFAULT_UTC_OFFSET_HOURS};

    fn reference_offset() -> FixedOffset {
        FixedOffset::east_opt(DEFAULT_UTC_OFFSET_HOURS * 3_600).expect("valid offset")
    }

    fn instant(raw: &str) -> DateTime<Utc> {
        raw.parse().expect("valid RFC 3339 instant")
    }

    #[test]
    fn first_run_is_at_eight_local_on_the_following_day() {
        let now = instant("2026-08-06T12:00:00Z");
        let run = next_morning_run(now, reference_offset(), DEFAULT_BROADCAST_HOUR);

        let local = run.with_timezone(&reference_offset());
        assert_eq!(local.date_naive().to_string(), "2026-08-07");
        assert_eq!((local.hour(), local.minute(), local.second()), (8, 0, 0));
    }

    #[test]
    fn first_run_is_independent_of_time_of_day() {
        let offset = reference_offset();
        let early = next_morning_run(instant("2026-08-06T00:10:00Z"), offset, 8);
        let late = next_morning_run(instant("2026-08-06T20:45:00Z"), offset, 8);
        assert_eq!(early, late);
        assert_eq!(early, instant("2026-08-07T05:00:00Z"));
    }

    #[test]
    fn local_day_boundary_is_the_offset_day_not_the_utc_day() {
        // 22:30 UTC is already 01:30 of the next day in UTC+3, so the first
        // run lands one local day later than the UTC date suggests.
        let run = next_morning_run(instant("2026-08-06T22:30:00Z"), reference_offset(), 8);
        assert_eq!(run, instant("2026-08-08T05:00:00Z"));
    }

    #[test]
    fn out_of_range_hour_is_clamped() {
        let run = next_morning_run(instant("2026-08-06T12:00:00Z"), reference_offset(), 99);
        let local = run.with_timezone(&reference_offset());
        assert_eq!(local.hour(), 23);
    }
}
