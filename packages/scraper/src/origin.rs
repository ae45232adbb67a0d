//! Origin update time.
//!
//! The bulletin states when the ministry last updated the figures, e.g.
//! `(as on 15.03.2020 at 09:00 AM)`. The wall-clock time is IST (UTC+5:30).

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Utc};
use regex::Regex;

/// Offset of the source's local time zone from UTC, in minutes.
pub const SOURCE_UTC_OFFSET_MINUTES: i64 = 330;

static ORIGIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)as on (\d{2})\.(\d{2})\.(\d{4}) at (\d{2}):(\d{2})\s*([AP]M)")
        .expect("valid regex")
});

/// Finds the first "as on DD.MM.YYYY at HH:MM AM/PM" stamp in `content` and
/// converts it to UTC.
///
/// The hour is read as-is, shifted back by [`SOURCE_UTC_OFFSET_MINUTES`],
/// and moved forward 12 hours when the marker is `PM`.
///
/// Returns `None` when there is no stamp or its fields do not form a valid
/// date and time. Callers treat `None` as "unknown", which is published as
/// the Unix epoch and never counts as a new update.
#[must_use]
pub fn extract_origin_update(content: &str) -> Option<DateTime<Utc>> {
    let caps = ORIGIN_RE.captures(content)?;
    let number = |i: usize| caps.get(i)?.as_str().parse::<u32>().ok();

    let day = number(1)?;
    let month = number(2)?;
    let year = i32::try_from(number(3)?).ok()?;
    let hour = number(4)?;
    let minute = number(5)?;
    let is_pm = caps.get(6)?.as_str().eq_ignore_ascii_case("pm");

    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    let time = NaiveTime::from_hms_opt(hour, minute, 0)?;

    let mut instant =
        date.and_time(time).and_utc() - TimeDelta::minutes(SOURCE_UTC_OFFSET_MINUTES);
    if is_pm {
        instant += TimeDelta::hours(12);
    }

    Some(instant)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn morning_stamp_converts_from_ist() {
        let content = "COVID-19 status (as on 15.03.2020 at 09:00 AM)";
        assert_eq!(
            extract_origin_update(content),
            Some(Utc.with_ymd_and_hms(2020, 3, 15, 3, 30, 0).unwrap())
        );
    }

    #[test]
    fn evening_stamp_adds_twelve_hours() {
        let content = "as on 15.03.2020 at 09:00 PM";
        assert_eq!(
            extract_origin_update(content),
            Some(Utc.with_ymd_and_hms(2020, 3, 15, 15, 30, 0).unwrap())
        );
    }

    #[test]
    fn early_morning_stamp_rolls_back_a_day() {
        let content = "As On 16.03.2020 At 02:15am";
        assert_eq!(
            extract_origin_update(content),
            Some(Utc.with_ymd_and_hms(2020, 3, 15, 20, 45, 0).unwrap())
        );
    }

    #[test]
    fn first_stamp_wins() {
        let content = "as on 01.04.2020 at 10:00 AM ... as on 02.04.2020 at 10:00 AM";
        assert_eq!(
            extract_origin_update(content),
            Some(Utc.with_ymd_and_hms(2020, 4, 1, 4, 30, 0).unwrap())
        );
    }

    #[test]
    fn missing_stamp_is_unknown() {
        assert_eq!(extract_origin_update("no timestamp here"), None);
    }

    #[test]
    fn impossible_date_is_unknown() {
        assert_eq!(extract_origin_update("as on 31.02.2020 at 09:00 AM"), None);
    }
}
