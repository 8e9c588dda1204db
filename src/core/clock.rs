use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Timelike, offset::LocalResult};
use chrono_tz::Tz;

use crate::{core::interval::Interval, prelude::*};

/// Fractional hour of the local day, e.g. `22.5` for 22:30.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, derive_more::From, serde::Serialize)]
#[serde(transparent)]
#[must_use]
pub struct HourOfDay(pub f64);

impl FromStr for HourOfDay {
    type Err = Error;

    /// Parses either `"HH:MM"` clock text or a plain fractional number.
    fn from_str(text: &str) -> Result<Self> {
        if let Some((hours, minutes)) = text.split_once(':') {
            let hours: f64 = hours.trim().parse().context("invalid hour")?;
            let minutes: f64 = minutes.trim().parse().context("invalid minute")?;
            Ok(Self(hours + minutes / 60.0))
        } else {
            Ok(Self(text.trim().parse().context("invalid hour")?))
        }
    }
}

/// Condition arguments carry hours either as a number or as `"HH:MM"` text,
/// so both shapes deserialize.
impl<'de> serde::Deserialize<'de> for HourOfDay {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct HourVisitor;

        impl serde::de::Visitor<'_> for HourVisitor {
            type Value = HourOfDay;

            fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                formatter.write_str("an hour number or `HH:MM` text")
            }

            fn visit_f64<E: serde::de::Error>(self, hour: f64) -> Result<HourOfDay, E> {
                Ok(HourOfDay(hour))
            }

            fn visit_u64<E: serde::de::Error>(self, hour: u64) -> Result<HourOfDay, E> {
                Ok(HourOfDay(hour as f64))
            }

            fn visit_i64<E: serde::de::Error>(self, hour: i64) -> Result<HourOfDay, E> {
                Ok(HourOfDay(hour as f64))
            }

            fn visit_str<E: serde::de::Error>(self, text: &str) -> Result<HourOfDay, E> {
                text.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(HourVisitor)
    }
}

/// Resolve a local wall-clock time in `tz`, probing forward past DST gaps and
/// picking the earlier occurrence of an ambiguous (fall-back) time.
pub(crate) fn resolve_local(tz: Tz, mut naive: NaiveDateTime) -> Option<DateTime<Tz>> {
    for _ in 0..4 {
        match tz.from_local_datetime(&naive) {
            LocalResult::Single(at) => return Some(at),
            LocalResult::Ambiguous(first, _) => return Some(first),
            LocalResult::None => naive += TimeDelta::hours(1),
        }
    }
    None
}

/// The start-of-hour instant used as the lookup key for price points.
pub fn start_of_hour(at: DateTime<Tz>) -> DateTime<Tz> {
    at.with_minute(0)
        .and_then(|at| at.with_second(0))
        .and_then(|at| at.with_nanosecond(0))
        .unwrap_or(at)
}

/// Start of the local calendar day. Tolerates zones where midnight does not
/// exist on a DST transition day by moving forward to the first valid hour.
pub fn local_midnight(at: DateTime<Tz>) -> DateTime<Tz> {
    resolve_local(at.timezone(), at.date_naive().and_time(NaiveTime::MIN))
        .unwrap_or_else(|| start_of_hour(at))
}

/// The reference date at clock-hour `hour`, truncated to the start of the hour.
///
/// This resolves a wall-clock reading, so on a DST day `at_hour_of_day(at, 5)`
/// is 05:00 local no matter how many real hours have passed since midnight.
/// Compare [`after_midnight`], which counts absolute hours.
pub fn at_hour_of_day(at: DateTime<Tz>, hour: HourOfDay) -> DateTime<Tz> {
    let whole_hours = hour.0.max(0.0).floor() as i64;
    let naive = at.date_naive().and_time(NaiveTime::MIN) + TimeDelta::hours(whole_hours);
    resolve_local(at.timezone(), naive).unwrap_or_else(|| local_midnight(at))
}

/// Local midnight plus `hours` absolute hours (fractional allowed).
pub fn after_midnight(at: DateTime<Tz>, hours: f64) -> DateTime<Tz> {
    local_midnight(at) + TimeDelta::seconds((hours * 3600.0).round() as i64)
}

/// `hour + minute/60 + second/3600` of the local wall clock.
#[must_use]
pub fn fractional_hour(at: DateTime<Tz>) -> f64 {
    f64::from(at.hour()) + f64::from(at.minute()) / 60.0 + f64::from(at.second()) / 3600.0
}

/// Shift by whole calendar days, preserving the local clock time across DST.
pub fn shift_days(at: DateTime<Tz>, days: i64) -> DateTime<Tz> {
    at.date_naive()
        .checked_add_signed(TimeDelta::days(days))
        .and_then(|date| resolve_local(at.timezone(), date.and_time(at.time())))
        .unwrap_or_else(|| at + TimeDelta::days(days))
}

/// Concrete day-relative window between two hour-of-day markers.
///
/// `start == end` means a full 24-hour window. When the window wraps past
/// midnight (`start > end`), the occurrence containing (or nearest ahead of)
/// the reference instant is picked: if `at` is before the window's end today,
/// the window started yesterday, otherwise it ends tomorrow.
pub fn days_period(at: DateTime<Tz>, start: HourOfDay, end: HourOfDay) -> Interval {
    let start_hour = start.0;
    let mut end_hour = end.0;
    if start_hour == end_hour {
        end_hour += 24.0;
    }

    let mut start_ts = after_midnight(at, start_hour);
    let mut end_ts = after_midnight(at, end_hour);

    if start_hour >= end_hour {
        if at <= end_ts {
            start_ts = shift_days(start_ts, -1);
        } else {
            end_ts = shift_days(end_ts, 1);
        }
    }

    Interval::new(start_ts, end_ts)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use chrono_tz::Europe::Oslo;

    use super::*;

    fn oslo(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Tz> {
        Oslo.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_hour_of_day_from_clock_text() {
        assert_eq!("02:00".parse::<HourOfDay>().unwrap(), HourOfDay(2.0));
        assert_eq!("22:30".parse::<HourOfDay>().unwrap(), HourOfDay(22.5));
        assert_eq!("7".parse::<HourOfDay>().unwrap(), HourOfDay(7.0));
        assert!("h:30".parse::<HourOfDay>().is_err());
    }

    #[test]
    fn test_hour_of_day_deserializes_both_shapes() {
        assert_eq!(serde_json::from_str::<HourOfDay>("22.5").unwrap(), HourOfDay(22.5));
        assert_eq!(serde_json::from_str::<HourOfDay>("7").unwrap(), HourOfDay(7.0));
        assert_eq!(serde_json::from_str::<HourOfDay>("\"01:30\"").unwrap(), HourOfDay(1.5));
        assert!(serde_json::from_str::<HourOfDay>("\"h:30\"").is_err());
    }

    #[test]
    fn test_start_of_hour() {
        let at = oslo(2019, 1, 21, 5, 10);
        assert_eq!(start_of_hour(at), oslo(2019, 1, 21, 5, 0));
    }

    #[test]
    fn test_fractional_hour() {
        let at = Oslo.with_ymd_and_hms(2018, 12, 17, 22, 30, 0).unwrap();
        assert!((fractional_hour(at) - 22.5).abs() < 1e-9);
    }

    #[test]
    fn test_days_period_start_before_end() {
        let window =
            days_period(oslo(2022, 12, 2, 10, 0), HourOfDay(2.0), HourOfDay(7.0));
        assert_eq!(window.start.with_timezone(&Utc).to_rfc3339(), "2022-12-02T01:00:00+00:00");
        assert_eq!(window.end.with_timezone(&Utc).to_rfc3339(), "2022-12-02T06:00:00+00:00");
    }

    #[test]
    fn test_days_period_start_before_end_clock_text() {
        let start: HourOfDay = "02:00".parse().unwrap();
        let end: HourOfDay = "07:00".parse().unwrap();
        let window = days_period(oslo(2022, 12, 2, 10, 0), start, end);
        assert_eq!(window.start, oslo(2022, 12, 2, 2, 0));
        assert_eq!(window.end, oslo(2022, 12, 2, 7, 0));
    }

    #[test]
    fn test_days_period_wrapping_after_end() {
        // 10:00 is past 02:00, so the window ends tomorrow.
        let window =
            days_period(oslo(2022, 12, 2, 10, 0), HourOfDay(7.0), HourOfDay(2.0));
        assert_eq!(window.start, oslo(2022, 12, 2, 7, 0));
        assert_eq!(window.end, oslo(2022, 12, 3, 2, 0));
    }

    #[test]
    fn test_days_period_wrapping_before_end() {
        // 01:00 is before 02:00, so the containing window started yesterday.
        let window =
            days_period(oslo(2022, 12, 2, 1, 0), HourOfDay(7.0), HourOfDay(2.0));
        assert_eq!(window.start, oslo(2022, 12, 1, 7, 0));
        assert_eq!(window.end, oslo(2022, 12, 2, 2, 0));
    }

    #[test]
    fn test_days_period_full_day() {
        let window =
            days_period(oslo(2022, 12, 2, 10, 0), HourOfDay(6.0), HourOfDay(6.0));
        assert_eq!(window.start, oslo(2022, 12, 2, 6, 0));
        assert_eq!(window.end, oslo(2022, 12, 3, 6, 0));
    }

    #[test]
    fn test_shift_days_across_fall_back() {
        // 2022-10-30: clocks go back in Oslo; the local clock time is kept.
        let at = oslo(2022, 10, 29, 12, 0);
        let shifted = shift_days(at, 1);
        assert_eq!(shifted, oslo(2022, 10, 30, 12, 0));
        assert_eq!(shifted - at, TimeDelta::hours(25));
    }

    #[test]
    fn test_at_hour_of_day_truncates_fraction() {
        let at = oslo(2019, 1, 21, 10, 30);
        assert_eq!(at_hour_of_day(at, HourOfDay(5.5)), oslo(2019, 1, 21, 5, 0));
    }
}
