use chrono::{DateTime, Datelike};
use chrono_tz::Tz;

use crate::{
    calendar::HolidayCalendar,
    core::clock::{fractional_hour, shift_days},
};

/// Manual override for today's holiday status. `Automatic` defers to the
/// holiday calendar.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HolidayToday {
    Holiday,
    NotHoliday,
    #[default]
    Automatic,
}

/// Fractional start/end hours of a daily window. `start_hour > end_hour`
/// means the window wraps past midnight.
#[derive(Clone, Copy, Debug, PartialEq, derive_more::Constructor, serde::Deserialize, serde::Serialize)]
#[must_use]
pub struct DayHours {
    pub start_hour: f64,
    pub end_hour: f64,
}

#[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
#[must_use]
pub struct HeatingOptions {
    /// Day period on work days.
    pub workday: DayHours,

    /// Day period on weekends and holidays.
    pub not_workday: DayHours,

    /// Working hours, only relevant on work days.
    pub work_hours: DayHours,

    /// ISO country code for the holiday calendar.
    pub country: String,

    #[serde(default)]
    pub holiday_today: HolidayToday,
}

impl Default for HeatingOptions {
    fn default() -> Self {
        Self {
            workday: DayHours::new(5.0, 22.5),
            not_workday: DayHours::new(7.0, 23.0),
            work_hours: DayHours::new(7.0, 16.0),
            country: "NO".to_owned(),
            holiday_today: HolidayToday::Automatic,
        }
    }
}

/// Derived heating state for one instant. Recomputed per query, never stored.
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Serialize)]
#[must_use]
pub struct HeatingResult {
    pub starts_at: DateTime<Tz>,
    pub at_home: bool,
    pub home_override: bool,
    pub day: bool,
    pub night: bool,
    pub at_work: bool,
    pub heating: bool,
}

/// Occupancy flags and schedule options carried into per-point heating
/// evaluation by the analytics layer.
#[derive(Clone, Debug, PartialEq)]
#[must_use]
pub struct HeatingState {
    pub at_home: bool,
    pub home_override: bool,
    pub options: HeatingOptions,
}

pub fn is_holiday(
    calendar: &impl HolidayCalendar,
    at: DateTime<Tz>,
    options: &HeatingOptions,
) -> bool {
    match options.holiday_today {
        HolidayToday::Holiday => true,
        HolidayToday::NotHoliday => false,
        HolidayToday::Automatic => calendar
            .holiday(&options.country, at.date_naive())
            .is_some_and(crate::calendar::HolidayKind::counts_as_holiday),
    }
}

/// A day is a work day iff it is not a holiday and falls on Monday–Friday.
/// An explicit `NotHoliday` override short-circuits the weekday check too.
pub fn is_work_day(
    calendar: &impl HolidayCalendar,
    at: DateTime<Tz>,
    options: &HeatingOptions,
) -> bool {
    options.holiday_today == HolidayToday::NotHoliday
        || !is_holiday(calendar, at, options) && at.weekday().number_from_monday() <= 5
}

/// Whether `at` falls in the "day" (heating-eligible) period.
///
/// The day period runs from today's start hour through tomorrow's end hour,
/// so tomorrow's work-day status decides where tonight ends. When today's
/// window wraps past midnight, the early-morning tail `[0, end_hour)` belongs
/// to yesterday's window and still counts as day.
pub fn is_day_period(
    calendar: &impl HolidayCalendar,
    at: DateTime<Tz>,
    options: &HeatingOptions,
) -> bool {
    let hour = fractional_hour(at);
    let workday_today = is_work_day(calendar, at, options);
    let workday_tomorrow = is_work_day(calendar, shift_days(at, 1), options);

    let hours = if workday_today { options.workday } else { options.not_workday };
    let wrap_start = if hours.start_hour <= hours.end_hour { 0.0 } else { hours.end_hour };

    let tomorrow_hours = if workday_tomorrow { options.workday } else { options.not_workday };
    let tomorrow_end = if tomorrow_hours.start_hour <= tomorrow_hours.end_hour {
        tomorrow_hours.end_hour
    } else {
        // Tomorrow's window wraps, so today's day period runs to midnight.
        24.0
    };

    hour < wrap_start || hour >= hours.start_hour && hour < tomorrow_end
}

pub fn is_work_time(
    calendar: &impl HolidayCalendar,
    at: DateTime<Tz>,
    options: &HeatingOptions,
) -> bool {
    let hour = fractional_hour(at);
    let hours = options.work_hours;
    is_work_day(calendar, at, options)
        && if hours.start_hour <= hours.end_hour {
            hour >= hours.start_hour && hour < hours.end_hour
        } else {
            hour >= hours.start_hour || hour < hours.end_hour
        }
}

/// Heat during day hours unless at work; a home override forces heating
/// through work hours, but never during the night.
pub fn calc_heating(
    calendar: &impl HolidayCalendar,
    at: DateTime<Tz>,
    at_home: bool,
    home_override: bool,
    options: &HeatingOptions,
) -> HeatingResult {
    let day = is_day_period(calendar, at, options);
    let night = !day;
    let at_work = is_work_time(calendar, at, options);
    HeatingResult {
        starts_at: at,
        at_home,
        home_override,
        day,
        night,
        at_work,
        heating: at_home && !night && !at_work || home_override && !night,
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use chrono_tz::Europe::Oslo;

    use super::*;
    use crate::calendar::{FixedHolidays, HolidayKind, NoHolidays};

    fn options() -> HeatingOptions {
        HeatingOptions {
            workday: DayHours::new(5.0, 22.5),
            not_workday: DayHours::new(7.0, 23.0),
            work_hours: DayHours::new(7.0, 14.0),
            country: "NO".to_owned(),
            holiday_today: HolidayToday::Automatic,
        }
    }

    fn wrapping_options() -> HeatingOptions {
        HeatingOptions {
            workday: DayHours::new(5.0, 22.5),
            not_workday: DayHours::new(7.0, 1.0),
            work_hours: DayHours::new(7.0, 14.0),
            country: "NO".to_owned(),
            holiday_today: HolidayToday::Automatic,
        }
    }

    fn monday(h: u32, m: u32) -> DateTime<Tz> {
        // 2018-12-17 is a Monday.
        Oslo.with_ymd_and_hms(2018, 12, 17, h, m, 0).unwrap()
    }

    fn saturday(h: u32, m: u32) -> DateTime<Tz> {
        Oslo.with_ymd_and_hms(2018, 12, 15, h, m, 0).unwrap()
    }

    #[test]
    fn test_monday_at_home_no_override() {
        let opts = options();
        let cases = [
            // (hour, minute, day, at_work, heating)
            (4, 0, false, false, false),
            (5, 0, true, false, true),
            (7, 0, true, true, false),
            (10, 0, true, true, false),
            (14, 0, true, false, true),
            (22, 0, true, false, true),
            (22, 30, false, false, false),
            (23, 0, false, false, false),
        ];
        for (h, m, day, at_work, heating) in cases {
            let result = calc_heating(&NoHolidays, monday(h, m), true, false, &opts);
            assert_eq!(result.day, day, "day at {h:02}:{m:02}");
            assert_eq!(result.night, !day, "night at {h:02}:{m:02}");
            assert_eq!(result.at_work, at_work, "at_work at {h:02}:{m:02}");
            assert_eq!(result.heating, heating, "heating at {h:02}:{m:02}");
        }
    }

    #[test]
    fn test_monday_home_override_heats_through_work_hours() {
        let opts = options();
        let result = calc_heating(&NoHolidays, monday(7, 0), true, true, &opts);
        assert!(result.at_work);
        assert!(result.heating);

        // Never during the night, though.
        let result = calc_heating(&NoHolidays, monday(4, 0), true, true, &opts);
        assert!(result.night);
        assert!(!result.heating);
    }

    #[test]
    fn test_holiday_override_shifts_to_not_workday_hours() {
        let mut opts = options();
        opts.holiday_today = HolidayToday::Holiday;

        assert!(!is_work_day(&NoHolidays, monday(10, 0), &opts));
        // Day starts at 07:00 on a holiday, not 05:00.
        assert!(!is_day_period(&NoHolidays, monday(5, 30), &opts));
        assert!(is_day_period(&NoHolidays, monday(7, 0), &opts));

        let result = calc_heating(&NoHolidays, monday(10, 0), true, false, &opts);
        assert!(!result.at_work);
        assert!(result.heating);
    }

    #[test]
    fn test_not_holiday_override_short_circuits_weekday_check() {
        let mut opts = options();
        opts.holiday_today = HolidayToday::NotHoliday;
        assert!(is_work_day(&NoHolidays, saturday(10, 0), &opts));
        assert!(is_work_time(&NoHolidays, saturday(10, 0), &opts));
    }

    #[test]
    fn test_is_holiday_calendar_lookup() {
        let mut calendar = FixedHolidays::default();
        calendar.insert(
            "NO",
            chrono::NaiveDate::from_ymd_opt(2022, 12, 25).unwrap(),
            HolidayKind::Public,
        );
        let opts = options();

        let christmas = Oslo.with_ymd_and_hms(2022, 12, 25, 10, 0, 0).unwrap();
        let friday = Oslo.with_ymd_and_hms(2022, 12, 2, 10, 0, 0).unwrap();
        assert!(is_holiday(&calendar, christmas, &opts));
        assert!(!is_holiday(&calendar, friday, &opts));
        assert!(!is_work_day(&calendar, christmas, &opts));
    }

    #[test]
    fn test_observance_does_not_make_a_holiday() {
        let mut calendar = FixedHolidays::default();
        let date = chrono::NaiveDate::from_ymd_opt(2022, 12, 2).unwrap();
        calendar.insert("NO", date, HolidayKind::Observance);
        let at = Oslo.with_ymd_and_hms(2022, 12, 2, 10, 0, 0).unwrap();
        assert!(!is_holiday(&calendar, at, &options()));
        assert!(is_work_day(&calendar, at, &options()));
    }

    #[test]
    fn test_wrapping_not_workday_window() {
        let opts = wrapping_options();

        // Saturday: window 07:00..01:00 wraps; tomorrow (Sunday) wraps too,
        // so today's day period runs to midnight.
        assert!(is_day_period(&NoHolidays, saturday(23, 0), &opts));
        // The early-morning tail before 01:00 belongs to Friday's window.
        assert!(is_day_period(&NoHolidays, saturday(0, 30), &opts));
        assert!(!is_day_period(&NoHolidays, saturday(1, 0), &opts));
        assert!(!is_day_period(&NoHolidays, saturday(6, 0), &opts));

        // Sunday 23:00: tomorrow is a work day ending 22.5, so it is night.
        let sunday_23 = Oslo.with_ymd_and_hms(2018, 12, 16, 23, 0, 0).unwrap();
        assert!(!is_day_period(&NoHolidays, sunday_23, &opts));
    }

    #[test]
    fn test_wrapping_work_hours() {
        let mut opts = options();
        opts.work_hours = DayHours::new(22.0, 6.0);
        assert!(is_work_time(&NoHolidays, monday(23, 0), &opts));
        assert!(is_work_time(&NoHolidays, monday(5, 0), &opts));
        assert!(!is_work_time(&NoHolidays, monday(6, 0), &opts));
        assert!(!is_work_time(&NoHolidays, monday(12, 0), &opts));
    }

    #[test]
    fn test_invariants_across_a_week() {
        let opts = wrapping_options();
        for day in 10..=20 {
            for hour in 0..24 {
                let at = Oslo.with_ymd_and_hms(2018, 12, day, hour, 15, 0).unwrap();
                let result = calc_heating(&NoHolidays, at, true, false, &opts);
                assert_eq!(result.night, !result.day);
                assert!(!result.heating || !result.night, "heating implies day at {at}");
                assert!(
                    !result.at_work || is_work_day(&NoHolidays, at, &opts),
                    "at_work implies work day at {at}",
                );
            }
        }
    }

    #[test]
    fn test_fractional_schedule_boundaries() {
        let mut opts = options();
        opts.workday = DayHours::new(5.0, 22.5);
        assert!(is_day_period(&NoHolidays, monday(22, 29), &opts));
        assert!(!is_day_period(&NoHolidays, monday(22, 30), &opts));
    }
}
