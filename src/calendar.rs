use std::collections::BTreeMap;

use chrono::NaiveDate;

/// Category of a calendar entry. Only [`HolidayKind::Public`] and
/// [`HolidayKind::Bank`] make a day a holiday for scheduling purposes;
/// observances and the like do not.
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HolidayKind {
    Public,
    Bank,
    School,
    Optional,
    Observance,
}

impl HolidayKind {
    #[must_use]
    pub const fn counts_as_holiday(self) -> bool {
        matches!(self, Self::Public | Self::Bank)
    }
}

/// External holiday-calendar collaborator, keyed by ISO country code.
///
/// A lookup miss (unknown country, no data for the date) means "not a
/// holiday"; the calculator never treats it as an error.
pub trait HolidayCalendar {
    fn holiday(&self, country: &str, date: NaiveDate) -> Option<HolidayKind>;
}

/// Calendar with no holidays at all.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoHolidays;

impl HolidayCalendar for NoHolidays {
    fn holiday(&self, _country: &str, _date: NaiveDate) -> Option<HolidayKind> {
        None
    }
}

/// Calendar backed by an explicit per-country date map, for manual
/// configuration and tests.
#[derive(Clone, Debug, Default)]
pub struct FixedHolidays {
    entries: BTreeMap<(String, NaiveDate), HolidayKind>,
}

impl FixedHolidays {
    pub fn insert(&mut self, country: &str, date: NaiveDate, kind: HolidayKind) {
        self.entries.insert((country.to_owned(), date), kind);
    }
}

impl HolidayCalendar for FixedHolidays {
    fn holiday(&self, country: &str, date: NaiveDate) -> Option<HolidayKind> {
        self.entries.get(&(country.to_owned(), date)).copied()
    }
}

impl<C: HolidayCalendar + ?Sized> HolidayCalendar for &C {
    fn holiday(&self, country: &str, date: NaiveDate) -> Option<HolidayKind> {
        (**self).holiday(country, date)
    }
}
