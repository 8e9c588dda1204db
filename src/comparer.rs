//! Boolean condition facade over the price analytics.
//!
//! Each method maps one automation condition onto the window operations in
//! [`crate::core::analytics`]. The methods never fail: missing price data,
//! out-of-range arguments, or an empty window all come back `false`, so a
//! broken condition reads as "not met" instead of aborting the flow.

use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Tz;

use crate::{
    core::{
        analytics,
        clock::{HourOfDay, after_midnight, days_period, shift_days, start_of_hour},
        point::{PricePoint, PriceSeries},
    },
    prelude::*,
    quantity::rate::KilowattHourRate,
};

#[derive(Clone, Copy, Debug, serde::Deserialize)]
pub struct HighHoursArgs {
    pub high_hours: usize,
}

#[derive(Clone, Copy, Debug, serde::Deserialize)]
pub struct LowHoursArgs {
    pub low_hours: usize,
}

/// Without `hours`, the comparison window is today's 24 hours; with it, the
/// window is `hours` points from the current hour.
#[derive(Clone, Copy, Debug, serde::Deserialize)]
pub struct PriceAvgArgs {
    pub percentage: f64,
    #[serde(default)]
    pub hours: Option<usize>,
}

#[derive(Clone, Copy, Debug, serde::Deserialize)]
pub struct AmongLowestArgs {
    pub low_hours: usize,
    #[serde(default)]
    pub hours: Option<usize>,
}

#[derive(Clone, Copy, Debug, serde::Deserialize)]
pub struct AmongHighestArgs {
    pub high_hours: usize,
    #[serde(default)]
    pub hours: Option<usize>,
}

#[derive(Clone, Copy, Debug, serde::Deserialize)]
pub struct LowestInPeriodArgs {
    pub start: HourOfDay,
    pub end: HourOfDay,
    pub low_hours: usize,
}

#[derive(Clone, Copy, Debug, serde::Deserialize)]
pub struct HighestInPeriodArgs {
    pub start: HourOfDay,
    pub end: HourOfDay,
    pub high_hours: usize,
}

#[derive(Clone, Copy, Debug, serde::Deserialize)]
pub struct SumHoursArgs {
    pub start: HourOfDay,
    pub end: HourOfDay,
    pub hours: usize,
}

#[derive(Clone, Copy, Debug, serde::Deserialize)]
pub struct DiffPercentageArgs {
    pub percentage: f64,
}

#[derive(Clone, Copy, Debug, serde::Deserialize)]
pub struct DiffAmountArgs {
    pub amount: f64,
}

#[derive(Clone, Copy, Debug, serde::Deserialize)]
pub struct NextHoursArgs {
    pub hours: usize,
}

#[derive(Clone, Copy, Debug, serde::Deserialize)]
pub struct AmongNextHoursArgs {
    pub num_hours: usize,
    pub next_hours: usize,
}

#[derive(Clone, Copy, Debug, serde::Deserialize)]
pub struct BeforeTimeArgs {
    pub num_hours: usize,
    pub time: HourOfDay,
}

/// Evaluates price conditions against the most recently supplied series.
pub struct PriceComparer {
    prices: Option<PriceSeries>,
    zone: Tz,
}

impl PriceComparer {
    #[must_use]
    pub const fn new(zone: Tz) -> Self {
        Self { prices: None, zone }
    }

    pub fn update_prices(&mut self, prices: PriceSeries) {
        debug!(points = prices.len(), "updated price series");
        self.prices = Some(prices);
    }

    fn instant(&self, at: Option<DateTime<Tz>>) -> DateTime<Tz> {
        at.unwrap_or_else(|| Utc::now().with_timezone(&self.zone))
    }

    /// Today's 24-hour window, or `None` when no usable data is loaded.
    fn today(&self, at: DateTime<Tz>) -> Option<Vec<PricePoint>> {
        let prices = self.prices.as_ref()?;
        let today = analytics::prices_starting(prices, at, HourOfDay(0.0), 24);
        (!today.is_empty()).then_some(today)
    }

    /// Whether the current hour's high-price status equals `prior_high`.
    ///
    /// True means the status is unchanged, so flows trigger on the edges:
    /// a `false` prior matches while the price stays out of the top hours,
    /// and a `true` prior matches while it stays in. An unknown prior never
    /// matches.
    #[must_use]
    pub fn high_hours(
        &self,
        args: HighHoursArgs,
        prior_high: Option<bool>,
        at: Option<DateTime<Tz>>,
    ) -> bool {
        if args.high_hours == 0 || args.high_hours >= 24 {
            return false;
        }
        let at = self.instant(at);
        let Some(today) = self.today(at) else {
            return false;
        };
        let matches = analytics::check_high_price(&today, args.high_hours, at);
        match prior_high {
            Some(true) => matches.len() == 1,
            Some(false) => matches.is_empty(),
            None => false,
        }
    }

    /// Low-price counterpart of [`Self::high_hours`].
    #[must_use]
    pub fn low_hours(
        &self,
        args: LowHoursArgs,
        prior_low: Option<bool>,
        at: Option<DateTime<Tz>>,
    ) -> bool {
        if args.low_hours == 0 || args.low_hours >= 24 {
            return false;
        }
        let at = self.instant(at);
        let Some(today) = self.today(at) else {
            return false;
        };
        let matches = analytics::check_low_price(&today, args.low_hours, at);
        match prior_low {
            Some(true) => matches.len() == 1,
            Some(false) => matches.is_empty(),
            None => false,
        }
    }

    /// Whether the current price deviates from the window average by more
    /// than `args.percentage`, in the direction picked by `below`.
    #[must_use]
    pub fn price_avg(
        &self,
        args: PriceAvgArgs,
        below: bool,
        at: Option<DateTime<Tz>>,
    ) -> bool {
        if args.percentage <= 0.0 || args.percentage >= 100.0 {
            return false;
        }
        let Some(prices) = self.prices.as_ref() else {
            return false;
        };
        let at = self.instant(at);
        let (start_hour, num_hours) = match args.hours {
            Some(hours) => (HourOfDay(f64::from(at.hour())), hours),
            None => (HourOfDay(0.0), 24),
        };
        let Some(current) = analytics::current_price(prices, at) else {
            return false;
        };
        let average = analytics::average_prices_starting(prices, at, start_hour, num_hours);
        if average == KilowattHourRate::ZERO {
            return false;
        }
        analytics::check_average_price(current.price, average, below, args.percentage)
    }

    /// Whether the window from the current hour is collectively among
    /// today's cheapest hours. Without `hours` this degenerates to "the day
    /// contains a single cheapest hour", which is vacuously window-wide.
    #[must_use]
    pub fn price_among_lowest(
        &self,
        args: AmongLowestArgs,
        at: Option<DateTime<Tz>>,
    ) -> bool {
        if args.low_hours == 0 || args.low_hours >= 24 {
            return false;
        }
        let Some(prices) = self.prices.as_ref() else {
            return false;
        };
        let at = self.instant(at);
        let (start_hour, num_hours, num_lowest_hours) = match args.hours {
            Some(hours) => (HourOfDay(f64::from(at.hour())), hours, args.low_hours),
            None => (HourOfDay(0.0), 24, 1),
        };
        analytics::prices_among_lowest(prices, at, start_hour, num_hours, num_lowest_hours)
    }

    #[must_use]
    pub fn price_among_highest(
        &self,
        args: AmongHighestArgs,
        at: Option<DateTime<Tz>>,
    ) -> bool {
        if args.high_hours == 0 || args.high_hours >= 24 {
            return false;
        }
        let Some(prices) = self.prices.as_ref() else {
            return false;
        };
        let at = self.instant(at);
        let (start_hour, num_hours, num_highest_hours) = match args.hours {
            Some(hours) => (HourOfDay(f64::from(at.hour())), hours, args.high_hours),
            None => (HourOfDay(0.0), 24, 1),
        };
        analytics::prices_among_highest(prices, at, start_hour, num_hours, num_highest_hours)
    }

    /// Whether now is inside the `start..end` period and among its cheapest
    /// hours.
    #[must_use]
    pub fn price_lowest_in_period(
        &self,
        args: LowestInPeriodArgs,
        at: Option<DateTime<Tz>>,
    ) -> bool {
        if args.low_hours == 0 || args.low_hours >= 24 {
            return false;
        }
        let Some(prices) = self.prices.as_ref() else {
            return false;
        };
        let at = self.instant(at);
        let window = days_period(at, args.start, args.end);
        analytics::prices_lowest_in_period(prices, at, window, args.low_hours)
    }

    #[must_use]
    pub fn price_highest_in_period(
        &self,
        args: HighestInPeriodArgs,
        at: Option<DateTime<Tz>>,
    ) -> bool {
        if args.high_hours == 0 || args.high_hours >= 24 {
            return false;
        }
        let Some(prices) = self.prices.as_ref() else {
            return false;
        };
        let at = self.instant(at);
        let window = days_period(at, args.start, args.end);
        analytics::prices_highest_in_period(prices, at, window, args.high_hours)
    }

    /// Whether now falls inside the cheapest `hours`-long block of the
    /// `start..end` period.
    #[must_use]
    pub fn price_lowest_next_hours(
        &self,
        args: SumHoursArgs,
        at: Option<DateTime<Tz>>,
    ) -> bool {
        self.sum_prices_block(args, true, at)
    }

    #[must_use]
    pub fn price_highest_next_hours(
        &self,
        args: SumHoursArgs,
        at: Option<DateTime<Tz>>,
    ) -> bool {
        self.sum_prices_block(args, false, at)
    }

    fn sum_prices_block(
        &self,
        args: SumHoursArgs,
        lowest: bool,
        at: Option<DateTime<Tz>>,
    ) -> bool {
        if args.hours == 0 || args.hours > 24 {
            return false;
        }
        let Some(prices) = self.prices.as_ref() else {
            return false;
        };
        let at = self.instant(at);
        let window = days_period(at, args.start, args.end);
        analytics::check_sum_prices(prices, at, window, args.hours, lowest).is_some()
    }

    /// Whether today's spread between the most expensive and the cheapest
    /// hour stays below `args.percentage` percent.
    #[must_use]
    pub fn price_diff_high_low_percentage(
        &self,
        args: DiffPercentageArgs,
        at: Option<DateTime<Tz>>,
    ) -> bool {
        if args.percentage <= 0.0 || args.percentage > 9999.0 {
            return false;
        }
        let Some(prices) = self.prices.as_ref() else {
            return false;
        };
        let at = self.instant(at);
        analytics::price_high_low(prices, at).diff_percentage < args.percentage
    }

    /// Absolute-amount counterpart of
    /// [`Self::price_diff_high_low_percentage`].
    #[must_use]
    pub fn price_diff_high_low_amount(
        &self,
        args: DiffAmountArgs,
        at: Option<DateTime<Tz>>,
    ) -> bool {
        if args.amount <= 0.0 || args.amount > 9999.0 {
            return false;
        }
        let Some(prices) = self.prices.as_ref() else {
            return false;
        };
        let at = self.instant(at);
        analytics::price_high_low(prices, at).diff_amount.0 < args.amount
    }

    #[must_use]
    pub fn price_lower_next_hours(
        &self,
        args: NextHoursArgs,
        at: Option<DateTime<Tz>>,
    ) -> bool {
        if args.hours == 0 || args.hours > 24 {
            return false;
        }
        let Some(prices) = self.prices.as_ref() else {
            return false;
        };
        let at = self.instant(at);
        analytics::current_price_lower_than_next(prices, at, args.hours)
    }

    #[must_use]
    pub fn price_higher_next_hours(
        &self,
        args: NextHoursArgs,
        at: Option<DateTime<Tz>>,
    ) -> bool {
        if args.hours == 0 || args.hours > 24 {
            return false;
        }
        let Some(prices) = self.prices.as_ref() else {
            return false;
        };
        let at = self.instant(at);
        analytics::current_price_higher_than_next(prices, at, args.hours)
    }

    /// Whether the current hour ranks among the `num_hours` most expensive
    /// (`high` true) or cheapest (`high` false) of the `next_hours` points
    /// starting with the current hour.
    #[must_use]
    pub fn current_price_among_next_hours(
        &self,
        args: AmongNextHoursArgs,
        high: bool,
        at: Option<DateTime<Tz>>,
    ) -> bool {
        if args.num_hours == 0 || args.num_hours > 24 || args.next_hours == 0 {
            return false;
        }
        let Some(prices) = self.prices.as_ref() else {
            return false;
        };
        let at = self.instant(at);
        let from = start_of_hour(at);
        let window: Vec<PricePoint> = prices
            .iter()
            .copied()
            .filter(|point| point.starts_at >= from)
            .take(args.next_hours)
            .collect();
        Self::among_extremes(&window, args.num_hours, high, at)
    }

    /// Like [`Self::current_price_among_next_hours`], but the window runs
    /// from the current hour until the next occurrence of the `time` wall
    /// clock (exclusive), wrapping to tomorrow when it has already passed.
    #[must_use]
    pub fn current_price_among_before_time(
        &self,
        args: BeforeTimeArgs,
        high: bool,
        at: Option<DateTime<Tz>>,
    ) -> bool {
        if args.num_hours == 0 || args.num_hours > 24 {
            return false;
        }
        let Some(prices) = self.prices.as_ref() else {
            return false;
        };
        let at = self.instant(at);
        let from = start_of_hour(at);
        let mut until = after_midnight(at, args.time.0);
        if until <= at {
            until = shift_days(until, 1);
        }
        let window: Vec<PricePoint> = prices
            .iter()
            .copied()
            .filter(|point| point.starts_at >= from && point.starts_at < until)
            .collect();
        Self::among_extremes(&window, args.num_hours, high, at)
    }

    fn among_extremes(
        window: &[PricePoint],
        num_hours: usize,
        high: bool,
        at: DateTime<Tz>,
    ) -> bool {
        if window.is_empty() {
            return false;
        }
        let matches = if high {
            analytics::check_high_price(window, num_hours, at)
        } else {
            analytics::check_low_price(window, num_hours, at)
        };
        matches.len() == 1
    }
}
