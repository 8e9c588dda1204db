//! Pure price-window operations over an hourly series.
//!
//! Every operation takes the series and a reference instant, mutates nothing,
//! and answers with a value, `None`, or `false`. An empty candidate window is
//! never an error: boolean predicates come back `false` and lookups `None`.

use chrono::{DateTime, TimeDelta};
use chrono_tz::Tz;
use itertools::Itertools;

use crate::{
    calendar::HolidayCalendar,
    core::{
        clock::{HourOfDay, at_hour_of_day, start_of_hour},
        heating::{HeatingState, calc_heating},
        interval::Interval,
        point::PricePoint,
    },
    quantity::rate::KilowattHourRate,
};

/// Price classification relative to the daily average, by share
/// `price / average`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriceLevel {
    /// Share at most 60 %.
    VeryCheap,
    /// Share above 60 % and at most 90 %.
    Cheap,
    /// Share above 90 % and below 115 %.
    Normal,
    /// Share at least 115 % and below 140 %.
    Expensive,
    /// Share at least 140 %.
    VeryExpensive,
}

impl PriceLevel {
    #[must_use]
    pub fn from_share(share: f64) -> Self {
        if share <= 0.60 {
            Self::VeryCheap
        } else if share <= 0.90 {
            Self::Cheap
        } else if share < 1.15 {
            Self::Normal
        } else if share < 1.40 {
            Self::Expensive
        } else {
            Self::VeryExpensive
        }
    }
}

/// Today's extremes and their spread.
#[derive(Clone, Copy, Debug, PartialEq)]
#[must_use]
pub struct HighLow {
    pub high: Option<PricePoint>,
    pub low: Option<PricePoint>,
    pub diff_percentage: f64,
    pub diff_amount: KilowattHourRate,
}

/// A contiguous block of hours and the sum of its prices.
#[derive(Clone, Copy, Debug, PartialEq)]
#[must_use]
pub struct PriceBlock {
    pub starts_at: DateTime<Tz>,
    pub ends_at: DateTime<Tz>,
    pub sum: KilowattHourRate,
}

/// Stable, so equal prices keep their time order.
fn sorted_ascending(prices: &[PricePoint]) -> Vec<PricePoint> {
    prices.iter().copied().sorted_by_key(|point| point.price).collect()
}

fn sorted_descending(prices: &[PricePoint]) -> Vec<PricePoint> {
    prices.iter().copied().sorted_by(|a, b| b.price.cmp(&a.price)).collect()
}

/// Whether the point's hour `[starts_at, starts_at + 1h)` contains `at`.
fn hour_contains(point: PricePoint, at: DateTime<Tz>) -> bool {
    point.starts_at <= at && start_of_hour(point.starts_at) + TimeDelta::hours(1) > at
}

/// The point for the hour containing `at`, matched on start-of-hour equality.
pub fn current_price(prices: &[PricePoint], at: DateTime<Tz>) -> Option<PricePoint> {
    let current_hour = start_of_hour(at);
    prices.iter().copied().find(|point| start_of_hour(point.starts_at) == current_hour)
}

/// Up to `num_hours` points from the reference date at `start_hour`, in time
/// order.
pub fn prices_starting(
    prices: &[PricePoint],
    at: DateTime<Tz>,
    start_hour: HourOfDay,
    num_hours: usize,
) -> Vec<PricePoint> {
    let starting_at = at_hour_of_day(at, start_hour);
    prices.iter().copied().filter(|point| point.starts_at >= starting_at).take(num_hours).collect()
}

/// Today's 24-hour window sorted ascending by price. The sort is stable, so
/// equal prices keep their time order and "Nth lowest" is deterministic.
pub fn prices_sorted(prices: &[PricePoint], at: DateTime<Tz>) -> Vec<PricePoint> {
    sorted_ascending(&prices_starting(prices, at, HourOfDay(0.0), 24))
}

/// Mean of up to `num_hours` prices from `start_hour`, rounded to 7 decimals.
/// An empty window yields zero, which callers must disambiguate from a real
/// zero price themselves.
pub fn average_prices_starting(
    prices: &[PricePoint],
    at: DateTime<Tz>,
    start_hour: HourOfDay,
    num_hours: usize,
) -> KilowattHourRate {
    let window = prices_starting(prices, at, start_hour, num_hours);
    if window.is_empty() {
        return KilowattHourRate::ZERO;
    }
    let sum: f64 = window.iter().map(|point| point.price.0).sum();
    KilowattHourRate((sum / window.len() as f64 * 10_000_000.0).round() / 10_000_000.0)
}

/// True iff the signed deviation of `price` from `average` exceeds
/// `percentage`. `below` flips the sign, so "more than X % below" and "more
/// than X % above" share one formula.
#[must_use]
pub fn check_average_price(
    price: KilowattHourRate,
    average: KilowattHourRate,
    below: bool,
    percentage: f64,
) -> bool {
    (price.0 - average.0) / average.0 * 100.0 * (if below { -1.0 } else { 1.0 }) > percentage
}

/// Rank of the current price within today's ascending order, scaled to
/// `[0, 1]` where the cheapest hour maps to 1.0.
///
/// The denominator is a fixed 23 regardless of how many points the day
/// actually has (DST days have 23 or 25); kept that way on purpose.
#[must_use]
pub fn price_ratio(prices: &[PricePoint], at: DateTime<Tz>) -> f64 {
    let current_hour = start_of_hour(at);
    let rank = prices_sorted(prices, at)
        .iter()
        .position(|point| start_of_hour(point.starts_at) == current_hour)
        .map_or(-1.0, |index| index as f64);
    ((1.0 - rank / 23.0) * 1_000_000.0).round() / 1_000_000.0
}

/// Current price classified against today's 24-hour average. `None` when
/// there is no current price or the average is zero.
pub fn price_level(prices: &[PricePoint], at: DateTime<Tz>) -> Option<PriceLevel> {
    let price = current_price(prices, at)?;
    let average = average_prices_starting(prices, at, HourOfDay(0.0), 24);
    (average != KilowattHourRate::ZERO)
        .then(|| PriceLevel::from_share(price.price.0 / average.0))
}

pub fn price_high_low(prices: &[PricePoint], at: DateTime<Tz>) -> HighLow {
    let sorted = prices_sorted(prices, at);
    let high = sorted.last().copied();
    let low = sorted.first().copied();
    let diff_percentage = match (high, low) {
        (Some(high), Some(low)) if low.price != KilowattHourRate::ZERO => {
            (high.price.0 - low.price.0) / low.price.0 * 100.0
        }
        _ => 0.0,
    };
    let diff_amount = match (high, low) {
        (Some(high), Some(low)) => high.price - low.price,
        _ => KilowattHourRate::ZERO,
    };
    HighLow { high, low, diff_percentage, diff_amount }
}

/// The first `num_hours` points strictly after the current hour.
pub fn price_next_hours(
    prices: &[PricePoint],
    at: DateTime<Tz>,
    num_hours: usize,
) -> Vec<PricePoint> {
    let starting_at = start_of_hour(at) + TimeDelta::hours(1);
    prices.iter().copied().filter(|point| point.starts_at >= starting_at).take(num_hours).collect()
}

/// Of the `low_hours` cheapest points in the window, the one (if any) whose
/// hour contains `at`.
pub fn check_low_price(
    prices: &[PricePoint],
    low_hours: usize,
    at: DateTime<Tz>,
) -> Vec<PricePoint> {
    sorted_ascending(prices)
        .into_iter()
        .take(low_hours)
        .filter(|point| hour_contains(*point, at))
        .collect()
}

/// Of the `high_hours` most expensive points in the window, the one (if any)
/// whose hour contains `at`.
pub fn check_high_price(
    prices: &[PricePoint],
    high_hours: usize,
    at: DateTime<Tz>,
) -> Vec<PricePoint> {
    sorted_descending(prices)
        .into_iter()
        .take(high_hours)
        .filter(|point| hour_contains(*point, at))
        .collect()
}

/// [`check_high_price`] restricted to hours where heating is off.
///
/// After dropping the heating hours, only every other surviving hour is
/// ranked. That thinning looks like a latent off-by-one, but it is kept
/// bit-for-bit for backwards compatibility.
/// TODO: confirm whether the even-index thinning is intentional.
pub fn check_high_price_heating(
    calendar: &impl HolidayCalendar,
    prices: &[PricePoint],
    high_hours: usize,
    at: DateTime<Tz>,
    state: &HeatingState,
    filter: bool,
) -> Vec<PricePoint> {
    let eligible: Vec<PricePoint> = prices
        .iter()
        .copied()
        .filter(|point| {
            !calc_heating(
                calendar,
                point.starts_at,
                state.at_home,
                state.home_override,
                &state.options,
            )
            .heating
        })
        .enumerate()
        .filter(|(index, _)| index % 2 == 0)
        .map(|(_, point)| point)
        .collect();
    sorted_descending(&eligible)
        .into_iter()
        .take(high_hours)
        .filter(|point| !filter || hour_contains(*point, at))
        .collect()
}

/// The cheapest of the `num_hours` most expensive points: the inclusion
/// threshold for "among the highest".
pub fn min_of_highest_prices(prices: &[PricePoint], num_hours: usize) -> Option<PricePoint> {
    sorted_descending(prices).into_iter().take(num_hours).last()
}

/// The priciest of the `num_hours` cheapest points: the inclusion threshold
/// for "among the lowest".
pub fn max_of_lowest_prices(prices: &[PricePoint], num_hours: usize) -> Option<PricePoint> {
    sorted_ascending(prices).into_iter().take(num_hours).last()
}

/// Whether the `num_hours` points from `start_hour` are collectively among
/// the `num_lowest_hours` cheapest of today's 24-hour window: the following
/// window's threshold price must not exceed today's.
#[must_use]
pub fn prices_among_lowest(
    prices: &[PricePoint],
    at: DateTime<Tz>,
    start_hour: HourOfDay,
    num_hours: usize,
    num_lowest_hours: usize,
) -> bool {
    let today = prices_starting(prices, at, HourOfDay(0.0), 24);
    if today.is_empty() {
        return false;
    }
    let max_of_today = max_of_lowest_prices(&today, num_lowest_hours);

    let following = prices_starting(prices, at, start_hour, num_hours);
    if following.is_empty() {
        return false;
    }
    let max_of_following = max_of_lowest_prices(&following, num_hours);

    match (max_of_today, max_of_following) {
        (Some(today), Some(following)) => following.price <= today.price,
        _ => false,
    }
}

#[must_use]
pub fn prices_among_highest(
    prices: &[PricePoint],
    at: DateTime<Tz>,
    start_hour: HourOfDay,
    num_hours: usize,
    num_highest_hours: usize,
) -> bool {
    let today = prices_starting(prices, at, HourOfDay(0.0), 24);
    if today.is_empty() {
        return false;
    }
    let min_of_today = min_of_highest_prices(&today, num_highest_hours);

    let following = prices_starting(prices, at, start_hour, num_hours);
    if following.is_empty() {
        return false;
    }
    let min_of_following = min_of_highest_prices(&following, num_hours);

    match (min_of_today, min_of_following) {
        (Some(today), Some(following)) => following.price >= today.price,
        _ => false,
    }
}

fn points_in_window(prices: &[PricePoint], window: Interval) -> Vec<PricePoint> {
    prices.iter().copied().filter(|point| window.contains(point.starts_at)).collect()
}

/// True iff `at` lies in the window (inclusive both ends) and the current
/// price is within the `num_lowest_hours` cheapest of the window's points.
#[must_use]
pub fn prices_lowest_in_period(
    prices: &[PricePoint],
    at: DateTime<Tz>,
    window: Interval,
    num_lowest_hours: usize,
) -> bool {
    if !window.contains_closed(at) {
        return false;
    }
    let in_period = points_in_window(prices, window);
    if in_period.is_empty() {
        return false;
    }
    match (max_of_lowest_prices(&in_period, num_lowest_hours), current_price(prices, at)) {
        (Some(threshold), Some(current)) => current.price <= threshold.price,
        _ => false,
    }
}

#[must_use]
pub fn prices_highest_in_period(
    prices: &[PricePoint],
    at: DateTime<Tz>,
    window: Interval,
    num_highest_hours: usize,
) -> bool {
    if !window.contains_closed(at) {
        return false;
    }
    let in_period = points_in_window(prices, window);
    if in_period.is_empty() {
        return false;
    }
    match (min_of_highest_prices(&in_period, num_highest_hours), current_price(prices, at)) {
        (Some(threshold), Some(current)) => current.price >= threshold.price,
        _ => false,
    }
}

/// Slides a `hours_block`-wide window over the consecutive points inside the
/// period, picks the block with the extreme sum (minimum when `lowest`), and
/// returns it iff `at` falls inside the block. Ties go to the earliest block.
pub fn check_sum_prices(
    prices: &[PricePoint],
    at: DateTime<Tz>,
    window: Interval,
    hours_block: usize,
    lowest: bool,
) -> Option<PriceBlock> {
    if hours_block == 0 || !window.contains_closed(at) {
        return None;
    }
    let in_period = points_in_window(prices, window);
    if in_period.is_empty() {
        return None;
    }

    let mut blocks: Vec<PriceBlock> = Vec::new();
    for start in 0..(in_period.len() + 1).saturating_sub(hours_block) {
        let starts_at = in_period[start].starts_at;
        let sum = in_period[start..start + hours_block]
            .iter()
            .map(|point| point.price)
            .sum::<KilowattHourRate>();
        blocks.push(PriceBlock {
            starts_at,
            ends_at: starts_at + TimeDelta::hours(hours_block as i64),
            sum,
        });
    }

    if lowest {
        blocks.sort_by_key(|block| block.sum);
    } else {
        blocks.sort_by(|a, b| b.sum.cmp(&a.sum));
    }

    blocks
        .first()
        .copied()
        .filter(|block| at >= block.starts_at && at < block.ends_at)
}

/// Whether the current price is at or below every one of the next
/// `num_hours` prices.
#[must_use]
pub fn current_price_lower_than_next(
    prices: &[PricePoint],
    at: DateTime<Tz>,
    num_hours: usize,
) -> bool {
    let following = price_next_hours(prices, at, num_hours);
    if following.is_empty() {
        return false;
    }
    match (min_of_highest_prices(&following, num_hours), current_price(prices, at)) {
        (Some(threshold), Some(current)) => current.price <= threshold.price,
        _ => false,
    }
}

#[must_use]
pub fn current_price_higher_than_next(
    prices: &[PricePoint],
    at: DateTime<Tz>,
    num_hours: usize,
) -> bool {
    let following = price_next_hours(prices, at, num_hours);
    if following.is_empty() {
        return false;
    }
    match (max_of_lowest_prices(&following, num_hours), current_price(prices, at)) {
        (Some(threshold), Some(current)) => current.price >= threshold.price,
        _ => false,
    }
}
