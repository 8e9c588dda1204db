use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Offset, TimeDelta};
use chrono_tz::{Europe::Oslo, Tz};

use crate::{core::point::PriceSeries, prelude::*};

/// Settlement currency of the day-ahead market.
#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    PartialEq,
    derive_more::Display,
    serde::Deserialize,
    serde::Serialize,
)]
pub enum Currency {
    #[serde(rename = "DKK")]
    #[display("DKK")]
    Dkk,

    #[serde(rename = "EUR")]
    #[display("EUR")]
    Eur,

    #[serde(rename = "NOK")]
    #[display("NOK")]
    Nok,

    #[serde(rename = "SEK")]
    #[display("SEK")]
    Sek,
}

/// Which market series to fetch, and the zone the caller lives in.
#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct MarketOptions {
    pub currency: Currency,

    /// Bidding area, for example `NO1` or `SE3`.
    pub price_area: String,

    /// Time zone the returned points are anchored in.
    pub zone: Tz,
}

/// A provider of hourly day-ahead prices.
///
/// Implementations return the series for one local calendar day of the
/// market zone; the provided [`PriceSource::fetch_prices`] stitches the days
/// a consumer typically needs.
#[async_trait]
pub trait PriceSource {
    /// Hourly prices for the calendar day containing `date`.
    async fn fetch_prices_for_day(
        &self,
        date: NaiveDate,
        options: &MarketOptions,
    ) -> Result<PriceSeries>;

    /// Daily average prices for the month containing `date`.
    async fn fetch_daily_averages(
        &self,
        date: NaiveDate,
        options: &MarketOptions,
    ) -> Result<PriceSeries>;

    /// Today's and tomorrow's prices, plus yesterday's when the caller's
    /// zone runs ahead of the market zone and still needs the tail of that
    /// day. Any failure is logged and yields an empty series, so callers
    /// can treat "no data yet" and "fetch failed" the same way.
    async fn fetch_prices(&self, at: DateTime<Tz>, options: &MarketOptions) -> PriceSeries {
        let market_offset = at.with_timezone(&Oslo).offset().fix().local_minus_utc();
        let local_offset = at.offset().fix().local_minus_utc();

        let mut dates = Vec::with_capacity(3);
        if local_offset > market_offset {
            dates.push((at - TimeDelta::days(1)).date_naive());
        }
        dates.push(at.date_naive());
        dates.push((at + TimeDelta::days(1)).date_naive());

        let mut merged = PriceSeries::new();
        for date in dates {
            match self.fetch_prices_for_day(date, options).await {
                Ok(prices) => merged.extend(prices),
                Err(error) => {
                    warn!(?date, "fetching prices failed: {error:#}");
                    return PriceSeries::new();
                }
            }
        }
        merged.sort_by_key(|point| point.starts_at);
        merged
    }
}

#[async_trait]
impl<P: PriceSource + Sync> PriceSource for &P {
    async fn fetch_prices_for_day(
        &self,
        date: NaiveDate,
        options: &MarketOptions,
    ) -> Result<PriceSeries> {
        (**self).fetch_prices_for_day(date, options).await
    }

    async fn fetch_daily_averages(
        &self,
        date: NaiveDate,
        options: &MarketOptions,
    ) -> Result<PriceSeries> {
        (**self).fetch_daily_averages(date, options).await
    }
}

/// MWh market quotes scaled to a kWh rate, rounded to 5 decimals.
pub(crate) fn scale_megawatt_price(value: f64) -> f64 {
    (100_000.0 * (value / 1000.0)).round() / 100_000.0
}
