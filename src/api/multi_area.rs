//! Adapter for the newer data-portal API.
//!
//! Delivery instants arrive as UTC timestamps and each entry quotes all
//! requested areas at once, so parsing is a lookup rather than a grid walk.

use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::Deserialize;

use crate::{
    api::source::{MarketOptions, PriceSource, scale_megawatt_price},
    core::point::{PricePoint, PriceSeries},
    prelude::*,
    quantity::rate::KilowattHourRate,
};

const DAY_AHEAD_URL: &str = "https://dataportal-api.nordpoolgroup.com/api/DayAheadPrices";
const AGGREGATE_URL: &str = "https://dataportal-api.nordpoolgroup.com/api/AggregatePrices";

pub struct MultiAreaEntriesAdapter {
    client: reqwest::Client,
}

impl MultiAreaEntriesAdapter {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self { client })
    }

    #[instrument(skip_all, fields(%url))]
    async fn get_entries(&self, url: &str, options: &MarketOptions) -> Result<PriceSeries> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("failed to request `{url}`"))?
            .error_for_status()?
            .json::<Response>()
            .await
            .context("failed to parse the day-ahead response")?;
        Ok(parse_response(&response, options))
    }
}

#[async_trait]
impl PriceSource for MultiAreaEntriesAdapter {
    async fn fetch_prices_for_day(
        &self,
        date: NaiveDate,
        options: &MarketOptions,
    ) -> Result<PriceSeries> {
        info!(?date, area = options.price_area, "fetching hourly prices…");
        let url = format!(
            "{DAY_AHEAD_URL}?date={date}&market=DayAhead&deliveryArea={}&currency={}",
            options.price_area, options.currency,
        );
        self.get_entries(&url, options).await
    }

    async fn fetch_daily_averages(
        &self,
        date: NaiveDate,
        options: &MarketOptions,
    ) -> Result<PriceSeries> {
        info!(?date, area = options.price_area, "fetching daily averages…");
        let url = format!(
            "{AGGREGATE_URL}?year={}&market=DayAhead&deliveryArea={}&currency={}",
            date.year(),
            options.price_area,
            options.currency,
        );
        let (year, month) = (date.year(), date.month());
        let prices = self.get_entries(&url, options).await?;
        Ok(prices
            .into_iter()
            .filter(|point| {
                let date = point.starts_at.date_naive();
                date.year() == year && date.month() == month
            })
            .collect())
    }
}

fn parse_response(response: &Response, options: &MarketOptions) -> PriceSeries {
    response
        .entries
        .iter()
        .filter_map(|entry| {
            let value = entry.per_area.get(&options.price_area)?;
            value.is_finite().then(|| {
                PricePoint::new(
                    entry.delivery_start.with_timezone(&options.zone),
                    KilowattHourRate(scale_megawatt_price(*value)),
                )
            })
        })
        .collect()
}

#[derive(Deserialize)]
struct Response {
    #[serde(rename = "multiAreaEntries", default)]
    entries: Vec<Entry>,
}

#[derive(Deserialize)]
struct Entry {
    #[serde(rename = "deliveryStart")]
    delivery_start: DateTime<Utc>,

    #[serde(rename = "entryPerArea", default)]
    per_area: HashMap<String, f64>,
}
