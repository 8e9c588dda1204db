//! Adapter for the legacy market-data pages.
//!
//! The payload is a grid: one row per market-zone local hour, one column per
//! bidding area, with decimal-comma numbers. Rows flagged as extra carry
//! grid totals instead of hours and are skipped.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use chrono_tz::Europe::Oslo;
use serde::Deserialize;

use crate::{
    api::source::{MarketOptions, PriceSource, scale_megawatt_price},
    core::{
        clock::{resolve_local, start_of_hour},
        point::{PricePoint, PriceSeries},
    },
    prelude::*,
    quantity::rate::KilowattHourRate,
};

const HOURLY_PAGE: &str = "https://www.nordpoolgroup.com/api/marketdata/page/10";
const DAILY_PAGE: &str = "https://www.nordpoolgroup.com/api/marketdata/page/24";

pub struct LegacyRowsAdapter {
    client: reqwest::Client,
}

impl LegacyRowsAdapter {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self { client })
    }

    #[instrument(skip_all, fields(%url))]
    async fn get_page(&self, url: &str, options: &MarketOptions) -> Result<PriceSeries> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("failed to request `{url}`"))?
            .error_for_status()?
            .json::<Response>()
            .await
            .context("failed to parse the market-data page")?;
        Ok(parse_response(&response, options))
    }
}

#[async_trait]
impl PriceSource for LegacyRowsAdapter {
    async fn fetch_prices_for_day(
        &self,
        date: NaiveDate,
        options: &MarketOptions,
    ) -> Result<PriceSeries> {
        info!(?date, area = options.price_area, "fetching hourly prices…");
        let currency = options.currency;
        let url = format!(
            "{HOURLY_PAGE}?currency=,{currency},{currency},{currency}&endDate={}",
            date.format("%d-%m-%Y"),
        );
        self.get_page(&url, options).await
    }

    async fn fetch_daily_averages(
        &self,
        date: NaiveDate,
        options: &MarketOptions,
    ) -> Result<PriceSeries> {
        info!(?date, area = options.price_area, "fetching daily averages…");
        let currency = options.currency;
        let url = format!("{DAILY_PAGE}?currency=,{currency},{currency},{currency}");
        let prices = self.get_page(&url, options).await?;

        let month_start = date.with_day(1).context("invalid date")?;
        let next_month_start = month_start
            .checked_add_months(chrono::Months::new(1))
            .context("invalid date")?;
        Ok(prices
            .into_iter()
            .filter(|point| {
                let date = point.starts_at.date_naive();
                date >= month_start && date < next_month_start
            })
            .collect())
    }
}

fn parse_response(response: &Response, options: &MarketOptions) -> PriceSeries {
    let Some(data) = &response.data else {
        return PriceSeries::new();
    };
    let mut prices = PriceSeries::new();
    for row in &data.rows {
        if row.is_extra_row {
            continue;
        }
        let Some(starts_at) = resolve_local(Oslo, row.start_time) else {
            warn!(start_time = %row.start_time, "skipping an unmappable start time");
            continue;
        };
        let starts_at = start_of_hour(starts_at.with_timezone(&options.zone));
        for column in &row.columns {
            if column.name != options.price_area {
                continue;
            }
            let Some(price) = parse_price(&column.value) else {
                continue;
            };
            prices.push(PricePoint::new(starts_at, KilowattHourRate(price)));
        }
    }
    prices
}

/// Parses a decimal-comma quote with optional space thousands separators,
/// scaled from MWh to kWh. Dashes and other placeholders yield `None`.
fn parse_price(value: &str) -> Option<f64> {
    let value: f64 = value.replace(',', ".").replace(' ', "").parse().ok()?;
    value.is_finite().then(|| scale_megawatt_price(value))
}

#[derive(Deserialize)]
struct Response {
    data: Option<Data>,
}

#[derive(Deserialize)]
struct Data {
    #[serde(rename = "Rows", default)]
    rows: Vec<Row>,
}

#[derive(Deserialize)]
struct Row {
    /// Market-zone local time, no offset in the text.
    #[serde(rename = "StartTime")]
    start_time: NaiveDateTime,

    #[serde(rename = "IsExtraRow", default)]
    is_extra_row: bool,

    #[serde(rename = "Columns", default)]
    columns: Vec<Column>,
}

#[derive(Deserialize)]
struct Column {
    #[serde(rename = "Name")]
    name: String,

    #[serde(rename = "Value")]
    value: String,
}
