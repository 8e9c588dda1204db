//! Day-keyed price cache and the fetch client that maintains it.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::{
    api::source::{MarketOptions, PriceSource},
    core::point::PriceSeries,
    prelude::*,
};

const STORE_PREFIX: &str = "prices-";

/// One extra day at a time past this cap is silently dropped from a range.
const MAX_EXTRA_DAYS: usize = 10;

/// Key-value storage of per-day price series.
///
/// Keys are opaque to implementors; the client derives them from the date and
/// market options so that a settings change never serves stale prices.
pub trait PriceStore {
    fn keys(&self) -> Vec<String>;
    fn get(&self, key: &str) -> Option<PriceSeries>;
    fn set(&mut self, key: String, prices: PriceSeries);
    fn remove(&mut self, key: &str);
}

/// In-memory store, for tests and short-lived processes.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, PriceSeries>,
}

impl PriceStore for MemoryStore {
    fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    fn get(&self, key: &str) -> Option<PriceSeries> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: String, prices: PriceSeries) {
        self.entries.insert(key, prices);
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }
}

/// Keeps a [`PriceStore`] loaded with the spot prices for a date range.
pub struct PricesFetchClient<P> {
    source: P,
}

impl<P: PriceSource + Sync> PricesFetchClient<P> {
    pub const fn new(source: P) -> Self {
        Self { source }
    }

    /// Fetches and stores the series for every day in `from..=to`, dropping
    /// cached days outside the range first. With `only_if_missing`, days
    /// already in the store are left untouched. A failed day is logged and
    /// skipped, leaving its slot empty for the next attempt.
    #[instrument(skip_all, fields(%from, %to))]
    pub async fn fetch_spot_prices_in_range(
        &self,
        store: &mut impl PriceStore,
        from: NaiveDate,
        to: NaiveDate,
        options: &MarketOptions,
        only_if_missing: bool,
    ) {
        let dates = date_range(from, to);
        clear_storage_except(store, &dates);
        for date in dates {
            if only_if_missing && store.get(&cache_id(date, options)).is_some() {
                continue;
            }
            match self.source.fetch_prices_for_day(date, options).await {
                Ok(prices) if !prices.is_empty() => {
                    store.set(cache_id(date, options), prices);
                }
                Ok(_) => debug!(%date, "no prices for the day yet"),
                Err(error) => warn!(%date, "fetching prices failed: {error:#}"),
            }
        }
    }

    /// Whether every day of `from..=to` is present in the store.
    pub fn has_prices_in_range(
        &self,
        store: &impl PriceStore,
        from: NaiveDate,
        to: NaiveDate,
        options: &MarketOptions,
    ) -> bool {
        date_range(from, to)
            .into_iter()
            .all(|date| store.get(&cache_id(date, options)).is_some())
    }

    /// All stored prices of `from..=to`, merged and sorted ascending.
    pub fn get_prices(
        &self,
        store: &impl PriceStore,
        from: NaiveDate,
        to: NaiveDate,
        options: &MarketOptions,
    ) -> PriceSeries {
        let mut prices: PriceSeries = date_range(from, to)
            .into_iter()
            .filter_map(|date| store.get(&cache_id(date, options)))
            .flatten()
            .collect();
        prices.sort_by_key(|point| point.starts_at);
        prices
    }
}

fn cache_prefix(date: NaiveDate) -> String {
    format!("{STORE_PREFIX}{date}-")
}

fn cache_id(date: NaiveDate, options: &MarketOptions) -> String {
    format!("{}{}-{}", cache_prefix(date), options.currency, options.price_area)
}

/// The dates of `from..=to`, capped at [`MAX_EXTRA_DAYS`] past `from`.
fn date_range(from: NaiveDate, to: NaiveDate) -> Vec<NaiveDate> {
    let mut dates = vec![from];
    let mut date = from;
    while date < to && dates.len() <= MAX_EXTRA_DAYS {
        date = date.succ_opt().unwrap_or(date);
        dates.push(date);
    }
    dates
}

/// Drops every cached day that is not in `dates`. Keys without the price
/// prefix belong to someone else and are left alone.
fn clear_storage_except(store: &mut impl PriceStore, dates: &[NaiveDate]) {
    let keep: Vec<String> = dates.iter().map(|date| cache_prefix(*date)).collect();
    for key in store.keys() {
        if key.starts_with(STORE_PREFIX) && !keep.iter().any(|prefix| key.starts_with(prefix)) {
            debug!(key, "dropping a stale cache entry");
            store.remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::{TimeDelta, TimeZone};
    use chrono_tz::Europe::Oslo;

    use super::*;
    use crate::{
        api::source::Currency,
        core::point::PricePoint,
        quantity::rate::KilowattHourRate,
    };

    struct CountingSource {
        calls: AtomicUsize,
    }

    impl CountingSource {
        fn new() -> Self {
            Self { calls: AtomicUsize::new(0) }
        }
    }

    #[async_trait]
    impl PriceSource for CountingSource {
        async fn fetch_prices_for_day(
            &self,
            date: NaiveDate,
            options: &MarketOptions,
        ) -> Result<PriceSeries> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            let midnight = options
                .zone
                .from_local_datetime(&date.and_hms_opt(0, 0, 0).unwrap())
                .unwrap();
            Ok((0..24)
                .map(|hour| {
                    PricePoint::new(midnight + TimeDelta::hours(hour), KilowattHourRate(0.5))
                })
                .collect())
        }

        async fn fetch_daily_averages(
            &self,
            _date: NaiveDate,
            _options: &MarketOptions,
        ) -> Result<PriceSeries> {
            Ok(PriceSeries::new())
        }
    }

    fn options() -> MarketOptions {
        MarketOptions {
            currency: Currency::Nok,
            price_area: "NO1".to_owned(),
            zone: Oslo,
        }
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2019, 1, day).unwrap()
    }

    #[test]
    fn test_cache_id_layout() {
        assert_eq!(cache_id(date(21), &options()), "prices-2019-01-21-NOK-NO1");
    }

    #[test]
    fn test_date_range_is_inclusive_and_capped() {
        assert_eq!(date_range(date(21), date(21)), vec![date(21)]);
        assert_eq!(date_range(date(21), date(23)), vec![date(21), date(22), date(23)]);
        assert_eq!(date_range(date(1), date(31)).len(), MAX_EXTRA_DAYS + 1);
    }

    #[tokio::test]
    async fn test_fetch_stores_and_merges() {
        let client = PricesFetchClient::new(CountingSource::new());
        let mut store = MemoryStore::default();

        client
            .fetch_spot_prices_in_range(&mut store, date(21), date(22), &options(), false)
            .await;
        assert!(client.has_prices_in_range(&store, date(21), date(22), &options()));
        assert!(!client.has_prices_in_range(&store, date(21), date(23), &options()));

        let prices = client.get_prices(&store, date(21), date(22), &options());
        assert_eq!(prices.len(), 48);
        assert!(prices.windows(2).all(|pair| pair[0].starts_at < pair[1].starts_at));
    }

    #[tokio::test]
    async fn test_only_if_missing_skips_cached_days() {
        let client = PricesFetchClient::new(CountingSource::new());
        let mut store = MemoryStore::default();

        client
            .fetch_spot_prices_in_range(&mut store, date(21), date(22), &options(), false)
            .await;
        assert_eq!(client.source.calls.load(Ordering::Relaxed), 2);

        client
            .fetch_spot_prices_in_range(&mut store, date(21), date(23), &options(), true)
            .await;
        assert_eq!(client.source.calls.load(Ordering::Relaxed), 3);
    }

    #[tokio::test]
    async fn test_stale_days_are_dropped() {
        crate::testing::init_tracing();
        let client = PricesFetchClient::new(CountingSource::new());
        let mut store = MemoryStore::default();
        store.set("unrelated".to_owned(), PriceSeries::new());

        client
            .fetch_spot_prices_in_range(&mut store, date(20), date(21), &options(), false)
            .await;
        client
            .fetch_spot_prices_in_range(&mut store, date(22), date(23), &options(), false)
            .await;

        let keys = store.keys();
        assert!(!keys.iter().any(|key| key.starts_with("prices-2019-01-20")));
        assert!(keys.iter().any(|key| key.starts_with("prices-2019-01-22")));
        // Foreign keys survive the cleanup.
        assert!(keys.contains(&"unrelated".to_owned()));
    }
}
