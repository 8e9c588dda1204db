//! Hourly spot-price analytics for home automation: fetching day-ahead
//! prices, classifying the current hour against its day, and deciding when
//! heating and other loads should run.

#![allow(clippy::doc_markdown)]

pub mod api;
pub mod calendar;
pub mod comparer;
pub mod core;
pub mod fetch;
mod prelude;
pub mod quantity;

#[cfg(test)]
mod testing;
