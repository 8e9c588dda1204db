pub mod legacy_rows;
pub mod multi_area;
pub mod source;

pub use self::{
    legacy_rows::LegacyRowsAdapter,
    multi_area::MultiAreaEntriesAdapter,
    source::{Currency, MarketOptions, PriceSource},
};
