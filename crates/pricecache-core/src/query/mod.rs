//! Read-side composition of cached prices.
//!
//! An item shows two prices; `PriceQuery` joins the two per-key store
//! subscriptions into one stream of pairs without transforming the records.

pub mod combine;
pub mod item_prices;

pub use combine::{combine_latest, CombineLatest};
pub use item_prices::{ItemPrices, PricePair, PriceQuery};
