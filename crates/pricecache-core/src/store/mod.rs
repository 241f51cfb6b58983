//! Local persistent price cache.
//!
//! `PriceStore` keeps the latest `PriceRecord` per feed key in memory and in
//! `prices.json` under the cache directory, and hands out live per-key
//! subscriptions. It is the only shared mutable state in the crate; all writes
//! go through `upsert_all`.

pub mod error;
pub mod price_store;

pub use error::StoreError;
pub use price_store::{PriceStore, PriceSubscription};
