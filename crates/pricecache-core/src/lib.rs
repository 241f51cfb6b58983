//! Core library for pricecache.
//!
//! Keeps a local, persistent copy of a remote price feed and exposes it as
//! live per-key subscriptions, so a front end can render the last known price
//! immediately and pick up fresh values when a background refresh lands.
//!
//! - [`store`]: durable key → price table with reactive point lookups
//! - [`feed`]: HTTP client for the remote price table
//! - [`sync`]: fetch-then-upsert refresh with serve-stale-on-failure policy
//! - [`query`]: composition of the two price subscriptions of an item
//! - [`catalog`]: the fixed state → market → category → item table

pub mod catalog;
pub mod config;
pub mod feed;
pub mod models;
pub mod query;
pub mod store;
pub mod sync;

pub use config::Config;
pub use feed::{FeedClient, FeedError, PriceFeed};
pub use models::{CatalogItem, Category, Market, PriceRecord, State};
pub use query::{combine_latest, ItemPrices, PriceQuery};
pub use store::{PriceStore, PriceSubscription, StoreError};
pub use sync::{PriceSync, RefreshOutcome};
