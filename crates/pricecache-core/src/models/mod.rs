//! Data models for cached prices and the static catalog.
//!
//! - `PriceRecord`: latest price for one feed key, as stored in the cache
//! - `State`, `Market`, `Category`, `CatalogItem`: the read-only browse hierarchy

pub mod catalog;
pub mod price;

pub use catalog::{CatalogItem, Category, Market, State};
pub use price::PriceRecord;
