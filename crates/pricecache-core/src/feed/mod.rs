//! Remote price feed.
//!
//! `FeedClient` fetches the whole price table from a fixed URL. The sync
//! layer depends on the `PriceFeed` trait rather than the concrete client.

pub mod client;
pub mod error;

use std::collections::HashMap;

use async_trait::async_trait;

pub use client::FeedClient;
pub use error::FeedError;

/// Source of the complete key → price table.
#[async_trait]
pub trait PriceFeed: Send + Sync {
    async fn fetch_all(&self) -> Result<HashMap<String, String>, FeedError>;
}
