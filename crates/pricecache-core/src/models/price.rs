use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Latest known price for a single feed key.
///
/// The price string is kept exactly as the feed sent it. `observed_at` is
/// stamped by the store when the record is written, so callers only ever
/// choose the key and the price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct PriceRecord {
    key: String,
    price: String,
    observed_at: i64,
}

impl PriceRecord {
    pub fn new(key: impl Into<String>, price: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            price: price.into(),
            observed_at: Utc::now().timestamp_millis(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn price(&self) -> &str {
        &self.price
    }

    /// Milliseconds since the Unix epoch of the write that produced this record.
    pub fn observed_at(&self) -> i64 {
        self.observed_at
    }

    pub fn observed_at_utc(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.observed_at).single()
    }

    /// Re-stamp the record with the time of the write that commits it.
    pub(crate) fn stamped(mut self, observed_at: i64) -> Self {
        self.observed_at = observed_at;
        self
    }
}
