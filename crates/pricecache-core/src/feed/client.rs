//! HTTP client for the remote price table.
//!
//! The feed is a single flat JSON object mapping feed keys to price strings.
//! One GET returns the whole table; there is no paging and no retry here.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use serde_json::Value;
use tracing::debug;

use crate::config::Config;

use super::{FeedError, PriceFeed};

/// Client for the price feed.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct FeedClient {
    client: Client,
    url: Arc<str>,
}

impl FeedClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, FeedError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: Arc::from(url.into()),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, FeedError> {
        Self::new(config.feed_url(), config.request_timeout())
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch the entire price table in one request.
    pub async fn fetch_all(&self) -> Result<HashMap<String, String>, FeedError> {
        let response = self
            .client
            .get(&*self.url)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        let body = response.text().await?;
        let prices = parse_price_table(&body)?;

        debug!(url = %self.url, count = prices.len(), "Fetched price table");
        Ok(prices)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, FeedError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(FeedError::from_status(status, &body))
        }
    }
}

#[async_trait]
impl PriceFeed for FeedClient {
    async fn fetch_all(&self) -> Result<HashMap<String, String>, FeedError> {
        FeedClient::fetch_all(self).await
    }
}

/// Parse the feed body into key → price.
///
/// Entries whose value is not a string are skipped so that new kinds of
/// fields in the feed do not break older clients.
fn parse_price_table(body: &str) -> Result<HashMap<String, String>, FeedError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| FeedError::Malformed(e.to_string()))?;

    let Value::Object(entries) = value else {
        return Err(FeedError::Malformed(
            "expected a JSON object at the top level".to_string(),
        ));
    };

    let mut prices = HashMap::with_capacity(entries.len());
    for (key, value) in entries {
        match value {
            Value::String(price) => {
                prices.insert(key, price);
            }
            other => {
                debug!(key = %key, value = %other, "Skipping non-string feed entry");
            }
        }
    }
    Ok(prices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flat_object() {
        let prices = parse_price_table(r#"{"oranges_s": "120", "oranges_m": "1000"}"#)
            .expect("valid feed");
        assert_eq!(prices.len(), 2);
        assert_eq!(prices["oranges_s"], "120");
        assert_eq!(prices["oranges_m"], "1000");
    }

    #[test]
    fn test_parse_skips_non_string_values() {
        let prices = parse_price_table(
            r#"{"apples_s": "80", "updated": 1712345678, "meta": {"v": 2}, "flag": null}"#,
        )
        .expect("extra fields must not fail parsing");
        assert_eq!(prices.len(), 1);
        assert_eq!(prices["apples_s"], "80");
    }

    #[test]
    fn test_parse_empty_object() {
        let prices = parse_price_table("{}").expect("empty feed is valid");
        assert!(prices.is_empty());
    }

    #[test]
    fn test_parse_rejects_non_object() {
        assert!(matches!(
            parse_price_table(r#"["oranges_s", "120"]"#),
            Err(FeedError::Malformed(_))
        ));
        assert!(matches!(
            parse_price_table("<html>rate limited</html>"),
            Err(FeedError::Malformed(_))
        ));
    }

    #[test]
    fn test_client_keeps_configured_url() {
        let config = Config {
            feed_url: Some("http://127.0.0.1:9/prices.json".to_string()),
            ..Config::default()
        };
        let client = FeedClient::from_config(&config).expect("build client");
        assert_eq!(client.url(), "http://127.0.0.1:9/prices.json");
    }
}
