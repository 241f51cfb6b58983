use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::feed::PriceFeed;
use crate::models::PriceRecord;
use crate::store::{PriceStore, StoreError};

/// What a refresh did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The feed was fetched and every entry was written to the cache.
    Updated { count: usize },
    /// The feed could not be fetched; cached prices were left as they were.
    FeedUnavailable,
}

type RefreshCycle = Shared<BoxFuture<'static, Result<RefreshOutcome, StoreError>>>;

struct SyncInner {
    feed: Arc<dyn PriceFeed>,
    store: Arc<PriceStore>,
    in_flight: Mutex<Option<RefreshCycle>>,
}

/// Pulls the remote price table into the local store.
///
/// Feed failures are logged and absorbed so the cache keeps serving the last
/// good prices. Storage failures are returned to the caller. Calls made while
/// a refresh is running join that refresh instead of starting another one.
/// Clone is cheap and clones share the in-flight refresh.
#[derive(Clone)]
pub struct PriceSync {
    inner: Arc<SyncInner>,
}

impl PriceSync {
    pub fn new(feed: Arc<dyn PriceFeed>, store: Arc<PriceStore>) -> Self {
        Self {
            inner: Arc::new(SyncInner {
                feed,
                store,
                in_flight: Mutex::new(None),
            }),
        }
    }

    pub fn store(&self) -> &Arc<PriceStore> {
        &self.inner.store
    }

    /// Fetch the feed and upsert every entry.
    ///
    /// Returns `Ok(FeedUnavailable)` rather than an error when the feed
    /// cannot be reached. The refresh itself runs as its own task, so
    /// dropping this future does not abort it for other callers.
    pub async fn refresh(&self) -> Result<RefreshOutcome, StoreError> {
        self.join_or_start().await
    }

    /// Run one refresh in the background, as done once at startup.
    pub fn spawn_startup_refresh(&self) -> JoinHandle<Result<RefreshOutcome, StoreError>> {
        let sync = self.clone();
        tokio::spawn(async move {
            debug!("Startup price refresh");
            sync.refresh().await
        })
    }

    fn join_or_start(&self) -> RefreshCycle {
        let mut slot = lock_slot(&self.inner.in_flight);
        if let Some(cycle) = slot.as_ref() {
            debug!("Joining in-flight price refresh");
            return cycle.clone();
        }

        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            let outcome = inner.run_cycle().await;
            // The slot still holds this cycle: nothing replaces it while it is set.
            *lock_slot(&inner.in_flight) = None;
            outcome
        });

        let cycle = async move { handle.await.unwrap_or_else(|e| Err(StoreError::from(e))) }
            .boxed()
            .shared();
        *slot = Some(cycle.clone());
        cycle
    }
}

impl SyncInner {
    async fn run_cycle(&self) -> Result<RefreshOutcome, StoreError> {
        info!("Refreshing prices");

        let prices = match self.feed.fetch_all().await {
            Ok(prices) => prices,
            Err(e) => {
                warn!(error = %e, "Price feed unavailable, serving cached prices");
                return Ok(RefreshOutcome::FeedUnavailable);
            }
        };

        let records: Vec<PriceRecord> = prices
            .into_iter()
            .map(|(key, price)| PriceRecord::new(key, price))
            .collect();
        let count = records.len();

        self.store.upsert_all(records).await.map_err(|e| {
            error!(error = %e, "Failed to store refreshed prices");
            e
        })?;

        info!(count, "Prices refreshed");
        Ok(RefreshOutcome::Updated { count })
    }
}

fn lock_slot(slot: &Mutex<Option<RefreshCycle>>) -> MutexGuard<'_, Option<RefreshCycle>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use reqwest::StatusCode;

    use crate::feed::FeedError;

    struct StaticFeed {
        prices: HashMap<String, String>,
        calls: AtomicUsize,
        delay: Duration,
    }

    impl StaticFeed {
        fn new(entries: &[(&str, &str)]) -> Self {
            Self {
                prices: entries
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                calls: AtomicUsize::new(0),
                delay: Duration::ZERO,
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }
    }

    #[async_trait]
    impl PriceFeed for StaticFeed {
        async fn fetch_all(&self) -> Result<HashMap<String, String>, FeedError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            Ok(self.prices.clone())
        }
    }

    struct FailingFeed;

    #[async_trait]
    impl PriceFeed for FailingFeed {
        async fn fetch_all(&self) -> Result<HashMap<String, String>, FeedError> {
            Err(FeedError::from_status(StatusCode::INTERNAL_SERVER_ERROR, "upstream down"))
        }
    }

    async fn temp_store() -> (tempfile::TempDir, Arc<PriceStore>) {
        let dir = tempfile::tempdir().expect("create temp dir");
        let store = PriceStore::open(dir.path()).await.expect("open store");
        (dir, Arc::new(store))
    }

    #[tokio::test]
    async fn test_refresh_upserts_every_entry() {
        let (_dir, store) = temp_store().await;
        let feed = StaticFeed::new(&[("oranges_s", "120"), ("oranges_m", "1000"), ("unused_key", "1")]);
        let sync = PriceSync::new(Arc::new(feed), Arc::clone(&store));

        let outcome = sync.refresh().await.expect("refresh");
        assert_eq!(outcome, RefreshOutcome::Updated { count: 3 });
        assert_eq!(store.get("oranges_s").map(|r| r.price().to_string()), Some("120".into()));
        assert_eq!(store.get("unused_key").map(|r| r.price().to_string()), Some("1".into()));
    }

    #[tokio::test]
    async fn test_feed_failure_keeps_cached_prices() {
        let (_dir, store) = temp_store().await;
        store
            .upsert_all(vec![PriceRecord::new("oranges_s", "100")])
            .await
            .expect("seed");
        let before = store.get("oranges_s");

        let sync = PriceSync::new(Arc::new(FailingFeed), Arc::clone(&store));
        let outcome = sync.refresh().await.expect("feed errors are not propagated");

        assert_eq!(outcome, RefreshOutcome::FeedUnavailable);
        assert_eq!(store.get("oranges_s"), before);
    }

    #[tokio::test]
    async fn test_empty_feed_removes_nothing() {
        let (_dir, store) = temp_store().await;
        store
            .upsert_all(vec![PriceRecord::new("apples_s", "80")])
            .await
            .expect("seed");

        let sync = PriceSync::new(Arc::new(StaticFeed::new(&[])), Arc::clone(&store));
        assert_eq!(sync.refresh().await.expect("refresh"), RefreshOutcome::Updated { count: 0 });
        assert!(store.get("apples_s").is_some());
    }

    #[tokio::test]
    async fn test_concurrent_refreshes_share_one_fetch() {
        let (_dir, store) = temp_store().await;
        let feed = Arc::new(StaticFeed::new(&[("k", "1")]).with_delay(Duration::from_millis(50)));
        let sync = PriceSync::new(feed.clone(), store);
        let other = sync.clone();

        let (a, b) = tokio::join!(sync.refresh(), other.refresh());
        assert_eq!(a.expect("first"), RefreshOutcome::Updated { count: 1 });
        assert_eq!(b.expect("second"), RefreshOutcome::Updated { count: 1 });
        assert_eq!(feed.calls.load(Ordering::SeqCst), 1);

        sync.refresh().await.expect("later refresh");
        assert_eq!(feed.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_dropped_caller_does_not_cancel_refresh() {
        let (_dir, store) = temp_store().await;
        let feed = Arc::new(StaticFeed::new(&[("k", "1")]).with_delay(Duration::from_millis(30)));
        let sync = PriceSync::new(feed.clone(), Arc::clone(&store));

        let abandoned = tokio::time::timeout(Duration::from_millis(5), sync.refresh()).await;
        assert!(abandoned.is_err());

        assert_eq!(sync.refresh().await.expect("join"), RefreshOutcome::Updated { count: 1 });
        assert_eq!(feed.calls.load(Ordering::SeqCst), 1);
        assert!(store.get("k").is_some());
    }

    #[tokio::test]
    async fn test_storage_failure_is_propagated() {
        let (dir, store) = temp_store().await;
        std::fs::create_dir(dir.path().join("prices.json.tmp")).expect("block temp path");

        let sync = PriceSync::new(Arc::new(StaticFeed::new(&[("k", "1")])), store);
        let err = sync.refresh().await.expect_err("storage errors propagate");
        assert!(matches!(err, StoreError::Io { .. }));
    }

    #[tokio::test]
    async fn test_startup_refresh_runs_once() {
        let (_dir, store) = temp_store().await;
        let feed = Arc::new(StaticFeed::new(&[("grapes_s", "300")]));
        let sync = PriceSync::new(feed.clone(), Arc::clone(&store));

        let outcome = sync
            .spawn_startup_refresh()
            .await
            .expect("join")
            .expect("refresh");
        assert_eq!(outcome, RefreshOutcome::Updated { count: 1 });
        assert_eq!(feed.calls.load(Ordering::SeqCst), 1);
        assert!(store.get("grapes_s").is_some());
    }
}
