use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use chrono::Utc;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, OnceCell};
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info};

use crate::models::PriceRecord;

use super::StoreError;

/// Cache file name inside the cache directory
const CACHE_FILE: &str = "prices.json";

/// Temporary file the table is written to before being renamed into place
const CACHE_TMP_FILE: &str = "prices.json.tmp";

/// On-disk layout version. There are no migrations; any other version is rejected.
const SCHEMA_VERSION: u32 = 1;

/// Process-wide store, opened on first use.
static GLOBAL_STORE: OnceCell<Arc<PriceStore>> = OnceCell::const_new();

#[derive(Deserialize)]
struct CacheFile {
    schema_version: u32,
    #[serde(default)]
    records: Vec<PriceRecord>,
}

#[derive(Serialize)]
struct CacheFileRef<'a> {
    schema_version: u32,
    records: Vec<&'a PriceRecord>,
}

/// Committed table plus one watch channel per subscribed key.
#[derive(Default)]
struct Tables {
    records: HashMap<String, PriceRecord>,
    channels: HashMap<String, watch::Sender<Option<PriceRecord>>>,
}

/// Durable key → `PriceRecord` table with live per-key subscriptions.
///
/// Writers are serialized by `write_lock`, which is held across the disk
/// write. The committed table sits behind a short-lived mutex that is never
/// held across an await, so subscribers and point reads never wait on I/O.
/// A batch becomes visible only after it has been persisted.
pub struct PriceStore {
    path: PathBuf,
    tables: Arc<Mutex<Tables>>,
    write_lock: Arc<tokio::sync::Mutex<()>>,
}

impl PriceStore {
    /// Open the store in `cache_dir`, loading any previously persisted table.
    pub async fn open(cache_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let cache_dir = cache_dir.into();
        let path = cache_dir.join(CACHE_FILE);

        let load_path = path.clone();
        let records = tokio::task::spawn_blocking(move || load_table(&cache_dir, &load_path)).await??;

        info!(path = %path.display(), count = records.len(), "Price cache opened");

        Ok(Self {
            path,
            tables: Arc::new(Mutex::new(Tables {
                records,
                channels: HashMap::new(),
            })),
            write_lock: Arc::new(tokio::sync::Mutex::new(())),
        })
    }

    /// The process-wide store.
    ///
    /// The first successful call opens the store in `cache_dir`; concurrent
    /// first calls wait for that single initialization. Later calls return the
    /// same instance and ignore their argument. A failed open is not
    /// remembered, so the next call tries again.
    pub async fn global(cache_dir: impl Into<PathBuf>) -> Result<Arc<Self>, StoreError> {
        let cache_dir = cache_dir.into();
        GLOBAL_STORE
            .get_or_try_init(|| async move { Self::open(cache_dir).await.map(Arc::new) })
            .await
            .map(Arc::clone)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Live view of one key.
    ///
    /// Yields the current record (or `None`) immediately, then the new record
    /// each time the key is written. Values written faster than the subscriber
    /// polls are conflated to the latest one. Dropping the subscription
    /// releases it.
    pub fn subscribe(&self, key: &str) -> PriceSubscription {
        let mut tables = self.lock_tables();
        let current = tables.records.get(key).cloned();
        let rx = tables
            .channels
            .entry(key.to_string())
            .or_insert_with(|| watch::channel(current).0)
            .subscribe();
        debug!(key = key, "Price subscription opened");
        PriceSubscription {
            key: key.to_string(),
            inner: WatchStream::new(rx),
        }
    }

    /// Committed record for `key`, if any.
    pub fn get(&self, key: &str) -> Option<PriceRecord> {
        self.lock_tables().records.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock_tables().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of live subscriptions for `key`.
    pub fn subscriber_count(&self, key: &str) -> usize {
        self.lock_tables()
            .channels
            .get(key)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }

    /// Insert or replace every record by key, as one batch.
    ///
    /// All records are stamped with the time of this write. If the same key
    /// appears more than once, the last occurrence wins. The batch is written
    /// to disk first; on failure nothing changes in memory and the error is
    /// returned. On success each affected subscription sees the new record.
    ///
    /// Dropping the returned future before the writer lock is taken discards
    /// the batch. Once the lock is taken, the write and the in-memory commit
    /// finish together on the blocking pool even if the caller goes away.
    pub async fn upsert_all(&self, records: Vec<PriceRecord>) -> Result<(), StoreError> {
        let writer = Arc::clone(&self.write_lock).lock_owned().await;

        let observed_at = Utc::now().timestamp_millis();
        let mut table = self.lock_tables().records.clone();
        let mut touched = BTreeSet::new();
        for record in records {
            let record = record.stamped(observed_at);
            touched.insert(record.key().to_string());
            table.insert(record.key().to_string(), record);
        }

        let path = self.path.clone();
        let tables = Arc::clone(&self.tables);
        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let _writer = writer;
            write_table(&path, &table)?;
            commit(&tables, table, &touched);
            Ok(())
        })
        .await?
    }

    fn lock_tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Swap in a persisted table and notify subscribers of the touched keys.
fn commit(tables: &Mutex<Tables>, table: HashMap<String, PriceRecord>, touched: &BTreeSet<String>) {
    let mut tables = tables.lock().unwrap_or_else(PoisonError::into_inner);
    tables.records = table;
    tables.channels.retain(|_, tx| tx.receiver_count() > 0);

    let Tables { records, channels } = &*tables;
    let mut notified = 0;
    for key in touched {
        if let Some(tx) = channels.get(key) {
            tx.send_replace(records.get(key).cloned());
            notified += 1;
        }
    }

    debug!(count = touched.len(), notified, total = records.len(), "Prices upserted");
}

/// Live stream of one key's record, produced by [`PriceStore::subscribe`].
pub struct PriceSubscription {
    key: String,
    inner: WatchStream<Option<PriceRecord>>,
}

impl PriceSubscription {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Stream for PriceSubscription {
    type Item = Option<PriceRecord>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

fn load_table(cache_dir: &Path, path: &Path) -> Result<HashMap<String, PriceRecord>, StoreError> {
    std::fs::create_dir_all(cache_dir).map_err(|e| StoreError::io("create", cache_dir, e))?;

    if !path.exists() {
        return Ok(HashMap::new());
    }

    let contents = std::fs::read_to_string(path).map_err(|e| StoreError::io("read", path, e))?;
    let file: CacheFile = serde_json::from_str(&contents).map_err(|e| StoreError::Corrupt {
        path: path.to_path_buf(),
        source: Arc::new(e),
    })?;

    if file.schema_version != SCHEMA_VERSION {
        return Err(StoreError::UnsupportedSchema {
            found: file.schema_version,
            expected: SCHEMA_VERSION,
        });
    }

    Ok(file
        .records
        .into_iter()
        .map(|r| (r.key().to_string(), r))
        .collect())
}

/// Write the full table next to the cache file, then rename it into place so
/// readers of the file never see a partial table.
fn write_table(path: &Path, table: &HashMap<String, PriceRecord>) -> Result<(), StoreError> {
    let mut records: Vec<&PriceRecord> = table.values().collect();
    records.sort_by(|a, b| a.key().cmp(b.key()));

    let contents = serde_json::to_string_pretty(&CacheFileRef {
        schema_version: SCHEMA_VERSION,
        records,
    })
    .map_err(|e| StoreError::Serialize(Arc::new(e)))?;

    let tmp_path = path.with_file_name(CACHE_TMP_FILE);
    std::fs::write(&tmp_path, contents).map_err(|e| StoreError::io("write", &tmp_path, e))?;
    std::fs::rename(&tmp_path, path).map_err(|e| StoreError::io("replace", path, e))?;
    Ok(())
}
