use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use tracing::debug;

use crate::catalog;
use crate::models::{CatalogItem, PriceRecord};
use crate::store::{PriceStore, PriceSubscription};

use super::combine::{combine_latest, CombineLatest};

/// `(single-item price, large-quantity price)`; either side is `None` until
/// the key has been synced at least once.
pub type PricePair = (Option<PriceRecord>, Option<PriceRecord>);

/// Read-side access to cached prices for catalog items.
#[derive(Clone)]
pub struct PriceQuery {
    store: Arc<PriceStore>,
}

impl PriceQuery {
    pub fn new(store: Arc<PriceStore>) -> Self {
        Self { store }
    }

    /// Live pair of the item's two prices.
    ///
    /// The first pair reflects whatever is cached right now (both `None`
    /// before the first successful sync). A new pair follows every write to
    /// either key.
    pub fn observe_item_prices(&self, item: &CatalogItem) -> ItemPrices {
        debug!(item = item.id, small = item.small_key, large = item.large_key, "Observing item prices");
        ItemPrices {
            item_id: item.id,
            inner: combine_latest(
                self.store.subscribe(item.small_key),
                self.store.subscribe(item.large_key),
            ),
        }
    }

    /// Same as [`observe_item_prices`](Self::observe_item_prices), looked up by
    /// catalog id. `None` when the catalog has no such item.
    pub fn observe_item_prices_by_id(&self, item_id: &str) -> Option<ItemPrices> {
        catalog::item(item_id).map(|item| self.observe_item_prices(item))
    }
}

/// Stream returned by [`PriceQuery::observe_item_prices`].
pub struct ItemPrices {
    item_id: &'static str,
    inner: CombineLatest<PriceSubscription, PriceSubscription>,
}

impl ItemPrices {
    pub fn item_id(&self) -> &'static str {
        self.item_id
    }
}

impl Stream for ItemPrices {
    type Item = PricePair;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}
