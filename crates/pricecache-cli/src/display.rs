//! Formatting of catalog entries and prices for the terminal.

use pricecache_core::{CatalogItem, PriceRecord};

/// Currency suffix shown after every price
const CURRENCY: &str = "SDG";

/// Shown for a price that has not been synced yet
const LOADING: &str = "Loading...";

/// Format a cached price, or the loading placeholder when there is none yet
pub fn format_price(record: &Option<PriceRecord>) -> String {
    match record {
        Some(r) => format!("{} {}", r.price(), CURRENCY),
        None => LOADING.to_string(),
    }
}

pub fn format_price_pair(item: &CatalogItem, small: &Option<PriceRecord>, large: &Option<PriceRecord>) -> String {
    let mut text = format!(
        "{}\n  Single Item Price:    {}\n  Large Quantity Price: {}",
        item.name,
        format_price(small),
        format_price(large)
    );
    if let Some(synced) = last_synced(small, large) {
        text.push_str(&format!("\n  Last synced:          {}", synced));
    }
    text
}

/// Newest sync time of either side, in UTC
fn last_synced(small: &Option<PriceRecord>, large: &Option<PriceRecord>) -> Option<String> {
    [small, large]
        .into_iter()
        .flatten()
        .filter_map(PriceRecord::observed_at_utc)
        .max()
        .map(|at| at.format("%Y-%m-%d %H:%M UTC").to_string())
}

/// One list row: id column padded, then icon and name
pub fn format_row(id: &str, icon: Option<&str>, name: &str) -> String {
    match icon {
        Some(icon) => format!("{:<14}{} {}", id, icon, name),
        None => format!("{:<14}{}", id, name),
    }
}

pub fn not_found(kind: &str, id: &str) -> String {
    format!("{} '{}' not found", kind, id)
}
