//! pricecache - browse the market catalog and view cached prices.
//!
//! Prices are read from the local cache first and refreshed from the remote
//! feed in the background. When the feed is unreachable the last cached
//! prices are shown.

mod display;

use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};
use futures::{FutureExt, StreamExt};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pricecache_core::{
    catalog, CatalogItem, Config, FeedClient, PriceQuery, PriceStore, PriceSync, RefreshOutcome,
};

use display::{format_price_pair, format_row, not_found};

const USAGE: &str = "\
Usage: pricecache <command>

Commands:
  states                 List states
  markets <state>        List markets in a state
  categories [market]    List categories, optionally for a market
  items <category>       List items in a category
  price <item> [--watch] Show the cached price of an item and refresh it
  refresh                Fetch the latest prices into the cache";

/// Initialize the tracing subscriber for logging.
/// The returned guard flushes buffered log lines when dropped.
fn init_tracing() -> WorkerGuard {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let (writer, guard) = tracing_appender::non_blocking(io::stderr());

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer))
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let _log_guard = init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (flags, positional) = split_args(&args);
    let command = positional.first().copied().unwrap_or("");
    let arg = positional.get(1).copied();

    match (command, arg) {
        ("states", _) => list_states(),
        ("markets", Some(state_id)) => list_markets(state_id),
        ("categories", market_id) => list_categories(market_id),
        ("items", Some(category_id)) => list_items(category_id),
        ("price", Some(item_id)) => show_price(item_id, flags.contains(&"--watch")).await?,
        ("refresh", _) => refresh().await?,
        _ => eprintln!("{}", USAGE),
    }

    Ok(())
}

/// Split `--flags` from positional arguments so flags may appear anywhere.
fn split_args(args: &[String]) -> (Vec<&str>, Vec<&str>) {
    args.iter().map(String::as_str).partition(|a| a.starts_with("--"))
}

fn list_states() {
    for s in catalog::states() {
        println!("{}", format_row(s.id, Some(s.icon), s.name));
    }
}

fn list_markets(state_id: &str) {
    let Some(state) = catalog::state(state_id) else {
        println!("{}", not_found("State", state_id));
        return;
    };
    println!("Markets in {}", state.name);
    for m in catalog::markets_for_state(state.id) {
        println!("{}", format_row(m.id, None, m.name));
    }
}

fn list_categories(market_id: Option<&str>) {
    if let Some(market_id) = market_id {
        let Some(market) = catalog::market(market_id) else {
            println!("{}", not_found("Market", market_id));
            return;
        };
        println!("Categories at {}", market.name);
    }
    for c in catalog::categories() {
        println!("{}", format_row(c.id, Some(c.icon), c.name));
    }
}

fn list_items(category_id: &str) {
    let Some(category) = catalog::category(category_id) else {
        println!("{}", not_found("Category", category_id));
        return;
    };
    let items = catalog::items_for_category(category.id);
    if items.is_empty() {
        println!("No items in {}", category.name);
    }
    for i in items {
        println!("{}", format_row(i.id, None, i.name));
    }
}

/// Open the shared store and the sync service from configuration.
async fn open_services() -> Result<PriceSync> {
    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "Failed to load config, using defaults");
            Config::default()
        }
    }
    .with_env_overrides();

    let cache_dir = config.cache_dir()?;
    let store = PriceStore::global(&cache_dir)
        .await
        .with_context(|| format!("Failed to open price cache in {}", cache_dir.display()))?;
    let feed = FeedClient::from_config(&config).context("Failed to create feed client")?;
    info!(feed = feed.url(), cache = %store.path().display(), "Services ready");

    Ok(PriceSync::new(Arc::new(feed), store))
}

async fn show_price(item_id: &str, watch: bool) -> Result<()> {
    let Some(item) = catalog::item(item_id) else {
        println!("{}", not_found("Item", item_id));
        return Ok(());
    };

    let sync = open_services().await?;
    let startup = sync.spawn_startup_refresh();
    let query = PriceQuery::new(Arc::clone(sync.store()));
    let mut prices = query.observe_item_prices(item);

    if let Some((small, large)) = prices.next().await {
        println!("{}", format_price_pair(item, &small, &large));
    }

    if watch {
        return watch_prices(item, prices, startup).await;
    }

    let outcome = startup.await.context("Startup refresh task failed")??;
    report_outcome(outcome);

    // Show the newest pair if the refresh changed anything.
    let mut latest = None;
    while let Some(Some(pair)) = prices.next().now_or_never() {
        latest = Some(pair);
    }
    if let Some((small, large)) = latest {
        println!("{}", format_price_pair(item, &small, &large));
    }
    Ok(())
}

async fn watch_prices(
    item: &CatalogItem,
    mut prices: pricecache_core::ItemPrices,
    startup: tokio::task::JoinHandle<Result<RefreshOutcome, pricecache_core::StoreError>>,
) -> Result<()> {
    let mut startup = startup.fuse();
    loop {
        tokio::select! {
            pair = prices.next() => match pair {
                Some((small, large)) => println!("{}", format_price_pair(item, &small, &large)),
                None => return Ok(()),
            },
            result = &mut startup => {
                report_outcome(result.context("Startup refresh task failed")??);
            }
            _ = tokio::signal::ctrl_c() => return Ok(()),
        }
    }
}

async fn refresh() -> Result<()> {
    let sync = open_services().await?;
    let outcome = sync.refresh().await.context("Failed to store refreshed prices")?;
    report_outcome(outcome);
    Ok(())
}

fn report_outcome(outcome: RefreshOutcome) {
    match outcome {
        RefreshOutcome::Updated { count } => eprintln!("Updated {} prices", count),
        RefreshOutcome::FeedUnavailable => eprintln!("Price feed unavailable, showing cached prices"),
    }
}
