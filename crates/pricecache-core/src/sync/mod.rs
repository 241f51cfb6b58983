//! Reconciliation of the remote feed into the local cache.
//!
//! `PriceSync::refresh` fetches the whole table and replaces every fetched
//! key in the store. It runs once at startup and again whenever the user asks
//! for it; there is no timer.

pub mod service;

pub use service::{PriceSync, RefreshOutcome};
