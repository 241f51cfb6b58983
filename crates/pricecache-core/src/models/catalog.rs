use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct State {
    pub id: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Market {
    pub id: &'static str,
    pub name: &'static str,
    pub state_id: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Category {
    pub id: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
}

/// An item that can be priced. Each item carries two feed keys: one for the
/// single-item price and one for the large-quantity price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct CatalogItem {
    pub id: &'static str,
    pub name: &'static str,
    pub category_id: &'static str,
    pub small_key: &'static str,
    pub large_key: &'static str,
}
