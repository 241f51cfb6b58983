//! Fixed browse hierarchy: state → market → category → item.
//!
//! The table is compiled in and never changes at runtime. Lookups that miss
//! return `None` or an empty list; callers render that as "not found".

use crate::models::{CatalogItem, Category, Market, State};

static STATES: &[State] = &[
    State { id: "kh", name: "Khartoum", icon: "🏙️" },
    State { id: "rs", name: "Red Sea", icon: "🌊" },
    State { id: "rn", name: "River Nile", icon: "🏞️" },
];

static MARKETS: &[Market] = &[
    Market { id: "kh_central", name: "Khartoum Central", state_id: "kh" },
    Market { id: "kh_omdurman", name: "Omdurman Souk", state_id: "kh" },
    Market { id: "rs_port", name: "Port Sudan Market", state_id: "rs" },
    Market { id: "rn_atbara", name: "Atbara Market", state_id: "rn" },
];

static CATEGORIES: &[Category] = &[
    Category { id: "fruits", name: "Fruits", icon: "🍓" },
    Category { id: "meat", name: "Meat", icon: "🥩" },
    Category { id: "beverages", name: "Beverages", icon: "🥤" },
];

static ITEMS: &[CatalogItem] = &[
    CatalogItem {
        id: "oranges",
        name: "Oranges",
        category_id: "fruits",
        small_key: "oranges_s",
        large_key: "oranges_m",
    },
    CatalogItem {
        id: "apples",
        name: "Apples",
        category_id: "fruits",
        small_key: "apples_s",
        large_key: "apples_m",
    },
    CatalogItem {
        id: "grapes",
        name: "Grapes",
        category_id: "fruits",
        small_key: "grapes_s",
        large_key: "grapes_m",
    },
];

pub fn states() -> &'static [State] {
    STATES
}

pub fn state(id: &str) -> Option<&'static State> {
    STATES.iter().find(|s| s.id == id)
}

pub fn markets_for_state(state_id: &str) -> Vec<&'static Market> {
    MARKETS.iter().filter(|m| m.state_id == state_id).collect()
}

pub fn market(id: &str) -> Option<&'static Market> {
    MARKETS.iter().find(|m| m.id == id)
}

pub fn categories() -> &'static [Category] {
    CATEGORIES
}

pub fn category(id: &str) -> Option<&'static Category> {
    CATEGORIES.iter().find(|c| c.id == id)
}

pub fn items_for_category(category_id: &str) -> Vec<&'static CatalogItem> {
    ITEMS.iter().filter(|i| i.category_id == category_id).collect()
}

pub fn item(id: &str) -> Option<&'static CatalogItem> {
    ITEMS.iter().find(|i| i.id == id)
}
