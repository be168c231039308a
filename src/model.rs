// Core structs: shopping list, catalog, deals, plan
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct ShoppingItem {
    pub id: String,
    pub canonical_name: String,
    pub aliases: Vec<String>,
    pub target_price: Decimal,
    pub quantity: u32,
    pub category: String,
}

#[derive(Debug, Clone)]
pub struct Store {
    pub id: String,
    pub name: String,
    /// (lat, long); stores without coordinates stay out of route computation.
    pub location: Option<(f64, f64)>,
    pub opening_hours: String,
}

/// Raw triple as delivered by a store scraper, before any validation.
#[derive(Debug, Clone)]
pub struct RawPriceRecord {
    pub name: String,
    pub price: String,
    pub unit: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CanonicalPriceRecord {
    pub store_id: String,
    pub matched_name: String,
    pub price: Decimal,
    pub unit: String,
    pub observed_at: DateTime<Utc>,
}

/// Candidate assignment of one shopping-list item to one store.
/// At most one exists per (item, store) pair.
#[derive(Debug, Clone)]
pub struct MatchedDeal {
    pub item_id: String,
    pub store_id: String,
    pub matched_name: String,
    pub price: Decimal,
    /// target_price - price; negative when the store is above target.
    pub savings: Decimal,
    pub match_confidence: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssignedItem {
    pub item_id: String,
    pub price: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoreVisit {
    pub store_id: String,
    pub assigned_items: Vec<AssignedItem>,
    pub subtotal: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlternativeDeal {
    pub store_id: String,
    pub price: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnresolvedItem {
    pub item_id: String,
    /// Cheapest known deal across all stores, for transparency.
    pub best_alternative: Option<AlternativeDeal>,
}

/// Sole output of an optimization run. Immutable once assembled.
#[derive(Debug, Clone, Serialize)]
pub struct ShoppingPlan {
    pub visits: Vec<StoreVisit>,
    pub total_cost: Decimal,
    pub total_savings: Decimal,
    pub travel_cost: Decimal,
    pub travel_miles: f64,
    pub unresolved_items: Vec<UnresolvedItem>,
    pub partial_search: bool,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("http error: {0}")]
    Http(String),
    #[error("fetch timed out")]
    Timeout,
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Error)]
pub enum ParserError {
    #[error("bad selector: {0}")]
    Selector(String),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(String),
}

impl From<rusqlite::Error> for StorageError {
    fn from(e: rusqlite::Error) -> Self {
        StorageError::Database(e.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config read error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum ListError {
    #[error("shopping list read error: {0}")]
    Io(#[from] std::io::Error),
}
