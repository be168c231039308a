use crate::config::StoreEntry;
use crate::model::{RawPriceRecord, ScraperError};

#[async_trait::async_trait]
pub trait Scraper: Send + Sync {
    /// Returns one store's raw price batch, or a fetch failure. Partial or
    /// zero results from any store must be tolerated by the caller.
    async fn fetch(&self, store: &StoreEntry) -> Result<Vec<RawPriceRecord>, ScraperError>;
}
