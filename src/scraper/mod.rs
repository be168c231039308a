// Scraper module: per-store listing fetch plus concurrent ingestion.

pub mod fetcher;
pub mod traits;

pub use fetcher::HttpScraper;
pub use traits::Scraper;

use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use tokio::time::timeout;
use tracing::warn;

use crate::config::StoreEntry;
use crate::model::ScraperError;
use crate::normalizer::PriceCatalog;

/// Fetches every enabled store concurrently and folds the batches into a
/// fresh catalog. A fetch error or timeout marks that one store
/// unavailable; it never aborts the run.
pub async fn ingest_all(
    scraper: &dyn Scraper,
    stores: &[&StoreEntry],
    fetch_timeout: Duration,
) -> PriceCatalog {
    let tasks = stores.iter().map(|store| async move {
        let outcome = match timeout(fetch_timeout, scraper.fetch(store)).await {
            Ok(Ok(batch)) => Ok(batch),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(ScraperError::Timeout),
        };
        (store.id.clone(), outcome)
    });

    let mut catalog = PriceCatalog::new();
    for (store_id, outcome) in join_all(tasks).await {
        match outcome {
            Ok(batch) => catalog.ingest_store(&store_id, &batch, Utc::now()),
            Err(e) => {
                warn!("Store {} fetch failed: {}", store_id, e);
                catalog.mark_unavailable(&store_id);
            }
        }
    }
    catalog
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::model::RawPriceRecord;

    struct FakeScraper;

    fn entry(id: &str, url: &str) -> StoreEntry {
        StoreEntry {
            id: id.to_string(),
            name: id.to_string(),
            lat: None,
            long: None,
            opening_hours: String::new(),
            listing_url: url.to_string(),
            item_selector: "div.item".to_string(),
            name_selector: "span.name".to_string(),
            price_selector: "span.price".to_string(),
            unit_selector: None,
            enabled: true,
        }
    }

    #[async_trait::async_trait]
    impl Scraper for FakeScraper {
        async fn fetch(&self, store: &StoreEntry) -> Result<Vec<RawPriceRecord>, ScraperError> {
            match store.id.as_str() {
                "ok" => Ok(vec![RawPriceRecord {
                    name: "Milk".to_string(),
                    price: "$3.49".to_string(),
                    unit: "gallon".to_string(),
                }]),
                "slow" => {
                    tokio::time::sleep(Duration::from_millis(500)).await;
                    Ok(Vec::new())
                }
                _ => Err(ScraperError::Http("boom".to_string())),
            }
        }
    }

    #[tokio::test]
    async fn partial_failures_only_mark_stores_unavailable() {
        let ok = entry("ok", "https://example.com/a");
        let slow = entry("slow", "https://example.com/b");
        let broken = entry("broken", "https://example.com/c");
        let stores = vec![&ok, &slow, &broken];

        let catalog = ingest_all(&FakeScraper, &stores, Duration::from_millis(50)).await;

        assert_eq!(catalog.records_for("ok").len(), 1);
        assert_eq!(catalog.records_for("ok")[0].matched_name, "milk");
        assert!(catalog.is_unavailable("slow"), "timeout should mark unavailable");
        assert!(catalog.is_unavailable("broken"));
        assert_eq!(catalog.available_stores().count(), 1);
    }

    #[tokio::test]
    async fn all_stores_failing_leaves_an_empty_catalog() {
        let broken = entry("broken", "https://example.com/c");
        let stores = vec![&broken];
        let catalog = ingest_all(&FakeScraper, &stores, Duration::from_millis(50)).await;
        assert!(catalog.is_empty());
    }
}
