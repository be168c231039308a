use std::fs;
use std::path::Path;

use reqwest::Client;
use tracing::{info, warn};

use crate::config::StoreEntry;
use crate::model::{RawPriceRecord, ScraperError};
use crate::parser::ListingParser;
use crate::scraper::traits::Scraper;
use crate::utils::to_kebab_case;

pub struct HttpScraper {
    client: Client,
    parser: ListingParser,
}

impl HttpScraper {
    pub fn new() -> Self {
        let client = Client::builder()
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) DealcartBot/0.1")
            .build()
            .expect("failed to build http client");

        Self { client, parser: ListingParser::new() }
    }
}

#[async_trait::async_trait]
impl Scraper for HttpScraper {
    async fn fetch(&self, store: &StoreEntry) -> Result<Vec<RawPriceRecord>, ScraperError> {
        let response = self
            .client
            .get(&store.listing_url)
            .send()
            .await
            .map_err(|e| ScraperError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ScraperError::Http(format!("status {}", response.status())));
        }

        let html = response
            .text()
            .await
            .map_err(|e| ScraperError::Http(e.to_string()))?;

        match self.parser.parse(&html, store) {
            Ok(batch) => Ok(batch),
            Err(e) => {
                log_and_save_html(&html, &store.id);
                Err(ScraperError::InvalidResponse(e.to_string()))
            }
        }
    }
}

/// Saves the fetched HTML for debugging when parsing fails.
fn log_and_save_html(html: &str, store_id: &str) {
    let folder = Path::new("logs/html");
    if let Err(e) = fs::create_dir_all(folder) {
        warn!("Failed to create debug folder: {}", e);
        return;
    }
    let filename = folder.join(format!("debug-{}.html", to_kebab_case(store_id)));
    if let Err(e) = fs::write(&filename, html) {
        warn!("Failed to write debug HTML: {}", e);
    } else {
        info!("Saved debug HTML: {}", filename.display());
    }
}
