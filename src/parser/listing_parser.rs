// Listing-page HTML parsing, driven by per-store CSS selectors.
use scraper::{Html, Selector};

use crate::config::StoreEntry;
use crate::model::{ParserError, RawPriceRecord};

pub struct ListingParser;

impl ListingParser {
    pub fn new() -> Self {
        Self
    }

    /// Extracts raw `{name, price, unit}` triples from a listing page.
    /// Elements missing a name or price node are skipped; validation of
    /// the extracted strings is the normalizer's job. An empty result is
    /// not an error here.
    pub fn parse(&self, html: &str, store: &StoreEntry) -> Result<Vec<RawPriceRecord>, ParserError> {
        let document = Html::parse_document(html);

        let item_selector = parse_selector(&store.item_selector)?;
        let name_selector = parse_selector(&store.name_selector)?;
        let price_selector = parse_selector(&store.price_selector)?;
        let unit_selector = store
            .unit_selector
            .as_deref()
            .map(parse_selector)
            .transpose()?;

        let mut records = Vec::new();
        for element in document.select(&item_selector) {
            let name_elem = element.select(&name_selector).next();
            let price_elem = element.select(&price_selector).next();

            if let (Some(name_node), Some(price_node)) = (name_elem, price_elem) {
                let name = name_node.text().collect::<String>().trim().to_string();
                let price = price_node.text().collect::<String>().trim().to_string();
                let unit = unit_selector
                    .as_ref()
                    .and_then(|sel| element.select(sel).next())
                    .map(|node| node.text().collect::<String>().trim().to_string())
                    .unwrap_or_default();

                records.push(RawPriceRecord { name, price, unit });
            }
        }

        Ok(records)
    }
}

fn parse_selector(selector: &str) -> Result<Selector, ParserError> {
    Selector::parse(selector).map_err(|e| ParserError::Selector(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_entry() -> StoreEntry {
        StoreEntry {
            id: "metro-market".to_string(),
            name: "Metro Market".to_string(),
            lat: None,
            long: None,
            opening_hours: String::new(),
            listing_url: "https://example.com/weekly-ad".to_string(),
            item_selector: "div.deal".to_string(),
            name_selector: "span.product".to_string(),
            price_selector: "span.price".to_string(),
            unit_selector: Some("span.unit".to_string()),
            enabled: true,
        }
    }

    const PAGE: &str = r#"
        <html><body>
          <div class="deal">
            <span class="product"> Whole Milk </span>
            <span class="price">$3.49</span>
            <span class="unit">gallon</span>
          </div>
          <div class="deal">
            <span class="product">Eggs</span>
            <span class="price">$2.97</span>
          </div>
          <div class="deal">
            <span class="product">No price here</span>
          </div>
        </body></html>
    "#;

    #[test]
    fn extracts_triples_and_skips_incomplete_elements() {
        let records = ListingParser::new()
            .parse(PAGE, &store_entry())
            .expect("page should parse");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "Whole Milk");
        assert_eq!(records[0].price, "$3.49");
        assert_eq!(records[0].unit, "gallon");
        assert_eq!(records[1].name, "Eggs");
        assert_eq!(records[1].unit, "");
    }

    #[test]
    fn missing_unit_selector_defaults_to_empty() {
        let mut entry = store_entry();
        entry.unit_selector = None;
        let records = ListingParser::new().parse(PAGE, &entry).expect("page should parse");
        assert!(records.iter().all(|r| r.unit.is_empty()));
    }

    #[test]
    fn bad_selector_is_reported() {
        let mut entry = store_entry();
        entry.item_selector = ":::not a selector".to_string();
        assert!(ListingParser::new().parse(PAGE, &entry).is_err());
    }

    #[test]
    fn empty_page_yields_no_records() {
        let records = ListingParser::new()
            .parse("<html><body></body></html>", &store_entry())
            .expect("page should parse");
        assert!(records.is_empty());
    }
}
