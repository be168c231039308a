// Raw scrape batches -> canonical per-run price catalog
use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::model::{CanonicalPriceRecord, RawPriceRecord};

/// Immutable-after-ingestion snapshot of every store's validated records.
/// A store that contributed zero valid records is unavailable for the run.
#[derive(Debug, Default)]
pub struct PriceCatalog {
    records: BTreeMap<String, Vec<CanonicalPriceRecord>>,
    unavailable: BTreeSet<String>,
}

impl PriceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalizes one store's raw batch into the catalog. Invalid records
    /// are dropped with a warning; they never abort the run.
    pub fn ingest_store(
        &mut self,
        store_id: &str,
        batch: &[RawPriceRecord],
        observed_at: DateTime<Utc>,
    ) {
        let mut valid = Vec::new();
        let mut dropped = 0usize;

        for raw in batch {
            match normalize_record(store_id, raw, observed_at) {
                Some(record) => valid.push(record),
                None => dropped += 1,
            }
        }

        if dropped > 0 {
            warn!(
                "Store {}: dropped {} of {} raw records",
                store_id,
                dropped,
                batch.len()
            );
        }

        if valid.is_empty() {
            self.mark_unavailable(store_id);
            return;
        }

        valid.sort_by(|a, b| {
            (&a.matched_name, &a.unit, a.price).cmp(&(&b.matched_name, &b.unit, b.price))
        });
        info!("Store {}: {} canonical records", store_id, valid.len());
        self.records.insert(store_id.to_string(), valid);
    }

    pub fn mark_unavailable(&mut self, store_id: &str) {
        warn!("Store {} is unavailable for this run", store_id);
        self.unavailable.insert(store_id.to_string());
    }

    pub fn is_unavailable(&self, store_id: &str) -> bool {
        self.unavailable.contains(store_id)
    }

    pub fn records_for(&self, store_id: &str) -> &[CanonicalPriceRecord] {
        self.records.get(store_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Store ids that contributed at least one valid record, in id order.
    pub fn available_stores(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    pub fn all_records(&self) -> impl Iterator<Item = &CanonicalPriceRecord> {
        self.records.values().flatten()
    }

    pub fn total_records(&self) -> usize {
        self.records.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn normalize_record(
    store_id: &str,
    raw: &RawPriceRecord,
    observed_at: DateTime<Utc>,
) -> Option<CanonicalPriceRecord> {
    let matched_name = raw.name.trim().to_lowercase();
    if matched_name.is_empty() {
        warn!("Store {}: record with empty name dropped", store_id);
        return None;
    }

    let Some(price) = parse_price(&raw.price) else {
        warn!(
            "Store {}: unparsable price {:?} for {:?}",
            store_id, raw.price, matched_name
        );
        return None;
    };
    if price <= Decimal::ZERO {
        warn!(
            "Store {}: non-positive price {} for {:?}",
            store_id, price, matched_name
        );
        return None;
    }

    Some(CanonicalPriceRecord {
        store_id: store_id.to_string(),
        matched_name,
        price,
        unit: raw.unit.trim().to_lowercase(),
        observed_at,
    })
}

/// Parses a scraped price string ("$3.49", "3.49 / lb", "2 for $5" never
/// appears upstream) into exact cents. Currency symbols and thousands
/// separators are stripped.
pub fn parse_price(text: &str) -> Option<Decimal> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<Decimal>().ok().map(|d| d.round_dp(2))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(name: &str, price: &str) -> RawPriceRecord {
        RawPriceRecord {
            name: name.to_string(),
            price: price.to_string(),
            unit: "each".to_string(),
        }
    }

    #[test]
    fn parse_price_strips_currency_and_rounds() {
        assert_eq!(parse_price("$3.49"), Some("3.49".parse().unwrap()));
        assert_eq!(parse_price(" 12.999 "), Some("13.00".parse().unwrap()));
        assert_eq!(parse_price("1,299.50"), Some("1299.50".parse().unwrap()));
        assert_eq!(parse_price("free"), None);
        assert_eq!(parse_price(""), None);
    }

    #[test]
    fn names_are_lowercased_and_trimmed() {
        let mut catalog = PriceCatalog::new();
        catalog.ingest_store("a", &[raw("  Whole Milk  ", "3.29")], Utc::now());
        let records = catalog.records_for("a");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].matched_name, "whole milk");
    }

    #[test]
    fn invalid_prices_are_dropped_not_fatal() {
        let mut catalog = PriceCatalog::new();
        catalog.ingest_store(
            "a",
            &[raw("milk", "3.29"), raw("eggs", "n/a"), raw("bread", "-1.00"), raw("soup", "0")],
            Utc::now(),
        );
        assert_eq!(catalog.records_for("a").len(), 1);
        assert!(!catalog.is_unavailable("a"));
    }

    #[test]
    fn store_with_zero_valid_records_is_unavailable() {
        let mut catalog = PriceCatalog::new();
        catalog.ingest_store("a", &[raw("milk", "nope")], Utc::now());
        assert!(catalog.is_unavailable("a"));
        assert!(catalog.records_for("a").is_empty());
        assert_eq!(catalog.available_stores().count(), 0);
    }

    #[test]
    fn empty_batch_marks_store_unavailable() {
        let mut catalog = PriceCatalog::new();
        catalog.ingest_store("a", &[], Utc::now());
        assert!(catalog.is_unavailable("a"));
    }

    #[test]
    fn available_stores_iterate_in_id_order() {
        let mut catalog = PriceCatalog::new();
        catalog.ingest_store("zeta", &[raw("milk", "3.00")], Utc::now());
        catalog.ingest_store("alpha", &[raw("milk", "3.10")], Utc::now());
        let ids: Vec<&str> = catalog.available_stores().collect();
        assert_eq!(ids, vec!["alpha", "zeta"]);
        assert_eq!(catalog.total_records(), 2);
    }
}
