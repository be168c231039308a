use std::cmp::Ordering;

use crate::matcher::similarity::similarity;
use crate::model::{CanonicalPriceRecord, MatchedDeal, ShoppingItem};
use crate::normalizer::PriceCatalog;

/// Trait defining the interface for a shopping-list matcher.
pub trait Matcher {
    /// Produces at most one deal per (item, store) pair. Candidates below
    /// the confidence threshold are discarded.
    fn match_deals(
        &self,
        items: &[ShoppingItem],
        catalog: &PriceCatalog,
        threshold: f64,
    ) -> Vec<MatchedDeal>;
}

pub struct MatcherImpl;

impl MatcherImpl {
    pub fn new() -> Self {
        Self
    }
}

impl Matcher for MatcherImpl {
    fn match_deals(
        &self,
        items: &[ShoppingItem],
        catalog: &PriceCatalog,
        threshold: f64,
    ) -> Vec<MatchedDeal> {
        let mut deals = Vec::new();

        for item in items {
            for store_id in catalog.available_stores() {
                let mut best: Option<(&CanonicalPriceRecord, f64)> = None;

                for record in catalog.records_for(store_id) {
                    let score = item_score(item, record);
                    if score < threshold {
                        continue;
                    }
                    let replace = match &best {
                        None => true,
                        Some((current, current_score)) => {
                            prefer_candidate(record, score, current, *current_score)
                        }
                    };
                    if replace {
                        best = Some((record, score));
                    }
                }

                if let Some((record, score)) = best {
                    deals.push(MatchedDeal {
                        item_id: item.id.clone(),
                        store_id: store_id.to_string(),
                        matched_name: record.matched_name.clone(),
                        price: record.price,
                        savings: item.target_price - record.price,
                        match_confidence: score,
                    });
                }
            }
        }

        deals
    }
}

/// Best score across the item's canonical name and all aliases.
fn item_score(item: &ShoppingItem, record: &CanonicalPriceRecord) -> f64 {
    let mut score = similarity(&item.canonical_name, &record.matched_name);
    for alias in &item.aliases {
        score = score.max(similarity(alias, &record.matched_name));
    }
    score
}

/// Candidate order within one (item, store) pair: lowest price wins,
/// ties go to higher confidence, then the lexicographically smallest
/// record identity (name, then unit).
fn prefer_candidate(
    candidate: &CanonicalPriceRecord,
    candidate_score: f64,
    current: &CanonicalPriceRecord,
    current_score: f64,
) -> bool {
    match candidate.price.cmp(&current.price) {
        Ordering::Less => true,
        Ordering::Greater => false,
        Ordering::Equal => match candidate_score.total_cmp(&current_score) {
            Ordering::Greater => true,
            Ordering::Less => false,
            Ordering::Equal => {
                (&candidate.matched_name, &candidate.unit) < (&current.matched_name, &current.unit)
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;

    use crate::model::RawPriceRecord;

    fn item(id: &str, name: &str, target: &str, aliases: &[&str]) -> ShoppingItem {
        ShoppingItem {
            id: id.to_string(),
            canonical_name: name.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            target_price: target.parse().unwrap(),
            quantity: 1,
            category: String::new(),
        }
    }

    fn raw(name: &str, price: &str) -> RawPriceRecord {
        RawPriceRecord {
            name: name.to_string(),
            price: price.to_string(),
            unit: "each".to_string(),
        }
    }

    fn catalog_of(batches: &[(&str, Vec<RawPriceRecord>)]) -> PriceCatalog {
        let mut catalog = PriceCatalog::new();
        for (store_id, batch) in batches {
            catalog.ingest_store(store_id, batch, Utc::now());
        }
        catalog
    }

    #[test]
    fn matches_one_deal_per_item_store_pair() {
        let catalog = catalog_of(&[
            ("store-a", vec![raw("whole milk", "3.00"), raw("eggs", "4.50")]),
            ("store-b", vec![raw("milk", "3.80")]),
        ]);
        let items = vec![item("milk", "milk", "3.50", &["whole milk"])];

        let deals = MatcherImpl::new().match_deals(&items, &catalog, 0.6);
        assert_eq!(deals.len(), 2);
        assert!(deals.iter().all(|d| d.item_id == "milk"));
        let stores: Vec<&str> = deals.iter().map(|d| d.store_id.as_str()).collect();
        assert_eq!(stores, vec!["store-a", "store-b"]);
    }

    #[test]
    fn lowest_price_wins_within_a_store() {
        let catalog = catalog_of(&[(
            "store-a",
            vec![raw("milk", "3.80"), raw("whole milk", "3.20")],
        )]);
        let items = vec![item("milk", "milk", "3.50", &["whole milk"])];

        let deals = MatcherImpl::new().match_deals(&items, &catalog, 0.6);
        assert_eq!(deals.len(), 1);
        assert_eq!(deals[0].price, Decimal::new(320, 2));
        assert_eq!(deals[0].matched_name, "whole milk");
    }

    #[test]
    fn price_tie_breaks_on_confidence_then_name() {
        let catalog = catalog_of(&[(
            "store-a",
            vec![raw("milk", "3.00"), raw("milk chocolate", "3.00")],
        )]);
        let items = vec![item("milk", "milk", "3.50", &[])];

        let deals = MatcherImpl::new().match_deals(&items, &catalog, 0.4);
        assert_eq!(deals.len(), 1);
        // exact match beats the partial one at equal price
        assert_eq!(deals[0].matched_name, "milk");
        assert_eq!(deals[0].match_confidence, 1.0);
    }

    #[test]
    fn candidates_below_threshold_are_discarded() {
        let catalog = catalog_of(&[("store-a", vec![raw("charcoal", "3.00")])]);
        let items = vec![item("milk", "milk", "3.50", &[])];

        let deals = MatcherImpl::new().match_deals(&items, &catalog, 0.6);
        assert!(deals.is_empty());
    }

    #[test]
    fn negative_savings_are_kept_for_the_optimizer() {
        let catalog = catalog_of(&[("store-a", vec![raw("milk", "4.25")])]);
        let items = vec![item("milk", "milk", "3.50", &[])];

        let deals = MatcherImpl::new().match_deals(&items, &catalog, 0.6);
        assert_eq!(deals.len(), 1);
        assert_eq!(deals[0].savings, "-0.75".parse().unwrap());
    }

    #[test]
    fn aliases_participate_in_matching() {
        let catalog = catalog_of(&[("store-a", vec![raw("large eggs", "2.97")])]);
        // canonical name alone scores 0.5 against "large eggs"; the alias
        // is what pushes the pair over the threshold.
        let items = vec![item("eggs", "eggs", "3.99", &["large eggs"])];

        let deals = MatcherImpl::new().match_deals(&items, &catalog, 0.6);
        assert_eq!(deals.len(), 1);
        assert_eq!(deals[0].savings, "1.02".parse().unwrap());
        assert_eq!(deals[0].match_confidence, 1.0);
    }

    #[test]
    fn unavailable_stores_contribute_nothing() {
        let mut catalog = catalog_of(&[("store-a", vec![raw("milk", "3.00")])]);
        catalog.ingest_store("store-b", &[], Utc::now());
        let items = vec![item("milk", "milk", "3.50", &[])];

        let deals = MatcherImpl::new().match_deals(&items, &catalog, 0.6);
        assert_eq!(deals.len(), 1);
        assert_eq!(deals[0].store_id, "store-a");
    }
}
