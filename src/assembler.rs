// Final plan projection. No search happens here.
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::model::{
    AlternativeDeal, AssignedItem, MatchedDeal, ShoppingItem, ShoppingPlan, StoreVisit,
    UnresolvedItem,
};
use crate::optimizer::Decision;

/// Projects the optimizer's decision onto the reporting schema. Every
/// shopping-list item lands exactly once: in a store visit, or in the
/// unresolved list with its best-known alternative.
pub fn assemble_plan(
    items: &[ShoppingItem],
    all_deals: &[MatchedDeal],
    decision: &Decision,
    generated_at: DateTime<Utc>,
) -> ShoppingPlan {
    let quantities: BTreeMap<&str, u32> =
        items.iter().map(|i| (i.id.as_str(), i.quantity)).collect();

    let mut per_store: BTreeMap<&str, Vec<&MatchedDeal>> = BTreeMap::new();
    for deal in &decision.assigned {
        per_store.entry(deal.store_id.as_str()).or_default().push(deal);
    }

    let mut visits = Vec::with_capacity(decision.visit_order.len());
    let mut total_cost = decision.travel_cost;
    let mut total_savings = Decimal::ZERO;

    for store_id in &decision.visit_order {
        let mut deals = per_store.remove(store_id.as_str()).unwrap_or_default();
        deals.sort_by(|a, b| a.item_id.cmp(&b.item_id));

        let mut assigned_items = Vec::with_capacity(deals.len());
        let mut subtotal = Decimal::ZERO;
        for deal in deals {
            let quantity = Decimal::from(quantities.get(deal.item_id.as_str()).copied().unwrap_or(1));
            subtotal += deal.price * quantity;
            total_savings += deal.savings * quantity;
            assigned_items.push(AssignedItem {
                item_id: deal.item_id.clone(),
                price: deal.price,
            });
        }

        total_cost += subtotal;
        visits.push(StoreVisit {
            store_id: store_id.clone(),
            assigned_items,
            subtotal,
        });
    }

    let assigned_ids: BTreeSet<&str> =
        decision.assigned.iter().map(|d| d.item_id.as_str()).collect();
    let unresolved_items = items
        .iter()
        .filter(|item| !assigned_ids.contains(item.id.as_str()))
        .map(|item| UnresolvedItem {
            item_id: item.id.clone(),
            best_alternative: best_alternative(all_deals, &item.id),
        })
        .collect();

    ShoppingPlan {
        visits,
        total_cost,
        total_savings,
        travel_cost: decision.travel_cost,
        travel_miles: decision.travel_miles,
        unresolved_items,
        partial_search: decision.partial_search,
        generated_at,
    }
}

/// Cheapest deal for the item across every store, chosen with the same
/// tie-break chain the matcher uses.
fn best_alternative(all_deals: &[MatchedDeal], item_id: &str) -> Option<AlternativeDeal> {
    let mut best: Option<&MatchedDeal> = None;
    for deal in all_deals.iter().filter(|d| d.item_id == item_id) {
        let replace = match best {
            None => true,
            Some(current) => match deal.price.cmp(&current.price) {
                Ordering::Less => true,
                Ordering::Greater => false,
                Ordering::Equal => match deal.match_confidence.total_cmp(&current.match_confidence)
                {
                    Ordering::Greater => true,
                    Ordering::Less => false,
                    Ordering::Equal => deal.store_id < current.store_id,
                },
            },
        };
        if replace {
            best = Some(deal);
        }
    }
    best.map(|deal| AlternativeDeal {
        store_id: deal.store_id.clone(),
        price: deal.price,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use crate::matcher::{Matcher, MatcherImpl};
    use crate::model::RawPriceRecord;
    use crate::normalizer::PriceCatalog;
    use crate::optimizer::route::DistanceMatrix;
    use crate::optimizer::{Optimizer, OptimizerConfig, OptimizerImpl, RunSnapshot};

    fn item(id: &str, target: &str) -> ShoppingItem {
        ShoppingItem {
            id: id.to_string(),
            canonical_name: id.to_string(),
            aliases: Vec::new(),
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

    async fn plan_for(
        items: Vec<ShoppingItem>,
        batches: &[(&str, Vec<RawPriceRecord>)],
        max_stores: usize,
    ) -> ShoppingPlan {
        let mut catalog = PriceCatalog::new();
        for (store_id, batch) in batches {
            catalog.ingest_store(store_id, batch, Utc::now());
        }
        let deals = MatcherImpl::new().match_deals(&items, &catalog, 0.6);
        let cfg = OptimizerConfig {
            max_stores,
            max_travel_budget: None,
            deals_only: false,
            no_travel: true,
            gas_price_per_gallon: 3.29,
            avg_mpg: 25.0,
        };
        let decision = OptimizerImpl::new()
            .optimize(
                Arc::new(RunSnapshot::new(items.clone(), &deals, DistanceMatrix::empty())),
                cfg,
                Instant::now() + Duration::from_secs(60),
            )
            .await;
        assemble_plan(&items, &deals, &decision, Utc::now())
    }

    #[tokio::test]
    async fn worked_example_totals() {
        let items = vec![item("milk", "3.50"), item("eggs", "4.00")];
        let plan = plan_for(
            items,
            &[
                ("store-a", vec![raw("milk", "3.00"), raw("eggs", "4.50")]),
                ("store-b", vec![raw("milk", "3.80"), raw("eggs", "3.90")]),
            ],
            2,
        )
        .await;

        assert_eq!(plan.total_cost, "6.90".parse().unwrap());
        assert_eq!(plan.total_savings, "0.60".parse().unwrap());
        assert_eq!(plan.travel_cost, Decimal::ZERO);
        assert_eq!(plan.visits.len(), 2);
        assert!(plan.unresolved_items.is_empty());

        // total_cost equals the sum of subtotals plus travel.
        let subtotal_sum: Decimal = plan.visits.iter().map(|v| v.subtotal).sum();
        assert_eq!(plan.total_cost, subtotal_sum + plan.travel_cost);
    }

    #[tokio::test]
    async fn missing_item_is_unresolved_with_no_alternative() {
        let items = vec![item("milk", "3.50"), item("eggs", "4.00")];
        let plan = plan_for(items, &[("store-a", vec![raw("milk", "3.00")])], 2).await;

        assert_eq!(plan.visits.len(), 1);
        assert_eq!(plan.unresolved_items.len(), 1);
        let unresolved = &plan.unresolved_items[0];
        assert_eq!(unresolved.item_id, "eggs");
        assert!(unresolved.best_alternative.is_none());
    }

    #[tokio::test]
    async fn every_item_is_accounted_for_exactly_once() {
        let items = vec![
            item("milk", "3.50"),
            item("eggs", "4.00"),
            item("saffron", "5.00"),
        ];
        let plan = plan_for(
            items.clone(),
            &[
                ("store-a", vec![raw("milk", "3.00")]),
                ("store-b", vec![raw("eggs", "3.90")]),
            ],
            2,
        )
        .await;

        let mut seen: Vec<String> = plan
            .visits
            .iter()
            .flat_map(|v| v.assigned_items.iter().map(|a| a.item_id.clone()))
            .chain(plan.unresolved_items.iter().map(|u| u.item_id.clone()))
            .collect();
        seen.sort();
        let mut expected: Vec<String> = items.iter().map(|i| i.id.clone()).collect();
        expected.sort();
        assert_eq!(seen, expected);
    }

    #[tokio::test]
    async fn unresolved_item_reports_cheapest_alternative() {
        // Both stores carry eggs above target; max_stores=1 forces milk-only
        // coverage through store-a, leaving eggs unresolved there.
        let items = vec![item("milk", "3.50"), item("eggs", "4.00")];
        let plan = plan_for(
            items,
            &[
                ("store-a", vec![raw("milk", "3.00")]),
                ("store-b", vec![raw("eggs", "4.25")]),
                ("store-c", vec![raw("eggs", "4.10")]),
            ],
            1,
        )
        .await;

        let unresolved: Vec<&UnresolvedItem> = plan
            .unresolved_items
            .iter()
            .filter(|u| u.item_id == "eggs")
            .collect();
        assert_eq!(unresolved.len(), 1);
        let alternative = unresolved[0].best_alternative.as_ref().expect("alternative");
        assert_eq!(alternative.store_id, "store-c");
        assert_eq!(alternative.price, "4.10".parse().unwrap());
    }

    #[tokio::test]
    async fn quantity_scales_subtotal_and_savings() {
        let mut pasta = item("pasta", "2.99");
        pasta.quantity = 2;
        let plan = plan_for(vec![pasta], &[("store-a", vec![raw("pasta", "0.98")])], 1).await;

        assert_eq!(plan.visits.len(), 1);
        assert_eq!(plan.visits[0].subtotal, "1.96".parse().unwrap());
        // 2 * (2.99 - 0.98)
        assert_eq!(plan.total_savings, "4.02".parse().unwrap());
        // the assigned entry still carries the unit price
        assert_eq!(plan.visits[0].assigned_items[0].price, "0.98".parse().unwrap());
    }

    #[tokio::test]
    async fn empty_decision_makes_everything_unresolved() {
        let items = vec![item("milk", "3.50")];
        let plan = plan_for(items, &[], 2).await;
        assert!(plan.visits.is_empty());
        assert_eq!(plan.total_cost, Decimal::ZERO);
        assert_eq!(plan.unresolved_items.len(), 1);
    }
}
