// Store subset enumeration and evaluation.
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::model::{MatchedDeal, ShoppingItem};
use crate::optimizer::route::{DistanceMatrix, best_route, travel_money};

/// Knobs the optimizer runs under, narrowed from the app config.
#[derive(Debug, Clone)]
pub struct OptimizerConfig {
    pub max_stores: usize,
    /// Money units, already converted from the configured travel budget.
    pub max_travel_budget: Option<Decimal>,
    pub deals_only: bool,
    pub no_travel: bool,
    pub gas_price_per_gallon: f64,
    pub avg_mpg: f64,
}

/// Read-only view of one run: shopping list, matched deals and distances.
/// Shared untouched across subset-evaluation workers.
#[derive(Debug)]
pub struct RunSnapshot {
    pub items: Vec<ShoppingItem>,
    pub matrix: DistanceMatrix,
    deal_index: BTreeMap<String, BTreeMap<String, MatchedDeal>>,
    stores_with_deals: Vec<String>,
    /// Items with at least one at-or-under-target deal anywhere.
    dealable_items: BTreeSet<String>,
    quantities: BTreeMap<String, u32>,
}

impl RunSnapshot {
    pub fn new(items: Vec<ShoppingItem>, deals: &[MatchedDeal], matrix: DistanceMatrix) -> Self {
        let mut deal_index: BTreeMap<String, BTreeMap<String, MatchedDeal>> = BTreeMap::new();
        let mut store_ids = BTreeSet::new();
        let mut dealable_items = BTreeSet::new();

        for deal in deals {
            store_ids.insert(deal.store_id.clone());
            if deal.savings >= Decimal::ZERO {
                dealable_items.insert(deal.item_id.clone());
            }
            deal_index
                .entry(deal.item_id.clone())
                .or_default()
                .insert(deal.store_id.clone(), deal.clone());
        }

        let quantities = items
            .iter()
            .map(|i| (i.id.clone(), i.quantity))
            .collect();

        Self {
            items,
            matrix,
            deal_index,
            stores_with_deals: store_ids.into_iter().collect(),
            dealable_items,
            quantities,
        }
    }

    fn deal_for(&self, item_id: &str, store_id: &str) -> Option<&MatchedDeal> {
        self.deal_index.get(item_id).and_then(|per_store| per_store.get(store_id))
    }

    fn quantity_of(&self, item_id: &str) -> u32 {
        self.quantities.get(item_id).copied().unwrap_or(1)
    }
}

/// The optimizer's choice for one run, before plan assembly.
#[derive(Debug, Clone)]
pub struct Decision {
    pub visit_order: Vec<String>,
    pub assigned: Vec<MatchedDeal>,
    pub goods_cost: Decimal,
    pub travel_miles: f64,
    pub travel_cost: Decimal,
    pub total_cost: Decimal,
    pub partial_search: bool,
}

impl Decision {
    pub fn empty(partial_search: bool) -> Self {
        Self {
            visit_order: Vec::new(),
            assigned: Vec::new(),
            goods_cost: Decimal::ZERO,
            travel_miles: 0.0,
            travel_cost: Decimal::ZERO,
            total_cost: Decimal::ZERO,
            partial_search,
        }
    }
}

#[derive(Debug, Clone)]
struct Candidate {
    sorted_stores: Vec<String>,
    order: Vec<String>,
    assigned: Vec<MatchedDeal>,
    goods_cost: Decimal,
    travel_miles: f64,
    travel_cost: Decimal,
    total_cost: Decimal,
}

/// Trait defining the interface for a plan optimizer.
#[async_trait::async_trait]
pub trait Optimizer: Send + Sync {
    async fn optimize(
        &self,
        snapshot: Arc<RunSnapshot>,
        cfg: OptimizerConfig,
        deadline: Instant,
    ) -> Decision;
}

pub struct OptimizerImpl {
    workers: usize,
}

impl OptimizerImpl {
    pub fn new() -> Self {
        Self { workers: 8 }
    }
}

#[async_trait::async_trait]
impl Optimizer for OptimizerImpl {
    /// Evaluates every store subset of size 1..=max_stores across worker
    /// tasks over disjoint chunks. The deterministic comparator makes the
    /// merge independent of task scheduling. Past the deadline, workers
    /// stop and the best candidate found so far is returned flagged as a
    /// partial search.
    async fn optimize(
        &self,
        snapshot: Arc<RunSnapshot>,
        cfg: OptimizerConfig,
        deadline: Instant,
    ) -> Decision {
        if snapshot.stores_with_deals.is_empty() {
            info!("No store holds a matched deal; returning empty plan");
            return Decision::empty(false);
        }

        let max_k = cfg.max_stores.min(snapshot.stores_with_deals.len());
        let subsets = enumerate_subsets(&snapshot.stores_with_deals, max_k);
        info!(
            "Evaluating {} candidate subsets over {} stores (max size {})",
            subsets.len(),
            snapshot.stores_with_deals.len(),
            max_k
        );

        let chunk_size = subsets.len().div_ceil(self.workers).max(1);
        let tasks: Vec<_> = subsets
            .chunks(chunk_size)
            .map(|chunk| {
                let chunk = chunk.to_vec();
                let snapshot = snapshot.clone();
                let cfg = cfg.clone();
                tokio::spawn(async move { evaluate_chunk(&snapshot, &cfg, &chunk, deadline) })
            })
            .collect();

        let mut best: Option<Candidate> = None;
        let mut partial = false;
        for joined in join_all(tasks).await {
            match joined {
                Ok((candidate, chunk_partial)) => {
                    partial |= chunk_partial;
                    best = merge_best(best, candidate);
                }
                Err(e) => {
                    warn!("Subset evaluation task failed: {e}");
                    partial = true;
                }
            }
        }

        match best {
            Some(c) => Decision {
                visit_order: c.order,
                assigned: c.assigned,
                goods_cost: c.goods_cost,
                travel_miles: c.travel_miles,
                travel_cost: c.travel_cost,
                total_cost: c.total_cost,
                partial_search: partial,
            },
            None => Decision::empty(partial),
        }
    }
}

fn evaluate_chunk(
    snapshot: &RunSnapshot,
    cfg: &OptimizerConfig,
    subsets: &[Vec<String>],
    deadline: Instant,
) -> (Option<Candidate>, bool) {
    let mut best: Option<Candidate> = None;
    for subset in subsets {
        if Instant::now() >= deadline {
            return (best, true);
        }
        best = merge_best(best, evaluate_subset(snapshot, cfg, subset));
    }
    (best, false)
}

fn merge_best(best: Option<Candidate>, candidate: Option<Candidate>) -> Option<Candidate> {
    match (best, candidate) {
        (None, c) => c,
        (b, None) => b,
        (Some(b), Some(c)) => {
            if better_candidate(&c, &b) {
                Some(c)
            } else {
                Some(b)
            }
        }
    }
}

/// Subset order: lower total cost, then fewer stores, then lower travel
/// cost, then the lexicographically smallest sorted store-id list.
fn better_candidate(a: &Candidate, b: &Candidate) -> bool {
    match a.total_cost.cmp(&b.total_cost) {
        Ordering::Less => return true,
        Ordering::Greater => return false,
        Ordering::Equal => {}
    }
    match a.sorted_stores.len().cmp(&b.sorted_stores.len()) {
        Ordering::Less => return true,
        Ordering::Greater => return false,
        Ordering::Equal => {}
    }
    match a.travel_cost.cmp(&b.travel_cost) {
        Ordering::Less => return true,
        Ordering::Greater => return false,
        Ordering::Equal => {}
    }
    a.sorted_stores < b.sorted_stores
}

fn evaluate_subset(
    snapshot: &RunSnapshot,
    cfg: &OptimizerConfig,
    subset: &[String],
) -> Option<Candidate> {
    let mut assigned = Vec::new();
    for item in &snapshot.items {
        let mut best: Option<&MatchedDeal> = None;
        for store_id in subset {
            let Some(deal) = snapshot.deal_for(&item.id, store_id) else {
                continue;
            };
            let replace = match best {
                None => true,
                Some(current) => better_deal(deal, current),
            };
            if replace {
                best = Some(deal);
            }
        }
        if let Some(deal) = best {
            assigned.push(deal.clone());
        }
    }

    if assigned.is_empty() {
        return None;
    }

    if cfg.deals_only {
        let any_savings = assigned.iter().any(|d| d.savings >= Decimal::ZERO);
        let covers_undealt = assigned
            .iter()
            .any(|d| !snapshot.dealable_items.contains(&d.item_id));
        if !any_savings && !covers_undealt {
            return None;
        }
    }

    let goods_cost: Decimal = assigned
        .iter()
        .map(|d| d.price * Decimal::from(snapshot.quantity_of(&d.item_id)))
        .sum();

    let (order, travel_miles) = if cfg.no_travel {
        let mut order = subset.to_vec();
        order.sort();
        (order, 0.0)
    } else {
        let route = best_route(&snapshot.matrix, subset);
        (route.order, route.miles)
    };

    let travel_cost = travel_money(travel_miles, cfg.gas_price_per_gallon, cfg.avg_mpg);
    if let Some(budget) = cfg.max_travel_budget {
        if travel_cost > budget {
            return None;
        }
    }

    let mut sorted_stores = subset.to_vec();
    sorted_stores.sort();

    Some(Candidate {
        total_cost: goods_cost + travel_cost,
        sorted_stores,
        order,
        assigned,
        goods_cost,
        travel_miles,
        travel_cost,
    })
}

/// Item assignment within a subset: lowest price, ties to higher
/// confidence, then the lexicographically smallest store id.
fn better_deal(candidate: &MatchedDeal, current: &MatchedDeal) -> bool {
    match candidate.price.cmp(&current.price) {
        Ordering::Less => return true,
        Ordering::Greater => return false,
        Ordering::Equal => {}
    }
    match candidate.match_confidence.total_cmp(&current.match_confidence) {
        Ordering::Greater => return true,
        Ordering::Less => return false,
        Ordering::Equal => {}
    }
    candidate.store_id < current.store_id
}

/// All subsets of size 1..=max_k, in lexicographic order.
fn enumerate_subsets(store_ids: &[String], max_k: usize) -> Vec<Vec<String>> {
    let mut out = Vec::new();
    for k in 1..=max_k {
        let mut current = Vec::with_capacity(k);
        combinations(store_ids, k, 0, &mut current, &mut out);
    }
    out
}

fn combinations(
    store_ids: &[String],
    k: usize,
    start: usize,
    current: &mut Vec<String>,
    out: &mut Vec<Vec<String>>,
) {
    if current.len() == k {
        out.push(current.clone());
        return;
    }
    for idx in start..store_ids.len() {
        current.push(store_ids[idx].clone());
        combinations(store_ids, k, idx + 1, current, out);
        current.pop();
    }
}
