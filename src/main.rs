mod assembler;
mod config;
mod matcher;
mod model;
mod normalizer;
mod optimizer;
mod parser;
mod report;
mod scraper;
mod shopping_list;
mod storage;
mod utils;

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, error, info, warn};

use crate::assembler::assemble_plan;
use crate::config::{StoreEntry, load_config};
use crate::matcher::{Matcher, MatcherImpl};
use crate::optimizer::route::DistanceMatrix;
use crate::optimizer::{Optimizer, OptimizerConfig, OptimizerImpl, RunSnapshot};
use crate::report::write_reports;
use crate::scraper::{HttpScraper, ingest_all};
use crate::shopping_list::load_shopping_list;
use crate::storage::PlanStore;

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt::init();

    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Panic occurred: {panic_info:?}");
    }));

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.json".to_string());
    let config = match load_config(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Config load error: {}", e);
            return;
        }
    };

    let items = match load_shopping_list(&config.shopping_list_path) {
        Ok(items) => items,
        Err(e) => {
            error!("Shopping list load error: {}", e);
            return;
        }
    };
    if items.is_empty() {
        warn!("Shopping list has no usable rows; nothing to plan");
        return;
    }

    let store = match PlanStore::new(&config.db_path) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to initialize storage: {}", e);
            return;
        }
    };

    if let Ok(Some(prev)) = store.last_run() {
        info!(
            "Previous run ({}): total ${}, saved ${}, {} unresolved",
            prev.generated_at, prev.total_cost, prev.total_savings, prev.unresolved_count
        );
    }

    // Stores without coordinates cannot be routed to; they only take part
    // in no-travel runs.
    let entries: Vec<&StoreEntry> = config
        .enabled_stores()
        .into_iter()
        .filter(|entry| {
            let routable = entry.lat.is_some() && entry.long.is_some();
            if !config.no_travel && !routable {
                warn!("Store {} has no coordinates; excluded from this run", entry.id);
            }
            config.no_travel || routable
        })
        .collect();

    info!("Fetching listings from {} stores...", entries.len());
    let scraper = HttpScraper::new();
    let catalog = ingest_all(
        &scraper,
        &entries,
        Duration::from_secs(config.fetch_timeout_seconds),
    )
    .await;

    if catalog.is_empty() {
        warn!("No store produced usable records; the plan will be empty");
    } else {
        info!(
            "Catalog ready: {} records from {} stores",
            catalog.total_records(),
            catalog.available_stores().count()
        );
    }

    if let Err(e) = store.save_snapshot(&catalog) {
        warn!("Snapshot save failed: {}", e);
    }

    info!("Matching shopping list against the catalog...");
    let deals = MatcherImpl::new().match_deals(&items, &catalog, config.match_confidence_threshold);
    info!("Matched {} candidate deals", deals.len());
    for deal in &deals {
        debug!(
            "{} at {}: {:?} for ${} (confidence {:.2})",
            deal.item_id, deal.store_id, deal.matched_name, deal.price, deal.match_confidence
        );
    }

    let stores = config.store_models();
    let matrix = if config.no_travel {
        DistanceMatrix::empty()
    } else {
        DistanceMatrix::build((config.home.lat, config.home.long), &stores)
    };

    let optimizer_cfg = OptimizerConfig {
        max_stores: config.max_stores as usize,
        max_travel_budget: config
            .max_travel_budget
            .and_then(Decimal::from_f64_retain)
            .map(|d| d.round_dp(2)),
        deals_only: config.deals_only,
        no_travel: config.no_travel,
        gas_price_per_gallon: config.gas_price_per_gallon,
        avg_mpg: config.avg_mpg,
    };

    info!("Optimizing store subset and route...");
    let snapshot = Arc::new(RunSnapshot::new(items.clone(), &deals, matrix));
    let deadline = Instant::now() + Duration::from_secs(config.optimize_timeout_seconds);
    let decision = OptimizerImpl::new()
        .optimize(snapshot, optimizer_cfg, deadline)
        .await;
    info!(
        "Optimizer chose {} stores: goods ${}, total ${}",
        decision.visit_order.len(),
        decision.goods_cost,
        decision.total_cost
    );

    let plan = assemble_plan(&items, &deals, &decision, Utc::now());
    info!(
        "Plan: {} stops, total ${}, savings ${}, travel ${} ({:.1} mi), {} unresolved",
        plan.visits.len(),
        plan.total_cost,
        plan.total_savings,
        plan.travel_cost,
        plan.travel_miles,
        plan.unresolved_items.len()
    );
    if plan.partial_search {
        warn!("Optimization deadline hit; plan reflects a partial search");
    }

    if let Err(e) = store.save_plan(&plan) {
        warn!("Plan save failed: {}", e);
    }

    match write_reports(&config.output_dir, &plan, &stores, &items) {
        Ok((report_path, _)) => info!("Done. Report at {}", report_path.display()),
        Err(e) => warn!("Report write failed: {}", e),
    }
}
