// Report rendering: markdown for humans, JSON for sync jobs.
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::model::{ShoppingItem, ShoppingPlan, Store};

/// Renders the plan as a markdown trip report.
pub fn render_markdown(plan: &ShoppingPlan, stores: &[Store], items: &[ShoppingItem]) -> String {
    let store_names: BTreeMap<&str, &Store> =
        stores.iter().map(|s| (s.id.as_str(), s)).collect();
    let item_names: BTreeMap<&str, &ShoppingItem> =
        items.iter().map(|i| (i.id.as_str(), i)).collect();

    let mut report = String::new();
    report.push_str("# 🛒 Shopping Plan\n\n");
    report.push_str(&format!(
        "**Generated**: {}\n\n",
        plan.generated_at.format("%Y-%m-%d %H:%M UTC")
    ));
    if plan.partial_search {
        report.push_str("> ⚠️ Optimization hit its time limit; this is the best plan found so far.\n\n");
    }

    if plan.visits.is_empty() {
        report.push_str("No store visits planned: no usable deals this run.\n\n");
    } else {
        report.push_str("## 📍 Route\n\n");
        report.push_str("1. Start from home\n");
        for (i, visit) in plan.visits.iter().enumerate() {
            let name = store_names
                .get(visit.store_id.as_str())
                .map(|s| s.name.as_str())
                .unwrap_or(visit.store_id.as_str());
            report.push_str(&format!("{}. Drive to {}\n", i + 2, name));
        }
        report.push_str(&format!("{}. Return home\n\n", plan.visits.len() + 2));

        for (i, visit) in plan.visits.iter().enumerate() {
            let store = store_names.get(visit.store_id.as_str());
            let name = store.map(|s| s.name.as_str()).unwrap_or(visit.store_id.as_str());
            report.push_str(&format!("### Stop {}: {}\n", i + 1, name));
            if let Some(store) = store {
                if !store.opening_hours.is_empty() {
                    report.push_str(&format!("- **Hours**: {}\n", store.opening_hours));
                }
            }
            report.push_str("- **Shopping list**:\n");
            for assigned in &visit.assigned_items {
                let label = item_names
                    .get(assigned.item_id.as_str())
                    .map(|i| i.canonical_name.as_str())
                    .unwrap_or(assigned.item_id.as_str());
                match item_names.get(assigned.item_id.as_str()) {
                    Some(item) => {
                        let savings = item.target_price - assigned.price;
                        report.push_str(&format!(
                            "  - {} x{}: ${} (save ${})\n",
                            label, item.quantity, assigned.price, savings
                        ));
                    }
                    None => {
                        report.push_str(&format!("  - {}: ${}\n", label, assigned.price));
                    }
                }
            }
            report.push_str(&format!("- **Subtotal**: ${}\n\n", visit.subtotal));
        }
    }

    if !plan.unresolved_items.is_empty() {
        report.push_str("## ❓ Unresolved Items\n\n");
        for unresolved in &plan.unresolved_items {
            let label = match item_names.get(unresolved.item_id.as_str()) {
                Some(item) if !item.category.is_empty() => {
                    format!("{} ({})", item.canonical_name, item.category)
                }
                Some(item) => item.canonical_name.clone(),
                None => unresolved.item_id.clone(),
            };
            match &unresolved.best_alternative {
                Some(alt) => {
                    let store = store_names
                        .get(alt.store_id.as_str())
                        .map(|s| s.name.as_str())
                        .unwrap_or(alt.store_id.as_str());
                    report.push_str(&format!(
                        "- {}: best known price ${} at {} (above target)\n",
                        label, alt.price, store
                    ));
                }
                None => report.push_str(&format!("- {}: no match found\n", label)),
            }
        }
        report.push('\n');
    }

    report.push_str("## 📊 Summary\n\n");
    report.push_str(&format!("- **Stores to visit**: {}\n", plan.visits.len()));
    report.push_str(&format!("- **Total Distance**: {:.1} miles\n", plan.travel_miles));
    report.push_str(&format!("- **Estimated Gas Cost**: ${}\n", plan.travel_cost));
    report.push_str(&format!("- **Total Cost**: ${}\n", plan.total_cost));
    report.push_str(&format!("- **Total Savings**: ${}\n", plan.total_savings));

    report
}

/// Writes the markdown report and the JSON plan record into the output
/// directory, named by run date.
pub fn write_reports(
    output_dir: &str,
    plan: &ShoppingPlan,
    stores: &[Store],
    items: &[ShoppingItem],
) -> io::Result<(PathBuf, PathBuf)> {
    let dir = Path::new(output_dir);
    fs::create_dir_all(dir)?;

    let stamp = plan.generated_at.format("%Y%m%d");
    let report_path = dir.join(format!("shopping_report_{stamp}.md"));
    let plan_path = dir.join(format!("shopping_plan_{stamp}.json"));

    fs::write(&report_path, render_markdown(plan, stores, items))?;
    let json = serde_json::to_string_pretty(plan).map_err(io::Error::other)?;
    fs::write(&plan_path, json)?;

    info!("Report written: {}", report_path.display());
    info!("Plan record written: {}", plan_path.display());
    Ok((report_path, plan_path))
}
