// Shopping list loading: item_name, target_price, quantity, category, aliases
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::model::{ListError, ShoppingItem};
use crate::utils::to_kebab_case;

const SAMPLE_LIST: &str = "\
item_name,target_price,quantity,category,aliases
Milk,4.99,1,dairy,whole milk|2% milk
Bread,3.99,1,bakery,sandwich bread|wheat bread
Eggs,3.99,1,dairy,large eggs|dozen eggs
Chicken Breast,8.99,2,meat,boneless chicken|chicken breasts
Bananas,2.99,1,produce,banana
Cheese,5.99,1,dairy,cheddar|shredded cheese
Pasta,2.99,2,pantry,spaghetti|penne
Coffee,12.99,1,pantry,ground coffee|coffee beans
";

/// Loads the shopping list, writing a starter list first if the file is
/// missing. Malformed rows are skipped with a warning; the run continues
/// with whatever parsed.
pub fn load_shopping_list(path: &str) -> Result<Vec<ShoppingItem>, ListError> {
    let path_ref = Path::new(path);
    if !path_ref.exists() {
        info!("Shopping list {} missing, writing sample list", path);
        if let Some(parent) = path_ref.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path_ref, SAMPLE_LIST)?;
    }

    let content = fs::read_to_string(path_ref)?;
    let mut items = Vec::new();
    let mut seen_ids = BTreeSet::new();

    for (line_no, line) in content.lines().enumerate() {
        if line_no == 0 || line.trim().is_empty() {
            continue;
        }
        let Some(item) = parse_row(line) else {
            warn!("Skipping malformed shopping list row {}: {:?}", line_no + 1, line);
            continue;
        };
        if !seen_ids.insert(item.id.clone()) {
            warn!("Skipping duplicate shopping list item {:?}", item.canonical_name);
            continue;
        }
        items.push(item);
    }

    info!("Loaded {} shopping list items from {}", items.len(), path);
    Ok(items)
}

/// One CSV row into an item. Returns None for rows the run should skip:
/// missing name, unparsable or negative target price, zero quantity.
pub fn parse_row(line: &str) -> Option<ShoppingItem> {
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() < 2 {
        return None;
    }

    let name = fields[0].trim();
    if name.is_empty() {
        return None;
    }

    let target_price: Decimal = fields[1].trim().parse().ok()?;
    if target_price < Decimal::ZERO {
        return None;
    }

    let quantity = match fields.get(2).map(|q| q.trim()) {
        None | Some("") => 1,
        Some(q) => q.parse::<u32>().ok().filter(|&q| q >= 1)?,
    };

    let category = fields
        .get(3)
        .map(|c| c.trim().to_lowercase())
        .unwrap_or_default();

    let aliases = fields
        .get(4)
        .map(|a| {
            a.split('|')
                .map(|alias| alias.trim().to_string())
                .filter(|alias| !alias.is_empty())
                .collect()
        })
        .unwrap_or_default();

    Some(ShoppingItem {
        id: to_kebab_case(name),
        canonical_name: name.to_string(),
        aliases,
        target_price: target_price.round_dp(2),
        quantity,
        category,
    })
}
