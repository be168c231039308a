use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};
use rust_decimal::Decimal;

use crate::model::{ShoppingPlan, StorageError};
use crate::normalizer::PriceCatalog;
use crate::utils::parse_datetime;

/// Sqlite-backed run history: canonical price snapshots plus assembled
/// plans, the structured record external sync jobs read from.
pub struct PlanStore {
    conn: Connection,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub generated_at: DateTime<Utc>,
    pub total_cost: Decimal,
    pub total_savings: Decimal,
    pub unresolved_count: i64,
}

impl PlanStore {
    pub fn new(db_path: &str) -> Result<Self, StorageError> {
        let conn = Connection::open(db_path)?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS price_records (
                store_id TEXT NOT NULL,
                matched_name TEXT NOT NULL,
                price TEXT NOT NULL,
                unit TEXT NOT NULL,
                observed_at TEXT NOT NULL,
                PRIMARY KEY (store_id, matched_name, unit, observed_at)
            );

            CREATE TABLE IF NOT EXISTS plan_runs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                generated_at TEXT NOT NULL,
                total_cost TEXT NOT NULL,
                total_savings TEXT NOT NULL,
                travel_cost TEXT NOT NULL,
                travel_miles REAL NOT NULL,
                partial_search INTEGER NOT NULL,
                visits TEXT NOT NULL,
                unresolved TEXT NOT NULL
            );
            ",
        )?;

        Ok(Self { conn })
    }

    /// Persists every canonical record of the run's catalog.
    pub fn save_snapshot(&self, catalog: &PriceCatalog) -> Result<(), StorageError> {
        for record in catalog.all_records() {
            self.conn.execute(
                "INSERT OR REPLACE INTO price_records
                     (store_id, matched_name, price, unit, observed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    &record.store_id,
                    &record.matched_name,
                    record.price.to_string(),
                    &record.unit,
                    record.observed_at.to_rfc3339(),
                ],
            )?;
        }
        Ok(())
    }

    pub fn save_plan(&self, plan: &ShoppingPlan) -> Result<i64, StorageError> {
        let visits = serde_json::to_string(&plan.visits)
            .map_err(|e| StorageError::Database(e.to_string()))?;
        let unresolved = serde_json::to_string(&plan.unresolved_items)
            .map_err(|e| StorageError::Database(e.to_string()))?;

        self.conn.execute(
            "INSERT INTO plan_runs
                 (generated_at, total_cost, total_savings, travel_cost,
                  travel_miles, partial_search, visits, unresolved)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                plan.generated_at.to_rfc3339(),
                plan.total_cost.to_string(),
                plan.total_savings.to_string(),
                plan.travel_cost.to_string(),
                plan.travel_miles,
                plan.partial_search,
                visits,
                unresolved,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Most recent run, if any. Logged at startup for comparison.
    pub fn last_run(&self) -> Result<Option<RunSummary>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT generated_at, total_cost, total_savings, unresolved
             FROM plan_runs ORDER BY id DESC LIMIT 1",
        )?;

        let mut rows = stmt.query([])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };

        let generated_at_str: String = row.get(0)?;
        let total_cost_str: String = row.get(1)?;
        let total_savings_str: String = row.get(2)?;
        let unresolved_str: String = row.get(3)?;

        let generated_at = parse_datetime(&generated_at_str)
            .ok_or_else(|| StorageError::Database(format!("bad generated_at: {generated_at_str}")))?;
        let total_cost = total_cost_str
            .parse()
            .map_err(|e| StorageError::Database(format!("bad total_cost: {e}")))?;
        let total_savings = total_savings_str
            .parse()
            .map_err(|e| StorageError::Database(format!("bad total_savings: {e}")))?;
        let unresolved: Vec<serde_json::Value> = serde_json::from_str(&unresolved_str)
            .map_err(|e| StorageError::Database(e.to_string()))?;

        Ok(Some(RunSummary {
            generated_at,
            total_cost,
            total_savings,
            unresolved_count: unresolved.len() as i64,
        }))
    }
}
