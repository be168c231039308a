use serde::Deserialize;
use std::fs;

use crate::model::{ConfigError, Store};

#[derive(Debug, Clone, Deserialize)]
pub struct HomeConfig {
    pub lat: f64,
    pub long: f64,
}

/// One store entry: identity, location and the selectors its listing
/// page is scraped with.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreEntry {
    pub id: String,
    pub name: String,
    pub lat: Option<f64>,
    pub long: Option<f64>,
    #[serde(default)]
    pub opening_hours: String,
    pub listing_url: String,
    pub item_selector: String,
    pub name_selector: String,
    pub price_selector: String,
    #[serde(default)]
    pub unit_selector: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    pub home: HomeConfig,
    pub stores: Vec<StoreEntry>,
    #[serde(default = "default_list_path")]
    pub shopping_list_path: String,
    #[serde(default = "default_db_path")]
    pub db_path: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    pub max_stores: i64,
    #[serde(default)]
    pub max_travel_budget: Option<f64>,
    #[serde(default = "default_confidence_threshold")]
    pub match_confidence_threshold: f64,
    #[serde(default)]
    pub deals_only: bool,
    #[serde(default)]
    pub no_travel: bool,
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_seconds: u64,
    #[serde(default = "default_optimize_timeout")]
    pub optimize_timeout_seconds: u64,
    #[serde(default = "default_gas_price")]
    pub gas_price_per_gallon: f64,
    #[serde(default = "default_avg_mpg")]
    pub avg_mpg: f64,
}

fn default_enabled() -> bool {
    true
}

fn default_list_path() -> String {
    "data/shopping_list.csv".to_string()
}

fn default_db_path() -> String {
    "dealcart.db".to_string()
}

fn default_output_dir() -> String {
    "output".to_string()
}

fn default_confidence_threshold() -> f64 {
    0.6
}

fn default_fetch_timeout() -> u64 {
    20
}

fn default_optimize_timeout() -> u64 {
    30
}

fn default_gas_price() -> f64 {
    3.29
}

fn default_avg_mpg() -> f64 {
    25.0
}

pub fn load_config(path: &str) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: AppConfig = serde_json::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

impl AppConfig {
    /// Rejecting a bad configuration is the only fatal pre-run error;
    /// everything later degrades per store or per row.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_stores < 1 {
            return Err(ConfigError::Invalid(format!(
                "max_stores must be at least 1, got {}",
                self.max_stores
            )));
        }
        if !(0.0..=1.0).contains(&self.match_confidence_threshold) {
            return Err(ConfigError::Invalid(format!(
                "match_confidence_threshold must be in [0, 1], got {}",
                self.match_confidence_threshold
            )));
        }
        if let Some(budget) = self.max_travel_budget {
            if budget < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "max_travel_budget must not be negative, got {budget}"
                )));
            }
        }
        if self.avg_mpg <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "avg_mpg must be positive, got {}",
                self.avg_mpg
            )));
        }
        Ok(())
    }

    pub fn enabled_stores(&self) -> Vec<&StoreEntry> {
        self.stores.iter().filter(|s| s.enabled).collect()
    }

    /// Domain view of the enabled stores.
    pub fn store_models(&self) -> Vec<Store> {
        self.enabled_stores()
            .into_iter()
            .map(|s| Store {
                id: s.id.clone(),
                name: s.name.clone(),
                location: match (s.lat, s.long) {
                    (Some(lat), Some(long)) => Some((lat, long)),
                    _ => None,
                },
                opening_hours: s.opening_hours.clone(),
            })
            .collect()
    }
}
