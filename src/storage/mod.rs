// Storage module: per-run persistence of catalog snapshots and plans.

pub mod sqlite;

pub use sqlite::PlanStore;
