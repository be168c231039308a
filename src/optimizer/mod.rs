// Optimizer module: store subset selection and visit ordering.

pub mod route;
pub mod subset_search;

pub use subset_search::{Decision, Optimizer, OptimizerConfig, OptimizerImpl, RunSnapshot};
