// Matcher module: item-to-record name matching per store.

pub mod deal_matching;
pub mod similarity;

pub use deal_matching::{Matcher, MatcherImpl};
