// Parser module: store listing pages -> raw price records.

pub mod listing_parser;

pub use listing_parser::ListingParser;
