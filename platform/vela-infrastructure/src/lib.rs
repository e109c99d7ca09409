pub mod artifacts;
pub mod feeds;
pub mod market_data;
pub mod reporting;
