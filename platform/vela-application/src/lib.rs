pub mod backtesting;
pub mod config;
pub mod shared;
pub mod streaming;
