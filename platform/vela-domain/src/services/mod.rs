pub mod candle_builder;
pub mod engine;
pub mod heikin_ashi;
pub mod indicators;
