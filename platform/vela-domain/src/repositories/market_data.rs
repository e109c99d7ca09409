use chrono::{DateTime, Utc};

use crate::value_objects::candle::Candle;

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryQuery {
    pub symbol: String,
    pub timeframe: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Default, Clone)]
pub struct HistoryReport {
    pub rows: usize,
    pub invalid_rows: usize,
    pub out_of_order: usize,
}

/// Source of historical candles. Implementations return candles sorted by
/// `start_time` ascending; an empty result for a valid query is not an error.
pub trait CandleHistory {
    fn load_candles(&self, query: &HistoryQuery) -> Result<(Vec<Candle>, HistoryReport), String>;
}
