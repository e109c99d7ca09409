pub mod candle;
pub mod direction;
pub mod equity_point;
pub mod position;
pub mod tick;
pub mod timeframe;
pub mod trade;
