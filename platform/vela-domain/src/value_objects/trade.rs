use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::direction::Direction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    #[serde(rename = "TP")]
    TakeProfit,
    #[serde(rename = "TRAIL")]
    TrailingStop,
    #[serde(rename = "EMA_EXIT")]
    TrendExit,
    #[serde(rename = "END_OF_BACKTEST")]
    EndOfSimulation,
}

impl ExitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitReason::TakeProfit => "TP",
            ExitReason::TrailingStop => "TRAIL",
            ExitReason::TrendExit => "EMA_EXIT",
            ExitReason::EndOfSimulation => "END_OF_BACKTEST",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub direction: Direction,
    pub entry_time: DateTime<Utc>,
    pub entry_price: f64,
    pub exit_time: DateTime<Utc>,
    pub exit_price: f64,
    pub pnl_points: f64,
    pub pnl_money: f64,
    pub reason: ExitReason,
}
