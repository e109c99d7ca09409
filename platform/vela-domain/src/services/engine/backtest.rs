use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::metrics::{summarize, BacktestSummary};
use crate::services::indicators::IndicatorColumns;
use crate::value_objects::candle::Candle;
use crate::value_objects::direction::Direction;
use crate::value_objects::equity_point::EquityPoint;
use crate::value_objects::position::Position;
use crate::value_objects::trade::{ExitReason, Trade};

pub const LONG_ENTRY_RSI: f64 = 40.0;
pub const SHORT_ENTRY_RSI: f64 = 60.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct StrategyParams {
    pub rsi_period: usize,
    pub ema_fast: usize,
    pub ema_slow: usize,
    pub trend_ema: usize,
    pub tp_points: f64,
    pub trail_offset: f64,
    pub lot_size: u32,
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            ema_fast: 3,
            ema_slow: 7,
            trend_ema: 20,
            tp_points: 100.0,
            trail_offset: 50.0,
            lot_size: 1,
        }
    }
}

impl StrategyParams {
    pub fn validate(&self) -> Result<(), String> {
        if self.rsi_period == 0 {
            return Err("rsi_period must be > 0".to_string());
        }
        if self.ema_fast == 0 || self.ema_slow == 0 || self.trend_ema == 0 {
            return Err("ema spans must be > 0".to_string());
        }
        if !self.tp_points.is_finite() || self.tp_points <= 0.0 {
            return Err(format!("tp_points must be > 0, got {}", self.tp_points));
        }
        if !self.trail_offset.is_finite() || self.trail_offset <= 0.0 {
            return Err(format!(
                "trail_offset must be > 0, got {}",
                self.trail_offset
            ));
        }
        if self.lot_size == 0 {
            return Err("lot_size must be >= 1".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestResult {
    pub summary: BacktestSummary,
    pub equity_curve: Vec<EquityPoint>,
    pub trades: Vec<Trade>,
}

impl BacktestResult {
    pub fn empty(initial_equity: f64) -> Self {
        Self {
            summary: summarize(&[], initial_equity),
            equity_curve: Vec::new(),
            trades: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BacktestRunner {
    params: StrategyParams,
    initial_equity: f64,
}

impl BacktestRunner {
    pub fn new(params: StrategyParams, initial_equity: f64) -> Result<Self, String> {
        params.validate()?;
        if !initial_equity.is_finite() || initial_equity <= 0.0 {
            return Err(format!(
                "initial_equity must be > 0, got {initial_equity}"
            ));
        }
        Ok(Self {
            params,
            initial_equity,
        })
    }

    pub fn run(&self, candles: &[Candle]) -> BacktestResult {
        if candles.is_empty() {
            return BacktestResult::empty(self.initial_equity);
        }

        let columns = IndicatorColumns::compute(
            candles,
            self.params.rsi_period,
            self.params.ema_fast,
            self.params.ema_slow,
            self.params.trend_ema,
        );

        let mut equity = self.initial_equity;
        let mut position: Option<Position> = None;
        let mut trades: Vec<Trade> = Vec::new();
        let mut equity_curve = Vec::with_capacity(candles.len() + 1);
        equity_curve.push(EquityPoint {
            time: candles[0].start_time,
            equity,
        });

        for (i, bar) in candles.iter().enumerate() {
            let started_flat = position.is_none();

            let mut exit: Option<ExitReason> = None;
            if let (Some(pos), Some(trend)) = (position.as_mut(), columns.ema_trend[i]) {
                exit = check_exit(pos, bar.close, trend, &self.params);
            }
            if let Some(reason) = exit {
                if let Some(pos) = position.take() {
                    let trade = close_position(
                        &pos,
                        bar.close,
                        bar.start_time,
                        reason,
                        self.params.lot_size,
                    );
                    equity += trade.pnl_money;
                    trades.push(trade);
                }
            }

            // A bar either manages an open position or opens a new one, never
            // both: no same-bar re-entry after an exit.
            if started_flat {
                if let (Some(prev_rsi), Some(curr_rsi)) = (
                    i.checked_sub(1).and_then(|p| columns.rsi[p]),
                    columns.rsi[i],
                ) {
                    if prev_rsi <= LONG_ENTRY_RSI && curr_rsi > LONG_ENTRY_RSI {
                        position = Some(Position::open(Direction::Long, bar.close, bar.start_time));
                    } else if prev_rsi >= SHORT_ENTRY_RSI && curr_rsi < SHORT_ENTRY_RSI {
                        position =
                            Some(Position::open(Direction::Short, bar.close, bar.start_time));
                    }
                }
            }

            equity_curve.push(EquityPoint {
                time: bar.start_time,
                equity,
            });
        }

        // Forced liquidation at the last bar; reaches the trade list and the
        // summary but appends no extra curve point.
        if let (Some(pos), Some(last)) = (position.take(), candles.last()) {
            trades.push(close_position(
                &pos,
                last.close,
                last.start_time,
                ExitReason::EndOfSimulation,
                self.params.lot_size,
            ));
        }

        let summary = summarize(&trades, self.initial_equity);
        BacktestResult {
            summary,
            equity_curve,
            trades,
        }
    }
}

/// Updates the position extreme for this bar, then checks exits in priority
/// order: take profit, trailing stop, trend filter. The trend filter uses the
/// bar close against the trend EMA.
fn check_exit(
    position: &mut Position,
    close: f64,
    trend_ema: f64,
    params: &StrategyParams,
) -> Option<ExitReason> {
    match position.direction {
        Direction::Long => {
            position.highest_price_seen = position.highest_price_seen.max(close);
            if close >= position.entry_price + params.tp_points {
                Some(ExitReason::TakeProfit)
            } else if close <= position.highest_price_seen - params.trail_offset {
                Some(ExitReason::TrailingStop)
            } else if close < trend_ema {
                Some(ExitReason::TrendExit)
            } else {
                None
            }
        }
        Direction::Short => {
            position.lowest_price_seen = position.lowest_price_seen.min(close);
            if close <= position.entry_price - params.tp_points {
                Some(ExitReason::TakeProfit)
            } else if close >= position.lowest_price_seen + params.trail_offset {
                Some(ExitReason::TrailingStop)
            } else if close > trend_ema {
                Some(ExitReason::TrendExit)
            } else {
                None
            }
        }
    }
}

fn close_position(
    position: &Position,
    exit_price: f64,
    exit_time: DateTime<Utc>,
    reason: ExitReason,
    lot_size: u32,
) -> Trade {
    let pnl_points = match position.direction {
        Direction::Long => exit_price - position.entry_price,
        Direction::Short => position.entry_price - exit_price,
    };
    Trade {
        direction: position.direction,
        entry_time: position.entry_time,
        entry_price: position.entry_price,
        exit_time,
        exit_price,
        pnl_points,
        pnl_money: pnl_points * lot_size as f64,
        reason,
    }
}
