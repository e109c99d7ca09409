use std::cmp::Ordering;

use serde::Serialize;

use crate::value_objects::trade::Trade;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestSummary {
    pub total_trades: usize,
    pub win_trades: usize,
    pub loss_trades: usize,
    pub winrate: f64,
    pub net_pnl_money: f64,
    pub net_pnl_points: f64,
    pub max_drawdown_pct: f64,
    pub best_trade: Option<Trade>,
    pub worst_trade: Option<Trade>,
}

/// Replays closed trades from the initial equity and reduces them to a summary.
/// Drawdown is the spread between the global high and low water marks of the
/// replayed equity, as a percentage of the high; the marks are seeded with the
/// initial equity so a profitable-only run reads zero.
pub fn summarize(trades: &[Trade], initial_equity: f64) -> BacktestSummary {
    let mut equity = initial_equity;
    let mut highest = initial_equity;
    let mut lowest = initial_equity;
    let mut net_pnl_points = 0.0;
    let mut win_trades = 0usize;
    let mut loss_trades = 0usize;

    for trade in trades {
        equity += trade.pnl_money;
        highest = highest.max(equity);
        lowest = lowest.min(equity);
        net_pnl_points += trade.pnl_points;
        if trade.pnl_money > 0.0 {
            win_trades += 1;
        } else if trade.pnl_money < 0.0 {
            loss_trades += 1;
        }
    }

    let total_trades = trades.len();
    let winrate = if total_trades > 0 {
        win_trades as f64 / total_trades as f64 * 100.0
    } else {
        0.0
    };
    let max_drawdown_pct = if highest > 0.0 {
        ((lowest - highest) / highest * 100.0).abs()
    } else {
        0.0
    };

    let best_trade = trades
        .iter()
        .max_by(|a, b| {
            a.pnl_money
                .partial_cmp(&b.pnl_money)
                .unwrap_or(Ordering::Equal)
        })
        .copied();
    let worst_trade = trades
        .iter()
        .min_by(|a, b| {
            a.pnl_money
                .partial_cmp(&b.pnl_money)
                .unwrap_or(Ordering::Equal)
        })
        .copied();

    BacktestSummary {
        total_trades,
        win_trades,
        loss_trades,
        winrate,
        net_pnl_money: equity - initial_equity,
        net_pnl_points,
        max_drawdown_pct,
        best_trade,
        worst_trade,
    }
}
