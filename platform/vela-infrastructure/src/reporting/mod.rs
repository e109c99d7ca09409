use std::path::Path;

use vela_domain::entities::metrics::BacktestSummary;
use vela_domain::value_objects::direction::Direction;
use vela_domain::value_objects::equity_point::EquityPoint;
use vela_domain::value_objects::trade::Trade;

pub fn write_trades_csv(path: &Path, trades: &[Trade]) -> Result<(), String> {
    let mut wtr = csv::Writer::from_path(path)
        .map_err(|err| format!("failed to create trades csv {}: {}", path.display(), err))?;
    wtr.write_record([
        "direction",
        "entry_time_utc",
        "entry_price",
        "exit_time_utc",
        "exit_price",
        "pnl_points",
        "pnl_money",
        "reason",
    ])
    .map_err(|err| format!("failed to write trades csv header: {}", err))?;

    for trade in trades {
        let direction = match trade.direction {
            Direction::Long => "LONG",
            Direction::Short => "SHORT",
        };
        wtr.write_record([
            direction.to_string(),
            trade.entry_time.to_rfc3339(),
            trade.entry_price.to_string(),
            trade.exit_time.to_rfc3339(),
            trade.exit_price.to_string(),
            trade.pnl_points.to_string(),
            trade.pnl_money.to_string(),
            trade.reason.as_str().to_string(),
        ])
        .map_err(|err| format!("failed to write trades row: {}", err))?;
    }

    wtr.flush()
        .map_err(|err| format!("failed to flush trades csv: {}", err))
}

pub fn write_equity_csv(path: &Path, points: &[EquityPoint]) -> Result<(), String> {
    let mut wtr = csv::Writer::from_path(path)
        .map_err(|err| format!("failed to create equity csv {}: {}", path.display(), err))?;
    wtr.write_record(["time_utc", "equity"])
        .map_err(|err| format!("failed to write equity csv header: {}", err))?;

    for point in points {
        wtr.write_record([point.time.to_rfc3339(), point.equity.to_string()])
            .map_err(|err| format!("failed to write equity row: {}", err))?;
    }

    wtr.flush()
        .map_err(|err| format!("failed to flush equity csv: {}", err))
}

pub fn write_summary_json(
    path: &Path,
    summary: &BacktestSummary,
    meta: Option<&serde_json::Value>,
    config_snapshot: Option<&serde_json::Value>,
) -> Result<(), String> {
    let json = serde_json::json!({
        "meta": meta,
        "config_snapshot": config_snapshot,
        "total_trades": summary.total_trades,
        "win_trades": summary.win_trades,
        "loss_trades": summary.loss_trades,
        "winrate": summary.winrate,
        "net_pnl_money": summary.net_pnl_money,
        "net_pnl_points": summary.net_pnl_points,
        "max_drawdown_pct": summary.max_drawdown_pct,
        "best_trade": summary.best_trade,
        "worst_trade": summary.worst_trade,
    });
    let contents = serde_json::to_string_pretty(&json)
        .map_err(|err| format!("failed to serialize summary json: {err}"))?;
    std::fs::write(path, contents)
        .map_err(|err| format!("failed to write summary json {}: {}", path.display(), err))
}
