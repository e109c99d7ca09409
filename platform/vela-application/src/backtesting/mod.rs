use std::path::PathBuf;
use std::time::Instant;

use tracing::{info, info_span, warn};

use crate::config::Config;
use crate::shared::{config_snapshot_json, summary_meta_json};
use vela_domain::repositories::artifacts::ArtifactWriter;
use vela_domain::repositories::market_data::{CandleHistory, HistoryQuery, HistoryReport};
use vela_domain::services::engine::backtest::{BacktestResult, BacktestRunner};
use vela_domain::value_objects::timeframe::Timeframe;

#[derive(Debug, Clone)]
pub struct BacktestRunOutput {
    pub run_dir: PathBuf,
    pub result: BacktestResult,
}

pub fn run_backtest(
    config: &Config,
    config_toml: &str,
    out: Option<PathBuf>,
    history: &dyn CandleHistory,
    artifacts: &dyn ArtifactWriter,
) -> Result<BacktestRunOutput, String> {
    let _span = info_span!(
        "run_backtest",
        run_id = %config.run.run_id,
        symbol = %config.run.symbol,
        timeframe = %config.run.timeframe
    )
    .entered();

    let timeframe = Timeframe::parse_or_minutes(&config.run.timeframe)?;
    if config.run.end < config.run.start {
        return Err(format!(
            "run.end ({}) precedes run.start ({})",
            config.run.end, config.run.start
        ));
    }

    let stage_start = Instant::now();
    let (candles, report) = history.load_candles(&HistoryQuery {
        symbol: config.run.symbol.clone(),
        timeframe: timeframe.label.clone(),
        start: config.run.start,
        end: config.run.end,
    })?;
    metrics::histogram!("vela.backtest.load_candles_ms")
        .record(stage_start.elapsed().as_millis() as f64);
    info!(
        rows = report.rows,
        invalid_rows = report.invalid_rows,
        out_of_order = report.out_of_order,
        "loaded candle history"
    );

    enforce_data_quality(config, &report)?;

    let runner = BacktestRunner::new(config.strategy.clone(), config.run.initial_equity)?;
    let result = if candles.is_empty() {
        warn!("no candles in query range; writing an empty result");
        BacktestResult::empty(config.run.initial_equity)
    } else {
        let engine_start = Instant::now();
        let result = runner.run(&candles);
        let engine_ms = engine_start.elapsed().as_millis() as f64;
        metrics::histogram!("vela.backtest.engine_ms").record(engine_ms);
        metrics::gauge!("vela.backtest.bars_processed").set(candles.len() as f64);
        metrics::gauge!("vela.backtest.trades").set(result.summary.total_trades as f64);
        result
    };

    let run_dir = write_outputs(config, config_toml, out, &result, artifacts)?;
    info!(
        trades = result.summary.total_trades,
        net_pnl_money = result.summary.net_pnl_money,
        run_dir = %run_dir.display(),
        "backtest complete"
    );
    Ok(BacktestRunOutput { run_dir, result })
}

fn enforce_data_quality(config: &Config, report: &HistoryReport) -> Result<(), String> {
    let Some(limits) = &config.data_quality else {
        return Ok(());
    };
    if let Some(max) = limits.max_invalid_rows {
        if report.invalid_rows > max {
            return Err(format!(
                "data quality gate failed: invalid_rows {} exceeds limit {}",
                report.invalid_rows, max
            ));
        }
    }
    if let Some(max) = limits.max_out_of_order {
        if report.out_of_order > max {
            return Err(format!(
                "data quality gate failed: out_of_order {} exceeds limit {}",
                report.out_of_order, max
            ));
        }
    }
    Ok(())
}

fn write_outputs(
    config: &Config,
    config_toml: &str,
    out: Option<PathBuf>,
    result: &BacktestResult,
    artifacts: &dyn ArtifactWriter,
) -> Result<PathBuf, String> {
    let base_dir = out.unwrap_or_else(|| PathBuf::from(&config.paths.out_dir));
    let run_dir = base_dir.join(&config.run.run_id);
    artifacts.ensure_dir(&run_dir)?;

    artifacts.write_trades_csv(run_dir.join("trades.csv").as_path(), &result.trades)?;
    artifacts.write_equity_csv(run_dir.join("equity.csv").as_path(), &result.equity_curve)?;

    let meta = summary_meta_json(config);
    let config_snapshot = config_snapshot_json(config, &config.strategy, config_toml);
    artifacts.write_summary_json(
        run_dir.join("summary.json").as_path(),
        &result.summary,
        Some(&meta),
        Some(&config_snapshot),
    )?;
    artifacts
        .write_config_snapshot_toml(run_dir.join("config_snapshot.toml").as_path(), config_toml)?;

    Ok(run_dir)
}
