use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use vela_domain::services::engine::backtest::StrategyParams;

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub run: RunConfig,
    pub paths: PathsConfig,
    #[serde(default)]
    pub strategy: StrategyParams,
    pub data_quality: Option<DataQualityConfig>,
    pub feed: Option<FeedConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    pub run_id: String,
    pub symbol: String,
    pub timeframe: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub initial_equity: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct PathsConfig {
    pub data_path: String,
    pub out_dir: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct DataQualityConfig {
    pub max_invalid_rows: Option<usize>,
    pub max_out_of_order: Option<usize>,
}

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct FeedConfig {
    pub timeframe: Option<String>,
    pub start_price: Option<f64>,
    pub tick_interval_secs: Option<f64>,
    pub max_ticks: Option<u64>,
}

/// Per-request parameter overrides. A `None` field falls back to the stored
/// strategy value, field by field.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct StrategyOverrides {
    pub rsi_period: Option<usize>,
    pub ema_fast: Option<usize>,
    pub ema_slow: Option<usize>,
    pub trend_ema: Option<usize>,
    pub tp_points: Option<f64>,
    pub trail_offset: Option<f64>,
    pub lot_size: Option<u32>,
}

pub fn apply_overrides(stored: &StrategyParams, overrides: &StrategyOverrides) -> StrategyParams {
    StrategyParams {
        rsi_period: overrides.rsi_period.unwrap_or(stored.rsi_period),
        ema_fast: overrides.ema_fast.unwrap_or(stored.ema_fast),
        ema_slow: overrides.ema_slow.unwrap_or(stored.ema_slow),
        trend_ema: overrides.trend_ema.unwrap_or(stored.trend_ema),
        tp_points: overrides.tp_points.unwrap_or(stored.tp_points),
        trail_offset: overrides.trail_offset.unwrap_or(stored.trail_offset),
        lot_size: overrides.lot_size.unwrap_or(stored.lot_size),
    }
}

pub fn load_config(path: &Path) -> Result<Config, String> {
    let (config, _source) = load_config_with_source(path)?;
    Ok(config)
}

pub fn load_config_with_source(path: &Path) -> Result<(Config, String), String> {
    let contents = fs::read_to_string(path)
        .map_err(|err| format!("failed to read config {}: {}", path.display(), err))?;
    let config = toml::from_str(&contents)
        .map_err(|err| format!("failed to parse TOML {}: {}", path.display(), err))?;
    Ok((config, contents))
}

pub fn to_toml_pretty(config: &Config) -> Result<String, String> {
    toml::to_string_pretty(config)
        .map_err(|err| format!("failed to serialize config as TOML: {err}"))
}
