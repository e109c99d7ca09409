use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use vela_application::backtesting::run_backtest;
use vela_application::config::Config;
use vela_application::streaming::{run_feed, FeedLifecycle};
use vela_domain::repositories::market_data::{CandleHistory, HistoryQuery, HistoryReport};
use vela_domain::services::candle_builder::{CandleBuilder, CandleSink};
use vela_domain::value_objects::candle::Candle;
use vela_domain::value_objects::timeframe::Timeframe;
use vela_infrastructure::artifacts::FilesystemArtifactWriter;
use vela_infrastructure::feeds::SyntheticTickFeed;

const CONFIG_TOML: &str = r#"
[run]
run_id = "use_case_run"
symbol = "EURUSD"
timeframe = "15m"
start = "2024-01-02T00:00:00Z"
end = "2024-01-09T00:00:00Z"
initial_equity = 100000.0

[paths]
data_path = "unused.csv"
out_dir = "unused/"

[strategy]
rsi_period = 2
ema_fast = 2
ema_slow = 3
trend_ema = 2
tp_points = 10.0
trail_offset = 5.0
lot_size = 1
"#;

fn load_config() -> Config {
    toml::from_str(CONFIG_TOML).expect("test config should parse")
}

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap()
}

fn bars(closes: &[f64]) -> Vec<Candle> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Candle {
            start_time: base_time() + Duration::minutes(15 * i as i64),
            open: close,
            high: close,
            low: close,
            close,
        })
        .collect()
}

struct StubHistory {
    candles: Vec<Candle>,
    report: HistoryReport,
}

impl StubHistory {
    fn new(candles: Vec<Candle>) -> Self {
        let report = HistoryReport {
            rows: candles.len(),
            ..HistoryReport::default()
        };
        Self { candles, report }
    }
}

impl CandleHistory for StubHistory {
    fn load_candles(&self, _query: &HistoryQuery) -> Result<(Vec<Candle>, HistoryReport), String> {
        Ok((self.candles.clone(), self.report.clone()))
    }
}

fn temp_out_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("vela_use_cases_{}_{}", std::process::id(), name))
}

#[test]
fn backtest_use_case_writes_the_full_artifact_set() {
    let config = load_config();
    let history = StubHistory::new(bars(&[100.0, 99.0, 98.0, 97.0, 105.0, 120.0]));
    let out_dir = temp_out_dir("full");

    let output = run_backtest(
        &config,
        CONFIG_TOML,
        Some(out_dir.clone()),
        &history,
        &FilesystemArtifactWriter::new(),
    )
    .expect("backtest should succeed");

    assert_eq!(output.run_dir, out_dir.join("use_case_run"));
    assert_eq!(output.result.summary.total_trades, 1);
    assert_eq!(output.result.summary.net_pnl_money, 15.0);

    for artifact in [
        "trades.csv",
        "equity.csv",
        "summary.json",
        "config_snapshot.toml",
    ] {
        assert!(
            output.run_dir.join(artifact).is_file(),
            "missing artifact {artifact}"
        );
    }

    let summary: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(output.run_dir.join("summary.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(summary["meta"]["run_id"], "use_case_run");
    assert_eq!(summary["total_trades"], 1);
    assert_eq!(summary["config_snapshot"]["strategy"]["rsi_period"], 2);

    let snapshot = std::fs::read_to_string(output.run_dir.join("config_snapshot.toml")).unwrap();
    assert_eq!(snapshot, CONFIG_TOML);

    std::fs::remove_dir_all(&out_dir).ok();
}

#[test]
fn backtest_with_no_candles_still_writes_empty_artifacts() {
    let config = load_config();
    let history = StubHistory::new(Vec::new());
    let out_dir = temp_out_dir("empty");

    let output = run_backtest(
        &config,
        CONFIG_TOML,
        Some(out_dir.clone()),
        &history,
        &FilesystemArtifactWriter::new(),
    )
    .expect("empty history is not an error");

    assert_eq!(output.result.summary.total_trades, 0);
    assert!(output.result.equity_curve.is_empty());
    assert!(output.run_dir.join("summary.json").is_file());

    let equity = std::fs::read_to_string(output.run_dir.join("equity.csv")).unwrap();
    assert_eq!(equity.trim(), "time_utc,equity");

    std::fs::remove_dir_all(&out_dir).ok();
}

#[test]
fn data_quality_gate_rejects_dirty_history() {
    let mut config = load_config();
    config.data_quality = Some(vela_application::config::DataQualityConfig {
        max_invalid_rows: Some(0),
        max_out_of_order: None,
    });
    let mut history = StubHistory::new(bars(&[100.0, 101.0]));
    history.report.invalid_rows = 3;
    let out_dir = temp_out_dir("gate");

    let err = run_backtest(
        &config,
        CONFIG_TOML,
        Some(out_dir.clone()),
        &history,
        &FilesystemArtifactWriter::new(),
    )
    .expect_err("gate should fail");
    assert!(err.contains("invalid_rows"));
    assert!(!out_dir.join("use_case_run").join("summary.json").exists());

    std::fs::remove_dir_all(&out_dir).ok();
}

#[derive(Default)]
struct RecordingSink {
    candles: Rc<RefCell<Vec<Candle>>>,
}

impl CandleSink for RecordingSink {
    fn on_candle_closed(&mut self, candle: &Candle) -> Result<(), String> {
        self.candles.borrow_mut().push(*candle);
        Ok(())
    }
}

struct FailingSink;

impl CandleSink for FailingSink {
    fn on_candle_closed(&mut self, _candle: &Candle) -> Result<(), String> {
        Err("sink is broken".to_string())
    }
}

#[test]
fn feed_loop_seals_candles_and_fans_out_to_sinks() {
    let timeframe = Timeframe::parse("1m").unwrap();
    let mut builder = CandleBuilder::new(&timeframe);
    let mut source = SyntheticTickFeed::seeded(100.0, 1.0, base_time(), 9);

    let seen = Rc::new(RefCell::new(Vec::new()));
    let mut sinks: Vec<Box<dyn CandleSink>> = vec![Box::new(RecordingSink {
        candles: Rc::clone(&seen),
    })];
    let lifecycle = FeedLifecycle::new();

    // 300 one-second ticks cross five 1-minute boundaries.
    let report = run_feed(&mut builder, &mut source, &mut sinks, &lifecycle, 300);

    assert_eq!(report.ticks_processed, 300);
    assert_eq!(report.candles_sealed, 5);
    assert_eq!(report.sink_errors, 0);
    assert_eq!(seen.borrow().len(), 5);
    for window in seen.borrow().windows(2) {
        assert!(window[0].start_time < window[1].start_time);
    }
    // The sixth minute is still accumulating.
    assert!(builder.peek_current().is_some());
}

#[test]
fn failing_sink_does_not_starve_later_sinks() {
    let timeframe = Timeframe::parse("1m").unwrap();
    let mut builder = CandleBuilder::new(&timeframe);
    let mut source = SyntheticTickFeed::seeded(100.0, 1.0, base_time(), 9);

    let seen = Rc::new(RefCell::new(Vec::new()));
    let mut sinks: Vec<Box<dyn CandleSink>> = vec![
        Box::new(FailingSink),
        Box::new(RecordingSink {
            candles: Rc::clone(&seen),
        }),
    ];
    let lifecycle = FeedLifecycle::new();

    let report = run_feed(&mut builder, &mut source, &mut sinks, &lifecycle, 300);

    assert_eq!(report.candles_sealed, 5);
    assert_eq!(report.sink_errors, 5);
    assert_eq!(seen.borrow().len(), 5);
}

#[test]
fn stopped_lifecycle_halts_the_feed_before_any_tick() {
    let timeframe = Timeframe::parse("1m").unwrap();
    let mut builder = CandleBuilder::new(&timeframe);
    let mut source = SyntheticTickFeed::seeded(100.0, 1.0, base_time(), 9);
    let mut sinks: Vec<Box<dyn CandleSink>> = Vec::new();

    let lifecycle = FeedLifecycle::new();
    lifecycle.stop();
    let report = run_feed(&mut builder, &mut source, &mut sinks, &lifecycle, 300);

    assert_eq!(report.ticks_processed, 0);
    assert_eq!(report.candles_sealed, 0);
    assert!(builder.peek_current().is_none());
}
