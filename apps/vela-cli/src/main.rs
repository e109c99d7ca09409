use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

use vela_application::backtesting::run_backtest;
use vela_application::config::{apply_overrides, load_config_with_source, StrategyOverrides};
use vela_application::streaming::{run_feed, FeedLifecycle};
use vela_domain::services::candle_builder::{CandleBuilder, CandleSink};
use vela_domain::services::heikin_ashi::HeikinAshiConverter;
use vela_domain::value_objects::candle::Candle;
use vela_domain::value_objects::timeframe::Timeframe;
use vela_infrastructure::artifacts::FilesystemArtifactWriter;
use vela_infrastructure::feeds::SyntheticTickFeed;
use vela_infrastructure::market_data::CsvCandleHistory;

#[derive(Parser)]
#[command(name = "vela")]
#[command(about = "Candle aggregation and RSI mean-reversion backtesting")]
struct Cli {
    /// Prometheus metrics listen addr (e.g. 127.0.0.1:9898). Optional.
    #[arg(long)]
    metrics_addr: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a historical backtest from a TOML config and write run artifacts.
    Backtest {
        #[arg(long)]
        config: PathBuf,

        /// Output directory override (default: paths.out_dir from the config).
        #[arg(long)]
        out: Option<PathBuf>,

        #[arg(long)]
        rsi_period: Option<usize>,
        #[arg(long)]
        ema_fast: Option<usize>,
        #[arg(long)]
        ema_slow: Option<usize>,
        #[arg(long)]
        trend_ema: Option<usize>,
        #[arg(long)]
        tp_points: Option<f64>,
        #[arg(long)]
        trail_offset: Option<f64>,
        #[arg(long)]
        lot_size: Option<u32>,

        /// Print the summary as a single JSON line instead of human output.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Drive the synthetic tick feed through the candle aggregator and print
    /// sealed candles. Time is virtual; the run is bounded by the tick budget.
    Feed {
        #[arg(long)]
        config: PathBuf,

        /// Number of ticks to generate (overrides feed.max_ticks).
        #[arg(long)]
        ticks: Option<u64>,

        /// Also print each sealed candle converted to Heikin Ashi.
        #[arg(long, default_value_t = false)]
        heikin_ashi: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(err) = init_tracing() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
    if let Err(err) = init_metrics(cli.metrics_addr.as_deref()) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }

    let result = match cli.command {
        Command::Backtest {
            config,
            out,
            rsi_period,
            ema_fast,
            ema_slow,
            trend_ema,
            tp_points,
            trail_offset,
            lot_size,
            json,
        } => run_backtest_command(
            config,
            out,
            StrategyOverrides {
                rsi_period,
                ema_fast,
                ema_slow,
                trend_ema,
                tp_points,
                trail_offset,
                lot_size,
            },
            json,
        ),
        Command::Feed {
            config,
            ticks,
            heikin_ashi,
        } => run_feed_command(config, ticks, heikin_ashi),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing() -> Result<(), String> {
    let filter = std::env::var("VELA_LOG").unwrap_or_else(|_| "info".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_new(filter)
        .map_err(|err| format!("invalid log filter: {err}"))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    Ok(())
}

#[cfg(feature = "prometheus")]
fn init_metrics(metrics_addr: Option<&str>) -> Result<Option<SocketAddr>, String> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let Some(raw) = metrics_addr else {
        return Ok(None);
    };
    let addr: SocketAddr = raw
        .parse()
        .map_err(|err| format!("invalid --metrics-addr (expected host:port): {err}"))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|err| format!("failed to install prometheus exporter: {err}"))?;

    tracing::info!(metrics_addr = %addr, "prometheus metrics exporter enabled");
    Ok(Some(addr))
}

#[cfg(not(feature = "prometheus"))]
fn init_metrics(metrics_addr: Option<&str>) -> Result<Option<SocketAddr>, String> {
    if metrics_addr.is_some() {
        return Err("metrics exporter requires vela-cli feature `prometheus`".to_string());
    }
    Ok(None)
}

fn run_backtest_command(
    config_path: PathBuf,
    out: Option<PathBuf>,
    overrides: StrategyOverrides,
    json: bool,
) -> Result<(), String> {
    metrics::counter!("vela.cli.commands_total", "command" => "backtest").increment(1);

    let (mut config, config_toml) = load_config_with_source(&config_path)?;
    config.strategy = apply_overrides(&config.strategy, &overrides);

    let history = CsvCandleHistory::new(&config.paths.data_path);
    let artifacts = FilesystemArtifactWriter::new();
    let output = run_backtest(&config, &config_toml, out, &history, &artifacts)?;
    let summary = &output.result.summary;

    if json {
        let line = serde_json::json!({
            "run_id": config.run.run_id,
            "run_dir": output.run_dir.display().to_string(),
            "total_trades": summary.total_trades,
            "winrate": summary.winrate,
            "net_pnl_money": summary.net_pnl_money,
            "net_pnl_points": summary.net_pnl_points,
            "max_drawdown_pct": summary.max_drawdown_pct,
        });
        println!("{}", line);
    } else {
        println!(
            "backtest: run_id={} trades={} winrate={:.2} net_pnl={:.2} max_drawdown_pct={:.2}",
            config.run.run_id,
            summary.total_trades,
            summary.winrate,
            summary.net_pnl_money,
            summary.max_drawdown_pct
        );
        println!("backtest: artifacts in {}", output.run_dir.display());
    }

    Ok(())
}

struct PrintSink;

impl CandleSink for PrintSink {
    fn on_candle_closed(&mut self, candle: &Candle) -> Result<(), String> {
        println!(
            "candle: start={} open={:.5} high={:.5} low={:.5} close={:.5}",
            candle.start_time.to_rfc3339(),
            candle.open,
            candle.high,
            candle.low,
            candle.close
        );
        Ok(())
    }
}

struct HeikinAshiPrintSink {
    converter: HeikinAshiConverter,
}

impl CandleSink for HeikinAshiPrintSink {
    fn on_candle_closed(&mut self, candle: &Candle) -> Result<(), String> {
        let ha = self.converter.convert_next(candle);
        println!(
            "heikin_ashi: start={} open={:.5} high={:.5} low={:.5} close={:.5}",
            ha.start_time.to_rfc3339(),
            ha.open,
            ha.high,
            ha.low,
            ha.close
        );
        Ok(())
    }
}

fn run_feed_command(
    config_path: PathBuf,
    ticks: Option<u64>,
    heikin_ashi: bool,
) -> Result<(), String> {
    metrics::counter!("vela.cli.commands_total", "command" => "feed").increment(1);

    let (config, _source) = load_config_with_source(&config_path)?;
    let feed_config = config.feed.clone().unwrap_or_default();

    let timeframe_label = feed_config
        .timeframe
        .unwrap_or_else(|| config.run.timeframe.clone());
    let timeframe = Timeframe::parse_or_minutes(&timeframe_label)?;
    let start_price = feed_config.start_price.unwrap_or(100.0);
    let tick_interval_secs = feed_config.tick_interval_secs.unwrap_or(1.0);
    let max_ticks = ticks.or(feed_config.max_ticks).unwrap_or(1000);

    let mut builder = CandleBuilder::new(&timeframe);
    let mut source = SyntheticTickFeed::new(start_price, tick_interval_secs);
    let mut sinks: Vec<Box<dyn CandleSink>> = vec![Box::new(PrintSink)];
    if heikin_ashi {
        sinks.push(Box::new(HeikinAshiPrintSink {
            converter: HeikinAshiConverter::new(),
        }));
    }

    let lifecycle = FeedLifecycle::new();
    let report = run_feed(&mut builder, &mut source, &mut sinks, &lifecycle, max_ticks);

    println!(
        "feed: ticks={} sealed={} sink_errors={} out_of_order={} invalid={}",
        report.ticks_processed,
        report.candles_sealed,
        report.sink_errors,
        builder.report().out_of_order_ticks,
        builder.report().invalid_ticks
    );
    if let Some(current) = builder.peek_current() {
        println!(
            "feed: open candle start={} open={:.5} close={:.5}",
            current.start_time.to_rfc3339(),
            current.open,
            current.close
        );
    }

    Ok(())
}
