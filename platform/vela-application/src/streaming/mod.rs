use std::sync::atomic::{AtomicBool, Ordering};

use tracing::warn;

use vela_domain::repositories::market_stream::TickSource;
use vela_domain::services::candle_builder::{CandleBuilder, CandleSink};

/// Cooperative stop flag for the feed loop. Shared with whatever wants to end
/// the stream (signal handler, test, supervisor); checked between ticks.
#[derive(Debug, Default)]
pub struct FeedLifecycle {
    stopped: AtomicBool,
}

impl FeedLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default, Clone)]
pub struct FeedReport {
    pub ticks_processed: u64,
    pub candles_sealed: u64,
    pub sink_errors: u64,
}

/// Drives the tick source through the aggregator, fanning sealed candles out to
/// the sinks in registration order. A failing sink is logged and skipped; it
/// never stops the feed or starves the sinks after it.
pub fn run_feed(
    builder: &mut CandleBuilder,
    source: &mut dyn TickSource,
    sinks: &mut [Box<dyn CandleSink>],
    lifecycle: &FeedLifecycle,
    max_ticks: u64,
) -> FeedReport {
    let mut report = FeedReport::default();

    while report.ticks_processed < max_ticks {
        if lifecycle.is_stopped() {
            break;
        }
        let tick = source.next_tick();
        let sealed = builder.update_with_tick(tick.price, tick.timestamp);
        report.ticks_processed += 1;

        if let Some(candle) = sealed {
            report.candles_sealed += 1;
            for sink in sinks.iter_mut() {
                if let Err(err) = sink.on_candle_closed(&candle) {
                    report.sink_errors = report.sink_errors.saturating_add(1);
                    warn!(error = %err, "candle sink failed; continuing");
                }
            }
        }
    }

    report
}
