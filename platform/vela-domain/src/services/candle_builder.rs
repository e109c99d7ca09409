use chrono::{DateTime, Timelike, Utc};

use crate::value_objects::candle::Candle;
use crate::value_objects::timeframe::Timeframe;

#[derive(Debug, Default, Clone)]
pub struct CandleAggregationReport {
    pub out_of_order_ticks: u64,
    pub invalid_ticks: u64,
    pub last_tick_at: Option<DateTime<Utc>>,
    pub last_sealed_start: Option<DateTime<Utc>>,
}

/// Observer for sealed candles. Fan-out order and failure policy belong to the
/// caller; a sink only sees candles that will never change again.
pub trait CandleSink {
    fn on_candle_closed(&mut self, candle: &Candle) -> Result<(), String>;
}

#[derive(Debug, Clone)]
pub struct CandleBuilder {
    timeframe_minutes: u32,
    working: Option<Candle>,
    report: CandleAggregationReport,
}

impl CandleBuilder {
    pub fn new(timeframe: &Timeframe) -> Self {
        Self {
            timeframe_minutes: timeframe.minutes,
            working: None,
            report: CandleAggregationReport::default(),
        }
    }

    pub fn report(&self) -> &CandleAggregationReport {
        &self.report
    }

    fn bucket_start(&self, ts: DateTime<Utc>) -> DateTime<Utc> {
        let floored = ts.minute() - ts.minute() % self.timeframe_minutes;
        ts.with_minute(floored)
            .and_then(|t| t.with_second(0))
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(ts)
    }

    /// Folds one tick into the working candle. Returns the previous candle when
    /// this tick opens a later bucket; the sealed candle is moved out and will
    /// never be touched again.
    pub fn update_with_tick(&mut self, price: f64, ts: DateTime<Utc>) -> Option<Candle> {
        if !price.is_finite() {
            self.report.invalid_ticks = self.report.invalid_ticks.saturating_add(1);
            return None;
        }

        let bucket_start = self.bucket_start(ts);
        let mut sealed: Option<Candle> = None;

        match self.working.as_ref().map(|candle| candle.start_time) {
            None => {
                self.working = Some(Candle {
                    start_time: bucket_start,
                    open: price,
                    high: price,
                    low: price,
                    close: price,
                });
            }
            Some(active) if active == bucket_start => {
                if let Some(ref mut candle) = self.working {
                    candle.high = candle.high.max(price);
                    candle.low = candle.low.min(price);
                    candle.close = price;
                }
            }
            Some(active) if bucket_start > active => {
                sealed = self.working.take();
                self.report.last_sealed_start = sealed.as_ref().map(|candle| candle.start_time);
                self.working = Some(Candle {
                    start_time: bucket_start,
                    open: price,
                    high: price,
                    low: price,
                    close: price,
                });
            }
            Some(_) => {
                // Determinism: drop late ticks instead of rewriting sealed buckets.
                self.report.out_of_order_ticks = self.report.out_of_order_ticks.saturating_add(1);
                return None;
            }
        }

        self.report.last_tick_at = Some(ts);
        sealed
    }

    /// Snapshot of the in-progress candle. Read-only; never seals.
    pub fn peek_current(&self) -> Option<Candle> {
        self.working
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn tf(minutes: u32) -> Timeframe {
        Timeframe::parse_minutes(&minutes.to_string()).unwrap()
    }

    fn at(min: u32, sec: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 9, min, sec).unwrap()
    }

    #[test]
    fn floors_minute_of_hour_to_timeframe_multiple() {
        let builder = CandleBuilder::new(&tf(15));
        assert_eq!(builder.bucket_start(at(7, 30)), at(0, 0));
        assert_eq!(builder.bucket_start(at(14, 59)), at(0, 0));
        assert_eq!(builder.bucket_start(at(15, 0)), at(15, 0));
        assert_eq!(builder.bucket_start(at(29, 1)), at(15, 0));
    }

    #[test]
    fn aggregates_ticks_and_seals_on_bucket_change() {
        let mut builder = CandleBuilder::new(&tf(1));
        assert_eq!(builder.update_with_tick(10.0, at(0, 0)), None);
        assert_eq!(builder.update_with_tick(11.0, at(0, 10)), None);
        let sealed = builder
            .update_with_tick(12.0, at(1, 10))
            .expect("seal first candle");

        assert_eq!(sealed.start_time, at(0, 0));
        assert_eq!(sealed.open, 10.0);
        assert_eq!(sealed.high, 11.0);
        assert_eq!(sealed.low, 10.0);
        assert_eq!(sealed.close, 11.0);
        assert_eq!(builder.report().last_sealed_start, Some(at(0, 0)));
    }

    #[test]
    fn intra_bucket_sequence_never_seals_and_peek_matches() {
        let prices = [100.0, 100.5, 100.3, 100.8, 101.0, 100.9, 101.2, 100.7];
        let mut builder = CandleBuilder::new(&tf(15));
        for (i, price) in prices.iter().enumerate() {
            let secs = (i as u32) * 30;
            let ts = at(secs / 60, secs % 60);
            assert_eq!(builder.update_with_tick(*price, ts), None);
        }
        let current = builder.peek_current().expect("working candle");
        assert_eq!(current.start_time, at(0, 0));
        assert_eq!(current.open, 100.0);
        assert_eq!(current.high, 101.2);
        assert_eq!(current.low, 100.0);
        assert_eq!(current.close, 100.7);
        // Peeking again returns the same snapshot.
        assert_eq!(builder.peek_current(), Some(current));
    }

    #[test]
    fn gap_over_empty_buckets_emits_one_candle() {
        let mut builder = CandleBuilder::new(&tf(1));
        builder.update_with_tick(10.0, at(0, 0));
        let sealed = builder.update_with_tick(20.0, at(5, 0));
        assert!(sealed.is_some());
        assert_eq!(builder.peek_current().map(|c| c.start_time), Some(at(5, 0)));
    }

    #[test]
    fn drops_out_of_order_ticks_and_counts_them() {
        let mut builder = CandleBuilder::new(&tf(1));
        builder.update_with_tick(10.0, at(5, 0));
        let out = builder.update_with_tick(9.0, at(4, 0));
        assert!(out.is_none());
        assert_eq!(builder.report().out_of_order_ticks, 1);
        // Working candle is untouched by the dropped tick.
        assert_eq!(builder.peek_current().map(|c| c.close), Some(10.0));
    }

    #[test]
    fn counts_non_finite_prices_as_invalid() {
        let mut builder = CandleBuilder::new(&tf(1));
        assert_eq!(builder.update_with_tick(f64::NAN, at(0, 0)), None);
        assert_eq!(builder.update_with_tick(f64::INFINITY, at(0, 1)), None);
        assert_eq!(builder.report().invalid_ticks, 2);
        assert!(builder.peek_current().is_none());
    }
}
