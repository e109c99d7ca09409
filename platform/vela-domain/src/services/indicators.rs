use std::collections::VecDeque;

use crate::value_objects::candle::Candle;

/// RSI over a simple rolling mean of gains and losses. Undefined (None) until a
/// full window of price changes exists, i.e. for every index < period. A window
/// with zero losses reads 100; a window with zero movement stays undefined.
pub fn rsi(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 {
        return vec![None; closes.len()];
    }

    let mut out = Vec::with_capacity(closes.len());
    let mut window: VecDeque<f64> = VecDeque::with_capacity(period + 1);
    let mut sum_gains = 0.0;
    let mut sum_losses = 0.0;
    let mut prev_close: Option<f64> = None;

    for &close in closes {
        let Some(prev) = prev_close else {
            prev_close = Some(close);
            out.push(None);
            continue;
        };
        prev_close = Some(close);

        let diff = close - prev;
        window.push_back(diff);
        if diff > 0.0 {
            sum_gains += diff;
        } else {
            sum_losses -= diff;
        }
        while window.len() > period {
            if let Some(evicted) = window.pop_front() {
                if evicted > 0.0 {
                    sum_gains -= evicted;
                } else {
                    sum_losses += evicted;
                }
            }
        }

        if window.len() < period {
            out.push(None);
            continue;
        }

        let value = if sum_losses <= 0.0 {
            if sum_gains <= 0.0 {
                None
            } else {
                Some(100.0)
            }
        } else {
            let rs = (sum_gains / period as f64) / (sum_losses / period as f64);
            Some(100.0 - 100.0 / (1.0 + rs))
        };
        out.push(value);
    }

    out
}

/// Exponential moving average with alpha = 2 / (span + 1), seeded by the first
/// value.
pub fn ema(values: &[f64], span: usize) -> Vec<f64> {
    let Some(&first) = values.first() else {
        return Vec::new();
    };
    let alpha = 2.0 / (span as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut state = first;
    out.push(state);
    for &value in &values[1..] {
        state = alpha * value + (1.0 - alpha) * state;
        out.push(state);
    }
    out
}

/// EMA over a series with undefined entries. Leading None stays None; the first
/// defined value seeds the state; a None after seeding carries the previous
/// smoothed value forward unchanged.
pub fn ema_sparse(values: &[Option<f64>], span: usize) -> Vec<Option<f64>> {
    let alpha = 2.0 / (span as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut state: Option<f64> = None;
    for value in values {
        state = match (state, value) {
            (None, None) => None,
            (None, Some(v)) => Some(*v),
            (Some(s), None) => Some(s),
            (Some(s), Some(v)) => Some(alpha * v + (1.0 - alpha) * s),
        };
        out.push(state);
    }
    out
}

/// Per-bar indicator columns, index-aligned with the input candles.
#[derive(Debug, Clone)]
pub struct IndicatorColumns {
    pub rsi: Vec<Option<f64>>,
    pub ema_rsi_fast: Vec<Option<f64>>,
    pub ema_rsi_slow: Vec<Option<f64>>,
    pub ema_trend: Vec<Option<f64>>,
}

impl IndicatorColumns {
    pub fn compute(
        candles: &[Candle],
        rsi_period: usize,
        ema_fast: usize,
        ema_slow: usize,
        trend_ema: usize,
    ) -> Self {
        let closes: Vec<f64> = candles.iter().map(|candle| candle.close).collect();
        let rsi_col = rsi(&closes, rsi_period);
        let ema_rsi_fast = ema_sparse(&rsi_col, ema_fast);
        let ema_rsi_slow = ema_sparse(&rsi_col, ema_slow);
        let ema_trend = ema(&closes, trend_ema).into_iter().map(Some).collect();
        Self {
            rsi: rsi_col,
            ema_rsi_fast,
            ema_rsi_slow,
            ema_trend,
        }
    }
}
