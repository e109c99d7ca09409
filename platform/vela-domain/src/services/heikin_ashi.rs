use crate::value_objects::candle::Candle;

/// Streaming Heikin Ashi conversion. Each output candle depends on the previous
/// converted candle, so ordering matters and the converter holds that state.
#[derive(Debug, Default, Clone)]
pub struct HeikinAshiConverter {
    previous: Option<(f64, f64)>,
}

impl HeikinAshiConverter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn convert_next(&mut self, candle: &Candle) -> Candle {
        let ha_close = (candle.open + candle.high + candle.low + candle.close) / 4.0;
        let ha_open = match self.previous {
            None => (candle.open + candle.close) / 2.0,
            Some((prev_open, prev_close)) => (prev_open + prev_close) / 2.0,
        };
        let ha_high = candle.high.max(ha_open).max(ha_close);
        let ha_low = candle.low.min(ha_open).min(ha_close);
        self.previous = Some((ha_open, ha_close));
        Candle {
            start_time: candle.start_time,
            open: ha_open,
            high: ha_high,
            low: ha_low,
            close: ha_close,
        }
    }
}

pub fn convert(candles: &[Candle]) -> Vec<Candle> {
    let mut converter = HeikinAshiConverter::new();
    candles
        .iter()
        .map(|candle| converter.convert_next(candle))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn candle(open: f64, high: f64, low: f64, close: f64) -> Candle {
        Candle {
            start_time: Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap(),
            open,
            high,
            low,
            close,
        }
    }

    #[test]
    fn first_candle_seeds_open_from_raw_midpoint() {
        let out = convert(&[candle(100.0, 110.0, 90.0, 104.0)]);
        assert_eq!(out[0].open, 102.0);
        assert_eq!(out[0].close, 101.0);
        assert_eq!(out[0].high, 110.0);
        assert_eq!(out[0].low, 90.0);
    }

    #[test]
    fn later_candles_chain_from_previous_converted_values() {
        let out = convert(&[
            candle(100.0, 110.0, 90.0, 104.0),
            candle(104.0, 112.0, 102.0, 110.0),
        ]);
        // (prev ha_open + prev ha_close) / 2 = (102 + 101) / 2
        assert_eq!(out[1].open, 101.5);
        assert_eq!(out[1].close, 107.0);
        assert_eq!(out[1].high, 112.0);
        assert_eq!(out[1].low, 101.5);
    }

    #[test]
    fn high_and_low_bracket_open_and_close() {
        let out = convert(&[
            candle(10.0, 10.5, 9.5, 10.2),
            candle(10.2, 10.3, 10.1, 10.25),
        ]);
        for ha in &out {
            assert!(ha.high >= ha.open.max(ha.close));
            assert!(ha.low <= ha.open.min(ha.close));
        }
    }
}
