use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::warn;

use vela_domain::repositories::market_data::{CandleHistory, HistoryQuery, HistoryReport};
use vela_domain::value_objects::candle::Candle;

/// Candle history backed by a CSV file with a `time,open,high,low,close`
/// header and RFC 3339 timestamps. Malformed or out-of-order rows are skipped
/// and counted, so a dirty file degrades instead of failing the run.
#[derive(Debug, Clone)]
pub struct CsvCandleHistory {
    path: PathBuf,
}

impl CsvCandleHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    time: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
}

impl CandleHistory for CsvCandleHistory {
    fn load_candles(&self, query: &HistoryQuery) -> Result<(Vec<Candle>, HistoryReport), String> {
        let mut reader = csv::Reader::from_path(&self.path)
            .map_err(|err| format!("failed to open candle csv {}: {}", self.path.display(), err))?;

        let mut candles = Vec::new();
        let mut report = HistoryReport::default();
        let mut last_start: Option<DateTime<Utc>> = None;

        for row in reader.deserialize::<CsvRow>() {
            let row = match row {
                Ok(row) => row,
                Err(err) => {
                    report.invalid_rows += 1;
                    warn!(error = %err, "skipping malformed candle row");
                    continue;
                }
            };

            let start_time = match DateTime::parse_from_rfc3339(&row.time) {
                Ok(parsed) => parsed.with_timezone(&Utc),
                Err(err) => {
                    report.invalid_rows += 1;
                    warn!(time = %row.time, error = %err, "skipping candle row with bad timestamp");
                    continue;
                }
            };
            if !(row.open.is_finite()
                && row.high.is_finite()
                && row.low.is_finite()
                && row.close.is_finite())
            {
                report.invalid_rows += 1;
                continue;
            }
            if start_time < query.start || start_time > query.end {
                continue;
            }
            if let Some(prev) = last_start {
                if start_time < prev {
                    report.out_of_order += 1;
                    continue;
                }
            }
            last_start = Some(start_time);

            candles.push(Candle {
                start_time,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
            });
        }

        report.rows = candles.len();
        Ok((candles, report))
    }
}
