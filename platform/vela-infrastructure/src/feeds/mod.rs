use chrono::{DateTime, Duration, Timelike, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use vela_domain::repositories::market_stream::TickSource;
use vela_domain::value_objects::tick::Tick;

pub const MIN_TICK_INTERVAL_SECS: f64 = 0.5;
pub const PRICE_FLOOR: f64 = 1.0;

/// Bounded random walk over a synthetic clock. Each tick moves the price by a
/// uniform step in [-0.5, 0.5], floored at 1.0, and advances the timestamp by
/// the configured interval (never below half a second).
#[derive(Debug, Clone)]
pub struct SyntheticTickFeed {
    current_price: f64,
    current_time: DateTime<Utc>,
    tick_interval: Duration,
    rng: StdRng,
}

impl SyntheticTickFeed {
    pub fn new(start_price: f64, tick_interval_secs: f64) -> Self {
        let start_time = Utc::now()
            .with_second(0)
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or_else(Utc::now);
        Self::build(start_price, tick_interval_secs, start_time, StdRng::from_entropy())
    }

    pub fn seeded(
        start_price: f64,
        tick_interval_secs: f64,
        start_time: DateTime<Utc>,
        seed: u64,
    ) -> Self {
        Self::build(
            start_price,
            tick_interval_secs,
            start_time,
            StdRng::seed_from_u64(seed),
        )
    }

    fn build(
        start_price: f64,
        tick_interval_secs: f64,
        start_time: DateTime<Utc>,
        rng: StdRng,
    ) -> Self {
        let interval_secs = tick_interval_secs.max(MIN_TICK_INTERVAL_SECS);
        Self {
            current_price: start_price.max(PRICE_FLOOR),
            current_time: start_time,
            tick_interval: Duration::milliseconds((interval_secs * 1000.0) as i64),
            rng,
        }
    }
}

impl TickSource for SyntheticTickFeed {
    fn next_tick(&mut self) -> Tick {
        let step: f64 = self.rng.gen_range(-0.5..=0.5);
        self.current_price = (self.current_price + step).max(PRICE_FLOOR);
        self.current_time += self.tick_interval;
        Tick {
            price: self.current_price,
            timestamp: self.current_time,
        }
    }
}
