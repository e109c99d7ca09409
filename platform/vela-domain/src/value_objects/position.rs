use chrono::{DateTime, Utc};

use crate::value_objects::direction::Direction;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub direction: Direction,
    pub entry_price: f64,
    pub entry_time: DateTime<Utc>,
    pub highest_price_seen: f64,
    pub lowest_price_seen: f64,
}

impl Position {
    pub fn open(direction: Direction, entry_price: f64, entry_time: DateTime<Utc>) -> Self {
        Self {
            direction,
            entry_price,
            entry_time,
            highest_price_seen: entry_price,
            lowest_price_seen: entry_price,
        }
    }
}
