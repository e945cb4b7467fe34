// =================================================================
// data/types.rs - Market Data Types
// =================================================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// One day's OHLCV bar for a ticker
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AssetData {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl AssetData {
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Typical price of the day, (low + high + close) / 3
    pub fn typical_price(&self) -> f64 {
        (self.low + self.high + self.close) / 3.0
    }
}

/// Daily risk-free rate keyed by date, iterated in date order
pub type RiskFreeRates = BTreeMap<NaiveDate, f64>;

/// Error types for data access
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid date range: {start} is after {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("No data found: {0}")]
    NotFound(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typical_price() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let bar = AssetData::new(date, 10.0, 12.0, 9.0, 12.0, 1000.0);
        assert!((bar.typical_price() - 11.0).abs() < 1e-12);
    }
}
