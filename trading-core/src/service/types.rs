use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use uuid::Uuid;

use crate::backtest::BacktestResult;

/// Counters for one runner invocation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Tickers in the resolved universe
    pub tickers: usize,
    /// Work items enqueued (tickers x repetitions)
    pub total_items: usize,
    /// Simulations that produced a result
    pub completed: usize,
    /// Work items dropped for missing data or an empty simulation
    pub skipped: usize,
    /// Results above the Sharpe threshold
    pub qualifying: usize,
    /// Qualifying results that could not be written out
    pub write_failures: usize,
}

/// Everything a caller gets back from a completed run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub strategy: String,
    pub started_at: DateTime<Utc>,
    #[serde(with = "duration_millis")]
    pub elapsed: Duration,
    pub stats: RunStats,
    /// Sorted by ticker, then repetition
    pub results: Vec<BacktestResult>,
}

impl RunSummary {
    pub fn qualifying_results(&self, sharpe_threshold: f64) -> impl Iterator<Item = &BacktestResult> {
        self.results
            .iter()
            .filter(move |r| r.metrics.sharpe_ratio > sharpe_threshold)
    }
}

mod duration_millis {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }
}
