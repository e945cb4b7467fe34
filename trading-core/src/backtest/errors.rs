use thiserror::Error;

use super::metrics::MetricsError;

/// Backtest layer error types
#[derive(Error, Debug)]
pub enum BacktestError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Metrics error: {0}")]
    Metrics(#[from] MetricsError),

    #[error("Indicator error: {0}")]
    Indicator(String),
}

impl From<ta::errors::TaError> for BacktestError {
    fn from(err: ta::errors::TaError) -> Self {
        BacktestError::Indicator(err.to_string())
    }
}
