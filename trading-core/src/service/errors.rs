use thiserror::Error;
use trading_common::data::DataError;

use crate::backtest::BacktestError;

/// Service layer error types
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("Backtest error: {0}")]
    Backtest(#[from] BacktestError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Task error: {0}")]
    Task(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServiceError {
    /// Check if error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            ServiceError::Data(DataError::InvalidRange { .. }) => false,
            ServiceError::Data(_) => true, // Database hiccups usually pass on retry
            ServiceError::Task(_) => true,
            ServiceError::Io(_) => true,
            ServiceError::Backtest(_) => false,
            ServiceError::Config(_) => false,
            ServiceError::Validation(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_recoverable() {
        let data = ServiceError::from(DataError::NotFound("AAPL".to_string()));
        assert!(data.is_recoverable());

        let invalid = ServiceError::from(BacktestError::InvalidParameter("period".to_string()));
        assert!(!invalid.is_recoverable());
        assert!(!ServiceError::Config("missing url".to_string()).is_recoverable());
        assert!(!ServiceError::Validation("repetitions".to_string()).is_recoverable());

        let start = chrono::NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let end = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let range = ServiceError::from(DataError::InvalidRange { start, end });
        assert!(!range.is_recoverable());
    }
}
