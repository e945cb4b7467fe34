// data/provider.rs

use super::types::{AssetData, DataError, RiskFreeRates};
use async_trait::async_trait;
use chrono::NaiveDate;

/// Trading days per year assumed when sizing the ticker universe
const TRADING_DAYS_PER_YEAR: f64 = 250.0;

/// Historical data source consumed by the backtester
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// Daily bars for `ticker` between `start` and `end` (inclusive), ascending by date
    async fn query_asset_data(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<AssetData>, DataError>;

    /// Daily risk-free rates in range. Dates without a valid rate are omitted.
    async fn get_risk_free_rates(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RiskFreeRates, DataError>;

    /// Tickers having at least `required_data_points(start, end)` bars in range
    async fn get_tickers_with_sufficient_data(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<String>, DataError>;
}

/// Minimum bar count a ticker needs to be simulated: floor(years * 250)
pub fn required_data_points(start: NaiveDate, end: NaiveDate) -> usize {
    let days = (end - start).num_days().max(0) as f64;
    let years = days / 365.0;
    (years * TRADING_DAYS_PER_YEAR).floor() as usize
}

pub(crate) fn validate_range(start: NaiveDate, end: NaiveDate) -> Result<(), DataError> {
    if start > end {
        return Err(DataError::InvalidRange { start, end });
    }
    Ok(())
}
