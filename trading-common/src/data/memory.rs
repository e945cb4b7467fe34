// data/memory.rs

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};

use super::provider::{required_data_points, validate_range, DataProvider};
use super::types::{AssetData, DataError, RiskFreeRates};

/// Data provider holding every series in memory.
///
/// Used for tests, benchmarks and offline runs. Tickers registered through
/// [`InMemoryDataProvider::with_failing_ticker`] fail every bar query, which
/// mimics a flaky database.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDataProvider {
    series: HashMap<String, Vec<AssetData>>,
    risk_free_rates: RiskFreeRates,
    failing: HashSet<String>,
}

impl InMemoryDataProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a series; bars are sorted by date on insertion
    pub fn with_series(mut self, ticker: impl Into<String>, mut bars: Vec<AssetData>) -> Self {
        bars.sort_by_key(|bar| bar.date);
        self.series.insert(ticker.into(), bars);
        self
    }

    pub fn with_risk_free_rates(mut self, rates: RiskFreeRates) -> Self {
        self.risk_free_rates = rates;
        self
    }

    pub fn with_failing_ticker(mut self, ticker: impl Into<String>) -> Self {
        self.failing.insert(ticker.into());
        self
    }

    fn bars_in_range(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> Vec<AssetData> {
        self.series
            .get(ticker)
            .map(|bars| {
                bars.iter()
                    .filter(|bar| bar.date >= start && bar.date <= end)
                    .copied()
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl DataProvider for InMemoryDataProvider {
    async fn query_asset_data(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<AssetData>, DataError> {
        validate_range(start, end)?;
        if self.failing.contains(ticker) {
            return Err(DataError::NotFound(format!("series for {}", ticker)));
        }
        Ok(self.bars_in_range(ticker, start, end))
    }

    async fn get_risk_free_rates(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RiskFreeRates, DataError> {
        validate_range(start, end)?;
        Ok(self
            .risk_free_rates
            .range(start..=end)
            .map(|(date, rate)| (*date, *rate))
            .collect())
    }

    async fn get_tickers_with_sufficient_data(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<String>, DataError> {
        validate_range(start, end)?;
        let required = required_data_points(start, end);

        let mut tickers: Vec<String> = self
            .series
            .keys()
            .filter(|ticker| self.bars_in_range(ticker, start, end).len() >= required)
            .cloned()
            .collect();
        tickers.sort();
        Ok(tickers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn bars(start: NaiveDate, count: usize) -> Vec<AssetData> {
        (0..count)
            .map(|i| {
                let price = 100.0 + i as f64;
                AssetData::new(start + Duration::days(i as i64), price, price, price, price, 1.0)
            })
            .collect()
    }

    #[tokio::test]
    async fn test_query_filters_and_orders() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut series = bars(start, 10);
        series.reverse();
        let provider = InMemoryDataProvider::new().with_series("AAA", series);

        let result = provider
            .query_asset_data("AAA", start + Duration::days(2), start + Duration::days(5))
            .await
            .unwrap();
        assert_eq!(result.len(), 4);
        assert!(result.windows(2).all(|w| w[0].date < w[1].date));

        let missing = provider.query_asset_data("ZZZ", start, start).await.unwrap();
        assert!(missing.is_empty());
    }

    #[tokio::test]
    async fn test_failing_ticker() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let provider = InMemoryDataProvider::new()
            .with_series("AAA", bars(start, 5))
            .with_failing_ticker("AAA");
        assert!(provider.query_asset_data("AAA", start, start).await.is_err());
    }

    #[tokio::test]
    async fn test_sufficient_data_and_rates() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let mut rates = RiskFreeRates::new();
        rates.insert(start - Duration::days(1), 0.5);
        rates.insert(start, 0.0001);

        let provider = InMemoryDataProvider::new()
            .with_series("LONG", bars(start, 300))
            .with_series("SHORT", bars(start, 100))
            .with_risk_free_rates(rates);

        let tickers = provider
            .get_tickers_with_sufficient_data(start, end)
            .await
            .unwrap();
        assert_eq!(tickers, vec!["LONG".to_string()]);

        let in_range = provider.get_risk_free_rates(start, end).await.unwrap();
        assert_eq!(in_range.len(), 1);
        assert_eq!(in_range.get(&start), Some(&0.0001));
    }
}
