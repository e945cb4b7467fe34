use std::collections::HashMap;
use trading_common::data::AssetData;

use crate::backtest::portfolio::Portfolio;

pub trait Strategy: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters(&self) -> &HashMap<String, String>;

    /// Drive `portfolio` through `bars` day by day, recording one
    /// mark-to-market entry per simulated day
    fn run(&mut self, ticker: &str, bars: &[AssetData], portfolio: &mut Portfolio);

    /// Reset strategy state for new backtest
    fn reset(&mut self) {
        // Default implementation does nothing
        // Strategies can override if needed
    }
}

/// Whole shares affordable with `cash` at `price`
pub fn greedy_buy(cash: f64, price: f64) -> f64 {
    if price <= 0.0 || cash <= 0.0 {
        return 0.0;
    }
    (cash / price).floor()
}

/// Whole shares to sell when liquidating `fraction` of a holding
pub fn liquidation_amount(held: f64, fraction: f64) -> f64 {
    (held * fraction).floor()
}

/// Run one trading day: value at the previous close, let `decide` trade,
/// value at the current close, then record the day.
pub(crate) fn simulate_day<F>(
    portfolio: &mut Portfolio,
    ticker: &str,
    previous: &AssetData,
    current: &AssetData,
    decide: F,
) where
    F: FnOnce(&mut Portfolio),
{
    let starting_value = portfolio.portfolio_value(ticker, previous.close);
    decide(portfolio);
    let ending_value = portfolio.portfolio_value(ticker, current.close);
    portfolio.adjust_portfolio_parameters(ticker, current, starting_value, ending_value);
}

pub(crate) fn parameter_map(pairs: &[(&str, String)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect()
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{Duration, NaiveDate};
    use trading_common::data::AssetData;

    /// Bars with flat OHLC at each close, one calendar day apart
    pub fn bars_from_closes(closes: &[f64]) -> Vec<AssetData> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, close)| {
                AssetData::new(start + Duration::days(i as i64), *close, *close, *close, *close, 1_000.0)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_greedy_buy() {
        assert_eq!(greedy_buy(10_000.0, 100.0), 100.0);
        assert_eq!(greedy_buy(1_050.0, 100.0), 10.0);
        assert_eq!(greedy_buy(99.0, 100.0), 0.0);
        assert_eq!(greedy_buy(100.0, 0.0), 0.0);
    }

    #[test]
    fn test_liquidation_amount() {
        assert_eq!(liquidation_amount(37.0, 1.0), 37.0);
        assert_eq!(liquidation_amount(37.0, 0.5), 18.0);
    }
}
