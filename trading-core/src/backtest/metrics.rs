// trading-core/src/backtest/metrics.rs

use thiserror::Error;
use trading_common::data::RiskFreeRates;

use super::types::{DailyReturn, Metrics};

/// Trading days used to annualize daily statistics
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

// Identical samples can leave rounding noise in the deviation
const MIN_DEVIATION: f64 = 1e-12;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum MetricsError {
    #[error("Simulation produced no trading days")]
    EmptySeries,
}

/// Turns a finished simulation's series into annualized metrics
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsCalculator;

impl MetricsCalculator {
    pub fn new() -> Self {
        Self
    }

    pub fn calculate(
        &self,
        daily_returns: &[DailyReturn],
        close_values: &[f64],
        risk_free_rates: &RiskFreeRates,
    ) -> Result<Metrics, MetricsError> {
        if daily_returns.is_empty() || close_values.is_empty() {
            return Err(MetricsError::EmptySeries);
        }

        let returns: Vec<f64> = daily_returns.iter().map(|r| r.value).collect();
        let excess = excess_returns(daily_returns, risk_free_rates);

        Ok(Metrics {
            sharpe_ratio: sharpe_ratio(&excess),
            sortino_ratio: sortino_ratio(&excess),
            max_drawdown: max_drawdown(close_values)?,
            annual_return: annual_return(&returns)?,
            standard_dev: annualized_std_dev(&returns),
        })
    }
}

/// Daily return minus the risk-free rate, for dates present in both series
pub fn excess_returns(daily_returns: &[DailyReturn], risk_free_rates: &RiskFreeRates) -> Vec<f64> {
    daily_returns
        .iter()
        .filter_map(|r| risk_free_rates.get(&r.date).map(|rate| r.value - rate))
        .collect()
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample (n - 1) standard deviation. Undefined below two samples.
pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let avg = mean(values)?;
    let variance =
        values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

/// Annualized Sharpe ratio of the excess returns; 0 when it is undefined
pub fn sharpe_ratio(excess_returns: &[f64]) -> f64 {
    let (Some(avg), Some(deviation)) = (mean(excess_returns), sample_std_dev(excess_returns))
    else {
        return 0.0;
    };
    if deviation < MIN_DEVIATION || !deviation.is_finite() {
        return 0.0;
    }
    avg / deviation * TRADING_DAYS_PER_YEAR.sqrt()
}

/// Annualized Sortino ratio, penalizing only negative excess returns
pub fn sortino_ratio(excess_returns: &[f64]) -> f64 {
    let downside: Vec<f64> = excess_returns.iter().copied().filter(|r| *r < 0.0).collect();
    if downside.is_empty() {
        return 0.0;
    }
    let (Some(avg), Some(deviation)) = (mean(excess_returns), sample_std_dev(&downside)) else {
        return 0.0;
    };
    if deviation < MIN_DEVIATION || !deviation.is_finite() {
        return 0.0;
    }
    avg / deviation * TRADING_DAYS_PER_YEAR.sqrt()
}

/// Largest peak-to-trough decline as a non-positive percentage.
///
/// The last two values are never peak candidates, so a decline is always
/// measured over at least one following day.
pub fn max_drawdown(close_values: &[f64]) -> Result<f64, MetricsError> {
    let first = *close_values.first().ok_or(MetricsError::EmptySeries)?;

    let last_candidate = close_values.len().saturating_sub(2);
    let mut peak = first;
    let mut peak_index = 0;
    for (i, value) in close_values.iter().enumerate().take(last_candidate) {
        if *value > peak {
            peak = *value;
            peak_index = i;
        }
    }

    let trough = close_values[peak_index + 1..]
        .iter()
        .fold(peak, |min, value| min.min(*value));

    if peak <= 0.0 {
        return Ok(0.0);
    }
    Ok(((trough - peak) / peak * 100.0).min(0.0))
}

/// Compound annual growth rate of the daily returns, as a percentage
pub fn annual_return(daily_returns: &[f64]) -> Result<f64, MetricsError> {
    if daily_returns.is_empty() {
        return Err(MetricsError::EmptySeries);
    }
    let cumulative: f64 = daily_returns.iter().map(|r| 1.0 + r).product();
    let years = daily_returns.len() as f64 / TRADING_DAYS_PER_YEAR;
    Ok((cumulative.powf(1.0 / years) - 1.0) * 100.0)
}

/// Sample standard deviation of daily returns, annualized
pub fn annualized_std_dev(daily_returns: &[f64]) -> f64 {
    sample_std_dev(daily_returns).map_or(0.0, |deviation| {
        deviation * TRADING_DAYS_PER_YEAR.sqrt()
    })
}
