// trading-core/src/backtest/engine.rs

use std::sync::Arc;
use tracing::debug;
use trading_common::data::{AssetData, RiskFreeRates};

use super::errors::BacktestError;
use super::metrics::MetricsCalculator;
use super::portfolio::Portfolio;
use super::strategy::{create_strategy, Strategy};
use super::types::{BacktestConfig, Metrics};

/// Worker-owned simulation context: one portfolio and one strategy instance,
/// reused across every simulation the worker performs.
pub struct BacktestEngine {
    initial_capital: f64,
    portfolio: Portfolio,
    strategy: Box<dyn Strategy>,
    metrics_calculator: MetricsCalculator,
    risk_free_rates: Arc<RiskFreeRates>,
}

impl BacktestEngine {
    pub fn new(
        config: &BacktestConfig,
        risk_free_rates: Arc<RiskFreeRates>,
        seed: Option<u64>,
    ) -> Result<Self, BacktestError> {
        let strategy = create_strategy(&config.strategy, seed)?;
        Ok(Self::with_strategy(
            strategy,
            config.buying_power,
            config.days(),
            risk_free_rates,
        ))
    }

    pub fn with_strategy(
        strategy: Box<dyn Strategy>,
        initial_capital: f64,
        days: usize,
        risk_free_rates: Arc<RiskFreeRates>,
    ) -> Self {
        Self {
            initial_capital,
            portfolio: Portfolio::with_capacity(initial_capital, days),
            strategy,
            metrics_calculator: MetricsCalculator::new(),
            risk_free_rates,
        }
    }

    /// Simulate one ticker from a fresh portfolio and compute its metrics
    pub fn run(&mut self, ticker: &str, bars: &[AssetData]) -> Result<Metrics, BacktestError> {
        self.portfolio.reset(self.initial_capital);
        self.strategy.reset();

        self.strategy.run(ticker, bars, &mut self.portfolio);
        debug!(
            "{} simulated {} days with {}",
            ticker,
            self.portfolio.daily_returns().len(),
            self.strategy.name()
        );

        let metrics = self.metrics_calculator.calculate(
            self.portfolio.daily_returns(),
            self.portfolio.close_values(),
            &self.risk_free_rates,
        )?;
        self.portfolio.set_metrics(metrics);
        self.portfolio.log_summary();
        Ok(metrics)
    }

    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }
}
