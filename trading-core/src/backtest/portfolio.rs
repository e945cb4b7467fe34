// trading-core/src/backtest/portfolio.rs

use chrono::NaiveDate;
use std::collections::HashMap;
use tracing::debug;
use trading_common::data::AssetData;

use super::types::{DailyReturn, Metrics};

/// Holding in a single ticker. Only exists while `amount > 0`.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub amount: f64,
    pub average_price: f64,
    pub current_price: f64,
}

/// Simulation state: cash, open positions and the per-day series.
///
/// Each worker owns one portfolio and calls [`Portfolio::reset`] between
/// simulations so the series buffers keep their allocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    buying_power: f64,
    positions: HashMap<String, Position>,
    daily_returns: Vec<DailyReturn>,
    close_values: Vec<f64>,
    metrics: Metrics,
}

impl Portfolio {
    pub fn new(buying_power: f64) -> Self {
        Self::with_capacity(buying_power, 0)
    }

    /// Pre-size both series for a run spanning `days` calendar days
    pub fn with_capacity(buying_power: f64, days: usize) -> Self {
        Self {
            buying_power,
            positions: HashMap::new(),
            daily_returns: Vec::with_capacity(days),
            close_values: Vec::with_capacity(days),
            metrics: Metrics::default(),
        }
    }

    pub fn reset(&mut self, buying_power: f64) {
        self.buying_power = buying_power;
        self.positions.clear();
        self.daily_returns.clear();
        self.close_values.clear();
        self.metrics = Metrics::default();
    }

    pub fn buying_power(&self) -> f64 {
        self.buying_power
    }

    pub fn positions(&self) -> &HashMap<String, Position> {
        &self.positions
    }

    pub fn daily_returns(&self) -> &[DailyReturn] {
        &self.daily_returns
    }

    pub fn close_values(&self) -> &[f64] {
        &self.close_values
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn set_metrics(&mut self, metrics: Metrics) {
        self.metrics = metrics;
    }

    pub fn find_position(&self, ticker: &str) -> Option<&Position> {
        self.positions.get(ticker)
    }

    /// Shares currently held in `ticker`, 0 without a position
    pub fn held_amount(&self, ticker: &str) -> f64 {
        self.find_position(ticker).map_or(0.0, |pos| pos.amount)
    }

    pub fn deposit(&mut self, cash: f64) {
        self.buying_power += cash;
    }

    pub fn withdraw(&mut self, cash: f64) {
        self.buying_power -= cash;
    }

    /// Buy `amount` shares at `price`. Ignored when the amount is zero or the
    /// cash does not cover it.
    pub fn buy(&mut self, ticker: &str, amount: f64, price: f64, date: NaiveDate) {
        let cost = amount * price;
        if amount <= 0.0 || self.buying_power < cost {
            return;
        }

        match self.positions.get_mut(ticker) {
            Some(pos) => {
                pos.average_price =
                    (pos.average_price * pos.amount + price * amount) / (pos.amount + amount);
                pos.amount += amount;
            }
            None => {
                self.positions.insert(
                    ticker.to_string(),
                    Position {
                        amount,
                        average_price: price,
                        current_price: 0.0,
                    },
                );
            }
        }

        debug!(
            target: "transactions",
            "BUY: {}, Amount: {:.2}, Price: {:.2}, Date: {}",
            ticker, amount, price, date
        );
        self.withdraw(cost);
    }

    /// Sell `amount` shares at `price`. Ignored without a position or when
    /// fewer shares are held than requested.
    pub fn sell(&mut self, ticker: &str, amount: f64, price: f64, date: NaiveDate) {
        if amount <= 0.0 {
            return;
        }
        let Some(pos) = self.positions.get_mut(ticker) else {
            return;
        };
        if pos.amount <= 0.0 || pos.amount < amount {
            return;
        }

        debug!(
            target: "transactions",
            "SELL: {}, Amount: {:.2}, Price: {:.2}, Date: {}",
            ticker, amount, price, date
        );
        pos.amount -= amount;
        if pos.amount == 0.0 {
            self.positions.remove(ticker);
        }
        self.deposit(amount * price);
    }

    /// Cash plus the `ticker` holding marked at `price`
    pub fn portfolio_value(&self, ticker: &str, price: f64) -> f64 {
        self.buying_power + self.held_amount(ticker) * price
    }

    /// Record one simulated trading day. Must be called once per day, in
    /// date order, after the day's trading decision.
    pub fn adjust_portfolio_parameters(
        &mut self,
        ticker: &str,
        day: &AssetData,
        starting_value: f64,
        ending_value: f64,
    ) {
        // Nothing invested before the first buy, so no return to measure
        let daily_change = if starting_value > 0.0 {
            (ending_value - starting_value) / starting_value
        } else {
            0.0
        };
        debug!(target: "transactions", "dailyChange: {:.4}", daily_change * 100.0);

        self.daily_returns.push(DailyReturn {
            date: day.date,
            value: daily_change,
        });
        self.close_values.push(ending_value);

        if let Some(pos) = self.positions.get_mut(ticker) {
            pos.current_price = day.close;
        }
    }

    /// Log cash, open positions and the last computed metrics
    pub fn log_summary(&self) {
        debug!("Buying Power: {:.2}", self.buying_power);
        if self.positions.is_empty() {
            debug!("No positions");
        }
        for (ticker, pos) in &self.positions {
            debug!(
                "Ticker: {}, Amount: {:.2}, Average Price: {:.2}, Current Price: {:.2}, Value: {:.2}",
                ticker,
                pos.amount,
                pos.average_price,
                pos.current_price,
                pos.amount * pos.current_price + self.buying_power
            );
        }
        debug!(
            "Sharpe Ratio: {:.2}, Sortino Ratio: {:.2}, Max Drawdown: {:.2}, Annual Return: {:.2}, Standard Deviation: {:.4}",
            self.metrics.sharpe_ratio,
            self.metrics.sortino_ratio,
            self.metrics.max_drawdown,
            self.metrics.annual_return,
            self.metrics.standard_dev
        );
    }
}
