// trading-core/src/backtest/strategy/rsi.rs

use std::collections::{HashMap, VecDeque};
use trading_common::data::AssetData;

use super::base::{greedy_buy, liquidation_amount, parameter_map, simulate_day, Strategy};
use crate::backtest::portfolio::Portfolio;

/// RSI over a window of fractional daily changes.
///
/// Both sums are averaged over `rs_period` and negative changes keep their
/// sign, so a window mixing gains and losses yields a negative RS and a
/// value outside [0, 100]. A window with no losses gives 100, one with
/// no gains gives 0.
pub fn relative_strength_index(changes: &[f64], rs_period: usize) -> f64 {
    let period = rs_period as f64;
    let up: f64 = changes.iter().filter(|c| **c >= 0.0).sum::<f64>() / period;
    let down: f64 = changes.iter().filter(|c| **c < 0.0).sum::<f64>() / period;
    let rs = up / down;
    100.0 - 100.0 / (1.0 + rs)
}

pub struct RSIStrategy {
    rs_period: usize,
    lower_threshold: f64,
    upper_threshold: f64,
    sell_fraction: f64,
    changes: VecDeque<f64>,
    previous_rsi: f64,
    parameters: HashMap<String, String>,
}

impl RSIStrategy {
    pub fn new(
        rs_period: usize,
        lower_threshold: f64,
        upper_threshold: f64,
        sell_fraction: f64,
    ) -> Self {
        let parameters = parameter_map(&[
            ("rs_period", rs_period.to_string()),
            ("lower_threshold", lower_threshold.to_string()),
            ("upper_threshold", upper_threshold.to_string()),
            ("sell_fraction", sell_fraction.to_string()),
        ]);

        Self {
            rs_period,
            lower_threshold,
            upper_threshold,
            sell_fraction,
            changes: VecDeque::with_capacity(rs_period + 1),
            previous_rsi: 0.0,
            parameters,
        }
    }
}

impl Strategy for RSIStrategy {
    fn name(&self) -> &str {
        "RSI Crossover"
    }

    fn description(&self) -> &str {
        "Buys when RSI crosses above the upper threshold, sells when it crosses below the lower one"
    }

    fn parameters(&self) -> &HashMap<String, String> {
        &self.parameters
    }

    fn run(&mut self, ticker: &str, bars: &[AssetData], portfolio: &mut Portfolio) {
        self.reset();
        if self.rs_period == 0 {
            return;
        }

        for i in 1..bars.len() {
            let previous = &bars[i - 1];
            let current = &bars[i];
            let change = (current.close - previous.close) / previous.close;

            // Warm-up: fill the window with the first rs_period changes
            if self.changes.len() < self.rs_period {
                self.changes.push_back(change);
                continue;
            }

            let rsi = relative_strength_index(self.changes.make_contiguous(), self.rs_period);
            let previous_rsi = self.previous_rsi;
            let (lower, upper) = (self.lower_threshold, self.upper_threshold);
            let sell_fraction = self.sell_fraction;

            simulate_day(portfolio, ticker, previous, current, |portfolio| {
                let price = current.close;
                if rsi > upper && previous_rsi <= upper {
                    let amount = greedy_buy(portfolio.buying_power(), price);
                    portfolio.buy(ticker, amount, price, current.date);
                } else if rsi < lower && previous_rsi >= lower {
                    let amount = liquidation_amount(portfolio.held_amount(ticker), sell_fraction);
                    portfolio.sell(ticker, amount, price, current.date);
                }
            });

            self.previous_rsi = rsi;
            self.changes.pop_front();
            self.changes.push_back(change);
        }
    }

    fn reset(&mut self) {
        self.changes.clear();
        self.previous_rsi = 0.0;
    }
}
