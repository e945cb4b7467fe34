// trading-core/src/backtest/strategy/sma.rs

use std::collections::HashMap;
use ta::indicators::SimpleMovingAverage;
use ta::{Next, Reset};
use trading_common::data::AssetData;

use super::base::{greedy_buy, liquidation_amount, parameter_map, simulate_day, Strategy};
use crate::backtest::errors::BacktestError;
use crate::backtest::portfolio::Portfolio;

/// Moving average crossover over the closes preceding each day
pub struct SMAStrategy {
    short_period: usize,
    long_period: usize,
    sell_fraction: f64,
    short_ma: SimpleMovingAverage,
    long_ma: SimpleMovingAverage,
    parameters: HashMap<String, String>,
}

impl SMAStrategy {
    pub fn new(
        short_period: usize,
        long_period: usize,
        sell_fraction: f64,
    ) -> Result<Self, BacktestError> {
        let parameters = parameter_map(&[
            ("short_period", short_period.to_string()),
            ("long_period", long_period.to_string()),
            ("sell_fraction", sell_fraction.to_string()),
        ]);

        Ok(Self {
            short_period,
            long_period,
            sell_fraction,
            short_ma: SimpleMovingAverage::new(short_period)?,
            long_ma: SimpleMovingAverage::new(long_period)?,
            parameters,
        })
    }

    /// Push one close into both windows, returning the (short, long) averages
    fn calculate_ma(&mut self, price: f64) -> (f64, f64) {
        (self.short_ma.next(price), self.long_ma.next(price))
    }
}

impl Strategy for SMAStrategy {
    fn name(&self) -> &str {
        "SMA Crossover"
    }

    fn description(&self) -> &str {
        "Buys when the short moving average crosses above the long one, sells on the reverse cross"
    }

    fn parameters(&self) -> &HashMap<String, String> {
        &self.parameters
    }

    fn run(&mut self, ticker: &str, bars: &[AssetData], portfolio: &mut Portfolio) {
        self.reset();
        if bars.len() <= self.long_period || self.short_period > self.long_period {
            return;
        }

        // Warm up on [0, long); averages at day i always cover the days before i
        let mut averages = (0.0, 0.0);
        for bar in &bars[..self.long_period] {
            averages = self.calculate_ma(bar.close);
        }

        let mut previous: Option<(f64, f64)> = None;
        for i in self.long_period..bars.len() {
            let current = &bars[i];
            let (short, long) = averages;
            let sell_fraction = self.sell_fraction;

            simulate_day(portfolio, ticker, &bars[i - 1], current, |portfolio| {
                // First evaluated day has nothing to cross from
                let Some((prev_short, prev_long)) = previous else {
                    return;
                };
                let price = current.typical_price();

                if short > long && prev_short <= prev_long {
                    // Golden cross
                    let amount = greedy_buy(portfolio.buying_power(), price);
                    portfolio.buy(ticker, amount, price, current.date);
                } else if short < long && prev_short >= prev_long {
                    // Death cross
                    let amount = liquidation_amount(portfolio.held_amount(ticker), sell_fraction);
                    portfolio.sell(ticker, amount, price, current.date);
                }
            });

            previous = Some((short, long));
            averages = self.calculate_ma(current.close);
        }
    }

    fn reset(&mut self) {
        self.short_ma.reset();
        self.long_ma.reset();
    }
}
