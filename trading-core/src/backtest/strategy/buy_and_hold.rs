use std::collections::HashMap;
use trading_common::data::AssetData;

use super::base::{greedy_buy, parameter_map, simulate_day, Strategy};
use crate::backtest::portfolio::Portfolio;
use crate::backtest::types::PositionSizing;

/// Buys once on the first day, then holds while marking to market
pub struct BuyAndHoldStrategy {
    sizing: PositionSizing,
    parameters: HashMap<String, String>,
}

impl BuyAndHoldStrategy {
    pub fn new(sizing: PositionSizing) -> Self {
        let parameters = match sizing {
            PositionSizing::Greedy => parameter_map(&[("sizing", "greedy".to_string())]),
            PositionSizing::Percent { fraction } => parameter_map(&[
                ("sizing", "percent".to_string()),
                ("fraction", fraction.to_string()),
            ]),
        };
        Self { sizing, parameters }
    }
}

impl Strategy for BuyAndHoldStrategy {
    fn name(&self) -> &str {
        "Buy and Hold"
    }

    fn description(&self) -> &str {
        "Invests on the first day at the close and holds until the end of the period"
    }

    fn parameters(&self) -> &HashMap<String, String> {
        &self.parameters
    }

    fn run(&mut self, ticker: &str, bars: &[AssetData], portfolio: &mut Portfolio) {
        let Some(first) = bars.first() else {
            return;
        };
        let cash = self.sizing.cash_to_commit(portfolio.buying_power());
        portfolio.buy(ticker, greedy_buy(cash, first.close), first.close, first.date);

        for window in bars.windows(2) {
            simulate_day(portfolio, ticker, &window[0], &window[1], |_| {});
        }
    }
}
