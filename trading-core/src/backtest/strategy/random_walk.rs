use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use trading_common::data::AssetData;

use super::base::{greedy_buy, simulate_day, Strategy};
use crate::backtest::portfolio::Portfolio;

/// Random buy/sell baseline. Owns its generator so parallel workers never
/// share a stream.
pub struct RandomWalkStrategy {
    rng: StdRng,
    parameters: HashMap<String, String>,
}

impl RandomWalkStrategy {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut parameters = HashMap::new();
        if let Some(seed) = seed {
            parameters.insert("seed".to_string(), seed.to_string());
        }
        Self { rng, parameters }
    }
}

impl Strategy for RandomWalkStrategy {
    fn name(&self) -> &str {
        "Random Walk"
    }

    fn description(&self) -> &str {
        "Flips a coin each day to buy or sell a random share of cash or holdings"
    }

    fn parameters(&self) -> &HashMap<String, String> {
        &self.parameters
    }

    fn run(&mut self, ticker: &str, bars: &[AssetData], portfolio: &mut Portfolio) {
        for window in bars.windows(2) {
            let (previous, current) = (&window[0], &window[1]);
            let size: f64 = self.rng.gen();
            let coin: f64 = self.rng.gen();

            simulate_day(portfolio, ticker, previous, current, |portfolio| {
                if coin >= 0.5 {
                    let amount = greedy_buy(portfolio.buying_power() * size, current.close);
                    portfolio.buy(ticker, amount, current.close, current.date);
                } else {
                    let held = portfolio.held_amount(ticker);
                    if held > 0.0 {
                        portfolio.sell(ticker, (held * size).floor(), current.close, current.date);
                    }
                }
            });
        }
    }
}
