// trading-core/src/backtest/strategy/mod.rs

pub mod base;
pub mod buy_and_hold;
pub mod random_walk;
pub mod rsi;
pub mod sma;

pub use base::{greedy_buy, liquidation_amount, Strategy};
pub use buy_and_hold::BuyAndHoldStrategy;
pub use random_walk::RandomWalkStrategy;
pub use rsi::{relative_strength_index, RSIStrategy};
pub use sma::SMAStrategy;

use serde::Serialize;

use super::errors::BacktestError;
use super::types::StrategyType;

/// Build a strategy instance. `seed` only affects the random walk.
pub fn create_strategy(
    strategy_type: &StrategyType,
    seed: Option<u64>,
) -> Result<Box<dyn Strategy>, BacktestError> {
    strategy_type.validate()?;

    let strategy: Box<dyn Strategy> = match strategy_type {
        StrategyType::BuyAndHold { sizing } => Box::new(BuyAndHoldStrategy::new(*sizing)),
        StrategyType::SmaCross {
            short_period,
            long_period,
            sell_fraction,
        } => Box::new(SMAStrategy::new(*short_period, *long_period, *sell_fraction)?),
        StrategyType::RsiCross {
            rs_period,
            lower_threshold,
            upper_threshold,
            sell_fraction,
        } => Box::new(RSIStrategy::new(
            *rs_period,
            *lower_threshold,
            *upper_threshold,
            *sell_fraction,
        )),
        StrategyType::RandomWalk => Box::new(RandomWalkStrategy::new(seed)),
    };
    Ok(strategy)
}

#[derive(Debug, Clone, Serialize)]
pub struct StrategyInfo {
    pub id: String,
    pub name: String,
    pub description: String,
}

pub fn list_strategies() -> Vec<StrategyInfo> {
    vec![
        StrategyInfo {
            id: "buy-and-hold".to_string(),
            name: "Buy and Hold".to_string(),
            description: "Spends all cash on the first day and holds".to_string(),
        },
        StrategyInfo {
            id: "percent-buy".to_string(),
            name: "Percent Buy and Hold".to_string(),
            description: "Spends 25% of cash on the first day and holds".to_string(),
        },
        StrategyInfo {
            id: "sma-cross".to_string(),
            name: "SMA Crossover".to_string(),
            description: "Short/long simple moving average crossover".to_string(),
        },
        StrategyInfo {
            id: "rsi-cross".to_string(),
            name: "RSI Crossover".to_string(),
            description: "RSI threshold crossings over a window of daily changes".to_string(),
        },
        StrategyInfo {
            id: "random-walk".to_string(),
            name: "Random Walk".to_string(),
            description: "Random daily buy/sell baseline".to_string(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backtest::types::PositionSizing;

    #[test]
    fn test_create_each_strategy() {
        let types = [
            StrategyType::default(),
            StrategyType::BuyAndHold {
                sizing: PositionSizing::Percent { fraction: 0.25 },
            },
            StrategyType::SmaCross {
                short_period: 5,
                long_period: 20,
                sell_fraction: 1.0,
            },
            StrategyType::RsiCross {
                rs_period: 14,
                lower_threshold: 30.0,
                upper_threshold: 70.0,
                sell_fraction: 1.0,
            },
            StrategyType::RandomWalk,
        ];
        let names: Vec<String> = types
            .iter()
            .map(|t| create_strategy(t, Some(7)).unwrap().name().to_string())
            .collect();
        assert_eq!(
            names,
            vec!["Buy and Hold", "Buy and Hold", "SMA Crossover", "RSI Crossover", "Random Walk"]
        );
    }

    #[test]
    fn test_create_rejects_invalid_parameters() {
        let invalid = StrategyType::SmaCross {
            short_period: 0,
            long_period: 20,
            sell_fraction: 1.0,
        };
        assert!(matches!(
            create_strategy(&invalid, None),
            Err(BacktestError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_list_strategies() {
        let ids: Vec<String> = list_strategies().into_iter().map(|s| s.id).collect();
        assert!(ids.contains(&"sma-cross".to_string()));
        assert_eq!(ids.len(), 5);
    }
}
