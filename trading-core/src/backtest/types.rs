// trading-core/src/backtest/types.rs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::errors::BacktestError;

/// Fraction of cash committed by the "percent" buy-and-hold variant
pub const DEFAULT_PERCENT_BUY: f64 = 0.25;

/// Sharpe ratio a result must exceed to be written out
pub const DEFAULT_SHARPE_THRESHOLD: f64 = 1.0;

// Run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub buying_power: f64,
    /// Number of times every ticker is simulated
    pub repetitions: usize,
    pub strategy: StrategyType,
    pub sharpe_threshold: f64,
    /// Append-only file receiving qualifying tickers
    pub output_path: PathBuf,
    /// Worker count, 0 means one per CPU
    pub workers: usize,
    /// Base seed for worker-local random sources; random when unset
    pub seed: Option<u64>,
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<(), BacktestError> {
        if self.start_date >= self.end_date {
            return Err(BacktestError::InvalidParameter(format!(
                "start date {} must be before end date {}",
                self.start_date, self.end_date
            )));
        }
        if !self.buying_power.is_finite() || self.buying_power <= 0.0 {
            return Err(BacktestError::InvalidParameter(format!(
                "buying power must be positive, got {}",
                self.buying_power
            )));
        }
        if self.repetitions == 0 {
            return Err(BacktestError::InvalidParameter(
                "repetitions must be at least 1".to_string(),
            ));
        }
        self.strategy.validate()
    }

    /// Calendar days covered by the run, used to pre-size portfolio series
    pub fn days(&self) -> usize {
        (self.end_date - self.start_date).num_days().max(0) as usize
    }

    pub fn worker_count(&self) -> usize {
        if self.workers == 0 {
            num_cpus::get()
        } else {
            self.workers
        }
    }
}

/// How much of the available cash an entry order commits
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PositionSizing {
    /// All available cash
    Greedy,
    /// A fixed fraction of available cash
    Percent { fraction: f64 },
}

impl PositionSizing {
    pub fn cash_to_commit(&self, buying_power: f64) -> f64 {
        match self {
            PositionSizing::Greedy => buying_power,
            PositionSizing::Percent { fraction } => buying_power * fraction,
        }
    }
}

fn full_liquidation() -> f64 {
    1.0
}

// Strategy selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StrategyType {
    BuyAndHold {
        sizing: PositionSizing,
    },
    SmaCross {
        short_period: usize,
        long_period: usize,
        /// Share of the held position sold on a sell signal
        #[serde(default = "full_liquidation")]
        sell_fraction: f64,
    },
    RsiCross {
        rs_period: usize,
        lower_threshold: f64,
        upper_threshold: f64,
        #[serde(default = "full_liquidation")]
        sell_fraction: f64,
    },
    RandomWalk,
}

impl Default for StrategyType {
    fn default() -> Self {
        StrategyType::BuyAndHold {
            sizing: PositionSizing::Greedy,
        }
    }
}

impl StrategyType {
    pub fn validate(&self) -> Result<(), BacktestError> {
        match self {
            StrategyType::BuyAndHold { sizing } => {
                if let PositionSizing::Percent { fraction } = sizing {
                    check_fraction("buy fraction", *fraction)?;
                }
                Ok(())
            }
            StrategyType::SmaCross {
                short_period,
                long_period,
                sell_fraction,
            } => {
                if *short_period == 0 || *long_period == 0 {
                    return Err(BacktestError::InvalidParameter(
                        "SMA periods must be positive".to_string(),
                    ));
                }
                if short_period >= long_period {
                    return Err(BacktestError::InvalidParameter(format!(
                        "short period {} must be shorter than long period {}",
                        short_period, long_period
                    )));
                }
                check_fraction("sell fraction", *sell_fraction)
            }
            StrategyType::RsiCross {
                rs_period,
                lower_threshold,
                upper_threshold,
                sell_fraction,
            } => {
                if *rs_period == 0 {
                    return Err(BacktestError::InvalidParameter(
                        "RSI period must be positive".to_string(),
                    ));
                }
                if lower_threshold > upper_threshold {
                    return Err(BacktestError::InvalidParameter(format!(
                        "lower threshold {} exceeds upper threshold {}",
                        lower_threshold, upper_threshold
                    )));
                }
                check_fraction("sell fraction", *sell_fraction)
            }
            StrategyType::RandomWalk => Ok(()),
        }
    }
}

fn check_fraction(name: &str, value: f64) -> Result<(), BacktestError> {
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(BacktestError::InvalidParameter(format!(
            "{} must be in (0, 1], got {}",
            name, value
        )))
    }
}

/// Fractional portfolio return for one simulated day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyReturn {
    pub date: NaiveDate,
    pub value: f64,
}

// Annualized performance metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    /// Percentage, never positive
    pub max_drawdown: f64,
    /// Compound annual growth rate, percentage
    pub annual_return: f64,
    pub standard_dev: f64,
}

/// One (ticker, repetition) simulation waiting for a worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub ticker: String,
    pub repetition: usize,
}

/// Outcome of one completed simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub ticker: String,
    pub repetition: usize,
    pub metrics: Metrics,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(strategy: StrategyType) -> BacktestConfig {
        BacktestConfig {
            start_date: NaiveDate::from_ymd_opt(2015, 3, 31).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(),
            buying_power: 20_000.0,
            repetitions: 1,
            strategy,
            sharpe_threshold: DEFAULT_SHARPE_THRESHOLD,
            output_path: PathBuf::from("worthy_tickers.txt"),
            workers: 0,
            seed: None,
        }
    }

    #[test]
    fn test_config_validation() {
        assert!(config(StrategyType::default()).validate().is_ok());

        let mut bad_dates = config(StrategyType::RandomWalk);
        bad_dates.end_date = bad_dates.start_date;
        assert!(bad_dates.validate().is_err());

        let mut no_cash = config(StrategyType::RandomWalk);
        no_cash.buying_power = 0.0;
        assert!(no_cash.validate().is_err());

        let crossed = config(StrategyType::SmaCross {
            short_period: 50,
            long_period: 20,
            sell_fraction: 1.0,
        });
        assert!(crossed.validate().is_err());

        let partial = config(StrategyType::RsiCross {
            rs_period: 14,
            lower_threshold: 30.0,
            upper_threshold: 70.0,
            sell_fraction: 0.5,
        });
        assert!(partial.validate().is_ok());
    }

    #[test]
    fn test_worker_count_defaults_to_cpus() {
        let cfg = config(StrategyType::default());
        assert_eq!(cfg.worker_count(), num_cpus::get());
        assert_eq!(cfg.days(), 3653);
    }

    #[test]
    fn test_strategy_type_serde() {
        let json = r#"{"type":"sma_cross","short_period":5,"long_period":20}"#;
        let parsed: StrategyType = serde_json::from_str(json).unwrap();
        assert_eq!(
            parsed,
            StrategyType::SmaCross {
                short_period: 5,
                long_period: 20,
                sell_fraction: 1.0
            }
        );

        let percent = StrategyType::BuyAndHold {
            sizing: PositionSizing::Percent {
                fraction: DEFAULT_PERCENT_BUY,
            },
        };
        let round = serde_json::to_string(&percent).unwrap();
        assert_eq!(serde_json::from_str::<StrategyType>(&round).unwrap(), percent);
    }

    #[test]
    fn test_position_sizing() {
        assert_eq!(PositionSizing::Greedy.cash_to_commit(1000.0), 1000.0);
        let quarter = PositionSizing::Percent { fraction: 0.25 };
        assert_eq!(quarter.cash_to_commit(1000.0), 250.0);
    }
}
