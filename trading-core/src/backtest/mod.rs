pub mod engine;
pub mod errors;
pub mod metrics;
pub mod portfolio;
pub mod strategy;
pub mod types;

pub use engine::BacktestEngine;
pub use errors::BacktestError;
pub use metrics::{MetricsCalculator, MetricsError};
pub use portfolio::{Portfolio, Position};
pub use strategy::{create_strategy, list_strategies, Strategy, StrategyInfo};
pub use types::{
    BacktestConfig, BacktestResult, DailyReturn, Metrics, PositionSizing, StrategyType, WorkItem,
};
