use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use trading_common::data::{AssetData, RiskFreeRates};
use trading_core::backtest::metrics::MetricsCalculator;
use trading_core::backtest::types::{BacktestConfig, PositionSizing, StrategyType};
use trading_core::backtest::BacktestEngine;

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2015, 3, 31).unwrap()
}

/// Ten years of daily bars
fn synthetic_bars(days: i64) -> Vec<AssetData> {
    (0..days)
        .map(|i| {
            let close = 100.0 + 0.02 * i as f64 + 5.0 * (i as f64 / 11.0).sin();
            AssetData::new(start() + Duration::days(i), close, close + 1.0, close - 1.0, close, 1e6)
        })
        .collect()
}

fn rates(days: i64) -> RiskFreeRates {
    (0..days).map(|i| (start() + Duration::days(i), 0.0001)).collect()
}

fn config(strategy: StrategyType) -> BacktestConfig {
    BacktestConfig {
        start_date: start(),
        end_date: NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(),
        buying_power: 20_000.0,
        repetitions: 1,
        strategy,
        sharpe_threshold: 1.0,
        output_path: "worthy_tickers.txt".into(),
        workers: 1,
        seed: Some(1),
    }
}

fn bench_simulation(c: &mut Criterion) {
    let bars = synthetic_bars(2_520);
    let rates = Arc::new(rates(3_653));

    let strategies = [
        (
            "buy_and_hold",
            StrategyType::BuyAndHold {
                sizing: PositionSizing::Greedy,
            },
        ),
        (
            "sma_cross",
            StrategyType::SmaCross {
                short_period: 50,
                long_period: 200,
                sell_fraction: 1.0,
            },
        ),
        (
            "rsi_cross",
            StrategyType::RsiCross {
                rs_period: 14,
                lower_threshold: 30.0,
                upper_threshold: 70.0,
                sell_fraction: 1.0,
            },
        ),
        ("random_walk", StrategyType::RandomWalk),
    ];

    let mut group = c.benchmark_group("simulation");
    for (name, strategy) in strategies {
        let mut engine = BacktestEngine::new(&config(strategy), rates.clone(), Some(1)).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(name), &bars, |b, bars| {
            b.iter(|| engine.run(black_box("BENCH"), black_box(bars)).unwrap());
        });
    }
    group.finish();
}

fn bench_metrics(c: &mut Criterion) {
    let bars = synthetic_bars(2_520);
    let rates = rates(3_653);
    let mut engine = BacktestEngine::new(&config(StrategyType::default()), Arc::new(rates.clone()), None).unwrap();
    engine.run("BENCH", &bars).unwrap();
    let portfolio = engine.portfolio();
    let calculator = MetricsCalculator::new();

    c.bench_function("metrics", |b| {
        b.iter(|| {
            calculator
                .calculate(
                    black_box(portfolio.daily_returns()),
                    black_box(portfolio.close_values()),
                    &rates,
                )
                .unwrap()
        });
    });
}

criterion_group!(benches, bench_simulation, bench_metrics);
criterion_main!(benches);
