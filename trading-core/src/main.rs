use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use dotenv::dotenv;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use trading_common::data::{AssetDataRepository, DataProvider};
use trading_core::{
    backtest::{
        list_strategies,
        types::{PositionSizing, StrategyType, DEFAULT_PERCENT_BUY},
        BacktestConfig,
    },
    config::Settings,
    service::{BacktestRunner, RunSummary, ServiceError},
};

#[derive(Parser)]
#[command(name = "trading-core")]
#[command(about = "Concurrent multi-ticker strategy backtester")]
struct Cli {
    /// Also log every executed transaction
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate a strategy over every ticker with enough history
    Backtest(BacktestArgs),
    /// List available strategies
    Strategies,
    /// Print tickers with enough history in the range
    Tickers {
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    BuyAndHold,
    PercentBuy,
    SmaCross,
    RsiCross,
    RandomWalk,
}

#[derive(clap::Args)]
struct BacktestArgs {
    #[arg(long)]
    start: Option<NaiveDate>,
    #[arg(long)]
    end: Option<NaiveDate>,
    #[arg(short, long)]
    buying_power: Option<f64>,
    #[arg(short, long)]
    repetitions: Option<usize>,
    #[arg(short, long, value_enum)]
    strategy: Option<StrategyArg>,
    #[arg(long, default_value = "50")]
    short_period: usize,
    #[arg(long, default_value = "200")]
    long_period: usize,
    #[arg(long, default_value = "14")]
    rs_period: usize,
    #[arg(long, default_value = "30.0")]
    lower_threshold: f64,
    #[arg(long, default_value = "70.0")]
    upper_threshold: f64,
    /// Share of the position sold on a sell signal
    #[arg(long, default_value = "1.0")]
    sell_fraction: f64,
    /// Minimum Sharpe ratio for a ticker to be written out
    #[arg(long)]
    threshold: Option<f64>,
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// 0 = one per CPU
    #[arg(short, long)]
    workers: Option<usize>,
    #[arg(long)]
    seed: Option<u64>,
    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,
}

impl BacktestArgs {
    fn strategy_type(&self) -> Option<StrategyType> {
        let strategy = match self.strategy? {
            StrategyArg::BuyAndHold => StrategyType::BuyAndHold {
                sizing: PositionSizing::Greedy,
            },
            StrategyArg::PercentBuy => StrategyType::BuyAndHold {
                sizing: PositionSizing::Percent {
                    fraction: DEFAULT_PERCENT_BUY,
                },
            },
            StrategyArg::SmaCross => StrategyType::SmaCross {
                short_period: self.short_period,
                long_period: self.long_period,
                sell_fraction: self.sell_fraction,
            },
            StrategyArg::RsiCross => StrategyType::RsiCross {
                rs_period: self.rs_period,
                lower_threshold: self.lower_threshold,
                upper_threshold: self.upper_threshold,
                sell_fraction: self.sell_fraction,
            },
            StrategyArg::RandomWalk => StrategyType::RandomWalk,
        };
        Some(strategy)
    }

    /// Command-line values win over configured ones
    fn apply(&self, mut config: BacktestConfig) -> BacktestConfig {
        if let Some(start) = self.start {
            config.start_date = start;
        }
        if let Some(end) = self.end {
            config.end_date = end;
        }
        if let Some(buying_power) = self.buying_power {
            config.buying_power = buying_power;
        }
        if let Some(repetitions) = self.repetitions {
            config.repetitions = repetitions;
        }
        if let Some(strategy) = self.strategy_type() {
            config.strategy = strategy;
        }
        if let Some(threshold) = self.threshold {
            config.sharpe_threshold = threshold;
        }
        if let Some(output) = &self.output {
            config.output_path = output.clone();
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        config
    }
}

fn init_tracing(verbose: bool) {
    let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if verbose {
        if let Ok(directive) = "transactions=debug".parse() {
            filter = filter.add_directive(directive);
        }
    }
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_settings() -> Result<Settings, ServiceError> {
    Settings::new().map_err(|e| ServiceError::Config(e.to_string()))
}

async fn connect(settings: &Settings) -> anyhow::Result<Arc<AssetDataRepository>> {
    let db = &settings.database;
    let repository = AssetDataRepository::connect(
        &db.url,
        db.max_connections,
        db.min_connections,
        Duration::from_secs(db.max_lifetime),
    )
    .await
    .context("Failed to connect to the database")?;
    repository.check_connection().await?;
    info!("Database connection established");
    Ok(Arc::new(repository))
}

fn print_summary(summary: &RunSummary, threshold: f64) {
    println!("\nBacktest Results ({}):", summary.strategy);
    println!("Run ID: {}", summary.run_id);
    println!("Tickers: {}", summary.stats.tickers);
    println!(
        "Simulations: {} completed, {} skipped of {}",
        summary.stats.completed, summary.stats.skipped, summary.stats.total_items
    );
    println!("Qualifying (Sharpe > {:.2}): {}", threshold, summary.stats.qualifying);
    println!("Elapsed: {:?}", summary.elapsed);
    for result in summary.qualifying_results(threshold) {
        println!(
            "{} #{}: Sharpe {:.2}, Sortino {:.2}, Max Drawdown {:.2}%, Annual Return {:.2}%, Std Dev {:.2}",
            result.ticker,
            result.repetition,
            result.metrics.sharpe_ratio,
            result.metrics.sortino_ratio,
            result.metrics.max_drawdown,
            result.metrics.annual_return,
            result.metrics.standard_dev
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Strategies => {
            for strategy in list_strategies() {
                println!("{:<14} {:<22} {}", strategy.id, strategy.name, strategy.description);
            }
        }

        Commands::Tickers { start, end } => {
            let settings = load_settings()?;
            let start = start.unwrap_or(settings.backtest.start_date);
            let end = end.unwrap_or(settings.backtest.end_date);
            let repository = connect(&settings).await?;

            let tickers = repository.get_tickers_with_sufficient_data(start, end).await?;
            info!("{} tickers with sufficient data", tickers.len());
            for ticker in tickers {
                println!("{}", ticker);
            }
        }

        Commands::Backtest(args) => {
            let settings = load_settings()?;
            let config = args.apply(settings.backtest.to_config());
            config
                .validate()
                .map_err(|e| ServiceError::Validation(e.to_string()))?;
            let threshold = config.sharpe_threshold;
            let repository = connect(&settings).await?;

            let runner = BacktestRunner::new(repository, config);
            let summary = runner.run().await?;

            if args.json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_summary(&summary, threshold);
            }
        }
    }

    Ok(())
}
