// trading-core/src/service/runner.rs

use chrono::Utc;
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};
use trading_common::data::{DataProvider, RiskFreeRates};
use uuid::Uuid;

use super::store::QualifyingTickerStore;
use super::types::{RunStats, RunSummary};
use super::ServiceError;
use crate::backtest::{BacktestConfig, BacktestEngine, BacktestError, BacktestResult, WorkItem};

type JobReceiver = Arc<Mutex<mpsc::Receiver<WorkItem>>>;

/// Attempts at loading the ticker universe and risk-free series
const INPUT_ATTEMPTS: u32 = 3;
const INPUT_RETRY_DELAY: Duration = Duration::from_millis(250);

/// Fans (ticker, repetition) simulations out over a pool of workers and
/// funnels their results through a single collector.
pub struct BacktestRunner {
    provider: Arc<dyn DataProvider>,
    config: BacktestConfig,
}

struct CollectorOutput {
    results: Vec<BacktestResult>,
    qualifying: usize,
    write_failures: usize,
}

impl BacktestRunner {
    pub fn new(provider: Arc<dyn DataProvider>, config: BacktestConfig) -> Self {
        Self { provider, config }
    }

    pub async fn run(&self) -> Result<RunSummary, ServiceError> {
        self.run_with(|rates, seed| BacktestEngine::new(&self.config, rates, seed))
            .await
    }

    /// Run with engines built by `make_engine`, called once per worker with
    /// the shared risk-free series and that worker's seed
    async fn run_with<F>(&self, mut make_engine: F) -> Result<RunSummary, ServiceError>
    where
        F: FnMut(Arc<RiskFreeRates>, Option<u64>) -> Result<BacktestEngine, BacktestError>,
    {
        self.config
            .validate()
            .map_err(|e| ServiceError::Validation(e.to_string()))?;
        let started_at = Utc::now();
        let timer = Instant::now();
        let run_id = Uuid::new_v4();
        let (start, end) = (self.config.start_date, self.config.end_date);

        let (tickers, risk_free_rates) = self.load_inputs(start, end).await?;
        let risk_free_rates = Arc::new(risk_free_rates);
        if risk_free_rates.is_empty() {
            warn!("No risk-free rates between {} and {}, Sharpe and Sortino will be 0", start, end);
        }

        let total = tickers.len() * self.config.repetitions;
        let mut stats = RunStats {
            tickers: tickers.len(),
            total_items: total,
            ..RunStats::default()
        };

        // Fail before any simulation if the output cannot be opened
        let store = QualifyingTickerStore::open(&self.config.output_path).await?;

        if total == 0 {
            warn!("No tickers with sufficient data between {} and {}", start, end);
            return Ok(self.summary(run_id, started_at, timer, stats, Vec::new()));
        }

        let worker_count = self.config.worker_count().clamp(1, total);
        info!(
            "Run {}: {} tickers x {} repetitions = {} simulations on {} workers",
            run_id,
            tickers.len(),
            self.config.repetitions,
            total,
            worker_count
        );

        // Both channels hold every item, so neither side ever waits for room
        let (job_tx, job_rx) = mpsc::channel::<WorkItem>(total);
        let (result_tx, result_rx) = mpsc::channel::<BacktestResult>(total);

        // Engines are built up front so a bad strategy config fails the run here
        let mut engines = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            let seed = self.config.seed.map(|seed| seed.wrapping_add(worker_id as u64));
            engines.push(make_engine(risk_free_rates.clone(), seed)?);
        }

        let producer = Self::spawn_producer(job_tx, tickers, self.config.repetitions);
        let collector = Self::spawn_collector(result_rx, store, self.config.sharpe_threshold);

        let job_rx: JobReceiver = Arc::new(Mutex::new(job_rx));
        let workers: Vec<JoinHandle<Result<usize, ServiceError>>> = engines
            .into_iter()
            .enumerate()
            .map(|(worker_id, engine)| {
                self.spawn_worker(worker_id, engine, job_rx.clone(), result_tx.clone())
            })
            .collect();
        // Workers hold the only remaining senders; the collector stops once they finish
        drop(result_tx);

        producer
            .await
            .map_err(|e| ServiceError::Task(format!("producer failed: {}", e)))?;
        for handle in workers {
            stats.skipped += handle
                .await
                .map_err(|e| ServiceError::Task(format!("worker failed: {}", e)))??;
        }
        let output = collector
            .await
            .map_err(|e| ServiceError::Task(format!("collector failed: {}", e)))?;

        stats.completed = output.results.len();
        stats.qualifying = output.qualifying;
        stats.write_failures = output.write_failures;

        let summary = self.summary(run_id, started_at, timer, stats, output.results);
        info!(
            "Run {} finished in {:?}: {} completed, {} skipped, {} qualifying",
            run_id,
            summary.elapsed,
            summary.stats.completed,
            summary.stats.skipped,
            summary.stats.qualifying
        );
        Ok(summary)
    }

    async fn load_inputs(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<(Vec<String>, RiskFreeRates), ServiceError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.fetch_inputs(start, end).await {
                Ok(inputs) => return Ok(inputs),
                Err(e) if e.is_recoverable() && attempt < INPUT_ATTEMPTS => {
                    warn!(
                        "Loading tickers and rates failed (attempt {}/{}): {}",
                        attempt, INPUT_ATTEMPTS, e
                    );
                    sleep(INPUT_RETRY_DELAY).await;
                }
                Err(e) => {
                    error!("Loading tickers and rates failed after {} attempts: {}", attempt, e);
                    return Err(e);
                }
            }
        }
    }

    async fn fetch_inputs(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<(Vec<String>, RiskFreeRates), ServiceError> {
        let tickers = self
            .provider
            .get_tickers_with_sufficient_data(start, end)
            .await?;
        let rates = self.provider.get_risk_free_rates(start, end).await?;
        Ok((tickers, rates))
    }

    fn spawn_producer(
        job_tx: mpsc::Sender<WorkItem>,
        tickers: Vec<String>,
        repetitions: usize,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            for repetition in 0..repetitions {
                for ticker in &tickers {
                    let item = WorkItem {
                        ticker: ticker.clone(),
                        repetition,
                    };
                    if job_tx.send(item).await.is_err() {
                        warn!("Job queue closed before all work items were enqueued");
                        return;
                    }
                }
            }
            // Dropping the sender closes the queue for the workers
        })
    }

    /// Returns the number of work items the worker skipped. Simulations run on
    /// the blocking pool so workers use separate OS threads on any runtime.
    fn spawn_worker(
        &self,
        worker_id: usize,
        mut engine: BacktestEngine,
        jobs: JobReceiver,
        results: mpsc::Sender<BacktestResult>,
    ) -> JoinHandle<Result<usize, ServiceError>> {
        let provider = self.provider.clone();
        let (start, end) = (self.config.start_date, self.config.end_date);

        tokio::spawn(async move {
            let mut skipped = 0;
            loop {
                let item = {
                    let mut rx = jobs.lock().await;
                    rx.recv().await
                };
                let Some(item) = item else {
                    break;
                };

                let bars = match provider.query_asset_data(&item.ticker, start, end).await {
                    Ok(bars) if !bars.is_empty() => bars,
                    Ok(_) => {
                        warn!("Worker {}: no data for {}, skipping", worker_id, item.ticker);
                        skipped += 1;
                        continue;
                    }
                    Err(e) => {
                        warn!("Worker {}: failed to load {}: {}", worker_id, item.ticker, e);
                        skipped += 1;
                        continue;
                    }
                };

                let ticker = item.ticker;
                let simulation = tokio::task::spawn_blocking(move || {
                    let outcome = engine.run(&ticker, &bars);
                    (engine, ticker, outcome)
                })
                .await;
                let (returned, ticker, outcome) = simulation.map_err(|e| {
                    ServiceError::Task(format!("worker {} simulation failed: {}", worker_id, e))
                })?;
                engine = returned;

                let metrics = match outcome {
                    Ok(metrics) => metrics,
                    Err(e) => {
                        warn!("Worker {}: {} produced no result: {}", worker_id, ticker, e);
                        skipped += 1;
                        continue;
                    }
                };
                debug!(
                    "Worker {}: {} #{} sharpe {:.2}",
                    worker_id, ticker, item.repetition, metrics.sharpe_ratio
                );

                let result = BacktestResult {
                    ticker,
                    repetition: item.repetition,
                    metrics,
                };
                if results.send(result).await.is_err() {
                    error!("Worker {}: result channel closed", worker_id);
                    break;
                }
            }
            Ok(skipped)
        })
    }

    fn spawn_collector(
        mut results: mpsc::Receiver<BacktestResult>,
        mut store: QualifyingTickerStore,
        sharpe_threshold: f64,
    ) -> JoinHandle<CollectorOutput> {
        tokio::spawn(async move {
            let timer = Instant::now();
            let mut output = CollectorOutput {
                results: Vec::new(),
                qualifying: 0,
                write_failures: 0,
            };

            while let Some(result) = results.recv().await {
                if result.metrics.sharpe_ratio > sharpe_threshold {
                    output.qualifying += 1;
                    if let Err(e) = store.append(&result).await {
                        error!(
                            "Failed to write {} to {}: {}",
                            result.ticker,
                            store.path().display(),
                            e
                        );
                        output.write_failures += 1;
                    }
                }
                output.results.push(result);
            }

            debug!("Writing ticker time: {:?}", timer.elapsed());
            output
        })
    }

    fn summary(
        &self,
        run_id: Uuid,
        started_at: chrono::DateTime<Utc>,
        timer: Instant,
        stats: RunStats,
        mut results: Vec<BacktestResult>,
    ) -> RunSummary {
        results.sort_by(|a, b| {
            a.ticker
                .cmp(&b.ticker)
                .then(a.repetition.cmp(&b.repetition))
        });
        RunSummary {
            run_id,
            strategy: strategy_label(&self.config),
            started_at,
            elapsed: timer.elapsed(),
            stats,
            results,
        }
    }
}

fn strategy_label(config: &BacktestConfig) -> String {
    serde_json::to_value(&config.strategy)
        .ok()
        .and_then(|value| value.get("type").and_then(|t| t.as_str()).map(str::to_string))
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backtest::strategy::{BuyAndHoldStrategy, Strategy};
    use crate::backtest::{Portfolio, PositionSizing, StrategyType};
    use chrono::Duration as Days;
    use std::collections::{HashMap, HashSet};
    use std::thread::{self, ThreadId};
    use trading_common::data::{AssetData, InMemoryDataProvider};

    /// Buy and hold that notes which OS thread each simulation ran on
    struct ThreadRecordingStrategy {
        inner: BuyAndHoldStrategy,
        threads: Arc<std::sync::Mutex<HashSet<ThreadId>>>,
    }

    impl Strategy for ThreadRecordingStrategy {
        fn name(&self) -> &str {
            self.inner.name()
        }

        fn description(&self) -> &str {
            self.inner.description()
        }

        fn parameters(&self) -> &HashMap<String, String> {
            self.inner.parameters()
        }

        fn run(&mut self, ticker: &str, bars: &[AssetData], portfolio: &mut Portfolio) {
            self.threads.lock().unwrap().insert(thread::current().id());
            thread::sleep(std::time::Duration::from_millis(20));
            self.inner.run(ticker, bars, portfolio);
        }
    }

    #[tokio::test]
    async fn test_simulations_use_several_os_threads() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        let days = (end - start).num_days() + 1;
        let bars: Vec<AssetData> = (0..days)
            .map(|i| {
                let close = 100.0 + i as f64 * 0.1 + (i % 3) as f64;
                AssetData::new(start + Days::days(i), close, close, close, close, 1_000.0)
            })
            .collect();
        let rates: RiskFreeRates = (0..days).map(|i| (start + Days::days(i), 0.0001)).collect();

        let tickers = ["A", "B", "C", "D", "E", "F", "G", "H"];
        let provider = tickers.iter().fold(
            InMemoryDataProvider::new().with_risk_free_rates(rates),
            |provider, ticker| provider.with_series(*ticker, bars.clone()),
        );

        let dir = tempfile::tempdir().unwrap();
        let config = BacktestConfig {
            start_date: start,
            end_date: end,
            buying_power: 20_000.0,
            repetitions: 4,
            strategy: StrategyType::default(),
            sharpe_threshold: 1.0,
            output_path: dir.path().join("worthy_tickers.txt"),
            workers: 4,
            seed: None,
        };

        let threads = Arc::new(std::sync::Mutex::new(HashSet::new()));
        let runner = BacktestRunner::new(Arc::new(provider), config);
        let summary = runner
            .run_with(|rates, _| {
                let strategy = ThreadRecordingStrategy {
                    inner: BuyAndHoldStrategy::new(PositionSizing::Greedy),
                    threads: threads.clone(),
                };
                Ok(BacktestEngine::with_strategy(
                    Box::new(strategy),
                    20_000.0,
                    days as usize,
                    rates,
                ))
            })
            .await
            .unwrap();

        assert_eq!(summary.stats.completed, 32);
        assert_eq!(summary.stats.skipped, 0);

        let seen = threads.lock().unwrap();
        assert!(seen.len() > 1, "simulations ran on {} thread(s)", seen.len());
        assert!(!seen.contains(&thread::current().id()));
    }
}
