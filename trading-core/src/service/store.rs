use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::backtest::BacktestResult;

/// One output line, without the trailing newline
pub fn format_result_line(result: &BacktestResult) -> String {
    format!(
        "{}, Sharpe Ratio: {:.2}, Sortino Ratio: {:.2}, Max Drawdown: {:.2}, Annual Return: {:.2}",
        result.ticker,
        result.metrics.sharpe_ratio,
        result.metrics.sortino_ratio,
        result.metrics.max_drawdown,
        result.metrics.annual_return
    )
}

/// Append-only text file of qualifying tickers. Never truncated, so lines
/// accumulate across runs.
pub struct QualifyingTickerStore {
    path: PathBuf,
    file: File,
}

impl QualifyingTickerStore {
    pub async fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn append(&mut self, result: &BacktestResult) -> std::io::Result<()> {
        let mut line = format_result_line(result);
        line.push('\n');
        self.file.write_all(line.as_bytes()).await?;
        self.file.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backtest::Metrics;

    fn result(ticker: &str, sharpe: f64) -> BacktestResult {
        BacktestResult {
            ticker: ticker.to_string(),
            repetition: 0,
            metrics: Metrics {
                sharpe_ratio: sharpe,
                sortino_ratio: 2.345,
                max_drawdown: -12.3456,
                annual_return: 8.0,
                standard_dev: 15.0,
            },
        }
    }

    #[test]
    fn test_format_result_line() {
        assert_eq!(
            format_result_line(&result("AAPL", 1.234)),
            "AAPL, Sharpe Ratio: 1.23, Sortino Ratio: 2.35, Max Drawdown: -12.35, Annual Return: 8.00"
        );
    }

    #[tokio::test]
    async fn test_append_never_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("worthy_tickers.txt");

        let mut store = QualifyingTickerStore::open(&path).await.unwrap();
        store.append(&result("AAPL", 1.5)).await.unwrap();
        drop(store);

        let mut reopened = QualifyingTickerStore::open(&path).await.unwrap();
        assert_eq!(reopened.path(), path.as_path());
        reopened.append(&result("MSFT", 2.0)).await.unwrap();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("AAPL, Sharpe Ratio: 1.50"));
        assert!(lines[1].starts_with("MSFT, Sharpe Ratio: 2.00"));
    }
}
