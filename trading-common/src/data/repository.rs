// =================================================================
// data/repository.rs - PostgreSQL Data Repository
// =================================================================
//
// Expected schema:
//
//   CREATE TABLE stock_data (
//       date   DATE             NOT NULL,
//       ticker TEXT             NOT NULL,
//       open   DOUBLE PRECISION NOT NULL,
//       high   DOUBLE PRECISION NOT NULL,
//       low    DOUBLE PRECISION NOT NULL,
//       close  DOUBLE PRECISION NOT NULL,
//       volume DOUBLE PRECISION NOT NULL,
//       PRIMARY KEY (ticker, date)
//   );
//
//   CREATE TABLE treasury_yields (
//       date                 DATE PRIMARY KEY,
//       daily_risk_free_rate DOUBLE PRECISION
//   );

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::provider::{required_data_points, validate_range, DataProvider};
use super::types::{AssetData, DataError, RiskFreeRates};

/// Data provider backed by a PostgreSQL connection pool
#[derive(Clone)]
pub struct AssetDataRepository {
    pool: PgPool,
}

impl AssetDataRepository {
    /// Open a connection pool against `url`
    pub async fn connect(
        url: &str,
        max_connections: u32,
        min_connections: u32,
        max_lifetime: Duration,
    ) -> Result<Self, DataError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .max_lifetime(max_lifetime)
            .connect(url)
            .await?;

        info!(
            "Database pool ready (max_connections: {}, min_connections: {})",
            max_connections, min_connections
        );
        Ok(Self { pool })
    }

    /// Round-trip a trivial query to make sure the database is reachable
    pub async fn check_connection(&self) -> Result<(), DataError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn row_to_asset_data(row: &PgRow) -> Result<AssetData, sqlx::Error> {
        Ok(AssetData {
            date: row.try_get("date")?,
            open: row.try_get("open")?,
            high: row.try_get("high")?,
            low: row.try_get("low")?,
            close: row.try_get("close")?,
            volume: row.try_get("volume")?,
        })
    }
}

/// Decode every row or none: a single bad row fails the whole series, so
/// the day sequence never has holes
fn decode_rows<R, T, F>(rows: &[R], decode: F) -> Result<Vec<T>, DataError>
where
    F: Fn(&R) -> Result<T, sqlx::Error>,
{
    rows.iter()
        .map(decode)
        .collect::<Result<Vec<_>, _>>()
        .map_err(DataError::from)
}

#[async_trait]
impl DataProvider for AssetDataRepository {
    async fn query_asset_data(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<AssetData>, DataError> {
        validate_range(start, end)?;
        let query_time = Instant::now();

        let rows = sqlx::query(
            r"
            SELECT date, open, high, low, close, volume
            FROM stock_data
            WHERE ticker = $1 AND date BETWEEN $2 AND $3
            ORDER BY date
            ",
        )
        .bind(ticker)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        let bars = decode_rows(&rows, Self::row_to_asset_data).map_err(|e| {
            warn!("Failed to decode bars for ticker {}: {}", ticker, e);
            e
        })?;

        debug!(
            "Query time for {}: {:?} ({} bars)",
            ticker,
            query_time.elapsed(),
            bars.len()
        );
        Ok(bars)
    }

    async fn get_risk_free_rates(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RiskFreeRates, DataError> {
        validate_range(start, end)?;

        let rows = sqlx::query(
            r"
            SELECT date, daily_risk_free_rate
            FROM treasury_yields
            WHERE date BETWEEN $1 AND $2
            ORDER BY date
            ",
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        let mut rates = RiskFreeRates::new();
        for row in &rows {
            let date: NaiveDate = row.try_get("date")?;
            let rate: Option<f64> = row.try_get("daily_risk_free_rate")?;
            if let Some(rate) = rate {
                rates.insert(date, rate);
            }
        }

        info!("Loaded {} risk-free rates", rates.len());
        Ok(rates)
    }

    async fn get_tickers_with_sufficient_data(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<String>, DataError> {
        validate_range(start, end)?;
        let required = required_data_points(start, end) as i64;

        let rows = sqlx::query(
            r"
            SELECT ticker
            FROM stock_data
            WHERE date BETWEEN $1 AND $2
            GROUP BY ticker
            HAVING COUNT(*) >= $3
            ORDER BY ticker
            ",
        )
        .bind(start)
        .bind(end)
        .bind(required)
        .fetch_all(&self.pool)
        .await?;

        let tickers = rows
            .iter()
            .map(|row| row.try_get::<String, _>("ticker"))
            .collect::<Result<Vec<_>, _>>()?;

        info!(
            "{} tickers have at least {} data points",
            tickers.len(),
            required
        );
        Ok(tickers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_bad_row_fails_the_series() {
        let decode = |close: &f64| {
            if close.is_finite() {
                Ok(*close)
            } else {
                Err(sqlx::Error::ColumnNotFound("close".to_string()))
            }
        };

        assert_eq!(decode_rows(&[1.0, 2.0, 3.0], decode).unwrap(), vec![1.0, 2.0, 3.0]);
        assert!(matches!(
            decode_rows(&[1.0, f64::NAN, 3.0], decode),
            Err(DataError::Database(sqlx::Error::ColumnNotFound(_)))
        ));
        assert!(decode_rows(&[], decode).unwrap().is_empty());
    }

    // Needs a populated database reachable through DATABASE_URL
    #[tokio::test]
    #[ignore]
    async fn test_live_database_queries() {
        dotenv::dotenv().ok();
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let repository = AssetDataRepository::connect(&url, 2, 1, Duration::from_secs(60))
            .await
            .unwrap();
        repository.check_connection().await.unwrap();

        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        let tickers = repository
            .get_tickers_with_sufficient_data(start, end)
            .await
            .unwrap();

        if let Some(ticker) = tickers.first() {
            let bars = repository.query_asset_data(ticker, start, end).await.unwrap();
            assert!(bars.len() >= required_data_points(start, end));
            assert!(bars.windows(2).all(|w| w[0].date < w[1].date));
        }
    }
}
