//! Volume bar storage
//!
//! The gateway treats storage as a row-insert/row-query collaborator over
//! the `volume_data` table. [`PgVolumeStore`] is the Postgres-backed
//! implementation; [`MemoryVolumeStore`] keeps rows in process for local
//! development and tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use std::sync::atomic::{AtomicI64, Ordering};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};
use voldash_common::{BarSample, NormalizedBar, StoredBar, Timeframe};

/// Storage-layer failure, surfaced with the underlying message
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database error
    #[error("{0}")]
    Database(#[from] sqlx::Error),
}

/// Row-insert/row-query capability over the `volume_data` table
#[async_trait]
pub trait VolumeStorage: Send + Sync {
    /// Insert normalized bars as a single atomic operation and return the
    /// stored rows with storage-assigned fields
    async fn insert_bars(&self, bars: &[NormalizedBar]) -> Result<Vec<StoredBar>, StorageError>;

    /// Fetch bars for one instrument and granularity since `cutoff`,
    /// ordered by `bar_time` descending
    async fn fetch_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<BarSample>, StorageError>;

    /// Cheap connectivity probe for health checks
    async fn ping(&self) -> Result<(), StorageError>;
}

/// Postgres-backed volume store
#[derive(Debug, Clone)]
pub struct PgVolumeStore {
    pool: PgPool,
}

impl PgVolumeStore {
    /// Connect to Postgres and bootstrap the schema
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        let store = Self { pool };
        store.init_schema().await?;
        info!("Connected to Postgres volume store");
        Ok(store)
    }

    /// Create the `volume_data` table and its read-path index
    async fn init_schema(&self) -> Result<(), StorageError> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS volume_data (
                id BIGSERIAL PRIMARY KEY,
                symbol TEXT NOT NULL,
                related_symbol TEXT NOT NULL,
                bar_time TIMESTAMPTZ NOT NULL,
                open_volume DOUBLE PRECISION NOT NULL,
                close_volume DOUBLE PRECISION NOT NULL,
                delta_volume DOUBLE PRECISION NOT NULL,
                timeframe TEXT NOT NULL,
                source TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_volume_data_read_path
             ON volume_data (symbol, timeframe, bar_time DESC)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl VolumeStorage for PgVolumeStore {
    async fn insert_bars(&self, bars: &[NormalizedBar]) -> Result<Vec<StoredBar>, StorageError> {
        if bars.is_empty() {
            return Ok(Vec::new());
        }

        let mut tx = self.pool.begin().await?;

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO volume_data (symbol, related_symbol, bar_time, open_volume, \
             close_volume, delta_volume, timeframe, source) ",
        );
        builder.push_values(bars, |mut row, bar| {
            row.push_bind(&bar.symbol)
                .push_bind(&bar.related_symbol)
                .push_bind(bar.bar_time)
                .push_bind(bar.open_volume)
                .push_bind(bar.close_volume)
                .push_bind(bar.delta_volume)
                .push_bind(bar.timeframe.as_str())
                .push_bind(&bar.source);
        });
        builder.push(
            " RETURNING id, symbol, related_symbol, bar_time, open_volume, close_volume, \
             delta_volume, timeframe, source, created_at",
        );

        let rows = builder.build().fetch_all(&mut *tx).await?;
        tx.commit().await?;

        let stored = rows
            .into_iter()
            .map(|row| StoredBar {
                id: row.get("id"),
                symbol: row.get("symbol"),
                related_symbol: row.get("related_symbol"),
                bar_time: row.get("bar_time"),
                open_volume: row.get("open_volume"),
                close_volume: row.get("close_volume"),
                delta_volume: row.get("delta_volume"),
                timeframe: row.get("timeframe"),
                source: row.get("source"),
                created_at: row.get("created_at"),
            })
            .collect::<Vec<_>>();

        debug!("Inserted {} volume bar(s)", stored.len());
        Ok(stored)
    }

    async fn fetch_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<BarSample>, StorageError> {
        let rows = sqlx::query(
            "SELECT bar_time, open_volume, close_volume, delta_volume, source
             FROM volume_data
             WHERE symbol = $1 AND timeframe = $2 AND bar_time >= $3
             ORDER BY bar_time DESC",
        )
        .bind(symbol)
        .bind(timeframe.as_str())
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| BarSample {
                bar_time: row.get("bar_time"),
                open_volume: row.get("open_volume"),
                close_volume: row.get("close_volume"),
                delta_volume: row.get("delta_volume"),
                source: row.get("source"),
            })
            .collect())
    }

    async fn ping(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// In-process volume store with the same semantics as the Postgres one
#[derive(Debug, Default)]
pub struct MemoryVolumeStore {
    rows: RwLock<Vec<StoredBar>>,
    next_id: AtomicI64,
}

impl MemoryVolumeStore {
    /// Create an empty in-memory store
    #[must_use]
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Number of stored rows
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    /// True when nothing has been stored yet
    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

#[async_trait]
impl VolumeStorage for MemoryVolumeStore {
    async fn insert_bars(&self, bars: &[NormalizedBar]) -> Result<Vec<StoredBar>, StorageError> {
        let created_at = Utc::now();
        let mut rows = self.rows.write().await;
        let stored: Vec<StoredBar> = bars
            .iter()
            .map(|bar| StoredBar {
                id: self.next_id.fetch_add(1, Ordering::Relaxed),
                symbol: bar.symbol.clone(),
                related_symbol: bar.related_symbol.clone(),
                bar_time: bar.bar_time,
                open_volume: bar.open_volume,
                close_volume: bar.close_volume,
                delta_volume: bar.delta_volume,
                timeframe: bar.timeframe.as_str().to_string(),
                source: bar.source.clone(),
                created_at,
            })
            .collect();
        rows.extend(stored.iter().cloned());
        Ok(stored)
    }

    async fn fetch_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<BarSample>, StorageError> {
        let rows = self.rows.read().await;
        let mut matches: Vec<BarSample> = rows
            .iter()
            .filter(|row| {
                row.symbol == symbol
                    && row.timeframe == timeframe.as_str()
                    && row.bar_time >= cutoff
            })
            .map(|row| BarSample {
                bar_time: row.bar_time,
                open_volume: row.open_volume,
                close_volume: row.close_volume,
                delta_volume: row.delta_volume,
                source: row.source.clone(),
            })
            .collect();
        matches.sort_by(|a, b| b.bar_time.cmp(&a.bar_time));
        Ok(matches)
    }

    async fn ping(&self) -> Result<(), StorageError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use voldash_common::TimeRange;

    fn sample_bar(minutes_ago: i64, delta: f64) -> NormalizedBar {
        let bar_time = Utc::now() - Duration::minutes(minutes_ago);
        NormalizedBar {
            symbol: "MNQ".to_string(),
            related_symbol: "QQQ".to_string(),
            bar_time,
            open_volume: 1000.0 + delta,
            close_volume: 1000.0,
            delta_volume: delta,
            timeframe: Timeframe::M1,
            source: "NinjaTrader".to_string(),
        }
    }

    #[tokio::test]
    async fn memory_store_assigns_ids_and_created_at() {
        let store = MemoryVolumeStore::new();
        let stored = store
            .insert_bars(&[sample_bar(2, 10.0), sample_bar(1, -4.0)])
            .await
            .unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].id, 1);
        assert_eq!(stored[1].id, 2);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn memory_store_filters_and_orders_descending() {
        let store = MemoryVolumeStore::new();
        store
            .insert_bars(&[sample_bar(90, 1.0), sample_bar(10, 2.0), sample_bar(5, 3.0)])
            .await
            .unwrap();

        let cutoff = TimeRange::OneHour.cutoff(Utc::now());
        let bars = store.fetch_bars("MNQ", Timeframe::M1, cutoff).await.unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].delta_volume, 3.0);
        assert_eq!(bars[1].delta_volume, 2.0);

        // Other instruments and granularities stay invisible.
        let none = store.fetch_bars("ES", Timeframe::M1, cutoff).await.unwrap();
        assert!(none.is_empty());
        let none = store.fetch_bars("MNQ", Timeframe::H1, cutoff).await.unwrap();
        assert!(none.is_empty());
    }
}
