//! Warehouse (MLWH) access layer
//!
//! Rows are fetched per labware barcode, or in bulk for the extraction job.
//! Each operation acquires its own pooled connection, which returns to the
//! pool when dropped.

mod models;

pub use models::WarehouseRow;

use crate::config::MlwhConfig;
use crate::Result;
use async_trait::async_trait;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use std::time::Duration;
use tracing::debug;

/// Columns selected for every warehouse query
const ROW_COLUMNS: &str = "container_barcode, tube_barcode, coordinate, study, \
     supplier_sample_id, sample_state, destination, wrangled";

/// Source of per-tube / per-well sample tracking rows
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// All rows for one container barcode
    async fn labware_rows(&self, labware_barcode: &str) -> Result<Vec<WarehouseRow>>;

    /// Rows for `destination` that have not been wrangled yet, ordered by
    /// container barcode
    async fn unwrangled_rows(&self, destination: &str) -> Result<Vec<WarehouseRow>>;

    /// Stamp the given containers as wrangled; returns rows affected
    async fn mark_wrangled(&self, labware_barcodes: &[String]) -> Result<u64>;
}

/// Create the MLWH connection pool
pub async fn connect(config: &MlwhConfig) -> Result<MySqlPool> {
    let pool = MySqlPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .connect(&config.database_url())
        .await?;

    Ok(pool)
}

/// MySQL-backed warehouse
#[derive(Clone)]
pub struct MlwhDatabase {
    pool: MySqlPool,
    table: String,
}

impl MlwhDatabase {
    /// `table` must already be validated as a plain identifier
    pub fn new(pool: MySqlPool, table: impl Into<String>) -> Self {
        Self {
            pool,
            table: table.into(),
        }
    }
}

#[async_trait]
impl Warehouse for MlwhDatabase {
    async fn labware_rows(&self, labware_barcode: &str) -> Result<Vec<WarehouseRow>> {
        let mut conn = self.pool.acquire().await?;

        let rows = sqlx::query_as::<_, WarehouseRow>(&format!(
            "SELECT {} FROM {} WHERE container_barcode = ?",
            ROW_COLUMNS, self.table
        ))
        .bind(labware_barcode)
        .fetch_all(&mut *conn)
        .await?;

        debug!(barcode = %labware_barcode, count = rows.len(), "Fetched MLWH rows");
        Ok(rows)
    }

    async fn unwrangled_rows(&self, destination: &str) -> Result<Vec<WarehouseRow>> {
        let mut conn = self.pool.acquire().await?;

        let rows = sqlx::query_as::<_, WarehouseRow>(&format!(
            "SELECT {} FROM {} WHERE destination = ? AND wrangled IS NULL \
             ORDER BY container_barcode",
            ROW_COLUMNS, self.table
        ))
        .bind(destination)
        .fetch_all(&mut *conn)
        .await?;

        debug!(destination = %destination, count = rows.len(), "Fetched unwrangled MLWH rows");
        Ok(rows)
    }

    async fn mark_wrangled(&self, labware_barcodes: &[String]) -> Result<u64> {
        if labware_barcodes.is_empty() {
            return Ok(0);
        }

        let placeholders = vec!["?"; labware_barcodes.len()].join(",");
        let sql = format!(
            "UPDATE {} SET wrangled = NOW() WHERE container_barcode IN ({})",
            self.table, placeholders
        );

        let mut conn = self.pool.acquire().await?;
        let mut query = sqlx::query(&sql);
        for barcode in labware_barcodes {
            query = query.bind(barcode);
        }
        let result = query.execute(&mut *conn).await?;

        Ok(result.rows_affected())
    }
}
