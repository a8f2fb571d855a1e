//! SQLite implementation of the device store.

use std::path::Path;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use super::{DeviceRecord, DeviceStore, StoreError};

/// SQLite-backed device store.
///
/// The pool is opened read-only; concurrent lookups each borrow their own
/// pooled connection.
#[derive(Clone)]
pub struct SqliteDeviceStore {
    pool: SqlitePool,
}

impl SqliteDeviceStore {
    /// Open the database file read-only and verify it is reachable.
    ///
    /// The file must already exist.
    pub async fn open(path: &Path, max_connections: u32) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .read_only(true)
            .create_if_missing(false);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        tracing::info!(path = %path.display(), max_connections, "Device store connected");

        Ok(Self { pool })
    }

    /// Create a store from an existing pool (for testing).
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Close every pooled connection, waiting for checked-out ones to return.
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("Device store closed");
    }
}

#[async_trait]
impl DeviceStore for SqliteDeviceStore {
    async fn find_device(&self, id: &str) -> Result<DeviceRecord, StoreError> {
        sqlx::query_as::<_, DeviceRecord>(
            r#"
            SELECT id, type, owner, allow, data, created_at
            FROM devices
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)
    }
}
