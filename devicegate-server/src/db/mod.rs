//! Device allow-list access
//!
//! Read-only lookup of device records by permanent identifier. The store is
//! owned and provisioned externally; nothing in this crate writes to it.

mod device;
mod memory;

pub use device::SqliteDeviceStore;
pub use memory::MemoryDeviceStore;

use std::time::Duration;

use async_trait::async_trait;
use sqlx::FromRow;

/// Device lookup errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No record exists for the identifier.
    #[error("Device not found")]
    NotFound,

    #[error("Lookup did not complete within {0:?}")]
    Timeout(Duration),

    #[error("Database connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(#[from] sqlx::Error),
}

/// A row of the `devices` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, FromRow)]
pub struct DeviceRecord {
    /// Permanent identifier, unique key
    pub id: String,
    /// Device type (e.g. "tpm", "step")
    #[sqlx(rename = "type")]
    pub kind: String,
    pub owner: String,
    /// Whether the device is on the allow-list
    pub allow: bool,
    /// Opaque JSON payload returned verbatim to the caller
    pub data: Option<Vec<u8>>,
    /// Unix seconds, if the provisioner recorded it
    pub created_at: Option<i64>,
}

impl DeviceRecord {
    /// The record used when an identifier is unknown: not allowed, no data.
    pub fn zero() -> Self {
        Self::default()
    }

    /// Payload bytes, empty when the column was NULL.
    pub fn data(&self) -> &[u8] {
        self.data.as_deref().unwrap_or_default()
    }
}

/// Read contract of the allow-list store.
///
/// Implementations must tell "not found" apart from every other failure and
/// must be safe to share between concurrent requests.
#[async_trait]
pub trait DeviceStore: Send + Sync {
    /// Fetch a device by its permanent identifier.
    async fn find_device(&self, id: &str) -> Result<DeviceRecord, StoreError>;
}
