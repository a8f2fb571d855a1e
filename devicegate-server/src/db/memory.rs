//! In-memory device store
//!
//! Useful for development and tests. Records are loaded up front; the store
//! still only exposes the read contract.

use async_trait::async_trait;
use dashmap::DashMap;

use super::{DeviceRecord, DeviceStore, StoreError};

#[derive(Default)]
pub struct MemoryDeviceStore {
    devices: DashMap<String, DeviceRecord>,
}

impl MemoryDeviceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store holding the given records, keyed by their `id`.
    pub fn with_devices(devices: impl IntoIterator<Item = DeviceRecord>) -> Self {
        let store = Self::new();
        for device in devices {
            store.devices.insert(device.id.clone(), device);
        }
        store
    }
}

#[async_trait]
impl DeviceStore for MemoryDeviceStore {
    async fn find_device(&self, id: &str) -> Result<DeviceRecord, StoreError> {
        self.devices
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or(StoreError::NotFound)
    }
}

impl std::fmt::Debug for MemoryDeviceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryDeviceStore")
            .field("devices", &self.devices.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lookup() {
        let store = MemoryDeviceStore::with_devices([DeviceRecord {
            id: "dev-1".into(),
            allow: true,
            ..DeviceRecord::default()
        }]);

        assert!(store.find_device("dev-1").await.unwrap().allow);
        assert!(matches!(
            store.find_device("dev-2").await,
            Err(StoreError::NotFound)
        ));
    }
}
