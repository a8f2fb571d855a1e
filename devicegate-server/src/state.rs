//! Application state module
//!
//! Defines shared state accessible across all request handlers.

use std::{sync::Arc, time::Duration};

use crate::db::DeviceStore;

/// Deadline for a single allow-list lookup.
pub const LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Application state containing shared resources.
#[derive(Clone)]
pub struct AppState {
    /// Allow-list store, shared by every in-flight request
    pub store: Arc<dyn DeviceStore>,
    /// Deadline applied to each lookup
    pub lookup_timeout: Duration,
}

impl AppState {
    pub fn new(store: Arc<dyn DeviceStore>) -> Self {
        Self {
            store,
            lookup_timeout: LOOKUP_TIMEOUT,
        }
    }

    /// Override the lookup deadline.
    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }
}
