// Application state module
// Everything a request task needs, built once at startup and shared read-only

use std::sync::atomic::AtomicUsize;

use super::types::Config;
use crate::point::{PointService, PointStore, StoreError};
use crate::routing::RouteTable;
use crate::validation::ValidationRules;

/// Application state
pub struct AppState {
    pub config: Config,
    pub routes: RouteTable,
    pub rules: ValidationRules,
    pub points: PointService,
    /// Open connections, used for `max_connections` and graceful shutdown
    pub active_connections: AtomicUsize,
}

impl AppState {
    /// Build state from configuration, loading the ledger snapshot if one is configured
    pub fn new(config: &Config) -> Result<Self, StoreError> {
        let store = match config.storage.snapshot_file.as_deref() {
            Some(path) => PointStore::with_snapshot(path)?,
            None => PointStore::in_memory(),
        };

        Ok(Self::with_store(config, store))
    }

    /// Build state around an existing store
    pub fn with_store(config: &Config, store: PointStore) -> Self {
        Self {
            config: config.clone(),
            routes: RouteTable::new(&config.health),
            rules: ValidationRules::from(&config.points),
            points: PointService::new(store, config.points.clone()),
            active_connections: AtomicUsize::new(0),
        }
    }
}
