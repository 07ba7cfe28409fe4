//! Application State
//!
//! Shared state accessible by all API handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use chrono::{Local, NaiveDate};
use std::sync::Arc;
use std::time::Instant;

use crate::config::ApiConfig;
use crate::meals::MealsCache;
use crate::refresh::{ConnectionHub, HubConfig, RefreshBus, RefreshEvent};
use crate::storage::StorageEngine;

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<StorageEngine>,
    /// Refresh notifications emitted after mutations
    pub refresh: Arc<RefreshBus>,
    /// WebSocket connection hub, subscribed to every refresh event
    pub ws_hub: Arc<ConnectionHub>,
    /// Per-day meals cache, subscribed to `today` and `meals`
    pub meals_cache: Arc<MealsCache>,
    pub config: Arc<ApiConfig>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    pub fn new(store: Arc<StorageEngine>, config: ApiConfig) -> Self {
        let hub_config = HubConfig {
            max_connections: config.max_ws_connections,
        };
        Self::with_hub_config(store, config, hub_config)
    }

    /// Build the state and wire the refresh subscribers
    pub fn with_hub_config(
        store: Arc<StorageEngine>,
        config: ApiConfig,
        hub_config: HubConfig,
    ) -> Self {
        let refresh = Arc::new(RefreshBus::new());
        let ws_hub = Arc::new(ConnectionHub::new(hub_config));
        let meals_cache = Arc::new(MealsCache::new());

        refresh.subscribe(RefreshEvent::Today, meals_cache.clone());
        refresh.subscribe(RefreshEvent::Meals, meals_cache.clone());
        for event in RefreshEvent::all() {
            refresh.subscribe(*event, ws_hub.clone());
        }

        Self {
            store,
            refresh,
            ws_hub,
            meals_cache,
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }

    /// Notify subscribers of a successful mutation
    pub async fn notify(&self, events: &[RefreshEvent], user_id: &str) {
        self.refresh.emit_all(events, user_id).await;
    }

    /// Server-local calendar date
    pub fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Get WebSocket connection count
    pub async fn ws_connection_count(&self) -> usize {
        self.ws_hub.connection_count().await
    }
}
