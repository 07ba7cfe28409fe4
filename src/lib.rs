//! # Renshuu
//!
//! Nutrition and fitness tracking service: users log meals and body weight,
//! read daily calorie/macro summaries and set goals; admins curate a shared
//! food catalog of foods, portions and add-ons.
//!
//! ## Modules
//!
//! - [`storage`]: SQLite store with per-user scoping and server-side totals
//! - [`meals`]: Meal grouping, history bucketing and the per-day cache
//! - [`refresh`]: Refresh event bus and WebSocket fan-out
//! - [`drawer`]: Data-entry step chain, portion picker and form parsing
//! - [`api`]: REST API server with Axum
//! - [`config`]: TOML + environment configuration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use renshuu::storage::*;
//! use renshuu::meals::grouped_totals;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = StorageEngine::new(StorageConfig::new("./renshuu.db")).await?;
//!
//!     let today = chrono::Local::now().date_naive();
//!     let meals = engine.meals_for_date("user-1", today).await?;
//!
//!     for group in grouped_totals(&meals) {
//!         println!("{}: {:.0} kcal", group.meal_type.label(), group.total_calories);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod drawer;
pub mod meals;
pub mod refresh;
pub mod storage;

// Re-export top-level types for convenience
pub use storage::{StorageConfig, StorageEngine, StorageError, StorageResult, StorageStats};

pub use api::{build_router, serve, ApiError, AppState};

pub use refresh::{
    ConnectionHub, HubConfig, HubError, RefreshBus, RefreshEvent, RefreshSubscriber,
};

pub use drawer::{DrawerController, DrawerError, DrawerKind, FormError, PortionPicker};

pub use meals::{group_meals_by_type, grouped_totals, MealsCache};

pub use config::{ApiConfig, Config, ConfigError, DatabaseConfig, LoggingConfig};
