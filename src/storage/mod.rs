//! Renshuu Storage
//!
//! SQLite-backed store for profiles, the food catalog, meals, daily
//! summaries, goals and weight logs:
//!
//! - **types**: Rows and write inputs (Profile, Food, Meal, MealFood, ...)
//! - **schema**: Table definitions, applied idempotently at open
//! - **engine**: Connection ownership, transactions, health ping, stats
//! - **profiles / foods / meals / tracking**: table-group operations
//! - **error**: Error types
//!
//! # Write path
//!
//! ```text
//! MealFoodInput → resolve portion + add-ons → insert line
//!              → recalculate meal totals → recalculate daily summary
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use renshuu::storage::{StorageConfig, StorageEngine, NewProfile, Role};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = StorageEngine::new(StorageConfig::new("./renshuu.db")).await?;
//!
//!     engine
//!         .create_profile("user-1", NewProfile { full_name: "Ada".into(), role: Role::Client })
//!         .await?;
//!
//!     let today = chrono::Utc::now().date_naive();
//!     let meals = engine.meals_for_date("user-1", today).await?;
//!     println!("{} meals today", meals.len());
//!
//!     Ok(())
//! }
//! ```

pub mod engine;
pub mod error;
pub mod foods;
pub mod meals;
pub mod profiles;
mod rows;
pub mod schema;
pub mod tracking;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use engine::{StorageConfig, StorageEngine, StorageStats};
pub use error::{StorageError, StorageResult};
pub use types::{
    AddonInput, ApprovalStatus, CustomFood, CustomFoodInput, DailySummary, Food, FoodAddon,
    FoodFilter, FoodInput, FoodOptions, FoodPortion, FoodSearchResult, GoalInput, GoalSetter,
    Meal, MealFood, MealFoodInput, MealFoodUpdate, MealType, MealWithFoods, NewProfile, Nutrition,
    PortionInput, Profile, ProfileUpdate, RecentFood, Role, UserGoal, WeightInput, WeightLog,
};
