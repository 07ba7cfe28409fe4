//! Meal views
//!
//! - **grouping**: meal-type buckets with summed totals
//! - **history**: one entry per calendar day of a date range
//! - **cache**: per-user per-day cache invalidated by refresh events

pub mod cache;
pub mod grouping;
pub mod history;

pub use cache::MealsCache;
pub use grouping::{
    group_meals_by_type, grouped_totals, meal_type_totals, sort_meals_by_type, GroupedMeals,
    MealTypeTotals,
};
pub use history::{bucket_by_day, default_range, DayMeals, DEFAULT_HISTORY_DAYS};
