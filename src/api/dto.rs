//! Data Transfer Objects
//!
//! Request and response types for the API endpoints. Responses also
//! deserialize so the CLI can read them back.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::meals::{DayMeals, MealTypeTotals};
use crate::storage::{
    DailySummary, Food, FoodSearchResult, MealWithFoods, UserGoal, WeightLog,
};

// ============================================
// QUERY PARAMETERS
// ============================================

/// `?date=YYYY-MM-DD`, defaulting to today
#[derive(Debug, Default, Deserialize)]
pub struct DateQuery {
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

/// `?start=&end=`, defaulting to the last seven days
#[derive(Debug, Default, Deserialize)]
pub struct RangeQuery {
    #[serde(default)]
    pub start: Option<NaiveDate>,
    #[serde(default)]
    pub end: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

// ============================================
// DASHBOARD / MEALS
// ============================================

/// Everything the today screen shows
#[derive(Debug, Serialize, Deserialize)]
pub struct DashboardResponse {
    pub date: NaiveDate,
    pub meals: Vec<MealWithFoods>,
    pub grouped: Vec<MealTypeTotals>,
    pub summary: Option<DailySummary>,
    pub goal: Option<UserGoal>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MealsResponse {
    pub date: NaiveDate,
    pub meals: Vec<MealWithFoods>,
    pub summary: Option<DailySummary>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GroupedMealsResponse {
    pub date: NaiveDate,
    pub groups: Vec<MealTypeTotals>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub days: Vec<DayMeals>,
}

// ============================================
// FOODS
// ============================================

#[derive(Debug, Serialize, Deserialize)]
pub struct FoodSearchResponse {
    pub query: String,
    pub total: usize,
    pub results: Vec<FoodSearchResult>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FoodListResponse {
    pub total: usize,
    pub foods: Vec<Food>,
}

// ============================================
// WEIGHT
// ============================================

#[derive(Debug, Serialize, Deserialize)]
pub struct WeightListResponse {
    pub total: usize,
    pub logs: Vec<WeightLog>,
}

// ============================================
// PROFILE
// ============================================

/// Profile registration; the role is assigned by the server
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub full_name: String,
}

// ============================================
// HEALTH DTOs
// ============================================

/// `GET /api/health` body
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiHealthResponse {
    /// "ok" or "error"
    pub status: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Full health status
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// "healthy" or "unhealthy"
    pub status: String,
    pub storage: String,
    pub uptime_seconds: u64,
    pub ws_connections: usize,
    pub version: String,
}
