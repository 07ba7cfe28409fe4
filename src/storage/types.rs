//! Core data types for the Renshuu storage layer
//!
//! This module defines the rows and inputs used throughout the crate:
//! - `MealType`, `Role`, `GoalSetter`, `ApprovalStatus`: classification enums
//! - `Nutrition`: calorie/macro bundle shared by portions, add-ons and meal lines
//! - Row types mirroring the tables (`Profile`, `Food`, `Meal`, `MealFood`, ...)
//! - Input types accepted by the storage engine for writes

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::StorageError;

// ============================================
// ENUMS
// ============================================

/// Meal slot a meal is logged under
///
/// Declaration order is display order: breakfast, lunch, dinner, snack.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealType {
    /// All meal types in display order
    pub fn all() -> &'static [MealType] {
        &[
            MealType::Breakfast,
            MealType::Lunch,
            MealType::Dinner,
            MealType::Snack,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MealType::Breakfast => "breakfast",
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
            MealType::Snack => "snack",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            MealType::Breakfast => "Breakfast",
            MealType::Lunch => "Lunch",
            MealType::Dinner => "Dinner",
            MealType::Snack => "Snack",
        }
    }
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MealType {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "breakfast" => Ok(MealType::Breakfast),
            "lunch" => Ok(MealType::Lunch),
            "dinner" => Ok(MealType::Dinner),
            "snack" => Ok(MealType::Snack),
            other => Err(StorageError::InvalidValue(format!(
                "unknown meal type '{}'",
                other
            ))),
        }
    }
}

/// Role of a profile
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Client,
    Trainer,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Trainer => "trainer",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client" => Ok(Role::Client),
            "trainer" => Ok(Role::Trainer),
            "admin" => Ok(Role::Admin),
            other => Err(StorageError::InvalidValue(format!("unknown role '{}'", other))),
        }
    }
}

/// Who set a goal
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum GoalSetter {
    #[default]
    #[serde(rename = "self")]
    SelfSet,
    Trainer,
    Admin,
}

impl GoalSetter {
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalSetter::SelfSet => "self",
            GoalSetter::Trainer => "trainer",
            GoalSetter::Admin => "admin",
        }
    }
}

impl FromStr for GoalSetter {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "self" => Ok(GoalSetter::SelfSet),
            "trainer" => Ok(GoalSetter::Trainer),
            "admin" => Ok(GoalSetter::Admin),
            other => Err(StorageError::InvalidValue(format!(
                "unknown goal setter '{}'",
                other
            ))),
        }
    }
}

/// Approval filter for the admin food table
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    #[default]
    All,
    Approved,
    /// Not approved, including never reviewed
    Pending,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::All => "all",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Pending => "pending",
        }
    }
}

// ============================================
// NUTRITION
// ============================================

/// Calories and macros for a portion, add-on or logged line
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Nutrition {
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fats_g: f64,
    #[serde(default)]
    pub fiber_g: Option<f64>,
}

impl Nutrition {
    pub fn new(calories: f64, protein_g: f64, carbs_g: f64, fats_g: f64) -> Self {
        Self {
            calories,
            protein_g,
            carbs_g,
            fats_g,
            fiber_g: None,
        }
    }

    /// Builder: set fiber
    pub fn fiber(mut self, fiber_g: f64) -> Self {
        self.fiber_g = Some(fiber_g);
        self
    }

    /// Add another bundle; fiber stays absent only when both sides lack it
    pub fn add(&self, other: &Nutrition) -> Nutrition {
        let fiber_g = match (self.fiber_g, other.fiber_g) {
            (None, None) => None,
            (a, b) => Some(a.unwrap_or(0.0) + b.unwrap_or(0.0)),
        };

        Nutrition {
            calories: self.calories + other.calories,
            protein_g: self.protein_g + other.protein_g,
            carbs_g: self.carbs_g + other.carbs_g,
            fats_g: self.fats_g + other.fats_g,
            fiber_g,
        }
    }
}

// ============================================
// ROWS
// ============================================

/// A user profile
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    pub id: String,
    pub full_name: String,
    pub role: Role,
    pub age: Option<i64>,
    pub height_cm: Option<i64>,
    pub weight_kg: Option<f64>,
    pub activity_level: Option<String>,
    #[serde(default)]
    pub dietary_restrictions: Vec<String>,
    pub assigned_trainer_id: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// An entry in the shared food database
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Food {
    pub id: String,
    pub display_name: String,
    pub category: String,
    pub subcategory: Option<String>,
    pub description: Option<String>,
    pub is_approved: Option<bool>,
    pub approved_by: Option<String>,
    pub requested_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Compact food row returned by search
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FoodSearchResult {
    pub id: String,
    pub display_name: String,
    pub category: String,
    pub subcategory: Option<String>,
    pub description: Option<String>,
}

/// Recently logged food, deduplicated by food id
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecentFood {
    pub food_id: String,
    pub food_name: String,
}

/// A servable portion of a food
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FoodPortion {
    pub id: String,
    pub food_id: String,
    pub display_name: String,
    pub description: Option<String>,
    #[serde(flatten)]
    pub nutrition: Nutrition,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An optional extra that can be added to a food
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FoodAddon {
    pub id: String,
    pub food_id: String,
    pub display_name: String,
    pub category: Option<String>,
    #[serde(flatten)]
    pub nutrition: Nutrition,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Portions (by calories) and add-ons (by name) offered for a food
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FoodOptions {
    pub portions: Vec<FoodPortion>,
    pub addons: Vec<FoodAddon>,
}

/// A user-submitted food together with its single portion
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CustomFood {
    pub food: Food,
    pub portion: FoodPortion,
}

/// A logged meal; totals are maintained from its lines
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Meal {
    pub id: String,
    pub user_id: String,
    pub meal_type: MealType,
    pub meal_date: NaiveDate,
    pub total_calories: Option<f64>,
    pub total_protein_g: Option<f64>,
    pub total_carbs_g: Option<f64>,
    pub total_fats_g: Option<f64>,
    pub total_fiber_g: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One logged food line inside a meal
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MealFood {
    pub id: String,
    pub meal_id: String,
    pub food_id: Option<String>,
    pub portion_id: Option<String>,
    pub food_name: String,
    pub portion_display: String,
    pub selected_addons: Option<Vec<String>>,
    pub addons_display: Option<Vec<String>>,
    #[serde(flatten)]
    pub nutrition: Nutrition,
    pub created_at: DateTime<Utc>,
}

/// A meal together with its lines
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MealWithFoods {
    #[serde(flatten)]
    pub meal: Meal,
    pub meal_foods: Vec<MealFood>,
}

/// Denormalized per-user-per-day totals
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailySummary {
    pub id: String,
    pub user_id: String,
    pub summary_date: NaiveDate,
    pub total_calories: f64,
    pub total_protein_g: f64,
    pub total_carbs_g: f64,
    pub total_fats_g: f64,
    pub total_fiber_g: f64,
    pub meals_logged: Option<i64>,
    pub target_calories: Option<i64>,
    pub target_protein_g: Option<f64>,
    pub target_carbs_g: Option<f64>,
    pub target_fats_g: Option<f64>,
    pub target_fiber_g: Option<f64>,
    pub days_since_last_log: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Effective-dated daily targets
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserGoal {
    pub id: String,
    pub user_id: String,
    pub daily_calorie: i64,
    pub daily_protein_g: f64,
    pub daily_carbs_g: f64,
    pub daily_fats_g: f64,
    pub daily_fiber_g: f64,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub is_active: bool,
    pub set_by: GoalSetter,
    pub set_by_user_id: Option<String>,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserGoal {
    /// Whether this goal applies on the given date
    pub fn in_effect_on(&self, date: NaiveDate) -> bool {
        self.is_active
            && self.start_date <= date
            && self.end_date.map(|end| end >= date).unwrap_or(true)
    }
}

/// One body-weight entry; unique per user per day
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeightLog {
    pub id: String,
    pub user_id: String,
    pub log_date: NaiveDate,
    pub weight_kg: f64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ============================================
// INPUTS
// ============================================

/// New profile registration
#[derive(Debug, Clone, Deserialize)]
pub struct NewProfile {
    pub full_name: String,
    #[serde(default)]
    pub role: Role,
}

/// Partial profile update; absent fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height_cm: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_kg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dietary_restrictions: Option<Vec<String>>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.age.is_none()
            && self.height_cm.is_none()
            && self.weight_kg.is_none()
            && self.activity_level.is_none()
            && self.dietary_restrictions.is_none()
    }
}

/// Food fields written by admins and custom-food creation
#[derive(Debug, Clone, Deserialize)]
pub struct FoodInput {
    pub display_name: String,
    pub category: String,
    #[serde(default)]
    pub subcategory: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_approved: Option<bool>,
}

/// Filters for the admin food table
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FoodFilter {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub status: ApprovalStatus,
}

/// Portion fields
#[derive(Debug, Clone, Deserialize)]
pub struct PortionInput {
    pub display_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(flatten)]
    pub nutrition: Nutrition,
}

/// Add-on fields
#[derive(Debug, Clone, Deserialize)]
pub struct AddonInput {
    pub display_name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(flatten)]
    pub nutrition: Nutrition,
}

/// Custom food submission: a name plus the nutrition of one portion
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CustomFoodInput {
    pub display_name: String,
    #[serde(default = "default_portion_name")]
    pub portion_name: String,
    #[serde(flatten)]
    pub nutrition: Nutrition,
}

pub fn default_portion_name() -> String {
    "1 serving".to_string()
}

/// A food line to add to a meal
///
/// When `meal_id` is absent a new meal of `meal_type` on `meal_date` is created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MealFoodInput {
    #[serde(default)]
    pub meal_id: Option<String>,
    pub meal_type: MealType,
    pub meal_date: NaiveDate,
    pub food_id: String,
    pub portion_id: String,
    #[serde(default)]
    pub selected_addons: Vec<String>,
}

/// New portion/add-on selection for an existing line
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MealFoodUpdate {
    pub portion_id: String,
    #[serde(default)]
    pub selected_addons: Vec<String>,
}

/// Weight entry fields
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeightInput {
    pub weight_kg: f64,
    pub log_date: NaiveDate,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Goal targets
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GoalInput {
    pub daily_calorie: i64,
    pub daily_protein_g: f64,
    pub daily_carbs_g: f64,
    pub daily_fats_g: f64,
    #[serde(default)]
    pub daily_fiber_g: f64,
    #[serde(default)]
    pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meal_type_order() {
        let mut types = vec![MealType::Snack, MealType::Breakfast, MealType::Dinner, MealType::Lunch];
        types.sort();
        assert_eq!(types, MealType::all());
    }

    #[test]
    fn test_meal_type_parse() {
        assert_eq!("Lunch".parse::<MealType>().unwrap(), MealType::Lunch);
        assert!("brunch".parse::<MealType>().is_err());
    }

    #[test]
    fn test_goal_setter_serializes_as_self() {
        let json = serde_json::to_string(&GoalSetter::SelfSet).unwrap();
        assert_eq!(json, "\"self\"");
    }

    #[test]
    fn test_nutrition_add_fiber() {
        let a = Nutrition::new(100.0, 5.0, 10.0, 2.0);
        let b = Nutrition::new(50.0, 1.0, 2.0, 3.0);
        assert_eq!(a.add(&b).fiber_g, None);

        let c = Nutrition::new(10.0, 0.0, 0.0, 0.0).fiber(1.5);
        let sum = a.add(&c);
        assert_eq!(sum.calories, 110.0);
        assert_eq!(sum.fiber_g, Some(1.5));
    }

    #[test]
    fn test_goal_in_effect() {
        let now = Utc::now();
        let goal = UserGoal {
            id: "g".into(),
            user_id: "u".into(),
            daily_calorie: 2000,
            daily_protein_g: 150.0,
            daily_carbs_g: 200.0,
            daily_fats_g: 65.0,
            daily_fiber_g: 25.0,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            end_date: Some(NaiveDate::from_ymd_opt(2024, 1, 20).unwrap()),
            is_active: true,
            set_by: GoalSetter::SelfSet,
            set_by_user_id: None,
            reason: None,
            created_at: now,
            updated_at: now,
        };

        assert!(!goal.in_effect_on(NaiveDate::from_ymd_opt(2024, 1, 9).unwrap()));
        assert!(goal.in_effect_on(NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()));
        assert!(goal.in_effect_on(NaiveDate::from_ymd_opt(2024, 1, 20).unwrap()));
        assert!(!goal.in_effect_on(NaiveDate::from_ymd_opt(2024, 1, 21).unwrap()));
    }
}
