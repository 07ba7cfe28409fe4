//! Row mapping
//!
//! Column lists and `rusqlite::Row` → row-type conversions. Every SELECT in
//! the engine uses the column list that belongs to the mapper it calls.

use rusqlite::types::Type;
use rusqlite::Row;
use std::str::FromStr;

use super::error::StorageResult;
use super::types::{
    DailySummary, Food, FoodAddon, FoodPortion, Meal, MealFood, Nutrition, Profile, UserGoal,
    WeightLog,
};

pub const PROFILE_COLUMNS: &str = "id, full_name, role, age, height_cm, weight_kg, \
    activity_level, dietary_restrictions, assigned_trainer_id, is_active, created_at, updated_at";

pub const FOOD_COLUMNS: &str = "id, display_name, category, subcategory, description, \
    is_approved, approved_by, requested_by, created_at, updated_at";

pub const PORTION_COLUMNS: &str = "id, food_id, display_name, description, calories, \
    protein_g, carbs_g, fats_g, fiber_g, created_at, updated_at";

pub const ADDON_COLUMNS: &str = "id, food_id, display_name, category, calories, \
    protein_g, carbs_g, fats_g, fiber_g, created_at, updated_at";

pub const MEAL_COLUMNS: &str = "id, user_id, meal_type, meal_date, total_calories, \
    total_protein_g, total_carbs_g, total_fats_g, total_fiber_g, created_at, updated_at";

pub const MEAL_FOOD_COLUMNS: &str = "id, meal_id, food_id, portion_id, food_name, \
    portion_display, selected_addons, addons_display, calories, protein_g, carbs_g, fats_g, \
    fiber_g, created_at";

pub const SUMMARY_COLUMNS: &str = "id, user_id, summary_date, total_calories, \
    total_protein_g, total_carbs_g, total_fats_g, total_fiber_g, meals_logged, target_calories, \
    target_protein_g, target_carbs_g, target_fats_g, target_fiber_g, days_since_last_log, \
    created_at, updated_at";

pub const GOAL_COLUMNS: &str = "id, user_id, daily_calorie, daily_protein_g, daily_carbs_g, \
    daily_fats_g, daily_fiber_g, start_date, end_date, is_active, set_by, set_by_user_id, \
    reason, created_at, updated_at";

pub const WEIGHT_COLUMNS: &str = "id, user_id, log_date, weight_kg, notes, created_at, updated_at";

/// Parse an enum stored as text
fn parse_column<T>(row: &Row<'_>, name: &str) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(name)?;
    let idx = row.as_ref().column_index(name)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Parse a JSON array column
fn list_column(row: &Row<'_>, name: &str) -> rusqlite::Result<Option<Vec<String>>> {
    let raw: Option<String> = row.get(name)?;
    let idx = row.as_ref().column_index(name)?;
    raw.map(|s| {
        serde_json::from_str(&s)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

/// Encode a list for a JSON array column; empty lists are stored as NULL
pub fn encode_list(items: &[String]) -> StorageResult<Option<String>> {
    if items.is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::to_string(items)?))
}

fn nutrition(row: &Row<'_>) -> rusqlite::Result<Nutrition> {
    Ok(Nutrition {
        calories: row.get("calories")?,
        protein_g: row.get("protein_g")?,
        carbs_g: row.get("carbs_g")?,
        fats_g: row.get("fats_g")?,
        fiber_g: row.get("fiber_g")?,
    })
}

pub fn profile(row: &Row<'_>) -> rusqlite::Result<Profile> {
    Ok(Profile {
        id: row.get("id")?,
        full_name: row.get("full_name")?,
        role: parse_column(row, "role")?,
        age: row.get("age")?,
        height_cm: row.get("height_cm")?,
        weight_kg: row.get("weight_kg")?,
        activity_level: row.get("activity_level")?,
        dietary_restrictions: list_column(row, "dietary_restrictions")?.unwrap_or_default(),
        assigned_trainer_id: row.get("assigned_trainer_id")?,
        is_active: row.get("is_active")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub fn food(row: &Row<'_>) -> rusqlite::Result<Food> {
    Ok(Food {
        id: row.get("id")?,
        display_name: row.get("display_name")?,
        category: row.get("category")?,
        subcategory: row.get("subcategory")?,
        description: row.get("description")?,
        is_approved: row.get("is_approved")?,
        approved_by: row.get("approved_by")?,
        requested_by: row.get("requested_by")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub fn portion(row: &Row<'_>) -> rusqlite::Result<FoodPortion> {
    Ok(FoodPortion {
        id: row.get("id")?,
        food_id: row.get("food_id")?,
        display_name: row.get("display_name")?,
        description: row.get("description")?,
        nutrition: nutrition(row)?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub fn addon(row: &Row<'_>) -> rusqlite::Result<FoodAddon> {
    Ok(FoodAddon {
        id: row.get("id")?,
        food_id: row.get("food_id")?,
        display_name: row.get("display_name")?,
        category: row.get("category")?,
        nutrition: nutrition(row)?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub fn meal(row: &Row<'_>) -> rusqlite::Result<Meal> {
    Ok(Meal {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        meal_type: parse_column(row, "meal_type")?,
        meal_date: row.get("meal_date")?,
        total_calories: row.get("total_calories")?,
        total_protein_g: row.get("total_protein_g")?,
        total_carbs_g: row.get("total_carbs_g")?,
        total_fats_g: row.get("total_fats_g")?,
        total_fiber_g: row.get("total_fiber_g")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub fn meal_food(row: &Row<'_>) -> rusqlite::Result<MealFood> {
    Ok(MealFood {
        id: row.get("id")?,
        meal_id: row.get("meal_id")?,
        food_id: row.get("food_id")?,
        portion_id: row.get("portion_id")?,
        food_name: row.get("food_name")?,
        portion_display: row.get("portion_display")?,
        selected_addons: list_column(row, "selected_addons")?,
        addons_display: list_column(row, "addons_display")?,
        nutrition: nutrition(row)?,
        created_at: row.get("created_at")?,
    })
}

pub fn summary(row: &Row<'_>) -> rusqlite::Result<DailySummary> {
    Ok(DailySummary {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        summary_date: row.get("summary_date")?,
        total_calories: row.get("total_calories")?,
        total_protein_g: row.get("total_protein_g")?,
        total_carbs_g: row.get("total_carbs_g")?,
        total_fats_g: row.get("total_fats_g")?,
        total_fiber_g: row.get("total_fiber_g")?,
        meals_logged: row.get("meals_logged")?,
        target_calories: row.get("target_calories")?,
        target_protein_g: row.get("target_protein_g")?,
        target_carbs_g: row.get("target_carbs_g")?,
        target_fats_g: row.get("target_fats_g")?,
        target_fiber_g: row.get("target_fiber_g")?,
        days_since_last_log: row.get("days_since_last_log")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub fn goal(row: &Row<'_>) -> rusqlite::Result<UserGoal> {
    Ok(UserGoal {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        daily_calorie: row.get("daily_calorie")?,
        daily_protein_g: row.get("daily_protein_g")?,
        daily_carbs_g: row.get("daily_carbs_g")?,
        daily_fats_g: row.get("daily_fats_g")?,
        daily_fiber_g: row.get("daily_fiber_g")?,
        start_date: row.get("start_date")?,
        end_date: row.get("end_date")?,
        is_active: row.get("is_active")?,
        set_by: parse_column(row, "set_by")?,
        set_by_user_id: row.get("set_by_user_id")?,
        reason: row.get("reason")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub fn weight_log(row: &Row<'_>) -> rusqlite::Result<WeightLog> {
    Ok(WeightLog {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        log_date: row.get("log_date")?,
        weight_kg: row.get("weight_kg")?,
        notes: row.get("notes")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
