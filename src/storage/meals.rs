//! Meal and meal-line operations
//!
//! Line nutrition is computed here from the chosen portion plus add-ons.
//! After every line insert, update or delete the owning meal's totals and
//! the day's summary are recalculated in the same transaction.

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::{HashMap, HashSet};

use crate::storage::engine::{new_id, now, StorageEngine};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::foods::{load_addon, load_food, load_portion};
use crate::storage::rows::{self, encode_list, MEAL_COLUMNS, MEAL_FOOD_COLUMNS};
use crate::storage::tracking::recalculate_daily_summary;
use crate::storage::types::{
    Meal, MealFood, MealFoodInput, MealFoodUpdate, MealType, MealWithFoods, Nutrition,
};

/// What a line records about its food, resolved from the catalog
struct ResolvedLine {
    food_name: String,
    portion_display: String,
    addon_names: Vec<String>,
    nutrition: Nutrition,
}

/// Portion + add-ons; every add-on must belong to `food_id` and appear once
fn resolve_line(
    conn: &Connection,
    food_id: &str,
    portion_id: &str,
    addon_ids: &[String],
) -> StorageResult<ResolvedLine> {
    let food = load_food(conn, food_id)?;
    let portion = load_portion(conn, portion_id)?;
    if portion.food_id != food_id {
        return Err(StorageError::InvalidReference(format!(
            "portion {} does not belong to food {}",
            portion_id, food_id
        )));
    }

    let mut seen = HashSet::with_capacity(addon_ids.len());
    if let Some(repeated) = addon_ids.iter().find(|id| !seen.insert(id.as_str())) {
        return Err(StorageError::InvalidValue(format!(
            "addon {} selected more than once",
            repeated
        )));
    }

    let mut nutrition = portion.nutrition;
    let mut addon_names = Vec::with_capacity(addon_ids.len());
    for addon_id in addon_ids {
        let addon = load_addon(conn, addon_id)?;
        if addon.food_id != food_id {
            return Err(StorageError::InvalidReference(format!(
                "addon {} does not belong to food {}",
                addon_id, food_id
            )));
        }
        nutrition = nutrition.add(&addon.nutrition);
        addon_names.push(addon.display_name);
    }

    Ok(ResolvedLine {
        food_name: food.display_name,
        portion_display: portion.display_name,
        addon_names,
        nutrition,
    })
}

fn load_meal_for_user(conn: &Connection, user_id: &str, meal_id: &str) -> StorageResult<Meal> {
    conn.query_row(
        &format!(
            "SELECT {} FROM meals WHERE id = ?1 AND user_id = ?2",
            MEAL_COLUMNS
        ),
        params![meal_id, user_id],
        rows::meal,
    )
    .optional()?
    .ok_or_else(|| StorageError::not_found("Meal", meal_id))
}

fn load_meal_food(conn: &Connection, id: &str) -> StorageResult<MealFood> {
    conn.query_row(
        &format!("SELECT {} FROM meal_foods WHERE id = ?1", MEAL_FOOD_COLUMNS),
        [id],
        rows::meal_food,
    )
    .optional()?
    .ok_or_else(|| StorageError::not_found("MealFood", id))
}

/// A line and its meal, provided the meal belongs to `user_id`
fn load_owned_line(conn: &Connection, user_id: &str, id: &str) -> StorageResult<(MealFood, Meal)> {
    let line = load_meal_food(conn, id)?;
    let meal = load_meal_for_user(conn, user_id, &line.meal_id)
        .map_err(|_| StorageError::not_found("MealFood", id))?;
    Ok((line, meal))
}

/// Recompute a meal's totals from its lines
pub(crate) fn recalculate_meal(conn: &Connection, meal_id: &str) -> StorageResult<()> {
    conn.execute(
        "UPDATE meals SET
            total_calories  = (SELECT COALESCE(SUM(calories), 0) FROM meal_foods WHERE meal_id = ?1),
            total_protein_g = (SELECT COALESCE(SUM(protein_g), 0) FROM meal_foods WHERE meal_id = ?1),
            total_carbs_g   = (SELECT COALESCE(SUM(carbs_g), 0) FROM meal_foods WHERE meal_id = ?1),
            total_fats_g    = (SELECT COALESCE(SUM(fats_g), 0) FROM meal_foods WHERE meal_id = ?1),
            total_fiber_g   = (SELECT COALESCE(SUM(fiber_g), 0) FROM meal_foods WHERE meal_id = ?1),
            updated_at = ?2
         WHERE id = ?1",
        params![meal_id, now()],
    )?;
    Ok(())
}

/// Attach lines (in creation order) to already-ordered meals
fn with_foods(conn: &Connection, meals: Vec<Meal>) -> StorageResult<Vec<MealWithFoods>> {
    if meals.is_empty() {
        return Ok(Vec::new());
    }

    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM meal_foods WHERE meal_id = ?1 ORDER BY created_at, rowid",
        MEAL_FOOD_COLUMNS
    ))?;

    let mut lines: HashMap<String, Vec<MealFood>> = HashMap::new();
    for meal in &meals {
        let foods = stmt
            .query_map([&meal.id], rows::meal_food)?
            .collect::<Result<Vec<_>, _>>()?;
        lines.insert(meal.id.clone(), foods);
    }

    Ok(meals
        .into_iter()
        .map(|meal| {
            let meal_foods = lines.remove(&meal.id).unwrap_or_default();
            MealWithFoods { meal, meal_foods }
        })
        .collect())
}

impl StorageEngine {
    /// The caller's meals for one date, oldest first, with their lines
    pub async fn meals_for_date(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> StorageResult<Vec<MealWithFoods>> {
        let conn = self.connection()?;
        let meals = conn
            .prepare(&format!(
                "SELECT {} FROM meals WHERE user_id = ?1 AND meal_date = ?2
                 ORDER BY created_at, rowid",
                MEAL_COLUMNS
            ))?
            .query_map(params![user_id, date], rows::meal)?
            .collect::<Result<Vec<_>, _>>()?;

        with_foods(&conn, meals)
    }

    /// Meals in `[start, end]`, newest date first, oldest first within a date
    pub async fn meals_in_range(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StorageResult<Vec<MealWithFoods>> {
        let conn = self.connection()?;
        let meals = conn
            .prepare(&format!(
                "SELECT {} FROM meals WHERE user_id = ?1 AND meal_date BETWEEN ?2 AND ?3
                 ORDER BY meal_date DESC, created_at, rowid",
                MEAL_COLUMNS
            ))?
            .query_map(params![user_id, start, end], rows::meal)?
            .collect::<Result<Vec<_>, _>>()?;

        with_foods(&conn, meals)
    }

    /// Log a food line, creating the meal when `meal_id` is absent
    pub async fn add_meal_food(
        &self,
        user_id: &str,
        input: MealFoodInput,
    ) -> StorageResult<MealFood> {
        let line = self.with_transaction(|tx| {
            let meal_id = match &input.meal_id {
                Some(meal_id) => {
                    let meal = load_meal_for_user(tx, user_id, meal_id)?;
                    if meal.meal_type != input.meal_type || meal.meal_date != input.meal_date {
                        return Err(StorageError::InvalidReference(format!(
                            "meal {} is {} on {}",
                            meal.id, meal.meal_type, meal.meal_date
                        )));
                    }
                    meal.id
                }
                None => create_meal(tx, user_id, input.meal_type, input.meal_date)?,
            };

            let resolved = resolve_line(tx, &input.food_id, &input.portion_id, &input.selected_addons)?;

            let id = new_id();
            let n = &resolved.nutrition;
            tx.execute(
                "INSERT INTO meal_foods
                    (id, meal_id, food_id, portion_id, food_name, portion_display,
                     selected_addons, addons_display, calories, protein_g, carbs_g, fats_g,
                     fiber_g, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                params![
                    id,
                    meal_id,
                    input.food_id,
                    input.portion_id,
                    resolved.food_name,
                    resolved.portion_display,
                    encode_list(&input.selected_addons)?,
                    encode_list(&resolved.addon_names)?,
                    n.calories,
                    n.protein_g,
                    n.carbs_g,
                    n.fats_g,
                    n.fiber_g,
                    now(),
                ],
            )?;

            recalculate_meal(tx, &meal_id)?;
            recalculate_daily_summary(tx, user_id, input.meal_date)?;
            load_meal_food(tx, &id)
        })?;

        tracing::debug!(
            user_id,
            meal_id = %line.meal_id,
            calories = line.nutrition.calories,
            "Logged meal food"
        );
        Ok(line)
    }

    /// Change a line's portion and add-ons
    pub async fn update_meal_food(
        &self,
        user_id: &str,
        id: &str,
        update: MealFoodUpdate,
    ) -> StorageResult<MealFood> {
        self.with_transaction(|tx| {
            let (line, meal) = load_owned_line(tx, user_id, id)?;
            let food_id = line.food_id.ok_or_else(|| {
                StorageError::InvalidReference(format!("food for line {} no longer exists", id))
            })?;

            let resolved = resolve_line(tx, &food_id, &update.portion_id, &update.selected_addons)?;
            let n = &resolved.nutrition;
            tx.execute(
                "UPDATE meal_foods SET
                    portion_id = ?2, food_name = ?3, portion_display = ?4, selected_addons = ?5,
                    addons_display = ?6, calories = ?7, protein_g = ?8, carbs_g = ?9,
                    fats_g = ?10, fiber_g = ?11
                 WHERE id = ?1",
                params![
                    id,
                    update.portion_id,
                    resolved.food_name,
                    resolved.portion_display,
                    encode_list(&update.selected_addons)?,
                    encode_list(&resolved.addon_names)?,
                    n.calories,
                    n.protein_g,
                    n.carbs_g,
                    n.fats_g,
                    n.fiber_g,
                ],
            )?;

            recalculate_meal(tx, &meal.id)?;
            recalculate_daily_summary(tx, user_id, meal.meal_date)?;
            load_meal_food(tx, id)
        })
    }

    /// Remove a line; the (possibly now empty) meal is kept
    pub async fn delete_meal_food(&self, user_id: &str, id: &str) -> StorageResult<()> {
        self.with_transaction(|tx| {
            let (_, meal) = load_owned_line(tx, user_id, id)?;
            tx.execute("DELETE FROM meal_foods WHERE id = ?1", [id])?;
            recalculate_meal(tx, &meal.id)?;
            recalculate_daily_summary(tx, user_id, meal.meal_date)?;
            Ok(())
        })
    }
}

fn create_meal(
    conn: &Connection,
    user_id: &str,
    meal_type: MealType,
    meal_date: NaiveDate,
) -> StorageResult<String> {
    let id = new_id();
    conn.execute(
        "INSERT INTO meals (id, user_id, meal_type, meal_date, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        params![id, user_id, meal_type.as_str(), meal_date, now()],
    )?;
    Ok(id)
}
