//! Food catalog operations
//!
//! User-facing reads (search, recents, options) plus the admin surface for
//! foods, portions and add-ons.

use rusqlite::{params, Connection, OptionalExtension};

use crate::storage::engine::{new_id, now, StorageEngine};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::rows::{self, ADDON_COLUMNS, FOOD_COLUMNS, PORTION_COLUMNS};
use crate::storage::types::{
    AddonInput, CustomFood, CustomFoodInput, Food, FoodAddon, FoodFilter, FoodInput, FoodOptions,
    FoodPortion, FoodSearchResult, PortionInput, RecentFood,
};

/// Queries shorter than this return nothing
pub const MIN_SEARCH_LEN: usize = 2;
pub const SEARCH_LIMIT: usize = 50;
/// Meal lines scanned for recent foods
pub const RECENT_SCAN: usize = 50;
pub const RECENT_LIMIT: usize = 8;

/// `%query%` with LIKE wildcards escaped
fn like_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Keep the first occurrence of each food id, dropping lines whose food is gone
pub fn dedup_recent(lines: Vec<(Option<String>, String)>, limit: usize) -> Vec<RecentFood> {
    let mut seen = std::collections::HashSet::new();
    lines
        .into_iter()
        .filter_map(|(food_id, food_name)| food_id.map(|id| (id, food_name)))
        .filter(|(id, _)| seen.insert(id.clone()))
        .take(limit)
        .map(|(food_id, food_name)| RecentFood { food_id, food_name })
        .collect()
}

pub(crate) fn load_food(conn: &Connection, food_id: &str) -> StorageResult<Food> {
    conn.query_row(
        &format!("SELECT {} FROM foods WHERE id = ?1", FOOD_COLUMNS),
        [food_id],
        rows::food,
    )
    .optional()?
    .ok_or_else(|| StorageError::not_found("Food", food_id))
}

pub(crate) fn load_portion(conn: &Connection, portion_id: &str) -> StorageResult<FoodPortion> {
    conn.query_row(
        &format!("SELECT {} FROM food_portions WHERE id = ?1", PORTION_COLUMNS),
        [portion_id],
        rows::portion,
    )
    .optional()?
    .ok_or_else(|| StorageError::not_found("Portion", portion_id))
}

pub(crate) fn load_addon(conn: &Connection, addon_id: &str) -> StorageResult<FoodAddon> {
    conn.query_row(
        &format!("SELECT {} FROM food_addons WHERE id = ?1", ADDON_COLUMNS),
        [addon_id],
        rows::addon,
    )
    .optional()?
    .ok_or_else(|| StorageError::not_found("Addon", addon_id))
}

fn insert_portion(
    conn: &Connection,
    food_id: &str,
    input: &PortionInput,
) -> StorageResult<FoodPortion> {
    let id = new_id();
    let n = &input.nutrition;
    conn.execute(
        "INSERT INTO food_portions
            (id, food_id, display_name, description, calories, protein_g, carbs_g, fats_g,
             fiber_g, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
        params![
            id,
            food_id,
            input.display_name,
            input.description,
            n.calories,
            n.protein_g,
            n.carbs_g,
            n.fats_g,
            n.fiber_g,
            now(),
        ],
    )?;
    load_portion(conn, &id)
}

impl StorageEngine {
    // ============================================
    // USER-FACING READS
    // ============================================

    /// Foods visible to `user_id` whose name contains `query`
    ///
    /// Visible means approved or requested by the caller.
    pub async fn search_foods(
        &self,
        user_id: &str,
        query: &str,
    ) -> StorageResult<Vec<FoodSearchResult>> {
        let query = query.trim();
        if query.chars().count() < MIN_SEARCH_LEN {
            return Ok(Vec::new());
        }

        let conn = self.connection()?;
        let mut stmt = conn.prepare(
            "SELECT id, display_name, category, subcategory, description
             FROM foods
             WHERE display_name LIKE ?1 ESCAPE '\\'
               AND (is_approved = 1 OR requested_by = ?2)
             ORDER BY display_name COLLATE NOCASE
             LIMIT ?3",
        )?;

        let results = stmt
            .query_map(
                params![like_pattern(query), user_id, SEARCH_LIMIT as i64],
                |row| {
                    Ok(FoodSearchResult {
                        id: row.get(0)?,
                        display_name: row.get(1)?,
                        category: row.get(2)?,
                        subcategory: row.get(3)?,
                        description: row.get(4)?,
                    })
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(results)
    }

    /// Distinct foods from the caller's most recent meal lines
    pub async fn recent_foods(&self, user_id: &str) -> StorageResult<Vec<RecentFood>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(
            "SELECT mf.food_id, mf.food_name
             FROM meal_foods mf
             JOIN meals m ON m.id = mf.meal_id
             WHERE m.user_id = ?1
             ORDER BY mf.created_at DESC, mf.rowid DESC
             LIMIT ?2",
        )?;

        let lines = stmt
            .query_map(params![user_id, RECENT_SCAN as i64], |row| {
                Ok((row.get::<_, Option<String>>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(dedup_recent(lines, RECENT_LIMIT))
    }

    /// Portions by calories and add-ons by name
    pub async fn food_options(&self, food_id: &str) -> StorageResult<FoodOptions> {
        let conn = self.connection()?;
        load_food(&conn, food_id)?;

        let portions = conn
            .prepare(&format!(
                "SELECT {} FROM food_portions WHERE food_id = ?1 ORDER BY calories, rowid",
                PORTION_COLUMNS
            ))?
            .query_map([food_id], rows::portion)?
            .collect::<Result<Vec<_>, _>>()?;

        let addons = conn
            .prepare(&format!(
                "SELECT {} FROM food_addons WHERE food_id = ?1
                 ORDER BY display_name COLLATE NOCASE, rowid",
                ADDON_COLUMNS
            ))?
            .query_map([food_id], rows::addon)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(FoodOptions { portions, addons })
    }

    /// Submit an unapproved custom food with one portion
    pub async fn create_custom_food(
        &self,
        user_id: &str,
        input: CustomFoodInput,
    ) -> StorageResult<CustomFood> {
        let custom = self.with_transaction(|tx| {
            let food_id = new_id();
            tx.execute(
                "INSERT INTO foods
                    (id, display_name, category, is_approved, requested_by, created_at, updated_at)
                 VALUES (?1, ?2, 'custom', 0, ?3, ?4, ?4)",
                params![food_id, input.display_name.trim(), user_id, now()],
            )?;

            let portion_name = match input.portion_name.trim() {
                "" => "1 serving".to_string(),
                name => name.to_string(),
            };
            let portion = insert_portion(
                tx,
                &food_id,
                &PortionInput {
                    display_name: portion_name,
                    description: None,
                    nutrition: input.nutrition,
                },
            )?;

            Ok(CustomFood {
                food: load_food(tx, &food_id)?,
                portion,
            })
        })?;

        tracing::info!(user_id, food_id = %custom.food.id, "Custom food submitted");
        Ok(custom)
    }

    // ============================================
    // ADMIN: FOODS
    // ============================================

    pub async fn get_food(&self, food_id: &str) -> StorageResult<Food> {
        let conn = self.connection()?;
        load_food(&conn, food_id)
    }

    /// Admin food table, newest first
    pub async fn list_foods(&self, filter: &FoodFilter) -> StorageResult<Vec<Food>> {
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(like_pattern);
        let category = filter.category.as_deref().filter(|c| !c.is_empty());

        let conn = self.connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM foods
             WHERE (?1 IS NULL OR display_name LIKE ?1 ESCAPE '\\')
               AND (?2 IS NULL OR category = ?2)
               AND (?3 = 'all'
                    OR (?3 = 'approved' AND is_approved = 1)
                    OR (?3 = 'pending' AND COALESCE(is_approved, 0) = 0))
             ORDER BY created_at DESC, rowid DESC",
            FOOD_COLUMNS
        ))?;

        let foods = stmt
            .query_map(params![search, category, filter.status.as_str()], rows::food)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(foods)
    }

    /// Create a catalog food; approving it records the admin
    pub async fn create_food(&self, admin_id: &str, input: FoodInput) -> StorageResult<Food> {
        let conn = self.connection()?;
        let id = new_id();
        let approved_by = input.is_approved.unwrap_or(false).then_some(admin_id);

        conn.execute(
            "INSERT INTO foods
                (id, display_name, category, subcategory, description, is_approved, approved_by,
                 created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
            params![
                id,
                input.display_name,
                input.category,
                input.subcategory,
                input.description,
                input.is_approved,
                approved_by,
                now(),
            ],
        )?;
        load_food(&conn, &id)
    }

    /// Replace a food's fields; first approval records the admin
    pub async fn update_food(
        &self,
        admin_id: &str,
        food_id: &str,
        input: FoodInput,
    ) -> StorageResult<Food> {
        let conn = self.connection()?;
        let changed = conn.execute(
            "UPDATE foods SET
                display_name = ?2,
                category = ?3,
                subcategory = ?4,
                description = ?5,
                is_approved = ?6,
                approved_by = CASE WHEN ?6 = 1 AND approved_by IS NULL THEN ?7 ELSE approved_by END,
                updated_at = ?8
             WHERE id = ?1",
            params![
                food_id,
                input.display_name,
                input.category,
                input.subcategory,
                input.description,
                input.is_approved,
                admin_id,
                now(),
            ],
        )?;
        if changed == 0 {
            return Err(StorageError::not_found("Food", food_id));
        }
        load_food(&conn, food_id)
    }

    pub async fn approve_food(&self, admin_id: &str, food_id: &str) -> StorageResult<Food> {
        let conn = self.connection()?;
        let changed = conn.execute(
            "UPDATE foods SET is_approved = 1, approved_by = ?2, updated_at = ?3 WHERE id = ?1",
            params![food_id, admin_id, now()],
        )?;
        if changed == 0 {
            return Err(StorageError::not_found("Food", food_id));
        }

        tracing::info!(food_id, admin_id, "Food approved");
        load_food(&conn, food_id)
    }

    /// Delete a food with its portions and add-ons
    pub async fn delete_food(&self, food_id: &str) -> StorageResult<()> {
        let conn = self.connection()?;
        let changed = conn.execute("DELETE FROM foods WHERE id = ?1", [food_id])?;
        if changed == 0 {
            return Err(StorageError::not_found("Food", food_id));
        }
        Ok(())
    }

    // ============================================
    // ADMIN: PORTIONS
    // ============================================

    /// Portions in creation order
    pub async fn list_portions(&self, food_id: &str) -> StorageResult<Vec<FoodPortion>> {
        let conn = self.connection()?;
        load_food(&conn, food_id)?;

        let portions = conn
            .prepare(&format!(
                "SELECT {} FROM food_portions WHERE food_id = ?1 ORDER BY created_at, rowid",
                PORTION_COLUMNS
            ))?
            .query_map([food_id], rows::portion)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(portions)
    }

    pub async fn create_portion(
        &self,
        food_id: &str,
        input: PortionInput,
    ) -> StorageResult<FoodPortion> {
        let conn = self.connection()?;
        load_food(&conn, food_id)?;
        insert_portion(&conn, food_id, &input)
    }

    pub async fn update_portion(
        &self,
        portion_id: &str,
        input: PortionInput,
    ) -> StorageResult<FoodPortion> {
        let conn = self.connection()?;
        let n = &input.nutrition;
        let changed = conn.execute(
            "UPDATE food_portions SET
                display_name = ?2, description = ?3, calories = ?4, protein_g = ?5,
                carbs_g = ?6, fats_g = ?7, fiber_g = ?8, updated_at = ?9
             WHERE id = ?1",
            params![
                portion_id,
                input.display_name,
                input.description,
                n.calories,
                n.protein_g,
                n.carbs_g,
                n.fats_g,
                n.fiber_g,
                now(),
            ],
        )?;
        if changed == 0 {
            return Err(StorageError::not_found("Portion", portion_id));
        }
        load_portion(&conn, portion_id)
    }

    pub async fn delete_portion(&self, portion_id: &str) -> StorageResult<()> {
        let conn = self.connection()?;
        let changed = conn.execute("DELETE FROM food_portions WHERE id = ?1", [portion_id])?;
        if changed == 0 {
            return Err(StorageError::not_found("Portion", portion_id));
        }
        Ok(())
    }

    // ============================================
    // ADMIN: ADD-ONS
    // ============================================

    pub async fn list_addons(&self, food_id: &str) -> StorageResult<Vec<FoodAddon>> {
        let conn = self.connection()?;
        load_food(&conn, food_id)?;

        let addons = conn
            .prepare(&format!(
                "SELECT {} FROM food_addons WHERE food_id = ?1 ORDER BY created_at, rowid",
                ADDON_COLUMNS
            ))?
            .query_map([food_id], rows::addon)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(addons)
    }

    pub async fn create_addon(&self, food_id: &str, input: AddonInput) -> StorageResult<FoodAddon> {
        let conn = self.connection()?;
        load_food(&conn, food_id)?;

        let id = new_id();
        let n = &input.nutrition;
        conn.execute(
            "INSERT INTO food_addons
                (id, food_id, display_name, category, calories, protein_g, carbs_g, fats_g,
                 fiber_g, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
            params![
                id,
                food_id,
                input.display_name,
                input.category,
                n.calories,
                n.protein_g,
                n.carbs_g,
                n.fats_g,
                n.fiber_g,
                now(),
            ],
        )?;
        load_addon(&conn, &id)
    }

    pub async fn update_addon(&self, addon_id: &str, input: AddonInput) -> StorageResult<FoodAddon> {
        let conn = self.connection()?;
        let n = &input.nutrition;
        let changed = conn.execute(
            "UPDATE food_addons SET
                display_name = ?2, category = ?3, calories = ?4, protein_g = ?5,
                carbs_g = ?6, fats_g = ?7, fiber_g = ?8, updated_at = ?9
             WHERE id = ?1",
            params![
                addon_id,
                input.display_name,
                input.category,
                n.calories,
                n.protein_g,
                n.carbs_g,
                n.fats_g,
                n.fiber_g,
                now(),
            ],
        )?;
        if changed == 0 {
            return Err(StorageError::not_found("Addon", addon_id));
        }
        load_addon(&conn, addon_id)
    }

    pub async fn delete_addon(&self, addon_id: &str) -> StorageResult<()> {
        let conn = self.connection()?;
        let changed = conn.execute("DELETE FROM food_addons WHERE id = ?1", [addon_id])?;
        if changed == 0 {
            return Err(StorageError::not_found("Addon", addon_id));
        }
        Ok(())
    }
}
