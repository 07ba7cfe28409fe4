//! Daily summaries, goals and weight logs

use chrono::{Duration, NaiveDate};
use rusqlite::{params, Connection, OptionalExtension};

use crate::storage::engine::{new_id, now, StorageEngine};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::rows::{self, GOAL_COLUMNS, SUMMARY_COLUMNS, WEIGHT_COLUMNS};
use crate::storage::types::{
    DailySummary, GoalInput, GoalSetter, UserGoal, WeightInput, WeightLog,
};

/// Goal in effect on `date`; the latest start date wins.
///
/// A goal closed by a newer one keeps covering `start_date..=end_date`.
pub(crate) fn goal_in_effect(
    conn: &Connection,
    user_id: &str,
    date: NaiveDate,
) -> StorageResult<Option<UserGoal>> {
    let goal = conn
        .query_row(
            &format!(
                "SELECT {} FROM user_goals
                 WHERE user_id = ?1 AND start_date <= ?2
                   AND (is_active = 1 OR end_date IS NOT NULL)
                   AND (end_date IS NULL OR end_date >= ?2)
                 ORDER BY start_date DESC, created_at DESC, rowid DESC
                 LIMIT 1",
                GOAL_COLUMNS
            ),
            params![user_id, date],
            rows::goal,
        )
        .optional()?;
    Ok(goal)
}

/// Rebuild the summary row for one user and date from the meals table
pub(crate) fn recalculate_daily_summary(
    conn: &Connection,
    user_id: &str,
    date: NaiveDate,
) -> StorageResult<()> {
    let (calories, protein, carbs, fats, fiber): (f64, f64, f64, f64, f64) = conn.query_row(
        "SELECT COALESCE(SUM(total_calories), 0), COALESCE(SUM(total_protein_g), 0),
                COALESCE(SUM(total_carbs_g), 0), COALESCE(SUM(total_fats_g), 0),
                COALESCE(SUM(total_fiber_g), 0)
         FROM meals WHERE user_id = ?1 AND meal_date = ?2",
        params![user_id, date],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
    )?;

    let meals_logged: i64 = conn.query_row(
        "SELECT COUNT(*) FROM meals m
         WHERE m.user_id = ?1 AND m.meal_date = ?2
           AND EXISTS (SELECT 1 FROM meal_foods mf WHERE mf.meal_id = m.id)",
        params![user_id, date],
        |row| row.get(0),
    )?;

    let last_logged: Option<NaiveDate> = conn.query_row(
        "SELECT MAX(m.meal_date) FROM meals m
         WHERE m.user_id = ?1 AND m.meal_date < ?2
           AND EXISTS (SELECT 1 FROM meal_foods mf WHERE mf.meal_id = m.id)",
        params![user_id, date],
        |row| row.get(0),
    )?;
    let days_since_last_log = last_logged.map(|last| (date - last).num_days());

    let goal = goal_in_effect(conn, user_id, date)?;
    let ts = now();

    conn.execute(
        "INSERT INTO daily_summaries
            (id, user_id, summary_date, total_calories, total_protein_g, total_carbs_g,
             total_fats_g, total_fiber_g, meals_logged, target_calories, target_protein_g,
             target_carbs_g, target_fats_g, target_fiber_g, days_since_last_log,
             created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?16)
         ON CONFLICT(user_id, summary_date) DO UPDATE SET
            total_calories = excluded.total_calories,
            total_protein_g = excluded.total_protein_g,
            total_carbs_g = excluded.total_carbs_g,
            total_fats_g = excluded.total_fats_g,
            total_fiber_g = excluded.total_fiber_g,
            meals_logged = excluded.meals_logged,
            target_calories = excluded.target_calories,
            target_protein_g = excluded.target_protein_g,
            target_carbs_g = excluded.target_carbs_g,
            target_fats_g = excluded.target_fats_g,
            target_fiber_g = excluded.target_fiber_g,
            days_since_last_log = excluded.days_since_last_log,
            updated_at = excluded.updated_at",
        params![
            new_id(),
            user_id,
            date,
            calories,
            protein,
            carbs,
            fats,
            fiber,
            meals_logged,
            goal.as_ref().map(|g| g.daily_calorie),
            goal.as_ref().map(|g| g.daily_protein_g),
            goal.as_ref().map(|g| g.daily_carbs_g),
            goal.as_ref().map(|g| g.daily_fats_g),
            goal.as_ref().map(|g| g.daily_fiber_g),
            days_since_last_log,
            ts,
        ],
    )?;

    tracing::trace!(user_id, %date, calories, meals_logged, "Recalculated daily summary");
    Ok(())
}

fn load_weight_log(conn: &Connection, user_id: &str, id: &str) -> StorageResult<WeightLog> {
    conn.query_row(
        &format!(
            "SELECT {} FROM weight_logs WHERE id = ?1 AND user_id = ?2",
            WEIGHT_COLUMNS
        ),
        params![id, user_id],
        rows::weight_log,
    )
    .optional()?
    .ok_or_else(|| StorageError::not_found("WeightLog", id))
}

fn load_goal(conn: &Connection, user_id: &str, id: &str) -> StorageResult<UserGoal> {
    conn.query_row(
        &format!(
            "SELECT {} FROM user_goals WHERE id = ?1 AND user_id = ?2",
            GOAL_COLUMNS
        ),
        params![id, user_id],
        rows::goal,
    )
    .optional()?
    .ok_or_else(|| StorageError::not_found("Goal", id))
}

/// Refresh targets of an existing summary row after a goal change
fn refresh_summary_targets(conn: &Connection, user_id: &str, date: NaiveDate) -> StorageResult<()> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM daily_summaries WHERE user_id = ?1 AND summary_date = ?2)",
        params![user_id, date],
        |row| row.get(0),
    )?;
    if exists {
        recalculate_daily_summary(conn, user_id, date)?;
    }
    Ok(())
}

impl StorageEngine {
    // ============================================
    // SUMMARIES
    // ============================================

    pub async fn summary_for_date(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> StorageResult<Option<DailySummary>> {
        let conn = self.connection()?;
        let summary = conn
            .query_row(
                &format!(
                    "SELECT {} FROM daily_summaries WHERE user_id = ?1 AND summary_date = ?2",
                    SUMMARY_COLUMNS
                ),
                params![user_id, date],
                rows::summary,
            )
            .optional()?;
        Ok(summary)
    }

    /// Summaries in `[start, end]`, newest first
    pub async fn summaries_in_range(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StorageResult<Vec<DailySummary>> {
        let conn = self.connection()?;
        let summaries = conn
            .prepare(&format!(
                "SELECT {} FROM daily_summaries
                 WHERE user_id = ?1 AND summary_date BETWEEN ?2 AND ?3
                 ORDER BY summary_date DESC",
                SUMMARY_COLUMNS
            ))?
            .query_map(params![user_id, start, end], rows::summary)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(summaries)
    }

    // ============================================
    // GOALS
    // ============================================

    pub async fn current_goal(
        &self,
        user_id: &str,
        today: NaiveDate,
    ) -> StorageResult<Option<UserGoal>> {
        let conn = self.connection()?;
        goal_in_effect(&conn, user_id, today)
    }

    /// Start a self-set goal today, closing every previously active goal
    pub async fn create_goal(
        &self,
        user_id: &str,
        input: GoalInput,
        today: NaiveDate,
    ) -> StorageResult<UserGoal> {
        let goal = self.with_transaction(|tx| {
            let ts = now();
            let yesterday = today - Duration::days(1);

            let closed = tx.execute(
                "UPDATE user_goals SET
                    is_active = 0,
                    end_date = COALESCE(end_date, ?2),
                    updated_at = ?3
                 WHERE user_id = ?1 AND is_active = 1",
                params![user_id, yesterday, ts],
            )?;

            let id = new_id();
            tx.execute(
                "INSERT INTO user_goals
                    (id, user_id, daily_calorie, daily_protein_g, daily_carbs_g, daily_fats_g,
                     daily_fiber_g, start_date, end_date, is_active, set_by, set_by_user_id,
                     reason, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, NULL, 1, ?9, ?2, ?10, ?11, ?11)",
                params![
                    id,
                    user_id,
                    input.daily_calorie,
                    input.daily_protein_g,
                    input.daily_carbs_g,
                    input.daily_fats_g,
                    input.daily_fiber_g,
                    today,
                    GoalSetter::SelfSet.as_str(),
                    input.reason,
                    ts,
                ],
            )?;

            refresh_summary_targets(tx, user_id, today)?;
            tracing::debug!(user_id, closed, "Started new goal");
            load_goal(tx, user_id, &id)
        })?;

        Ok(goal)
    }

    /// Overwrite a goal's targets in place
    pub async fn update_goal(
        &self,
        user_id: &str,
        goal_id: &str,
        input: GoalInput,
        today: NaiveDate,
    ) -> StorageResult<UserGoal> {
        self.with_transaction(|tx| {
            let changed = tx.execute(
                "UPDATE user_goals SET
                    daily_calorie = ?3, daily_protein_g = ?4, daily_carbs_g = ?5,
                    daily_fats_g = ?6, daily_fiber_g = ?7, reason = COALESCE(?8, reason),
                    updated_at = ?9
                 WHERE id = ?1 AND user_id = ?2",
                params![
                    goal_id,
                    user_id,
                    input.daily_calorie,
                    input.daily_protein_g,
                    input.daily_carbs_g,
                    input.daily_fats_g,
                    input.daily_fiber_g,
                    input.reason,
                    now(),
                ],
            )?;
            if changed == 0 {
                return Err(StorageError::not_found("Goal", goal_id));
            }

            refresh_summary_targets(tx, user_id, today)?;
            load_goal(tx, user_id, goal_id)
        })
    }

    // ============================================
    // WEIGHT
    // ============================================

    /// Most recent weight logs, newest date first
    pub async fn recent_weight_logs(
        &self,
        user_id: &str,
        limit: usize,
    ) -> StorageResult<Vec<WeightLog>> {
        let conn = self.connection()?;
        let logs = conn
            .prepare(&format!(
                "SELECT {} FROM weight_logs WHERE user_id = ?1
                 ORDER BY log_date DESC LIMIT ?2",
                WEIGHT_COLUMNS
            ))?
            .query_map(params![user_id, limit as i64], rows::weight_log)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(logs)
    }

    /// Insert or replace the entry for `input.log_date`
    pub async fn upsert_weight(&self, user_id: &str, input: WeightInput) -> StorageResult<WeightLog> {
        let conn = self.connection()?;
        let ts = now();

        conn.execute(
            "INSERT INTO weight_logs (id, user_id, log_date, weight_kg, notes, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
             ON CONFLICT(user_id, log_date) DO UPDATE SET
                weight_kg = excluded.weight_kg,
                notes = excluded.notes,
                updated_at = excluded.updated_at",
            params![new_id(), user_id, input.log_date, input.weight_kg, input.notes, ts],
        )?;

        let log = conn.query_row(
            &format!(
                "SELECT {} FROM weight_logs WHERE user_id = ?1 AND log_date = ?2",
                WEIGHT_COLUMNS
            ),
            params![user_id, input.log_date],
            rows::weight_log,
        )?;
        Ok(log)
    }

    /// Edit a log in place; moving it onto another logged date conflicts
    pub async fn update_weight(
        &self,
        user_id: &str,
        id: &str,
        input: WeightInput,
    ) -> StorageResult<WeightLog> {
        let conn = self.connection()?;
        load_weight_log(&conn, user_id, id)?;

        let taken: bool = conn.query_row(
            "SELECT EXISTS (SELECT 1 FROM weight_logs
                            WHERE user_id = ?1 AND log_date = ?2 AND id != ?3)",
            params![user_id, input.log_date, id],
            |row| row.get(0),
        )?;
        if taken {
            return Err(StorageError::Conflict(format!(
                "weight already logged for {}",
                input.log_date
            )));
        }

        conn.execute(
            "UPDATE weight_logs SET log_date = ?3, weight_kg = ?4, notes = ?5, updated_at = ?6
             WHERE id = ?1 AND user_id = ?2",
            params![id, user_id, input.log_date, input.weight_kg, input.notes, now()],
        )?;
        load_weight_log(&conn, user_id, id)
    }

    pub async fn delete_weight(&self, user_id: &str, id: &str) -> StorageResult<()> {
        let conn = self.connection()?;
        let changed = conn.execute(
            "DELETE FROM weight_logs WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;
        if changed == 0 {
            return Err(StorageError::not_found("WeightLog", id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::testing::{engine_with_user, seed_food};
    use crate::storage::types::{MealFoodInput, MealType};

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn goal(calories: i64) -> GoalInput {
        GoalInput {
            daily_calorie: calories,
            daily_protein_g: 150.0,
            daily_carbs_g: 200.0,
            daily_fats_g: 65.0,
            daily_fiber_g: 0.0,
            reason: None,
        }
    }

    fn weight(kg: f64, day: u32) -> WeightInput {
        WeightInput {
            weight_kg: kg,
            log_date: date(day),
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_new_goal_closes_previous() {
        let engine = engine_with_user("u1").await;

        let first = engine.create_goal("u1", goal(2000), date(1)).await.unwrap();
        assert!(first.is_active);
        assert_eq!(first.start_date, date(1));
        assert_eq!(first.set_by, GoalSetter::SelfSet);

        let second = engine.create_goal("u1", goal(1800), date(10)).await.unwrap();

        let current = engine.current_goal("u1", date(10)).await.unwrap().unwrap();
        assert_eq!(current.id, second.id);

        let conn = engine.connection().unwrap();
        let closed = load_goal(&conn, "u1", &first.id).unwrap();
        assert!(!closed.is_active);
        assert_eq!(closed.end_date, Some(date(9)));
    }

    #[tokio::test]
    async fn test_closed_goal_still_covers_past_days() {
        let engine = engine_with_user("u1").await;
        let oats = seed_food(&engine, "Oatmeal", true).await;

        let first = engine.create_goal("u1", goal(2000), date(1)).await.unwrap();
        engine.create_goal("u1", goal(2500), date(5)).await.unwrap();

        let past = engine.current_goal("u1", date(3)).await.unwrap().unwrap();
        assert_eq!(past.id, first.id);

        engine
            .add_meal_food(
                "u1",
                MealFoodInput {
                    meal_id: None,
                    meal_type: MealType::Breakfast,
                    meal_date: date(3),
                    food_id: oats.food.id.clone(),
                    portion_id: oats.portions[0].id.clone(),
                    selected_addons: vec![],
                },
            )
            .await
            .unwrap();

        let summary = engine.summary_for_date("u1", date(3)).await.unwrap().unwrap();
        assert_eq!(summary.target_calories, Some(2000));

        let current = engine.current_goal("u1", date(5)).await.unwrap().unwrap();
        assert_eq!(current.daily_calorie, 2500);
    }

    #[tokio::test]
    async fn test_no_goal_before_start() {
        let engine = engine_with_user("u1").await;
        engine.create_goal("u1", goal(2000), date(5)).await.unwrap();

        assert!(engine.current_goal("u1", date(4)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_goal_refreshes_today_targets() {
        let engine = engine_with_user("u1").await;
        let oats = seed_food(&engine, "Oatmeal", true).await;
        let created = engine.create_goal("u1", goal(2000), date(4)).await.unwrap();

        engine
            .add_meal_food(
                "u1",
                MealFoodInput {
                    meal_id: None,
                    meal_type: MealType::Lunch,
                    meal_date: date(4),
                    food_id: oats.food.id.clone(),
                    portion_id: oats.portions[0].id.clone(),
                    selected_addons: vec![],
                },
            )
            .await
            .unwrap();
        let summary = engine.summary_for_date("u1", date(4)).await.unwrap().unwrap();
        assert_eq!(summary.target_calories, Some(2000));

        let updated = engine
            .update_goal("u1", &created.id, goal(2200), date(4))
            .await
            .unwrap();
        assert_eq!(updated.daily_calorie, 2200);

        let summary = engine.summary_for_date("u1", date(4)).await.unwrap().unwrap();
        assert_eq!(summary.target_calories, Some(2200));

        let err = engine
            .update_goal("someone-else", &created.id, goal(1), date(4))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_days_since_last_log() {
        let engine = engine_with_user("u1").await;
        let oats = seed_food(&engine, "Oatmeal", true).await;

        for day in [2, 6] {
            engine
                .add_meal_food(
                    "u1",
                    MealFoodInput {
                        meal_id: None,
                        meal_type: MealType::Dinner,
                        meal_date: date(day),
                        food_id: oats.food.id.clone(),
                        portion_id: oats.portions[1].id.clone(),
                        selected_addons: vec![],
                    },
                )
                .await
                .unwrap();
        }

        let first = engine.summary_for_date("u1", date(2)).await.unwrap().unwrap();
        assert_eq!(first.days_since_last_log, None);

        let second = engine.summary_for_date("u1", date(6)).await.unwrap().unwrap();
        assert_eq!(second.days_since_last_log, Some(4));

        let range = engine.summaries_in_range("u1", date(1), date(7)).await.unwrap();
        let dates: Vec<NaiveDate> = range.iter().map(|s| s.summary_date).collect();
        assert_eq!(dates, vec![date(6), date(2)]);
    }

    #[tokio::test]
    async fn test_weight_upsert_one_per_day() {
        let engine = engine_with_user("u1").await;

        let first = engine.upsert_weight("u1", weight(80.0, 3)).await.unwrap();
        let again = engine.upsert_weight("u1", weight(79.4, 3)).await.unwrap();
        assert_eq!(first.id, again.id);
        assert_eq!(again.weight_kg, 79.4);

        engine.upsert_weight("u1", weight(79.0, 5)).await.unwrap();

        let logs = engine.recent_weight_logs("u1", 10).await.unwrap();
        let dates: Vec<NaiveDate> = logs.iter().map(|l| l.log_date).collect();
        assert_eq!(dates, vec![date(5), date(3)]);

        let limited = engine.recent_weight_logs("u1", 1).await.unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_weight_update_and_delete() {
        let engine = engine_with_user("u1").await;
        let a = engine.upsert_weight("u1", weight(80.0, 3)).await.unwrap();
        let b = engine.upsert_weight("u1", weight(79.0, 4)).await.unwrap();

        let err = engine
            .update_weight("u1", &b.id, weight(78.0, 3))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));

        let moved = engine
            .update_weight("u1", &b.id, weight(78.5, 6))
            .await
            .unwrap();
        assert_eq!(moved.log_date, date(6));

        engine.delete_weight("u1", &a.id).await.unwrap();
        let err = engine.delete_weight("u1", &a.id).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
    }
}
