//! Database schema
//!
//! Tables are created idempotently when the engine opens a database.
//! List-valued columns (`selected_addons`, `addons_display`,
//! `dietary_restrictions`) hold JSON arrays.

use rusqlite::Connection;

use super::error::StorageResult;

pub const PROFILES: &str = "profiles";
pub const FOODS: &str = "foods";
pub const FOOD_PORTIONS: &str = "food_portions";
pub const FOOD_ADDONS: &str = "food_addons";
pub const MEALS: &str = "meals";
pub const MEAL_FOODS: &str = "meal_foods";
pub const DAILY_SUMMARIES: &str = "daily_summaries";
pub const USER_GOALS: &str = "user_goals";
pub const WEIGHT_LOGS: &str = "weight_logs";

/// Every table, in creation order
pub const TABLES: &[&str] = &[
    PROFILES,
    FOODS,
    FOOD_PORTIONS,
    FOOD_ADDONS,
    MEALS,
    MEAL_FOODS,
    DAILY_SUMMARIES,
    USER_GOALS,
    WEIGHT_LOGS,
];

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS profiles (
    id                   TEXT PRIMARY KEY,
    full_name            TEXT NOT NULL,
    role                 TEXT NOT NULL DEFAULT 'client',
    age                  INTEGER,
    height_cm            INTEGER,
    weight_kg            REAL,
    activity_level       TEXT,
    dietary_restrictions TEXT NOT NULL DEFAULT '[]',
    assigned_trainer_id  TEXT REFERENCES profiles(id) ON DELETE SET NULL,
    is_active            INTEGER NOT NULL DEFAULT 1,
    created_at           TEXT NOT NULL,
    updated_at           TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS foods (
    id           TEXT PRIMARY KEY,
    display_name TEXT NOT NULL,
    category     TEXT NOT NULL,
    subcategory  TEXT,
    description  TEXT,
    is_approved  INTEGER,
    approved_by  TEXT REFERENCES profiles(id) ON DELETE SET NULL,
    requested_by TEXT REFERENCES profiles(id) ON DELETE SET NULL,
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS food_portions (
    id           TEXT PRIMARY KEY,
    food_id      TEXT NOT NULL REFERENCES foods(id) ON DELETE CASCADE,
    display_name TEXT NOT NULL,
    description  TEXT,
    calories     REAL NOT NULL,
    protein_g    REAL NOT NULL,
    carbs_g      REAL NOT NULL,
    fats_g       REAL NOT NULL,
    fiber_g      REAL,
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS food_addons (
    id           TEXT PRIMARY KEY,
    food_id      TEXT NOT NULL REFERENCES foods(id) ON DELETE CASCADE,
    display_name TEXT NOT NULL,
    category     TEXT,
    calories     REAL NOT NULL,
    protein_g    REAL NOT NULL,
    carbs_g      REAL NOT NULL,
    fats_g       REAL NOT NULL,
    fiber_g      REAL,
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS meals (
    id              TEXT PRIMARY KEY,
    user_id         TEXT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
    meal_type       TEXT NOT NULL,
    meal_date       TEXT NOT NULL,
    total_calories  REAL,
    total_protein_g REAL,
    total_carbs_g   REAL,
    total_fats_g    REAL,
    total_fiber_g   REAL,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_meals_user_date ON meals(user_id, meal_date);

CREATE TABLE IF NOT EXISTS meal_foods (
    id              TEXT PRIMARY KEY,
    meal_id         TEXT NOT NULL REFERENCES meals(id) ON DELETE CASCADE,
    food_id         TEXT REFERENCES foods(id) ON DELETE SET NULL,
    portion_id      TEXT REFERENCES food_portions(id) ON DELETE SET NULL,
    food_name       TEXT NOT NULL,
    portion_display TEXT NOT NULL,
    selected_addons TEXT,
    addons_display  TEXT,
    calories        REAL NOT NULL,
    protein_g       REAL NOT NULL,
    carbs_g         REAL NOT NULL,
    fats_g          REAL NOT NULL,
    fiber_g         REAL,
    created_at      TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_meal_foods_meal ON meal_foods(meal_id);

CREATE TABLE IF NOT EXISTS daily_summaries (
    id                  TEXT PRIMARY KEY,
    user_id             TEXT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
    summary_date        TEXT NOT NULL,
    total_calories      REAL NOT NULL DEFAULT 0,
    total_protein_g     REAL NOT NULL DEFAULT 0,
    total_carbs_g       REAL NOT NULL DEFAULT 0,
    total_fats_g        REAL NOT NULL DEFAULT 0,
    total_fiber_g       REAL NOT NULL DEFAULT 0,
    meals_logged        INTEGER,
    target_calories     INTEGER,
    target_protein_g    REAL,
    target_carbs_g      REAL,
    target_fats_g       REAL,
    target_fiber_g      REAL,
    days_since_last_log INTEGER,
    created_at          TEXT NOT NULL,
    updated_at          TEXT NOT NULL,
    UNIQUE (user_id, summary_date)
);

CREATE TABLE IF NOT EXISTS user_goals (
    id              TEXT PRIMARY KEY,
    user_id         TEXT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
    daily_calorie   INTEGER NOT NULL,
    daily_protein_g REAL NOT NULL,
    daily_carbs_g   REAL NOT NULL,
    daily_fats_g    REAL NOT NULL,
    daily_fiber_g   REAL NOT NULL,
    start_date      TEXT NOT NULL,
    end_date        TEXT,
    is_active       INTEGER NOT NULL DEFAULT 1,
    set_by          TEXT NOT NULL,
    set_by_user_id  TEXT REFERENCES profiles(id) ON DELETE SET NULL,
    reason          TEXT,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS weight_logs (
    id         TEXT PRIMARY KEY,
    user_id    TEXT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
    log_date   TEXT NOT NULL,
    weight_kg  REAL NOT NULL,
    notes      TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE (user_id, log_date)
);
"#;

/// Enable foreign keys and create all tables
pub fn migrate(conn: &Connection) -> StorageResult<()> {
    conn.pragma_update(None, "foreign_keys", true)?;
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrate_creates_tables() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();

        for table in TABLES {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "missing table {}", table);
        }
    }

    #[test]
    fn test_migrate_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap();
    }
}
